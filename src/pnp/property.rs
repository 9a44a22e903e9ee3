//! Device property keys and values as reported by the PnP property store

use std::fmt;

/// A PnP property key: format id plus property id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub fmtid: u128,
    pub pid: u32,
}

impl PropertyKey {
    pub const fn new(fmtid: u128, pid: u32) -> Self {
        Self { fmtid, pid }
    }
}

/// Formats as `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX} pid`, the form WMI uses for key names
impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.fmtid;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:04X}-{:012X}}} {}",
            (g >> 96) as u32,
            (g >> 80) as u16,
            (g >> 64) as u16,
            (g >> 48) as u16,
            g & 0xFFFF_FFFF_FFFF,
            self.pid
        )
    }
}

/// Battery level reported by the hands-free audio gateway
pub const BATTERY_LEVEL: PropertyKey =
    PropertyKey::new(0x104EA319_6EE2_4701_BD47_8DDBF425BBE5, 2);

/// Whether the Bluetooth device currently holds a connection
pub const IS_CONNECTED: PropertyKey =
    PropertyKey::new(0x83DA6326_97A6_4088_9453_A1923F573B29, 15);

/// Last time the Bluetooth device was connected; unset while a connection is active
pub const LAST_CONNECTED_TIME: PropertyKey =
    PropertyKey::new(0x2BD67D8B_8BEB_48D5_87E0_6CDA3428040A, 11);

/// Typed payload of a device property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyData {
    Byte(u8),
    UInt32(u32),
    Boolean(bool),
    String(String),
    /// 100ns ticks since 1601-01-01 UTC
    FileTime(u64),
}

impl PropertyData {
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            PropertyData::Byte(b) => Some(*b),
            PropertyData::UInt32(v) => u8::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyData::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// Result of a property read. `data` is `None` when the key exists but holds no value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub key: PropertyKey,
    pub data: Option<PropertyData>,
}

impl PropertyValue {
    pub fn new(key: PropertyKey, data: Option<PropertyData>) -> Self {
        Self { key, data }
    }

    pub fn empty(key: PropertyKey) -> Self {
        Self { key, data: None }
    }
}
