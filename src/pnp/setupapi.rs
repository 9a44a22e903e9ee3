//! PnP device inventory backed by SetupAPI
//!
//! Devices are tracked by instance id; every property read or state change
//! opens a fresh device info set so values always reflect the current OS state.

use crate::error::{AppError, Result};
use crate::pnp::pattern::NamePattern;
use crate::pnp::property::{PropertyData, PropertyKey, PropertyValue};
use crate::pnp::traits::{collect_readable, resolve_unique, DeviceDirectory, DeviceEntity};
use log::{debug, info};
use std::mem;
use windows::core::{GUID, PCWSTR};
use windows::Win32::Devices::DeviceAndDriverInstallation::{
    SetupDiCallClassInstaller, SetupDiCreateDeviceInfoList, SetupDiDestroyDeviceInfoList,
    SetupDiEnumDeviceInfo, SetupDiGetClassDevsW, SetupDiGetDevicePropertyW,
    SetupDiOpenDeviceInfoW, SetupDiSetClassInstallParamsW, DICS_DISABLE, DICS_ENABLE,
    DICS_FLAG_GLOBAL, DIF_PROPERTYCHANGE, DIGCF_ALLCLASSES, DIGCF_PRESENT, HDEVINFO,
    SETUP_DI_STATE_CHANGE, SP_CLASSINSTALL_HEADER, SP_DEVINFO_DATA, SP_PROPCHANGE_PARAMS,
};
use windows::Win32::Devices::Properties::{
    DEVPROPTYPE, DEVPROP_TYPE_BOOLEAN, DEVPROP_TYPE_BYTE, DEVPROP_TYPE_EMPTY,
    DEVPROP_TYPE_FILETIME, DEVPROP_TYPE_NULL, DEVPROP_TYPE_STRING, DEVPROP_TYPE_UINT32,
};
use windows::Win32::Foundation::{
    DEVPROPKEY, ERROR_ACCESS_DENIED, ERROR_INSUFFICIENT_BUFFER, ERROR_NOT_FOUND,
    ERROR_NO_MORE_ITEMS, HWND,
};

const DEVPKEY_DEVICE_DESC: PropertyKey =
    PropertyKey::new(0xA45C254E_DF1C_4EFD_8020_67D146A850E0, 2);
const DEVPKEY_DEVICE_CLASS: PropertyKey =
    PropertyKey::new(0xA45C254E_DF1C_4EFD_8020_67D146A850E0, 9);
const DEVPKEY_DEVICE_FRIENDLY_NAME: PropertyKey =
    PropertyKey::new(0xA45C254E_DF1C_4EFD_8020_67D146A850E0, 14);
const DEVPKEY_DEVICE_INSTANCE_ID: PropertyKey =
    PropertyKey::new(0x78C34FC8_104A_4ACA_9EA4_524D52996E57, 256);

/// Owned device info set, destroyed on drop
struct DeviceInfoSet(HDEVINFO);

impl DeviceInfoSet {
    /// All devices currently present, of every class
    fn present() -> Result<Self> {
        let set = unsafe {
            SetupDiGetClassDevsW(None, PCWSTR::null(), HWND::default(), DIGCF_ALLCLASSES | DIGCF_PRESENT)?
        };
        Ok(Self(set))
    }

    /// A set holding just the device with `instance_id`
    fn open(instance_id: &str) -> Result<(Self, SP_DEVINFO_DATA)> {
        let set = Self(unsafe { SetupDiCreateDeviceInfoList(None, HWND::default())? });
        let id_wide: Vec<u16> = instance_id.encode_utf16().chain(std::iter::once(0)).collect();
        let mut data = new_devinfo_data();

        unsafe {
            SetupDiOpenDeviceInfoW(
                set.0,
                PCWSTR::from_raw(id_wide.as_ptr()),
                HWND::default(),
                0,
                Some(&mut data as *mut _),
            )
            .map_err(|e| {
                if e.code() == ERROR_NOT_FOUND.to_hresult() {
                    AppError::InstanceNotFound(instance_id.to_string())
                } else {
                    AppError::WindowsApiError(e)
                }
            })?;
        }

        Ok((set, data))
    }

    fn devices(&self) -> DeviceInfoIter<'_> {
        DeviceInfoIter { set: self, index: 0 }
    }
}

impl Drop for DeviceInfoSet {
    fn drop(&mut self) {
        unsafe {
            let _ = SetupDiDestroyDeviceInfoList(self.0);
        }
    }
}

struct DeviceInfoIter<'a> {
    set: &'a DeviceInfoSet,
    index: u32,
}

impl Iterator for DeviceInfoIter<'_> {
    type Item = Result<SP_DEVINFO_DATA>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut data = new_devinfo_data();
        let result = unsafe { SetupDiEnumDeviceInfo(self.set.0, self.index, &mut data) };
        self.index += 1;

        match result {
            Ok(()) => Some(Ok(data)),
            Err(e) if e.code() == ERROR_NO_MORE_ITEMS.to_hresult() => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

fn new_devinfo_data() -> SP_DEVINFO_DATA {
    SP_DEVINFO_DATA {
        cbSize: mem::size_of::<SP_DEVINFO_DATA>() as u32,
        ..Default::default()
    }
}

fn to_devpropkey(key: &PropertyKey) -> DEVPROPKEY {
    DEVPROPKEY {
        fmtid: GUID::from_u128(key.fmtid),
        pid: key.pid,
    }
}

/// Read one property. A property the device does not carry reads as empty.
fn read_property(
    set: &DeviceInfoSet,
    data: &SP_DEVINFO_DATA,
    key: &PropertyKey,
) -> Result<PropertyValue> {
    let devkey = to_devpropkey(key);
    let mut prop_type = DEVPROPTYPE::default();
    let mut required = 0u32;

    // First call sizes the buffer
    let sizing = unsafe {
        SetupDiGetDevicePropertyW(set.0, data, &devkey, &mut prop_type, None, Some(&mut required as *mut u32), 0)
    };
    match sizing {
        Ok(()) => return Ok(PropertyValue::empty(*key)),
        Err(e) if e.code() == ERROR_NOT_FOUND.to_hresult() => {
            debug!("Property {} not set", key);
            return Ok(PropertyValue::empty(*key));
        }
        Err(e) if e.code() == ERROR_INSUFFICIENT_BUFFER.to_hresult() => {}
        Err(e) => {
            return Err(AppError::PropertyReadFailed(format!("{}: {}", key, e)));
        }
    }

    let mut buffer = vec![0u8; required as usize];
    unsafe {
        SetupDiGetDevicePropertyW(
            set.0,
            data,
            &devkey,
            &mut prop_type,
            Some(&mut buffer),
            Some(&mut required as *mut u32),
            0,
        )
        .map_err(|e| AppError::PropertyReadFailed(format!("{}: {}", key, e)))?;
    }

    Ok(PropertyValue::new(*key, decode(key, prop_type, &buffer)?))
}

fn decode(key: &PropertyKey, prop_type: DEVPROPTYPE, buffer: &[u8]) -> Result<Option<PropertyData>> {
    let truncated = || AppError::PropertyReadFailed(format!("{}: truncated value", key));

    let data = if prop_type == DEVPROP_TYPE_EMPTY || prop_type == DEVPROP_TYPE_NULL {
        None
    } else if prop_type == DEVPROP_TYPE_BYTE {
        Some(PropertyData::Byte(*buffer.first().ok_or_else(truncated)?))
    } else if prop_type == DEVPROP_TYPE_BOOLEAN {
        // DEVPROP_TRUE is 0xFF
        Some(PropertyData::Boolean(*buffer.first().ok_or_else(truncated)? != 0))
    } else if prop_type == DEVPROP_TYPE_UINT32 {
        let bytes: [u8; 4] = buffer.get(..4).ok_or_else(truncated)?.try_into().map_err(|_| truncated())?;
        Some(PropertyData::UInt32(u32::from_le_bytes(bytes)))
    } else if prop_type == DEVPROP_TYPE_FILETIME {
        let bytes: [u8; 8] = buffer.get(..8).ok_or_else(truncated)?.try_into().map_err(|_| truncated())?;
        Some(PropertyData::FileTime(u64::from_le_bytes(bytes)))
    } else if prop_type == DEVPROP_TYPE_STRING {
        let wide: Vec<u16> = buffer
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&c| c != 0)
            .collect();
        Some(PropertyData::String(String::from_utf16_lossy(&wide)))
    } else {
        return Err(AppError::PropertyReadFailed(format!(
            "{}: unsupported property type {:?}",
            key, prop_type
        )));
    };

    Ok(data)
}

fn read_string(set: &DeviceInfoSet, data: &SP_DEVINFO_DATA, key: &PropertyKey) -> Result<Option<String>> {
    Ok(match read_property(set, data, key)?.data {
        Some(PropertyData::String(s)) => Some(s),
        _ => None,
    })
}

/// Map Win32 error codes from state changes to user-facing errors
fn map_state_error(err: windows::core::Error, operation: &str, name: &str) -> AppError {
    if err.code() == ERROR_ACCESS_DENIED.to_hresult() {
        AppError::PrivilegeRequired(format!("Access denied trying to {} '{}'", operation, name))
    } else {
        AppError::DeviceStateFailed(format!("Could not {} '{}': {}", operation, name, err))
    }
}

/// A PnP device record identified by instance id
#[derive(Debug, Clone)]
pub struct PnpEntity {
    pub instance_id: String,
    pub name: String,
    pub class: String,
}

impl PnpEntity {
    fn change_state(&self, state: SETUP_DI_STATE_CHANGE, operation: &str) -> Result<()> {
        let (set, data) = DeviceInfoSet::open(&self.instance_id)?;

        let params = SP_PROPCHANGE_PARAMS {
            ClassInstallHeader: SP_CLASSINSTALL_HEADER {
                cbSize: mem::size_of::<SP_CLASSINSTALL_HEADER>() as u32,
                InstallFunction: DIF_PROPERTYCHANGE,
            },
            StateChange: state,
            Scope: DICS_FLAG_GLOBAL,
            HwProfile: 0,
        };

        unsafe {
            SetupDiSetClassInstallParamsW(
                set.0,
                Some(&data as *const _),
                Some(&params.ClassInstallHeader as *const _),
                mem::size_of::<SP_PROPCHANGE_PARAMS>() as u32,
            )
            .map_err(|e| map_state_error(e, operation, &self.name))?;

            SetupDiCallClassInstaller(DIF_PROPERTYCHANGE, set.0, Some(&data as *const _))
                .map_err(|e| map_state_error(e, operation, &self.name))?;
        }

        info!("{} '{}' ({})", operation, self.name, self.instance_id);
        Ok(())
    }
}

impl DeviceEntity for PnpEntity {
    fn friendly_name(&self) -> String {
        self.name.clone()
    }

    fn class_name(&self) -> String {
        self.class.clone()
    }

    fn get_property(&self, key: &PropertyKey) -> Result<PropertyValue> {
        let (set, data) = DeviceInfoSet::open(&self.instance_id)?;
        let value = read_property(&set, &data, key)?;
        debug!("'{}' {} = {:?}", self.name, key, value.data);
        Ok(value)
    }

    fn enable(&self) -> Result<()> {
        self.change_state(DICS_ENABLE, "enable")
    }

    fn disable(&self) -> Result<()> {
        self.change_state(DICS_DISABLE, "disable")
    }
}

/// Identity of one enumerated device; `None` when it has no display name
fn read_entity(set: &DeviceInfoSet, data: &SP_DEVINFO_DATA) -> Result<Option<PnpEntity>> {
    let Some(instance_id) = read_string(set, data, &DEVPKEY_DEVICE_INSTANCE_ID)? else {
        return Ok(None);
    };
    // Same fallback WMI uses for Win32_PnPEntity.Name
    let name = match read_string(set, data, &DEVPKEY_DEVICE_FRIENDLY_NAME)? {
        Some(name) => name,
        None => match read_string(set, data, &DEVPKEY_DEVICE_DESC)? {
            Some(desc) => desc,
            None => return Ok(None),
        },
    };
    let class = read_string(set, data, &DEVPKEY_DEVICE_CLASS)?.unwrap_or_default();

    Ok(Some(PnpEntity {
        instance_id,
        name,
        class,
    }))
}

/// Directory over all present PnP devices
#[derive(Debug, Default, Clone, Copy)]
pub struct SetupApiDirectory;

impl SetupApiDirectory {
    pub fn new() -> Self {
        Self
    }

    /// Snapshot every present device that has a display name
    pub fn entities(&self) -> Result<Vec<PnpEntity>> {
        let set = DeviceInfoSet::present()?;
        let entities = collect_readable(set.devices(), |data| read_entity(&set, data))?;

        debug!("Enumerated {} PnP devices", entities.len());
        Ok(entities)
    }
}

impl DeviceDirectory for SetupApiDirectory {
    type Entity = PnpEntity;

    fn resolve_by_friendly_name(&self, name: &str) -> Result<PnpEntity> {
        let entity = resolve_unique(
            name,
            self.entities()?.into_iter().map(|e| (e.name.clone(), e)),
        )?;
        debug!("Resolved '{}' -> '{}' ({})", name, entity.name, entity.instance_id);
        Ok(entity)
    }

    fn find_by_friendly_name_substring_in_class(
        &self,
        pattern: &str,
        class_name: &str,
    ) -> Result<Vec<PnpEntity>> {
        let pattern = NamePattern::substring(pattern);
        Ok(self
            .entities()?
            .into_iter()
            .filter(|e| e.class.eq_ignore_ascii_case(class_name) && pattern.matches(&e.name))
            .collect())
    }
}
