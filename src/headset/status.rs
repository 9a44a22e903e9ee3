//! Point-in-time snapshot of a headset's readings

use crate::error::Result;
use crate::headset::entity::Headset;
use crate::pnp::traits::{DeviceDirectory, DeviceEntity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadsetStatus {
    pub hands_free: String,
    pub headphones: String,
    pub battery_level: u8,
    pub connected: bool,
    /// Unset while the headphones are connected
    pub last_connected: Option<DateTime<Utc>>,
}

impl HeadsetStatus {
    /// Read every value once. Only a failed connection read is an error.
    pub fn read<D: DeviceDirectory>(headset: &Headset<D>) -> Result<Self> {
        Ok(Self {
            hands_free: headset.hands_free().friendly_name(),
            headphones: headset.headphones().friendly_name(),
            battery_level: headset.battery_level(),
            connected: headset.connected()?,
            last_connected: headset.last_connected_time().ok(),
        })
    }
}

impl fmt::Display for HeadsetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Headphones:     {}", self.headphones)?;
        writeln!(f, "Hands-free:     {}", self.hands_free)?;
        writeln!(f, "Battery:        {}%", self.battery_level)?;
        writeln!(f, "Connected:      {}", if self.connected { "yes" } else { "no" })?;
        match self.last_connected {
            Some(at) => write!(f, "Last connected: {}", at.to_rfc3339()),
            None => write!(f, "Last connected: -"),
        }
    }
}
