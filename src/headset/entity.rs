//! Battery, connection and reconnect operations for one headset
//!
//! A Bluetooth headset shows up as two PnP records: the hands-free audio
//! gateway, which carries the battery level, and the headphones device, which
//! carries the connection state. Both are resolved once; every reading
//! re-queries the device so values are never stale.

use crate::error::{AppError, Result};
use crate::pnp::datetime;
use crate::pnp::property::{PropertyValue, BATTERY_LEVEL, IS_CONNECTED, LAST_CONNECTED_TIME};
use crate::pnp::traits::{DeviceDirectory, DeviceEntity};
use crate::settings::config::HeadsetConfig;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::thread;
use std::time::Duration;

pub struct Headset<D: DeviceDirectory> {
    directory: D,
    hands_free: D::Entity,
    headphones: D::Entity,
    config: HeadsetConfig,
}

impl<D: DeviceDirectory> Headset<D> {
    /// Resolve both personas using the default name patterns
    pub fn create(directory: D) -> Result<Self> {
        Self::create_by(directory, None, None)
    }

    /// Resolve both personas; a missing or empty name falls back to the default pattern
    pub fn create_by(
        directory: D,
        hands_free_name: Option<&str>,
        headphones_name: Option<&str>,
    ) -> Result<Self> {
        Self::create_with_config(directory, HeadsetConfig::default(), hands_free_name, headphones_name)
    }

    /// Resolve both personas, with `config` supplying the fallback names.
    ///
    /// The hands-free device is resolved first. If it cannot be found the
    /// headphones device is not looked up at all.
    pub fn create_with_config(
        directory: D,
        mut config: HeadsetConfig,
        hands_free_name: Option<&str>,
        headphones_name: Option<&str>,
    ) -> Result<Self> {
        if let Some(name) = hands_free_name.filter(|n| !n.is_empty()) {
            config.hands_free_name = name.to_string();
        }
        if let Some(name) = headphones_name.filter(|n| !n.is_empty()) {
            config.headphones_name = name.to_string();
        }

        let hands_free = directory
            .resolve_by_friendly_name(&config.hands_free_name)
            .map_err(|e| {
                warn!("Hands-free lookup failed: {}", e);
                AppError::EntityNotResolved(config.hands_free_name.clone())
            })?;

        let headphones = directory
            .resolve_by_friendly_name(&config.headphones_name)
            .map_err(|e| {
                warn!("Headphones lookup failed: {}", e);
                AppError::EntityNotResolved(config.headphones_name.clone())
            })?;

        debug!(
            "Resolved headset: hands-free '{}', headphones '{}'",
            hands_free.friendly_name(),
            headphones.friendly_name()
        );

        Ok(Self::from_entities_with_config(directory, config, hands_free, headphones))
    }

    /// Wrap devices the caller already resolved
    pub fn from_entities(directory: D, hands_free: D::Entity, headphones: D::Entity) -> Self {
        Self::from_entities_with_config(directory, HeadsetConfig::default(), hands_free, headphones)
    }

    pub fn from_entities_with_config(
        directory: D,
        config: HeadsetConfig,
        hands_free: D::Entity,
        headphones: D::Entity,
    ) -> Self {
        Self {
            directory,
            hands_free,
            headphones,
            config,
        }
    }

    pub fn hands_free(&self) -> &D::Entity {
        &self.hands_free
    }

    pub fn headphones(&self) -> &D::Entity {
        &self.headphones
    }

    pub fn config(&self) -> &HeadsetConfig {
        &self.config
    }

    /// Battery level in percent. Reads as 0 when the level is unavailable.
    pub fn battery_level(&self) -> u8 {
        match self.hands_free.get_property(&BATTERY_LEVEL) {
            Ok(PropertyValue { data: Some(data), .. }) => data.as_u8().unwrap_or_else(|| {
                warn!("Unexpected battery level payload {:?}", data);
                0
            }),
            Ok(_) => 0,
            Err(e) => {
                warn!("Battery level unavailable: {}", e);
                0
            }
        }
    }

    /// Whether the headphones are connected. An unset value reads as `false`;
    /// a failed read is an error.
    pub fn connected(&self) -> Result<bool> {
        let value = self.headphones.get_property(&IS_CONNECTED)?;
        match value.data {
            None => Ok(false),
            Some(data) => data.as_bool().ok_or_else(|| {
                AppError::PropertyReadFailed(format!("{} is not a boolean: {:?}", IS_CONNECTED, data))
            }),
        }
    }

    /// When the headphones were last connected, in UTC.
    ///
    /// Windows clears this property while a connection is active, so an error
    /// here usually means the device is connected right now.
    pub fn last_connected_time(&self) -> Result<DateTime<Utc>> {
        match self.headphones.get_property(&LAST_CONNECTED_TIME) {
            Ok(PropertyValue { data: Some(data), .. }) => datetime::to_utc(&data),
            Ok(_) | Err(_) => Err(AppError::PropertyUnavailable(
                "Can not find `LastConnectedTime` property. It is possible the device is still connected."
                    .to_string(),
            )),
        }
    }

    fn bluetooth_devices(&self) -> Result<Vec<D::Entity>> {
        let devices = self.directory.find_by_friendly_name_substring_in_class(
            &self.config.headphones_name,
            &self.config.bluetooth_class,
        )?;
        debug!(
            "Found {} {} sub-devices matching '{}'",
            devices.len(),
            self.config.bluetooth_class,
            self.config.headphones_name
        );
        Ok(devices)
    }

    /// Nudge already paired headphones to reconnect by cycling every Bluetooth
    /// sub-device off and on. Requires administrative rights.
    ///
    /// Sub-devices are those whose name contains the headphones name, so an
    /// explicit headphones name also narrows which sub-devices get cycled.
    ///
    /// Stops at the first device that fails to change state.
    pub fn try_connect(&self) -> Result<()> {
        for device in self.bluetooth_devices()? {
            device.disable()?;
            device.enable()?;
            info!("Cycled '{}'", device.friendly_name());
        }
        Ok(())
    }

    /// Drop the connection of paired headphones by disabling every Bluetooth
    /// sub-device, last enumerated first. Requires administrative rights.
    ///
    /// Each device is disabled twice with a pause in between. Stops at the
    /// first device that fails to change state.
    pub fn try_disconnect(&self) -> Result<()> {
        let delay = Duration::from_millis(self.config.disconnect_delay_ms);

        for device in self.bluetooth_devices()?.into_iter().rev() {
            device.disable()?;
            thread::sleep(delay);
            device.disable()?;
            info!("Disabled '{}'", device.friendly_name());
        }
        Ok(())
    }
}
