//! Trait abstractions over the OS PnP device inventory for testability
//! These traits allow the headset facade to run against an in-memory directory

use crate::error::{AppError, Result};
use crate::pnp::pattern::NamePattern;
use crate::pnp::property::{PropertyKey, PropertyValue};
use log::debug;

/// One PnP device record
pub trait DeviceEntity {
    fn friendly_name(&self) -> String;
    fn class_name(&self) -> String;
    fn get_property(&self, key: &PropertyKey) -> Result<PropertyValue>;
    fn enable(&self) -> Result<()>;
    fn disable(&self) -> Result<()>;
}

/// Lookup over the PnP device inventory
pub trait DeviceDirectory {
    type Entity: DeviceEntity;

    /// Find the single device whose friendly name matches `name` (wildcards allowed)
    fn resolve_by_friendly_name(&self, name: &str) -> Result<Self::Entity>;

    /// Find every device of `class_name` whose friendly name contains `pattern`,
    /// in enumeration order
    fn find_by_friendly_name_substring_in_class(
        &self,
        pattern: &str,
        class_name: &str,
    ) -> Result<Vec<Self::Entity>>;
}

/// Pick the one candidate whose name matches `name`; zero or several matches are errors
pub(crate) fn resolve_unique<T>(
    name: &str,
    candidates: impl IntoIterator<Item = (String, T)>,
) -> Result<T> {
    let pattern = NamePattern::exact(name);
    let mut matched: Vec<T> = candidates
        .into_iter()
        .filter(|(friendly, _)| pattern.matches(friendly))
        .map(|(_, entity)| entity)
        .collect();

    match matched.len() {
        0 => Err(AppError::DeviceNotFound(name.to_string())),
        1 => Ok(matched.remove(0)),
        count => Err(AppError::AmbiguousDevice {
            name: name.to_string(),
            count,
        }),
    }
}

/// Read every enumerated device with `read`, skipping devices that fail to read.
/// Enumeration failures still abort the scan.
pub(crate) fn collect_readable<D, T>(
    devices: impl IntoIterator<Item = Result<D>>,
    mut read: impl FnMut(&D) -> Result<Option<T>>,
) -> Result<Vec<T>> {
    let mut entities = Vec::new();
    for device in devices {
        let device = device?;
        // A device can vanish mid-scan; skip it rather than failing the lookup
        match read(&device) {
            Ok(Some(entity)) => entities.push(entity),
            Ok(None) => {}
            Err(e) => debug!("Skipping device during enumeration: {}", e),
        }
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_skips_unreadable_devices() {
        let devices: Vec<Result<u32>> = vec![Ok(1), Ok(2), Ok(3), Ok(4)];
        let names = collect_readable(devices, |&d| match d {
            2 => Err(AppError::PropertyReadFailed("device removed".to_string())),
            3 => Ok(None),
            d => Ok(Some(format!("dev{}", d))),
        })
        .unwrap();
        assert_eq!(names, vec!["dev1", "dev4"]);
    }

    #[test]
    fn test_collect_propagates_enumeration_failure() {
        let devices: Vec<Result<u32>> = vec![Ok(1), Err(AppError::IoError(std::io::Error::other("enum")))];
        let result = collect_readable(devices, |&d| Ok(Some(d)));
        assert!(matches!(result, Err(AppError::IoError(_))));
    }
}

/// Mock implementations for testing
/// Available in tests and with the "test-mocks" feature
#[cfg(any(test, feature = "test-mocks"))]
pub mod mocks {
    use super::*;
    use crate::pnp::property::PropertyData;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DeviceAction {
        Enable,
        Disable,
    }

    /// A state change that reached a mock device
    #[derive(Debug, Clone)]
    pub struct CallRecord {
        pub device: String,
        pub action: DeviceAction,
        pub at: Instant,
    }

    pub type Journal = Arc<Mutex<Vec<CallRecord>>>;

    #[derive(Debug, Clone)]
    pub struct MockDevice {
        pub name: String,
        pub class: String,
        /// Missing key = read failure, `None` = key present without a value
        pub properties: HashMap<PropertyKey, Option<PropertyData>>,
        pub fail_reads: bool,
        /// State changes after this many successful ones fail
        pub fail_after: Option<usize>,
        /// Successful state changes, shared by every clone of this device
        state_changes: Arc<AtomicUsize>,
        journal: Journal,
    }

    impl MockDevice {
        pub fn new(name: &str, class: &str) -> Self {
            Self {
                name: name.to_string(),
                class: class.to_string(),
                properties: HashMap::new(),
                fail_reads: false,
                fail_after: None,
                state_changes: Arc::default(),
                journal: Journal::default(),
            }
        }

        pub fn with_property(mut self, key: PropertyKey, data: PropertyData) -> Self {
            self.properties.insert(key, Some(data));
            self
        }

        pub fn with_empty_property(mut self, key: PropertyKey) -> Self {
            self.properties.insert(key, None);
            self
        }

        pub fn failing_reads(mut self) -> Self {
            self.fail_reads = true;
            self
        }

        pub fn failing_state_changes(self) -> Self {
            self.failing_after(0)
        }

        /// Allow `calls` enable/disable calls, then fail every later one
        pub fn failing_after(mut self, calls: usize) -> Self {
            self.fail_after = Some(calls);
            self
        }

        fn record(&self, action: DeviceAction) -> Result<()> {
            if self
                .fail_after
                .is_some_and(|limit| self.state_changes.load(Ordering::SeqCst) >= limit)
            {
                return Err(AppError::PrivilegeRequired(format!(
                    "Access denied changing state of '{}'",
                    self.name
                )));
            }
            self.state_changes.fetch_add(1, Ordering::SeqCst);
            self.journal.lock().unwrap().push(CallRecord {
                device: self.name.clone(),
                action,
                at: Instant::now(),
            });
            Ok(())
        }
    }

    impl DeviceEntity for MockDevice {
        fn friendly_name(&self) -> String {
            self.name.clone()
        }

        fn class_name(&self) -> String {
            self.class.clone()
        }

        fn get_property(&self, key: &PropertyKey) -> Result<PropertyValue> {
            if self.fail_reads {
                return Err(AppError::PropertyReadFailed(format!(
                    "'{}' was removed",
                    self.name
                )));
            }
            match self.properties.get(key) {
                Some(data) => Ok(PropertyValue::new(*key, data.clone())),
                None => Err(AppError::PropertyReadFailed(format!(
                    "'{}' has no property {}",
                    self.name, key
                ))),
            }
        }

        fn enable(&self) -> Result<()> {
            self.record(DeviceAction::Enable)
        }

        fn disable(&self) -> Result<()> {
            self.record(DeviceAction::Disable)
        }
    }

    /// In-memory device inventory. Devices enumerate in insertion order.
    #[derive(Debug, Default)]
    pub struct MockDeviceDirectory {
        devices: Vec<MockDevice>,
        journal: Journal,
        lookups: Mutex<Vec<String>>,
    }

    impl MockDeviceDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_device(mut self, mut device: MockDevice) -> Self {
            device.journal = Arc::clone(&self.journal);
            self.devices.push(device);
            self
        }

        /// Names passed to `resolve_by_friendly_name`, in call order
        pub fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }

        /// State changes applied to any device, in call order
        pub fn calls(&self) -> Vec<CallRecord> {
            self.journal.lock().unwrap().clone()
        }

        pub fn device(&self, name: &str) -> Option<MockDevice> {
            self.devices.iter().find(|d| d.name == name).cloned()
        }
    }

    impl DeviceDirectory for &MockDeviceDirectory {
        type Entity = MockDevice;

        fn resolve_by_friendly_name(&self, name: &str) -> Result<MockDevice> {
            self.lookups.lock().unwrap().push(name.to_string());
            resolve_unique(
                name,
                self.devices.iter().map(|d| (d.name.clone(), d.clone())),
            )
        }

        fn find_by_friendly_name_substring_in_class(
            &self,
            pattern: &str,
            class_name: &str,
        ) -> Result<Vec<MockDevice>> {
            let pattern = NamePattern::substring(pattern);
            Ok(self
                .devices
                .iter()
                .filter(|d| d.class.eq_ignore_ascii_case(class_name) && pattern.matches(&d.name))
                .cloned()
                .collect())
        }
    }

}
