//! PnP device inventory access
//!
//! Provides the device directory abstraction, property keys, friendly-name
//! pattern matching and the SetupAPI-backed directory used on Windows.

pub mod datetime;
pub mod pattern;
pub mod property;
#[cfg(windows)]
pub mod setupapi;
pub mod traits;

pub use pattern::NamePattern;
pub use property::{PropertyData, PropertyKey, PropertyValue};
#[cfg(windows)]
pub use setupapi::{PnpEntity, SetupApiDirectory};
pub use traits::{DeviceDirectory, DeviceEntity};
