//! Headset PnP Status Library
//!
//! Reads battery level and connection state of a Bluetooth headset from the
//! Windows PnP device inventory, and nudges it to reconnect or disconnect.

pub mod error;
pub mod headset;
pub mod logging;
pub mod pnp;
pub mod settings;

pub use error::{AppError, Result};
pub use headset::{Headset, HeadsetStatus};
