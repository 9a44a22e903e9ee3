//! Headset facade over the two PnP personas of one Bluetooth headset

pub mod entity;
pub mod status;

pub use entity::Headset;
pub use status::HeadsetStatus;
