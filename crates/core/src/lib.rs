//! razer-battery-core: Razer HID command frames, device discovery, and battery polling.
//!
//! This crate talks to Razer wireless mice through HID feature-report control
//! transfers to read the battery level and charging state.

pub mod catalog;
pub mod error;
pub mod frame;
#[cfg(test)]
mod integration_tests;
pub mod locator;
pub mod poller;
pub mod session;
pub mod transport;
pub mod usb;

/// Razer USB Vendor ID.
pub const RAZER_VID: u16 = 0x1532;

pub use error::{Error, Result};
pub use poller::{BatteryPoller, BatteryState, PollOutcome};
