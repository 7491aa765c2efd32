//! USB transport abstraction for device communication.
//!
//! Provides a trait-based transport layer so that real USB devices and
//! mock devices share the same interface. The settle delay between the
//! outbound and inbound transfer also goes through a trait so tests can run
//! on a virtual clock.

use crate::error::Result;
use std::time::Duration;

/// HID class request: SET_REPORT.
pub const HID_SET_REPORT: u8 = 0x09;
/// HID class request: GET_REPORT.
pub const HID_GET_REPORT: u8 = 0x01;
/// wValue for a feature report (type 3) with report ID 0.
pub const FEATURE_REPORT_VALUE: u16 = 0x0300;

/// Setup fields of a class request addressed to an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetup {
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

impl ControlSetup {
    /// SET_REPORT for the feature report carrying a command frame.
    pub const SET_FEATURE_REPORT: Self = Self {
        request: HID_SET_REPORT,
        value: FEATURE_REPORT_VALUE,
        index: 0x0000,
    };

    /// GET_REPORT for the feature report carrying the reply.
    pub const GET_FEATURE_REPORT: Self = Self {
        request: HID_GET_REPORT,
        value: FEATURE_REPORT_VALUE,
        index: 0x0000,
    };
}

/// One attached USB device as seen during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub address: u8,
    pub product: Option<String>,
    pub serial: Option<String>,
}

/// Access to the host USB stack.
pub trait UsbBackend: Send {
    /// List every attached device.
    fn enumerate(&self) -> Result<Vec<UsbDeviceInfo>>;

    /// Open a previously enumerated device.
    fn open(&self, info: &UsbDeviceInfo) -> Result<Box<dyn UsbHandle>>;
}

/// An open USB device.
///
/// Implementations must release any claimed interface and the device itself
/// when dropped, even if [`UsbHandle::close`] was never called.
pub trait UsbHandle: Send {
    /// Value of the active configuration, `None` while unconfigured.
    fn active_configuration(&self) -> Option<u8>;

    /// Make a configuration active.
    fn set_configuration(&mut self, value: u8) -> Result<()>;

    /// Interface numbers exposed by the active configuration, in descriptor order.
    fn interface_numbers(&self) -> Result<Vec<u8>>;

    fn claim_interface(&mut self, number: u8) -> Result<()>;

    fn release_interface(&mut self, number: u8) -> Result<()>;

    /// Class/interface OUT transfer. Returns the number of bytes written.
    fn control_out(&self, setup: ControlSetup, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Class/interface IN transfer of up to `length` bytes.
    fn control_in(&self, setup: ControlSetup, length: usize, timeout: Duration)
        -> Result<Vec<u8>>;

    /// Close the device. Further calls are no-ops.
    fn close(&mut self);
}

/// Blocking wait between transfers.
pub trait Delay: Send {
    fn wait(&self, duration: Duration);
}

/// [`Delay`] backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn wait(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
