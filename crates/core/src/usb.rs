//! USB backend on top of `nusb`.
//!
//! Dropping a `nusb::Interface` releases it and dropping the last
//! `nusb::Device` closes the device, so release and close only need to drop
//! the handles this module holds.

use crate::error::{Error, Result};
use crate::transport::{ControlSetup, UsbBackend, UsbDeviceInfo, UsbHandle};
use nusb::transfer::{Control, ControlType, Recipient, TransferError};
use std::time::Duration;
use tracing::debug;

/// Host USB stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct NusbBackend {
    detach_kernel_driver: bool,
}

impl NusbBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach the kernel HID driver from the interface before claiming it.
    ///
    /// Only has an effect on Linux, where `usbhid` otherwise holds the interface.
    pub fn detach_kernel_driver(mut self, detach: bool) -> Self {
        self.detach_kernel_driver = detach;
        self
    }
}

fn describe(info: &nusb::DeviceInfo) -> UsbDeviceInfo {
    UsbDeviceInfo {
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        bus_number: info.bus_number(),
        address: info.device_address(),
        product: info.product_string().map(|s| s.to_string()),
        serial: info.serial_number().map(|s| s.to_string()),
    }
}

impl UsbBackend for NusbBackend {
    fn enumerate(&self) -> Result<Vec<UsbDeviceInfo>> {
        let devices = nusb::list_devices().map_err(|e| Error::Enumeration(e.to_string()))?;
        Ok(devices.map(|d| describe(&d)).collect())
    }

    fn open(&self, info: &UsbDeviceInfo) -> Result<Box<dyn UsbHandle>> {
        let found = nusb::list_devices()
            .map_err(|e| Error::Enumeration(e.to_string()))?
            .find(|d| {
                d.bus_number() == info.bus_number
                    && d.device_address() == info.address
                    && d.vendor_id() == info.vendor_id
                    && d.product_id() == info.product_id
            })
            .ok_or_else(|| {
                Error::Open(format!(
                    "device {:04X}:{:04X} at usb:{:03}/{:03} is gone",
                    info.vendor_id, info.product_id, info.bus_number, info.address
                ))
            })?;

        let device = found.open().map_err(|e| {
            Error::Open(format!(
                "VID=0x{:04X} PID=0x{:04X}: {e}",
                info.vendor_id, info.product_id
            ))
        })?;

        Ok(Box::new(NusbHandle {
            device: Some(device),
            interface: None,
            detach_kernel_driver: self.detach_kernel_driver,
        }))
    }
}

struct NusbHandle {
    device: Option<nusb::Device>,
    interface: Option<(u8, nusb::Interface)>,
    detach_kernel_driver: bool,
}

fn control(setup: ControlSetup) -> Control {
    Control {
        control_type: ControlType::Class,
        recipient: Recipient::Interface,
        request: setup.request,
        value: setup.value,
        index: setup.index,
    }
}

/// Blocking transfers are cancelled when their timeout expires.
fn transfer_error(direction: &str, timeout: Duration, err: TransferError) -> Error {
    match err {
        TransferError::Cancelled => Error::TransferTimeout(format!(
            "control {direction} after {}ms",
            timeout.as_millis()
        )),
        other => Error::Transfer(format!("control {direction}: {other}")),
    }
}

impl NusbHandle {
    fn device(&self) -> Result<&nusb::Device> {
        self.device
            .as_ref()
            .ok_or_else(|| Error::Open("device already closed".into()))
    }

    fn interface(&self) -> Result<&nusb::Interface> {
        self.interface
            .as_ref()
            .map(|(_, iface)| iface)
            .ok_or_else(|| Error::Transfer("no interface claimed".into()))
    }
}

impl UsbHandle for NusbHandle {
    fn active_configuration(&self) -> Option<u8> {
        self.device
            .as_ref()?
            .active_configuration()
            .ok()
            .map(|c| c.configuration_value())
    }

    fn set_configuration(&mut self, value: u8) -> Result<()> {
        self.device()
            .map_err(|e| Error::Configuration(e.to_string()))?
            .set_configuration(value)
            .map_err(|e| Error::Configuration(format!("set configuration {value}: {e}")))
    }

    fn interface_numbers(&self) -> Result<Vec<u8>> {
        let config = self
            .device()
            .map_err(|e| Error::Configuration(e.to_string()))?
            .active_configuration()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        Ok(config.interfaces().map(|g| g.interface_number()).collect())
    }

    fn claim_interface(&mut self, number: u8) -> Result<()> {
        let device = self
            .device()
            .map_err(|e| Error::InterfaceClaim(e.to_string()))?;
        let claimed = if self.detach_kernel_driver {
            device.detach_and_claim_interface(number)
        } else {
            device.claim_interface(number)
        };
        let interface =
            claimed.map_err(|e| Error::InterfaceClaim(format!("interface {number}: {e}")))?;
        self.interface = Some((number, interface));
        Ok(())
    }

    fn release_interface(&mut self, number: u8) -> Result<()> {
        match self.interface.take() {
            Some((claimed, _)) if claimed == number => {
                debug!(interface = number, "Interface released");
                Ok(())
            }
            other => {
                self.interface = other;
                Err(Error::InterfaceClaim(format!(
                    "interface {number} is not claimed"
                )))
            }
        }
    }

    fn control_out(&self, setup: ControlSetup, data: &[u8], timeout: Duration) -> Result<usize> {
        self.interface()?
            .control_out_blocking(control(setup), data, timeout)
            .map_err(|e| transfer_error("OUT", timeout, e))
    }

    fn control_in(
        &self,
        setup: ControlSetup,
        length: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length];
        let n = self
            .interface()?
            .control_in_blocking(control(setup), &mut buf, timeout)
            .map_err(|e| transfer_error("IN", timeout, e))?;
        buf.truncate(n);
        Ok(buf)
    }

    fn close(&mut self) {
        self.interface = None;
        self.device = None;
    }
}
