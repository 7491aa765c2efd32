//! Device discovery: find an attached, supported Razer mouse.

use crate::catalog::{self, DeviceDescriptor};
use crate::error::{Error, Result};
use crate::transport::{UsbBackend, UsbDeviceInfo};
use crate::RAZER_VID;
use tracing::{debug, info};

/// An attached device together with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub info: UsbDeviceInfo,
    pub descriptor: &'static DeviceDescriptor,
}

impl Candidate {
    /// One-line description for device listings.
    ///
    /// The product string and serial number are appended when the device
    /// reports them.
    pub fn label(&self) -> String {
        let mut label = format!(
            "{} (VID: 0x{:04X}, PID: 0x{:04X}, bus {:03} device {:03})",
            self.descriptor.name,
            self.info.vendor_id,
            self.info.product_id,
            self.info.bus_number,
            self.info.address
        );
        if let Some(product) = &self.info.product {
            label.push_str(&format!(" product \"{product}\""));
        }
        if let Some(serial) = &self.info.serial {
            label.push_str(&format!(" serial {serial}"));
        }
        label
    }
}

fn supported_devices<'a>(
    table: &'static [DeviceDescriptor],
    vendor_id: u16,
    devices: &'a [UsbDeviceInfo],
) -> impl Iterator<Item = Candidate> + 'a {
    devices
        .iter()
        .filter(move |d| d.vendor_id == vendor_id)
        .filter_map(move |d| {
            catalog::lookup_in(table, d.product_id).map(|descriptor| Candidate {
                info: d.clone(),
                descriptor,
            })
        })
}

/// Pick the first device that matches `vendor_id` and has an entry in `table`.
pub fn select_candidate(
    table: &'static [DeviceDescriptor],
    vendor_id: u16,
    devices: &[UsbDeviceInfo],
) -> Option<Candidate> {
    supported_devices(table, vendor_id, devices).next()
}

/// Enumerate attached devices and return every supported Razer mouse.
pub fn discover_devices(backend: &dyn UsbBackend) -> Result<Vec<Candidate>> {
    debug!("Starting USB device enumeration");
    let devices = backend.enumerate()?;
    let found: Vec<Candidate> =
        supported_devices(catalog::DEVICES, RAZER_VID, &devices).collect();

    for candidate in &found {
        info!(
            model = candidate.descriptor.name,
            pid = format_args!("0x{:04X}", candidate.info.product_id),
            bus = candidate.info.bus_number,
            address = candidate.info.address,
            "Found Razer device"
        );
    }

    debug!(
        attached = devices.len(),
        supported = found.len(),
        "Device enumeration complete"
    );
    Ok(found)
}

/// Enumerate attached devices and return the first supported Razer mouse.
pub fn find_candidate(backend: &dyn UsbBackend) -> Result<Candidate> {
    let devices = backend.enumerate()?;
    let candidate = select_candidate(catalog::DEVICES, RAZER_VID, &devices).ok_or_else(|| {
        Error::DeviceNotFound(format!(
            "no supported device among {} attached",
            devices.len()
        ))
    })?;

    debug!(
        model = candidate.descriptor.name,
        pid = format_args!("0x{:04X}", candidate.info.product_id),
        transaction_id = format_args!("0x{:02X}", candidate.descriptor.transaction_id),
        "Selected device"
    );
    Ok(candidate)
}
