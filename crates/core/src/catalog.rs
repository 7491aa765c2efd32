//! Supported Razer mouse models.
//!
//! Each model is keyed by its USB product ID and carries the transaction ID
//! the firmware expects in byte 1 of every command frame.

use serde::Serialize;

/// Metadata for one supported peripheral model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    pub product_id: u16,
    pub name: &'static str,
    pub transaction_id: u8,
}

/// Known Razer product IDs.
pub mod pids {
    pub const BASILISK_V3_PRO_WIRED: u16 = 0x00AA;
    pub const BASILISK_V3_PRO_WIRELESS: u16 = 0x00AB;
    pub const DEATHADDER_V2_PRO_WIRED: u16 = 0x007C;
    pub const DEATHADDER_V2_PRO_WIRELESS: u16 = 0x007D;
    pub const DEATHADDER_V2_X_HYPERSPEED: u16 = 0x009C;
    pub const HYPERPOLLING_WIRELESS_DONGLE: u16 = 0x00B3;
    pub const DEATHADDER_V3_PRO_WIRED: u16 = 0x00B6;
    pub const DEATHADDER_V3_PRO_WIRELESS: u16 = 0x00B7;
    pub const BASILISK_X_HYPERSPEED: u16 = 0x0083;
    pub const BASILISK_ULTIMATE: u16 = 0x0086;
    pub const BASILISK_ULTIMATE_DONGLE: u16 = 0x0088;
    pub const NAGA_V2_PRO_WIRED: u16 = 0x008F;
    pub const NAGA_V2_PRO_WIRELESS: u16 = 0x0090;
    pub const VIPER_V2_PRO_WIRED: u16 = 0x00A5;
    pub const VIPER_V2_PRO_WIRELESS: u16 = 0x00A6;
    pub const VIPER_ULTIMATE: u16 = 0x007B;
    pub const VIPER_ULTIMATE_DONGLE: u16 = 0x007A;
}

const fn model(product_id: u16, name: &'static str, transaction_id: u8) -> DeviceDescriptor {
    DeviceDescriptor {
        product_id,
        name,
        transaction_id,
    }
}

/// Every supported model. Product IDs are unique.
pub const DEVICES: &[DeviceDescriptor] = &[
    model(pids::BASILISK_V3_PRO_WIRED, "Razer Basilisk V3 Pro", 0x1F),
    model(pids::BASILISK_V3_PRO_WIRELESS, "Razer Basilisk V3 Pro", 0x1F),
    model(pids::DEATHADDER_V2_PRO_WIRED, "Razer DeathAdder V2 Pro Wired", 0x3F),
    model(pids::DEATHADDER_V2_PRO_WIRELESS, "Razer DeathAdder V2 Pro Wireless", 0x3F),
    model(pids::DEATHADDER_V2_X_HYPERSPEED, "Razer DeathAdder V2 X HyperSpeed", 0x1F),
    model(pids::HYPERPOLLING_WIRELESS_DONGLE, "Razer Hyperpolling Wireless Dongle", 0x1F),
    model(pids::DEATHADDER_V3_PRO_WIRED, "Razer Deathadder V3 Pro Wired", 0x1F),
    model(pids::DEATHADDER_V3_PRO_WIRELESS, "Razer Deathadder V3 Pro Wireless", 0x1F),
    model(pids::BASILISK_X_HYPERSPEED, "Razer Basilsk X HyperSpeed", 0x1F),
    model(pids::BASILISK_ULTIMATE, "Razer Basilisk Ultimate", 0x1F),
    model(pids::BASILISK_ULTIMATE_DONGLE, "Razer Basilisk Ultimate Dongle", 0x1F),
    model(pids::NAGA_V2_PRO_WIRED, "Razer Naga v2 Pro Wired", 0x1F),
    model(pids::NAGA_V2_PRO_WIRELESS, "Razer Naga v2 Pro Wireless", 0x1F),
    model(pids::VIPER_V2_PRO_WIRED, "Razer Viper V2 Pro Wired", 0x1F),
    model(pids::VIPER_V2_PRO_WIRELESS, "Razer Viper V2 Pro Wireless", 0x1F),
    model(pids::VIPER_ULTIMATE, "Razer Viper Ultimate", 0x3F),
    model(pids::VIPER_ULTIMATE_DONGLE, "Razer Viper Ultimate Dongle", 0x3F),
];

/// Every supported model, in catalog order.
pub fn all() -> &'static [DeviceDescriptor] {
    DEVICES
}

/// Look up a model in an arbitrary table.
pub fn lookup_in(
    table: &'static [DeviceDescriptor],
    product_id: u16,
) -> Option<&'static DeviceDescriptor> {
    table.iter().find(|d| d.product_id == product_id)
}

/// Look up a supported model from its USB product ID.
pub fn lookup(product_id: u16) -> Option<&'static DeviceDescriptor> {
    lookup_in(DEVICES, product_id)
}
