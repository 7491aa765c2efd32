//! Razer HID command frame encoding and response decoding.
//!
//! Every exchange uses a 90-byte feature report:
//!
//! ```text
//! [0]      report ID (0x00)
//! [1]      transaction ID (per model, see catalog)
//! [2..5]   reserved, zero
//! [5]      data size
//! [6]      command class
//! [7]      command ID
//! [8..88]  payload (80 bytes)
//! [88]     checksum: XOR of bytes 2..88
//! [89]     reserved, zero
//! ```
//!
//! Replies use the same layout; the queried value sits at offset 9.

use crate::error::{Error, Result};

/// Total frame length, in and out.
pub const FRAME_LEN: usize = 90;
/// Payload bytes between the header and the checksum.
pub const PAYLOAD_LEN: usize = 80;
/// Offset of the first payload byte.
pub const PAYLOAD_OFFSET: usize = 8;
/// Offset of the checksum byte.
pub const CHECKSUM_OFFSET: usize = PAYLOAD_OFFSET + PAYLOAD_LEN;
/// Offset of the queried value in a response.
pub const VALUE_OFFSET: usize = 9;
/// Shortest response that still carries a value.
pub const MIN_RESPONSE_LEN: usize = VALUE_OFFSET + 1;

/// A complete outbound frame.
pub type CommandFrame = [u8; FRAME_LEN];

/// A parameterless query the device answers with a single value byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryCommand {
    pub class: u8,
    pub id: u8,
    pub data_size: u8,
}

/// Queries used for battery telemetry.
pub mod commands {
    use super::QueryCommand;

    /// Battery level, raw 0..=255.
    pub const BATTERY_LEVEL: QueryCommand = QueryCommand {
        class: 0x07,
        id: 0x80,
        data_size: 0x02,
    };
    /// Charging state, 1 when on the cable or dock.
    pub const CHARGING_STATE: QueryCommand = QueryCommand {
        class: 0x07,
        id: 0x84,
        data_size: 0x02,
    };
}

impl QueryCommand {
    /// Encode this query for a model with the given transaction ID.
    pub fn encode(&self, transaction_id: u8) -> CommandFrame {
        build_query_frame(transaction_id, self.class, self.id, self.data_size)
    }
}

/// Build a query frame with a zero payload.
pub fn build_query_frame(
    transaction_id: u8,
    command_class: u8,
    command_id: u8,
    data_size: u8,
) -> CommandFrame {
    let mut frame = [0u8; FRAME_LEN];
    frame[1] = transaction_id;
    frame[5] = data_size;
    frame[6] = command_class;
    frame[7] = command_id;
    frame[CHECKSUM_OFFSET] = checksum(&frame);
    frame
}

/// XOR of every byte after the report and transaction IDs, through the end of
/// the payload.
pub fn checksum(frame: &[u8]) -> u8 {
    frame[2..CHECKSUM_OFFSET].iter().fold(0, |crc, &b| crc ^ b)
}

fn value_byte(response: &[u8]) -> Result<u8> {
    response
        .get(VALUE_OFFSET)
        .copied()
        .ok_or(Error::Decode {
            expected: MIN_RESPONSE_LEN,
            actual: response.len(),
        })
}

/// Decode a battery level reply into a percentage rounded to one decimal.
pub fn decode_battery_percent(response: &[u8]) -> Result<f64> {
    let raw = value_byte(response)?;
    let percent = f64::from(raw) / 255.0 * 100.0;
    Ok((percent * 10.0).round() / 10.0)
}

/// Decode a charging state reply. Only 1 means charging.
pub fn decode_charging_flag(response: &[u8]) -> Result<bool> {
    Ok(value_byte(response)? == 1)
}
