//! Error types for razer-battery-core.

use thiserror::Error;

/// Core library error type.
///
/// Every variant is transient from the poller's point of view: the poll cycle
/// collapses all of them into [`crate::poller::PollOutcome::Unreachable`].
#[derive(Debug, Error)]
pub enum Error {
    /// No supported device is currently attached.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The USB stack could not list attached devices.
    #[error("USB enumeration failed: {0}")]
    Enumeration(String),

    /// The device refused to open (permissions, removed mid-open).
    #[error("failed to open device: {0}")]
    Open(String),

    /// No configuration could be made active.
    #[error("failed to select configuration: {0}")]
    Configuration(String),

    /// The primary interface is missing or claimed by another process.
    #[error("failed to claim interface: {0}")]
    InterfaceClaim(String),

    /// A control transfer did not complete before its deadline.
    #[error("control transfer timed out: {0}")]
    TransferTimeout(String),

    /// A control transfer failed (stall, disconnect, short write).
    #[error("control transfer failed: {0}")]
    Transfer(String),

    /// Response frame too short to carry a value.
    #[error("response too short: {actual} bytes (minimum {expected})")]
    Decode { expected: usize, actual: usize },
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
