//! One open device for the duration of a single polling cycle.
//!
//! A session walks `Opened -> ConfigurationSelected -> InterfaceClaimed ->
//! Transferring` and always ends in `Closed`, whether the cycle succeeded or
//! not. Dropping a session closes it.

use crate::catalog::DeviceDescriptor;
use crate::error::{Error, Result};
use crate::frame::{QueryCommand, FRAME_LEN};
use crate::locator::Candidate;
use crate::transport::{ControlSetup, Delay, UsbBackend, UsbHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Wait between writing a query and reading its reply.
///
/// Firmware timing requirement; reading earlier returns a stale or truncated
/// frame.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Configuration selected when the device has none active.
pub const DEFAULT_CONFIGURATION: u8 = 1;

/// Default deadline for a single control transfer.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_millis(1000);

/// Tunables for a transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub transfer_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
        }
    }
}

/// Lifecycle position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Before [`TransferSession::open`] returns. A session value never holds
    /// this state; a failed open yields an error instead of a session.
    Unopened,
    Opened,
    ConfigurationSelected,
    InterfaceClaimed,
    Transferring,
    Closed,
}

pub struct TransferSession<'a> {
    handle: Box<dyn UsbHandle>,
    descriptor: &'static DeviceDescriptor,
    delay: &'a dyn Delay,
    config: SessionConfig,
    claimed: Option<u8>,
    state: SessionState,
}

impl<'a> TransferSession<'a> {
    /// Open the candidate device.
    pub fn open(
        backend: &dyn UsbBackend,
        candidate: &Candidate,
        delay: &'a dyn Delay,
        config: SessionConfig,
    ) -> Result<Self> {
        let handle = backend.open(&candidate.info)?;
        debug!(model = candidate.descriptor.name, "Device opened");
        Ok(Self {
            handle,
            descriptor: candidate.descriptor,
            delay,
            config,
            claimed: None,
            state: SessionState::Opened,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Interface number held by this session, if any.
    pub fn claimed_interface(&self) -> Option<u8> {
        self.claimed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(Error::Open("session already closed".into()));
        }
        Ok(())
    }

    /// Select the default configuration unless one is already active.
    pub fn ensure_configuration(&mut self) -> Result<()> {
        self.ensure_open()?;
        match self.handle.active_configuration() {
            Some(value) => {
                trace!(configuration = value, "Configuration already active");
            }
            None => {
                debug!(
                    configuration = DEFAULT_CONFIGURATION,
                    "No active configuration, selecting default"
                );
                self.handle.set_configuration(DEFAULT_CONFIGURATION)?;
            }
        }
        self.state = SessionState::ConfigurationSelected;
        Ok(())
    }

    /// Claim the first interface of the active configuration.
    pub fn claim_primary_interface(&mut self) -> Result<u8> {
        self.ensure_open()?;
        let number = self
            .handle
            .interface_numbers()?
            .first()
            .copied()
            .ok_or_else(|| Error::InterfaceClaim("configuration exposes no interfaces".into()))?;
        self.handle.claim_interface(number)?;
        self.claimed = Some(number);
        self.state = SessionState::InterfaceClaimed;
        debug!(interface = number, "Interface claimed");
        Ok(number)
    }

    /// Write a query, wait out the settle delay, and read the reply.
    pub fn query(&mut self, command: QueryCommand) -> Result<Vec<u8>> {
        self.ensure_open()?;
        if self.claimed.is_none() {
            return Err(Error::InterfaceClaim("query before claiming an interface".into()));
        }
        self.state = SessionState::Transferring;

        let frame = command.encode(self.descriptor.transaction_id);
        trace!(
            class = format_args!("0x{:02X}", command.class),
            id = format_args!("0x{:02X}", command.id),
            report_hex = format_args!("{:02X?}", &frame[..10]),
            "TX"
        );

        let written = self.handle.control_out(
            ControlSetup::SET_FEATURE_REPORT,
            &frame,
            self.config.transfer_timeout,
        )?;
        if written != FRAME_LEN {
            return Err(Error::Transfer(format!(
                "short write: {written} of {FRAME_LEN} bytes"
            )));
        }

        self.delay.wait(SETTLE_DELAY);

        let reply = self.handle.control_in(
            ControlSetup::GET_FEATURE_REPORT,
            FRAME_LEN,
            self.config.transfer_timeout,
        )?;
        trace!(
            len = reply.len(),
            report_hex = format_args!("{:02X?}", &reply[..reply.len().min(10)]),
            "RX"
        );
        Ok(reply)
    }

    /// Release the interface and close the device. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Some(number) = self.claimed.take() {
            if let Err(e) = self.handle.release_interface(number) {
                warn!(interface = number, error = %e, "Failed to release interface");
            }
        }
        self.handle.close();
        self.state = SessionState::Closed;
        debug!(model = self.descriptor.name, "Session closed");
    }
}

impl Drop for TransferSession<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
