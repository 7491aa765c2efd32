//! Battery polling cycle and the outcome handed to consumers.
//!
//! One cycle locates a device, opens a session, asks for the battery level and
//! the charging state, and closes the session. Every failure on the way is
//! logged and reported as [`PollOutcome::Unreachable`].

use crate::error::{Error, Result};
use crate::frame::{self, commands};
use crate::locator;
use crate::session::{SessionConfig, TransferSession};
use crate::transport::{Delay, UsbBackend};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Interval at which hosts are expected to call [`BatteryPoller::poll_once`].
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Label shown by consumers when no reading is available.
pub const DISCONNECTED_LABEL: &str = "Device disconnected";

/// Classification of poll errors for logging decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// No supported device attached. Expected steady state.
    Absent,
    /// The USB stack refused to enumerate, open, configure, or claim.
    Lifecycle,
    /// A control transfer failed or timed out.
    Transfer,
    /// The device answered with a frame too short to decode.
    Malformed,
}

impl ErrorClass {
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::DeviceNotFound(_) => Self::Absent,
            Error::Enumeration(_)
            | Error::Open(_)
            | Error::Configuration(_)
            | Error::InterfaceClaim(_) => Self::Lifecycle,
            Error::TransferTimeout(_) | Error::Transfer(_) => Self::Transfer,
            Error::Decode { .. } => Self::Malformed,
        }
    }

    /// Whether this class is part of normal operation and not worth a warning.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Battery reading from one polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryState {
    /// Percentage in `[0, 100]`, one decimal.
    pub battery_percent: f64,
    pub is_charging: bool,
}

impl BatteryState {
    /// Tooltip-style text, e.g. `"Charging: 50.2%"`.
    pub fn summary(&self) -> String {
        if self.is_charging {
            format!("Charging: {:.1}%", self.battery_percent)
        } else {
            format!("{:.1}%", self.battery_percent)
        }
    }

    /// Percentage floored to a multiple of ten, for picking a level icon.
    pub fn icon_level(&self) -> u8 {
        let tens = (self.battery_percent.clamp(0.0, 100.0) / 10.0).floor() as u8;
        tens * 10
    }
}

/// Result of one polling cycle as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollOutcome {
    Ready(BatteryState),
    Unreachable,
}

impl PollOutcome {
    pub fn state(&self) -> Option<BatteryState> {
        match self {
            Self::Ready(state) => Some(*state),
            Self::Unreachable => None,
        }
    }
}

/// Receiver for poll results, e.g. a tray icon.
pub trait BatterySink {
    fn publish(&mut self, state: BatteryState);

    /// Called instead of `publish` when no reading is available.
    fn disconnected(&mut self);
}

/// Sink that remembers the most recent reading.
///
/// A disconnected cycle does not clear the last state; consumers keep showing
/// it until a new reading arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LastKnown {
    pub state: Option<BatteryState>,
    pub connected: bool,
}

impl BatterySink for LastKnown {
    fn publish(&mut self, state: BatteryState) {
        self.state = Some(state);
        self.connected = true;
    }

    fn disconnected(&mut self) {
        self.connected = false;
    }
}

/// Runs polling cycles against a USB backend.
pub struct BatteryPoller {
    backend: Box<dyn UsbBackend>,
    delay: Box<dyn Delay>,
    config: SessionConfig,
}

impl BatteryPoller {
    pub fn new(backend: Box<dyn UsbBackend>, delay: Box<dyn Delay>) -> Self {
        Self::with_config(backend, delay, SessionConfig::default())
    }

    pub fn with_config(
        backend: Box<dyn UsbBackend>,
        delay: Box<dyn Delay>,
        config: SessionConfig,
    ) -> Self {
        Self {
            backend,
            delay,
            config,
        }
    }

    /// Run one cycle and return the raw reading or the error that stopped it.
    ///
    /// A zero reading is returned as-is; [`BatteryPoller::poll_once`] applies
    /// the unreachable policy.
    pub fn try_poll(&self) -> Result<BatteryState> {
        let candidate = locator::find_candidate(&*self.backend)?;
        let mut session = TransferSession::open(
            &*self.backend,
            &candidate,
            &*self.delay,
            self.config,
        )?;
        let result = read_state(&mut session);
        session.close();
        result
    }

    /// Run one cycle, collapsing every failure into `Unreachable`.
    pub fn poll_once(&self) -> PollOutcome {
        match self.try_poll() {
            // The protocol cannot tell an empty battery from a missing reply.
            Ok(state) if state.battery_percent == 0.0 => {
                debug!("Zero battery reading, treating device as unreachable");
                PollOutcome::Unreachable
            }
            Ok(state) => {
                debug!(
                    battery_percent = state.battery_percent,
                    is_charging = state.is_charging,
                    "Poll complete"
                );
                PollOutcome::Ready(state)
            }
            Err(e) => {
                let class = ErrorClass::classify(&e);
                if class.is_expected() {
                    debug!("No supported device: {}", e);
                } else {
                    warn!("Battery poll failed (class={:?}): {}", class, e);
                }
                PollOutcome::Unreachable
            }
        }
    }

    /// Run one cycle and hand the outcome to `sink`.
    pub fn deliver(&self, sink: &mut dyn BatterySink) -> PollOutcome {
        let outcome = self.poll_once();
        match outcome {
            PollOutcome::Ready(state) => sink.publish(state),
            PollOutcome::Unreachable => sink.disconnected(),
        }
        outcome
    }
}

fn read_state(session: &mut TransferSession<'_>) -> Result<BatteryState> {
    session.ensure_configuration()?;
    session.claim_primary_interface()?;

    let level = session.query(commands::BATTERY_LEVEL)?;
    let charging = session.query(commands::CHARGING_STATE)?;

    Ok(BatteryState {
        battery_percent: frame::decode_battery_percent(&level)?,
        is_charging: frame::decode_charging_flag(&charging)?,
    })
}
