//! razer-battery CLI: read the battery state of a Razer wireless mouse.

use anyhow::Result;
use clap::{Parser, Subcommand};
use razer_battery_core::poller::{
    BatteryPoller, BatterySink, BatteryState, PollOutcome, DISCONNECTED_LABEL, POLL_INTERVAL,
};
use razer_battery_core::session::SessionConfig;
use razer_battery_core::transport::ThreadDelay;
use razer_battery_core::usb::NusbBackend;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "razer-battery",
    version,
    about = "Battery level of Razer wireless mice"
)]
struct Cli {
    /// Deadline for each USB control transfer, in milliseconds.
    #[arg(long, global = true, default_value_t = 1000)]
    timeout_ms: u64,

    /// Detach the kernel HID driver before claiming the interface (Linux).
    #[arg(long, global = true)]
    detach_kernel_driver: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected supported Razer mice.
    ListDevices,
    /// List every supported model.
    Supported,
    /// Read the battery state once.
    Status {
        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Read the battery state every 30 seconds until interrupted.
    Watch {
        /// Print each outcome as a JSON line.
        #[arg(long)]
        json: bool,
    },
}

/// Prints each outcome to stdout.
struct StdoutSink {
    json: bool,
}

impl StdoutSink {
    fn print_json(&self, outcome: &PollOutcome) {
        match serde_json::to_string(outcome) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("failed to serialize outcome: {e}"),
        }
    }
}

impl BatterySink for StdoutSink {
    fn publish(&mut self, state: BatteryState) {
        if self.json {
            self.print_json(&PollOutcome::Ready(state));
        } else {
            println!("{}", state.summary());
        }
    }

    fn disconnected(&mut self) {
        if self.json {
            self.print_json(&PollOutcome::Unreachable);
        } else {
            println!("{DISCONNECTED_LABEL}");
        }
    }
}

/// `status` fails when no reading is available, in text and JSON mode alike.
fn ensure_reading(outcome: PollOutcome) -> Result<BatteryState> {
    match outcome.state() {
        Some(state) => Ok(state),
        None => anyhow::bail!("no battery reading available"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let backend = NusbBackend::new().detach_kernel_driver(cli.detach_kernel_driver);
    let config = SessionConfig {
        transfer_timeout: Duration::from_millis(cli.timeout_ms),
    };

    match cli.command {
        Commands::ListDevices => {
            let devices = razer_battery_core::locator::discover_devices(&backend)?;
            if devices.is_empty() {
                println!("No supported Razer mice found.");
                println!("Ensure the mouse or its dongle is plugged in and USB access is allowed.");
            } else {
                for dev in &devices {
                    println!("{}", dev.label());
                }
            }
        }
        Commands::Supported => {
            for model in razer_battery_core::catalog::all() {
                println!(
                    "0x{:04X}  {:<36} transaction 0x{:02X}",
                    model.product_id, model.name, model.transaction_id
                );
            }
        }
        Commands::Status { json } => {
            let poller =
                BatteryPoller::with_config(Box::new(backend), Box::new(ThreadDelay), config);
            let outcome = poller.deliver(&mut StdoutSink { json });
            ensure_reading(outcome)?;
        }
        Commands::Watch { json } => {
            let poller =
                BatteryPoller::with_config(Box::new(backend), Box::new(ThreadDelay), config);
            let mut sink = StdoutSink { json };
            loop {
                poller.deliver(&mut sink);
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_fails_without_reading() {
        assert!(ensure_reading(PollOutcome::Unreachable).is_err());

        let state = BatteryState {
            battery_percent: 50.2,
            is_charging: true,
        };
        assert_eq!(ensure_reading(PollOutcome::Ready(state)).unwrap(), state);
    }
}
