//! FT017TH receiver
//!
//! Receives transmissions of FT017TH thermo/hygrometers via a CC1101
//! packet source and prints one line per decoded measurement.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wireless_sensor::config::Config;
use wireless_sensor::{Measurement, PipeTransceiver, ReceiveSession, SensorCapture};

/// Upper bound for the capture thread to wind down after Ctrl+C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Receive & decode signals of FT017TH thermo/hygrometers", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Print measurements as JSON objects instead of tab separated lines
    #[arg(long)]
    json: bool,

    /// Stop after this many seconds without a measurement
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_seconds: Option<u64>,

    /// Release the transceiver lock after configuring it
    #[arg(long)]
    unlock_spi_device: bool,
}

/// Install the log subscriber; `RUST_LOG` takes precedence over `--debug`
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_measurement(measurement: &Measurement, json: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer(&mut stdout, measurement)?;
        writeln!(stdout)?;
    } else {
        writeln!(stdout, "{}", measurement)?;
    }
    stdout.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let mut config = Config::from_env();
    if let Some(timeout_seconds) = args.timeout_seconds {
        config.timeout_seconds = timeout_seconds;
    }
    if args.unlock_spi_device {
        config.unlock_spi_device = true;
    }

    info!("Configuration:");
    info!("  Packet source: {}", config.packet_source);
    info!("  GDO0 GPIO line: {}", config.gdo0_gpio_line);
    info!("  Lock file: {}", config.lock_path.display());
    info!("  Timeout: {} s", config.timeout_seconds);
    info!("  Unlock SPI device: {}", config.unlock_spi_device);

    let transceiver = PipeTransceiver::new(
        &config.packet_source,
        &config.gdo0_gpio_line,
        &config.lock_path,
    );
    let interrupt = transceiver.interrupt_handle();
    let session = ReceiveSession::new(transceiver, config.session_config())?;
    let (capture, mut measurements) = SensorCapture::start(session)?;

    loop {
        tokio::select! {
            item = measurements.next() => match item {
                Some(Some(measurement)) => print_measurement(&measurement, args.json)?,
                Some(None) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping capture...");
                break;
            }
        }
    }

    // Cleanup: wake a pending packet wait so the session can release the transceiver
    capture.stop();
    interrupt.interrupt();
    drop(measurements);
    let stats = capture.stats().clone();
    let join = tokio::task::spawn_blocking(move || capture.join());
    match tokio::time::timeout(SHUTDOWN_GRACE, join).await {
        Ok(joined) => joined.context("Capture thread failed")?,
        Err(_) => warn!("Capture thread still busy, exiting anyway"),
    }

    info!("Shutdown complete. {}", stats);
    Ok(())
}
