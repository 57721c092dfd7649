//! Configuration loaded from environment variables

use std::path::PathBuf;

use crate::session::SessionConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Stop after this many seconds without a measurement
    pub timeout_seconds: u64,

    /// Release the transceiver lock after configuring
    pub unlock_spi_device: bool,

    /// External receiver command printing `*<payload hex>;` lines
    pub packet_source: String,

    /// Advisory lock file shared by all users of the transceiver
    pub lock_path: PathBuf,

    /// GPIO line connected to the transceiver's GDO0 pin
    pub gdo0_gpio_line: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            timeout_seconds: std::env::var("TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&seconds| seconds >= 1)
                .unwrap_or(3600),

            unlock_spi_device: std::env::var("UNLOCK_SPI_DEVICE")
                .map(|s| parse_flag(&s))
                .unwrap_or(false),

            packet_source: std::env::var("PACKET_SOURCE")
                .unwrap_or_else(|_| "cc1101-receive".to_string()),

            lock_path: std::env::var("LOCK_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/wireless-sensor.spidev0.0.lock")),

            gdo0_gpio_line: std::env::var("GDO0_GPIO_LINE")
                .unwrap_or_else(|_| "GPIO24".to_string()),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new(self.timeout_seconds);
        session.unlock_spi_device = self.unlock_spi_device;
        session
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
