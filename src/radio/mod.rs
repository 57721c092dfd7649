//! Radio transceiver seam
//!
//! The register level CC1101 driver is external. The receive session only
//! needs exclusive acquisition, configuration and a bounded packet wait.

mod pipe;
mod settings;

use std::fmt;
use std::time::Duration;

pub use pipe::{parse_packet_line, InterruptHandle, PipeTransceiver};
pub use settings::{FilterBandwidth, RadioSettings, SyncMode};

/// Transceiver errors
#[derive(Debug, thiserror::Error)]
pub enum TransceiverError {
    /// Another process holds the exclusive lock
    #[error("transceiver locked by another process")]
    WouldBlock,
    #[error("transceiver not acquired")]
    NotAcquired,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Packet as delivered by the transceiver, sync word already stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPacket {
    pub payload: Vec<u8>,
    /// Raw RSSI register value
    pub rssi_index: u8,
    /// Ignored, the FT017TH protocol runs with the transceiver's checksum disabled
    pub checksum_valid: bool,
}

impl ReceivedPacket {
    /// RSSI in dBm (CC1101: two's complement half-dB steps, 74 dB offset)
    pub fn rssi_dbm(&self) -> f32 {
        f32::from(self.rssi_index as i8) / 2.0 - 74.0
    }
}

impl fmt::Display for ReceivedPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReceivedPacket(RSSI {:.0}dBm, 0x{})",
            self.rssi_dbm(),
            hex::encode(&self.payload)
        )
    }
}

/// Shared radio transceiver
pub trait Transceiver {
    /// Try to take the exclusive lock without blocking.
    /// Fails with [`TransceiverError::WouldBlock`] if another process holds it.
    fn acquire_exclusive(&mut self) -> Result<(), TransceiverError>;

    /// Apply the full radio configuration. Called after every acquisition.
    fn configure(&mut self, settings: &RadioSettings) -> Result<(), TransceiverError>;

    /// Give up the exclusive lock while keeping the configured receiver running
    fn release_shared_lock(&mut self) -> Result<(), TransceiverError>;

    /// Block up to `timeout` for the next packet
    fn wait_for_packet(&mut self, timeout: Duration) -> Option<ReceivedPacket>;

    /// Stop receiving and drop the lock, if still held
    fn release(&mut self);
}

impl<T: Transceiver + ?Sized> Transceiver for Box<T> {
    fn acquire_exclusive(&mut self) -> Result<(), TransceiverError> {
        (**self).acquire_exclusive()
    }

    fn configure(&mut self, settings: &RadioSettings) -> Result<(), TransceiverError> {
        (**self).configure(settings)
    }

    fn release_shared_lock(&mut self) -> Result<(), TransceiverError> {
        (**self).release_shared_lock()
    }

    fn wait_for_packet(&mut self, timeout: Duration) -> Option<ReceivedPacket> {
        (**self).wait_for_packet(timeout)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
