//! CC1101 configuration for the FT017TH

use std::fmt;

use crate::ft017th::{SYNC_WORD, TRANSMISSION_LENGTH_BYTES};

/// CC1101 crystal frequency
const CRYSTAL_FREQUENCY_HZ: f64 = 26_000_000.0;

/// Sync word detection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// 16 sync bits transmitted, 15 of them must match
    Transmit16Match15Bits,
    Transmit16Match16Bits,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transmit16Match15Bits => f.write_str("16/15"),
            Self::Transmit16Match16Bits => f.write_str("16/16"),
        }
    }
}

/// Receive filter bandwidth register fields (MDMCFG4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterBandwidth {
    pub mantissa: u8,
    pub exponent: u8,
}

impl FilterBandwidth {
    pub fn hertz(&self) -> f64 {
        CRYSTAL_FREQUENCY_HZ
            / (8.0 * f64::from(4 + self.mantissa) * f64::from(1u16 << self.exponent))
    }
}

/// Complete radio configuration, reapplied after every acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct RadioSettings {
    pub base_frequency_hz: u32,
    pub symbol_rate_baud: u32,
    pub sync_word: [u8; 2],
    pub sync_mode: SyncMode,
    pub carrier_sense_threshold: bool,
    pub manchester_encoding: bool,
    pub checksum: bool,
    /// Fixed payload length, sync word excluded
    pub packet_length_bytes: usize,
    pub filter_bandwidth: FilterBandwidth,
}

impl RadioSettings {
    pub fn ft017th() -> Self {
        Self {
            base_frequency_hz: 433_945_000,
            symbol_rate_baud: 2048,
            sync_word: SYNC_WORD,
            sync_mode: SyncMode::Transmit16Match15Bits,
            carrier_sense_threshold: true,
            manchester_encoding: true,
            checksum: false,
            packet_length_bytes: TRANSMISSION_LENGTH_BYTES - SYNC_WORD.len(),
            filter_bandwidth: FilterBandwidth {
                mantissa: 3,
                exponent: 3,
            },
        }
    }
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self::ft017th()
    }
}

impl fmt::Display for RadioSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CC1101(frequency={:.3}MHz, symbol_rate={}Baud, sync_word=0x{}, sync_mode={}, \
             manchester={}, checksum={}, packet_length={}B)",
            f64::from(self.base_frequency_hz) / 1e6,
            self.symbol_rate_baud,
            hex::encode(self.sync_word),
            self.sync_mode,
            self.manchester_encoding,
            self.checksum,
            self.packet_length_bytes,
        )
    }
}
