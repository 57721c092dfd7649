//! FT017TH message decoder

use std::fmt;

use tracing::debug;

use super::bits::{pack_bits, read_u16_left_aligned, to_bit_string};
use crate::measurement::Measurement;

/// Length of a single message repeat
pub const MESSAGE_LENGTH_BITS: usize = 65;

const PREFIX_BITS: usize = 8;
const ADDRESS_BITS: std::ops::Range<usize> = 8..32;
const TEMPERATURE_BITS: std::ops::Range<usize> = 32..44;
const HUMIDITY_BITS: std::ops::Range<usize> = 44..56;
const SUFFIX_BITS: std::ops::RangeFrom<usize> = 56..;

// Linear fits against the advertised operating range.
// Temperature: [-40°C, +60°C], intercept -40°C.
// Humidity: [10%, 99%], intercept 0%.
const TEMPERATURE_INDEX_PER_DEGREE: f64 = 576.077364;
const TEMPERATURE_OFFSET_DEGREES: f64 = -40.0;
const HUMIDITY_INDEX_PER_UNIT: f64 = 51451.432435;

/// Decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid prefix in message")]
    InvalidPrefix,
    #[error("repeats do not match")]
    RepeatsMismatch,
    #[error("signal too short: {bits} bits, expected at least {expected}")]
    SignalTooShort { bits: usize, expected: usize },
}

/// One 65-bit message repeat, big-endian bit order
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitMessage([bool; MESSAGE_LENGTH_BITS]);

impl BitMessage {
    pub fn new(bits: [bool; MESSAGE_LENGTH_BITS]) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    fn has_valid_prefix(&self) -> bool {
        self.0[..PREFIX_BITS].iter().all(|&bit| bit)
    }

    /// Parse a string of 65 '0'/'1' characters
    #[cfg(test)]
    pub(crate) fn from_bit_str(bits: &str) -> Self {
        let bits: Vec<bool> = bits.chars().map(|c| c == '1').collect();
        Self(bits.try_into().expect("65 bits"))
    }
}

impl fmt::Debug for BitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitMessage({})", self)
    }
}

impl fmt::Display for BitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_bit_string(&self.0))
    }
}

/// Decode a single message repeat into a measurement
pub fn decode_message(message: &BitMessage) -> Result<Measurement, DecodeError> {
    if !message.has_valid_prefix() {
        return Err(DecodeError::InvalidPrefix);
    }

    let bits = message.bits();
    let temperature_index = read_u16_left_aligned(&bits[TEMPERATURE_BITS]);
    let humidity_index = read_u16_left_aligned(&bits[HUMIDITY_BITS]);

    let temperature_degrees_celsius =
        f64::from(temperature_index) / TEMPERATURE_INDEX_PER_DEGREE + TEMPERATURE_OFFSET_DEGREES;
    let relative_humidity = f64::from(humidity_index) / HUMIDITY_INDEX_PER_UNIT;

    // address & battery? checksum?
    debug!(
        "undecoded prefix 0x{}, {:.02}°C, {:.01}%, undecoded suffix {}",
        hex::encode(pack_bits(&bits[ADDRESS_BITS])),
        temperature_degrees_celsius,
        relative_humidity * 100.0,
        to_bit_string(&bits[SUFFIX_BITS]),
    );

    Ok(Measurement::new(
        temperature_degrees_celsius,
        relative_humidity,
    ))
}
