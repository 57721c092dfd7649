//! FT017TH thermo/hygrometer protocol
//!
//! Each transmission carries the same 65-bit message three times:
//! - bits 0..8: prefix, all ones
//! - bits 8..32: address & battery (undecoded)
//! - bits 32..44: temperature index
//! - bits 44..56: relative humidity index
//! - bits 56..65: suffix, probably a checksum (undecoded)

mod bits;
pub mod message;
pub mod transmission;

pub use message::{decode_message, BitMessage, DecodeError, MESSAGE_LENGTH_BITS};
pub use transmission::{
    decode_transmission, MESSAGE_REPEATS, TRANSMISSION_LENGTH_BITS, TRANSMISSION_LENGTH_BYTES,
};

/// Sync word the transceiver matches on, stripped from the received payload.
/// The second byte might be sender specific.
pub const SYNC_WORD: [u8; 2] = [0xff, 0xa8];
