//! Reconcile the three message repeats of a transmission

use super::bits::unpack_bits;
use super::message::{decode_message, BitMessage, DecodeError, MESSAGE_LENGTH_BITS};
use crate::measurement::Measurement;

/// Repeats of the message per transmission
pub const MESSAGE_REPEATS: usize = 3;

/// Bits occupied by all repeats
pub const TRANSMISSION_LENGTH_BITS: usize = MESSAGE_LENGTH_BITS * MESSAGE_REPEATS;

/// Expected raw signal length, sync word included
pub const TRANSMISSION_LENGTH_BYTES: usize = TRANSMISSION_LENGTH_BITS.div_ceil(8);

/// Decode a raw signal (sync word + packet payload).
///
/// The transceiver occasionally corrupts the leading edge of the first repeat,
/// so repeat 0 is accepted if it matches either of the later repeats.
pub fn decode_transmission(signal: &[u8]) -> Result<Measurement, DecodeError> {
    let repeats = split_repeats(signal)?;
    if repeats[0] == repeats[1] || repeats[0] == repeats[2] {
        return decode_message(&repeats[0]);
    }
    // occurs approx every 5 seconds
    Err(DecodeError::RepeatsMismatch)
}

fn split_repeats(signal: &[u8]) -> Result<[BitMessage; MESSAGE_REPEATS], DecodeError> {
    let bits = unpack_bits(signal);
    if bits.len() < TRANSMISSION_LENGTH_BITS {
        return Err(DecodeError::SignalTooShort {
            bits: bits.len(),
            expected: TRANSMISSION_LENGTH_BITS,
        });
    }

    let mut repeats = [BitMessage::new([false; MESSAGE_LENGTH_BITS]); MESSAGE_REPEATS];
    for (repeat, chunk) in repeats
        .iter_mut()
        .zip(bits[..TRANSMISSION_LENGTH_BITS].chunks_exact(MESSAGE_LENGTH_BITS))
    {
        let mut message = [false; MESSAGE_LENGTH_BITS];
        message.copy_from_slice(chunk);
        *repeat = BitMessage::new(message);
    }
    Ok(repeats)
}
