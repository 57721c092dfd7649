//! Bit level helpers (MSB first, as transmitted)

/// Unpack bytes into bits, most significant bit of each byte first
pub fn unpack_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
        .collect()
}

/// Pack bits into bytes, padding the last byte with zeros on the right
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &bit)| byte | ((bit as u8) << (7 - i)))
        })
        .collect()
}

/// Read up to 16 bits as a big-endian u16, left aligned.
///
/// A 12-bit field `abc` comes back as `abc0` (value shifted left by 4).
pub fn read_u16_left_aligned(bits: &[bool]) -> u16 {
    debug_assert!(bits.len() <= 16);
    bits.iter()
        .enumerate()
        .fold(0u16, |value, (i, &bit)| value | ((bit as u16) << (15 - i)))
}

/// Render bits as a string of '0' and '1'
pub fn to_bit_string(bits: &[bool]) -> String {
    bits.iter().map(|&bit| if bit { '1' } else { '0' }).collect()
}
