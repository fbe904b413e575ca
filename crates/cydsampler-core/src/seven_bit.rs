//! 7-bit packing for SysEx payloads
//!
//! MIDI data bytes must stay below `0x80`. The encoder treats its input as one
//! contiguous bitstream, most significant bit first, and emits a byte every
//! time seven bits have accumulated. The decoder does the inverse with eight
//! bit groups.
//!
//! Neither side pads. Bits that do not fill a complete group are dropped, so
//! a round trip is lossless only when `len * 8` is a multiple of 7. For any
//! other length `n` the round trip yields exactly the first `n - 1` bytes.

/// Pack 8-bit bytes into 7-bit MIDI data bytes.
pub fn encode_7bit(data: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(data.len() * 8 / 7);
    let mut acc: u16 = 0;
    let mut bits = 0u32;

    for &byte in data {
        acc = (acc << 8) | u16::from(byte);
        bits += 8;
        while bits >= 7 {
            bits -= 7;
            encoded.push(((acc >> bits) & 0x7F) as u8);
        }
        acc &= (1 << bits) - 1;
    }

    encoded
}

/// Unpack 7-bit MIDI data bytes into 8-bit bytes.
///
/// Only the low seven bits of each input byte are used.
pub fn decode_7bit(encoded: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(encoded.len() * 7 / 8);
    let mut acc: u16 = 0;
    let mut bits = 0u32;

    for &byte in encoded {
        acc = (acc << 7) | u16::from(byte & 0x7F);
        bits += 7;
        if bits >= 8 {
            bits -= 8;
            decoded.push((acc >> bits) as u8);
        }
        acc &= (1 << bits) - 1;
    }

    decoded
}
