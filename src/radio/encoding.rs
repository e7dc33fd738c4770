//! # 3-of-6 ("Ternary") Line Coding
//!
//! wM-Bus Mode T transmits every 4-bit nibble as a 6-bit symbol containing
//! exactly three 1-bits and three 0-bits (EN 13757-4). The balanced code
//! keeps the transmitted bit stream DC-free and lets the receiver reject
//! corrupted symbols outright.
//!
//! Symbols are packed most-significant-bit first and cross byte boundaries:
//! two decoded bytes (four nibbles) occupy exactly three encoded bytes.
//!
//! Decoding is all-or-nothing: a single invalid symbol aborts the whole
//! decode with no partial output, because a corrupted length or CRC nibble
//! would poison everything downstream.

use thiserror::Error;

/// Errors produced by the 3-of-6 decoder
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ThreeOutOfSixError {
    /// A 6-bit window did not match any valid ternary-balanced symbol.
    #[error("Invalid 3-of-6 symbol 0x{code:02X} at segment {segment}")]
    InvalidSymbol { segment: usize, code: u8 },

    /// An indexing computation would read past the end of the input.
    #[error("Buffer underrun at segment {segment}")]
    BufferUnderrun { segment: usize },
}

/// Valid 3-of-6 symbols indexed by nibble value (EN 13757-4 table)
const ENCODE_TABLE: [u8; 16] = [
    0b010110, // 0x0
    0b001101, // 0x1
    0b001110, // 0x2
    0b001011, // 0x3
    0b011100, // 0x4
    0b011001, // 0x5
    0b011010, // 0x6
    0b010011, // 0x7
    0b101100, // 0x8
    0b100101, // 0x9
    0b100110, // 0xA
    0b100011, // 0xB
    0b110100, // 0xC
    0b110001, // 0xD
    0b110010, // 0xE
    0b101001, // 0xF
];

/// Reverse lookup: 6-bit symbol to nibble, `None` for the 48 invalid codes
const fn build_decode_table() -> [Option<u8>; 64] {
    let mut table = [None; 64];
    let mut nibble = 0;
    while nibble < 16 {
        table[ENCODE_TABLE[nibble] as usize] = Some(nibble as u8);
        nibble += 1;
    }
    table
}

const DECODE_TABLE: [Option<u8>; 64] = build_decode_table();

/// Decode a 3-of-6 encoded buffer into plain bytes.
///
/// Processes `coded.len() * 8 / 6` complete 6-bit segments; trailing bits
/// that do not form a whole segment are ignored (they are padding on the
/// air). Two segments pack into one output byte, high nibble first.
///
/// Returns an error and no output at the first invalid symbol or when a
/// segment would read past the input.
pub fn decode_3of6(coded: &[u8]) -> Result<Vec<u8>, ThreeOutOfSixError> {
    let segments = coded.len() * 8 / 6;
    let mut decoded = Vec::with_capacity(segments / 2 + 1);

    for segment in 0..segments {
        let bit_idx = segment * 6;
        let byte_idx = bit_idx / 8;
        let bit_offset = bit_idx % 8;

        if byte_idx >= coded.len() {
            return Err(ThreeOutOfSixError::BufferUnderrun { segment });
        }

        let mut code = coded[byte_idx] << bit_offset;
        if bit_offset > 2 {
            // Symbol straddles a byte boundary
            if byte_idx + 1 >= coded.len() {
                return Err(ThreeOutOfSixError::BufferUnderrun { segment });
            }
            code |= coded[byte_idx + 1] >> (8 - bit_offset);
        }
        code >>= 2;

        let nibble = DECODE_TABLE[code as usize]
            .ok_or(ThreeOutOfSixError::InvalidSymbol { segment, code })?;

        if segment % 2 == 0 {
            decoded.push(nibble << 4);
        } else {
            *decoded.last_mut().unwrap() |= nibble;
        }
    }

    Ok(decoded)
}

/// Encode plain bytes into the 3-of-6 line code.
///
/// Each byte becomes two 6-bit symbols (high nibble first), bit-packed
/// most-significant-bit first. The final partial byte, present for odd
/// input lengths, is zero-padded.
pub fn encode_3of6(data: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(encoded_size(data.len()));
    let mut acc: u16 = 0;
    let mut bits = 0u8;

    for &byte in data {
        for nibble in [byte >> 4, byte & 0x0F] {
            acc = (acc << 6) | u16::from(ENCODE_TABLE[nibble as usize]);
            bits += 6;
            while bits >= 8 {
                bits -= 8;
                encoded.push((acc >> bits) as u8);
            }
        }
    }

    if bits > 0 {
        encoded.push((acc << (8 - bits)) as u8);
    }

    encoded
}

/// Number of raw (encoded) bytes carrying `decoded_len` decoded bytes.
///
/// Every two decoded bytes (four nibbles, 24 bits) occupy three encoded
/// bytes; an odd tail rounds up to the next whole byte. Used to predict how
/// many bytes must be received before a Mode T frame can be decoded.
pub fn encoded_size(decoded_len: usize) -> usize {
    (3 * decoded_len + 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_symbol_pair() {
        // 0b010110 0b001101 -> nibbles 0x0, 0x1 -> byte 0x01
        // Packed MSB-first: 010110_00 | 1101_0000 -> 0x58, 0xD0
        let coded = [0b0101_1000, 0b1101_0000];
        assert_eq!(decode_3of6(&coded).unwrap(), vec![0x01]);
    }

    #[test]
    fn test_roundtrip_all_byte_values() {
        for value in 0..=255u8 {
            let data = [value, value ^ 0xFF];
            let coded = encode_3of6(&data);
            assert_eq!(decode_3of6(&coded).unwrap(), data.to_vec());
        }
    }

    #[test]
    fn test_invalid_symbols_rejected() {
        // Every 6-bit pattern outside the table must fail, all 16 inside
        // must succeed when presented as an aligned first segment.
        for code in 0..64u8 {
            let coded = [code << 2, 0];
            let result = decode_3of6(&coded[..1]);
            match DECODE_TABLE[code as usize] {
                Some(nibble) => assert_eq!(result.unwrap(), vec![nibble << 4]),
                None => assert_eq!(
                    result.unwrap_err(),
                    ThreeOutOfSixError::InvalidSymbol { segment: 0, code }
                ),
            }
        }
    }

    #[test]
    fn test_encoded_size() {
        assert_eq!(encoded_size(0), 0);
        assert_eq!(encoded_size(1), 2);
        assert_eq!(encoded_size(2), 3);
        assert_eq!(encoded_size(16), 24);
        assert_eq!(encoded_size(17), 26);
    }

    #[test]
    fn test_encoded_size_matches_encoder_output() {
        for len in [0usize, 1, 2, 16, 17] {
            let data = vec![0xA5u8; len];
            assert_eq!(encode_3of6(&data).len(), encoded_size(len));
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode_3of6(&[]).unwrap(), Vec::<u8>::new());
        assert_eq!(encode_3of6(&[]), Vec::<u8>::new());
    }
}
