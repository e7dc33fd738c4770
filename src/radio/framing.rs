//! # wM-Bus Frame Classification
//!
//! Both transceiver variants strip the 0x543D sync word in hardware, so the
//! first bytes out of the FIFO are one of three things:
//!
//! - `54 CD L ..` / `54 3D L ..` — Mode C with the frame-type preamble still
//!   present (block A or block B length formulas apply),
//! - a stream of valid 3-of-6 symbols — Mode T, with the L-field in the
//!   first decoded byte,
//! - `L C M M ..` — Mode C with the preamble consumed by the sync match; the
//!   preamble bytes are reconstructed synthetically so downstream logic is
//!   convention-agnostic.
//!
//! Classification has to happen from the first four raw bytes alone, before
//! the total frame length is known, because the receive path needs the
//! expected length to renegotiate the chip's packet-length mode mid-frame.

use crate::error::RadioError;
use crate::radio::encoding::{decode_3of6, encoded_size};

/// Mode C/T frame-type preamble byte (first byte after the sync word)
pub const MODE_C_PREAMBLE: u8 = 0x54;
/// Mode C frame type A marker
pub const BLOCK_A_PREAMBLE: u8 = 0xCD;
/// Mode C frame type B marker
pub const BLOCK_B_PREAMBLE: u8 = 0x3D;

/// Number of raw bytes read to classify a frame. Four bytes cover one full
/// group of 3-of-6 symbols, enough to test ternary validity.
pub const HEADER_SIZE: usize = 4;

/// wM-Bus link mode detected from the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WMBusMode {
    /// Mode T (T1): 100 kbps, 2-FSK, 3-of-6 line coding
    T,
    /// Mode C (C1): 100 kbps, 2-FSK, NRZ
    C,
}

/// wM-Bus block (frame) type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WMBusBlock {
    /// Frame type A: CRC block every 16 data bytes
    A,
    /// Frame type B: single length-prefixed block
    B,
}

/// Result of classifying a frame header: everything the receive state
/// machine needs to finish the frame.
#[derive(Debug, Clone)]
pub struct FrameFormat {
    pub mode: WMBusMode,
    pub block: WMBusBlock,
    /// L-field as transmitted (for Mode T: after 3-of-6 decode)
    pub length_field: u8,
    /// Total raw bytes expected in the FIFO for this frame, counted from
    /// the first byte after the sync word
    pub expected_length: usize,
    /// Bytes retained in the accumulator after the header read
    pub seed: Vec<u8>,
    /// Accumulator byte count after the header read (includes synthesized
    /// preamble bytes, excludes discarded ones)
    pub bytes_received: usize,
}

/// Frame type A on-air size for a given L-field: the data bytes plus one
/// 2-byte CRC per started 16-byte block, plus the L-field itself.
pub fn mode_t_packet_size(l_field: u8) -> usize {
    let data_bytes = l_field as usize;
    let crc_bytes = (data_bytes + 15) / 16 * 2;
    data_bytes + crc_bytes + 1
}

/// Classify a frame from its first [`HEADER_SIZE`] raw bytes.
///
/// Returns the detected format, or [`RadioError::UnknownBlockType`] when a
/// Mode C preamble carries an unrecognized frame-type marker.
pub fn classify_header(header: &[u8; HEADER_SIZE]) -> Result<FrameFormat, RadioError> {
    if header[0] == MODE_C_PREAMBLE {
        // Preamble still present: the byte after it selects the length formula.
        let length_field = header[2];
        let (block, expected_length) = match header[1] {
            BLOCK_A_PREAMBLE => (WMBusBlock::A, 2 + mode_t_packet_size(length_field)),
            BLOCK_B_PREAMBLE => (WMBusBlock::B, 2 + 1 + length_field as usize),
            other => return Err(RadioError::UnknownBlockType { block_type: other }),
        };

        // The preamble itself is not frame data: retain only the L-field.
        return Ok(FrameFormat {
            mode: WMBusMode::C,
            block,
            length_field,
            expected_length,
            seed: vec![length_field],
            bytes_received: 1,
        });
    }

    // No preamble byte. Mode T frames are 3-of-6 coded from the very first
    // byte, so a header whose first symbol group decodes cleanly is treated
    // as Mode T; anything else is Mode C with the preamble consumed by the
    // sync match. A Mode C frame whose first bytes happen to form valid
    // symbols is misclassified here; only the decode step catches it.
    if let Ok(decoded) = decode_3of6(&header[..3]) {
        let length_field = decoded[0];
        return Ok(FrameFormat {
            mode: WMBusMode::T,
            block: WMBusBlock::A,
            length_field,
            expected_length: encoded_size(mode_t_packet_size(length_field)),
            seed: header.to_vec(),
            bytes_received: HEADER_SIZE,
        });
    }

    let length_field = header[0];
    let mut seed = vec![MODE_C_PREAMBLE, BLOCK_A_PREAMBLE];
    seed.extend_from_slice(header);

    Ok(FrameFormat {
        mode: WMBusMode::C,
        block: WMBusBlock::A,
        length_field,
        expected_length: 2 + mode_t_packet_size(length_field),
        seed,
        bytes_received: 2 + HEADER_SIZE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_t_packet_size() {
        assert_eq!(mode_t_packet_size(10), 13); // 10 data + 2 CRC + L
        assert_eq!(mode_t_packet_size(16), 19); // one full CRC block
        assert_eq!(mode_t_packet_size(17), 22); // second block started
    }

    #[test]
    fn test_block_a_with_preamble() {
        let format = classify_header(&[0x54, 0xCD, 10, 0x44]).unwrap();
        assert_eq!(format.mode, WMBusMode::C);
        assert_eq!(format.block, WMBusBlock::A);
        assert_eq!(format.expected_length, 2 + mode_t_packet_size(10));
        assert_eq!(format.seed, vec![10]);
        assert_eq!(format.bytes_received, 1);
    }

    #[test]
    fn test_block_b_with_preamble() {
        let format = classify_header(&[0x54, 0x3D, 0x1E, 0x44]).unwrap();
        assert_eq!(format.block, WMBusBlock::B);
        assert_eq!(format.expected_length, 2 + 1 + 0x1E);
    }

    #[test]
    fn test_unknown_block_type() {
        let err = classify_header(&[0x54, 0x99, 0x1E, 0x44]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::RadioError::UnknownBlockType { block_type: 0x99 }
        ));
    }

    #[test]
    fn test_bare_header_synthesizes_preamble() {
        // 0x20 is not a valid first 3-of-6 symbol, so this is Mode C with
        // the preamble consumed by the sync word.
        let header = [0x20, 0x44, 0x2D, 0x2C];
        let format = classify_header(&header).unwrap();
        assert_eq!(format.mode, WMBusMode::C);
        assert_eq!(format.bytes_received, 6);
        assert_eq!(format.seed.len(), 6);
        assert_eq!(&format.seed[..2], &[0x54, 0xCD]);
        assert_eq!(&format.seed[2..], &header);
        assert_eq!(format.expected_length, 2 + mode_t_packet_size(0x20));
    }

    #[test]
    fn test_mode_t_detected_by_symbol_validity() {
        use crate::radio::encoding::encode_3of6;

        // Encode a frame starting with L = 0x14; the first header bytes are
        // then valid 3-of-6 symbols and must select Mode T.
        let coded = encode_3of6(&[0x14, 0x44, 0x2D]);
        let header = [coded[0], coded[1], coded[2], coded[3]];
        let format = classify_header(&header).unwrap();
        assert_eq!(format.mode, WMBusMode::T);
        assert_eq!(format.length_field, 0x14);
        assert_eq!(
            format.expected_length,
            crate::radio::encoding::encoded_size(mode_t_packet_size(0x14))
        );
        assert_eq!(format.bytes_received, HEADER_SIZE);
    }
}
