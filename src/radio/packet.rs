//! # Packet and Frame Model
//!
//! A [`Packet`] is the raw output of the receive path: one completed byte
//! buffer, the RSSI sampled at completion, and the framing convention the
//! state machine detected. It is consumed exactly once, by conversion into
//! a [`Frame`] — the validated protocol-unit view handed to registered
//! handlers — or discarded when that conversion fails.

use crate::error::RadioError;
use crate::radio::framing::{WMBusMode, BLOCK_A_PREAMBLE, BLOCK_B_PREAMBLE, MODE_C_PREAMBLE};
use crate::radio::transceiver::RawFrame;
use crate::util::hex::encode_hex;

/// wM-Bus link mode of a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    T1,
    C1,
}

impl LinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::T1 => "T1",
            LinkMode::C1 => "C1",
        }
    }
}

impl std::fmt::Display for LinkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed raw byte buffer with its RSSI sample.
#[derive(Debug, Clone)]
pub struct Packet {
    raw: RawFrame,
    rssi_dbm: i8,
}

impl Packet {
    pub fn new(raw: RawFrame, rssi_dbm: i8) -> Self {
        Self { raw, rssi_dbm }
    }

    pub fn payload_size(&self) -> usize {
        self.raw.data.len()
    }

    pub fn rssi_dbm(&self) -> i8 {
        self.rssi_dbm
    }

    /// Interpret the packet as a wM-Bus frame.
    ///
    /// Strips the Mode C frame-type preamble when present, so the frame
    /// data always starts at the L-field regardless of which framing
    /// convention was detected on the air. Fails when the buffer is too
    /// short for its own L-field.
    pub fn convert_to_frame(self) -> Result<Frame, RadioError> {
        let link_mode = match self.raw.mode {
            WMBusMode::T => LinkMode::T1,
            WMBusMode::C => LinkMode::C1,
        };

        let mut data = self.raw.data;
        if data.len() >= 2
            && data[0] == MODE_C_PREAMBLE
            && (data[1] == BLOCK_A_PREAMBLE || data[1] == BLOCK_B_PREAMBLE)
        {
            data.drain(..2);
        }

        let l_field = *data
            .first()
            .ok_or_else(|| RadioError::FrameConversion("empty packet".into()))?;

        if data.len() <= l_field as usize {
            return Err(RadioError::FrameConversion(format!(
                "buffer of {} bytes too short for L-field {}",
                data.len(),
                l_field
            )));
        }

        Ok(Frame {
            data,
            rssi_dbm: self.rssi_dbm,
            link_mode,
            handlers_count: 0,
        })
    }
}

/// A validated wM-Bus frame, immutable after construction apart from the
/// handler-invocation counter.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    rssi_dbm: i8,
    link_mode: LinkMode,
    handlers_count: u8,
}

impl Frame {
    /// Frame bytes, starting at the L-field.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn rssi_dbm(&self) -> i8 {
        self.rssi_dbm
    }

    pub fn link_mode(&self) -> LinkMode {
        self.link_mode
    }

    /// How many handlers claimed this frame.
    pub fn handlers_count(&self) -> u8 {
        self.handlers_count
    }

    /// Called by a handler that consumed the frame, for diagnostics.
    pub fn mark_as_handled(&mut self) {
        self.handlers_count = self.handlers_count.saturating_add(1);
    }

    /// Frame bytes as a lowercase hex string.
    pub fn as_hex(&self) -> String {
        encode_hex(&self.data)
    }

    /// One line in the rtlwmbus text format, suitable for piping into
    /// external analysis tools:
    /// `<mode>;1;1;<UTC timestamp>;<rssi>;;;0x<hex>`.
    pub fn as_rtlwmbus(&self) -> String {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "{};1;1;{};{};;;0x{}",
            self.link_mode,
            timestamp,
            self.rssi_dbm,
            self.as_hex()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::framing::WMBusBlock;

    fn raw(data: Vec<u8>, mode: WMBusMode) -> RawFrame {
        RawFrame {
            data,
            mode,
            block: WMBusBlock::A,
        }
    }

    #[test]
    fn test_preamble_stripped() {
        let mut data = vec![0x54, 0xCD, 0x05];
        data.extend_from_slice(&[0x44, 0x2D, 0x2C, 0x01, 0x02, 0xAA, 0xBB]);
        let packet = Packet::new(raw(data, WMBusMode::C), -74);
        let frame = packet.convert_to_frame().unwrap();
        assert_eq!(frame.data()[0], 0x05);
        assert_eq!(frame.link_mode(), LinkMode::C1);
        assert_eq!(frame.rssi_dbm(), -74);
    }

    #[test]
    fn test_bare_frame_kept_as_is() {
        let packet = Packet::new(raw(vec![0x03, 0x44, 0x2D, 0x2C, 0xAA], WMBusMode::T), -80);
        let frame = packet.convert_to_frame().unwrap();
        assert_eq!(frame.data(), &[0x03, 0x44, 0x2D, 0x2C, 0xAA]);
        assert_eq!(frame.link_mode(), LinkMode::T1);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let packet = Packet::new(raw(vec![0x20, 0x44], WMBusMode::C), -70);
        assert!(packet.convert_to_frame().is_err());
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let packet = Packet::new(raw(vec![], WMBusMode::C), -70);
        assert!(packet.convert_to_frame().is_err());
    }

    #[test]
    fn test_handler_counter() {
        let packet = Packet::new(raw(vec![0x01, 0x44, 0xAA], WMBusMode::C), -70);
        let mut frame = packet.convert_to_frame().unwrap();
        assert_eq!(frame.handlers_count(), 0);
        frame.mark_as_handled();
        frame.mark_as_handled();
        assert_eq!(frame.handlers_count(), 2);
    }

    #[test]
    fn test_rtlwmbus_line_shape() {
        let packet = Packet::new(raw(vec![0x02, 0x44, 0x2D], WMBusMode::C), -91);
        let frame = packet.convert_to_frame().unwrap();
        let line = frame.as_rtlwmbus();
        assert!(line.starts_with("C1;1;1;"));
        assert!(line.ends_with(";0x02442d"));
        assert!(line.contains(";-91;"));
    }
}
