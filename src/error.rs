//! # Radio Error Handling
//!
//! This module defines the RadioError enum, which represents the different
//! error types that can occur in the wmbus-radio crate.

use crate::radio::encoding::ThreeOutOfSixError;
use crate::radio::hal::HalError;
use thiserror::Error;

/// Represents the different error types that can occur in the radio crate.
#[derive(Debug, Error)]
pub enum RadioError {
    /// A register or FIFO transaction did not complete. Fatal to the
    /// in-progress frame only; the state machine restarts.
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// The chip did not respond with plausible identity bytes at setup.
    /// Fatal to the transceiver; no further receive attempts are made.
    #[error("Chip not detected (version register read 0x{version:02X}) - check SPI wiring")]
    ChipNotDetected { version: u8 },

    /// The frame header did not match any known framing convention.
    #[error("Unrecognized frame header: block type 0x{block_type:02X}")]
    UnknownBlockType { block_type: u8 },

    /// The RX FIFO overflowed during active reception.
    #[error("RX FIFO overflow")]
    FifoOverflow,

    /// A frame grew past the maximum supported size.
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// The 3-of-6 line decoder rejected the accumulated buffer.
    #[error("3-of-6 decode error: {0}")]
    Decode(#[from] ThreeOutOfSixError),

    /// Invalid transceiver configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A received packet could not be interpreted as a wM-Bus frame.
    #[error("Error converting packet to frame: {0}")]
    FrameConversion(String),
}
