//! # Hardware Abstraction Layer for Radio Hardware
//!
//! This module defines the HAL trait used by both transceiver drivers. It
//! covers exactly what the chips need: full-duplex SPI transfers and access
//! to the handful of status/control GPIO lines (CC1101 GDO0/GDO2, SX1276
//! IRQ and reset).
//!
//! Platform implementations live in submodules; a chip-simulating mock for
//! tests is always compiled.

use thiserror::Error;

/// Errors that can occur during HAL operations
#[derive(Debug, Error)]
pub enum HalError {
    #[error("SPI communication error")]
    Spi,

    #[error("GPIO operation error")]
    Gpio,

    #[error("Unconfigured GPIO pin: {0}")]
    UnknownPin(u8),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Hardware Abstraction Layer trait for transceiver control
///
/// All operations are synchronous and block for the duration of one bus
/// transaction. A failed transaction is surfaced to the calling state
/// machine step, never retried here.
pub trait Hal {
    /// Full-duplex SPI transfer: clock out `tx` while filling `rx`.
    /// Both slices must have the same length.
    fn spi_transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), HalError>;

    /// Read the state of a GPIO input pin
    fn gpio_read(&mut self, pin: u8) -> Result<bool, HalError>;

    /// Write to a GPIO output pin
    fn gpio_write(&mut self, pin: u8, level: bool) -> Result<(), HalError>;
}

// Chip-simulating mocks for tests
pub mod mock;

// Platform implementations
#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

#[cfg(feature = "raspberry-pi")]
pub use raspberry_pi::{RaspberryPiHal, SpiPins};
