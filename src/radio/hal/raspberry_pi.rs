//! # Raspberry Pi HAL Implementation
//!
//! Hardware abstraction layer for Raspberry Pi 4 and 5, providing SPI
//! communication and GPIO control for the CC1101 and SX1276 transceivers
//! via the `rppal` crate.
//!
//! ## Hardware Setup
//!
//! SPI must be enabled in `/boot/config.txt` (`dtparam=spi=on`). All pin
//! numbers use BCM GPIO numbering, not physical header positions.
//!
//! ```text
//! Pi Pin │ BCM GPIO │ Radio Pin  │ Function
//! ───────┼──────────┼────────────┼─────────────
//! 19     │ GPIO 10  │ MOSI       │ SPI data out
//! 21     │ GPIO 9   │ MISO       │ SPI data in
//! 23     │ GPIO 11  │ SCLK       │ SPI clock
//! 24     │ GPIO 8   │ CSn        │ Chip select
//! ```
//!
//! Status lines (CC1101 GDO0/GDO2, SX1276 DIO0) and the optional reset line
//! are registered by BCM number through [`SpiPins`].

use super::{Hal, HalError};
use crate::radio::irq::IrqSignal;
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::spi::{BitOrder, Bus, Error as SpiError, Mode, SlaveSelect, Spi};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors specific to the Raspberry Pi HAL implementation
#[derive(Error, Debug)]
pub enum RpiHalError {
    /// SPI bus initialization failed
    #[error("SPI initialization failed: {0}")]
    SpiInit(#[from] SpiError),
    /// GPIO initialization failed
    #[error("GPIO initialization failed: {0}")]
    GpioInit(#[from] rppal::gpio::Error),
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Pin assignment for one transceiver
#[derive(Debug, Clone, Default)]
pub struct SpiPins {
    /// Input status lines by BCM number (CC1101: GDO0 and GDO2;
    /// SX1276: DIO0)
    pub inputs: Vec<u8>,
    /// Reset line (output, active low), if wired
    pub reset: Option<u8>,
}

/// Raspberry Pi HAL backed by hardware SPI and rppal GPIO.
pub struct RaspberryPiHal {
    spi: Spi,
    input_pins: HashMap<u8, InputPin>,
    reset_pin: Option<(u8, OutputPin)>,
}

impl RaspberryPiHal {
    /// Initialize SPI bus `spi_bus` (0 or 1) and claim the configured pins.
    ///
    /// The SPI interface runs at 2 MHz, mode 0, MSB first, which both
    /// supported chips tolerate.
    pub fn new(spi_bus: u8, pins: &SpiPins) -> Result<Self, RpiHalError> {
        let (bus, slave_select) = match spi_bus {
            0 => (Bus::Spi0, SlaveSelect::Ss0),
            1 => (Bus::Spi1, SlaveSelect::Ss0),
            _ => {
                return Err(RpiHalError::InvalidConfig(format!(
                    "Invalid SPI bus {}, only 0 and 1 are supported",
                    spi_bus
                )))
            }
        };

        let spi = Spi::new(bus, slave_select, 2_000_000, Mode::Mode0)?
            .bit_order(BitOrder::MsbFirst);

        let gpio = Gpio::new()?;

        let mut input_pins = HashMap::new();
        for &bcm in &pins.inputs {
            input_pins.insert(bcm, gpio.get(bcm)?.into_input());
        }

        let reset_pin = match pins.reset {
            Some(bcm) => {
                let mut pin = gpio.get(bcm)?.into_output();
                pin.set_high(); // reset is active low, start deasserted
                Some((bcm, pin))
            }
            None => None,
        };

        log::info!("Raspberry Pi HAL initialized: SPI{}", spi_bus);
        for &bcm in &pins.inputs {
            log::info!("  input: GPIO {}", bcm);
        }
        if let Some(bcm) = pins.reset {
            log::info!("  reset: GPIO {}", bcm);
        }

        Ok(Self {
            spi,
            input_pins,
            reset_pin,
        })
    }

    /// Route the rising edge of `pin` (the DIO line asserting) to `signal`.
    ///
    /// The rppal interrupt callback runs on its own thread and does nothing
    /// but notify the signal — no register or buffer access.
    pub fn attach_irq_signal(&mut self, pin: u8, signal: Arc<IrqSignal>) -> Result<(), RpiHalError> {
        let input = self
            .input_pins
            .get_mut(&pin)
            .ok_or_else(|| RpiHalError::InvalidConfig(format!("GPIO {} not claimed", pin)))?;

        input.set_async_interrupt(Trigger::RisingEdge, move |_| {
            signal.notify();
        })?;
        Ok(())
    }
}

impl Hal for RaspberryPiHal {
    fn spi_transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), HalError> {
        self.spi.transfer(rx, tx).map_err(|e| {
            log::error!("SPI transfer failed: {}", e);
            HalError::Spi
        })?;
        Ok(())
    }

    fn gpio_read(&mut self, pin: u8) -> Result<bool, HalError> {
        self.input_pins
            .get(&pin)
            .map(|p| p.is_high())
            .ok_or(HalError::UnknownPin(pin))
    }

    fn gpio_write(&mut self, pin: u8, level: bool) -> Result<(), HalError> {
        match &mut self.reset_pin {
            Some((bcm, out)) if *bcm == pin => {
                if level {
                    out.set_high();
                } else {
                    out.set_low();
                }
                Ok(())
            }
            _ => Err(HalError::UnknownPin(pin)),
        }
    }
}
