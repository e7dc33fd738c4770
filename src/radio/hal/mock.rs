//! # Mock HAL Implementations
//!
//! Chip-level simulators backing the [`Hal`] trait for tests. Each mock
//! interprets the SPI traffic the way the real chip would (address byte,
//! burst flags, strobes) and exposes its internal state through a shared
//! handle so tests can feed FIFO bytes, toggle status lines, and inspect
//! issued strobes.

use super::{Hal, HalError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Simulated CC1101 chip state, shared between the mock bus and the test.
#[derive(Debug)]
pub struct Cc1101ChipState {
    /// Configuration register file (0x00..=0x2E)
    pub regs: [u8; 0x30],
    /// MARC state machine register value
    pub marcstate: u8,
    /// PARTNUM identity byte
    pub partnum: u8,
    /// VERSION identity byte (0x00 simulates a missing chip)
    pub version: u8,
    /// Raw RSSI register value
    pub rssi_raw: u8,
    /// RX FIFO contents
    pub fifo: VecDeque<u8>,
    /// RX FIFO overflow flag (bit 7 of RXBYTES)
    pub overflow: bool,
    /// GDO0 line level (FIFO threshold indicator)
    pub gdo0: bool,
    /// GDO2 line level (sync word detected indicator)
    pub gdo2: bool,
    /// Every strobe issued, in order
    pub strobes: Vec<u8>,
    /// Force every SPI transaction to fail
    pub fail_spi: bool,
}

impl Default for Cc1101ChipState {
    fn default() -> Self {
        Self {
            regs: [0; 0x30],
            marcstate: 0x01, // IDLE
            partnum: 0x00,
            version: 0x14,
            rssi_raw: 0x50,
            fifo: VecDeque::new(),
            overflow: false,
            gdo0: false,
            gdo2: false,
            strobes: Vec::new(),
            fail_spi: false,
        }
    }
}

impl Cc1101ChipState {
    /// Append received air bytes to the RX FIFO, setting the overflow flag
    /// past the 64-byte hardware capacity.
    pub fn feed(&mut self, data: &[u8]) {
        self.fifo.extend(data.iter().copied());
        if self.fifo.len() > 64 {
            self.overflow = true;
        }
    }
}

/// Mock SPI/GPIO bus simulating a CC1101.
pub struct MockCc1101Bus {
    pub state: Arc<Mutex<Cc1101ChipState>>,
    gdo0_pin: u8,
    gdo2_pin: u8,
}

const READ_SINGLE: u8 = 0x80;
const BURST: u8 = 0x40;

impl MockCc1101Bus {
    pub fn new(gdo0_pin: u8, gdo2_pin: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(Cc1101ChipState::default())),
            gdo0_pin,
            gdo2_pin,
        }
    }

    /// Shared handle for driving the simulated chip from a test.
    pub fn handle(&self) -> Arc<Mutex<Cc1101ChipState>> {
        Arc::clone(&self.state)
    }

    fn status_value(state: &Cc1101ChipState, addr: u8) -> u8 {
        match addr {
            0x30 => state.partnum,
            0x31 => state.version,
            0x34 => state.rssi_raw,
            0x35 => state.marcstate,
            0x3B => {
                let count = state.fifo.len().min(127) as u8;
                count | if state.overflow { 0x80 } else { 0 }
            }
            _ => 0,
        }
    }

    fn apply_strobe(state: &mut Cc1101ChipState, strobe: u8) {
        state.strobes.push(strobe);
        match strobe {
            0x30 => {
                // SRES: full chip reset
                state.regs = [0; 0x30];
                state.fifo.clear();
                state.overflow = false;
                state.marcstate = 0x01;
            }
            0x34 => state.marcstate = 0x0D, // SRX
            0x36 => state.marcstate = 0x01, // SIDLE
            0x3A => {
                // SFRX: flush RX FIFO
                state.fifo.clear();
                state.overflow = false;
                if state.marcstate == 0x11 {
                    state.marcstate = 0x01;
                }
            }
            _ => {}
        }
    }
}

impl Hal for MockCc1101Bus {
    fn spi_transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), HalError> {
        let mut state = self.state.lock().map_err(|_| HalError::Spi)?;
        if state.fail_spi {
            return Err(HalError::Spi);
        }

        let header = tx[0];
        let addr = header & 0x3F;

        if header & READ_SINGLE != 0 {
            if (0x30..=0x3D).contains(&addr) && header & BURST != 0 {
                // Status register read
                rx[1] = Self::status_value(&state, addr);
            } else if addr == 0x3F {
                // RX FIFO read (single or burst)
                for slot in rx.iter_mut().skip(1) {
                    *slot = state.fifo.pop_front().unwrap_or(0);
                }
            } else {
                for (i, slot) in rx.iter_mut().skip(1).enumerate() {
                    *slot = state.regs[(addr as usize + i).min(0x2F)];
                }
            }
            return Ok(());
        }

        if (0x30..=0x3D).contains(&addr) {
            Self::apply_strobe(&mut state, addr);
        } else if addr == 0x3F {
            // TX FIFO write: out of scope, accept and discard
        } else {
            for (i, &value) in tx.iter().skip(1).enumerate() {
                state.regs[(addr as usize + i).min(0x2F)] = value;
            }
        }
        Ok(())
    }

    fn gpio_read(&mut self, pin: u8) -> Result<bool, HalError> {
        let state = self.state.lock().map_err(|_| HalError::Gpio)?;
        if pin == self.gdo0_pin {
            Ok(state.gdo0)
        } else if pin == self.gdo2_pin {
            Ok(state.gdo2)
        } else {
            Err(HalError::UnknownPin(pin))
        }
    }

    fn gpio_write(&mut self, pin: u8, _level: bool) -> Result<(), HalError> {
        Err(HalError::UnknownPin(pin))
    }
}

/// Simulated SX1276 chip state.
#[derive(Debug)]
pub struct Sx1276ChipState {
    /// Register file (0x00..=0x7F); FIFO access at 0x00 is handled apart
    pub regs: [u8; 0x80],
    /// RegVersion identity byte
    pub version: u8,
    /// Raw RSSI register value (RSSI dBm = -raw / 2)
    pub rssi_raw: u8,
    /// RX FIFO contents
    pub fifo: VecDeque<u8>,
    /// FIFO overrun flag
    pub overrun: bool,
    /// IRQ line level
    pub irq: bool,
    /// Levels written to the reset line, in order
    pub reset_writes: Vec<bool>,
    /// Force every SPI transaction to fail
    pub fail_spi: bool,
}

impl Default for Sx1276ChipState {
    fn default() -> Self {
        Self {
            regs: [0; 0x80],
            version: 0x12,
            rssi_raw: 0xB4,
            fifo: VecDeque::new(),
            overrun: false,
            irq: false,
            reset_writes: Vec::new(),
            fail_spi: false,
        }
    }
}

impl Sx1276ChipState {
    pub fn feed(&mut self, data: &[u8]) {
        self.fifo.extend(data.iter().copied());
        if self.fifo.len() > 64 {
            self.overrun = true;
        }
    }
}

/// Mock SPI/GPIO bus simulating an SX1276 in FSK packet mode.
pub struct MockSx1276Bus {
    pub state: Arc<Mutex<Sx1276ChipState>>,
    irq_pin: u8,
    reset_pin: u8,
}

impl MockSx1276Bus {
    pub fn new(irq_pin: u8, reset_pin: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(Sx1276ChipState::default())),
            irq_pin,
            reset_pin,
        }
    }

    pub fn handle(&self) -> Arc<Mutex<Sx1276ChipState>> {
        Arc::clone(&self.state)
    }

    fn irq_flags2(state: &Sx1276ChipState) -> u8 {
        let threshold = (state.regs[0x35] & 0x3F) as usize;
        let mut flags = 0u8;
        if state.fifo.is_empty() {
            // FifoEmpty is active high
            flags |= 0x40;
        }
        if state.fifo.len() >= threshold.max(1) {
            flags |= 0x20; // FifoLevel
        }
        if state.overrun {
            flags |= 0x10; // FifoOverrun
        }
        flags
    }
}

impl Hal for MockSx1276Bus {
    fn spi_transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), HalError> {
        let mut state = self.state.lock().map_err(|_| HalError::Spi)?;
        if state.fail_spi {
            return Err(HalError::Spi);
        }

        let header = tx[0];
        let addr = (header & 0x7F) as usize;

        if header & 0x80 != 0 {
            // Write access
            if addr == 0x00 {
                // TX FIFO write: out of scope, discard
            } else if addr == 0x3F {
                // Writing 1 to FifoOverrun clears the flag and the FIFO
                if tx.get(1).copied().unwrap_or(0) & 0x10 != 0 {
                    state.overrun = false;
                    state.fifo.clear();
                }
            } else {
                for (i, &value) in tx.iter().skip(1).enumerate() {
                    state.regs[(addr + i).min(0x7F)] = value;
                }
            }
            return Ok(());
        }

        // Read access; burst reads of the FIFO keep addressing register 0x00
        for (i, slot) in rx.iter_mut().skip(1).enumerate() {
            let reg = if addr == 0x00 { 0x00 } else { (addr + i).min(0x7F) };
            *slot = match reg {
                0x00 => state.fifo.pop_front().unwrap_or(0),
                0x11 => state.rssi_raw,
                0x3F => Self::irq_flags2(&state),
                0x42 => state.version,
                _ => state.regs[reg],
            };
        }
        Ok(())
    }

    fn gpio_read(&mut self, pin: u8) -> Result<bool, HalError> {
        let state = self.state.lock().map_err(|_| HalError::Gpio)?;
        if pin == self.irq_pin {
            Ok(state.irq)
        } else {
            Err(HalError::UnknownPin(pin))
        }
    }

    fn gpio_write(&mut self, pin: u8, level: bool) -> Result<(), HalError> {
        let mut state = self.state.lock().map_err(|_| HalError::Gpio)?;
        if pin == self.reset_pin {
            state.reset_writes.push(level);
            Ok(())
        } else {
            Err(HalError::UnknownPin(pin))
        }
    }
}
