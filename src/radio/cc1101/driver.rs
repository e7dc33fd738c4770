//! # CC1101 Register Access Layer
//!
//! Low-level SPI communication with the CC1101 register file and FIFOs.
//! Single responsibility: bus transactions only — no state management or
//! protocol logic. Every operation is one synchronous SPI transaction; a
//! failed transaction surfaces as an error to the calling state-machine
//! step and is never retried here.

use super::registers::{Register, Status, Strobe, FIFO, READ_BURST, READ_SINGLE, WRITE_BURST};
use crate::radio::hal::{Hal, HalError};

pub struct Cc1101Driver<H: Hal> {
    hal: H,
}

impl<H: Hal> Cc1101Driver<H> {
    pub fn new(hal: H) -> Self {
        Self { hal }
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Read a single configuration register
    pub fn read_register(&mut self, reg: Register) -> Result<u8, HalError> {
        let tx = [reg as u8 | READ_SINGLE, 0x00];
        let mut rx = [0u8; 2];
        self.hal.spi_transfer(&tx, &mut rx)?;
        Ok(rx[1])
    }

    /// Write a single configuration register
    pub fn write_register(&mut self, reg: Register, value: u8) -> Result<(), HalError> {
        let tx = [reg as u8, value];
        let mut rx = [0u8; 2];
        self.hal.spi_transfer(&tx, &mut rx)
    }

    /// Read a status register (burst flag selects the status file)
    pub fn read_status(&mut self, status: Status) -> Result<u8, HalError> {
        let tx = [status as u8 | READ_BURST, 0x00];
        let mut rx = [0u8; 2];
        self.hal.spi_transfer(&tx, &mut rx)?;
        Ok(rx[1])
    }

    /// Burst-read `buffer.len()` bytes starting at `reg`
    pub fn read_burst(&mut self, reg: Register, buffer: &mut [u8]) -> Result<(), HalError> {
        if buffer.is_empty() {
            return Ok(());
        }
        let mut tx = vec![0u8; buffer.len() + 1];
        tx[0] = reg as u8 | READ_BURST;
        let mut rx = vec![0u8; buffer.len() + 1];
        self.hal.spi_transfer(&tx, &mut rx)?;
        buffer.copy_from_slice(&rx[1..]);
        Ok(())
    }

    /// Burst-write `data` starting at `reg`
    pub fn write_burst(&mut self, reg: Register, data: &[u8]) -> Result<(), HalError> {
        if data.is_empty() {
            return Ok(());
        }
        let mut tx = Vec::with_capacity(data.len() + 1);
        tx.push(reg as u8 | WRITE_BURST);
        tx.extend_from_slice(data);
        let mut rx = vec![0u8; tx.len()];
        self.hal.spi_transfer(&tx, &mut rx)
    }

    /// Send a command strobe; returns the chip status byte
    pub fn send_strobe(&mut self, strobe: Strobe) -> Result<u8, HalError> {
        let tx = [strobe as u8];
        let mut rx = [0u8; 1];
        self.hal.spi_transfer(&tx, &mut rx)?;
        Ok(rx[0])
    }

    /// Burst-read `buffer.len()` bytes from the RX FIFO
    pub fn read_rx_fifo(&mut self, buffer: &mut [u8]) -> Result<(), HalError> {
        if buffer.is_empty() {
            return Ok(());
        }
        let mut tx = vec![0u8; buffer.len() + 1];
        tx[0] = FIFO | READ_BURST;
        let mut rx = vec![0u8; buffer.len() + 1];
        self.hal.spi_transfer(&tx, &mut rx)?;
        buffer.copy_from_slice(&rx[1..]);
        Ok(())
    }

    /// Burst-write `data` into the TX FIFO
    pub fn write_tx_fifo(&mut self, data: &[u8]) -> Result<(), HalError> {
        if data.is_empty() {
            return Ok(());
        }
        let mut tx = Vec::with_capacity(data.len() + 1);
        tx.push(FIFO | WRITE_BURST);
        tx.extend_from_slice(data);
        let mut rx = vec![0u8; tx.len()];
        self.hal.spi_transfer(&tx, &mut rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::hal::mock::MockCc1101Bus;

    #[test]
    fn test_register_write_read() {
        let bus = MockCc1101Bus::new(24, 25);
        let chip = bus.handle();
        let mut driver = Cc1101Driver::new(bus);

        driver.write_register(Register::Sync1, 0x54).unwrap();
        driver.write_register(Register::Sync0, 0x3D).unwrap();
        assert_eq!(driver.read_register(Register::Sync1).unwrap(), 0x54);
        assert_eq!(driver.read_register(Register::Sync0).unwrap(), 0x3D);
        assert_eq!(chip.lock().unwrap().regs[0x04], 0x54);
    }

    #[test]
    fn test_fifo_read_drains_chip() {
        let bus = MockCc1101Bus::new(24, 25);
        let chip = bus.handle();
        chip.lock().unwrap().feed(&[1, 2, 3, 4]);

        let mut driver = Cc1101Driver::new(bus);
        let mut buffer = [0u8; 3];
        driver.read_rx_fifo(&mut buffer).unwrap();
        assert_eq!(buffer, [1, 2, 3]);
        assert_eq!(chip.lock().unwrap().fifo.len(), 1);
    }

    #[test]
    fn test_strobe_recorded() {
        let bus = MockCc1101Bus::new(24, 25);
        let chip = bus.handle();
        let mut driver = Cc1101Driver::new(bus);

        driver.send_strobe(Strobe::Srx).unwrap();
        let state = chip.lock().unwrap();
        assert_eq!(state.strobes, vec![Strobe::Srx as u8]);
        assert_eq!(state.marcstate, 0x0D);
    }

    #[test]
    fn test_status_read_rxbytes() {
        let bus = MockCc1101Bus::new(24, 25);
        let chip = bus.handle();
        chip.lock().unwrap().feed(&[0u8; 5]);

        let mut driver = Cc1101Driver::new(bus);
        assert_eq!(driver.read_status(Status::Rxbytes).unwrap(), 5);
    }
}
