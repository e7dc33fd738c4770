//! # CC1101 RF Configuration for wM-Bus Reception
//!
//! Register values based on Texas Instruments application note SWRA234A,
//! "Wireless MBUS Implementation on CC1101".
//!
//! Configuration targets:
//! - Frequency: 868.95 MHz (EU wM-Bus band)
//! - Mode T (T1) and Mode C (C1): 100 kbps, 2-FSK
//! - Deviation: ±50 kHz, receiver bandwidth 203 kHz
//! - Sync word 0x543D, infinite packet length for variable-length frames
//! - GDO0 asserts on RX FIFO threshold, GDO2 on sync word detection

use super::driver::Cc1101Driver;
use super::registers::Register;
use crate::radio::hal::{Hal, HalError};

/// CC1101 crystal frequency in MHz
pub const XTAL_FREQ_MHZ: f32 = 26.0;

/// RF configuration as (register, value) pairs, applied in listed order and
/// in full before the first receive attempt.
pub const WMBUS_RF_SETTINGS: [(Register, u8); 47] = [
    // GDO2 output: asserts when sync word detected
    (Register::Iocfg2, 0x06),
    // GDO1 output: high impedance (not used)
    (Register::Iocfg1, 0x2E),
    // GDO0 output: asserts when FIFO threshold reached
    (Register::Iocfg0, 0x00),
    // RX FIFO threshold: 33 bytes
    (Register::Fifothr, 0x07),
    // Sync word 0x543D (wM-Bus Mode C/T preamble)
    (Register::Sync1, 0x54),
    (Register::Sync0, 0x3D),
    // Packet length: maximum, infinite mode used at runtime
    (Register::Pktlen, 0xFF),
    // No address check, no append status
    (Register::Pktctrl1, 0x00),
    // Normal mode, no CRC, fixed length (switched to infinite at RX start)
    (Register::Pktctrl0, 0x00),
    (Register::Addr, 0x00),
    (Register::Channr, 0x00),
    // IF frequency
    (Register::Fsctrl1, 0x08),
    (Register::Fsctrl0, 0x00),
    // Frequency control word for 868.95 MHz: freq = (f_carrier / f_xosc) * 2^16
    (Register::Freq2, 0x21),
    (Register::Freq1, 0x6B),
    (Register::Freq0, 0xD0),
    // Receiver bandwidth ~203 kHz, data rate ~100 kbps
    (Register::Mdmcfg4, 0x5C),
    (Register::Mdmcfg3, 0x04),
    // 2-FSK, 30/32 sync word bits
    (Register::Mdmcfg2, 0x06),
    // FEC disabled, 2 preamble bytes
    (Register::Mdmcfg1, 0x22),
    (Register::Mdmcfg0, 0xF8),
    // Deviation ±50 kHz
    (Register::Deviatn, 0x44),
    (Register::Mcsm2, 0x07),
    // CCA always, stay in RX after RX
    (Register::Mcsm1, 0x00),
    // Calibrate from IDLE to RX/TX
    (Register::Mcsm0, 0x18),
    (Register::Foccfg, 0x2E),
    (Register::Bscfg, 0xBF),
    // AGC target amplitude 33 dB
    (Register::Agcctrl2, 0x43),
    (Register::Agcctrl1, 0x09),
    (Register::Agcctrl0, 0xB5),
    (Register::Worevt1, 0x87),
    (Register::Worevt0, 0x6B),
    (Register::Worctrl, 0xFB),
    // Front end RX: LNA current
    (Register::Frend1, 0xB6),
    // Front end TX: PA power setting
    (Register::Frend0, 0x10),
    // Frequency synthesizer calibration
    (Register::Fscal3, 0xEA),
    (Register::Fscal2, 0x2A),
    (Register::Fscal1, 0x00),
    (Register::Fscal0, 0x1F),
    (Register::Rcctrl1, 0x41),
    (Register::Rcctrl0, 0x00),
    (Register::Fstest, 0x59),
    (Register::Ptest, 0x7F),
    (Register::Agctest, 0x3F),
    (Register::Test2, 0x81),
    (Register::Test1, 0x35),
    (Register::Test0, 0x09),
];

/// Apply the full wM-Bus RF settings table, in order.
pub fn apply_wmbus_rf_settings<H: Hal>(driver: &mut Cc1101Driver<H>) -> Result<(), HalError> {
    for (reg, value) in WMBUS_RF_SETTINGS {
        driver.write_register(reg, value)?;
    }
    Ok(())
}

/// Program the three frequency control registers from a carrier frequency.
///
/// `FREQ = f_carrier_MHz * 2^16 / f_xosc_MHz`, split into three bytes.
pub fn set_carrier_frequency<H: Hal>(
    driver: &mut Cc1101Driver<H>,
    freq_mhz: f32,
) -> Result<(), HalError> {
    let freq_reg = (freq_mhz * 65536.0 / XTAL_FREQ_MHZ) as u32;
    driver.write_register(Register::Freq2, (freq_reg >> 16) as u8)?;
    driver.write_register(Register::Freq1, (freq_reg >> 8) as u8)?;
    driver.write_register(Register::Freq0, freq_reg as u8)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::hal::mock::MockCc1101Bus;

    #[test]
    fn test_default_frequency_matches_table() {
        // 868.95 MHz with a 26 MHz crystal is 0x216BD0
        let bus = MockCc1101Bus::new(24, 25);
        let chip = bus.handle();
        let mut driver = Cc1101Driver::new(bus);

        set_carrier_frequency(&mut driver, 868.95).unwrap();
        let regs = chip.lock().unwrap().regs;
        assert_eq!(
            (regs[0x0D], regs[0x0E], regs[0x0F]),
            (0x21, 0x6B, 0xD0)
        );
    }

    #[test]
    fn test_settings_applied_in_full() {
        let bus = MockCc1101Bus::new(24, 25);
        let chip = bus.handle();
        let mut driver = Cc1101Driver::new(bus);

        apply_wmbus_rf_settings(&mut driver).unwrap();
        let regs = chip.lock().unwrap().regs;
        assert_eq!(regs[Register::Iocfg2 as usize], 0x06);
        assert_eq!(regs[Register::Sync1 as usize], 0x54);
        assert_eq!(regs[Register::Sync0 as usize], 0x3D);
        assert_eq!(regs[Register::Test0 as usize], 0x09);
    }
}
