//! # SX1276 Transceiver
//!
//! Interrupt-driven variant for wM-Bus Mode T/C reception, running the chip
//! in FSK packet mode (100 kbps, ±50 kHz deviation, sync word 0x543D). The
//! DIO interrupt line, mapped to the FIFO-level event, wakes the receiver
//! thread through an [`IrqSignal`]; the frame itself is then read in one
//! blocking pass, reusing the same header classification and 3-of-6 decode
//! as the polling variant.

pub mod registers;

use self::registers::{op_mode, IrqFlags2, Reg, CHIP_VERSION, WRITE_FLAG};
use crate::error::RadioError;
use crate::radio::encoding::decode_3of6;
use crate::radio::framing::{classify_header, WMBusMode, HEADER_SIZE};
use crate::radio::hal::{Hal, HalError};
use crate::radio::irq::IrqSignal;
use crate::radio::transceiver::{RawFrame, Transceiver};
use crate::util::hex::format_hex_compact;
use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Frequency synthesizer step: 32 MHz / 2^19 Hz per LSB
const FRF_STEP_PER_MHZ: f32 = 524288.0 / 32.0;

/// Bound on waiting for the next FIFO byte once a frame read has started
const BYTE_STALL_TIMEOUT: Duration = Duration::from_millis(50);

/// Hard cap on the accumulator, shared with the polling variant
const MAX_FRAME_SIZE: usize = 512;

pub const DEFAULT_FREQUENCY_MHZ: f32 = 868.95;

/// FSK configuration for wM-Bus Mode T/C, applied in listed order and in
/// full at setup: 100 kbps (32 MHz / 0x0140), ±50 kHz deviation (0x0333
/// steps), 200 kHz RX bandwidth, 2-byte sync 0x543D, fixed-length packet
/// engine bypassed in favour of manual FIFO draining.
pub const WMBUS_FSK_SETTINGS: [(Reg, u8); 18] = [
    (Reg::BitrateMsb, 0x01),
    (Reg::BitrateLsb, 0x40),
    (Reg::FdevMsb, 0x03),
    (Reg::FdevLsb, 0x33),
    // 868.95 MHz: 0xD93CCC in 61.035 Hz steps
    (Reg::FrfMsb, 0xD9),
    (Reg::FrfMid, 0x3C),
    (Reg::FrfLsb, 0xCC),
    // LNA highest gain, no boost
    (Reg::Lna, 0x20),
    // AFC on, AGC on, trigger on preamble detect
    (Reg::RxConfig, 0x1E),
    // RX bandwidth 200 kHz (mantissa 20, exponent 1)
    (Reg::RxBw, 0x09),
    (Reg::AfcBw, 0x09),
    // Preamble detector on, 2 bytes, tolerance 10 chip errors
    (Reg::PreambleDetect, 0xAA),
    // Auto-restart RX, sync on, 2 sync bytes
    (Reg::SyncConfig, 0x51),
    (Reg::SyncValue1, 0x54),
    (Reg::SyncValue2, 0x3D),
    // Fixed length, no CRC engine, no whitening: framing is done in software
    (Reg::PacketConfig1, 0x00),
    // Packet mode
    (Reg::PacketConfig2, 0x40),
    // FIFO-level threshold at the classification header size
    (Reg::FifoThresh, 0x80 | HEADER_SIZE as u8),
];

pub struct Sx1276<H: Hal> {
    hal: H,
    irq_pin: u8,
    reset_pin: u8,
    frequency_mhz: f32,
    irq_signal: Arc<IrqSignal>,
}

impl<H: Hal> Sx1276<H> {
    pub fn new(hal: H, irq_pin: u8, reset_pin: u8) -> Self {
        Self {
            hal,
            irq_pin,
            reset_pin,
            frequency_mhz: DEFAULT_FREQUENCY_MHZ,
            irq_signal: Arc::new(IrqSignal::new()),
        }
    }

    /// Override the carrier frequency in MHz (default 868.95).
    pub fn set_frequency(&mut self, freq_mhz: f32) {
        self.frequency_mhz = freq_mhz;
    }

    /// Pin carrying the DIO FIFO-level interrupt, for HAL interrupt wiring.
    pub fn irq_pin(&self) -> u8 {
        self.irq_pin
    }

    /// Direct HAL access, used to wire the interrupt line to
    /// [`Sx1276::irq_signal`](Transceiver::irq_signal) on platforms that
    /// support edge callbacks.
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    fn read_register(&mut self, reg: Reg) -> Result<u8, HalError> {
        let tx = [reg as u8, 0x00];
        let mut rx = [0u8; 2];
        self.hal.spi_transfer(&tx, &mut rx)?;
        Ok(rx[1])
    }

    fn write_register(&mut self, reg: Reg, value: u8) -> Result<(), HalError> {
        let tx = [reg as u8 | WRITE_FLAG, value];
        let mut rx = [0u8; 2];
        self.hal.spi_transfer(&tx, &mut rx)
    }

    fn read_fifo_byte(&mut self) -> Result<u8, HalError> {
        let tx = [Reg::Fifo as u8, 0x00];
        let mut rx = [0u8; 2];
        self.hal.spi_transfer(&tx, &mut rx)?;
        Ok(rx[1])
    }

    fn irq_flags2(&mut self) -> Result<IrqFlags2, HalError> {
        Ok(IrqFlags2::from_bits_truncate(
            self.read_register(Reg::IrqFlags2)?,
        ))
    }

    /// Hardware reset: NRESET low for over 100 µs, then 10 ms settle time.
    fn reset_chip(&mut self) -> Result<(), HalError> {
        self.hal.gpio_write(self.reset_pin, false)?;
        thread::sleep(Duration::from_millis(1));
        self.hal.gpio_write(self.reset_pin, true)?;
        thread::sleep(Duration::from_millis(10));
        Ok(())
    }

    fn set_carrier_frequency(&mut self, freq_mhz: f32) -> Result<(), HalError> {
        let frf = (freq_mhz * FRF_STEP_PER_MHZ) as u32;
        self.write_register(Reg::FrfMsb, (frf >> 16) as u8)?;
        self.write_register(Reg::FrfMid, (frf >> 8) as u8)?;
        self.write_register(Reg::FrfLsb, frf as u8)?;
        Ok(())
    }

    fn restart_rx_inner(&mut self) -> Result<(), RadioError> {
        self.write_register(Reg::OpMode, op_mode::STANDBY)?;
        // Writing FifoOverrun clears the flag and flushes the FIFO
        self.write_register(Reg::IrqFlags2, IrqFlags2::FIFO_OVERRUN.bits())?;
        self.write_register(Reg::OpMode, op_mode::RX)?;
        Ok(())
    }

    /// Pull `count` bytes from the FIFO, waiting for them to arrive on air.
    /// Fails when the FIFO overruns or no byte arrives within the stall
    /// timeout.
    fn read_bytes(&mut self, buffer: &mut Vec<u8>, count: usize) -> Result<(), RadioError> {
        if buffer.len() + count > MAX_FRAME_SIZE {
            return Err(RadioError::FrameTooLarge(buffer.len() + count));
        }
        let mut last_progress = Instant::now();
        let mut read = 0;
        while read < count {
            let flags = self.irq_flags2()?;
            if flags.contains(IrqFlags2::FIFO_OVERRUN) {
                return Err(RadioError::FifoOverflow);
            }
            if flags.contains(IrqFlags2::FIFO_EMPTY) {
                if last_progress.elapsed() > BYTE_STALL_TIMEOUT {
                    warn!("Timeout waiting for frame data, resetting RX");
                    return Err(RadioError::FrameConversion(
                        "frame truncated on air".into(),
                    ));
                }
                thread::sleep(Duration::from_micros(200));
                continue;
            }
            buffer.push(self.read_fifo_byte()?);
            read += 1;
            last_progress = Instant::now();
        }
        Ok(())
    }

    /// Read and decode one frame after a FIFO-level wakeup.
    fn read_frame(&mut self) -> Result<Option<RawFrame>, RadioError> {
        let flags = self.irq_flags2()?;
        if flags.contains(IrqFlags2::FIFO_OVERRUN) {
            warn!("FIFO overrun, restarting RX");
            self.restart_rx_inner()?;
            return Ok(None);
        }
        if flags.contains(IrqFlags2::FIFO_EMPTY) {
            // Spurious wakeup
            return Ok(None);
        }

        let mut header = Vec::with_capacity(HEADER_SIZE);
        self.read_bytes(&mut header, HEADER_SIZE)?;
        let header: [u8; HEADER_SIZE] = header
            .try_into()
            .map_err(|_| RadioError::FrameConversion("short header".into()))?;
        debug!("Header bytes: {}", format_hex_compact(&header));

        let format = classify_header(&header)?;
        debug!(
            "Frame detected: mode={:?}, block={:?}, L=0x{:02X}, expected={}",
            format.mode, format.block, format.length_field, format.expected_length
        );

        let mut buffer = format.seed;
        let remaining = format.expected_length.saturating_sub(format.bytes_received);
        self.read_bytes(&mut buffer, remaining)?;

        trace!("Raw frame data: {}", format_hex_compact(&buffer));
        let data = match format.mode {
            WMBusMode::T => decode_3of6(&buffer)?,
            WMBusMode::C => buffer,
        };

        Ok(Some(RawFrame {
            data,
            mode: format.mode,
            block: format.block,
        }))
    }
}

impl<H: Hal + Send> Transceiver for Sx1276<H> {
    fn setup(&mut self) -> Result<(), RadioError> {
        self.reset_chip()?;

        let version = self.read_register(Reg::Version)?;
        debug!(
            "SX1276 VERSION: 0x{:02X} (expected 0x{:02X})",
            version, CHIP_VERSION
        );
        if version == 0x00 || version == 0xFF {
            warn!("SX1276 not detected - check CS/MOSI/MISO/SCK wiring and supply");
            return Err(RadioError::ChipNotDetected { version });
        }
        if version != CHIP_VERSION {
            warn!(
                "Unexpected RegVersion 0x{:02X} (expected 0x{:02X})",
                version, CHIP_VERSION
            );
        }

        // FSK mode is latched in sleep; configuration requires standby
        self.write_register(Reg::OpMode, op_mode::SLEEP)?;
        self.write_register(Reg::OpMode, op_mode::STANDBY)?;

        debug!(
            "Applying wM-Bus FSK settings ({} registers)",
            WMBUS_FSK_SETTINGS.len()
        );
        for (reg, value) in WMBUS_FSK_SETTINGS {
            self.write_register(reg, value)?;
        }

        if (self.frequency_mhz - DEFAULT_FREQUENCY_MHZ).abs() > f32::EPSILON {
            debug!("Setting custom frequency: {:.2} MHz", self.frequency_mhz);
            let freq = self.frequency_mhz;
            self.set_carrier_frequency(freq)?;
        }

        // DIO1 mapped to FifoLevel: rising edge wakes the receiver thread
        self.write_register(Reg::DioMapping1, 0x00)?;

        info!(
            "SX1276 initialized: version 0x{:02X}, {:.2} MHz",
            version, self.frequency_mhz
        );

        self.restart_rx_inner()
    }

    fn restart_rx(&mut self) -> Result<(), RadioError> {
        self.restart_rx_inner()
    }

    fn rssi_dbm(&mut self) -> Result<i8, RadioError> {
        // FSK RSSI register: dBm = -raw / 2
        let raw = self.read_register(Reg::RssiValue)? as i16;
        Ok((-(raw / 2)) as i8)
    }

    fn is_interrupt_driven(&self) -> bool {
        true
    }

    fn irq_signal(&self) -> Option<Arc<IrqSignal>> {
        Some(Arc::clone(&self.irq_signal))
    }

    fn poll(&mut self) -> Option<RawFrame> {
        match self.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Receive error, restarting RX: {}", e);
                if let Err(e) = self.restart_rx_inner() {
                    warn!("RX restart failed: {}", e);
                }
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "SX1276"
    }
}
