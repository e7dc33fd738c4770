//! SX1276 FSK/OOK-mode register map (subset used for wM-Bus reception)
//! and IRQ flag definitions.

use bitflags::bitflags;

/// FSK-mode register addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reg {
    Fifo = 0x00,
    OpMode = 0x01,
    BitrateMsb = 0x02,
    BitrateLsb = 0x03,
    FdevMsb = 0x04,
    FdevLsb = 0x05,
    FrfMsb = 0x06,
    FrfMid = 0x07,
    FrfLsb = 0x08,
    Lna = 0x0C,
    RxConfig = 0x0D,
    RssiValue = 0x11,
    RxBw = 0x12,
    AfcBw = 0x13,
    PreambleDetect = 0x1F,
    SyncConfig = 0x27,
    SyncValue1 = 0x28,
    SyncValue2 = 0x29,
    PacketConfig1 = 0x30,
    PacketConfig2 = 0x31,
    PayloadLength = 0x32,
    FifoThresh = 0x35,
    IrqFlags1 = 0x3E,
    IrqFlags2 = 0x3F,
    DioMapping1 = 0x40,
    DioMapping2 = 0x41,
    Version = 0x42,
}

/// RegOpMode mode bits (FSK modulation, high-frequency band)
pub mod op_mode {
    pub const SLEEP: u8 = 0x00;
    pub const STANDBY: u8 = 0x01;
    pub const RX: u8 = 0x05;
}

/// Write access sets bit 7 of the address byte
pub const WRITE_FLAG: u8 = 0x80;

/// Expected RegVersion for production silicon
pub const CHIP_VERSION: u8 = 0x12;

bitflags! {
    /// RegIrqFlags2: FIFO and packet status
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags2: u8 {
        const FIFO_FULL = 0x80;
        const FIFO_EMPTY = 0x40;
        const FIFO_LEVEL = 0x20;
        const FIFO_OVERRUN = 0x10;
        const PACKET_SENT = 0x08;
        const PAYLOAD_READY = 0x04;
        const CRC_OK = 0x02;
        const LOW_BAT = 0x01;
    }
}
