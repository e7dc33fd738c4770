//! CC1101 register file, status registers, and command strobes.

/// CC1101 configuration register addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Iocfg2 = 0x00,
    Iocfg1 = 0x01,
    Iocfg0 = 0x02,
    Fifothr = 0x03,
    Sync1 = 0x04,
    Sync0 = 0x05,
    Pktlen = 0x06,
    Pktctrl1 = 0x07,
    Pktctrl0 = 0x08,
    Addr = 0x09,
    Channr = 0x0A,
    Fsctrl1 = 0x0B,
    Fsctrl0 = 0x0C,
    Freq2 = 0x0D,
    Freq1 = 0x0E,
    Freq0 = 0x0F,
    Mdmcfg4 = 0x10,
    Mdmcfg3 = 0x11,
    Mdmcfg2 = 0x12,
    Mdmcfg1 = 0x13,
    Mdmcfg0 = 0x14,
    Deviatn = 0x15,
    Mcsm2 = 0x16,
    Mcsm1 = 0x17,
    Mcsm0 = 0x18,
    Foccfg = 0x19,
    Bscfg = 0x1A,
    Agcctrl2 = 0x1B,
    Agcctrl1 = 0x1C,
    Agcctrl0 = 0x1D,
    Worevt1 = 0x1E,
    Worevt0 = 0x1F,
    Worctrl = 0x20,
    Frend1 = 0x21,
    Frend0 = 0x22,
    Fscal3 = 0x23,
    Fscal2 = 0x24,
    Fscal1 = 0x25,
    Fscal0 = 0x26,
    Rcctrl1 = 0x27,
    Rcctrl0 = 0x28,
    Fstest = 0x29,
    Ptest = 0x2A,
    Agctest = 0x2B,
    Test2 = 0x2C,
    Test1 = 0x2D,
    Test0 = 0x2E,
}

/// CC1101 read-only status registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Partnum = 0x30,
    Version = 0x31,
    Freqest = 0x32,
    Lqi = 0x33,
    Rssi = 0x34,
    Marcstate = 0x35,
    Wortime1 = 0x36,
    Wortime0 = 0x37,
    Pktstatus = 0x38,
    VcoVcDac = 0x39,
    Txbytes = 0x3A,
    Rxbytes = 0x3B,
}

/// CC1101 one-shot command strobes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Strobe {
    /// Reset chip
    Sres = 0x30,
    /// Enable and calibrate frequency synthesizer
    Sfstxon = 0x31,
    /// Turn off crystal oscillator
    Sxoff = 0x32,
    /// Calibrate frequency synthesizer
    Scal = 0x33,
    /// Enable RX
    Srx = 0x34,
    /// Enable TX
    Stx = 0x35,
    /// Exit RX/TX, turn off frequency synthesizer
    Sidle = 0x36,
    /// Start automatic RX polling sequence
    Swor = 0x38,
    /// Enter power down mode
    Spwd = 0x39,
    /// Flush the RX FIFO buffer
    Sfrx = 0x3A,
    /// Flush the TX FIFO buffer
    Sftx = 0x3B,
    /// Reset real time clock
    Sworrst = 0x3C,
    /// No operation
    Snop = 0x3D,
}

/// Relevant MARC main state machine values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MarcState {
    Idle = 0x01,
    Rx = 0x0D,
    RxOverflow = 0x11,
}

/// FIFO access address
pub const FIFO: u8 = 0x3F;

/// SPI header flags
pub const READ_SINGLE: u8 = 0x80;
pub const READ_BURST: u8 = 0xC0;
pub const WRITE_BURST: u8 = 0x40;

/// RXBYTES overflow flag (bit 7)
pub const RXBYTES_OVERFLOW: u8 = 0x80;
/// RXBYTES occupancy mask
pub const RXBYTES_COUNT: u8 = 0x7F;
