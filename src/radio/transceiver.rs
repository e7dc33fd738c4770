//! # Transceiver Abstraction
//!
//! Capability trait implemented by both radio variants. The receiver task
//! only ever sees this trait: it drives `poll()` (one state-machine step
//! for the polling CC1101, one frame-read attempt for the interrupt-driven
//! SX1276) and uses `irq_signal()` to decide whether to sleep or to block
//! on the interrupt line between steps.

use crate::error::RadioError;
use crate::radio::framing::{WMBusBlock, WMBusMode};
use crate::radio::irq::IrqSignal;
use std::sync::Arc;
use std::time::Duration;

/// A completed raw frame as produced by a receive state machine: line
/// decoding already applied, upper-layer validation not yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub mode: WMBusMode,
    pub block: WMBusBlock,
}

/// Capability interface of a wM-Bus receive radio.
pub trait Transceiver: Send {
    /// Reset the chip, verify its identity, apply the RF configuration and
    /// enter receive mode. A chip that reads identity bytes of 0x00 or 0xFF
    /// fails setup permanently.
    fn setup(&mut self) -> Result<(), RadioError>;

    /// Abort any in-progress reception and re-enter receive mode.
    fn restart_rx(&mut self) -> Result<(), RadioError>;

    /// Current received signal strength in dBm.
    fn rssi_dbm(&mut self) -> Result<i8, RadioError>;

    /// Whether reception is signalled through an interrupt line rather
    /// than by polling status lines.
    fn is_interrupt_driven(&self) -> bool;

    /// Interrupt signal to block on between polls, when interrupt-driven.
    fn irq_signal(&self) -> Option<Arc<IrqSignal>> {
        None
    }

    /// Advance the receive path by one non-blocking step. Returns a frame
    /// exactly once per successful reception; failed frames are discarded
    /// internally and reception restarts.
    fn poll(&mut self) -> Option<RawFrame>;

    /// Pause between polls for the polling variant. At 100 kbps roughly
    /// 12.5 bytes arrive per millisecond, so the default keeps well ahead
    /// of a 64-byte FIFO.
    fn polling_interval(&self) -> Duration {
        Duration::from_millis(2)
    }

    fn name(&self) -> &'static str;
}
