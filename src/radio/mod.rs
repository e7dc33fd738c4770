//! # wM-Bus Radio Frame Acquisition
//!
//! Everything between the SPI bus and a validated [`Frame`]: register
//! access and RF configuration for the two supported chips, the receive
//! state machine, the 3-of-6 line decoder, and the receiver thread with its
//! bounded handoff queue.

pub mod cc1101;
pub mod encoding;
pub mod framing;
pub mod hal;
pub mod irq;
pub mod packet;
pub mod receiver;
pub mod sx1276;
pub mod transceiver;

pub use cc1101::Cc1101;
pub use framing::{WMBusBlock, WMBusMode};
pub use irq::IrqSignal;
pub use packet::{Frame, LinkMode, Packet};
pub use receiver::{Radio, TelegramInspector, PACKET_QUEUE_CAPACITY};
pub use sx1276::Sx1276;
pub use transceiver::{RawFrame, Transceiver};
