//! # wmbus-radio
//!
//! Wireless M-Bus (EN 13757-4) frame acquisition for Mode T/C reception at
//! 100 kbps, built around two transceiver families:
//!
//! - **CC1101** — polled over SPI with two GPIO status lines; frames are
//!   reconstructed in software through a four-state receive machine that
//!   renegotiates the chip's packet-length mode mid-frame.
//! - **SX1276** — FSK packet mode with a hardware interrupt line waking the
//!   receiver thread.
//!
//! Mode T payloads are 3-of-6 line-decoded in software; Mode C passes
//! through as NRZ. Completed frames flow through a bounded queue to
//! consumer-registered handlers. Upper-layer wM-Bus semantics (telegram
//! parsing, decryption, CRC validation) are out of scope; an opaque
//! [`TelegramInspector`] seam lets callers plug those in.
//!
//! ## Example
//!
//! ```no_run
//! use wmbus_radio::radio::hal::mock::MockCc1101Bus;
//! use wmbus_radio::{Cc1101, Radio};
//!
//! # fn main() -> Result<(), wmbus_radio::RadioError> {
//! let bus = MockCc1101Bus::new(24, 25);
//! let mut radio = Radio::start(Box::new(Cc1101::new(bus, 24, 25)))?;
//! radio.add_frame_handler(|frame| {
//!     println!("{}", frame.as_rtlwmbus());
//!     frame.mark_as_handled();
//! });
//! loop {
//!     radio.poll_once();
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod radio;
pub mod util;

pub use config::{RadioConfig, RadioModel};
pub use error::RadioError;
pub use radio::{
    Cc1101, Frame, IrqSignal, LinkMode, Packet, Radio, RawFrame, Sx1276, TelegramInspector,
    Transceiver, WMBusBlock, WMBusMode,
};
