//! # Receiver Task and Handoff Queue
//!
//! [`Radio`] owns the consumer half of the receive pipeline. A dedicated
//! thread drives the transceiver for the lifetime of the process: the
//! polling variant sleeps its polling interval between state-machine steps,
//! the interrupt variant restarts RX and blocks on the interrupt signal
//! with a long timeout. Completed packets cross over through a bounded
//! channel with zero-wait semantics on both ends, so the receiver thread is
//! never stalled by a slow consumer and the consumer never blocks on an
//! idle radio.

use crate::error::RadioError;
use crate::radio::packet::{Frame, Packet};
use crate::radio::transceiver::Transceiver;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread;
use std::time::Duration;

/// Completed packets buffered between the receiver thread and the
/// consumer. Deliberately small: wM-Bus traffic is sparse and a consumer
/// that falls three frames behind is better served by dropping than by
/// queue growth.
pub const PACKET_QUEUE_CAPACITY: usize = 3;

/// Upper bound on one interrupt wait; expiry just logs and re-arms.
const IRQ_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Handler invoked for every decoded frame, in registration order.
pub type FrameHandler = Box<dyn FnMut(&mut Frame) + Send>;

/// Optional upper-layer seam consulted for diagnostics when no handler
/// claims a frame. Implementations parse just enough of the telegram to
/// name its address; this crate never interprets frame contents itself.
pub trait TelegramInspector: Send {
    fn address(&self, frame_data: &[u8]) -> Option<String>;
}

pub struct Radio {
    packet_rx: Receiver<Packet>,
    handlers: Vec<FrameHandler>,
    inspector: Option<Box<dyn TelegramInspector>>,
}

impl Radio {
    /// Initialize the transceiver and spawn the receiver thread. Setup runs
    /// on the calling thread so a missing or miswired chip fails here
    /// rather than in a detached context.
    pub fn start(mut transceiver: Box<dyn Transceiver>) -> Result<Self, RadioError> {
        transceiver.setup()?;

        let (packet_tx, packet_rx) = mpsc::sync_channel(PACKET_QUEUE_CAPACITY);
        let name = transceiver.name();
        thread::Builder::new()
            .name("radio-recv".into())
            .spawn(move || receiver_loop(transceiver, packet_tx))
            .map_err(|e| RadioError::InvalidConfig(format!("receiver thread: {}", e)))?;
        info!("Receiver task started for {}", name);

        Ok(Self {
            packet_rx,
            handlers: Vec::new(),
            inspector: None,
        })
    }

    /// Register a frame handler. Handlers run on the consumer's thread, in
    /// registration order, for every decoded frame.
    pub fn add_frame_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&mut Frame) + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Attach a telegram inspector for unhandled-frame diagnostics.
    pub fn set_inspector<I: TelegramInspector + 'static>(&mut self, inspector: I) {
        self.inspector = Some(Box::new(inspector));
    }

    /// Drain at most one queued packet, convert it and dispatch it. Never
    /// blocks; call once per consumer tick.
    pub fn poll_once(&mut self) {
        let packet = match self.packet_rx.try_recv() {
            Ok(packet) => packet,
            Err(_) => return,
        };

        info!(
            "Frame received from radio: {} bytes (raw packet)",
            packet.payload_size()
        );

        let mut frame = match packet.convert_to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to convert packet to frame: {}", e);
                return;
            }
        };

        info!(
            "Frame decoded: {} bytes, RSSI: {}dBm, mode: {}",
            frame.data().len(),
            frame.rssi_dbm(),
            frame.link_mode()
        );
        debug!("Frame HEX: {}", frame.as_hex());

        for handler in &mut self.handlers {
            handler(&mut frame);
        }

        if frame.handlers_count() > 0 {
            info!("Telegram handled by {} handlers", frame.handlers_count());
        } else {
            warn!("Telegram not handled by any handler");
            match self
                .inspector
                .as_ref()
                .and_then(|inspector| inspector.address(frame.data()))
            {
                Some(address) => warn!(
                    "Check if telegram with address {} can be parsed on:",
                    address
                ),
                None => warn!("Check if telegram can be parsed on:"),
            }
            warn!("https://wmbusmeters.org/analyze/{}", frame.as_hex());
        }
    }
}

/// Unbounded receive loop; runs until the consumer side is dropped.
fn receiver_loop(mut transceiver: Box<dyn Transceiver>, packet_tx: SyncSender<Packet>) {
    let interrupt_driven = transceiver.is_interrupt_driven();
    let irq_signal = transceiver.irq_signal();

    loop {
        if interrupt_driven {
            if let Err(e) = transceiver.restart_rx() {
                warn!("RX restart failed: {}", e);
                thread::sleep(Duration::from_millis(100));
                continue;
            }
            if let Some(signal) = &irq_signal {
                if !signal.wait(IRQ_WAIT_TIMEOUT) {
                    debug!("Radio interrupt timeout");
                    continue;
                }
            }
        } else {
            thread::sleep(transceiver.polling_interval());
        }

        let raw = match transceiver.poll() {
            Some(raw) => raw,
            None => continue,
        };

        let rssi_dbm = match transceiver.rssi_dbm() {
            Ok(rssi) => rssi,
            Err(e) => {
                warn!("RSSI read failed: {}", e);
                0
            }
        };

        let packet = Packet::new(raw, rssi_dbm);
        let size = packet.payload_size();
        match packet_tx.try_send(packet) {
            Ok(()) => info!("Packet queued ({} bytes, RSSI: {}dBm)", size, rssi_dbm),
            Err(TrySendError::Full(_)) => warn!("Packet queue full, dropping frame"),
            Err(TrySendError::Disconnected(_)) => {
                info!("Consumer gone, stopping receiver");
                return;
            }
        }
    }
}
