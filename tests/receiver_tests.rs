//! Receiver thread and handoff queue behavior, exercised with a scripted
//! transceiver so the timing is deterministic: the script hands out its
//! frames as fast as the receiver polls, while the consumer is held back
//! until the queue has settled.

use wmbus_radio::radio::irq::IrqSignal;
use wmbus_radio::radio::receiver::PACKET_QUEUE_CAPACITY;
use wmbus_radio::{Radio, RadioError, RawFrame, Transceiver, WMBusBlock, WMBusMode};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct ScriptedTransceiver {
    frames: VecDeque<RawFrame>,
    irq_signal: Option<Arc<IrqSignal>>,
}

impl ScriptedTransceiver {
    fn polling(frames: Vec<RawFrame>) -> Self {
        Self {
            frames: frames.into(),
            irq_signal: None,
        }
    }

    fn interrupt_driven(frames: Vec<RawFrame>, signal: Arc<IrqSignal>) -> Self {
        Self {
            frames: frames.into(),
            irq_signal: Some(signal),
        }
    }
}

impl Transceiver for ScriptedTransceiver {
    fn setup(&mut self) -> Result<(), RadioError> {
        Ok(())
    }

    fn restart_rx(&mut self) -> Result<(), RadioError> {
        Ok(())
    }

    fn rssi_dbm(&mut self) -> Result<i8, RadioError> {
        Ok(-80)
    }

    fn is_interrupt_driven(&self) -> bool {
        self.irq_signal.is_some()
    }

    fn irq_signal(&self) -> Option<Arc<IrqSignal>> {
        self.irq_signal.clone()
    }

    fn poll(&mut self) -> Option<RawFrame> {
        self.frames.pop_front()
    }

    fn polling_interval(&self) -> Duration {
        Duration::from_millis(1)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// L-field 1, one payload byte carrying a sequence number.
fn frame(seq: u8) -> RawFrame {
    RawFrame {
        data: vec![0x01, seq],
        mode: WMBusMode::C,
        block: WMBusBlock::A,
    }
}

fn collect_frames(radio: &mut Radio) -> Arc<Mutex<Vec<u8>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    radio.add_frame_handler(move |frame| {
        sink.lock().unwrap().push(frame.data()[1]);
        frame.mark_as_handled();
    });
    seen
}

#[test]
fn queue_drops_beyond_capacity_and_preserves_order() {
    let frames: Vec<RawFrame> = (1..=5).map(frame).collect();
    let mut radio = Radio::start(Box::new(ScriptedTransceiver::polling(frames))).unwrap();
    let seen = collect_frames(&mut radio);

    // Let the receiver thread run through the whole script while the
    // consumer stays idle; only the first CAPACITY packets survive
    std::thread::sleep(Duration::from_millis(200));
    for _ in 0..10 {
        radio.poll_once();
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), PACKET_QUEUE_CAPACITY);
    assert_eq!(&*seen, &[1, 2, 3]);
}

#[test]
fn frames_flow_while_consumer_keeps_up() {
    let frames: Vec<RawFrame> = (1..=5).map(frame).collect();
    let mut radio = Radio::start(Box::new(ScriptedTransceiver::polling(frames))).unwrap();
    let seen = collect_frames(&mut radio);

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while seen.lock().unwrap().len() < 5 && std::time::Instant::now() < deadline {
        radio.poll_once();
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(&*seen.lock().unwrap(), &[1, 2, 3, 4, 5]);
}

#[test]
fn malformed_packet_is_discarded_not_dispatched() {
    // L-field 9 but only one payload byte: conversion must fail
    let bad = RawFrame {
        data: vec![0x09, 0x44],
        mode: WMBusMode::C,
        block: WMBusBlock::A,
    };
    let mut radio =
        Radio::start(Box::new(ScriptedTransceiver::polling(vec![bad, frame(7)]))).unwrap();
    let seen = collect_frames(&mut radio);

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while seen.lock().unwrap().is_empty() && std::time::Instant::now() < deadline {
        radio.poll_once();
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(&*seen.lock().unwrap(), &[7]);
}

#[test]
fn handlers_run_in_registration_order() {
    let mut radio = Radio::start(Box::new(ScriptedTransceiver::polling(vec![frame(1)]))).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let sink = Arc::clone(&order);
        radio.add_frame_handler(move |frame| {
            sink.lock().unwrap().push(tag);
            frame.mark_as_handled();
        });
    }

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while order.lock().unwrap().is_empty() && std::time::Instant::now() < deadline {
        radio.poll_once();
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(&*order.lock().unwrap(), &["first", "second", "third"]);
}

#[test]
fn interrupt_variant_delivers_after_notify() {
    let signal = Arc::new(IrqSignal::new());
    let script = ScriptedTransceiver::interrupt_driven(vec![frame(9)], Arc::clone(&signal));
    let mut radio = Radio::start(Box::new(script)).unwrap();
    let seen = collect_frames(&mut radio);

    signal.notify();

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while seen.lock().unwrap().is_empty() && std::time::Instant::now() < deadline {
        radio.poll_once();
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(&*seen.lock().unwrap(), &[9]);
}

#[test]
fn setup_failure_propagates() {
    struct BrokenTransceiver;
    impl Transceiver for BrokenTransceiver {
        fn setup(&mut self) -> Result<(), RadioError> {
            Err(RadioError::ChipNotDetected { version: 0xFF })
        }
        fn restart_rx(&mut self) -> Result<(), RadioError> {
            Ok(())
        }
        fn rssi_dbm(&mut self) -> Result<i8, RadioError> {
            Ok(0)
        }
        fn is_interrupt_driven(&self) -> bool {
            false
        }
        fn poll(&mut self) -> Option<RawFrame> {
            None
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    assert!(matches!(
        Radio::start(Box::new(BrokenTransceiver)),
        Err(RadioError::ChipNotDetected { version: 0xFF })
    ));
}
