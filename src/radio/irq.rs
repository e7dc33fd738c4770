//! # Interrupt Signaling
//!
//! Minimal binary semaphore connecting a GPIO interrupt callback to the
//! receiver thread. The interrupt side does one thing: `notify()`. All
//! register and buffer work happens on the receiver thread after it wakes.
//!
//! Notifications are latched, so a pulse that arrives between waits is not
//! lost; consecutive pulses before a wait coalesce into one wake.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Binary semaphore for waking the receiver thread from interrupt context.
#[derive(Debug, Default)]
pub struct IrqSignal {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl IrqSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a notification and wake a waiting thread. Allocation-free and
    /// safe to call from an interrupt callback thread.
    pub fn notify(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = true;
            self.condvar.notify_one();
        }
    }

    /// Block until notified or until `timeout` elapses. Returns `true` when
    /// a notification was consumed, `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let Ok(mut pending) = self.pending.lock() else {
            return false;
        };
        let deadline = std::time::Instant::now() + timeout;
        while !*pending {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let Ok((guard, result)) = self.condvar.wait_timeout(pending, remaining) else {
                return false;
            };
            pending = guard;
            if result.timed_out() && !*pending {
                return false;
            }
        }
        *pending = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_times_out() {
        let signal = IrqSignal::new();
        assert!(!signal.wait(Duration::from_millis(10)));
    }

    #[test]
    fn test_notify_before_wait_is_latched() {
        let signal = IrqSignal::new();
        signal.notify();
        assert!(signal.wait(Duration::from_millis(10)));
        // Consumed: the next wait times out
        assert!(!signal.wait(Duration::from_millis(10)));
    }

    #[test]
    fn test_notify_wakes_waiter() {
        let signal = Arc::new(IrqSignal::new());
        let notifier = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.notify();
        });
        assert!(signal.wait(Duration::from_secs(5)));
        handle.join().unwrap();
    }
}
