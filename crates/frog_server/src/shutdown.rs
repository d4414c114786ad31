//! Process-wide stop signal for the server threads.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::info;

/// Cloneable one-shot shutdown flag.
///
/// Blocking waits can [`select!`](crossbeam::channel::select) on
/// [`receiver`](Self::receiver): the channel disconnects when the signal is
/// triggered, waking every waiter at once.
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

struct Inner {
    triggered: AtomicBool,
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                sender: Mutex::new(Some(sender)),
                receiver,
            }),
        }
    }

    pub fn trigger(&self) {
        if !self.inner.triggered.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown requested");
        }
        self.inner.sender.lock().take();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.receiver
    }

    /// Sleeps for up to `timeout`, returning `true` early if shutdown is triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        // Nothing is ever sent; the only wake-up is the disconnect.
        let _ = self.inner.receiver.recv_timeout(timeout);
        self.is_triggered()
    }

    /// Blocks until shutdown is triggered.
    pub fn wait(&self) {
        while !self.is_triggered() {
            let _ = self.inner.receiver.recv();
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_wait_timeout_expires() {
        let signal = ShutdownSignal::new();
        let started = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_trigger_wakes_waiters() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            std::thread::spawn(move || signal.wait_timeout(Duration::from_secs(10)))
        };

        std::thread::sleep(Duration::from_millis(20));
        signal.trigger();
        signal.trigger();
        assert!(waiter.join().unwrap());
        assert!(signal.is_triggered());
    }
}
