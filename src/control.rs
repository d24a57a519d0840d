// SPDX-License-Identifier: Apache-2.0

//! Control flags shared between a running tailer and its owner.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};

struct Control {
    running: AtomicBool,
    paused: AtomicBool,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

/// Handle used to stop, pause and resume a tailer from another thread.
///
/// Flag changes are observed by the tailer at its next loop boundary. `stop()` and
/// `resume()` also cut short a sleep in progress, so a stop takes effect within
/// one read buffer rather than one full polling interval.
#[derive(Clone)]
pub struct TailerHandle {
    inner: Arc<Control>,
}

impl TailerHandle {
    pub(crate) fn new() -> Self {
        // capacity 1: wakeups coalesce
        let (wake_tx, wake_rx) = flume::bounded(1);
        Self {
            inner: Arc::new(Control {
                running: AtomicBool::new(true),
                paused: AtomicBool::new(false),
                wake_tx,
                wake_rx,
            }),
        }
    }

    /// Ask the tailer to finish its current step and exit. Stopping is final.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        self.wake();
    }

    /// Ask the tailer to stop reading until `resume()` is called.
    /// The file handle stays open while paused.
    pub fn pause(&self) {
        self.inner.paused.store(true, Ordering::Release);
    }

    /// Let a paused tailer continue. Has no effect on a tailer that is not paused.
    pub fn resume(&self) {
        if self.inner.paused.swap(false, Ordering::AcqRel) {
            self.wake();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    fn wake(&self) {
        // Full means a wakeup is already pending
        let _ = self.inner.wake_tx.try_send(());
    }

    /// Sleep for `delay` or until woken by `stop()`/`resume()`.
    pub(crate) fn sleep(&self, delay: Duration) {
        match self.inner.wake_rx.recv_timeout(delay) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {}
            // Unreachable while `inner` holds the sender
            Err(RecvTimeoutError::Disconnected) => std::thread::sleep(delay),
        }
    }
}

impl std::fmt::Debug for TailerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailerHandle")
            .field("running", &self.is_running())
            .field("paused", &self.is_paused())
            .finish()
    }
}
