//! Scan sessions — the consumer end of a live subscription.
//!
//! A session is registered at creation; its channel already holds the
//! snapshot replay by the time the caller sees it. Consumers drain at their own pace.
//! `stop` unregisters the session, closes the channel, and discards anything
//! undrained — after it returns, `recv` only ever yields `None`.

use std::sync::Arc;

use tokio::sync::mpsc;

use beacon_core::Update;

use crate::discovery::Shared;

/// A live scan subscription. Dropping it stops the scan.
pub struct ScanSession {
    shared: Arc<Shared>,
    session_id: u64,
    rx: mpsc::UnboundedReceiver<Update>,
    stopped: bool,
}

impl ScanSession {
    pub(crate) fn new(
        shared: Arc<Shared>,
        session_id: u64,
        rx: mpsc::UnboundedReceiver<Update>,
    ) -> Self {
        ScanSession {
            shared,
            session_id,
            rx,
            stopped: false,
        }
    }

    /// Receive the next update, waiting if none is queued.
    /// Returns `None` once the session has been stopped.
    pub async fn recv(&mut self) -> Option<Update> {
        if self.stopped {
            return None;
        }
        self.rx.recv().await
    }

    /// Take an update if one is already queued. Never waits.
    pub fn try_recv(&mut self) -> Option<Update> {
        if self.stopped {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Stop the scan. Idempotent. Unregisters from the router first (no new
    /// events after that), then closes and drains the channel so queued but
    /// unconsumed events are discarded rather than leaked.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        self.shared.state().router.unregister(self.session_id);
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.stop();
    }
}
