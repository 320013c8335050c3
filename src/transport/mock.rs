//! In-memory transport used by tests and by the demo binaries' dry-run mode.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::IotwxError;

use super::{LoRaTransport, ReceivedFrame};

/// A transport backed by two in-process queues: frames pushed onto `inbound`
/// are handed back by `recv`, frames passed to `send` land on `sent` for the
/// test to inspect.
#[derive(Default)]
pub struct MockTransport {
    inbound: Mutex<VecDeque<ReceivedFrame>>,
    sent: Mutex<VecDeque<Vec<u8>>>,
    busy: std::sync::atomic::AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame to be returned by the next `recv`.
    pub async fn push_inbound(&self, frame: ReceivedFrame) {
        self.inbound.lock().await.push_back(frame);
    }

    /// Drain everything passed to `send` so far.
    pub async fn take_sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().await.drain(..).collect()
    }

    /// Force the next `send` to fail with `TransportBusy`.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl LoRaTransport for MockTransport {
    async fn send(&self, data: &[u8]) -> Result<(), IotwxError> {
        if self.busy.swap(false, std::sync::atomic::Ordering::SeqCst) {
            return Err(IotwxError::TransportBusy);
        }
        self.sent.lock().await.push_back(data.to_vec());
        Ok(())
    }

    async fn recv(&self, _timeout: Duration) -> Result<Option<ReceivedFrame>, IotwxError> {
        Ok(self.inbound.lock().await.pop_front())
    }
}
