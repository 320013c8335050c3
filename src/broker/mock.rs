//! Channel-backed broker used by tests: no real network I/O, publishes are
//! recorded for inspection and `inject` drives the `incoming()` stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::IotwxError;

use super::{BrokerClient, IncomingMessage};

pub struct MockBrokerClient {
    connected: AtomicBool,
    published: Mutex<Vec<(String, Vec<u8>)>>,
    subscribed: Mutex<Vec<String>>,
    tx: broadcast::Sender<IncomingMessage>,
}

impl MockBrokerClient {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            connected: AtomicBool::new(true),
            published: Mutex::new(Vec::new()),
            subscribed: Mutex::new(Vec::new()),
            tx,
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    pub fn subscribed_topics(&self) -> Vec<String> {
        self.subscribed.lock().unwrap().clone()
    }

    /// Simulate an incoming broker message for subscribers.
    pub fn inject(&self, topic: impl Into<String>, payload: Vec<u8>) {
        let _ = self.tx.send(IncomingMessage {
            topic: topic.into(),
            payload,
        });
    }
}

impl Default for MockBrokerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), IotwxError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(IotwxError::BrokerUnavailable(topic.to_string()));
        }
        self.published.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), IotwxError> {
        self.subscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    fn incoming(&self) -> broadcast::Receiver<IncomingMessage> {
        self.tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
