//! # Broker I/O
//!
//! `BrokerClient` is the seam between the rest of the crate and the MQTT
//! broker. Publishes are at-least-once (QoS 1); the merger and assignment
//! controller are idempotent per `(sensor, measurement)`, so duplicate
//! delivery is harmless. Grounded on `pi_lora.py`'s `MQTTClientWrapper`
//! (connect-interval gate, drop-when-disconnected publish) and
//! `dynamic_assignment_network.py`'s periodic reconnect call.

pub mod mock;
pub mod mqtt;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::IotwxError;

/// A message delivered on a subscribed topic.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Common interface over the MQTT broker connection.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Publish at QoS 1. Returns `BrokerUnavailable` if not currently
    /// connected — callers must drop rather than buffer unboundedly.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), IotwxError>;

    /// Subscribe to a topic (supports MQTT wildcards, e.g. `iotwx/+`).
    async fn subscribe(&self, topic: &str) -> Result<(), IotwxError>;

    /// A fresh receiver of all messages delivered to topics this client has
    /// subscribed to. Lagging receivers silently skip ahead (`broadcast`
    /// semantics) rather than blocking the publisher.
    fn incoming(&self) -> broadcast::Receiver<IncomingMessage>;

    fn is_connected(&self) -> bool;
}

pub use mock::MockBrokerClient;
pub use mqtt::MqttBrokerClient;
