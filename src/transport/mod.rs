//! # LoRa transport
//!
//! `LoRaTransport` is the seam between the edge gateway logic and whatever
//! radio module is actually attached. Hardware SPI/driver concerns never
//! enter this crate; callers provide an implementation of this trait. A
//! single LoRa module is half-duplex, so the gateway serializes access to
//! one shared transport behind a `tokio::sync::Mutex` rather than this trait
//! enforcing it.

pub mod mock;
pub mod udp;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::IotwxError;

/// A frame received off the air, with the radio's reported signal strength.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedFrame {
    pub data: Vec<u8>,
    pub rssi: i32,
}

/// Common interface for a half-duplex LoRa radio module.
#[async_trait]
pub trait LoRaTransport: Send + Sync {
    /// Transmit a frame. Returns `TransportBusy` if the radio is mid-receive
    /// and cannot switch to transmit right now.
    async fn send(&self, data: &[u8]) -> Result<(), IotwxError>;

    /// Wait up to `timeout` for an incoming frame. `Ok(None)` on timeout with
    /// nothing received, never an error — timeouts are routine polling, not
    /// a failure condition.
    async fn recv(&self, timeout: Duration) -> Result<Option<ReceivedFrame>, IotwxError>;
}

pub use mock::MockTransport;
pub use udp::UdpTransport;
