//! Network-backed stand-in for a physical LoRa radio. The radio SPI/I2C
//! driver itself is out of scope (spec.md's hardware non-goal: "specified
//! only by the contract they present") — this implements that contract
//! over UDP so the gateway can be exercised end-to-end without hardware,
//! with a real radio driver expected to sit behind a bridge process that
//! forwards packets to/from this socket.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout as tokio_timeout;

use crate::error::IotwxError;

use super::{LoRaTransport, ReceivedFrame};

/// The contract has no notion of signal strength over a loopback UDP link;
/// frames carry a fixed RSSI unless the frame itself reports one.
const NO_RSSI: i32 = -60;

pub struct UdpTransport {
    socket: UdpSocket,
    last_peer: Mutex<Option<SocketAddr>>,
}

impl UdpTransport {
    pub async fn bind(local_addr: &str) -> Result<Self, IotwxError> {
        let socket = UdpSocket::bind(local_addr)
            .await
            .map_err(|e| IotwxError::ConfigInvalid(format!("cannot bind {local_addr}: {e}")))?;
        Ok(Self {
            socket,
            last_peer: Mutex::new(None),
        })
    }
}

#[async_trait]
impl LoRaTransport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<(), IotwxError> {
        let peer = *self.last_peer.lock().unwrap();
        let Some(peer) = peer else {
            return Err(IotwxError::TransportBusy);
        };
        self.socket
            .send_to(data, peer)
            .await
            .map(|_| ())
            .map_err(|_| IotwxError::TransportBusy)
    }

    async fn recv(&self, timeout: Duration) -> Result<Option<ReceivedFrame>, IotwxError> {
        let mut buf = [0u8; 2048];
        match tokio_timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((len, peer))) => {
                *self.last_peer.lock().unwrap() = Some(peer);
                Ok(Some(ReceivedFrame {
                    data: buf[..len].to_vec(),
                    rssi: NO_RSSI,
                }))
            }
            Ok(Err(_)) => Ok(None),
            Err(_) => Ok(None),
        }
    }
}
