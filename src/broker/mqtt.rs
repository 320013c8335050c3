//! `rumqttc`-backed broker client. Spawns one background task that polls the
//! event loop and rebroadcasts incoming publishes; reconnection is handled
//! by driving the poll loop with a jittered backoff on error, base 30s per
//! `pi_lora.py`'s `connection_interval`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::IotwxError;

use super::{BrokerClient, IncomingMessage};

const RECONNECT_BASE: Duration = Duration::from_secs(30);

pub struct MqttBrokerClient {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    tx: broadcast::Sender<IncomingMessage>,
}

impl MqttBrokerClient {
    /// Connect to `host:port` under `client_id` and start the background
    /// poll/reconnect task.
    pub fn connect(client_id: &str, host: &str, port: u16) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut eventloop) = AsyncClient::new(options, 256);
        let connected = Arc::new(AtomicBool::new(false));
        let (tx, _rx) = broadcast::channel(1024);

        let task_connected = connected.clone();
        let task_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                        task_connected.store(true, Ordering::SeqCst);
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let _ = task_tx.send(IncomingMessage {
                            topic: publish.topic,
                            payload: publish.payload.to_vec(),
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "MQTT event loop error, backing off before retry");
                        task_connected.store(false, Ordering::SeqCst);
                        let jitter = rand::thread_rng().gen_range(0.0..5.0);
                        tokio::time::sleep(RECONNECT_BASE + Duration::from_secs_f64(jitter)).await;
                    }
                }
            }
        });

        Self {
            client,
            connected,
            tx,
        }
    }
}

#[async_trait]
impl BrokerClient for MqttBrokerClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), IotwxError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(IotwxError::BrokerUnavailable(topic.to_string()));
        }
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| IotwxError::BrokerUnavailable(e.to_string()))
    }

    async fn subscribe(&self, topic: &str) -> Result<(), IotwxError> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| IotwxError::BrokerUnavailable(e.to_string()))
    }

    fn incoming(&self) -> broadcast::Receiver<IncomingMessage> {
        self.tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
