//! # Edge gateway orchestration
//!
//! Wires the attachment state machine, load model, transport, and broker
//! client into the task set described in the concurrency model: a receive
//! loop, a per-ping pong producer, a keep-alive ticker, and a load-update
//! ticker. The broker's own reconnect loop runs inside its client
//! implementation. Grounded on `pi_lora.py`'s `main()` loop, split into
//! cooperative tasks instead of one blocking `while True`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::codec::{self, FrameType, LoraFrame};
use crate::config::{RadioConfig, StationConfig};
use crate::error::IotwxError;
use crate::broker::BrokerClient;
use crate::transport::LoRaTransport;

use super::load::{compute_load, SystemSampler};
use super::state_machine::{should_accept, AttachmentTable};

/// A running edge gateway process.
pub struct Gateway {
    edge_id: String,
    transport: Arc<dyn LoRaTransport>,
    broker: Arc<dyn BrokerClient>,
    sampler: Arc<dyn SystemSampler>,
    radio_config: RadioConfig,
    station_config: StationConfig,
    attachment: Mutex<AttachmentTable>,
    load: RwLock<f64>,
    dropped_misrouted: AtomicUsize,
}

impl Gateway {
    pub fn new(
        edge_id: impl Into<String>,
        transport: Arc<dyn LoRaTransport>,
        broker: Arc<dyn BrokerClient>,
        sampler: Arc<dyn SystemSampler>,
        radio_config: RadioConfig,
        station_config: StationConfig,
    ) -> Self {
        Self {
            edge_id: edge_id.into(),
            transport,
            broker,
            sampler,
            radio_config,
            station_config,
            attachment: Mutex::new(AttachmentTable::new()),
            load: RwLock::new(0.0),
            dropped_misrouted: AtomicUsize::new(0),
        }
    }

    pub fn edge_id(&self) -> &str {
        &self.edge_id
    }

    pub async fn current_load(&self) -> f64 {
        *self.load.read().await
    }

    pub fn dropped_misrouted_count(&self) -> usize {
        self.dropped_misrouted.load(Ordering::Relaxed)
    }

    /// Recompute and store the load score. Called on a timer, not gated
    /// internally — the caller (ticker) owns the 30s cadence.
    pub async fn update_load(&self) {
        let n_stations = self.attachment.lock().await.len();
        let utilization = self.sampler.sample();
        let load = compute_load(utilization, n_stations, &self.radio_config);
        *self.load.write().await = load;
        info!(load, n_stations, "recomputed edge load");
    }

    /// Wait up to `timeout` for one packet off the transport and dispatch
    /// it. `Ok(())` on a bare timeout, same as `LoRaTransport::recv`.
    pub async fn receive_tick(self: &Arc<Self>, timeout: StdDuration) -> Result<(), IotwxError> {
        match self.transport.recv(timeout).await? {
            Some(frame) => self.handle_inbound(&frame.data, frame.rssi).await,
            None => Ok(()),
        }
    }

    /// Handle one decoded-or-not frame received off the air. `self` is
    /// wrapped in `Arc` so the pong burst can be spawned as an independent
    /// task without blocking the receive loop.
    #[instrument(skip(self, bytes), fields(edge_id = %self.edge_id))]
    pub async fn handle_inbound(self: &Arc<Self>, bytes: &[u8], rssi: i32) -> Result<(), IotwxError> {
        let frame = codec::decode(bytes)?;
        let now = Utc::now();

        match frame.frame_type {
            FrameType::Ping => self.handle_ping(&frame, rssi, now).await,
            FrameType::KeepAlive => Ok(()),
            FrameType::Disconnect => {
                self.attachment.lock().await.on_disconnect(&frame.sid);
                Ok(())
            }
            FrameType::Pong => Ok(()),
            FrameType::StationInfo | FrameType::SensorData => {
                self.handle_addressed_frame(&frame, rssi, now).await
            }
        }
    }

    async fn handle_ping(self: &Arc<Self>, frame: &LoraFrame, rssi: i32, now: chrono::DateTime<Utc>) -> Result<(), IotwxError> {
        let load = self.current_load().await;
        if load > self.radio_config.overload_threshold {
            warn!(load, station_id = %frame.sid, "refusing ping, overloaded");
            return Err(IotwxError::Overloaded(load));
        }
        self.attachment.lock().await.on_ping(&frame.sid, now);

        let gateway = self.clone();
        let station_id = frame.sid.clone();
        tokio::spawn(async move {
            gateway.run_pong_burst(station_id, load, rssi).await;
        });
        Ok(())
    }

    /// Pong burst producer: a random initial delay, then repeated pongs for
    /// `pong_duration` seconds. Runs as its own task so the receive loop is
    /// never blocked; the transport's internal lock serializes with inbound
    /// traffic.
    async fn run_pong_burst(self: Arc<Self>, station_id: String, load: f64, rssi: i32) {
        let initial_delay_secs = rand::thread_rng().gen_range(0.0..=self.radio_config.pong_initial_delay_max_secs);
        tokio::time::sleep(StdDuration::from_secs_f64(initial_delay_secs)).await;

        let mut pong = LoraFrame::bare(self.edge_id.clone(), FrameType::Pong);
        pong.ty = Some(1);
        pong.l = Some(load);
        pong.rssi = Some(rssi);
        pong.rc = Some(0);
        pong.to = Some(station_id.clone());
        let bytes = codec::encode(&pong);

        let deadline = tokio::time::Instant::now() + StdDuration::from_secs_f64(self.radio_config.pong_duration_secs);
        let mut sent = 0u32;
        while tokio::time::Instant::now() < deadline {
            if let Err(e) = self.transport.send(&bytes).await {
                warn!(error = %e, station_id, "pong send failed");
            } else {
                sent += 1;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        info!(station_id, sent, "pong burst complete");
    }

    async fn handle_addressed_frame(&self, frame: &LoraFrame, rssi: i32, now: chrono::DateTime<Utc>) -> Result<(), IotwxError> {
        let already_attached = self.attachment.lock().await.is_attached(&frame.sid);
        if !should_accept(frame.to.as_deref(), frame.r.unwrap_or(false), &self.edge_id, already_attached) {
            self.dropped_misrouted.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        self.attachment.lock().await.on_addressed_frame(&frame.sid, now);

        let envelope = codec::from_lora_frame(frame, Some(self.edge_id.clone()), rssi, now);
        let topic = codec::topic_for_station(&frame.sid);
        let payload = serde_json::to_vec(&envelope)
            .map_err(|e| IotwxError::MalformedFrame(e.to_string()))?;

        self.publish_with_retry(&topic, payload).await
    }

    /// Broker publish failures are counted and retried with bounded
    /// exponential backoff; the LoRa side never learns of the outcome
    /// (frames are fire-and-forget).
    async fn publish_with_retry(&self, topic: &str, payload: Vec<u8>) -> Result<(), IotwxError> {
        let mut attempt = 0;
        loop {
            match self.broker.publish(topic, payload.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < 2 => {
                    attempt += 1;
                    warn!(error = %e, attempt, topic, "broker publish failed, retrying");
                    tokio::time::sleep(StdDuration::from_millis(100 * 2u64.pow(attempt))).await;
                }
                Err(e) => {
                    warn!(error = %e, topic, "broker publish failed, giving up");
                    return Err(e);
                }
            }
        }
    }

    /// Emit a keep-alive frame to every attached station and advance the
    /// attachment table's timeouts. Returns the stations that were just
    /// detached.
    pub async fn keep_alive_tick(&self) -> Vec<String> {
        let now = Utc::now();
        let keep_alive_interval = StdDuration::from_secs_f64(self.radio_config.keep_alive_interval_secs);
        let active_timeout = StdDuration::from_secs(self.station_config.active_station_timeout_secs);

        let mut attachment = self.attachment.lock().await;
        let detached = attachment.check_timeouts(now, keep_alive_interval, active_timeout);
        drop(attachment);

        let keep_alive = LoraFrame::bare(self.edge_id.clone(), FrameType::KeepAlive);
        let bytes = codec::encode(&keep_alive);
        if let Err(e) = self.transport.send(&bytes).await {
            warn!(error = %e, "keep-alive send failed");
        }
        detached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MockBrokerClient;
    use crate::codec::{encode, FrameType, LoraFrame};
    use crate::transport::MockTransport;

    fn gateway() -> (Arc<Gateway>, Arc<MockTransport>, Arc<MockBrokerClient>) {
        let transport = Arc::new(MockTransport::new());
        let broker = Arc::new(MockBrokerClient::new());
        let sampler = Arc::new(super::super::load::FixedSampler(super::super::load::Utilization {
            cpu: 0.1,
            mem: 0.1,
        }));
        let gateway = Arc::new(Gateway::new(
            "edge-1",
            transport.clone() as Arc<dyn LoRaTransport>,
            broker.clone() as Arc<dyn BrokerClient>,
            sampler,
            RadioConfig::default(),
            StationConfig::default(),
        ));
        (gateway, transport, broker)
    }

    #[tokio::test]
    async fn ping_schedules_pong_burst() {
        let (gateway, transport, _broker) = gateway();
        let mut ping = LoraFrame::bare("s1", FrameType::Ping);
        ping.frame_type = FrameType::Ping;
        let bytes = encode(&ping);

        gateway.handle_inbound(&bytes, -60).await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(700)).await;
        let sent = transport.take_sent().await;
        assert!(!sent.is_empty(), "expected at least one pong to be sent");
    }

    #[tokio::test]
    async fn overloaded_refuses_ping() {
        let (gateway, _transport, _broker) = gateway();
        *gateway.load.write().await = 0.99;
        let ping = LoraFrame::bare("s1", FrameType::Ping);
        let bytes = encode(&ping);
        let err = gateway.handle_inbound(&bytes, -60).await.unwrap_err();
        assert!(matches!(err, IotwxError::Overloaded(_)));
    }

    #[tokio::test]
    async fn addressed_sensor_frame_publishes_to_broker() {
        let (gateway, _transport, broker) = gateway();
        let mut frame = LoraFrame::bare("s1", FrameType::SensorData);
        frame.s = Some("bme680".to_string());
        frame.m = Some("tmp".to_string());
        frame.d = Some(21.1);
        frame.to = Some("edge-1".to_string());
        let bytes = encode(&frame);

        gateway.handle_inbound(&bytes, -60).await.unwrap();
        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "iotwx/s1");
    }

    #[tokio::test]
    async fn misdirected_frame_is_dropped_and_counted() {
        let (gateway, _transport, broker) = gateway();
        let mut frame = LoraFrame::bare("s1", FrameType::SensorData);
        frame.s = Some("bme680".to_string());
        frame.m = Some("tmp".to_string());
        frame.d = Some(21.1);
        frame.to = Some("edge-2".to_string());
        let bytes = encode(&frame);

        gateway.handle_inbound(&bytes, -60).await.unwrap();
        assert!(broker.published().is_empty());
        assert_eq!(gateway.dropped_misrouted_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_removes_attachment() {
        let (gateway, _transport, _broker) = gateway();
        let mut frame = LoraFrame::bare("s1", FrameType::SensorData);
        frame.s = Some("bme680".to_string());
        frame.m = Some("tmp".to_string());
        frame.d = Some(21.1);
        frame.to = Some("edge-1".to_string());
        gateway.handle_inbound(&encode(&frame), -60).await.unwrap();
        assert!(gateway.attachment.lock().await.is_attached("s1"));

        let disconnect = LoraFrame::bare("s1", FrameType::Disconnect);
        gateway.handle_inbound(&encode(&disconnect), -60).await.unwrap();
        assert!(!gateway.attachment.lock().await.is_attached("s1"));
    }
}
