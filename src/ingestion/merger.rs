//! Station-scoped merge buffer plus periodic batch cycle. Grounded on
//! `cloud/services/mqtt_listener/mqtt_client.py`'s `handle_station_info`/
//! `handle_reading`/main loop: per-envelope classification feeds an
//! in-process buffer, a periodic cycle reconciles it with the short-lived
//! state store, runs inference, and evicts stale stations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::codec::BrokerEnvelope;
use crate::config::StationConfig;
use crate::error::IotwxError;
use crate::model::{Reading, Station};
use crate::persistence::PersistenceFacade;
use crate::statestore::StateStore;

use super::buffer::SensorBuffer;
use super::inference::InferenceClient;

pub struct IngestionMerger {
    buffer: Mutex<HashMap<String, SensorBuffer>>,
    persistence: Arc<dyn PersistenceFacade>,
    state_store: Arc<dyn StateStore>,
    inference: Arc<dyn InferenceClient>,
    station_config: StationConfig,
}

impl IngestionMerger {
    pub fn new(
        persistence: Arc<dyn PersistenceFacade>,
        state_store: Arc<dyn StateStore>,
        inference: Arc<dyn InferenceClient>,
        station_config: StationConfig,
    ) -> Self {
        Self {
            buffer: Mutex::new(HashMap::new()),
            persistence,
            state_store,
            inference,
            station_config,
        }
    }

    fn active_station_timeout(&self) -> ChronoDuration {
        ChronoDuration::seconds(self.station_config.active_station_timeout_secs as i64)
    }

    /// Classify and fold one inbound broker envelope into the buffer.
    pub async fn handle_envelope(&self, envelope: &BrokerEnvelope) -> Result<(), IotwxError> {
        match envelope.message_type.as_str() {
            "keep_alive" | "disconnect" => Ok(()),
            "station_info" => self.handle_station_info(envelope).await,
            "sensor_data" => self.handle_sensor_data(envelope).await,
            other => {
                warn!(message_type = other, station_id = %envelope.station_id, "ignoring envelope of unhandled type");
                Ok(())
            }
        }
    }

    async fn handle_station_info(&self, envelope: &BrokerEnvelope) -> Result<(), IotwxError> {
        let existing = self.persistence.get_station(&envelope.station_id).await?;
        let mut station = existing.unwrap_or_else(|| Station {
            station_id: envelope.station_id.clone(),
            coords: envelope.coords,
            owner: envelope.owner.clone(),
            last_active: envelope.timestamp,
            assigned_edge: None,
        });
        station.coords.merge(&envelope.coords);
        if envelope.owner != Default::default() {
            station.owner = envelope.owner.clone();
        }
        station.last_active = envelope.timestamp;
        self.persistence.upsert_station(&station).await?;

        let mut buffer = self.buffer.lock().await;
        let entry = buffer
            .entry(envelope.station_id.clone())
            .or_insert_with(|| SensorBuffer::new(envelope.timestamp));
        entry.coords.merge(&envelope.coords);
        entry.owner = station.owner.clone();
        entry.last_active = envelope.timestamp;
        Ok(())
    }

    async fn handle_sensor_data(&self, envelope: &BrokerEnvelope) -> Result<(), IotwxError> {
        let sensor = envelope
            .sensor
            .as_deref()
            .ok_or_else(|| IotwxError::MalformedFrame("sensor_data envelope missing sensor".into()))?;
        let measurement = envelope
            .measurement
            .as_deref()
            .ok_or_else(|| IotwxError::MalformedFrame("sensor_data envelope missing measurement".into()))?;
        let value = envelope
            .value
            .ok_or_else(|| IotwxError::MalformedFrame("sensor_data envelope missing value".into()))?;

        let coords_now = {
            let mut buffer = self.buffer.lock().await;
            let entry = buffer
                .entry(envelope.station_id.clone())
                .or_insert_with(|| SensorBuffer::new(envelope.timestamp));
            entry.record_reading(sensor, measurement, value);
            entry.last_active = envelope.timestamp;
            entry.edge_id = envelope.edge_id.clone();
            entry.rssi = envelope.rssi.or(entry.rssi);
            entry.coords.merge(&envelope.coords);
            entry.coords
        };

        if coords_now.is_complete() {
            let reading = Reading {
                station_id: envelope.station_id.clone(),
                edge_id: envelope.edge_id.clone(),
                sensor_model: sensor.to_string(),
                sensor_protocol: envelope.sensor_protocol.clone(),
                measurement: measurement.to_string(),
                value,
                rssi: envelope.rssi,
                coords: coords_now,
                timestamp: envelope.timestamp,
            };
            self.persistence.insert_reading(&reading).await?;
        }
        Ok(())
    }

    /// Snapshot the buffer, merge with the state store's cache, run
    /// inference, write back with TTL, and evict stations that have gone
    /// quiet for longer than `active_station_timeout`.
    pub async fn run_batch(&self, now: DateTime<Utc>) -> Result<(), IotwxError> {
        let timeout = self.active_station_timeout();
        let snapshot: Vec<(String, SensorBuffer)> = {
            let buffer = self.buffer.lock().await;
            buffer.iter().map(|(id, b)| (id.clone(), b.clone())).collect()
        };

        let mut to_evict = Vec::new();
        for (station_id, buf) in &snapshot {
            if buf.is_stale(now, timeout) {
                to_evict.push(station_id.clone());
                continue;
            }

            let mut merged = self.state_store.get(station_id).await?.unwrap_or_default();
            merged.coords.merge(&buf.coords);
            for (sensor, measurements) in &buf.data {
                for (measurement, value) in measurements {
                    merged.values.insert(format!("{sensor}.{measurement}"), *value);
                }
            }
            merged.last_active = Some(buf.last_active);

            self.inference.infer(station_id, &merged).await?;

            self.state_store
                .set(station_id, merged, std::time::Duration::from_secs(self.station_config.active_station_timeout_secs))
                .await?;
        }

        if !to_evict.is_empty() {
            let mut buffer = self.buffer.lock().await;
            for station_id in &to_evict {
                buffer.remove(station_id);
            }
            info!(count = to_evict.len(), "evicted stale stations from ingestion buffer");
        }
        Ok(())
    }

    pub async fn buffered_station_ids(&self) -> Vec<String> {
        self.buffer.lock().await.keys().cloned().collect()
    }
}
