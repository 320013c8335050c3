//! # Short-lived state store
//!
//! Narrow key/value façade for the ingestion merger's per-station cache:
//! latest coordinates, latest merged reading snapshot, and last-active
//! timestamp, each with a TTL so a station that stops transmitting quietly
//! ages out rather than lingering forever. Grounded on
//! `mqtt_client.py`'s Redis hash usage (`hset`/`hget`/`expire` on key
//! `station:{id}`) — the trait is the seam a real Redis-backed
//! implementation would satisfy; the shipped implementation keeps the
//! state in-process since the retrieval pack carries no Redis client
//! precedent and the façade boundary is what matters here, not the
//! backing store.

pub mod mock;
pub mod ttl_map;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IotwxError;
use crate::model::Coords;

/// The merged, last-known state for one station: current coordinates and
/// the most recent value seen for each `(sensor, measurement)` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub coords: Coords,
    /// Keyed by `"{sensor}.{measurement}"`, matching the Redis field naming
    /// `mqtt_client.py` uses to disambiguate readings from multiple sensors.
    pub values: HashMap<String, f64>,
    pub last_active: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, station_id: &str) -> Result<Option<SensorSnapshot>, IotwxError>;

    /// Replace the stored snapshot and reset its expiry to `ttl` from now.
    async fn set(&self, station_id: &str, snapshot: SensorSnapshot, ttl: Duration) -> Result<(), IotwxError>;

    /// Update just `last_active` and refresh the entry's TTL, without
    /// touching the rest of the snapshot.
    async fn touch_last_active(&self, station_id: &str, ts: DateTime<Utc>, ttl: Duration) -> Result<(), IotwxError>;
}

pub use mock::MockStateStore;
pub use ttl_map::TtlMapStateStore;
