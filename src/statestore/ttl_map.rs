//! In-process TTL-expiring map backing [`StateStore`]. Entries carry their
//! own expiry instant; reads lazily evict anything past it rather than
//! running a background sweeper, since station counts at this scale (per
//! spec.md's deployment sizing) make a sweep unnecessary.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IotwxError;

use super::{SensorSnapshot, StateStore};

struct Entry {
    snapshot: SensorSnapshot,
    expires_at: Instant,
}

pub struct TtlMapStateStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl TtlMapStateStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_live(entries: &mut HashMap<String, Entry>, station_id: &str) -> Option<SensorSnapshot> {
        match entries.get(station_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.snapshot.clone()),
            Some(_) => {
                entries.remove(station_id);
                None
            }
            None => None,
        }
    }
}

impl Default for TtlMapStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for TtlMapStateStore {
    async fn get(&self, station_id: &str) -> Result<Option<SensorSnapshot>, IotwxError> {
        let mut entries = self.entries.lock().unwrap();
        Ok(Self::get_live(&mut entries, station_id))
    }

    async fn set(&self, station_id: &str, snapshot: SensorSnapshot, ttl: Duration) -> Result<(), IotwxError> {
        self.entries.lock().unwrap().insert(
            station_id.to_string(),
            Entry {
                snapshot,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn touch_last_active(&self, station_id: &str, ts: DateTime<Utc>, ttl: Duration) -> Result<(), IotwxError> {
        let mut entries = self.entries.lock().unwrap();
        let mut snapshot = Self::get_live(&mut entries, station_id).unwrap_or_default();
        snapshot.last_active = Some(ts);
        entries.insert(
            station_id.to_string(),
            Entry {
                snapshot,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = TtlMapStateStore::new();
        let mut snapshot = SensorSnapshot::default();
        snapshot.values.insert("bme280.temperature".to_string(), 21.5);
        store.set("s1", snapshot.clone(), Duration::from_secs(60)).await.unwrap();
        let got = store.get("s1").await.unwrap().unwrap();
        assert_eq!(got.values["bme280.temperature"], 21.5);
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let store = TtlMapStateStore::new();
        store
            .set("s1", SensorSnapshot::default(), Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touch_last_active_preserves_existing_values() {
        let store = TtlMapStateStore::new();
        let mut snapshot = SensorSnapshot::default();
        snapshot.values.insert("bme280.humidity".to_string(), 55.0);
        store.set("s1", snapshot, Duration::from_secs(60)).await.unwrap();
        let now = Utc::now();
        store.touch_last_active("s1", now, Duration::from_secs(60)).await.unwrap();
        let got = store.get("s1").await.unwrap().unwrap();
        assert_eq!(got.values["bme280.humidity"], 55.0);
        assert_eq!(got.last_active, Some(now));
    }
}
