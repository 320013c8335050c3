//! In-memory store used by unit tests that don't care about TTL expiry,
//! with a failure-injection hook for exercising the merger's error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IotwxError;

use super::{SensorSnapshot, StateStore};

pub struct MockStateStore {
    entries: Mutex<HashMap<String, SensorSnapshot>>,
    failing: AtomicBool,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), IotwxError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(IotwxError::PersistenceTransient("mock state store set to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MockStateStore {
    async fn get(&self, station_id: &str) -> Result<Option<SensorSnapshot>, IotwxError> {
        self.check_failing()?;
        Ok(self.entries.lock().unwrap().get(station_id).cloned())
    }

    async fn set(&self, station_id: &str, snapshot: SensorSnapshot, _ttl: Duration) -> Result<(), IotwxError> {
        self.check_failing()?;
        self.entries.lock().unwrap().insert(station_id.to_string(), snapshot);
        Ok(())
    }

    async fn touch_last_active(&self, station_id: &str, ts: DateTime<Utc>, _ttl: Duration) -> Result<(), IotwxError> {
        self.check_failing()?;
        let mut entries = self.entries.lock().unwrap();
        entries.entry(station_id.to_string()).or_default().last_active = Some(ts);
        Ok(())
    }
}
