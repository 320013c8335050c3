//! In-memory facade used by tests: no network I/O, state is inspectable
//! and failures can be injected to exercise the retry/error-classification
//! paths in `edge::gateway` and `assignment::controller` callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IotwxError;
use crate::model::{Reading, Station};

use super::PersistenceFacade;

pub struct MockPersistenceFacade {
    stations: Mutex<HashMap<String, Station>>,
    readings: Mutex<Vec<Reading>>,
    failing: AtomicBool,
    healthy: AtomicBool,
}

impl MockPersistenceFacade {
    pub fn new() -> Self {
        Self {
            stations: Mutex::new(HashMap::new()),
            readings: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
        }
    }

    /// Make every subsequent call return `PersistenceTransient`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn seed_station(&self, station: Station) {
        self.stations.lock().unwrap().insert(station.station_id.clone(), station);
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.readings.lock().unwrap().clone()
    }

    pub fn stations(&self) -> HashMap<String, Station> {
        self.stations.lock().unwrap().clone()
    }

    fn check_failing(&self) -> Result<(), IotwxError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(IotwxError::PersistenceTransient("mock facade set to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockPersistenceFacade {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceFacade for MockPersistenceFacade {
    async fn get_station(&self, station_id: &str) -> Result<Option<Station>, IotwxError> {
        self.check_failing()?;
        Ok(self.stations.lock().unwrap().get(station_id).cloned())
    }

    async fn upsert_station(&self, station: &Station) -> Result<(), IotwxError> {
        self.check_failing()?;
        self.stations
            .lock()
            .unwrap()
            .insert(station.station_id.clone(), station.clone());
        Ok(())
    }

    async fn insert_reading(&self, reading: &Reading) -> Result<(), IotwxError> {
        self.check_failing()?;
        self.readings.lock().unwrap().push(reading.clone());
        Ok(())
    }

    async fn update_station_last_active(&self, station_id: &str, ts: DateTime<Utc>) -> Result<(), IotwxError> {
        self.check_failing()?;
        let mut stations = self.stations.lock().unwrap();
        if let Some(station) = stations.get_mut(station_id) {
            station.last_active = ts;
        }
        Ok(())
    }

    async fn health(&self) -> Result<(), IotwxError> {
        self.check_failing()?;
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(IotwxError::PersistenceTransient("mock facade unhealthy".into()))
        }
    }
}
