//! Per-station merge buffer. Grounded on `mqtt_client.py`'s in-process
//! `sensor_data` dict (`buffer[station][sensor][measurement] = value`) and
//! the metadata fields it tracks alongside each reading.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{Coords, OwnerProfile};

/// Everything known about one station between batch flushes: merged
/// sensor readings plus the bookkeeping fields needed to flush them.
#[derive(Debug, Clone, Default)]
pub struct SensorBuffer {
    /// `sensor -> measurement -> latest value`.
    pub data: HashMap<String, HashMap<String, f64>>,
    pub last_active: DateTime<Utc>,
    pub edge_id: Option<String>,
    pub rssi: Option<i32>,
    pub coords: Coords,
    pub owner: OwnerProfile,
}

impl SensorBuffer {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_active: now,
            ..Default::default()
        }
    }

    /// Last-write-wins merge of one `(sensor, measurement, value)` reading.
    pub fn record_reading(&mut self, sensor: &str, measurement: &str, value: f64) {
        self.data
            .entry(sensor.to_string())
            .or_default()
            .insert(measurement.to_string(), value);
    }

    pub fn is_stale(&self, now: DateTime<Utc>, active_station_timeout: chrono::Duration) -> bool {
        now - self.last_active > active_station_timeout
    }
}
