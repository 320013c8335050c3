//! # Core data model
//!
//! Shared types for stations, edges, reachability, readings, and the
//! assignment map. None of these hold references to each other — every
//! relationship is expressed as an id looked up in an owning map, per the
//! no-cyclic-references design rule.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A station's most recently known position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Coords {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
}

impl Coords {
    pub fn is_complete(&self) -> bool {
        self.lat.is_some() && self.lon.is_some() && self.alt.is_some()
    }

    pub fn merge(&mut self, other: &Coords) {
        if other.lat.is_some() {
            self.lat = other.lat;
        }
        if other.lon.is_some() {
            self.lon = other.lon;
        }
        if other.alt.is_some() {
            self.alt = other.alt;
        }
    }
}

/// Owner profile attached to a station via a `station_info` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
}

/// A weather station known to the cloud tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub station_id: String,
    pub coords: Coords,
    pub owner: OwnerProfile,
    pub last_active: chrono::DateTime<chrono::Utc>,
    pub assigned_edge: Option<String>,
}

/// An edge gateway known to the cloud tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Edge {
    pub edge_id: String,
    pub load: f64,
    pub last_update: Option<chrono::DateTime<chrono::Utc>>,
    pub assigned_stations: std::collections::HashSet<String>,
}

/// A single `(station, sensor, measurement)` reading, append-only once
/// durably written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub station_id: String,
    pub edge_id: Option<String>,
    pub sensor_model: String,
    pub sensor_protocol: Option<String>,
    pub measurement: String,
    pub value: f64,
    pub rssi: Option<i32>,
    pub coords: Coords,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// `station_id -> edge_id`, rewritten atomically on each controller re-solve.
/// `None` means the station has no feasible assignment.
pub type AssignmentMap = HashMap<String, Option<String>>;

/// `station_id -> { edge_id: rssi }`, the live reachability graph.
pub type ReachabilityGraph = HashMap<String, HashMap<String, i32>>;
