//! # Broker envelope
//!
//! The spelled-out JSON document published to the MQTT broker, built from a
//! decoded `LoraFrame` plus context the edge gateway observes (the RSSI of
//! the received packet, the receive timestamp). Measurement tokens and frame
//! type codes are expanded to their full names here; the compact wire form
//! never reaches the broker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Coords, OwnerProfile};

use super::frame::LoraFrame;
use super::tokens::expand_measurement;

/// The document published on `iotwx/{station_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerEnvelope {
    pub station_id: String,
    pub edge_id: Option<String>,
    pub message_type: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sensor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sensor_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rssi: Option<i32>,

    #[serde(default)]
    pub coords: Coords,
    #[serde(default)]
    pub owner: OwnerProfile,

    pub timestamp: DateTime<Utc>,
}

/// Build the broker envelope for a frame received with observed `rssi` at
/// `now`. Station-info fields and sensor-data fields are each carried
/// through only when the frame actually has them. `rssi` is always the
/// edge's own observed value, not the frame's `rssi` token (that token only
/// ever appears on pong frames, which never become broker envelopes).
/// `timestamp` is filled in from the station's own `ts` when the frame
/// carries one; `now` is only a fallback for frames that omit it.
pub fn from_lora_frame(frame: &LoraFrame, edge_id: Option<String>, rssi: i32, now: DateTime<Utc>) -> BrokerEnvelope {
    let coords = Coords {
        lat: frame.lat,
        lon: frame.lon,
        alt: frame.altitude,
    };
    let owner = OwnerProfile {
        firstname: frame.first_name.clone(),
        lastname: frame.last_name.clone(),
        email: frame.email.clone(),
        organization: frame.organization.clone(),
    };
    let timestamp = frame
        .ts
        .as_deref()
        .filter(|ts| !ts.is_empty())
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(now);

    BrokerEnvelope {
        station_id: frame.sid.clone(),
        edge_id,
        message_type: frame.frame_type.full_name().to_string(),
        sensor: frame.s.clone(),
        sensor_protocol: frame.sensor_protocol.clone(),
        measurement: frame.m.as_deref().map(expand_measurement),
        value: frame.d,
        rssi: Some(rssi),
        coords,
        owner,
        timestamp,
    }
}

/// Topic a station's envelopes are published on.
pub fn topic_for_station(station_id: &str) -> String {
    format!("iotwx/{station_id}")
}

/// Render an edge's assignment-directive topic from the configured template
/// (`"edge/{edge_id}/assignments"` by default).
pub fn topic_for_edge(template: &str, edge_id: &str) -> String {
    template.replace("{edge_id}", edge_id)
}
