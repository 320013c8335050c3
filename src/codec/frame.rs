//! # LoRa frame wire format
//!
//! The compact, single-object-per-packet LoRa frame described in the wire
//! codec design: 1-3 character keys to keep airtime short. `decode`/`encode`
//! round-trip exactly for every field the frame carries — absent optional
//! fields are omitted from the wire form rather than written as `null`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::IotwxError;

use super::tokens::type_full_name;

/// The `t` field: single-character frame type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Ping,
    Pong,
    KeepAlive,
    Disconnect,
    StationInfo,
    SensorData,
}

impl FrameType {
    pub fn code(self) -> char {
        match self {
            FrameType::Ping => 'A',
            FrameType::Pong => 'B',
            FrameType::KeepAlive => 'C',
            FrameType::Disconnect => 'D',
            FrameType::StationInfo => 'E',
            FrameType::SensorData => 'F',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'A' => Some(FrameType::Ping),
            'B' => Some(FrameType::Pong),
            'C' => Some(FrameType::KeepAlive),
            'D' => Some(FrameType::Disconnect),
            'E' => Some(FrameType::StationInfo),
            'F' => Some(FrameType::SensorData),
            _ => None,
        }
    }

    /// Full name used on the broker side (`ping`, `sensor_data`, ...).
    pub fn full_name(self) -> &'static str {
        type_full_name(self.code()).expect("every FrameType has a table entry")
    }
}

impl Serialize for FrameType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code().to_string())
    }
}

impl<'de> Deserialize<'de> for FrameType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let code = s.chars().next().ok_or_else(|| {
            serde::de::Error::custom("frame type code must not be empty")
        })?;
        FrameType::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown frame type code '{code}'")))
    }
}

/// A decoded LoRa frame. Field names match the wire tokens exactly via
/// `serde(rename)`; unset optional fields are skipped on encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraFrame {
    pub sid: String,
    #[serde(rename = "t")]
    pub frame_type: FrameType,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ty: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rssi: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rc: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub r: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub s: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub m: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub d: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ts: Option<String>,

    #[serde(rename = "fn", skip_serializing_if = "Option::is_none", default)]
    pub first_name: Option<String>,
    #[serde(rename = "ln", skip_serializing_if = "Option::is_none", default)]
    pub last_name: Option<String>,
    #[serde(rename = "e", skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    #[serde(rename = "o", skip_serializing_if = "Option::is_none", default)]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lon: Option<f64>,
    #[serde(rename = "al", skip_serializing_if = "Option::is_none", default)]
    pub altitude: Option<f64>,

    #[serde(rename = "p", skip_serializing_if = "Option::is_none", default)]
    pub sensor_protocol: Option<String>,
    #[serde(rename = "se", skip_serializing_if = "Option::is_none", default)]
    pub serial: Option<String>,
    #[serde(rename = "i2", skip_serializing_if = "Option::is_none", default)]
    pub i2c: Option<String>,
    #[serde(rename = "de", skip_serializing_if = "Option::is_none", default)]
    pub device: Option<String>,
}

impl LoraFrame {
    pub fn ping(sid: impl Into<String>) -> Self {
        Self::bare(sid, FrameType::Ping)
    }

    pub fn bare(sid: impl Into<String>, frame_type: FrameType) -> Self {
        Self {
            sid: sid.into(),
            frame_type,
            ty: None,
            l: None,
            rssi: None,
            rc: None,
            to: None,
            r: None,
            s: None,
            m: None,
            d: None,
            ts: None,
            first_name: None,
            last_name: None,
            email: None,
            organization: None,
            lat: None,
            lon: None,
            altitude: None,
            sensor_protocol: None,
            serial: None,
            i2c: None,
            device: None,
        }
    }
}

/// Decode a LoRa frame from raw bytes. Fails with `MalformedFrame` when the
/// JSON does not parse, `sid` is missing/non-string, `t` is unknown, or an
/// `F`-type frame lacks `s`/`m`/`d`.
pub fn decode(bytes: &[u8]) -> Result<LoraFrame, IotwxError> {
    let frame: LoraFrame =
        serde_json::from_slice(bytes).map_err(|e| IotwxError::MalformedFrame(e.to_string()))?;

    if frame.sid.is_empty() {
        return Err(IotwxError::MalformedFrame("sid must not be empty".into()));
    }
    if frame.frame_type == FrameType::SensorData
        && (frame.s.is_none() || frame.m.is_none() || frame.d.is_none())
    {
        return Err(IotwxError::MalformedFrame(
            "sensor-data frame missing s/m/d".into(),
        ));
    }
    Ok(frame)
}

/// Encode a LoRa frame to its compact wire form.
pub fn encode(frame: &LoraFrame) -> Vec<u8> {
    serde_json::to_vec(frame).expect("LoraFrame always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ping() {
        let frame = LoraFrame::ping("0123456789abcdef");
        let bytes = encode(&frame);
        assert_eq!(decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn round_trips_pong_with_load_and_rssi() {
        let mut frame = LoraFrame::bare("0123456789abcdef", FrameType::Pong);
        frame.ty = Some(1);
        frame.l = Some(0.42);
        frame.rssi = Some(-67);
        frame.rc = Some(0);
        frame.to = Some("fedcba9876543210".to_string());
        let bytes = encode(&frame);
        assert_eq!(decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn round_trips_sensor_data() {
        let mut frame = LoraFrame::bare("0123456789abcdef", FrameType::SensorData);
        frame.s = Some("bme680".to_string());
        frame.m = Some("tmp".to_string());
        frame.d = Some(21.1);
        frame.to = Some("fedcba9876543210".to_string());
        frame.r = Some(true);
        frame.ts = Some("2026-07-31T00:00:00Z".to_string());
        let bytes = encode(&frame);
        assert_eq!(decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn round_trips_station_info() {
        let mut frame = LoraFrame::bare("0123456789abcdef", FrameType::StationInfo);
        frame.first_name = Some("Ada".to_string());
        frame.last_name = Some("Lovelace".to_string());
        frame.email = Some("ada@example.org".to_string());
        frame.organization = Some("analytical engines".to_string());
        frame.lat = Some(40.0);
        frame.lon = Some(-105.3);
        frame.altitude = Some(1655.0);
        let bytes = encode(&frame);
        assert_eq!(decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(decode(b"not json"), Err(IotwxError::MalformedFrame(_))));
    }

    #[test]
    fn rejects_missing_sid() {
        let bytes = br#"{"t":"A"}"#;
        assert!(matches!(decode(bytes), Err(IotwxError::MalformedFrame(_))));
    }

    #[test]
    fn rejects_unknown_type_code() {
        let bytes = br#"{"sid":"0123456789abcdef","t":"Z"}"#;
        assert!(matches!(decode(bytes), Err(IotwxError::MalformedFrame(_))));
    }

    #[test]
    fn rejects_sensor_data_missing_fields() {
        let bytes = br#"{"sid":"0123456789abcdef","t":"F","s":"bme680"}"#;
        assert!(matches!(decode(bytes), Err(IotwxError::MalformedFrame(_))));
    }
}
