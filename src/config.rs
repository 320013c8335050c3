//! # Configuration
//!
//! One frozen configuration schema, loaded once at startup from a YAML file
//! and never mutated at runtime. Mirrors the `mqtt` / `radio` / `station` /
//! `assignment` sections of the original `config.yml`, with every tunable
//! enumerated and defaulted per the documented defaults.

use std::path::Path;

use serde::Deserialize;

use crate::error::IotwxError;

/// Top-level configuration, deserialized from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub radio: RadioConfig,
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub assignment: AssignmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub broker_ip: String,
    pub broker_port: u16,
    #[serde(default = "default_msg_topic")]
    pub msg_topic: String,
    #[serde(default = "default_edge_topic_template")]
    pub edge_topic_template: String,
    #[serde(default = "default_assignment_timeout")]
    pub assignment_timeout: u64,
}

fn default_msg_topic() -> String {
    "iotwx/+".to_string()
}

fn default_edge_topic_template() -> String {
    "edge/{edge_id}/assignments".to_string()
}

fn default_assignment_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub rcv_timeout_secs: f64,
    pub overload_threshold: f64,
    pub keep_alive_interval_secs: f64,
    pub pong_duration_secs: f64,
    pub pong_initial_delay_max_secs: f64,
    pub cpu_weight: f64,
    pub mem_weight: f64,
    pub station_weight: f64,
    pub station_steepness: f64,
    pub station_midpoint: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            rcv_timeout_secs: 0.5,
            overload_threshold: 0.85,
            keep_alive_interval_secs: 30.0,
            pong_duration_secs: 3.0,
            pong_initial_delay_max_secs: 0.5,
            cpu_weight: 0.4,
            mem_weight: 0.3,
            station_weight: 0.3,
            station_steepness: 1.0,
            station_midpoint: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub active_station_timeout_secs: u64,
    pub batch_interval_secs: u64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            active_station_timeout_secs: 60,
            batch_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssignmentConfig {
    pub hysteresis: f64,
    pub rssi_min: i32,
    pub rssi_max: i32,
    pub join_dwell_secs: u64,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            hysteresis: 0.1,
            rssi_min: -120,
            rssi_max: -30,
            join_dwell_secs: 5,
        }
    }
}

impl Config {
    /// Load and validate configuration from a YAML file.
    ///
    /// Fails fast with `ConfigInvalid` when the file is missing, unparsable,
    /// or fails validation (e.g. `rssi_max <= rssi_min`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IotwxError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            IotwxError::ConfigInvalid(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| IotwxError::ConfigInvalid(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), IotwxError> {
        if self.assignment.rssi_max <= self.assignment.rssi_min {
            return Err(IotwxError::ConfigInvalid(
                "assignment.rssi_max must be greater than assignment.rssi_min".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.radio.overload_threshold) {
            return Err(IotwxError::ConfigInvalid(
                "radio.overload_threshold must be in [0, 1]".to_string(),
            ));
        }
        let weight_sum = self.radio.cpu_weight + self.radio.mem_weight + self.radio.station_weight;
        if (weight_sum - 1.0).abs() > 1e-6 {
            return Err(IotwxError::ConfigInvalid(format!(
                "radio load weights must sum to 1.0, got {weight_sum}"
            )));
        }
        Ok(())
    }
}
