//! # Token tables
//!
//! The compact LoRa frame uses 1-3 character keys to keep airtime short;
//! the broker envelope spells them out. These tables are the exhaustive
//! token-to-full-name mapping the codec preserves bi-directionally, used
//! both to translate frame field names and — for the handful of tokens
//! that double as *values* of the `measurement` field — to translate those
//! values too (a station may report `m: "tmp"` and the broker side expands
//! it to `"temperature"`).

/// Frame-type single-character codes.
pub const TYPE_CODES: &[(char, &str)] = &[
    ('A', "ping"),
    ('B', "pong"),
    ('C', "keep_alive"),
    ('D', "disconnect"),
    ('E', "station_info"),
    ('F', "sensor_data"),
];

pub fn type_full_name(code: char) -> Option<&'static str> {
    TYPE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Measurement-name tokens: short forms a station may use as the value of
/// the `m` field, expanded to their full names on the broker side.
pub const MEASUREMENT_TOKENS: &[(&str, &str)] = &[
    ("tmp", "temperature"),
    ("rh", "relative_humidity"),
    ("pre", "pressure"),
    ("uvs", "uv_light"),
    ("als", "ambient_light"),
    ("pm0", "pm10_standard"),
    ("pm1", "pm25_standard"),
    ("pm2", "pm100_standard"),
    ("pm3", "pm10_env"),
    ("pm4", "pm25_env"),
    ("pm5", "pm100_env"),
    ("pm6", "partcount_03um"),
    ("pm7", "partcount_05um"),
    ("pm8", "partcount_10um"),
    ("pm9", "partcount_25um"),
    ("pm10", "partcount_50um"),
    ("pm11", "partcount_100um"),
    ("ra", "rainfall_accumulated"),
    ("re", "rainfall_event"),
    ("rt", "rainfall_total"),
    ("ri", "rain_intensity"),
    ("gr", "gas_resistance"),
    ("C02", "co2_concentration"),
];

/// Expand a measurement token to its full name; tokens already spelled out
/// (or simply unrecognized) pass through unchanged.
pub fn expand_measurement(value: &str) -> String {
    MEASUREMENT_TOKENS
        .iter()
        .find(|(token, _)| *token == value)
        .map(|(_, full)| full.to_string())
        .unwrap_or_else(|| value.to_string())
}
