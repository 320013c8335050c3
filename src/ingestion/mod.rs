//! # Ingestion merger
//!
//! Consumes broker envelopes, maintains the short-lived per-station
//! `SensorBuffer`, and runs the periodic batch cycle that reconciles it
//! with the state store and the durable persistence façade.

pub mod buffer;
pub mod inference;
pub mod merger;

pub use buffer::SensorBuffer;
pub use inference::{InferenceClient, NullInferenceClient};
pub use merger::IngestionMerger;
