//! # Wire codec
//!
//! Translates between the compact LoRa frame stations transmit and the
//! spelled-out broker envelope the cloud tier consumes.

pub mod envelope;
pub mod frame;
pub mod tokens;

pub use envelope::{from_lora_frame, topic_for_edge, topic_for_station, BrokerEnvelope};
pub use frame::{decode, encode, FrameType, LoraFrame};
