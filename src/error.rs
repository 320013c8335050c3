//! # Error taxonomy
//!
//! Defines `IotwxError`, the single error type shared by the codec, transport,
//! broker, ingestion, assignment, and persistence layers. Each variant maps to
//! one of the propagation policies of the overall design: some are dropped and
//! counted, some retried with bounded backoff, some fatal at startup.

use thiserror::Error;

/// Errors that can occur anywhere in the telemetry pipeline.
#[derive(Debug, Error)]
pub enum IotwxError {
    /// A LoRa frame or broker envelope failed to parse or was missing a
    /// required field. Dropped; the caller increments a counter.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The LoRa transport's send half was busy (recv in progress). Retried
    /// on the next loop tick.
    #[error("transport busy")]
    TransportBusy,

    /// The broker connection is down. The caller enqueue-drops rather than
    /// buffering unboundedly.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// A persistence call failed transiently (5xx or connection error).
    /// Retried up to 3 times with exponential backoff.
    #[error("persistence transient error: {0}")]
    PersistenceTransient(String),

    /// A persistence call failed logically (4xx). Logged and dropped.
    #[error("persistence logical error: {0}")]
    PersistenceLogical(String),

    /// No feasible min-cost flow assignment exists; caller falls back to
    /// greedy per-station assignment.
    #[error("infeasible assignment")]
    InfeasibleAssignment,

    /// The edge gateway's load exceeds `overload_threshold`; incoming pings
    /// are refused.
    #[error("edge overloaded: load {0:.2}")]
    Overloaded(f64),

    /// Configuration failed validation. Fatal at startup.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

pub type Result<T> = std::result::Result<T, IotwxError>;
