//! # Edge gateway
//!
//! Per-Pi LoRa protocol state machine, load model, and task orchestration.

pub mod gateway;
pub mod load;
pub mod state_machine;

pub use gateway::Gateway;
pub use load::{compute_load, FixedSampler, ProcSampler, SystemSampler, Utilization};
pub use state_machine::{should_accept, AttachmentState, AttachmentTable};
