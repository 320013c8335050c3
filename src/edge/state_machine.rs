//! # Edge attachment state machine
//!
//! Per-station states `UNKNOWN -> PONGED -> ATTACHED -> STALE -> DETACHED`.
//! The table only tracks stations this edge has heard from; a station not
//! present in the table is implicitly `UNKNOWN`. Grounded on the
//! `recent_stations` set and ping/pong/timeout handling in `pi_lora.py`'s
//! main loop, made explicit as a state machine rather than a bare set.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Attachment state of one station as seen by this edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentState {
    Ponged,
    Attached,
    Stale,
}

#[derive(Debug, Clone)]
struct StationAttachment {
    state: AttachmentState,
    last_frame_at: DateTime<Utc>,
}

/// Tracks attachment state for every station this edge has seen.
#[derive(Debug, Default)]
pub struct AttachmentTable {
    stations: HashMap<String, StationAttachment>,
}

impl AttachmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_of(&self, station_id: &str) -> Option<AttachmentState> {
        self.stations.get(station_id).map(|s| s.state)
    }

    /// Number of stations currently tracked (any state), used as the edge
    /// load model's station-count term.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn is_attached(&self, station_id: &str) -> bool {
        matches!(
            self.state_of(station_id),
            Some(AttachmentState::Attached) | Some(AttachmentState::Stale)
        )
    }

    /// `UNKNOWN -> PONGED`. Caller has already confirmed load is below
    /// threshold; returns `true` when a pong burst should be scheduled
    /// (always, for a ping actually received).
    pub fn on_ping(&mut self, station_id: &str, now: DateTime<Utc>) -> bool {
        self.stations
            .entry(station_id.to_string())
            .or_insert(StationAttachment {
                state: AttachmentState::Ponged,
                last_frame_at: now,
            })
            .last_frame_at = now;
        true
    }

    /// `PONGED -> ATTACHED` (or revival from `STALE`) on an `E`/`F` frame
    /// addressed to this edge. Returns `true` if the station became (or
    /// remained) attached.
    pub fn on_addressed_frame(&mut self, station_id: &str, now: DateTime<Utc>) -> bool {
        let entry = self
            .stations
            .entry(station_id.to_string())
            .or_insert(StationAttachment {
                state: AttachmentState::Attached,
                last_frame_at: now,
            });
        entry.state = AttachmentState::Attached;
        entry.last_frame_at = now;
        true
    }

    /// Explicit `D` frame: any state -> `DETACHED`, the station is removed.
    /// Returns `true` if the station was known.
    pub fn on_disconnect(&mut self, station_id: &str) -> bool {
        self.stations.remove(station_id).is_some()
    }

    /// Advance `ATTACHED -> STALE -> DETACHED` based on elapsed time since
    /// each station's last frame. Returns the ids of stations that just
    /// transitioned to `DETACHED` (and were removed) so the caller can
    /// flush their sensor buffers.
    pub fn check_timeouts(
        &mut self,
        now: DateTime<Utc>,
        keep_alive_interval: Duration,
        active_station_timeout: Duration,
    ) -> Vec<String> {
        let mut detached = Vec::new();
        self.stations.retain(|station_id, attachment| {
            let elapsed = (now - attachment.last_frame_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if attachment.state == AttachmentState::Attached && elapsed > keep_alive_interval {
                attachment.state = AttachmentState::Stale;
            }
            if attachment.state == AttachmentState::Stale && elapsed > active_station_timeout {
                detached.push(station_id.clone());
                return false;
            }
            true
        });
        detached
    }
}

/// Routing decision for an incoming frame's `to` field, per the edge
/// gateway's accept/drop/relay rule.
pub fn should_accept(to: Option<&str>, relay_allowed: bool, this_edge_id: &str, already_attached: bool) -> bool {
    match to {
        Some(target) if target == this_edge_id => true,
        Some(_) => false,
        None => relay_allowed || already_attached,
    }
}
