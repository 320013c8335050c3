//! Controller-local view of stations and edges. Deliberately distinct from
//! `crate::model::Station`/`Edge` (the persisted records with owner/coords):
//! this is the graph-theoretic view `network.py`'s `Station`/`EdgeServer`
//! classes hold, scoped to exactly what scoring needs.

use std::collections::{HashMap, HashSet};

/// A station as the controller sees it: just its id and who can hear it.
#[derive(Debug, Clone, Default)]
pub struct Station {
    pub id: String,
    pub seen_by: HashMap<String, i32>,
}

/// An edge as the controller sees it: just its id and current load.
#[derive(Debug, Clone, Default)]
pub struct EdgeServer {
    pub id: String,
    pub assigned_stations: HashSet<String>,
}

/// One assignment change to announce to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Assigned { station_id: String, edge_id: String },
    Unassigned { station_id: String, edge_id: String },
}
