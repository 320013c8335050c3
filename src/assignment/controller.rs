//! # Assignment controller
//!
//! Exact mirror of `network.py`'s `DynamicAssignmentNetwork`: scoring,
//! incremental greedy assignment on join, full min-cost re-solve with
//! greedy fallback on infeasibility, and directive emission. The
//! `join_dwell` gate is this crate's own addition (resolving the Open
//! Question the distillation flagged): a station isn't eligible for
//! assignment until at least `join_dwell` has elapsed since it was first
//! seen, so multiple edges can report its RSSI before a choice is locked
//! in.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::AssignmentConfig;
use crate::model::AssignmentMap;

use super::flow::MinCostFlow;
use super::model::{Directive, EdgeServer, Station};

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

pub struct AssignmentController {
    stations: HashMap<String, Station>,
    edges: HashMap<String, EdgeServer>,
    station_to_edge: AssignmentMap,
    pending: HashMap<String, DateTime<Utc>>,
    hysteresis: f64,
    rssi_min: i32,
    rssi_max: i32,
    join_dwell: Duration,
}

impl AssignmentController {
    pub fn new(config: &AssignmentConfig) -> Self {
        Self {
            stations: HashMap::new(),
            edges: HashMap::new(),
            station_to_edge: HashMap::new(),
            pending: HashMap::new(),
            hysteresis: config.hysteresis,
            rssi_min: config.rssi_min,
            rssi_max: config.rssi_max,
            join_dwell: Duration::from_secs(config.join_dwell_secs),
        }
    }

    pub fn assignments(&self) -> AssignmentMap {
        self.station_to_edge.clone()
    }

    pub fn edge_loads(&self) -> HashMap<String, usize> {
        self.edges
            .iter()
            .map(|(id, e)| (id.clone(), e.assigned_stations.len()))
            .collect()
    }

    pub fn is_pending(&self, station_id: &str) -> bool {
        self.pending.contains_key(station_id)
    }

    fn score(&self, station: &Station, edge_id: &str) -> f64 {
        if self.stations.is_empty() {
            return 0.0;
        }
        let rssi = *station.seen_by.get(edge_id).expect("edge must be reachable to score it");
        let rssi_score = clamp01((rssi - self.rssi_min) as f64 / (self.rssi_max - self.rssi_min) as f64);
        let assigned = self.edges.get(edge_id).map(|e| e.assigned_stations.len()).unwrap_or(0);
        let load_score = 1.0 - (assigned as f64 / self.stations.len() as f64);
        let mut score = 0.7 * rssi_score + 0.3 * load_score;
        if self.station_to_edge.get(&station.id).and_then(|e| e.as_deref()) == Some(edge_id) {
            score += self.hysteresis;
        }
        score
    }

    /// `argmax` over reachable edges, tie-broken by (previous assignment,
    /// then lexicographically smaller edge id).
    fn best_edge_for(&self, station: &Station) -> Option<String> {
        let previous = self.station_to_edge.get(&station.id).and_then(|e| e.clone());
        let mut best: Option<(String, f64)> = None;
        for edge_id in station.seen_by.keys() {
            if !self.edges.contains_key(edge_id) {
                continue;
            }
            let s = self.score(station, edge_id);
            best = Some(match best {
                None => (edge_id.clone(), s),
                Some((cur_id, cur_score)) => {
                    if s > cur_score + 1e-9 {
                        (edge_id.clone(), s)
                    } else if (s - cur_score).abs() <= 1e-9 {
                        if previous.as_deref() == Some(edge_id.as_str()) {
                            (edge_id.clone(), s)
                        } else if previous.as_deref() == Some(cur_id.as_str()) {
                            (cur_id, cur_score)
                        } else if edge_id < &cur_id {
                            (edge_id.clone(), s)
                        } else {
                            (cur_id, cur_score)
                        }
                    } else {
                        (cur_id, cur_score)
                    }
                }
            });
        }
        best.map(|(id, _)| id)
    }

    fn apply_new_assignment(&mut self, station_id: &str, new_edge: Option<String>) -> Vec<Directive> {
        let old_edge = self.station_to_edge.get(station_id).and_then(|e| e.clone());
        if old_edge == new_edge {
            return Vec::new();
        }
        if let Some(old) = &old_edge {
            if let Some(edge) = self.edges.get_mut(old) {
                edge.assigned_stations.remove(station_id);
            }
        }
        if let Some(new) = &new_edge {
            if let Some(edge) = self.edges.get_mut(new) {
                edge.assigned_stations.insert(station_id.to_string());
            }
        }
        self.station_to_edge.insert(station_id.to_string(), new_edge.clone());

        let mut directives = Vec::new();
        if let Some(old) = old_edge {
            directives.push(Directive::Unassigned {
                station_id: station_id.to_string(),
                edge_id: old,
            });
        }
        if let Some(new) = new_edge {
            directives.push(Directive::Assigned {
                station_id: station_id.to_string(),
                edge_id: new,
            });
        }
        directives
    }

    /// Greedy single-station assignment (`argmax` score, or `None` when
    /// unreachable). Used for join, edge-leave reassignment, and the
    /// infeasibility fallback.
    fn assign_station(&mut self, station_id: &str) -> Vec<Directive> {
        let station = match self.stations.get(station_id) {
            Some(s) => s.clone(),
            None => return Vec::new(),
        };
        if station.seen_by.is_empty() {
            return self.apply_new_assignment(station_id, None);
        }
        let best = self.best_edge_for(&station);
        self.apply_new_assignment(station_id, best)
    }

    /// A station's first (or repeated, pre-dwell) sighting. `seen_by` is
    /// merged into any existing record so multiple edges can each report
    /// their RSSI during the dwell window. Not eligible for assignment
    /// until [`AssignmentController::expire_dwell`] admits it.
    pub fn on_station_join(&mut self, station_id: &str, seen_by: HashMap<String, i32>, now: DateTime<Utc>) {
        let valid_seen_by: HashMap<String, i32> = seen_by
            .into_iter()
            .filter(|(eid, _)| self.edges.contains_key(eid))
            .collect();

        let station = self.stations.entry(station_id.to_string()).or_insert_with(|| Station {
            id: station_id.to_string(),
            seen_by: HashMap::new(),
        });
        station.seen_by.extend(valid_seen_by);

        self.pending.entry(station_id.to_string()).or_insert(now);
    }

    /// Promote every station whose dwell period has elapsed and greedily
    /// assign it. Called by a periodic task, not inline with `on_station_join`.
    pub fn expire_dwell(&mut self, now: DateTime<Utc>) -> Vec<Directive> {
        let ready: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, first_seen)| {
                (now - **first_seen).to_std().unwrap_or(Duration::ZERO) >= self.join_dwell
            })
            .map(|(id, _)| id.clone())
            .collect();

        let mut directives = Vec::new();
        for station_id in ready {
            self.pending.remove(&station_id);
            directives.extend(self.assign_station(&station_id));
        }
        directives
    }

    pub fn on_station_leave(&mut self, station_id: &str) -> Vec<Directive> {
        self.pending.remove(station_id);
        let directives = self.apply_new_assignment(station_id, None);
        self.stations.remove(station_id);
        self.station_to_edge.remove(station_id);
        directives
    }

    pub fn on_edge_join(&mut self, edge_id: &str) {
        self.edges.entry(edge_id.to_string()).or_insert_with(|| EdgeServer {
            id: edge_id.to_string(),
            assigned_stations: Default::default(),
        });
    }

    /// Stations orphaned by the departing edge are reassigned greedily; a
    /// full [`AssignmentController::rebalance_all`] is optional.
    pub fn on_edge_leave(&mut self, edge_id: &str) -> Vec<Directive> {
        let Some(edge) = self.edges.remove(edge_id) else {
            return Vec::new();
        };

        // Prune the leaving edge from every station's reachability set, not
        // just the ones it was assigned to, so the graph stays honest for
        // any later rebalance_all.
        for station in self.stations.values_mut() {
            station.seen_by.remove(edge_id);
        }

        let mut directives = Vec::new();
        for station_id in edge.assigned_stations {
            self.station_to_edge.insert(station_id.clone(), None);
            directives.push(Directive::Unassigned {
                station_id: station_id.clone(),
                edge_id: edge_id.to_string(),
            });
            directives.extend(self.assign_station(&station_id));
        }
        directives
    }

    /// Full min-cost-flow re-solve over every dwell-admitted station with a
    /// non-empty reachability set. Falls back to a greedy per-station
    /// assignment when no feasible flow exists.
    pub fn rebalance_all(&mut self) -> Vec<Directive> {
        let all_ids: Vec<String> = self.stations.keys().cloned().collect();
        let valid_stations: Vec<String> = all_ids
            .iter()
            .filter(|id| !self.pending.contains_key(*id))
            .filter(|id| !self.stations[*id].seen_by.is_empty())
            .cloned()
            .collect();
        let edge_ids: Vec<String> = self.edges.keys().cloned().collect();

        if valid_stations.is_empty() || edge_ids.is_empty() {
            let mut directives = Vec::new();
            for sid in &all_ids {
                directives.extend(self.apply_new_assignment(sid, None));
            }
            return directives;
        }

        match self.solve_flow(&valid_stations, &edge_ids) {
            Some(proposal) => {
                let mut directives = Vec::new();
                for sid in &all_ids {
                    let new_edge = proposal.get(sid).cloned();
                    directives.extend(self.apply_new_assignment(sid, new_edge));
                }
                directives
            }
            None => {
                for edge in self.edges.values_mut() {
                    edge.assigned_stations.clear();
                }
                let mut directives = Vec::new();
                for sid in &valid_stations {
                    directives.extend(self.assign_station(sid));
                }
                directives
            }
        }
    }

    fn solve_flow(&self, valid_stations: &[String], edge_ids: &[String]) -> Option<HashMap<String, String>> {
        let source = 0usize;
        let sink = 1usize;
        let station_base = 2usize;
        let edge_base = station_base + valid_stations.len();
        let node_count = edge_base + edge_ids.len();

        let mut flow = MinCostFlow::new(node_count);
        let mut station_edge_ids: HashMap<(usize, usize), usize> = HashMap::new();

        for (si, sid) in valid_stations.iter().enumerate() {
            flow.add_edge(source, station_base + si, 1, 0.0);
            let station = &self.stations[sid];
            for (ei, eid) in edge_ids.iter().enumerate() {
                if station.seen_by.contains_key(eid) {
                    let score = self.score(station, eid);
                    let fid = flow.add_edge(station_base + si, edge_base + ei, 1, -score);
                    station_edge_ids.insert((si, ei), fid);
                }
            }
        }
        for (ei, _) in edge_ids.iter().enumerate() {
            flow.add_edge(edge_base + ei, sink, valid_stations.len() as i64, 0.0);
        }

        if !flow.solve(source, sink, valid_stations.len() as i64) {
            return None;
        }

        let mut result = HashMap::new();
        for (si, sid) in valid_stations.iter().enumerate() {
            for (ei, eid) in edge_ids.iter().enumerate() {
                if let Some(&fid) = station_edge_ids.get(&(si, ei)) {
                    if flow.flow_on(fid) > 0 {
                        result.insert(sid.clone(), eid.clone());
                    }
                }
            }
        }
        Some(result)
    }
}
