//! # Min-cost flow
//!
//! Hand-rolled successive-shortest-augmenting-path solver over a small
//! bipartite graph (source -> stations -> edges -> sink, unit station
//! supply). Mirrors the behavior of `network.py`'s `nx.min_cost_flow` call
//! without pulling in a graph library: deployments are hundreds of stations
//! and edges at most, so a Bellman-Ford-per-augmentation solver is plenty
//! fast and keeps the dependency list aligned with the rest of the pack.

use std::collections::VecDeque;

struct FlowEdge {
    to: usize,
    cap: i64,
    cost: f64,
}

/// A min-cost flow network over integer node ids `0..n`.
pub struct MinCostFlow {
    adj: Vec<Vec<usize>>,
    edges: Vec<FlowEdge>,
}

impl MinCostFlow {
    pub fn new(n: usize) -> Self {
        Self {
            adj: vec![Vec::new(); n],
            edges: Vec::new(),
        }
    }

    /// Add a directed edge with the given capacity and cost; returns the
    /// index to pass to [`MinCostFlow::flow_on`] after solving.
    pub fn add_edge(&mut self, from: usize, to: usize, cap: i64, cost: f64) -> usize {
        let id = self.edges.len();
        self.edges.push(FlowEdge { to, cap, cost });
        self.adj[from].push(id);
        self.edges.push(FlowEdge { to: from, cap: 0, cost: -cost });
        self.adj[to].push(id + 1);
        id
    }

    /// Flow actually sent along the edge returned by `add_edge`.
    pub fn flow_on(&self, forward_edge_id: usize) -> i64 {
        self.edges[forward_edge_id + 1].cap
    }

    /// Push exactly `required_flow` units from `source` to `sink` along
    /// successive shortest (by cost) augmenting paths. Returns `false` if
    /// the full amount cannot be routed — the caller should treat that as
    /// infeasible and fall back to a greedy assignment.
    pub fn solve(&mut self, source: usize, sink: usize, required_flow: i64) -> bool {
        let n = self.adj.len();
        let mut sent = 0i64;
        while sent < required_flow {
            let mut dist = vec![f64::INFINITY; n];
            let mut in_queue = vec![false; n];
            let mut prev_edge = vec![usize::MAX; n];
            dist[source] = 0.0;

            let mut queue = VecDeque::new();
            queue.push_back(source);
            in_queue[source] = true;

            while let Some(u) = queue.pop_front() {
                in_queue[u] = false;
                for &eid in &self.adj[u] {
                    let e = &self.edges[eid];
                    if e.cap > 0 && dist[u] + e.cost < dist[e.to] - 1e-9 {
                        dist[e.to] = dist[u] + e.cost;
                        prev_edge[e.to] = eid;
                        if !in_queue[e.to] {
                            queue.push_back(e.to);
                            in_queue[e.to] = true;
                        }
                    }
                }
            }

            if dist[sink].is_infinite() {
                return false;
            }

            let mut v = sink;
            while v != source {
                let eid = prev_edge[v];
                self.edges[eid].cap -= 1;
                self.edges[eid ^ 1].cap += 1;
                v = self.edges[eid ^ 1].to;
            }
            sent += 1;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_two_stations_to_distinct_edges_on_tied_cost() {
        // source=0 sink=1 station0=2 station1=3 edgeA=4 edgeB=5
        let mut flow = MinCostFlow::new(6);
        flow.add_edge(0, 2, 1, 0.0);
        flow.add_edge(0, 3, 1, 0.0);
        let s0a = flow.add_edge(2, 4, 1, -1.0);
        let s0b = flow.add_edge(2, 5, 1, -1.0);
        let s1a = flow.add_edge(3, 4, 1, -1.0);
        let s1b = flow.add_edge(3, 5, 1, -1.0);
        flow.add_edge(4, 1, 2, 0.0);
        flow.add_edge(5, 1, 2, 0.0);

        assert!(flow.solve(0, 1, 2));
        let station0_edge_a = flow.flow_on(s0a) > 0;
        let station0_edge_b = flow.flow_on(s0b) > 0;
        let station1_edge_a = flow.flow_on(s1a) > 0;
        let station1_edge_b = flow.flow_on(s1b) > 0;
        assert_eq!(station0_edge_a as i32 + station0_edge_b as i32, 1);
        assert_eq!(station1_edge_a as i32 + station1_edge_b as i32, 1);
    }

    #[test]
    fn infeasible_when_a_station_is_isolated() {
        // source=0 sink=1 station0=2 (reachable) station1=3 (isolated) edge=4
        let mut flow = MinCostFlow::new(5);
        flow.add_edge(0, 2, 1, 0.0);
        flow.add_edge(0, 3, 1, 0.0);
        flow.add_edge(2, 4, 1, -1.0);
        flow.add_edge(4, 1, 2, 0.0);
        // station 3 has no edge to any edge node at all.
        assert!(!flow.solve(0, 1, 2));
    }
}
