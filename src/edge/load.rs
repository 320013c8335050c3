//! # Edge load model
//!
//! `load = w_cpu*cpu + w_mem*mem + w_stations*S`, where `S` is a logistic
//! curve over the attached station count. Grounded on
//! `MQTTClientWrapper.update_load` — the Python recomputes no more than every
//! 30s and feeds straight off `psutil`; here the CPU/mem read is behind
//! `SystemSampler` so the formula is testable without a live host.

use std::sync::Mutex;

use sysinfo::System;

use crate::config::RadioConfig;

/// Current CPU and memory utilization, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utilization {
    pub cpu: f64,
    pub mem: f64,
}

/// Narrow seam over host sampling, so the load formula can be tested with
/// fixed values instead of reading `/proc`.
pub trait SystemSampler: Send + Sync {
    fn sample(&self) -> Utilization;
}

/// Fixed-value sampler for tests and dry-run binaries.
pub struct FixedSampler(pub Utilization);

impl SystemSampler for FixedSampler {
    fn sample(&self) -> Utilization {
        self.0
    }
}

/// Reads host CPU and memory utilization via `sysinfo`, matching the
/// original's `psutil` usage. Keeps its own `System` handle so repeated
/// `sample()` calls refresh against the prior reading instead of each
/// starting cold.
pub struct ProcSampler {
    system: Mutex<System>,
}

impl ProcSampler {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
        }
    }
}

impl Default for ProcSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemSampler for ProcSampler {
    fn sample(&self) -> Utilization {
        let mut system = self.system.lock().unwrap();
        system.refresh_cpu_usage();
        system.refresh_memory();

        let cpu = (system.global_cpu_usage() as f64 / 100.0).clamp(0.0, 1.0);
        let total = system.total_memory();
        let mem = if total == 0 {
            0.0
        } else {
            (1.0 - system.available_memory() as f64 / total as f64).clamp(0.0, 1.0)
        };
        Utilization { cpu, mem }
    }
}

/// Logistic station-count term: `1 / (1 + exp(-k * (n - m)))`.
pub fn station_load(n_stations: usize, steepness: f64, midpoint: f64) -> f64 {
    1.0 / (1.0 + (-steepness * (n_stations as f64 - midpoint)).exp())
}

/// The full weighted load score, clamped to `[0, 1]`.
pub fn compute_load(utilization: Utilization, n_stations: usize, config: &RadioConfig) -> f64 {
    let s = station_load(n_stations, config.station_steepness, config.station_midpoint);
    let load = config.cpu_weight * utilization.cpu
        + config.mem_weight * utilization.mem
        + config.station_weight * s;
    load.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RadioConfig {
        RadioConfig::default()
    }

    #[test]
    fn matches_worked_example() {
        let util = Utilization { cpu: 0.2, mem: 0.5 };
        let load = compute_load(util, 5, &config());
        // station_load(5) with k=1, m=5 -> 0.5 exactly
        assert!((load - (0.4 * 0.2 + 0.3 * 0.5 + 0.3 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn load_monotone_in_cpu() {
        let config = config();
        let low = compute_load(Utilization { cpu: 0.1, mem: 0.3 }, 3, &config);
        let high = compute_load(Utilization { cpu: 0.9, mem: 0.3 }, 3, &config);
        assert!(high >= low);
    }

    #[test]
    fn load_monotone_in_mem() {
        let config = config();
        let low = compute_load(Utilization { cpu: 0.3, mem: 0.1 }, 3, &config);
        let high = compute_load(Utilization { cpu: 0.3, mem: 0.9 }, 3, &config);
        assert!(high >= low);
    }

    #[test]
    fn load_monotone_in_station_count() {
        let config = config();
        let util = Utilization { cpu: 0.3, mem: 0.3 };
        let low = compute_load(util, 0, &config);
        let high = compute_load(util, 20, &config);
        assert!(high >= low);
    }

    #[test]
    fn station_load_is_midpoint_symmetric() {
        let below = station_load(0, 1.0, 5.0);
        let above = station_load(10, 1.0, 5.0);
        assert!((below + above - 1.0).abs() < 1e-9);
    }
}
