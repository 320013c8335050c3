//! Property test for the edge load model's monotonicity invariant (§8
//! property 6): increasing CPU, memory, or attached-station count weakly
//! increases reported load, generalized beyond the module's own
//! fixed-pair unit tests to randomly ordered samples.

use proptest::prelude::*;

use iotwx::config::RadioConfig;
use iotwx::edge::load::{compute_load, Utilization};

proptest! {
    #[test]
    fn load_is_monotone_in_each_dimension(
        cpu_low in 0.0f64..1.0,
        cpu_delta in 0.0f64..1.0,
        mem in 0.0f64..1.0,
        n_stations in 0usize..50,
    ) {
        let config = RadioConfig::default();
        let cpu_high = (cpu_low + cpu_delta).min(1.0);

        let low = compute_load(Utilization { cpu: cpu_low, mem }, n_stations, &config);
        let high = compute_load(Utilization { cpu: cpu_high, mem }, n_stations, &config);
        prop_assert!(high >= low - 1e-9);
    }

    #[test]
    fn load_is_monotone_in_station_count(
        cpu in 0.0f64..1.0,
        mem in 0.0f64..1.0,
        n_low in 0usize..50,
        extra_stations in 0usize..50,
    ) {
        let config = RadioConfig::default();
        let n_high = n_low + extra_stations;

        let low = compute_load(Utilization { cpu, mem }, n_low, &config);
        let high = compute_load(Utilization { cpu, mem }, n_high, &config);
        prop_assert!(high >= low - 1e-9);
    }

    #[test]
    fn load_always_stays_in_unit_range(
        cpu in 0.0f64..1.0,
        mem in 0.0f64..1.0,
        n_stations in 0usize..200,
    ) {
        let config = RadioConfig::default();
        let load = compute_load(Utilization { cpu, mem }, n_stations, &config);
        prop_assert!((0.0..=1.0).contains(&load));
    }
}
