//! # Crossing Properties Across Clock Relationships
//!
//! Every property is checked over random periods, phases, settle windows and
//! metastability seeds:
//!
//! 1. **Gray transfer**: no invalid intermediate, no regression, bounded staleness
//! 2. **Pulse fidelity**: well-spaced pulses arrive exactly once, in time
//! 3. **Handshake**: at most one event outstanding, every admitted event delivered
//!
//! Run with: cargo test -p rtio_sim --test crossing_properties

use proptest::prelude::*;
use rtio_sim::{
    min_pulse_gap, random_requests, run_gray_counter, run_handshake, run_pulse_train,
    spaced_pulses, DomainConfig, MetastabilityConfig, SimulationConfig,
};

// ============================================================================
// Strategy Generators
// ============================================================================

/// Two unrelated clocks plus a settle window shorter than both periods.
fn config_strategy() -> impl Strategy<Value = SimulationConfig> {
    (3u64..150, 3u64..150, any::<u64>())
        .prop_flat_map(|(source, destination, seed)| {
            let min = source.min(destination);
            (
                Just(source),
                Just(destination),
                0..destination,
                0..min,
                Just(seed),
            )
        })
        .prop_map(|(source, destination, phase, window, seed)| {
            let mut config = SimulationConfig::default();
            config.source = DomainConfig::new("rtio", source, 0);
            config.destination = DomainConfig::new("sys", destination, phase);
            config.settle_window = window;
            config.metastability = MetastabilityConfig::Random { seed };
            config.cycles = 150;
            config
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A counter crossing any clock pair is never seen as a value it did not hold.
    #[test]
    fn gray_no_invalid_intermediate(config in config_strategy()) {
        let report = run_gray_counter(&config).unwrap();
        prop_assert!(report.is_clean(), "{:?}", report);
        prop_assert_eq!(report.multi_bit_steps, 0);
        prop_assert_eq!(report.observed.last().copied(), Some(config.cycles));
    }

    /// Pulses spaced past the minimum gap each arrive exactly once.
    #[test]
    fn pulse_fidelity(config in config_strategy(), count in 1u64..20) {
        let pulses = spaced_pulses(count, min_pulse_gap(&config));
        let report = run_pulse_train(&config, &pulses).unwrap();
        prop_assert!(report.is_faithful(), "{:?}", report);
        prop_assert_eq!(report.sent, count);
    }

    /// Any request pattern leaves at most one event outstanding.
    #[test]
    fn handshake_at_most_one_outstanding(
        config in config_strategy(),
        pattern in any::<u64>(),
        percent in 0u32..=100,
    ) {
        let requests = random_requests(pattern, config.cycles, percent);
        let report = run_handshake(&config, &requests).unwrap();
        prop_assert!(report.is_sound(), "{:?}", report);
        prop_assert_eq!(report.admitted + report.dropped, requests.len() as u64);
    }
}
