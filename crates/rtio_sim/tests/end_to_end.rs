//! # End-to-End Crossing Scenarios
//!
//! 1. **Value sequence**: four 4-bit values cross a 2:1 clock pair unchanged,
//!    and four Gray words cross two coincident clocks without a foreign value
//! 2. **Single handshake**: one request, one delivery, idle within the bound
//! 3. **Request while blind**: the second request is dropped
//!
//! Run with: cargo test -p rtio_sim --test end_to_end -- --nocapture

use rtio_core::{gray_encode, round_trip_bound};
use rtio_sim::{
    run_gray_sequence, run_handshake, MetastabilityConfig, SimError, SimulationConfig,
};

// ============================================================================
// SCENARIO 1: VALUE SEQUENCE
// ============================================================================

#[test]
fn verify_value_sequence_reproduced_exactly() {
    let mut config = SimulationConfig::harmonic(2);
    config.width = 4;
    let values = [0b0000, 0b0001, 0b0011, 0b0010];

    let report = run_gray_sequence(&config, &values).unwrap();

    println!("observed: {:?}", report.observed);
    assert_eq!(report.observed, values.to_vec());
    assert!(report.transfer.is_clean());
    assert!(!report.observed.contains(&0b0111));
    // 0b0001 -> 0b0011 is a two-count jump; edges are aligned, nothing is caught.
    assert_eq!(report.multi_bit_steps, 1);
    assert_eq!(report.resolutions, 0);
}

#[test]
fn verify_gray_words_reproduced_under_coincident_edges() {
    // Counts 0..=3 put the Gray words 0000, 0001, 0011, 0010 on the wire,
    // sampled at the exact instant of every write.
    let mut config = SimulationConfig::mesochronous(0);
    config.width = 4;
    let words = [0b0000, 0b0001, 0b0011, 0b0010];

    let report = run_gray_sequence(&config, &[0, 1, 2, 3]).unwrap();

    println!("observed: {:?}", report.observed);
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.multi_bit_steps, 0);
    assert!(report.resolutions > 0);
    assert_eq!(report.observed.last().copied(), Some(3));
    for value in &report.observed {
        assert!(words.contains(&gray_encode(*value)), "foreign value {value}");
    }
}

#[test]
fn verify_value_sequence_under_metastability() {
    // Same sequence, but every destination edge lands inside the window.
    let mut config = SimulationConfig::mesochronous(2);
    config.width = 4;
    config.metastability = MetastabilityConfig::Random { seed: 7 };
    let values = [0b0000, 0b0001, 0b0010, 0b0011, 0b0100];

    let report = run_gray_sequence(&config, &values).unwrap();

    assert!(report.is_clean(), "{report:?}");
    assert!(report.resolutions > 0);
    assert_eq!(report.observed.last().copied(), Some(0b0100));
}

// ============================================================================
// SCENARIO 2: SINGLE HANDSHAKE
// ============================================================================

#[test]
fn verify_single_request_round_trip() {
    for config in [
        SimulationConfig::lockstep(),
        SimulationConfig::harmonic(3),
        SimulationConfig::mesochronous(0),
        SimulationConfig::mesochronous(50),
        SimulationConfig::plesiochronous(),
    ] {
        let report = run_handshake(&config, &[0]).unwrap();
        let bound = round_trip_bound(
            config.stages,
            config.source.period,
            config.destination.period,
        );

        assert!(report.is_sound(), "{report:?}");
        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(report.round_trips.len(), 1);
        assert!(report.round_trips[0] <= bound);
    }
}

// ============================================================================
// SCENARIO 3: REQUEST WHILE BLIND
// ============================================================================

#[test]
fn verify_second_request_dropped() {
    for config in [SimulationConfig::lockstep(), SimulationConfig::plesiochronous()] {
        let report = run_handshake(&config, &[0, 1]).unwrap();

        assert!(report.is_sound(), "{report:?}");
        assert_eq!(report.admitted, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.deliveries.len(), 1);
    }
}

#[test]
fn verify_request_after_ack_admitted() {
    let config = SimulationConfig::lockstep();
    let bound = round_trip_bound(config.stages, 10, 10) / config.source.period;
    let report = run_handshake(&config, &[0, bound + 1]).unwrap();

    assert!(report.is_sound(), "{report:?}");
    assert_eq!(report.admitted, 2);
    assert_eq!(report.deliveries.len(), 2);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn verify_shipped_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/cdc_sim.toml");
    let config = SimulationConfig::load(path).unwrap();

    assert_eq!(config.source.name, "rtio");
    assert_eq!(config.metastability, MetastabilityConfig::Random { seed: 42 });
    assert_eq!(config.threaded.request_every, 3);
}

#[test]
fn verify_missing_config_is_io_error() {
    let err = SimulationConfig::load("/nonexistent/cdc_sim.toml").unwrap_err();
    assert!(matches!(err, SimError::Io { .. }));
}
