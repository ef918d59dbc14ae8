//! # Scenarios
//!
//! Each runner builds one crossing, drives it from a [`Testbench`] and checks
//! the result against the property the crossing promises:
//!
//! | Runner | Property |
//! |--------|----------|
//! | [`run_gray_sequence`], [`run_gray_counter`] | no invalid value, no regression, bounded staleness |
//! | [`run_pulse_train`] | one delivery per pulse, within the latency bound |
//! | [`run_handshake`] | at most one event in flight, every admitted event delivered, bounded round trip |
//!
//! Every runner keeps going after the last stimulus until the crossing has
//! drained, so nothing is still in flight when the report is built.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rtio_core::{
    round_trip_bound, width_mask, BlindTransfer, GrayCodeTransfer, PulseSynchronizer,
};

use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::testbench::Testbench;
use crate::trace::{verify_value_transfer, Trace, ValueReport};

/// Time of source cycle `cycle` plus a drain `tail`.
fn run_end(config: &SimulationConfig, cycle: u64, tail: u64) -> SimResult<u64> {
    cycle
        .checked_mul(config.source.period)
        .and_then(|time| time.checked_add(config.source.phase))
        .and_then(|time| time.checked_add(tail))
        .filter(|&time| time < u64::MAX)
        .ok_or_else(|| {
            SimError::InvalidConfig(format!(
                "source cycle {cycle} plus drain time {tail} overflows simulated time"
            ))
        })
}

// =============================================================================
// GRAY-CODE TRANSFER
// =============================================================================

/// Outcome of a Gray-code scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayReport {
    /// Property check of the observed values.
    pub transfer: ValueReport,
    /// Every value the destination exposed, in order, repeats removed.
    pub observed: Vec<u64>,
    /// Source edges where the registered value changed.
    pub updates: u64,
    /// Source steps that moved more than one Gray bit.
    pub multi_bit_steps: u64,
    /// Unsettled bits the resolver had to decide.
    pub resolutions: u64,
    /// Resolutions that fell back to the old value.
    pub kept_previous: u64,
    /// Staleness allowed for this destination clock.
    pub staleness_bound: u64,
}

impl GrayReport {
    /// Clean transfer within the staleness bound.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.transfer.is_clean() && self.transfer.max_staleness <= self.staleness_bound
    }
}

/// Drives `values` into a Gray-code transfer, one per source cycle, then
/// holds the last one until the destination has caught up.
///
/// # Errors
///
/// Fails on an invalid config.
pub fn run_gray_sequence(config: &SimulationConfig, values: &[u64]) -> SimResult<GrayReport> {
    let last = values.last().copied().unwrap_or(0);
    run_gray(config, values.len() as u64, |cycle| {
        usize::try_from(cycle)
            .ok()
            .and_then(|i| values.get(i).copied())
            .unwrap_or(last)
    })
}

/// Drives a free-running counter for `config.cycles` source cycles.
///
/// # Errors
///
/// Fails on an invalid config.
pub fn run_gray_counter(config: &SimulationConfig) -> SimResult<GrayReport> {
    let cycles = config.cycles;
    run_gray(config, cycles, |cycle| cycle.min(cycles))
}

fn run_gray<F>(config: &SimulationConfig, cycles: u64, mut value_at: F) -> SimResult<GrayReport>
where
    F: FnMut(u64) -> u64,
{
    let mut bench = Testbench::new(config)?;
    let transfer = GrayCodeTransfer::with_stages(config.width, config.stages)?;
    let stats = transfer.stats();
    let (mut encoder, mut decoder) = transfer.split();
    let trace = Trace::new();
    let (src, dst) = (bench.source(), bench.destination());
    let mask = width_mask(config.width);

    let staleness_bound = PulseSynchronizer::latency_bound(config.stages, config.destination.period);
    let end = run_end(
        config,
        cycles,
        staleness_bound.saturating_add(config.destination.period),
    )?;

    bench.run_until(end, |event, edge| {
        if event.domain == src {
            let value = value_at(event.cycle) & mask;
            encoder.tick(value, edge);
            trace.produce(event.time, value);
        } else if event.domain == dst {
            let value = decoder.tick(edge);
            trace.observe(event.time, value);
        }
    });

    let observed = trace.observed();
    let report = GrayReport {
        transfer: verify_value_transfer(&trace.produced(), &observed, 0),
        observed: observed.iter().map(|s| s.value).collect(),
        updates: stats.updates.get(),
        multi_bit_steps: stats.multi_bit_steps.get(),
        resolutions: bench.resolutions(),
        kept_previous: bench.kept_previous(),
        staleness_bound,
    };

    if report.is_clean() {
        tracing::info!(
            produced = report.transfer.produced,
            observed = report.transfer.observed,
            max_staleness = report.transfer.max_staleness,
            resolutions = report.resolutions,
            kept_previous = report.kept_previous,
            "gray transfer clean"
        );
    } else {
        tracing::warn!(
            invalid = report.transfer.invalid,
            regressions = report.transfer.regressions,
            max_staleness = report.transfer.max_staleness,
            bound = report.staleness_bound,
            multi_bit_steps = report.multi_bit_steps,
            "gray transfer violated its guarantees"
        );
    }
    Ok(report)
}

// =============================================================================
// PULSE SYNCHRONIZER
// =============================================================================

/// Outcome of a pulse train.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PulseReport {
    /// Pulses issued in the source domain.
    pub sent: u64,
    /// Pulses emitted in the destination domain.
    pub delivered: u64,
    /// Time from each source pulse to its delivery, matched in order.
    pub latencies: Vec<u64>,
    /// Latency allowed for this destination clock.
    pub latency_bound: u64,
}

impl PulseReport {
    /// Longest observed latency.
    #[must_use]
    pub fn max_latency(&self) -> u64 {
        self.latencies.iter().copied().max().unwrap_or(0)
    }

    /// Every pulse delivered exactly once and in time.
    #[must_use]
    pub fn is_faithful(&self) -> bool {
        self.sent == self.delivered && self.max_latency() <= self.latency_bound
    }
}

/// Smallest gap, in source cycles, between pulses that the destination is
/// guaranteed to tell apart.
#[must_use]
pub fn min_pulse_gap(config: &SimulationConfig) -> u64 {
    let hold = 2 * config.destination.period + config.settle_window;
    hold.div_ceil(config.source.period) + 1
}

/// `count` pulse cycles, `gap` source cycles apart, starting at cycle 1.
#[must_use]
pub fn spaced_pulses(count: u64, gap: u64) -> Vec<u64> {
    (0..count).map(|i| 1 + i * gap.max(1)).collect()
}

/// Issues a one-cycle pulse on each listed source cycle.
///
/// # Errors
///
/// Fails on an invalid config.
pub fn run_pulse_train(config: &SimulationConfig, pulses: &[u64]) -> SimResult<PulseReport> {
    let mut bench = Testbench::new(config)?;
    let sync = PulseSynchronizer::with_stages(config.stages)?;
    let stats = sync.stats();
    let (mut sender, mut receiver) = sync.split();
    let (src, dst) = (bench.source(), bench.destination());
    let pulses: BTreeSet<u64> = pulses.iter().copied().collect();

    let latency_bound = PulseSynchronizer::latency_bound(config.stages, config.destination.period);
    let last = pulses.iter().next_back().copied().unwrap_or(0);
    let end = run_end(
        config,
        last,
        latency_bound.saturating_add(config.destination.period),
    )?;

    let mut sent_at = Vec::new();
    let mut delivered_at = Vec::new();
    bench.run_until(end, |event, edge| {
        if event.domain == src {
            let pulse = pulses.contains(&event.cycle);
            sender.tick(pulse, edge);
            if pulse {
                sent_at.push(event.time);
            }
        } else if event.domain == dst && receiver.tick(edge) {
            delivered_at.push(event.time);
        }
    });

    let report = PulseReport {
        sent: stats.sent.get(),
        delivered: stats.delivered.get(),
        latencies: sent_at
            .iter()
            .zip(&delivered_at)
            .map(|(sent, delivered)| delivered.saturating_sub(*sent))
            .collect(),
        latency_bound,
    };

    if report.is_faithful() {
        tracing::info!(
            pulses = report.sent,
            max_latency = report.max_latency(),
            bound = report.latency_bound,
            "pulse train delivered"
        );
    } else {
        tracing::warn!(
            sent = report.sent,
            delivered = report.delivered,
            max_latency = report.max_latency(),
            bound = report.latency_bound,
            "pulse train lost or delayed pulses"
        );
    }
    Ok(report)
}

// =============================================================================
// HANDSHAKE / BLIND TRANSFER
// =============================================================================

/// Outcome of a handshake scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeReport {
    /// Source edges with the request input high.
    pub requested: u64,
    /// Requests forwarded to the destination.
    pub admitted: u64,
    /// Requests dropped while an event was in flight.
    pub dropped: u64,
    /// Destination cycles on which a pulse was delivered.
    pub deliveries: Vec<u64>,
    /// Most events in flight at once.
    pub max_in_flight: u64,
    /// Time from each admission until the source was idle again.
    pub round_trips: Vec<u64>,
    /// Round trip allowed for this pair of clocks.
    pub round_trip_bound: u64,
}

impl HandshakeReport {
    /// Longest observed round trip.
    #[must_use]
    pub fn max_round_trip(&self) -> u64 {
        self.round_trips.iter().copied().max().unwrap_or(0)
    }

    /// One event in flight at most, each admitted event delivered once, and
    /// every round trip within the bound.
    #[must_use]
    pub fn is_sound(&self) -> bool {
        self.max_in_flight <= 1
            && self.admitted == self.deliveries.len() as u64
            && self.round_trips.len() as u64 == self.admitted
            && self.max_round_trip() <= self.round_trip_bound
    }
}

/// Raises the request input on each listed source cycle.
///
/// # Errors
///
/// Fails on an invalid config.
pub fn run_handshake(config: &SimulationConfig, requests: &[u64]) -> SimResult<HandshakeReport> {
    let mut bench = Testbench::new(config)?;
    let transfer = BlindTransfer::with_stages(config.stages)?;
    let stats = transfer.stats();
    let (mut source, mut sink) = transfer.split();
    let (src, dst) = (bench.source(), bench.destination());
    let requests: BTreeSet<u64> = requests.iter().copied().collect();

    let bound = round_trip_bound(
        config.stages,
        config.source.period,
        config.destination.period,
    );
    let last = requests.iter().next_back().copied().unwrap_or(0);
    let end = run_end(config, last, bound.saturating_add(config.source.period))?;

    let mut deliveries = Vec::new();
    let mut round_trips = Vec::new();
    let mut admitted_at = None;
    let mut max_in_flight = 0;

    bench.run_until(end, |event, edge| {
        if event.domain == src {
            if source.tick(requests.contains(&event.cycle), edge) {
                admitted_at = Some(event.time);
            }
            if source.is_ready() {
                if let Some(since) = admitted_at.take() {
                    round_trips.push(event.time - since);
                }
            }
        } else if event.domain == dst && sink.tick(edge) {
            deliveries.push(event.cycle);
        }
        max_in_flight = max_in_flight.max(stats.in_flight());
    });

    let report = HandshakeReport {
        requested: stats.requested.get(),
        admitted: stats.admitted.get(),
        dropped: stats.dropped.get(),
        deliveries,
        max_in_flight,
        round_trips,
        round_trip_bound: bound,
    };

    if report.is_sound() {
        tracing::info!(
            requested = report.requested,
            admitted = report.admitted,
            dropped = report.dropped,
            max_round_trip = report.max_round_trip(),
            bound = report.round_trip_bound,
            "handshake sound"
        );
    } else {
        tracing::warn!(
            admitted = report.admitted,
            delivered = report.deliveries.len(),
            max_in_flight = report.max_in_flight,
            max_round_trip = report.max_round_trip(),
            bound = report.round_trip_bound,
            "handshake broke its guarantees"
        );
    }
    Ok(report)
}

/// Source cycles below `cycles` on which a seeded coin with `percent` chance
/// of heads came up heads.
#[must_use]
pub fn random_requests(seed: u64, cycles: u64, percent: u32) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..cycles)
        .filter(|_| rng.gen_range(0..100) < percent)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetastabilityConfig;

    #[test]
    fn test_gray_sequence_harmonic() {
        let mut config = SimulationConfig::harmonic(2);
        config.width = 4;
        let report = run_gray_sequence(&config, &[0b0000, 0b0001, 0b0011, 0b0010]).unwrap();

        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.observed, vec![0b0000, 0b0001, 0b0011, 0b0010]);
        assert_eq!(report.resolutions, 0);
    }

    #[test]
    fn test_gray_counter_plesiochronous() {
        let mut config = SimulationConfig::plesiochronous();
        config.cycles = 500;
        let report = run_gray_counter(&config).unwrap();

        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.multi_bit_steps, 0);
        assert_eq!(report.observed.last().copied(), Some(500));
    }

    #[test]
    fn test_gray_counter_keeping_previous_stays_in_bound() {
        let mut config = SimulationConfig::mesochronous(2);
        config.metastability = MetastabilityConfig::KeepPrevious;
        config.cycles = 100;
        let report = run_gray_counter(&config).unwrap();

        assert!(report.is_clean(), "{report:?}");
        assert!(report.resolutions > 0);
        assert_eq!(report.kept_previous, report.resolutions);
        assert_eq!(report.observed.last().copied(), Some(100));
    }

    #[test]
    fn test_gray_counter_taking_next_never_keeps_previous() {
        let mut config = SimulationConfig::mesochronous(2);
        config.metastability = MetastabilityConfig::TakeNext;
        config.cycles = 100;
        let report = run_gray_counter(&config).unwrap();

        assert!(report.is_clean(), "{report:?}");
        assert!(report.resolutions > 0);
        assert_eq!(report.kept_previous, 0);
    }

    #[test]
    fn test_min_pulse_gap() {
        let config = SimulationConfig::harmonic(2);
        // Two destination periods of 20 fit in one source period of 40.
        assert_eq!(min_pulse_gap(&config), 2);
        assert_eq!(spaced_pulses(3, 4), vec![1, 5, 9]);
    }

    #[test]
    fn test_pulse_train_mesochronous() {
        let config = SimulationConfig::mesochronous(3);
        let pulses = spaced_pulses(20, min_pulse_gap(&config));
        let report = run_pulse_train(&config, &pulses).unwrap();

        assert!(report.is_faithful(), "{report:?}");
        assert_eq!(report.sent, 20);
    }

    #[test]
    fn test_stimulus_past_end_of_time_is_rejected() {
        let config = SimulationConfig::lockstep();
        let err = run_pulse_train(&config, &[u64::MAX / 2]).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));

        let err = run_handshake(&config, &[u64::MAX / 4]).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_handshake_single_request() {
        let report = run_handshake(&SimulationConfig::lockstep(), &[0]).unwrap();

        assert!(report.is_sound(), "{report:?}");
        assert_eq!(report.deliveries.len(), 1);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_handshake_second_request_dropped() {
        let report = run_handshake(&SimulationConfig::lockstep(), &[0, 1]).unwrap();

        assert!(report.is_sound(), "{report:?}");
        assert_eq!(report.requested, 2);
        assert_eq!(report.admitted, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.deliveries.len(), 1);
    }

    #[test]
    fn test_random_requests_deterministic() {
        let a = random_requests(9, 200, 30);
        assert_eq!(a, random_requests(9, 200, 30));
        assert!(a.iter().all(|&c| c < 200));
        assert!(random_requests(9, 200, 0).is_empty());
        assert_eq!(random_requests(9, 50, 100).len(), 50);
    }
}
