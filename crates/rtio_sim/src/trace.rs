//! # Production / Observation Traces
//!
//! The source domain logs every value it registers, the destination domain
//! logs every value it exposes. [`verify_value_transfer`] then checks that
//! the destination never made up a value and never went backwards.
//!
//! Both logs sit behind one `parking_lot` mutex so the threaded runtime can
//! share a [`Trace`] between its domain threads.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

/// A value with the time it was logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stamped {
    /// Simulation time, or nanoseconds since start in the threaded runtime.
    pub time: u64,
    /// Logged value.
    pub value: u64,
}

#[derive(Debug, Default)]
struct Logs {
    produced: Vec<Stamped>,
    observed: Vec<Stamped>,
}

/// Shared production and observation logs. Consecutive repeats are dropped.
#[derive(Debug, Default)]
pub struct Trace {
    logs: Mutex<Logs>,
}

impl Trace {
    /// Empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a value registered by the source.
    pub fn produce(&self, time: u64, value: u64) {
        push_change(&mut self.logs.lock().produced, time, value);
    }

    /// Logs a value exposed by the destination.
    pub fn observe(&self, time: u64, value: u64) {
        push_change(&mut self.logs.lock().observed, time, value);
    }

    /// Copy of the production log.
    #[must_use]
    pub fn produced(&self) -> Vec<Stamped> {
        self.logs.lock().produced.clone()
    }

    /// Copy of the observation log.
    #[must_use]
    pub fn observed(&self) -> Vec<Stamped> {
        self.logs.lock().observed.clone()
    }
}

fn push_change(log: &mut Vec<Stamped>, time: u64, value: u64) {
    if log.last().map(|last| last.value) != Some(value) {
        log.push(Stamped { time, value });
    }
}

/// Outcome of [`verify_value_transfer`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueReport {
    /// Distinct values produced, reset value included.
    pub produced: usize,
    /// Value changes observed.
    pub observed: usize,
    /// Observations of a value never produced up to that time.
    pub invalid: usize,
    /// Observations of a value older than one already observed.
    pub regressions: usize,
    /// Distinct values the destination exposed.
    pub distinct_observed: usize,
    /// Longest time between a value being produced and the destination
    /// exposing it or something newer.
    pub max_staleness: u64,
}

impl ValueReport {
    /// No invalid value and no regression.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.invalid == 0 && self.regressions == 0
    }
}

/// Checks an observation log against a production log.
///
/// `reset` is the value both sides hold before anything is produced. A value
/// produced at time `t` counts as available to observations at `t` or later.
#[must_use]
pub fn verify_value_transfer(produced: &[Stamped], observed: &[Stamped], reset: u64) -> ValueReport {
    let mut timeline = Vec::with_capacity(produced.len() + 1);
    timeline.push(Stamped { time: 0, value: reset });
    timeline.extend(produced.iter().copied().filter(|p| p.value != reset || p.time > 0));

    let mut positions: HashMap<u64, Vec<usize>> = HashMap::new();
    for (index, entry) in timeline.iter().enumerate() {
        positions.entry(entry.value).or_default().push(index);
    }

    let mut report = ValueReport {
        produced: timeline.len(),
        observed: observed.len(),
        ..ValueReport::default()
    };
    let mut distinct = HashSet::new();
    let mut reached: Option<usize> = None;
    // First observation time at which each production index was reached.
    let mut reached_at: Vec<Option<u64>> = vec![None; timeline.len()];

    for obs in observed {
        distinct.insert(obs.value);
        let available = timeline.partition_point(|p| p.time <= obs.time);
        let candidates: Vec<usize> = positions
            .get(&obs.value)
            .map(|indices| indices.iter().copied().filter(|&i| i < available).collect())
            .unwrap_or_default();

        let Some(&latest) = candidates.last() else {
            report.invalid += 1;
            tracing::warn!(time = obs.time, value = obs.value, "observed a value never produced");
            continue;
        };

        let floor = reached.unwrap_or(0);
        let index = match candidates.iter().copied().find(|&i| i >= floor) {
            Some(index) => index,
            None => {
                report.regressions += 1;
                tracing::warn!(time = obs.time, value = obs.value, "observed value went backwards");
                latest
            }
        };

        if reached.map_or(true, |r| index > r) {
            let from = reached.map_or(0, |r| r + 1);
            for slot in &mut reached_at[from..=index] {
                slot.get_or_insert(obs.time);
            }
            reached = Some(index);
        }
    }

    report.distinct_observed = distinct.len();
    report.max_staleness = timeline
        .iter()
        .zip(&reached_at)
        .skip(1)
        .filter_map(|(p, at)| at.map(|t| t.saturating_sub(p.time)))
        .max()
        .unwrap_or(0);
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamps(entries: &[(u64, u64)]) -> Vec<Stamped> {
        entries
            .iter()
            .map(|&(time, value)| Stamped { time, value })
            .collect()
    }

    #[test]
    fn test_trace_drops_repeats() {
        let trace = Trace::new();
        trace.produce(0, 1);
        trace.produce(10, 1);
        trace.produce(20, 2);
        trace.observe(5, 0);
        trace.observe(15, 0);
        assert_eq!(trace.produced(), stamps(&[(0, 1), (20, 2)]));
        assert_eq!(trace.observed(), stamps(&[(5, 0)]));
    }

    #[test]
    fn test_clean_transfer() {
        let produced = stamps(&[(10, 1), (20, 3), (30, 2)]);
        let observed = stamps(&[(0, 0), (50, 1), (60, 3), (70, 2)]);
        let report = verify_value_transfer(&produced, &observed, 0);
        assert!(report.is_clean());
        assert_eq!(report.produced, 4);
        assert_eq!(report.distinct_observed, 4);
        assert_eq!(report.max_staleness, 40);
    }

    #[test]
    fn test_skipped_values_are_fine() {
        let produced = stamps(&[(10, 1), (20, 2), (30, 3)]);
        let observed = stamps(&[(45, 3)]);
        let report = verify_value_transfer(&produced, &observed, 0);
        assert!(report.is_clean());
        // Value 1 waited from 10 to 45 for something at least as new.
        assert_eq!(report.max_staleness, 35);
    }

    #[test]
    fn test_invalid_intermediate() {
        // 0001 -> 0010 sampled mid-change as 0011.
        let produced = stamps(&[(10, 1), (20, 2)]);
        let observed = stamps(&[(25, 1), (35, 3), (45, 2)]);
        let report = verify_value_transfer(&produced, &observed, 0);
        assert_eq!(report.invalid, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_value_from_the_future_is_invalid() {
        let produced = stamps(&[(100, 7)]);
        let observed = stamps(&[(50, 7)]);
        assert_eq!(verify_value_transfer(&produced, &observed, 0).invalid, 1);
    }

    #[test]
    fn test_regression() {
        let produced = stamps(&[(10, 1), (20, 2)]);
        let observed = stamps(&[(30, 2), (40, 1)]);
        let report = verify_value_transfer(&produced, &observed, 0);
        assert_eq!(report.regressions, 1);
        assert_eq!(report.invalid, 0);
    }

    #[test]
    fn test_repeated_values_after_wrap() {
        let produced = stamps(&[(10, 1), (20, 0), (30, 1)]);
        let observed = stamps(&[(15, 1), (25, 0), (35, 1)]);
        assert!(verify_value_transfer(&produced, &observed, 0).is_clean());
    }
}
