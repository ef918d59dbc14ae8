//! # Clocks and Edge Scheduling
//!
//! Each domain has its own period and phase. The scheduler merges their edges
//! into one time-ordered stream. Edges at the same instant come out in the
//! order the clocks were added; that order is not observable by the
//! primitives, which always sample the value from before the instant.

use crate::config::DomainConfig;

/// Index of a clock within a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(pub usize);

/// One edge of one clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockEvent {
    /// Clock that ticks.
    pub domain: DomainId,
    /// Cycle number within that clock, from zero.
    pub cycle: u64,
    /// Simulation time of the edge.
    pub time: u64,
}

/// Free-running clock.
#[derive(Clone, Debug)]
pub struct Clock {
    name: String,
    period: u64,
    phase: u64,
    cycle: u64,
}

impl Clock {
    /// Clock from a domain description.
    #[must_use]
    pub fn new(config: &DomainConfig) -> Self {
        Self {
            name: config.name.clone(),
            period: config.period,
            phase: config.phase,
            cycle: 0,
        }
    }

    /// Domain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time between edges.
    #[must_use]
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Cycles elapsed.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Time of the next edge.
    #[must_use]
    pub fn next_edge(&self) -> u64 {
        self.cycle.saturating_mul(self.period).saturating_add(self.phase)
    }
}

/// Merges the edges of several clocks in time order.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    clocks: Vec<Clock>,
}

impl Scheduler {
    /// Empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clock and returns its id.
    pub fn add(&mut self, clock: Clock) -> DomainId {
        self.clocks.push(clock);
        DomainId(self.clocks.len() - 1)
    }

    /// Clock by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not returned by [`Self::add`].
    #[must_use]
    pub fn clock(&self, id: DomainId) -> &Clock {
        &self.clocks[id.0]
    }

    /// Next edge without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<ClockEvent> {
        self.clocks
            .iter()
            .enumerate()
            .min_by_key(|(index, clock)| (clock.next_edge(), *index))
            .map(|(index, clock)| ClockEvent {
                domain: DomainId(index),
                cycle: clock.cycle,
                time: clock.next_edge(),
            })
    }
}

impl Iterator for Scheduler {
    type Item = ClockEvent;

    fn next(&mut self) -> Option<ClockEvent> {
        let event = self.peek()?;
        self.clocks[event.domain.0].cycle += 1;
        Some(event)
    }
}
