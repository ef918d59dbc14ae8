//! # Clock Edges
//!
//! A domain does all of its work at its own clock edges. [`Edge`] is the
//! per-edge context handed to every register-holding half of a crossing.

use crate::metastability::Resolve;
use crate::signal::Sample;

/// How samples taken at this edge relate to writes made by other domains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settle {
    /// Every sample is settled. Used by threaded runtimes where the wire is
    /// a single atomic word and nothing is ever seen half-written.
    Ideal,
    /// Simulated time. A sample taken less than `window` time units after the
    /// last write sees the bits changed by that write as unsettled.
    Window {
        /// Simulation time of this edge.
        now: u64,
        /// Width of the unsettled interval following a write.
        window: u64,
    },
}

impl Settle {
    /// Timestamp recorded by writes made at this edge.
    #[inline]
    #[must_use]
    pub const fn now(self) -> u64 {
        match self {
            Self::Ideal => 0,
            Self::Window { now, .. } => now,
        }
    }
}

/// One clock edge of one domain.
pub struct Edge<'a> {
    cycle: u64,
    settle: Settle,
    resolver: Option<&'a mut dyn Resolve>,
}

impl<'a> Edge<'a> {
    /// Creates an edge.
    ///
    /// Without a resolver, unsettled bits come to rest at their previous value.
    #[must_use]
    pub fn new(cycle: u64, settle: Settle, resolver: Option<&'a mut dyn Resolve>) -> Self {
        Self {
            cycle,
            settle,
            resolver,
        }
    }

    /// Edge with no metastability modelling at all.
    #[must_use]
    pub fn ideal(cycle: u64) -> Edge<'static> {
        Edge {
            cycle,
            settle: Settle::Ideal,
            resolver: None,
        }
    }

    /// Cycle number within the owning domain.
    #[inline]
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Settle model in force for this edge.
    #[inline]
    #[must_use]
    pub fn settle(&self) -> Settle {
        self.settle
    }

    /// Brings every unsettled bit of `sample` to rest.
    ///
    /// Settled bits pass through unchanged; each unsettled bit is decided
    /// independently by the resolver, which may pick either the value before
    /// or the value after the write.
    pub fn resolve(&mut self, sample: Sample) -> u64 {
        let mut pending = sample.unsettled();
        if pending == 0 {
            return sample.after();
        }

        let mut value = sample.after() & !pending;
        while pending != 0 {
            let bit = pending & pending.wrapping_neg();
            let before = sample.before() & bit != 0;
            let after = sample.after() & bit != 0;
            let rest = match self.resolver.as_deref_mut() {
                Some(resolver) => resolver.resolve(before, after),
                None => before,
            };
            if rest {
                value |= bit;
            }
            pending &= pending - 1;
        }
        value
    }
}
