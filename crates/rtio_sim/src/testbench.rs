//! # Two-Domain Testbench
//!
//! Owns the clocks, the settle window and the metastability resolver. Tests
//! supply a closure that is called once per edge; the closure dispatches on
//! the domain and ticks the halves that domain owns.
//!
//! ```rust,ignore
//! let mut bench = Testbench::new(&config)?;
//! let (src, dst) = (bench.source(), bench.destination());
//! bench.run_until(config.end_time(), |event, edge| {
//!     if event.domain == src { encoder.tick(event.cycle, edge) }
//!     else if event.domain == dst { decoder.tick(edge); }
//! });
//! ```

use rtio_core::{CountingResolver, Edge, Resolve, ResolvePolicy, Settle};

use crate::clock::{Clock, ClockEvent, DomainId, Scheduler};
use crate::config::SimulationConfig;
use crate::error::SimResult;

/// Scheduler plus metastability model for one source/destination pair.
pub struct Testbench {
    scheduler: Scheduler,
    window: u64,
    resolver: CountingResolver<Box<dyn Resolve + Send>>,
    source: DomainId,
    destination: DomainId,
    now: u64,
}

impl Testbench {
    /// Builds a bench from a validated config.
    ///
    /// # Errors
    ///
    /// Fails if the config does not validate.
    pub fn new(config: &SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let mut scheduler = Scheduler::new();
        let source = scheduler.add(Clock::new(&config.source));
        let destination = scheduler.add(Clock::new(&config.destination));
        let policy = ResolvePolicy::from(config.metastability);

        tracing::debug!(
            source = %config.source.name,
            destination = %config.destination.name,
            window = config.settle_window,
            ?policy,
            "testbench ready"
        );

        Ok(Self {
            scheduler,
            window: config.settle_window,
            resolver: CountingResolver::new(policy.build()),
            source,
            destination,
            now: 0,
        })
    }

    /// The driving domain.
    #[must_use]
    pub fn source(&self) -> DomainId {
        self.source
    }

    /// The sampling domain.
    #[must_use]
    pub fn destination(&self) -> DomainId {
        self.destination
    }

    /// Time of the last edge delivered.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Clock by id.
    #[must_use]
    pub fn clock(&self, id: DomainId) -> &Clock {
        self.scheduler.clock(id)
    }

    /// Unsettled bits resolved so far.
    #[must_use]
    pub fn resolutions(&self) -> u64 {
        self.resolver.resolutions()
    }

    /// Unsettled bits that fell back to the old value.
    #[must_use]
    pub fn kept_previous(&self) -> u64 {
        self.resolver.kept_previous()
    }

    /// Delivers every edge with a time up to and including `end`.
    pub fn run_until<F>(&mut self, end: u64, mut on_edge: F)
    where
        F: FnMut(ClockEvent, &mut Edge<'_>),
    {
        while let Some(event) = self.scheduler.peek() {
            if event.time > end {
                break;
            }
            self.scheduler.next();
            self.now = event.time;
            let settle = Settle::Window {
                now: event.time,
                window: self.window,
            };
            let mut edge = Edge::new(event.cycle, settle, Some(&mut self.resolver));
            on_edge(event, &mut edge);
        }
    }
}
