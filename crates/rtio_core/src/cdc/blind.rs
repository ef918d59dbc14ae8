//! # Blind Transfer
//!
//! One-shot events with backpressure. A request pulse synchronizer carries the
//! event over; the delivered pulse is fed straight into an acknowledgment
//! pulse synchronizer that carries it back.
//!
//! ```text
//!  source domain                                destination domain
//!
//!  i ──┬──▶ AND NOT blind ──▶ request PulseSynchronizer ──┬──▶ o
//!      │                                                   │
//!      ▼                                                   │
//!   [blind] ◀── clear ── ack PulseSynchronizer ◀───────────┘
//! ```
//!
//! While the blind flag is set the source is *blind*: further requests are
//! dropped, silently. This is flow control, not an error. Callers that cannot
//! afford drops poll [`BlindSource::is_ready`] first.

use std::sync::Arc;

use crate::cdc::multireg::DEFAULT_STAGES;
use crate::cdc::pulse::{PulseReceiver, PulseSender, PulseSynchronizer};
use crate::edge::Edge;
use crate::error::CdcResult;
use crate::probe::Counter;

/// Source-side admission state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlindState {
    /// No event in flight; the next request is admitted.
    Idle,
    /// An event was sent and its acknowledgment has not come back.
    AwaitingAck,
}

/// Counters for one blind transfer.
#[derive(Debug, Default)]
pub struct BlindStats {
    /// Source edges with the request input high.
    pub requested: Counter,
    /// Requests forwarded to the destination.
    pub admitted: Counter,
    /// Requests dropped because an event was in flight.
    pub dropped: Counter,
    /// Acknowledgments that reached the source.
    pub acknowledged: Counter,
    /// Pulses emitted in the destination domain.
    pub delivered: Counter,
}

impl BlindStats {
    /// Admitted events whose acknowledgment has not reached the source.
    /// Never more than one.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.admitted.get().saturating_sub(self.acknowledged.get())
    }
}

/// Worst-case time from admitting a request until the source is idle again.
///
/// Twice the pulse latency bound: once for the request, once for the
/// acknowledgment.
#[must_use]
pub const fn round_trip_bound(stages: usize, source_period: u64, destination_period: u64) -> u64 {
    PulseSynchronizer::latency_bound(stages, destination_period)
        .saturating_add(PulseSynchronizer::latency_bound(stages, source_period))
}

/// A blind transfer before it is split between its two domains.
#[derive(Debug)]
pub struct BlindTransfer {
    source: BlindSource,
    sink: BlindSink,
}

impl BlindTransfer {
    /// Blind transfer with two capture stages in each direction.
    ///
    /// # Errors
    ///
    /// Never fails with the default stage count.
    pub fn new() -> CdcResult<Self> {
        Self::with_stages(DEFAULT_STAGES)
    }

    /// Blind transfer with `stages` capture stages in each direction.
    ///
    /// # Errors
    ///
    /// Fails on fewer than two stages.
    pub fn with_stages(stages: usize) -> CdcResult<Self> {
        let (request_tx, request_rx) = PulseSynchronizer::with_stages(stages)?.split();
        let (ack_tx, ack_rx) = PulseSynchronizer::with_stages(stages)?.split();
        let stats = Arc::new(BlindStats::default());

        tracing::debug!(stages, "blind transfer built");

        Ok(Self {
            source: BlindSource {
                blind: false,
                request: request_tx,
                ack: ack_rx,
                stats: Arc::clone(&stats),
            },
            sink: BlindSink {
                request: request_rx,
                ack: ack_tx,
                stats,
            },
        })
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> Arc<BlindStats> {
        Arc::clone(&self.source.stats)
    }

    /// Splits into the source half and the destination half.
    #[must_use]
    pub fn split(self) -> (BlindSource, BlindSink) {
        (self.source, self.sink)
    }
}

/// Source-domain half: blind flag, request toggle, acknowledgment receiver.
#[derive(Debug)]
pub struct BlindSource {
    blind: bool,
    request: PulseSender,
    ack: PulseReceiver,
    stats: Arc<BlindStats>,
}

impl BlindSource {
    /// One source edge. `request` is the input level during the cycle ending
    /// at this edge. Returns whether it was admitted.
    pub fn tick(&mut self, request: bool, edge: &mut Edge<'_>) -> bool {
        let acknowledged = self.ack.output();
        let admitted = request && !self.blind;

        if request {
            self.stats.requested.incr();
            if admitted {
                self.stats.admitted.incr();
            } else {
                self.stats.dropped.incr();
                tracing::trace!(cycle = edge.cycle(), "request dropped while awaiting ack");
            }
        }
        if acknowledged {
            self.stats.acknowledged.incr();
        }

        self.ack.tick(edge);
        self.request.tick(admitted, edge);

        // Acknowledgment wins over a request on the same edge.
        if request {
            self.blind = true;
        }
        if acknowledged {
            self.blind = false;
        }
        admitted
    }

    /// Admission state after the last edge.
    #[inline]
    #[must_use]
    pub fn state(&self) -> BlindState {
        if self.blind {
            BlindState::AwaitingAck
        } else {
            BlindState::Idle
        }
    }

    /// Whether a request at the next edge would be admitted.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.blind
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<BlindStats> {
        &self.stats
    }
}

/// Destination-domain half: request receiver, acknowledgment toggle.
#[derive(Debug)]
pub struct BlindSink {
    request: PulseReceiver,
    ack: PulseSender,
    stats: Arc<BlindStats>,
}

impl BlindSink {
    /// One destination edge. Returns the delivered pulse for the cycle that
    /// starts at this edge.
    pub fn tick(&mut self, edge: &mut Edge<'_>) -> bool {
        let delivered = self.request.output();
        self.ack.tick(delivered, edge);
        let output = self.request.tick(edge);
        if output {
            self.stats.delivered.incr();
        }
        output
    }

    /// Delivered pulse for the current cycle.
    #[inline]
    #[must_use]
    pub fn output(&self) -> bool {
        self.request.output()
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<BlindStats> {
        &self.stats
    }
}
