//! # Pulse Synchronizer
//!
//! Carries one-cycle events from one domain to another with toggle encoding:
//!
//! ```text
//!  source domain                          destination domain
//!  pulse ──▶ toggle ──▶ (wire) ──▶ MultiReg ──▶ last ──▶ XOR ──▶ pulse
//!            flips once                        previous
//!            per pulse                         sample
//! ```
//!
//! Because the event is encoded as a level change rather than a level, the
//! destination cannot miss it however the two clocks line up.
//!
//! Pulses must be spaced wider than the crossing latency. Two toggles that
//! reach the destination between consecutive samples cancel out and the
//! destination sees nothing; this is counted, not detected.

use std::sync::Arc;

use crate::cdc::multireg::{MultiReg, DEFAULT_STAGES};
use crate::edge::Edge;
use crate::error::CdcResult;
use crate::probe::Counter;
use crate::signal::{Wire, WireWriter};

/// Event counters for one pulse synchronizer.
#[derive(Debug, Default)]
pub struct PulseStats {
    /// Pulses accepted in the source domain.
    pub sent: Counter,
    /// Pulses emitted in the destination domain.
    pub delivered: Counter,
}

impl PulseStats {
    /// Sent pulses not (yet) seen at the destination.
    ///
    /// Stays positive after the pipeline drains only if pulses merged.
    #[must_use]
    pub fn missing(&self) -> u64 {
        self.sent.get().saturating_sub(self.delivered.get())
    }
}

/// A pulse synchronizer before it is split between its two domains.
#[derive(Debug)]
pub struct PulseSynchronizer {
    sender: PulseSender,
    receiver: PulseReceiver,
}

impl PulseSynchronizer {
    /// Pulse synchronizer with a two-stage resynchronizer.
    ///
    /// # Errors
    ///
    /// Never fails with the default stage count.
    pub fn new() -> CdcResult<Self> {
        Self::with_stages(DEFAULT_STAGES)
    }

    /// Pulse synchronizer with `stages` capture registers on the toggle.
    ///
    /// # Errors
    ///
    /// Fails on fewer than two stages.
    pub fn with_stages(stages: usize) -> CdcResult<Self> {
        let toggle = Wire::bit(false)?;
        let stats = Arc::new(PulseStats::default());
        let sync = MultiReg::with_stages(toggle.reader(), 0, stages)?;
        Ok(Self {
            sender: PulseSender {
                toggle: false,
                wire: toggle.writer(),
                stats: Arc::clone(&stats),
            },
            receiver: PulseReceiver {
                sync,
                last: false,
                output: false,
                stats,
            },
        })
    }

    /// Worst-case time from a source edge that admits a pulse until the
    /// destination emits it, for a destination clock of `period`.
    ///
    /// One period to reach the first capture, one more if that capture is
    /// unsettled and falls back, then one per stage and one for the edge
    /// detector.
    #[must_use]
    pub const fn latency_bound(stages: usize, period: u64) -> u64 {
        (stages as u64).saturating_add(3).saturating_mul(period)
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> Arc<PulseStats> {
        Arc::clone(&self.sender.stats)
    }

    /// Splits into the source half and the destination half.
    #[must_use]
    pub fn split(self) -> (PulseSender, PulseReceiver) {
        (self.sender, self.receiver)
    }
}

/// Source-domain half: the toggle register.
#[derive(Debug)]
pub struct PulseSender {
    toggle: bool,
    wire: WireWriter,
    stats: Arc<PulseStats>,
}

impl PulseSender {
    /// One source edge. `pulse` is the input level during the cycle ending at
    /// this edge.
    pub fn tick(&mut self, pulse: bool, edge: &mut Edge<'_>) {
        if pulse {
            self.toggle = !self.toggle;
            self.stats.sent.incr();
        }
        self.wire.drive(u64::from(self.toggle), edge);
    }

    /// Current toggle level.
    #[inline]
    #[must_use]
    pub fn toggle(&self) -> bool {
        self.toggle
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<PulseStats> {
        &self.stats
    }
}

/// Destination-domain half: resynchronizer plus edge detector.
#[derive(Debug)]
pub struct PulseReceiver {
    sync: MultiReg,
    last: bool,
    output: bool,
    stats: Arc<PulseStats>,
}

impl PulseReceiver {
    /// One destination edge. Returns the pulse output for the cycle that
    /// starts at this edge.
    pub fn tick(&mut self, edge: &mut Edge<'_>) -> bool {
        let current = self.sync.tick(edge) != 0;
        self.output = current != self.last;
        self.last = current;
        if self.output {
            self.stats.delivered.incr();
        }
        self.output
    }

    /// Pulse output for the current cycle.
    #[inline]
    #[must_use]
    pub fn output(&self) -> bool {
        self.output
    }

    /// Capture stages on the toggle.
    #[inline]
    #[must_use]
    pub fn stages(&self) -> usize {
        self.sync.stages()
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<PulseStats> {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pulse_crosses_once() {
        let (mut tx, mut rx) = PulseSynchronizer::new().unwrap().split();

        tx.tick(true, &mut Edge::ideal(0));
        let pulses: Vec<bool> = (0..6).map(|c| rx.tick(&mut Edge::ideal(c))).collect();

        assert_eq!(pulses, vec![false, true, false, false, false, false]);
        assert_eq!(tx.stats().sent.get(), 1);
        assert_eq!(rx.stats().delivered.get(), 1);
        assert_eq!(rx.stats().missing(), 0);
    }

    #[test]
    fn test_toggle_flips_per_pulse() {
        let (mut tx, _rx) = PulseSynchronizer::new().unwrap().split();
        tx.tick(true, &mut Edge::ideal(0));
        assert!(tx.toggle());
        tx.tick(false, &mut Edge::ideal(1));
        assert!(tx.toggle());
        tx.tick(true, &mut Edge::ideal(2));
        assert!(!tx.toggle());
    }

    #[test]
    fn test_back_to_back_pulses_merge_on_slow_destination() {
        let (mut tx, mut rx) = PulseSynchronizer::new().unwrap().split();

        // Two source pulses between consecutive destination samples.
        tx.tick(true, &mut Edge::ideal(0));
        tx.tick(true, &mut Edge::ideal(1));
        let delivered = (0..6).filter(|&c| rx.tick(&mut Edge::ideal(c))).count();

        assert_eq!(delivered, 0);
        assert_eq!(rx.stats().missing(), 2);
    }

    #[test]
    fn test_latency_bound() {
        assert_eq!(PulseSynchronizer::latency_bound(2, 10), 50);
        assert_eq!(PulseSynchronizer::latency_bound(2, u64::MAX / 2), u64::MAX);
    }
}
