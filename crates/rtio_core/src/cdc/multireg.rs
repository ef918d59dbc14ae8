//! # MultiReg Resynchronizer
//!
//! ```text
//!   foreign wire ──▶ [ first ] ──▶ [ stage 2 ] ──▶ ... ──▶ output
//!                    may be        settled from here on
//!                    unsettled
//! ```
//!
//! The first stage is private on purpose: it is the only register in the
//! system allowed to hold an unsettled sample, and nothing downstream may see
//! it. The second capture resolves it.
//!
//! A write that lands on the same instant as the first-stage capture, after
//! it in simulation order, still counts as caught mid-transition: the capture
//! is revisited before it is resolved.

use crate::edge::{Edge, Settle};
use crate::error::{CdcError, CdcResult};
use crate::signal::{width_mask, Sample, WireReader};

/// Capture stages used when none are requested.
pub const DEFAULT_STAGES: usize = 2;

/// Chain of destination-domain registers sampling a foreign wire.
#[derive(Debug)]
pub struct MultiReg {
    input: WireReader,
    first: Sample,
    first_at: Option<u64>,
    settled: Box<[u64]>,
}

impl MultiReg {
    /// Two-stage resynchronizer whose registers start at `reset`.
    ///
    /// # Errors
    ///
    /// Fails if `reset` does not fit the wire width.
    pub fn new(input: WireReader, reset: u64) -> CdcResult<Self> {
        Self::with_stages(input, reset, DEFAULT_STAGES)
    }

    /// Resynchronizer with `stages` capture registers.
    ///
    /// # Errors
    ///
    /// Fails on fewer than two stages or a reset value wider than the wire.
    pub fn with_stages(input: WireReader, reset: u64, stages: usize) -> CdcResult<Self> {
        if stages < DEFAULT_STAGES {
            return Err(CdcError::TooFewStages(stages));
        }
        let width = input.width();
        if reset & !width_mask(width) != 0 {
            return Err(CdcError::ResetOutOfRange {
                value: reset,
                width,
            });
        }
        Ok(Self {
            input,
            first: Sample::settled(reset),
            first_at: None,
            settled: vec![reset; stages - 1].into_boxed_slice(),
        })
    }

    /// Advances every stage by one destination edge and returns the output.
    pub fn tick(&mut self, edge: &mut Edge<'_>) -> u64 {
        let first = self.input.revisit(self.first, self.first_at);
        let resolved = edge.resolve(first);
        self.settled.rotate_right(1);
        self.settled[0] = resolved;
        self.first = self.input.sample(edge);
        self.first_at = match edge.settle() {
            Settle::Window { now, .. } => Some(now),
            Settle::Ideal => None,
        };
        self.output()
    }

    /// Output of the last stage. Always settled.
    #[inline]
    #[must_use]
    pub fn output(&self) -> u64 {
        self.settled[self.settled.len() - 1]
    }

    /// Number of capture registers.
    #[inline]
    #[must_use]
    pub fn stages(&self) -> usize {
        self.settled.len() + 1
    }

    /// Destination edges from the first settled capture to the output.
    #[inline]
    #[must_use]
    pub fn latency(&self) -> usize {
        self.stages()
    }

    /// Width of the resynchronized word.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.input.width()
    }
}
