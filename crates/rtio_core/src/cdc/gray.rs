//! # Gray-Code Value Transfer
//!
//! Moves a counter that changes every source cycle (the RTIO timestamp, for
//! one) into another domain.
//!
//! ## The Problem
//!
//! ```text
//! binary 0111 -> 1000: four bits move at once
//! sampled mid-change, bits settle independently -> 1111, 0000, 1010, ...
//! ```
//!
//! ## The Solution
//!
//! ```text
//!  rtio domain                      sys domain
//!  value ─▶ gray reg ─▶ (wire) ─▶ MultiReg ─▶ decode ─▶ output reg ─▶ value
//!           1 bit moves           per bit      MSB→LSB
//!           per step
//! ```
//!
//! Consecutive counts differ in exactly one Gray bit, so at most one bit can be
//! caught moving, and either way it falls the result is the old or the new
//! count. Never a count that did not exist.
//!
//! Precondition: the source steps by at most one count per source cycle.
//! Larger jumps are counted in [`GrayStats::multi_bit_steps`].

use std::sync::Arc;

use crate::cdc::multireg::{MultiReg, DEFAULT_STAGES};
use crate::edge::Edge;
use crate::error::CdcResult;
use crate::probe::Counter;
use crate::signal::{check_width, width_mask, Wire, WireWriter};

/// Binary to Gray: `gray[i] = value[i] ^ value[i + 1]`, top bit copied.
#[inline]
#[must_use]
pub const fn gray_encode(value: u64) -> u64 {
    value ^ (value >> 1)
}

/// Gray to binary for a `width`-bit word.
///
/// The top bit is copied; every lower bit is the XOR of the decoded bit above
/// it and its own Gray bit.
#[inline]
#[must_use]
pub fn gray_decode(gray: u64, width: u32) -> u64 {
    debug_assert!((1..=64).contains(&width), "gray width out of range");
    let gray = gray & width_mask(width);
    let top = width - 1;
    let mut binary = gray & (1u64 << top);
    for i in (0..top).rev() {
        let above = (binary >> (i + 1)) & 1;
        binary |= (above ^ ((gray >> i) & 1)) << i;
    }
    binary
}

/// Counters for one Gray-code transfer.
#[derive(Debug, Default)]
pub struct GrayStats {
    /// Source edges where the encoded word changed.
    pub updates: Counter,
    /// Source edges where more than one Gray bit changed at once.
    pub multi_bit_steps: Counter,
    /// Destination edges where the exposed value changed.
    pub observed_changes: Counter,
}

/// A Gray-code transfer before it is split between its two domains.
#[derive(Debug)]
pub struct GrayCodeTransfer {
    encoder: GrayEncoder,
    decoder: GrayDecoder,
}

impl GrayCodeTransfer {
    /// Transfer of a `width`-bit value through two capture stages.
    ///
    /// # Errors
    ///
    /// Fails if the width is outside `1..=64`.
    pub fn new(width: u32) -> CdcResult<Self> {
        Self::with_stages(width, DEFAULT_STAGES)
    }

    /// Transfer of a `width`-bit value through `stages` capture stages.
    ///
    /// # Errors
    ///
    /// Fails on a bad width or fewer than two stages.
    pub fn with_stages(width: u32, stages: usize) -> CdcResult<Self> {
        check_width(width)?;
        let wire = Wire::new(width, 0)?;
        let sync = MultiReg::with_stages(wire.reader(), 0, stages)?;
        let stats = Arc::new(GrayStats::default());

        tracing::debug!(width, stages, "gray code transfer built");

        Ok(Self {
            encoder: GrayEncoder {
                width,
                gray: 0,
                wire: wire.writer(),
                stats: Arc::clone(&stats),
            },
            decoder: GrayDecoder {
                width,
                sync,
                output: 0,
                stats,
            },
        })
    }

    /// Destination edges from the first settled capture to the output.
    #[must_use]
    pub fn latency(&self) -> usize {
        self.decoder.latency()
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> Arc<GrayStats> {
        Arc::clone(&self.encoder.stats)
    }

    /// Splits into the source half and the destination half.
    #[must_use]
    pub fn split(self) -> (GrayEncoder, GrayDecoder) {
        (self.encoder, self.decoder)
    }
}

/// Source-domain half: encoder and Gray register.
#[derive(Debug)]
pub struct GrayEncoder {
    width: u32,
    gray: u64,
    wire: WireWriter,
    stats: Arc<GrayStats>,
}

impl GrayEncoder {
    /// One source edge: registers the Gray code of `value`.
    pub fn tick(&mut self, value: u64, edge: &mut Edge<'_>) {
        let gray = gray_encode(value & width_mask(self.width));
        let moved = (gray ^ self.gray).count_ones();
        if moved > 0 {
            self.stats.updates.incr();
        }
        if moved > 1 {
            self.stats.multi_bit_steps.incr();
            tracing::trace!(
                cycle = edge.cycle(),
                bits = moved,
                "gray step moved more than one bit"
            );
        }
        self.gray = gray;
        self.wire.drive(gray, edge);
    }

    /// Width of the transferred value.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<GrayStats> {
        &self.stats
    }
}

/// Destination-domain half: resynchronizers, decoder and output register.
#[derive(Debug)]
pub struct GrayDecoder {
    width: u32,
    sync: MultiReg,
    output: u64,
    stats: Arc<GrayStats>,
}

impl GrayDecoder {
    /// One destination edge. Returns the value exposed for the cycle that
    /// starts at this edge.
    pub fn tick(&mut self, edge: &mut Edge<'_>) -> u64 {
        let decoded = gray_decode(self.sync.output(), self.width);
        if decoded != self.output {
            self.stats.observed_changes.incr();
        }
        self.output = decoded;
        self.sync.tick(edge);
        self.output
    }

    /// Value exposed in the current cycle.
    #[inline]
    #[must_use]
    pub fn output(&self) -> u64 {
        self.output
    }

    /// Destination edges from the first settled capture to the output.
    #[inline]
    #[must_use]
    pub fn latency(&self) -> usize {
        self.sync.latency() + 1
    }

    /// Width of the transferred value.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Shared counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<GrayStats> {
        &self.stats
    }
}
