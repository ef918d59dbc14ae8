//! # Cross-Domain Wires
//!
//! A [`Wire`] is the output of a register in one domain as seen from another.
//! It has exactly one driver and exactly one sampler:
//!
//! ```text
//!     domain A                                 domain B
//!  ┌──────────────┐         ┌────────┐       ┌──────────────┐
//!  │  WireWriter  │──drive─▶│  Wire  │◀─sample─│  WireReader  │
//!  └──────────────┘         └────────┘       └──────────────┘
//!        one                  atomics              one
//! ```
//!
//! Both handles are claimed on creation and released on drop; claiming a
//! second writer or reader is a wiring bug and panics.
//!
//! ## Unsettled samples
//!
//! The wire remembers the value before its last change and when the change
//! happened. Under [`Settle::Window`], a sample taken inside the window sees
//! the changed bits as unsettled. With a zero window, a sample taken at the
//! exact instant of the write sees the old value: registers sample before
//! their own edge updates anything.
//!
//! Coincident edges are handled the same way whichever domain runs first.
//! The reader stamps the wire with its last sample time; a write landing on
//! that same instant under a non-zero window is recorded, and
//! [`WireReader::revisit`] turns the earlier sample into an unsettled one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::edge::{Edge, Settle};
use crate::error::{CdcError, CdcResult};

/// Widest word a wire can carry.
pub const MAX_WIDTH: u32 = 64;

/// Marks a wire that has never changed since reset.
const NEVER: u64 = u64::MAX;

/// Mask with the low `width` bits set.
#[inline]
#[must_use]
pub const fn width_mask(width: u32) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

pub(crate) fn check_width(width: u32) -> CdcResult<()> {
    if width == 0 || width > MAX_WIDTH {
        return Err(CdcError::InvalidWidth {
            width,
            max: MAX_WIDTH,
        });
    }
    Ok(())
}

/// What a register in the sampling domain captures from a wire.
///
/// Bits that agree between `before` and `after` are settled. Bits that differ
/// were caught mid-transition and must go through [`Edge::resolve`] before
/// anything may use them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    before: u64,
    after: u64,
}

impl Sample {
    /// Sample of a word caught moving from `before` to `after`.
    #[inline]
    #[must_use]
    pub const fn new(before: u64, after: u64) -> Self {
        Self { before, after }
    }

    /// Fully settled sample.
    #[inline]
    #[must_use]
    pub const fn settled(value: u64) -> Self {
        Self {
            before: value,
            after: value,
        }
    }

    /// Value before the transition.
    #[inline]
    #[must_use]
    pub const fn before(self) -> u64 {
        self.before
    }

    /// Value after the transition.
    #[inline]
    #[must_use]
    pub const fn after(self) -> u64 {
        self.after
    }

    /// Bits that are not yet valid.
    #[inline]
    #[must_use]
    pub const fn unsettled(self) -> u64 {
        self.before ^ self.after
    }

    /// Whether every bit is valid.
    #[inline]
    #[must_use]
    pub const fn is_settled(self) -> bool {
        self.before == self.after
    }
}

/// Register output shared between a driving and a sampling domain.
#[derive(Debug)]
pub struct Wire {
    width: u32,
    value: AtomicU64,
    previous: AtomicU64,
    changed_at: AtomicU64,
    sampled_at: AtomicU64,
    coincident_at: AtomicU64,
    coincident_before: AtomicU64,
    coincident_after: AtomicU64,
    writer_claimed: AtomicBool,
    reader_claimed: AtomicBool,
}

impl Wire {
    /// Creates a wire of `width` bits holding `reset`.
    ///
    /// # Errors
    ///
    /// Fails if the width is outside `1..=64` or `reset` does not fit.
    pub fn new(width: u32, reset: u64) -> CdcResult<Arc<Self>> {
        check_width(width)?;
        if reset & !width_mask(width) != 0 {
            return Err(CdcError::ResetOutOfRange {
                value: reset,
                width,
            });
        }
        Ok(Arc::new(Self {
            width,
            value: AtomicU64::new(reset),
            previous: AtomicU64::new(reset),
            changed_at: AtomicU64::new(NEVER),
            sampled_at: AtomicU64::new(NEVER),
            coincident_at: AtomicU64::new(NEVER),
            coincident_before: AtomicU64::new(reset),
            coincident_after: AtomicU64::new(reset),
            writer_claimed: AtomicBool::new(false),
            reader_claimed: AtomicBool::new(false),
        }))
    }

    /// Single-bit wire.
    ///
    /// # Errors
    ///
    /// Never fails in practice; width 1 and reset 0/1 are always valid.
    pub fn bit(reset: bool) -> CdcResult<Arc<Self>> {
        Self::new(1, u64::from(reset))
    }

    /// Width in bits.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Claims the driving side.
    ///
    /// # Panics
    ///
    /// Panics if a writer already exists.
    #[must_use]
    pub fn writer(self: &Arc<Self>) -> WireWriter {
        let was_claimed = self.writer_claimed.swap(true, Ordering::AcqRel);
        assert!(!was_claimed, "Double writer! A wire has exactly one driving domain.");
        WireWriter {
            wire: Arc::clone(self),
            mask: width_mask(self.width),
        }
    }

    /// Claims the sampling side.
    ///
    /// # Panics
    ///
    /// Panics if a reader already exists.
    #[must_use]
    pub fn reader(self: &Arc<Self>) -> WireReader {
        let was_claimed = self.reader_claimed.swap(true, Ordering::AcqRel);
        assert!(!was_claimed, "Double reader! A wire has exactly one sampling domain.");
        WireReader {
            wire: Arc::clone(self),
        }
    }

    /// Whether a writer is currently attached.
    #[inline]
    #[must_use]
    pub fn has_writer(&self) -> bool {
        self.writer_claimed.load(Ordering::Acquire)
    }

    /// Whether a reader is currently attached.
    #[inline]
    #[must_use]
    pub fn has_reader(&self) -> bool {
        self.reader_claimed.load(Ordering::Acquire)
    }
}

/// Driving side of a [`Wire`].
#[derive(Debug)]
pub struct WireWriter {
    wire: Arc<Wire>,
    mask: u64,
}

impl WireWriter {
    /// Drives `value` from the owning domain's register at this edge.
    ///
    /// Bits above the wire width are discarded.
    pub fn drive(&mut self, value: u64, edge: &Edge<'_>) {
        let value = value & self.mask;
        let current = self.wire.value.load(Ordering::Relaxed);
        if value == current {
            return;
        }
        let now = edge.settle().now();
        if let Settle::Window { window, .. } = edge.settle() {
            // The reader already sampled at this instant and saw `current`.
            if window > 0 && self.wire.sampled_at.load(Ordering::Acquire) == now {
                self.wire.coincident_before.store(current, Ordering::Relaxed);
                self.wire.coincident_after.store(value, Ordering::Relaxed);
                self.wire.coincident_at.store(now, Ordering::Relaxed);
            }
        }
        self.wire.previous.store(current, Ordering::Relaxed);
        self.wire.changed_at.store(now, Ordering::Relaxed);
        self.wire.value.store(value, Ordering::Release);
    }

    /// Value currently driven.
    #[inline]
    #[must_use]
    pub fn value(&self) -> u64 {
        self.wire.value.load(Ordering::Relaxed)
    }
}

impl Drop for WireWriter {
    fn drop(&mut self) {
        self.wire.writer_claimed.store(false, Ordering::Release);
    }
}

/// Sampling side of a [`Wire`].
#[derive(Debug)]
pub struct WireReader {
    wire: Arc<Wire>,
}

impl WireReader {
    /// Samples the wire at this edge.
    #[must_use]
    pub fn sample(&self, edge: &Edge<'_>) -> Sample {
        let value = self.wire.value.load(Ordering::Acquire);
        let Settle::Window { now, window } = edge.settle() else {
            return Sample::settled(value);
        };
        self.wire.sampled_at.store(now, Ordering::Release);

        let changed_at = self.wire.changed_at.load(Ordering::Relaxed);
        if changed_at == NEVER || now < changed_at {
            return Sample::settled(value);
        }

        let previous = self.wire.previous.load(Ordering::Relaxed);
        let age = now - changed_at;
        if age < window {
            Sample::new(previous, value)
        } else if age == 0 {
            Sample::settled(previous)
        } else {
            Sample::settled(value)
        }
    }

    /// Corrects a sample taken at `taken_at` for a write the driving domain
    /// made at that same instant after the sample was taken.
    ///
    /// Returns `sample` unchanged when no such write happened.
    #[must_use]
    pub fn revisit(&self, sample: Sample, taken_at: Option<u64>) -> Sample {
        let Some(taken_at) = taken_at else {
            return sample;
        };
        if self.wire.coincident_at.load(Ordering::Relaxed) != taken_at {
            return sample;
        }
        Sample::new(
            self.wire.coincident_before.load(Ordering::Relaxed),
            self.wire.coincident_after.load(Ordering::Relaxed),
        )
    }

    /// Width of the sampled wire.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.wire.width
    }
}

impl Drop for WireReader {
    fn drop(&mut self) {
        self.wire.reader_claimed.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(now: u64, window: u64) -> Edge<'static> {
        Edge::new(0, Settle::Window { now, window }, None)
    }

    #[test]
    fn test_width_mask() {
        assert_eq!(width_mask(1), 0b1);
        assert_eq!(width_mask(4), 0b1111);
        assert_eq!(width_mask(64), u64::MAX);
    }

    #[test]
    fn test_invalid_width() {
        assert_eq!(
            Wire::new(0, 0).unwrap_err(),
            CdcError::InvalidWidth { width: 0, max: 64 }
        );
        assert!(Wire::new(65, 0).is_err());
        assert_eq!(
            Wire::new(4, 0x10).unwrap_err(),
            CdcError::ResetOutOfRange { value: 0x10, width: 4 }
        );
    }

    #[test]
    fn test_drive_masks_to_width() {
        let wire = Wire::new(4, 0).unwrap();
        let mut w = wire.writer();
        let r = wire.reader();
        w.drive(0xff, &Edge::ideal(0));
        assert_eq!(r.sample(&Edge::ideal(0)), Sample::settled(0xf));
    }

    #[test]
    fn test_sample_inside_window_is_unsettled() {
        let wire = Wire::new(4, 0b0001).unwrap();
        let mut w = wire.writer();
        let r = wire.reader();
        w.drive(0b0011, &at(100, 10));

        // Same instant: caught moving.
        assert_eq!(r.sample(&at(100, 10)), Sample::new(0b0001, 0b0011));
        // Inside the window: bit 1 is moving.
        let s = r.sample(&at(105, 10));
        assert_eq!(s.unsettled(), 0b0010);
        assert!(!s.is_settled());
        // After the window: settled.
        assert_eq!(r.sample(&at(110, 10)), Sample::settled(0b0011));
    }

    #[test]
    fn test_coincident_sample_without_window_sees_old_value() {
        let wire = Wire::bit(false).unwrap();
        let mut w = wire.writer();
        let r = wire.reader();
        w.drive(1, &at(50, 0));
        assert_eq!(r.sample(&at(50, 0)), Sample::settled(0));
        assert_eq!(r.sample(&at(51, 0)), Sample::settled(1));
    }

    #[test]
    fn test_write_after_coincident_sample_is_unsettled() {
        let wire = Wire::new(4, 0b0001).unwrap();
        let mut w = wire.writer();
        let r = wire.reader();

        // Sampler runs first at t=100, then the driver writes at t=100.
        let early = r.sample(&at(100, 10));
        assert_eq!(early, Sample::settled(0b0001));
        w.drive(0b0011, &at(100, 10));

        let revisited = r.revisit(early, Some(100));
        assert_eq!(revisited, Sample::new(0b0001, 0b0011));
        assert_eq!(revisited.unsettled(), 0b0010);
        // A sample from another instant is left alone.
        assert_eq!(r.revisit(early, Some(90)), early);
        assert_eq!(r.revisit(early, None), early);
    }

    #[test]
    fn test_write_after_coincident_sample_without_window_is_settled() {
        let wire = Wire::bit(false).unwrap();
        let mut w = wire.writer();
        let r = wire.reader();

        let early = r.sample(&at(50, 0));
        w.drive(1, &at(50, 0));
        assert_eq!(r.revisit(early, Some(50)), Sample::settled(0));
    }

    #[test]
    fn test_redriving_same_value_is_not_a_change() {
        let wire = Wire::bit(false).unwrap();
        let mut w = wire.writer();
        let r = wire.reader();
        w.drive(1, &at(0, 5));
        w.drive(1, &at(10, 5));
        assert_eq!(r.sample(&at(12, 5)), Sample::settled(1));
    }

    #[test]
    fn test_handles_release_on_drop() {
        let wire = Wire::bit(false).unwrap();
        {
            let _w = wire.writer();
            let _r = wire.reader();
            assert!(wire.has_writer());
            assert!(wire.has_reader());
        }
        assert!(!wire.has_writer());
        assert!(!wire.has_reader());
    }

    #[test]
    #[should_panic(expected = "Double writer")]
    fn test_double_writer_panics() {
        let wire = Wire::bit(false).unwrap();
        let _w1 = wire.writer();
        let _w2 = wire.writer();
    }

    #[test]
    #[should_panic(expected = "Double reader")]
    fn test_double_reader_panics() {
        let wire = Wire::bit(false).unwrap();
        let _r1 = wire.reader();
        let _r2 = wire.reader();
    }
}
