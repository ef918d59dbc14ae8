//! # Metastability Model
//!
//! A flip-flop that samples its input while the input is changing may hang
//! between 0 and 1 for a while before falling to one side. Which side is not
//! predictable. The resynchronizer gives it one full cycle to fall; when it
//! does, [`Resolve`] picks the side.
//!
//! For a single bit that was changing from `before` to `after`, any outcome is
//! either the old or the new value. That is the whole reason Gray coding works.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Decides where an unsettled bit comes to rest.
pub trait Resolve {
    /// Returns the settled value of a bit that was sampled while changing
    /// from `before` to `after`.
    fn resolve(&mut self, before: bool, after: bool) -> bool;
}

/// Always falls back to the value before the write (slowest observer).
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepPrevious;

impl Resolve for KeepPrevious {
    #[inline]
    fn resolve(&mut self, before: bool, _after: bool) -> bool {
        before
    }
}

/// Always falls forward to the value after the write (fastest observer).
#[derive(Clone, Copy, Debug, Default)]
pub struct TakeNext;

impl Resolve for TakeNext {
    #[inline]
    fn resolve(&mut self, _before: bool, after: bool) -> bool {
        after
    }
}

/// Coin flip per unsettled bit, reproducible from a seed.
#[derive(Clone, Debug)]
pub struct SeededResolver {
    rng: ChaCha8Rng,
}

impl SeededResolver {
    /// Creates a resolver; the same seed always yields the same outcomes.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Resolve for SeededResolver {
    #[inline]
    fn resolve(&mut self, _before: bool, _after: bool) -> bool {
        self.rng.gen()
    }
}

/// Wraps another resolver and counts how often each side was chosen.
#[derive(Clone, Debug, Default)]
pub struct CountingResolver<R> {
    inner: R,
    kept_previous: u64,
    took_next: u64,
}

impl<R: Resolve> CountingResolver<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            kept_previous: 0,
            took_next: 0,
        }
    }

    /// Total unsettled bits resolved.
    #[must_use]
    pub fn resolutions(&self) -> u64 {
        self.kept_previous + self.took_next
    }

    /// Resolutions that landed on the old value.
    #[must_use]
    pub fn kept_previous(&self) -> u64 {
        self.kept_previous
    }

    /// Resolutions that landed on the new value.
    #[must_use]
    pub fn took_next(&self) -> u64 {
        self.took_next
    }
}

impl<R: Resolve> Resolve for CountingResolver<R> {
    fn resolve(&mut self, before: bool, after: bool) -> bool {
        let rest = self.inner.resolve(before, after);
        if rest == after {
            self.took_next += 1;
        } else {
            self.kept_previous += 1;
        }
        rest
    }
}

/// Choice of resolver, as named in a config file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// [`KeepPrevious`].
    KeepPrevious,
    /// [`TakeNext`].
    TakeNext,
    /// [`SeededResolver`] with the given seed.
    Random {
        /// RNG seed.
        seed: u64,
    },
}

impl ResolvePolicy {
    /// Builds the resolver this policy names.
    #[must_use]
    pub fn build(self) -> Box<dyn Resolve + Send> {
        match self {
            Self::KeepPrevious => Box::new(KeepPrevious),
            Self::TakeNext => Box::new(TakeNext),
            Self::Random { seed } => Box::new(SeededResolver::new(seed)),
        }
    }
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self::Random { seed: 0 }
    }
}

impl<R: Resolve + ?Sized> Resolve for Box<R> {
    #[inline]
    fn resolve(&mut self, before: bool, after: bool) -> bool {
        (**self).resolve(before, after)
    }
}
