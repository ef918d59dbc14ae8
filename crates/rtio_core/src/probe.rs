//! # Verification Counters
//!
//! Production logic never checks timing preconditions at run time: doing so
//! would need another domain crossing. Instead every primitive bumps a few
//! counters that a testbench reads after the fact.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic event counter shared between the two halves of a crossing.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Records one event.
    #[inline]
    pub fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Current count.
    #[inline]
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_counts() {
        let c = Counter::default();
        assert_eq!(c.get(), 0);
        c.incr();
        c.incr();
        assert_eq!(c.get(), 2);
    }
}
