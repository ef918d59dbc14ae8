//! # CDC Error Types
//!
//! Only construction can fail. Timing-policy violations at run time (pulse
//! overrun, a request while awaiting acknowledgment) are counted, never raised.

use thiserror::Error;

/// Errors raised while building a crossing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CdcError {
    /// Word width outside `1..=64`.
    #[error("invalid width {width}: must be between 1 and {max}")]
    InvalidWidth {
        /// The rejected width.
        width: u32,
        /// Largest supported width.
        max: u32,
    },

    /// A resynchronizer needs at least two capture stages.
    #[error("a resynchronizer needs at least 2 stages, got {0}")]
    TooFewStages(usize),

    /// Reset value does not fit the wire width.
    #[error("reset value {value:#x} does not fit in {width} bits")]
    ResetOutOfRange {
        /// The rejected reset value.
        value: u64,
        /// Width of the wire.
        width: u32,
    },
}

/// Result type for crossing construction.
pub type CdcResult<T> = Result<T, CdcError>;
