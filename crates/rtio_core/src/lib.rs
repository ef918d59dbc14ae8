//! # RTIO Clock Domain Crossing Core
//!
//! The timing-critical RTIO logic runs in one clock domain, the supervisory
//! logic in another. The two domains share no time reference. This crate
//! holds the only sanctioned ways for data to cross between them:
//!
//! | Primitive | Carries | Latency (destination edges) |
//! |-----------|---------|-----------------------------|
//! | [`MultiReg`] | one or more independent bits | 2 (stage count) |
//! | [`PulseSynchronizer`] | one-cycle events, edge detected | 2 |
//! | [`GrayCodeTransfer`] | a counter that changes every cycle | 3 |
//! | [`BlindTransfer`] | one-shot events with backpressure | round trip |
//!
//! ## Architecture Rules
//!
//! 1. **One writer, one reader** - every [`Wire`] is driven by exactly one
//!    domain and sampled by exactly one other domain
//! 2. **Nothing reads the first stage** - the only register allowed to be
//!    unsettled is private to [`MultiReg`]
//! 3. **No primitive blocks** - every operation is one clock edge of work
//!
//! ## Modelling a clock edge
//!
//! Each domain advances by calling `tick` on the halves it owns, passing an
//! [`Edge`]. The edge says whether samples may be unsettled ([`Settle`]) and
//! which [`Resolve`] strategy decides how an unsettled bit comes to rest.
//!
//! ```rust,ignore
//! use rtio_core::{Edge, GrayCodeTransfer, Settle};
//!
//! let (mut encoder, mut decoder) = GrayCodeTransfer::new(16)?.split();
//!
//! // rtio domain
//! encoder.tick(counter, &mut Edge::new(cycle, Settle::Ideal, None));
//! // sys domain
//! let now = decoder.tick(&mut Edge::new(sys_cycle, Settle::Ideal, None));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cdc;
pub mod edge;
pub mod error;
pub mod metastability;
pub mod probe;
pub mod signal;

pub use cdc::{
    gray_decode, gray_encode, round_trip_bound, BlindSink, BlindSource, BlindState, BlindStats,
    BlindTransfer, GrayCodeTransfer, GrayDecoder, GrayEncoder, GrayStats, MultiReg,
    PulseReceiver, PulseSender, PulseStats, PulseSynchronizer, DEFAULT_STAGES,
};
pub use edge::{Edge, Settle};
pub use error::{CdcError, CdcResult};
pub use metastability::{
    CountingResolver, KeepPrevious, Resolve, ResolvePolicy, SeededResolver, TakeNext,
};
pub use probe::Counter;
pub use signal::{width_mask, Sample, Wire, WireReader, WireWriter, MAX_WIDTH};
