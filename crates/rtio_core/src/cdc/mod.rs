//! # Clock Domain Crossings
//!
//! Every crossing is built whole and then split into the half owned by the
//! source domain and the half owned by the destination domain. The halves
//! share nothing but [`Wire`](crate::signal::Wire)s and a stats block.
//!
//! ```text
//! MultiReg            one wire, N capture stages
//!   └─ PulseSynchronizer   toggle + MultiReg + edge detect
//!        └─ BlindTransfer      request + acknowledgment pulse pair
//! GrayCodeTransfer    encode + MultiReg (per bit) + decode + register
//! ```

mod blind;
mod gray;
mod multireg;
mod pulse;

pub use blind::{round_trip_bound, BlindSink, BlindSource, BlindState, BlindStats, BlindTransfer};
pub use gray::{
    gray_decode, gray_encode, GrayCodeTransfer, GrayDecoder, GrayEncoder, GrayStats,
};
pub use multireg::{MultiReg, DEFAULT_STAGES};
pub use pulse::{PulseReceiver, PulseSender, PulseStats, PulseSynchronizer};
