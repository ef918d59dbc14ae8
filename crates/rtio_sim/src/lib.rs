//! # RTIO Clock Domain Crossing Simulator
//!
//! Drives the primitives of [`rtio_core`] from independent clocks and checks
//! what comes out the other side.
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`clock`] | free-running clocks, merged into one edge stream |
//! | [`testbench`] | settle window and metastability resolver around a scheduler |
//! | [`trace`] | production/observation logs and the value-transfer checker |
//! | [`scenarios`] | one runner per crossing, each with a report |
//! | [`threaded`] | the same crossings with one OS thread per domain |
//! | [`config`] | TOML configuration and presets |
//!
//! ## Determinism
//!
//! A simulated run depends only on its [`SimulationConfig`]. Same config, same
//! seed, same report. The threaded runtime is the exception: OS scheduling
//! decides the interleaving, and only the guarantees are checked.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod config;
pub mod error;
pub mod scenarios;
pub mod testbench;
pub mod threaded;
pub mod trace;

pub use clock::{Clock, ClockEvent, DomainId, Scheduler};
pub use config::{
    DomainConfig, MetastabilityConfig, SimulationConfig, ThreadedConfig, MAX_CYCLES, MAX_PERIOD,
    MAX_STAGES,
};
pub use error::{SimError, SimResult};
pub use scenarios::{
    min_pulse_gap, random_requests, run_gray_counter, run_gray_sequence, run_handshake,
    run_pulse_train, spaced_pulses, GrayReport, HandshakeReport, PulseReport,
};
pub use testbench::Testbench;
pub use threaded::{
    run_threaded_gray, run_threaded_handshake, ThreadedGrayReport, ThreadedHandshakeReport,
};
pub use trace::{verify_value_transfer, Stamped, Trace, ValueReport};
