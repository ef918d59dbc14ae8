//! # Simulation Error Types

use std::path::PathBuf;

use rtio_core::CdcError;
use thiserror::Error;

/// Errors that can occur while setting up or running a simulation.
#[derive(Error, Debug)]
pub enum SimError {
    /// A crossing could not be built.
    #[error("crossing construction failed: {0}")]
    Cdc(#[from] CdcError),

    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`SimulationConfig`](crate::SimulationConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but describes an impossible setup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A domain thread could not be started.
    #[error("failed to spawn domain thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A domain thread panicked.
    #[error("domain thread `{0}` panicked")]
    ThreadPanicked(String),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
