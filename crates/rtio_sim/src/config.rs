//! # Simulation Configuration
//!
//! All timing is in abstract simulation time units. Only the bench knows
//! these numbers; the primitives see nothing but edges.
//!
//! ```toml
//! settle_window = 5
//! width = 16
//! cycles = 2000
//!
//! [source]
//! name = "rtio"
//! period = 100
//!
//! [destination]
//! name = "sys"
//! period = 97
//! phase = 13
//!
//! [metastability]
//! policy = "random"
//! seed = 42
//! ```

use std::path::Path;

use rtio_core::{ResolvePolicy, MAX_WIDTH};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Timing of one clock domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    /// Domain name, used in logs.
    pub name: String,
    /// Time between edges.
    pub period: u64,
    /// Time of the first edge.
    #[serde(default)]
    pub phase: u64,
}

impl DomainConfig {
    /// Creates a domain description.
    #[must_use]
    pub fn new(name: impl Into<String>, period: u64, phase: u64) -> Self {
        Self {
            name: name.into(),
            period,
            phase,
        }
    }
}

/// How unsettled bits come to rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MetastabilityConfig {
    /// Always the old value.
    KeepPrevious,
    /// Always the new value.
    TakeNext,
    /// Seeded coin flip per bit.
    Random {
        /// RNG seed.
        seed: u64,
    },
}

impl Default for MetastabilityConfig {
    fn default() -> Self {
        Self::Random { seed: 0 }
    }
}

impl From<MetastabilityConfig> for ResolvePolicy {
    fn from(config: MetastabilityConfig) -> Self {
        match config {
            MetastabilityConfig::KeepPrevious => Self::KeepPrevious,
            MetastabilityConfig::TakeNext => Self::TakeNext,
            MetastabilityConfig::Random { seed } => Self::Random { seed },
        }
    }
}

/// Pacing for the threaded runtime, in wall-clock units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadedConfig {
    /// Source thread tick interval in microseconds.
    pub source_tick_us: u64,
    /// Destination thread tick interval in microseconds.
    pub destination_tick_us: u64,
    /// How long to run both threads.
    pub duration_ms: u64,
    /// Source issues a handshake request every this many ticks.
    pub request_every: u64,
}

impl Default for ThreadedConfig {
    fn default() -> Self {
        Self {
            source_tick_us: 50,
            destination_tick_us: 70,
            duration_ms: 200,
            request_every: 3,
        }
    }
}

/// Longest period or phase a domain may have.
pub const MAX_PERIOD: u64 = 1 << 32;

/// Most source cycles a run may ask for.
pub const MAX_CYCLES: u64 = 1 << 24;

/// Most capture stages a resynchronizer may have.
pub const MAX_STAGES: usize = 64;

/// Full description of one simulation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Domain that drives the crossing.
    pub source: DomainConfig,
    /// Domain that samples the crossing.
    pub destination: DomainConfig,
    /// Unsettled interval after every write. Must be shorter than both periods.
    #[serde(default)]
    pub settle_window: u64,
    /// Resolver for unsettled bits.
    #[serde(default)]
    pub metastability: MetastabilityConfig,
    /// Width of the Gray-code transfer.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Capture stages in every resynchronizer.
    #[serde(default = "default_stages")]
    pub stages: usize,
    /// Source cycles to run.
    #[serde(default = "default_cycles")]
    pub cycles: u64,
    /// Threaded runtime pacing.
    #[serde(default)]
    pub threaded: ThreadedConfig,
}

const fn default_width() -> u32 {
    16
}

const fn default_stages() -> usize {
    rtio_core::DEFAULT_STAGES
}

const fn default_cycles() -> u64 {
    2_000
}

impl SimulationConfig {
    /// Both domains on the same clock. Nothing is ever unsettled.
    #[must_use]
    pub fn lockstep() -> Self {
        Self::with_domains(
            DomainConfig::new("rtio", 10, 0),
            DomainConfig::new("sys", 10, 0),
            0,
        )
    }

    /// Destination runs `ratio` times faster than the source, edges aligned.
    #[must_use]
    pub fn harmonic(ratio: u64) -> Self {
        let ratio = ratio.max(1);
        Self::with_domains(
            DomainConfig::new("rtio", 20 * ratio, 0),
            DomainConfig::new("sys", 20, 0),
            0,
        )
    }

    /// Same frequency, fixed phase offset, samples close to every write.
    #[must_use]
    pub fn mesochronous(phase: u64) -> Self {
        Self::with_domains(
            DomainConfig::new("rtio", 100, 0),
            DomainConfig::new("sys", 100, phase % 100),
            10,
        )
    }

    /// Nearly equal frequencies: the phase drifts through every offset.
    #[must_use]
    pub fn plesiochronous() -> Self {
        Self::with_domains(
            DomainConfig::new("rtio", 100, 0),
            DomainConfig::new("sys", 97, 13),
            5,
        )
    }

    fn with_domains(source: DomainConfig, destination: DomainConfig, settle_window: u64) -> Self {
        Self {
            source,
            destination,
            settle_window,
            metastability: MetastabilityConfig::default(),
            width: default_width(),
            stages: default_stages(),
            cycles: default_cycles(),
            threaded: ThreadedConfig::default(),
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML or an invalid setup.
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or [`Self::from_toml_str`] fails.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded simulation config");
        Ok(config)
    }

    /// Checks that the setup is physically meaningful.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> SimResult<()> {
        for domain in [&self.source, &self.destination] {
            if domain.period == 0 {
                return Err(invalid(format!("domain `{}` has a zero period", domain.name)));
            }
            if domain.period > MAX_PERIOD {
                return Err(invalid(format!(
                    "domain `{}` period {} is above {MAX_PERIOD}",
                    domain.name, domain.period
                )));
            }
            if domain.phase >= domain.period {
                return Err(invalid(format!(
                    "domain `{}` phase {} is not below its period {}",
                    domain.name, domain.phase, domain.period
                )));
            }
            if self.settle_window >= domain.period {
                return Err(invalid(format!(
                    "settle window {} must be shorter than the `{}` period {}",
                    self.settle_window, domain.name, domain.period
                )));
            }
        }
        if self.source.name == self.destination.name {
            return Err(invalid(format!(
                "source and destination are both named `{}`",
                self.source.name
            )));
        }
        if self.width == 0 || self.width > MAX_WIDTH {
            return Err(invalid(format!("width {} outside 1..={MAX_WIDTH}", self.width)));
        }
        if self.stages < rtio_core::DEFAULT_STAGES || self.stages > MAX_STAGES {
            return Err(invalid(format!(
                "{} stages outside 2..={MAX_STAGES}",
                self.stages
            )));
        }
        if self.cycles > MAX_CYCLES {
            return Err(invalid(format!("{} cycles is above {MAX_CYCLES}", self.cycles)));
        }
        if self.threaded.source_tick_us == 0 || self.threaded.destination_tick_us == 0 {
            return Err(invalid("threaded tick interval must be non-zero".to_owned()));
        }
        if self.threaded.request_every == 0 {
            return Err(invalid("request_every must be non-zero".to_owned()));
        }
        Ok(())
    }

    /// Last simulation time covered by [`Self::cycles`] source cycles.
    #[must_use]
    pub fn end_time(&self) -> u64 {
        self.cycles
            .saturating_mul(self.source.period)
            .saturating_add(self.source.phase)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::plesiochronous()
    }
}

fn invalid(message: String) -> SimError {
    SimError::InvalidConfig(message)
}
