//! Suite configuration
//!
//! Every section has defaults matching a local PostgreSQL-style target, so an
//! empty TOML file is a valid configuration:
//!
//! ```toml
//! isolation_delay_ms = 2000
//! seed = 42
//!
//! [target]
//! host = "localhost"
//! port = 5460
//!
//! [injectors.random_failure]
//! trials = 20
//! failure_rate = 0.5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::adapter::TargetConfig;
use crate::inject::InjectorSettings;
use crate::recovery::RecoveryConfig;
use crate::workload::Workload;
use crate::{Error, Result};

/// Deadlines applied to every blocking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Session establishment deadline
    pub connect_ms: u64,
    /// Statement deadline
    pub query_ms: u64,
    /// Deadline for a single liveness probe
    pub probe_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            query_ms: 30_000,
            probe_ms: 2_000,
        }
    }
}

impl TimeoutConfig {
    /// Connect deadline.
    #[must_use]
    pub const fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    /// Statement deadline.
    #[must_use]
    pub const fn query(&self) -> Duration {
        Duration::from_millis(self.query_ms)
    }

    /// Liveness probe deadline.
    #[must_use]
    pub const fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }
}

/// Full configuration of one suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Connection parameters of the system under test
    pub target: TargetConfig,
    /// Call deadlines
    pub timeouts: TimeoutConfig,
    /// Fixture and statement text
    pub workload: Workload,
    /// Pause between consecutive experiments
    pub isolation_delay_ms: u64,
    /// Pause between baseline capture and the first experiment
    pub settle_delay_ms: u64,
    /// Post-chaos liveness polling
    pub recovery: RecoveryConfig,
    /// Seed for the random source (`None` = OS entropy)
    pub seed: Option<u64>,
    /// Per-injector parameters
    pub injectors: InjectorSettings,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            timeouts: TimeoutConfig::default(),
            workload: Workload::default(),
            isolation_delay_ms: 2_000,
            settle_delay_ms: 2_000,
            recovery: RecoveryConfig::default(),
            seed: None,
            injectors: InjectorSettings::default(),
        }
    }
}

impl SuiteConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// `Error::Toml` for malformed input, `Error::InvalidConfig` if validation fails.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    /// `Error::Io` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Pause between experiments.
    #[must_use]
    pub const fn isolation_delay(&self) -> Duration {
        Duration::from_millis(self.isolation_delay_ms)
    }

    /// Pause after the baseline.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Configuration with every pause and hold set to zero (tests, smoke runs).
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.isolation_delay_ms = 0;
        self.settle_delay_ms = 0;
        self.recovery.backoff_ms = 0;
        self.injectors.connection_saturation.hold_ms = 0;
        self.injectors.slow_query.delay_ms = 0;
        self
    }

    /// Reject values that would make a run meaningless.
    ///
    /// # Errors
    /// `Error::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.workload.validate()?;
        self.recovery.validate()?;
        self.injectors.validate()?;
        if self.timeouts.connect_ms == 0 || self.timeouts.query_ms == 0 || self.timeouts.probe_ms == 0 {
            return Err(Error::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
