//! Fault Injectors
//!
//! A [`FaultInjector`] encapsulates one chaos scenario. The runner hands it an
//! [`InjectionContext`] (adapter, main session, read-only baseline, random
//! source) and a pending [`Experiment`] to write observations into.
//!
//! ## Lifecycle
//!
//! ```text
//! runner: start_time ─► setup ─► inject (+ observe) ─► teardown ─► end_time + result
//!                         │            │                    │
//!                         └── Err ─────┴──── Err ───────────┴──► Failed + "Error: ..." note
//! ```
//!
//! Injectors do not catch their own errors; the runner's failure boundary
//! turns any `Err` into a failed experiment.

mod connection_saturation;
mod cpu_load;
mod random_failure;
mod slow_query;

pub use connection_saturation::{ConnectionSaturationInjector, ConnectionSaturationParams, HeldSessions};
pub use cpu_load::{CpuLoadInjector, CpuLoadParams};
pub use random_failure::{RandomFailureInjector, RandomFailureParams, TrialTally};
pub use slow_query::{degradation_percent, SlowQueryInjector, SlowQueryParams};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::adapter::{execute_bounded, Rows, Session, TargetAdapter, TargetConfig};
use crate::clock::as_millis_f64;
use crate::config::TimeoutConfig;
use crate::experiment::{BaselineMetrics, BlastRadius, Experiment};
use crate::workload::Workload;
use crate::{Error, Result};

/// Source of uniform samples in `[0, 1)`.
///
/// Injected so random experiments are reproducible under a fixed seed.
pub trait RandomSource: Send + Sync {
    /// Next sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// [`RandomSource`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: RngCore> RngSource<R> {
    /// Wrap a generator.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Deterministic source for `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: RngCore + Send + Sync> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen()
    }
}

/// Replays a fixed sequence of samples, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<f64>,
    position: usize,
}

impl SequenceSource {
    /// Source replaying `values` (an empty list always yields `0.0`).
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            position: 0,
        }
    }
}

impl RandomSource for SequenceSource {
    fn next_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value
    }
}

/// Everything an injector may touch while it runs.
pub struct InjectionContext<'a> {
    /// Adapter of the system under test
    pub adapter: &'a dyn TargetAdapter,
    /// Suite-wide session (owned by the suite, never closed by injectors)
    pub session: &'a Session,
    /// Connection parameters, for injectors that open extra sessions
    pub target: &'a TargetConfig,
    /// Baseline captured before any fault, if any
    pub baseline: Option<&'a BaselineMetrics>,
    /// Statement text
    pub workload: &'a Workload,
    /// Call deadlines
    pub timeouts: &'a TimeoutConfig,
    /// Random source for probabilistic faults
    pub random: &'a mut dyn RandomSource,
}

impl std::fmt::Debug for InjectionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionContext")
            .field("session", &self.session)
            .field("target", &self.target)
            .field("baseline", &self.baseline)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl InjectionContext<'_> {
    /// Run `query` on the main session with the statement deadline.
    ///
    /// # Errors
    /// Adapter errors, or `Error::Timeout`.
    pub async fn execute(&self, query: &str) -> Result<Rows> {
        self.execute_within(query, self.timeouts.query()).await
    }

    /// Run `query` on the main session with an explicit deadline.
    ///
    /// # Errors
    /// Adapter errors, or `Error::Timeout`.
    pub async fn execute_within(&self, query: &str, timeout: Duration) -> Result<Rows> {
        execute_bounded(self.adapter, self.session, query, timeout).await
    }

    /// Run `query` and return its rows with the wall-clock latency in milliseconds.
    ///
    /// # Errors
    /// Adapter errors, or `Error::Timeout`.
    pub async fn timed_execute(&self, query: &str) -> Result<(Rows, f64)> {
        let start = Instant::now();
        let rows = self.execute(query).await?;
        Ok((rows, as_millis_f64(start.elapsed())))
    }

    /// The baseline, or `Error::MissingBaseline`.
    ///
    /// # Errors
    /// `Error::MissingBaseline` when the runner has none.
    pub fn require_baseline(&self) -> Result<BaselineMetrics> {
        self.baseline.copied().ok_or(Error::MissingBaseline)
    }
}

/// One pluggable chaos scenario.
#[async_trait]
pub trait FaultInjector: Send + Sync {
    /// Experiment name.
    fn name(&self) -> &str;

    /// What the experiment simulates.
    fn description(&self) -> &str;

    /// Declared scope of impact.
    fn blast_radius(&self) -> BlastRadius;

    /// Fresh pending experiment for this injector.
    fn experiment(&self) -> Experiment {
        Experiment::new(self.name(), self.description(), self.blast_radius())
    }

    /// Prepare the fault. Runs after the start time is stamped.
    async fn setup(&self, _ctx: &mut InjectionContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Inject the fault and record observations into `experiment`.
    ///
    /// Any resource opened here must be released before returning, on every path.
    async fn inject(&self, ctx: &mut InjectionContext<'_>, experiment: &mut Experiment) -> Result<()>;

    /// Undo what `setup` did. Runs whenever `setup` succeeded.
    async fn teardown(&self, _ctx: &mut InjectionContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Parameters for the four built-in injectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorSettings {
    /// CPU load
    pub cpu_load: CpuLoadParams,
    /// Connection saturation
    pub connection_saturation: ConnectionSaturationParams,
    /// Slow query
    pub slow_query: SlowQueryParams,
    /// Random failures
    pub random_failure: RandomFailureParams,
}

impl InjectorSettings {
    /// Check every parameter block.
    ///
    /// # Errors
    /// `Error::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.connection_saturation.validate()?;
        self.random_failure.validate()?;
        Ok(())
    }
}

/// Built-in injectors that are enabled, in execution order:
/// CPU load, connection saturation, slow query, random failures.
#[must_use]
pub fn default_injectors(settings: &InjectorSettings) -> Vec<Box<dyn FaultInjector>> {
    let mut injectors: Vec<Box<dyn FaultInjector>> = Vec::with_capacity(4);
    if settings.cpu_load.enabled {
        injectors.push(Box::new(CpuLoadInjector::new(settings.cpu_load.clone())));
    }
    if settings.connection_saturation.enabled {
        injectors.push(Box::new(ConnectionSaturationInjector::new(
            settings.connection_saturation.clone(),
        )));
    }
    if settings.slow_query.enabled {
        injectors.push(Box::new(SlowQueryInjector::new(settings.slow_query.clone())));
    }
    if settings.random_failure.enabled {
        injectors.push(Box::new(RandomFailureInjector::new(
            settings.random_failure.clone(),
        )));
    }
    injectors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_source_is_reproducible() {
        let mut a = RngSource::seeded(42);
        let mut b = RngSource::seeded(42);
        for _ in 0..32 {
            let x = a.next_unit();
            assert!((0.0..1.0).contains(&x));
            assert!((x - b.next_unit()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_sequence_source_cycles() {
        let mut s = SequenceSource::new(vec![0.1, 0.9]);
        let drawn: Vec<f64> = (0..4).map(|_| s.next_unit()).collect();
        assert_eq!(drawn, [0.1, 0.9, 0.1, 0.9]);
        assert!(SequenceSource::new(Vec::new()).next_unit().abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_injector_order() {
        let injectors = default_injectors(&InjectorSettings::default());
        let names: Vec<&str> = injectors.iter().map(|i| i.name()).collect();
        assert_eq!(
            names,
            [
                "High CPU Load",
                "Connection Saturation",
                "Slow Query Injection",
                "Random Transaction Failures"
            ]
        );
    }

    #[test]
    fn test_disabled_injectors_skipped() {
        let mut settings = InjectorSettings::default();
        settings.cpu_load.enabled = false;
        settings.slow_query.enabled = false;
        let injectors = default_injectors(&settings);
        assert_eq!(injectors.len(), 2);
        assert_eq!(injectors[0].blast_radius(), BlastRadius::ConnectionPool);
    }
}
