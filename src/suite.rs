//! Chaos Suite - one complete run against one target
//!
//! ```text
//! connect ─► provision fixture ─► baseline ─► settle ─► run_all ─► recovery probe ─► score
//!    │              │                 │
//!    └──────────────┴─────────────────┴──► suite-fatal (no experiments, no report)
//! ```
//!
//! Setup-phase failures abort the run before any injector executes. Once the
//! experiments start, the suite always ends with a [`SuiteReport`], even when
//! every experiment failed. The suite session is closed on every path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::adapter::{close_bounded, connect_bounded, execute_bounded, Session, TargetAdapter};
use crate::baseline::BaselineCollector;
use crate::clock::{Clock, SystemClock};
use crate::config::SuiteConfig;
use crate::experiment::{BaselineMetrics, Experiment};
use crate::inject::{default_injectors, FaultInjector, RandomSource, RngSource};
use crate::recovery::RecoveryProber;
use crate::runner::ExperimentRunner;
use crate::score::ResilienceReport;
use crate::{Error, Result};

/// Read-only snapshot of a finished suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    baseline: BaselineMetrics,
    report: ResilienceReport,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl SuiteReport {
    /// Baseline every experiment was compared against.
    #[must_use]
    pub const fn baseline(&self) -> &BaselineMetrics {
        &self.baseline
    }

    /// Scored experiments and recovery outcome.
    #[must_use]
    pub const fn report(&self) -> &ResilienceReport {
        &self.report
    }

    /// Experiments in execution order.
    #[must_use]
    pub fn experiments(&self) -> &[Experiment] {
        self.report.experiments()
    }

    /// When the suite connected.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the recovery probe finished.
    #[must_use]
    pub const fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

/// Drives a full chaos run through a [`TargetAdapter`].
pub struct ChaosSuite {
    adapter: Arc<dyn TargetAdapter>,
    config: SuiteConfig,
    clock: Arc<dyn Clock>,
    injectors: Option<Vec<Box<dyn FaultInjector>>>,
    random: Option<Box<dyn RandomSource>>,
}

impl ChaosSuite {
    /// Suite running the enabled built-in injectors with `config`.
    #[must_use]
    pub fn new(adapter: Arc<dyn TargetAdapter>, config: SuiteConfig) -> Self {
        Self {
            adapter,
            config,
            clock: Arc::new(SystemClock),
            injectors: None,
            random: None,
        }
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the built-in injectors.
    #[must_use]
    pub fn with_injectors(mut self, injectors: Vec<Box<dyn FaultInjector>>) -> Self {
        self.injectors = Some(injectors);
        self
    }

    /// Replace the random source (otherwise seeded from `config.seed` or OS entropy).
    #[must_use]
    pub fn with_random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    /// Configuration of this run.
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Execute the whole suite.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidConfig` if the configuration does not validate
    /// - `Error::Connection` if the target cannot be reached
    /// - `Error::Setup` if provisioning or baseline capture fails
    ///
    /// Experiment failures are never returned here; they are part of the report.
    pub async fn run(mut self) -> Result<SuiteReport> {
        self.config.validate()?;

        info!(
            host = %self.config.target.host,
            port = self.config.target.port,
            database = %self.config.target.database,
            "connecting to target"
        );
        let session = connect_bounded(
            self.adapter.as_ref(),
            &self.config.target,
            self.config.timeouts.connect(),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "connection failed");
            match e {
                Error::Connection(message) => Error::Connection(message),
                other => Error::Connection(other.to_string()),
            }
        })?;
        let started_at = self.clock.now();

        let outcome = self.run_session(&session, started_at).await;

        if let Err(e) =
            close_bounded(self.adapter.as_ref(), session, self.config.timeouts.connect()).await
        {
            warn!(error = %e, "failed to close suite session");
        }
        outcome
    }

    async fn run_session(&mut self, session: &Session, started_at: DateTime<Utc>) -> Result<SuiteReport> {
        let injectors = match self.injectors.take() {
            Some(injectors) => injectors,
            None => default_injectors(&self.config.injectors),
        };
        let random: Box<dyn RandomSource> = match (self.random.take(), self.config.seed) {
            (Some(random), _) => random,
            (None, Some(seed)) => Box::new(RngSource::seeded(seed)),
            (None, None) => Box::new(RngSource::from_entropy()),
        };

        self.provision(session).await?;
        let baseline = BaselineCollector::new(self.adapter.as_ref(), &self.config.workload)
            .timeout(self.config.timeouts.query())
            .clock(self.clock.clone())
            .capture(session)
            .await
            .map_err(|e| Error::Setup(format!("baseline capture failed: {e}")))?;

        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            debug!(delay_ms = settle.as_millis(), "settling after baseline");
            tokio::time::sleep(settle).await;
        }

        let mut runner = ExperimentRunner::new(self.adapter.as_ref(), session)
            .with_target(self.config.target.clone())
            .with_workload(self.config.workload.clone())
            .with_timeouts(self.config.timeouts)
            .with_baseline(baseline)
            .with_clock(self.clock.clone())
            .with_random(random);
        runner.register_all(injectors);
        runner.run_all(self.config.isolation_delay()).await;
        let experiments = runner.into_registry().into_experiments();

        let recovery = RecoveryProber::new(
            self.adapter.as_ref(),
            self.config.workload.liveness_query.clone(),
            self.config.timeouts.probe(),
        )
        .probe(
            session,
            self.config.recovery.max_attempts,
            self.config.recovery.backoff(),
        )
        .await;

        let report = ResilienceReport::new(experiments, recovery);
        info!(
            score = format_args!("{:.0}", report.score()),
            tier = %report.tier(),
            completed = report.completed_count(),
            failed = report.failed_count(),
            "suite finished"
        );

        Ok(SuiteReport {
            baseline,
            report,
            started_at,
            finished_at: self.clock.now(),
        })
    }

    async fn provision(&self, session: &Session) -> Result<()> {
        let workload = &self.config.workload;
        info!(table = %workload.table, rows = workload.rows, "provisioning fixture");
        for statement in workload.provisioning_statements() {
            execute_bounded(
                self.adapter.as_ref(),
                session,
                &statement,
                self.config.timeouts.query(),
            )
            .await
            .map_err(|e| Error::Setup(format!("fixture provisioning failed: {e}")))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChaosSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaosSuite")
            .field("config", &self.config)
            .field("custom_injectors", &self.injectors.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemoryTarget, MemoryTargetSettings};
    use crate::clock::ManualClock;
    use crate::experiment::ExperimentResult;
    use crate::inject::SequenceSource;

    fn quick_config() -> SuiteConfig {
        SuiteConfig {
            seed: Some(7),
            ..SuiteConfig::default()
        }
        .without_delays()
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_all_experiments() {
        let target = Arc::new(MemoryTarget::new());
        let report = ChaosSuite::new(target.clone(), quick_config())
            .with_random(Box::new(SequenceSource::new(vec![0.9])))
            .run()
            .await
            .unwrap();

        assert_eq!(report.experiments().len(), 4);
        assert!(report
            .experiments()
            .iter()
            .all(|e| e.result() == ExperimentResult::Completed));
        assert!((report.report().score() - 100.0).abs() < f64::EPSILON);
        assert!(report.report().recovery().recovered);
        assert_eq!(target.active_sessions(), 0);
        assert_eq!(target.table_rows("test_data"), Some(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_target_is_fatal() {
        let target = Arc::new(MemoryTarget::new());
        target.set_unreachable(true);

        let err = ChaosSuite::new(target, quick_config()).run().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(err.is_suite_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturation_blocked_under_capacity() {
        let target = Arc::new(MemoryTarget::with_settings(MemoryTargetSettings {
            max_connections: Some(11),
            ..MemoryTargetSettings::default()
        }));
        let report = ChaosSuite::new(target.clone(), quick_config())
            .run()
            .await
            .unwrap();

        let saturation = &report.experiments()[1];
        assert_eq!(saturation.name(), "Connection Saturation");
        assert_eq!(saturation.result(), ExperimentResult::Completed);
        assert!(saturation
            .observations()
            .iter()
            .any(|o| o.to_string().starts_with("Additional connection blocked (expected)")));
        assert_eq!(target.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_timestamps_from_clock() {
        let clock = Arc::new(ManualClock::default());
        let report = ChaosSuite::new(Arc::new(MemoryTarget::new()), quick_config())
            .with_clock(clock.clone())
            .with_injectors(Vec::new())
            .run()
            .await
            .unwrap();

        assert!(report.experiments().is_empty());
        assert_eq!(report.started_at(), clock.now());
        assert_eq!(report.finished_at(), clock.now());
        assert_eq!(report.baseline().captured_at(), clock.now());
    }
}
