//! Experiment Runner
//!
//! Owns the injector registry, the baseline and the append-only experiment
//! registry for one suite run. Experiments execute strictly in registration
//! order with an explicit isolation delay between them, so one experiment's
//! residual load does not bleed into the next measurement.
//!
//! Every injector runs inside a failure boundary: an `Err` or a panic from setup,
//! inject or teardown becomes `Failed` plus an `Error: ...` note, and the
//! sequence continues.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use trueno_chaos::adapter::{MemoryTarget, TargetAdapter, TargetConfig};
//! use trueno_chaos::inject::{CpuLoadInjector, CpuLoadParams};
//! use trueno_chaos::runner::ExperimentRunner;
//!
//! # async fn example() -> trueno_chaos::Result<()> {
//! let target = MemoryTarget::new();
//! let session = target.connect(&TargetConfig::default(), Duration::from_secs(1)).await?;
//!
//! let mut runner = ExperimentRunner::new(&target, &session);
//! runner.register(Box::new(CpuLoadInjector::new(CpuLoadParams::default())));
//! let experiments = runner.run_all(Duration::ZERO).await;
//! assert_eq!(experiments.len(), 1);
//! # Ok(())
//! # }
//! ```

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::adapter::{Session, TargetAdapter, TargetConfig};
use crate::clock::{Clock, SystemClock};
use crate::config::TimeoutConfig;
use crate::experiment::{
    BaselineMetrics, Experiment, ExperimentRegistry, ExperimentResult, Observation,
};
use crate::inject::{FaultInjector, InjectionContext, RandomSource, RngSource};
use crate::workload::Workload;
use crate::{Error, Result};

/// Sequences fault injectors against one target session.
pub struct ExperimentRunner<'a> {
    adapter: &'a dyn TargetAdapter,
    session: &'a Session,
    target: TargetConfig,
    workload: Workload,
    timeouts: TimeoutConfig,
    baseline: Option<BaselineMetrics>,
    clock: Arc<dyn Clock>,
    random: Box<dyn RandomSource>,
    injectors: Vec<Box<dyn FaultInjector>>,
    registry: ExperimentRegistry,
}

impl<'a> ExperimentRunner<'a> {
    /// Runner with default workload, timeouts, system clock and an entropy-seeded random source.
    #[must_use]
    pub fn new(adapter: &'a dyn TargetAdapter, session: &'a Session) -> Self {
        Self {
            adapter,
            session,
            target: TargetConfig::default(),
            workload: Workload::default(),
            timeouts: TimeoutConfig::default(),
            baseline: None,
            clock: Arc::new(SystemClock),
            random: Box::new(RngSource::from_entropy()),
            injectors: Vec::new(),
            registry: ExperimentRegistry::new(),
        }
    }

    /// Connection parameters for injectors that open extra sessions.
    #[must_use]
    pub fn with_target(mut self, target: TargetConfig) -> Self {
        self.target = target;
        self
    }

    /// Statement text.
    #[must_use]
    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    /// Call deadlines.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Baseline handed read-only to every injector.
    #[must_use]
    pub const fn with_baseline(mut self, baseline: BaselineMetrics) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Clock used for experiment timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Random source handed to injectors.
    #[must_use]
    pub fn with_random(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Append an injector to the registry.
    pub fn register(&mut self, injector: Box<dyn FaultInjector>) {
        self.injectors.push(injector);
    }

    /// Append several injectors, keeping their order.
    pub fn register_all(&mut self, injectors: impl IntoIterator<Item = Box<dyn FaultInjector>>) {
        self.injectors.extend(injectors);
    }

    /// Experiments recorded so far, in execution order.
    #[must_use]
    pub fn experiments(&self) -> &[Experiment] {
        self.registry.experiments()
    }

    /// Consume the runner, keeping the recorded experiments.
    #[must_use]
    pub fn into_registry(self) -> ExperimentRegistry {
        self.registry
    }

    /// Run every registered injector in order, pausing `isolation_delay` between them.
    ///
    /// Individual failures never stop the sequence. Returns the registry contents.
    pub async fn run_all(&mut self, isolation_delay: Duration) -> &[Experiment] {
        let injectors = std::mem::take(&mut self.injectors);
        for (index, injector) in injectors.iter().enumerate() {
            if index > 0 && !isolation_delay.is_zero() {
                debug!(delay_ms = isolation_delay.as_millis(), "isolation window");
                tokio::time::sleep(isolation_delay).await;
            }
            let experiment = self.run_one(injector.as_ref()).await;
            self.registry.record(experiment);
        }
        self.injectors = injectors;
        self.registry.experiments()
    }

    /// Run one injector inside the failure boundary and return its finished experiment.
    ///
    /// The experiment is not recorded; [`Self::run_all`] does that.
    pub async fn run_one(&mut self, injector: &dyn FaultInjector) -> Experiment {
        let mut experiment = injector.experiment();
        experiment.start(self.clock.now());
        info!(
            experiment = experiment.name(),
            blast_radius = %experiment.blast_radius(),
            "experiment started"
        );

        let mut ctx = InjectionContext {
            adapter: self.adapter,
            session: self.session,
            target: &self.target,
            baseline: self.baseline.as_ref(),
            workload: &self.workload,
            timeouts: &self.timeouts,
            random: self.random.as_mut(),
        };
        let outcome = drive(injector, &mut ctx, &mut experiment).await;

        let result = match outcome {
            Ok(()) => ExperimentResult::Completed,
            Err(e) => {
                warn!(experiment = experiment.name(), error = %e, "experiment failed");
                experiment.observe(Observation::note(format!("Error: {e}")));
                ExperimentResult::Failed
            }
        };
        if experiment.observations().is_empty() {
            experiment.observe(Observation::note("No observations recorded"));
        }
        experiment.finish(result, self.clock.now());

        info!(
            experiment = experiment.name(),
            result = %experiment.result(),
            "experiment finished"
        );
        experiment
    }
}

impl std::fmt::Debug for ExperimentRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentRunner")
            .field("session", &self.session)
            .field("baseline", &self.baseline)
            .field("injectors", &self.injectors.len())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

async fn drive(
    injector: &dyn FaultInjector,
    ctx: &mut InjectionContext<'_>,
    experiment: &mut Experiment,
) -> Result<()> {
    unwind_guard(injector.setup(ctx)).await?;
    let injected = unwind_guard(injector.inject(ctx, experiment)).await;
    let torn_down = unwind_guard(injector.teardown(ctx)).await;
    if let (Err(_), Err(e)) = (&injected, &torn_down) {
        warn!(error = %e, "teardown failed after a failed injection");
    }
    injected.and(torn_down)
}

/// Turn a panic inside one injector phase into an error.
async fn unwind_guard(phase: impl Future<Output = Result<()>>) -> Result<()> {
    AssertUnwindSafe(phase)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(panicked(&*payload)))
}

fn panicked(payload: &(dyn Any + Send)) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    Error::Other(format!("injector panicked: {message}"))
}
