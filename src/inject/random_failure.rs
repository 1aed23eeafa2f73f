//! Random failures - a share of trials fail on purpose, the rest run a normal query

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{FaultInjector, InjectionContext};
use crate::experiment::{BlastRadius, Experiment, Observation};
use crate::{Error, Result};

/// Parameters for [`RandomFailureInjector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomFailureParams {
    /// Include the injector in the default registry
    pub enabled: bool,
    /// Number of operations
    pub trials: usize,
    /// Probability in `[0, 1]` that a trial fails on purpose
    pub failure_rate: f64,
}

impl Default for RandomFailureParams {
    fn default() -> Self {
        Self {
            enabled: true,
            trials: 10,
            failure_rate: 0.30,
        }
    }
}

impl RandomFailureParams {
    /// # Errors
    /// `Error::InvalidConfig` for zero trials or a rate outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(Error::InvalidConfig(
                "injectors.random_failure.trials must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(Error::InvalidConfig(format!(
                "injectors.random_failure.failure_rate must be within [0, 1], got {}",
                self.failure_rate
            )));
        }
        Ok(())
    }
}

/// Per-trial tallies. Every trial lands in exactly one of successes / failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialTally {
    /// Trials whose query succeeded
    pub successes: usize,
    /// Trials failed on purpose
    pub injected: usize,
    /// Trials whose query failed for real
    pub query_errors: usize,
}

impl TrialTally {
    /// All failed trials.
    #[must_use]
    pub const fn failures(&self) -> usize {
        self.injected + self.query_errors
    }
}

/// Runs `trials` operations, failing each with probability `failure_rate`.
#[derive(Debug, Clone, Default)]
pub struct RandomFailureInjector {
    params: RandomFailureParams,
}

impl RandomFailureInjector {
    /// Create the injector.
    #[must_use]
    pub const fn new(params: RandomFailureParams) -> Self {
        Self { params }
    }

    async fn trial(&self, ctx: &mut InjectionContext<'_>, trial: usize) -> Result<()> {
        if ctx.random.next_unit() < self.params.failure_rate {
            return Err(Error::InjectedFailure { trial });
        }
        ctx.execute(&ctx.workload.liveness_query).await.map(|_| ())
    }

    /// Run every trial and tally the outcomes.
    pub async fn run_trials(&self, ctx: &mut InjectionContext<'_>) -> TrialTally {
        let mut tally = TrialTally::default();
        for trial in 0..self.params.trials {
            match self.trial(ctx, trial).await {
                Ok(()) => tally.successes += 1,
                Err(e) if e.is_injected() => tally.injected += 1,
                Err(e) => {
                    debug!(trial, error = %e, "trial query failed");
                    tally.query_errors += 1;
                }
            }
        }
        tally
    }
}

#[async_trait]
impl FaultInjector for RandomFailureInjector {
    fn name(&self) -> &str {
        "Random Transaction Failures"
    }

    fn description(&self) -> &str {
        "Test application error handling"
    }

    fn blast_radius(&self) -> BlastRadius {
        BlastRadius::Transactions
    }

    async fn inject(&self, ctx: &mut InjectionContext<'_>, experiment: &mut Experiment) -> Result<()> {
        info!(
            trials = self.params.trials,
            failure_rate = self.params.failure_rate,
            "Injecting random failures..."
        );
        let tally = self.run_trials(ctx).await;

        experiment.observe(Observation::note(format!(
            "Success: {}, Failures: {}",
            tally.successes,
            tally.failures()
        )));
        experiment.observe(Observation::count("successes", tally.successes));
        experiment.observe(Observation::count("failures", tally.failures()));
        experiment.observe(Observation::count("injected_failures", tally.injected));
        experiment.observe(Observation::count("query_errors", tally.query_errors));
        Ok(())
    }
}
