//! Slow query - stall the target, then re-measure the reference query against the baseline

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use super::{FaultInjector, InjectionContext};
use crate::experiment::{BlastRadius, Experiment, Observation, Unit};
use crate::Result;

/// Parameters for [`SlowQueryInjector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowQueryParams {
    /// Include the injector in the default registry
    pub enabled: bool,
    /// Artificial delay issued before re-measuring
    pub delay_ms: u64,
}

impl Default for SlowQueryParams {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: 2_000,
        }
    }
}

impl SlowQueryParams {
    /// Artificial delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Relative slowdown of `measured_ms` over `baseline_ms`, in percent.
///
/// `None` when the baseline is zero or not finite, where the ratio is undefined.
///
/// ```rust
/// use trueno_chaos::inject::degradation_percent;
///
/// assert_eq!(degradation_percent(5.0, 500.0), Some(9900.0));
/// assert_eq!(degradation_percent(0.0, 10.0), None);
/// ```
#[must_use]
pub fn degradation_percent(baseline_ms: f64, measured_ms: f64) -> Option<f64> {
    (baseline_ms.is_finite() && baseline_ms > 0.0)
        .then(|| (measured_ms - baseline_ms) / baseline_ms * 100.0)
}

/// Issues one delaying statement, then records latency degradation against the baseline.
#[derive(Debug, Clone, Default)]
pub struct SlowQueryInjector {
    params: SlowQueryParams,
}

impl SlowQueryInjector {
    /// Create the injector.
    #[must_use]
    pub const fn new(params: SlowQueryParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl FaultInjector for SlowQueryInjector {
    fn name(&self) -> &str {
        "Slow Query Injection"
    }

    fn description(&self) -> &str {
        "Simulate database performance degradation"
    }

    fn blast_radius(&self) -> BlastRadius {
        BlastRadius::QueryPerformance
    }

    async fn inject(&self, ctx: &mut InjectionContext<'_>, experiment: &mut Experiment) -> Result<()> {
        let baseline = ctx.require_baseline()?;

        info!(delay_ms = self.params.delay_ms, "Injecting slow queries...");
        let delay = self.params.delay();
        let delay_query = ctx.workload.delay_query(delay);
        ctx.execute_within(&delay_query, delay.saturating_add(ctx.timeouts.query()))
            .await?;

        let (_, latency_ms) = ctx.timed_execute(&ctx.workload.reference_query()).await?;
        let baseline_ms = baseline.query_latency_ms();

        experiment.observe(Observation::millis("query_latency_during_chaos", latency_ms));
        experiment.observe(Observation::millis("baseline_latency", baseline_ms));
        match degradation_percent(baseline_ms, latency_ms) {
            Some(degradation) => {
                experiment.observe(Observation::measurement(
                    "degradation",
                    degradation,
                    Unit::Percent,
                ));
            }
            None => experiment.observe(Observation::note(
                "Baseline latency is zero; degradation undefined",
            )),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradation_percent() {
        assert_eq!(degradation_percent(5.0, 500.0), Some(9900.0));
        assert_eq!(degradation_percent(10.0, 10.0), Some(0.0));
        assert_eq!(degradation_percent(10.0, 5.0), Some(-50.0));
        assert_eq!(degradation_percent(0.0, 5.0), None);
        assert_eq!(degradation_percent(f64::NAN, 5.0), None);
    }
}
