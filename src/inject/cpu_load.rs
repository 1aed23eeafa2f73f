//! CPU load - saturate the target with one computationally expensive read

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{FaultInjector, InjectionContext};
use crate::experiment::{BlastRadius, Experiment, Observation};
use crate::Result;

/// Parameters for [`CpuLoadInjector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuLoadParams {
    /// Include the injector in the default registry
    pub enabled: bool,
    /// Override of the workload's expensive query
    pub query: Option<String>,
}

impl Default for CpuLoadParams {
    fn default() -> Self {
        Self {
            enabled: true,
            query: None,
        }
    }
}

/// Issues one expensive read and records whether the target survived it.
#[derive(Debug, Clone, Default)]
pub struct CpuLoadInjector {
    params: CpuLoadParams,
}

impl CpuLoadInjector {
    /// Create the injector.
    #[must_use]
    pub const fn new(params: CpuLoadParams) -> Self {
        Self { params }
    }
}

#[async_trait]
impl FaultInjector for CpuLoadInjector {
    fn name(&self) -> &str {
        "High CPU Load"
    }

    fn description(&self) -> &str {
        "Simulate CPU saturation with expensive queries"
    }

    fn blast_radius(&self) -> BlastRadius {
        BlastRadius::Database
    }

    async fn inject(&self, ctx: &mut InjectionContext<'_>, experiment: &mut Experiment) -> Result<()> {
        let query = self
            .params
            .query
            .clone()
            .unwrap_or_else(|| ctx.workload.expensive_query());

        info!("Injecting CPU load...");
        let (_, latency_ms) = ctx.timed_execute(&query).await?;

        experiment.observe(Observation::note("CPU-intensive query executed"));
        experiment.observe(Observation::millis("query_latency", latency_ms));
        Ok(())
    }
}
