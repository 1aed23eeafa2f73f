//! Baseline Collector
//!
//! Takes one consistent reference snapshot before any fault is injected: one
//! timed read-only query plus one pool-statistics read. A partial baseline would
//! silently invalidate every degradation comparison downstream, so any failure
//! is returned as-is instead of being papered over.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::adapter::{execute_bounded, pool_stats_bounded, Session, TargetAdapter};
use crate::clock::{as_millis_f64, Clock, SystemClock};
use crate::experiment::BaselineMetrics;
use crate::workload::Workload;
use crate::Result;

/// Captures [`BaselineMetrics`] through an adapter.
pub struct BaselineCollector<'a> {
    adapter: &'a dyn TargetAdapter,
    reference_query: String,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl<'a> BaselineCollector<'a> {
    /// Collector timing `workload`'s reference query.
    #[must_use]
    pub fn new(adapter: &'a dyn TargetAdapter, workload: &Workload) -> Self {
        Self {
            adapter,
            reference_query: workload.reference_query(),
            timeout: Duration::from_secs(30),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the deadline of each call.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the clock used for `captured_at`.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Take the snapshot.
    ///
    /// # Errors
    /// The reference query's or pool-stats read's error (`Query`, `Timeout`, ...).
    pub async fn capture(&self, session: &Session) -> Result<BaselineMetrics> {
        info!("Capturing baseline metrics...");

        let start = Instant::now();
        execute_bounded(self.adapter, session, &self.reference_query, self.timeout).await?;
        let latency_ms = as_millis_f64(start.elapsed());

        let stats = pool_stats_bounded(self.adapter, session, self.timeout).await?;

        let baseline = BaselineMetrics::new(latency_ms, stats.active_connections, self.clock.now());
        info!(
            latency_ms = format_args!("{latency_ms:.2}"),
            connections = stats.active_connections,
            "baseline captured"
        );
        Ok(baseline)
    }
}

impl std::fmt::Debug for BaselineCollector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaselineCollector")
            .field("reference_query", &self.reference_query)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemoryTarget, TargetAdapter, TargetConfig};
    use crate::clock::ManualClock;
    use crate::Error;

    #[tokio::test(start_paused = true)]
    async fn test_capture_measures_reference_latency() {
        let target = MemoryTarget::new();
        let workload = Workload::default();
        let session = target
            .connect(&TargetConfig::default(), Duration::from_secs(1))
            .await
            .unwrap();
        for stmt in workload.provisioning_statements() {
            target.execute(&session, &stmt, Duration::from_secs(1)).await.unwrap();
        }
        target.set_query_latency(Duration::from_millis(5));

        let clock = Arc::new(ManualClock::default());
        let baseline = BaselineCollector::new(&target, &workload)
            .clock(clock.clone())
            .capture(&session)
            .await
            .unwrap();

        assert!((baseline.query_latency_ms() - 5.0).abs() < 1e-6);
        assert_eq!(baseline.active_connections(), 1);
        assert_eq!(baseline.captured_at(), clock.now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_fails_loudly_without_fixture() {
        let target = MemoryTarget::new();
        let session = target
            .connect(&TargetConfig::default(), Duration::from_secs(1))
            .await
            .unwrap();

        let err = BaselineCollector::new(&target, &Workload::default())
            .capture(&session)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }
}
