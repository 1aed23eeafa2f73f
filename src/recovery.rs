//! Recovery Prober
//!
//! After the chaos sequence, poll the target with a trivial liveness query until
//! it answers or the attempt budget runs out. Never failing is a result too:
//! it is reported as `attempts == max_attempts` with `recovered == false`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adapter::{execute_bounded, Session, TargetAdapter};
use crate::clock::as_millis_f64;
use crate::{Error, Result};

/// Attempt budget and pacing of the prober.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Failed probes tolerated before giving up
    pub max_attempts: u32,
    /// Pause after each failed probe
    pub backoff_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_ms: 500,
        }
    }
}

impl RecoveryConfig {
    /// Pause after a failed probe.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// # Errors
    /// `Error::InvalidConfig` for a zero attempt budget.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "recovery.max_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the prober saw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    /// Wall-clock time spent probing
    pub elapsed_ms: f64,
    /// Failed probes before success (or the whole budget)
    pub attempts: u32,
    /// Whether a probe eventually succeeded
    pub recovered: bool,
}

/// Polls a session with a liveness query.
pub struct RecoveryProber<'a> {
    adapter: &'a dyn TargetAdapter,
    liveness_query: String,
    probe_timeout: Duration,
}

impl<'a> RecoveryProber<'a> {
    /// Prober issuing `liveness_query`, each probe bounded by `probe_timeout`.
    #[must_use]
    pub fn new(
        adapter: &'a dyn TargetAdapter,
        liveness_query: impl Into<String>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            adapter,
            liveness_query: liveness_query.into(),
            probe_timeout,
        }
    }

    /// Probe until the first success or `max_attempts` failures.
    ///
    /// Every failed attempt is followed by `backoff`, the last one included.
    pub async fn probe(&self, session: &Session, max_attempts: u32, backoff: Duration) -> RecoveryOutcome {
        info!("Testing recovery time...");

        let start = Instant::now();
        let mut attempts = 0;
        let mut recovered = false;

        while attempts < max_attempts {
            match execute_bounded(self.adapter, session, &self.liveness_query, self.probe_timeout).await {
                Ok(_) => {
                    recovered = true;
                    break;
                }
                Err(e) => {
                    attempts += 1;
                    debug!(attempt = attempts, error = %e, "liveness probe failed");
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        let outcome = RecoveryOutcome {
            elapsed_ms: as_millis_f64(start.elapsed()),
            attempts,
            recovered,
        };
        if recovered {
            info!(
                recovery_ms = format_args!("{:.2}", outcome.elapsed_ms),
                attempts, "target recovered"
            );
        } else {
            warn!(attempts, "target did not recover within the attempt budget");
        }
        outcome
    }
}

impl std::fmt::Debug for RecoveryProber<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryProber")
            .field("liveness_query", &self.liveness_query)
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemoryTarget, TargetConfig};

    const T: Duration = Duration::from_secs(1);

    async fn session(target: &MemoryTarget) -> Session {
        target.connect(&TargetConfig::default(), T).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_counts_no_attempts() {
        let target = MemoryTarget::new();
        let s = session(&target).await;

        let outcome = RecoveryProber::new(&target, "SELECT 1", T)
            .probe(&s, 10, Duration::from_millis(500))
            .await;
        assert!(outcome.recovered);
        assert_eq!(outcome.attempts, 0);
        assert!(outcome.elapsed_ms.abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_failures_and_backs_off() {
        let target = MemoryTarget::new();
        let s = session(&target).await;
        target.fail_next_queries(3);

        let outcome = RecoveryProber::new(&target, "SELECT 1", T)
            .probe(&s, 10, Duration::from_millis(500))
            .await;
        assert!(outcome.recovered);
        assert_eq!(outcome.attempts, 3);
        assert!((outcome.elapsed_ms - 1500.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_backs_off_after_every_failure() {
        let target = MemoryTarget::new();
        let s = session(&target).await;
        target.fail_next_queries(usize::MAX);

        let outcome = RecoveryProber::new(&target, "SELECT 1", T)
            .probe(&s, 10, Duration::from_millis(500))
            .await;
        assert!(!outcome.recovered);
        assert_eq!(outcome.attempts, 10);
        assert!((outcome.elapsed_ms - 5000.0).abs() < 1e-6, "elapsed {}", outcome.elapsed_ms);
    }
}
