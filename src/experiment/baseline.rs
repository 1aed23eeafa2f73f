//! Baseline Metrics - reference snapshot taken before any fault is injected

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference metrics for degradation comparisons.
///
/// Captured once per suite run and only read afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineMetrics {
    query_latency_ms: f64,
    active_connections: u64,
    captured_at: DateTime<Utc>,
}

impl BaselineMetrics {
    /// Create a baseline. Negative or NaN latencies are clamped to zero.
    #[must_use]
    pub fn new(query_latency_ms: f64, active_connections: u64, captured_at: DateTime<Utc>) -> Self {
        Self {
            query_latency_ms: if query_latency_ms.is_nan() {
                0.0
            } else {
                query_latency_ms.max(0.0)
            },
            active_connections,
            captured_at,
        }
    }

    /// Latency of the reference query in milliseconds.
    #[must_use]
    pub const fn query_latency_ms(&self) -> f64 {
        self.query_latency_ms
    }

    /// Active connections on the target at capture time.
    #[must_use]
    pub const fn active_connections(&self) -> u64 {
        self.active_connections
    }

    /// Capture timestamp.
    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_clamps_negative_latency() {
        let b = BaselineMetrics::new(-3.0, 2, Utc::now());
        assert!(b.query_latency_ms().abs() < f64::EPSILON);
        assert_eq!(b.active_connections(), 2);

        let nan = BaselineMetrics::new(f64::NAN, 0, Utc::now());
        assert!(nan.query_latency_ms().abs() < f64::EPSILON);
    }
}
