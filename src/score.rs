//! Resilience Scorer
//!
//! Pure mapping from an experiment sequence to a 0-100 score and a qualitative
//! tier. The score is the share of experiments that reached `Completed`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::experiment::{Experiment, ExperimentResult};
use crate::recovery::RecoveryOutcome;

/// Qualitative resilience assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// score < 40
    NeedsImprovement,
    /// 40 <= score < 60
    Fair,
    /// 60 <= score < 80
    Good,
    /// score >= 80
    Excellent,
}

impl Tier {
    /// Tier for a score, thresholds checked top-down.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Excellent
        } else if score >= 60.0 {
            Self::Good
        } else if score >= 40.0 {
            Self::Fair
        } else {
            Self::NeedsImprovement
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::NeedsImprovement => "NEEDS IMPROVEMENT",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `100 × completed / total`, or `0` for an empty sequence.
///
/// ```rust
/// use trueno_chaos::score::score;
///
/// assert_eq!(score(&[]), 0.0);
/// ```
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn score(experiments: &[Experiment]) -> f64 {
    if experiments.is_empty() {
        return 0.0;
    }
    let completed = experiments.iter().filter(|e| e.is_completed()).count();
    100.0 * completed as f64 / experiments.len() as f64
}

/// Score and tier in one call.
#[must_use]
pub fn assess(experiments: &[Experiment]) -> (f64, Tier) {
    let score = score(experiments);
    (score, Tier::from_score(score))
}

/// Scored outcome of a suite run, in execution order.
///
/// Score and tier are always derived from the experiments; deserializing
/// recomputes them instead of trusting the stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReportRecord")]
pub struct ResilienceReport {
    experiments: Vec<Experiment>,
    score: f64,
    tier: Tier,
    recovery: RecoveryOutcome,
}

#[derive(Deserialize)]
struct ReportRecord {
    experiments: Vec<Experiment>,
    recovery: RecoveryOutcome,
}

impl From<ReportRecord> for ResilienceReport {
    fn from(record: ReportRecord) -> Self {
        Self::new(record.experiments, record.recovery)
    }
}

impl ResilienceReport {
    /// Score `experiments` and attach the recovery outcome.
    #[must_use]
    pub fn new(experiments: Vec<Experiment>, recovery: RecoveryOutcome) -> Self {
        let (score, tier) = assess(&experiments);
        Self {
            experiments,
            score,
            tier,
            recovery,
        }
    }

    /// Experiments in execution order.
    #[must_use]
    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    /// Score in `[0, 100]`.
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Tier of the score.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.tier
    }

    /// Recovery outcome.
    #[must_use]
    pub const fn recovery(&self) -> &RecoveryOutcome {
        &self.recovery
    }

    /// Number of completed experiments.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count_with(ExperimentResult::Completed)
    }

    /// Number of failed experiments.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count_with(ExperimentResult::Failed)
    }

    fn count_with(&self, result: ExperimentResult) -> usize {
        self.experiments
            .iter()
            .filter(|e| e.result() == result)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::BlastRadius;
    use chrono::Utc;

    fn run(completed: usize, failed: usize) -> Vec<Experiment> {
        let results = std::iter::repeat(ExperimentResult::Completed)
            .take(completed)
            .chain(std::iter::repeat(ExperimentResult::Failed).take(failed));
        results
            .enumerate()
            .map(|(i, r)| {
                let mut e = Experiment::new(format!("e{i}"), "", BlastRadius::Database);
                e.start(Utc::now());
                e.finish(r, Utc::now());
                e
            })
            .collect()
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(assess(&[]), (0.0, Tier::NeedsImprovement));
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(assess(&run(3, 2)), (60.0, Tier::Good));
        assert_eq!(assess(&run(2, 3)), (40.0, Tier::Fair));
        assert_eq!(assess(&run(4, 1)), (80.0, Tier::Excellent));
        assert_eq!(assess(&run(1, 4)), (20.0, Tier::NeedsImprovement));
        assert_eq!(assess(&run(0, 4)), (0.0, Tier::NeedsImprovement));
    }

    #[test]
    fn test_pending_counts_against_score() {
        let mut experiments = run(1, 0);
        experiments.push(Experiment::new("pending", "", BlastRadius::Database));
        assert!((score(&experiments) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_report_counts() {
        let recovery = RecoveryOutcome {
            elapsed_ms: 1.0,
            attempts: 0,
            recovered: true,
        };
        let report = ResilienceReport::new(run(3, 1), recovery);
        assert_eq!(report.completed_count(), 3);
        assert_eq!(report.failed_count(), 1);
        assert!((report.score() - 75.0).abs() < f64::EPSILON);
        assert_eq!(report.tier(), Tier::Good);
        assert_eq!(report.tier().to_string(), "GOOD");
    }

    #[test]
    fn test_deserialize_recomputes_score_and_tier() {
        let recovery = RecoveryOutcome {
            elapsed_ms: 0.0,
            attempts: 0,
            recovered: true,
        };
        let report = ResilienceReport::new(run(1, 3), recovery);
        let mut value = serde_json::to_value(&report).unwrap();
        value["score"] = serde_json::json!(100.0);
        value["tier"] = serde_json::json!("EXCELLENT");

        let back: ResilienceReport = serde_json::from_value(value).unwrap();
        assert!((back.score() - 25.0).abs() < f64::EPSILON);
        assert_eq!(back.tier(), Tier::NeedsImprovement);
        assert_eq!(back, report);
    }
}
