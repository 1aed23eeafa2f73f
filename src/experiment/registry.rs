//! Experiment Registry - append-only record of executed experiments
//!
//! Insertion order is execution order; reports and score recomputation rely on it.

use super::{Experiment, ExperimentResult};

/// Append-only, ordered store of finished experiments.
#[derive(Debug, Default, Clone)]
pub struct ExperimentRegistry {
    experiments: Vec<Experiment>,
}

impl ExperimentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Number of recorded experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Append a finished experiment.
    pub fn record(&mut self, experiment: Experiment) {
        self.experiments.push(experiment);
    }

    /// Read-only view in execution order.
    #[must_use]
    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    /// Look up an experiment by name (first match in execution order).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Experiment> {
        self.experiments.iter().find(|e| e.name() == name)
    }

    /// Count experiments with the given result.
    #[must_use]
    pub fn count_with(&self, result: ExperimentResult) -> usize {
        self.experiments
            .iter()
            .filter(|e| e.result() == result)
            .count()
    }

    /// Consume the registry, returning experiments in execution order.
    #[must_use]
    pub fn into_experiments(self) -> Vec<Experiment> {
        self.experiments
    }
}
