//! Experiment - one fault injection and everything observed while it ran

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Observation;

/// Declared scope of impact of a fault injector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastRadius {
    /// Whole database process (CPU, memory).
    Database,
    /// Connection pool / session slots.
    ConnectionPool,
    /// Latency of individual queries.
    QueryPerformance,
    /// Individual transactions.
    Transactions,
    /// Extension point for custom injectors.
    Custom(String),
}

impl fmt::Display for BlastRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::ConnectionPool => f.write_str("connection_pool"),
            Self::QueryPerformance => f.write_str("query_performance"),
            Self::Transactions => f.write_str("transactions"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Outcome of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentResult {
    /// Not finished yet.
    Pending,
    /// Fault injected and observed without the harness failing.
    Completed,
    /// The injector raised an error.
    Failed,
}

impl ExperimentResult {
    /// Whether this is a final state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ExperimentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Completed => f.write_str("completed"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// A chaos experiment record.
///
/// Lifecycle: created `Pending`, stamped with a start time, then finished exactly
/// once with `Completed` or `Failed`. Observations are appended in order.
///
/// Deserialization checks the same lifecycle: a terminal result needs both
/// timestamps, a pending one has no end time, and the end never precedes the start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ExperimentRecord")]
pub struct Experiment {
    name: String,
    description: String,
    blast_radius: BlastRadius,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    result: ExperimentResult,
    observations: Vec<Observation>,
}

/// Wire form of [`Experiment`], validated on the way in.
#[derive(Deserialize)]
struct ExperimentRecord {
    name: String,
    description: String,
    blast_radius: BlastRadius,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    result: ExperimentResult,
    observations: Vec<Observation>,
}

impl TryFrom<ExperimentRecord> for Experiment {
    type Error = String;

    fn try_from(record: ExperimentRecord) -> Result<Self, Self::Error> {
        match (record.result.is_terminal(), record.start_time, record.end_time) {
            (true, Some(start), Some(end)) if end < start => {
                return Err(format!(
                    "experiment '{}' ends ({end}) before it starts ({start})",
                    record.name
                ));
            }
            (true, Some(_), Some(_)) | (false, _, None) => {}
            (true, _, _) => {
                return Err(format!(
                    "experiment '{}' is {} but lacks a start or end time",
                    record.name, record.result
                ));
            }
            (false, _, Some(_)) => {
                return Err(format!(
                    "experiment '{}' is pending but has an end time",
                    record.name
                ));
            }
        }
        Ok(Self {
            name: record.name,
            description: record.description,
            blast_radius: record.blast_radius,
            start_time: record.start_time,
            end_time: record.end_time,
            result: record.result,
            observations: record.observations,
        })
    }
}

impl Experiment {
    /// Create a pending experiment.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        blast_radius: BlastRadius,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            blast_radius,
            start_time: None,
            end_time: None,
            result: ExperimentResult::Pending,
            observations: Vec::new(),
        }
    }

    /// Create a builder for an experiment with optional fields.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(name)
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the blast radius.
    #[must_use]
    pub const fn blast_radius(&self) -> &BlastRadius {
        &self.blast_radius
    }

    /// Get the start timestamp, if started.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Get the end timestamp, if finished.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Get the current result.
    #[must_use]
    pub const fn result(&self) -> ExperimentResult {
        self.result
    }

    /// Get the observations in recording order.
    #[must_use]
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Duration between start and end, if both are set.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.end_time? - self.start_time?)
    }

    /// Whether the experiment reached `Completed`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.result == ExperimentResult::Completed
    }

    /// Stamp the start time. Has no effect once started or finished.
    pub fn start(&mut self, at: DateTime<Utc>) {
        if self.start_time.is_none() && !self.result.is_terminal() {
            self.start_time = Some(at);
        }
    }

    /// Append an observation.
    pub fn observe(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    /// Move to a terminal result.
    ///
    /// Returns `false` (and changes nothing) if the experiment already finished
    /// or `result` is `Pending`. The end time is clamped so it never precedes the
    /// start time, even if the wall clock stepped backwards.
    pub fn finish(&mut self, result: ExperimentResult, at: DateTime<Utc>) -> bool {
        if self.result.is_terminal() || !result.is_terminal() {
            return false;
        }
        let start = *self.start_time.get_or_insert(at);
        self.end_time = Some(at.max(start));
        self.result = result;
        true
    }
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    name: String,
    description: String,
    blast_radius: BlastRadius,
    observations: Vec<Observation>,
}

impl ExperimentBuilder {
    /// Create a new builder with the required name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            blast_radius: BlastRadius::Database,
            observations: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the blast radius.
    #[must_use]
    pub fn blast_radius(mut self, blast_radius: BlastRadius) -> Self {
        self.blast_radius = blast_radius;
        self
    }

    /// Pre-seed an observation.
    #[must_use]
    pub fn observation(mut self, observation: Observation) -> Self {
        self.observations.push(observation);
        self
    }

    /// Build the pending `Experiment`.
    #[must_use]
    pub fn build(self) -> Experiment {
        Experiment {
            name: self.name,
            description: self.description,
            blast_radius: self.blast_radius,
            start_time: None,
            end_time: None,
            result: ExperimentResult::Pending,
            observations: self.observations,
        }
    }
}
