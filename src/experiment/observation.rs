//! Observation - typed facts recorded during an experiment

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit attached to a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Milliseconds.
    Milliseconds,
    /// Percent (100 = 100%).
    Percent,
    /// Plain count.
    Count,
}

impl Unit {
    /// Short suffix used when rendering.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Percent => "%",
            Self::Count => "",
        }
    }
}

/// Observation recorded on an experiment.
///
/// Either a free-text note or a labelled numeric measurement. Scores and
/// assertions read measurements directly; text is only a rendering concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// Free-text note.
    Note {
        /// Note text
        text: String,
    },
    /// Labelled measurement.
    Measurement {
        /// Metric label (e.g. "degradation")
        label: String,
        /// Measured value
        value: f64,
        /// Unit of `value`
        unit: Unit,
    },
}

impl Observation {
    /// Create a note.
    #[must_use]
    pub fn note(text: impl Into<String>) -> Self {
        Self::Note { text: text.into() }
    }

    /// Create a measurement.
    #[must_use]
    pub fn measurement(label: impl Into<String>, value: f64, unit: Unit) -> Self {
        Self::Measurement {
            label: label.into(),
            value,
            unit,
        }
    }

    /// Shorthand for a millisecond measurement.
    #[must_use]
    pub fn millis(label: impl Into<String>, value: f64) -> Self {
        Self::measurement(label, value, Unit::Milliseconds)
    }

    /// Shorthand for a count measurement.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn count(label: impl Into<String>, value: usize) -> Self {
        Self::measurement(label, value as f64, Unit::Count)
    }

    /// Label of a measurement, `None` for notes.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Measurement { label, .. } => Some(label),
            Self::Note { .. } => None,
        }
    }

    /// Value of a measurement, `None` for notes.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Measurement { value, .. } => Some(*value),
            Self::Note { .. } => None,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note { text } => f.write_str(text),
            Self::Measurement {
                label,
                value,
                unit: Unit::Count,
            } => write!(f, "{label}: {value:.0}"),
            Self::Measurement {
                label,
                value,
                unit: Unit::Percent,
            } => write!(f, "{label}: {value:.1}%"),
            Self::Measurement { label, value, unit } => {
                write!(f, "{label}: {value:.2}{}", unit.suffix())
            }
        }
    }
}

/// Find the first measurement with `label` in a slice of observations.
#[must_use]
pub fn find_measurement(observations: &[Observation], label: &str) -> Option<f64> {
    observations
        .iter()
        .find(|o| o.label() == Some(label))
        .and_then(Observation::value)
}
