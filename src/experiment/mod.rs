//! Experiment Data Model
//!
//! ## Schema Overview
//!
//! ```text
//! BaselineMetrics (1, read-only)
//!
//! ExperimentRegistry (1) ──< Experiment (N) [execution order]
//!                                 │
//!                                 └──< Observation (N) [Note | Measurement]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use trueno_chaos::experiment::{BlastRadius, Experiment, ExperimentResult, Observation};
//!
//! let mut experiment = Experiment::new("High CPU Load", "Expensive reads", BlastRadius::Database);
//! experiment.start(Utc::now());
//! experiment.observe(Observation::millis("query_latency", 12.5));
//! experiment.finish(ExperimentResult::Completed, Utc::now());
//!
//! assert!(experiment.is_completed());
//! ```

mod baseline;
mod experiment_record;
mod observation;
mod registry;

pub use baseline::BaselineMetrics;
pub use experiment_record::{BlastRadius, Experiment, ExperimentBuilder, ExperimentResult};
pub use observation::{find_measurement, Observation, Unit};
pub use registry::ExperimentRegistry;
