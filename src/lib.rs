//! # Trueno-Chaos: Chaos Engineering Harness for Stateful Backends
//!
//! **Version**: 0.1.0
//!
//! Trueno-Chaos injects controlled faults (CPU pressure, connection saturation,
//! slow queries, random transaction failures) into a datastore reached through a
//! narrow [`adapter::TargetAdapter`], compares what it sees against a baseline,
//! measures recovery and reduces the run to a resilience score.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Genchi Genbutsu**: every degradation is measured against a baseline taken on the same session
//! - **Jidoka**: setup failures stop the line; experiment failures are recorded, not escalated
//! - **Poka-Yoke**: sessions opened by an injector are released on every path
//! - **Heijunka**: experiments run strictly in sequence with isolation windows between them
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use trueno_chaos::adapter::MemoryTarget;
//! use trueno_chaos::config::SuiteConfig;
//! use trueno_chaos::suite::ChaosSuite;
//!
//! # async fn example() -> trueno_chaos::Result<()> {
//! let report = ChaosSuite::new(Arc::new(MemoryTarget::new()), SuiteConfig::default())
//!     .run()
//!     .await?;
//! println!("{}", trueno_chaos::report::render_text(&report));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod adapter;
pub mod baseline;
pub mod clock;
pub mod config;
pub mod error;
pub mod experiment;
pub mod inject;
pub mod recovery;
pub mod report;
pub mod runner;
pub mod score;
pub mod suite;
pub mod workload;

pub use error::{Error, Result};
pub use score::{ResilienceReport, Tier};
pub use suite::{ChaosSuite, SuiteReport};
