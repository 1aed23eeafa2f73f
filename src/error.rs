//! Error types for Trueno-Chaos
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Only setup-phase errors stop a suite. Everything raised while an injector runs
//! is downgraded to a failed experiment by the runner.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Chaos error types
#[derive(Error, Debug)]
pub enum Error {
    /// Target unreachable or refused a session (suite-fatal during setup)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Target rejected or failed a query
    #[error("Query failed: {0}")]
    Query(String),

    /// A bounded call exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation that timed out (connect, execute, ...)
        operation: String,
        /// Deadline that was exceeded
        timeout_ms: u64,
    },

    /// Failure deliberately triggered by a fault injector (counted, never escalated)
    #[error("Injected failure (trial {trial})")]
    InjectedFailure {
        /// Zero-based trial index
        trial: usize,
    },

    /// Degradation experiment ran without a baseline
    #[error("Baseline metrics not captured\nCapture a baseline before running degradation experiments")]
    MissingBaseline,

    /// Fixture provisioning or baseline capture failed (suite-fatal)
    #[error("Setup failed: {0}")]
    Setup(String),

    /// SQL could not be parsed or is outside the supported subset
    #[error("SQL parse error: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML config decoding error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a timeout error for `operation` with the given deadline.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether this error aborts a whole suite run.
    #[must_use]
    pub const fn is_suite_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Setup(_))
    }

    /// Whether this error was produced on purpose by an injector.
    #[must_use]
    pub const fn is_injected(&self) -> bool {
        matches!(self, Self::InjectedFailure { .. })
    }
}
