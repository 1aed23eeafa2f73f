//! Target Adapter - the narrow interface between the harness and the system under test
//!
//! The harness never speaks a datastore wire protocol. It hands SQL text to a
//! [`TargetAdapter`] and gets rows, pool statistics or a typed error back.
//!
//! Every call carries a deadline. [`connect_bounded`], [`execute_bounded`],
//! [`pool_stats_bounded`] and [`close_bounded`] enforce that deadline with `tokio::time::timeout`
//! even if an adapter ignores the one it is given.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use trueno_chaos::adapter::{execute_bounded, MemoryTarget, TargetAdapter, TargetConfig};
//!
//! # async fn example() -> trueno_chaos::Result<()> {
//! let target = MemoryTarget::new();
//! let session = target.connect(&TargetConfig::default(), Duration::from_secs(1)).await?;
//! let rows = execute_bounded(&target, &session, "SELECT 1", Duration::from_secs(1)).await?;
//! assert_eq!(rows.len(), 1);
//! target.close(session).await?;
//! # Ok(())
//! # }
//! ```

mod memory;
pub mod sql;

pub use memory::{MemoryTarget, MemoryTargetSettings};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{Error, Result};

/// Connection parameters for the system under test.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Host name
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Database name
    pub database: String,
    /// User name
    pub user: String,
    /// Password
    pub password: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5460,
            database: "chaos_db".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque handle to one open session on the target.
///
/// Not `Clone`: closing consumes the handle, so a session is released at most once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Session {
    id: u64,
}

impl Session {
    /// Wrap an adapter-assigned session id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self { id }
    }

    /// Adapter-assigned session id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

/// Result rows of a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rows {
    rows: Vec<Vec<serde_json::Value>>,
}

impl Rows {
    /// Wrap raw rows.
    #[must_use]
    pub fn new(rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { rows }
    }

    /// Single-row, single-column result.
    #[must_use]
    pub fn scalar(value: impl Into<serde_json::Value>) -> Self {
        Self {
            rows: vec![vec![value.into()]],
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row.
    #[must_use]
    pub fn first_value(&self) -> Option<&serde_json::Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Connection statistics reported by the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Sessions currently open on the target.
    pub active_connections: u64,
}

/// Contract every system under test is driven through.
///
/// Implementations may hold real external connections; callers release every
/// session they open with [`TargetAdapter::close`].
#[async_trait]
pub trait TargetAdapter: Send + Sync {
    /// Open a new session.
    ///
    /// # Errors
    /// `Error::Connection` if the target refuses, `Error::Timeout` past `timeout`.
    async fn connect(&self, config: &TargetConfig, timeout: Duration) -> Result<Session>;

    /// Run one statement on `session`.
    ///
    /// # Errors
    /// `Error::Query` if the target rejects it, `Error::Timeout` past `timeout`.
    async fn execute(&self, session: &Session, query: &str, timeout: Duration) -> Result<Rows>;

    /// Current connection statistics.
    async fn pool_stats(&self, session: &Session) -> Result<PoolStats>;

    /// Release a session.
    async fn close(&self, session: Session) -> Result<()>;
}

/// Connect with the deadline enforced on the caller side.
///
/// # Errors
/// Propagates adapter errors; `Error::Timeout` if `timeout` elapses first.
pub async fn connect_bounded(
    adapter: &dyn TargetAdapter,
    config: &TargetConfig,
    timeout: Duration,
) -> Result<Session> {
    tokio::time::timeout(timeout, adapter.connect(config, timeout))
        .await
        .map_err(|_| Error::timeout("connect", timeout))?
}

/// Execute with the deadline enforced on the caller side.
///
/// # Errors
/// Propagates adapter errors; `Error::Timeout` if `timeout` elapses first.
pub async fn execute_bounded(
    adapter: &dyn TargetAdapter,
    session: &Session,
    query: &str,
    timeout: Duration,
) -> Result<Rows> {
    tokio::time::timeout(timeout, adapter.execute(session, query, timeout))
        .await
        .map_err(|_| Error::timeout("execute", timeout))?
}

/// Read pool statistics with a deadline.
///
/// # Errors
/// Propagates adapter errors; `Error::Timeout` if `timeout` elapses first.
pub async fn pool_stats_bounded(
    adapter: &dyn TargetAdapter,
    session: &Session,
    timeout: Duration,
) -> Result<PoolStats> {
    tokio::time::timeout(timeout, adapter.pool_stats(session))
        .await
        .map_err(|_| Error::timeout("pool_stats", timeout))?
}

/// Release a session with a deadline.
///
/// The handle is consumed either way; a close that times out is abandoned.
///
/// # Errors
/// Propagates adapter errors; `Error::Timeout` if `timeout` elapses first.
pub async fn close_bounded(
    adapter: &dyn TargetAdapter,
    session: Session,
    timeout: Duration,
) -> Result<()> {
    tokio::time::timeout(timeout, adapter.close(session))
        .await
        .map_err(|_| Error::timeout("close", timeout))?
}
