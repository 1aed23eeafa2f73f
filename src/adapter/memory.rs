//! In-memory target implementation using `DashMap`.
//!
//! Simulates a small SQL datastore in-process: sessions and tables live in
//! lock-free maps, query cost is simulated with tokio timers, and a connection
//! capacity mimics a server's `max_connections`. Data is lost when dropped.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::sql::{classify, TargetStatement};
use super::{PoolStats, Rows, Session, TargetAdapter, TargetConfig};
use crate::{Error, Result};

/// Tunables for [`MemoryTarget`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTargetSettings {
    /// Maximum concurrently open sessions (`None` = unlimited).
    pub max_connections: Option<usize>,
    /// Time to establish a session.
    pub connect_latency: Duration,
    /// Base latency of any table read.
    pub query_latency: Duration,
    /// Extra cost per 1000 rows produced by a multi-table read.
    pub join_cost_per_krow: Duration,
}

impl Default for MemoryTargetSettings {
    fn default() -> Self {
        Self {
            max_connections: Some(100),
            connect_latency: Duration::from_millis(1),
            query_latency: Duration::from_millis(2),
            join_cost_per_krow: Duration::from_micros(50),
        }
    }
}

/// In-process datastore implementing [`TargetAdapter`].
///
/// Besides the adapter contract it exposes fault knobs (latency, reachability,
/// failing queries) so experiments and tests can shape the target's behaviour.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use trueno_chaos::adapter::{MemoryTarget, TargetAdapter, TargetConfig};
///
/// # async fn example() -> trueno_chaos::Result<()> {
/// let target = MemoryTarget::new();
/// let session = target.connect(&TargetConfig::default(), Duration::from_secs(1)).await?;
/// assert_eq!(target.active_sessions(), 1);
/// target.close(session).await?;
/// assert_eq!(target.active_sessions(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryTarget {
    settings: MemoryTargetSettings,
    sessions: DashMap<u64, String>,
    tables: DashMap<String, u64>,
    open: AtomicUsize,
    next_session: AtomicU64,
    query_latency_us: AtomicU64,
    unreachable: AtomicBool,
    failing_queries: AtomicUsize,
}

impl MemoryTarget {
    /// Create a target with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(MemoryTargetSettings::default())
    }

    /// Create a target with explicit settings.
    #[must_use]
    pub fn with_settings(settings: MemoryTargetSettings) -> Self {
        let query_latency_us = duration_to_micros(settings.query_latency);
        Self {
            settings,
            sessions: DashMap::new(),
            tables: DashMap::new(),
            open: AtomicUsize::new(0),
            next_session: AtomicU64::new(1),
            query_latency_us: AtomicU64::new(query_latency_us),
            unreachable: AtomicBool::new(false),
            failing_queries: AtomicUsize::new(0),
        }
    }

    /// Settings this target was built with.
    #[must_use]
    pub const fn settings(&self) -> &MemoryTargetSettings {
        &self.settings
    }

    /// Number of currently open sessions.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Row count of `table`, if it exists.
    #[must_use]
    pub fn table_rows(&self, table: &str) -> Option<u64> {
        self.tables.get(table).map(|rows| *rows.value())
    }

    /// Change the base read latency at runtime.
    pub fn set_query_latency(&self, latency: Duration) {
        self.query_latency_us
            .store(duration_to_micros(latency), Ordering::SeqCst);
    }

    /// Current base read latency.
    #[must_use]
    pub fn query_latency(&self) -> Duration {
        Duration::from_micros(self.query_latency_us.load(Ordering::SeqCst))
    }

    /// Refuse (or accept again) new sessions.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make the next `count` statements fail with a query error.
    pub fn fail_next_queries(&self, count: usize) {
        self.failing_queries.store(count, Ordering::SeqCst);
    }

    fn reserve_slot(&self) -> Result<()> {
        let max = self.settings.max_connections.unwrap_or(usize::MAX);
        self.open
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |open| {
                (open < max).then_some(open + 1)
            })
            .map(|_| ())
            .map_err(|open| {
                Error::Connection(format!(
                    "too many clients already ({open}/{max} connections in use)"
                ))
            })
    }

    fn ensure_session(&self, session: &Session) -> Result<()> {
        if self.sessions.contains_key(&session.id()) {
            Ok(())
        } else {
            Err(Error::Query(format!("session {} is closed", session.id())))
        }
    }

    fn take_failure(&self) -> bool {
        self.failing_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn rows_of(&self, table: &str) -> Result<u64> {
        self.table_rows(table)
            .ok_or_else(|| Error::Query(format!("relation \"{table}\" does not exist")))
    }

    async fn run(&self, statement: TargetStatement) -> Result<Rows> {
        match statement {
            TargetStatement::Literal(value) => Ok(Rows::scalar(value)),
            TargetStatement::Count { table } => {
                let rows = self.rows_of(&table)?;
                tokio::time::sleep(self.query_latency()).await;
                Ok(Rows::scalar(rows))
            }
            TargetStatement::CrossJoin { tables, limit } => {
                let product = tables.iter().try_fold(1_u64, |acc, table| {
                    self.rows_of(table).map(|rows| acc.saturating_mul(rows))
                })?;
                let produced = limit.map_or(product, |limit| limit.min(product));
                let join_cost = self
                    .settings
                    .join_cost_per_krow
                    .saturating_mul(u32::try_from(produced / 1000).unwrap_or(u32::MAX));
                tokio::time::sleep(self.query_latency().saturating_add(join_cost)).await;
                Ok(Rows::scalar(produced))
            }
            TargetStatement::Scan { table, limit } => {
                let rows = self.rows_of(&table)?;
                let produced = limit.map_or(rows, |limit| limit.min(rows));
                tokio::time::sleep(self.query_latency()).await;
                Ok(Rows::new(
                    (1..=produced).map(|id| vec![serde_json::Value::from(id)]).collect(),
                ))
            }
            TargetStatement::Sleep { duration } => {
                tokio::time::sleep(duration).await;
                Ok(Rows::scalar(serde_json::Value::Null))
            }
            TargetStatement::CreateTable {
                name,
                if_not_exists,
            } => {
                if self.tables.contains_key(&name) && !if_not_exists {
                    return Err(Error::Query(format!("relation \"{name}\" already exists")));
                }
                self.tables.entry(name).or_insert(0);
                Ok(Rows::default())
            }
            TargetStatement::Insert { table, rows } => {
                let mut entry = self
                    .tables
                    .get_mut(&table)
                    .ok_or_else(|| Error::Query(format!("relation \"{table}\" does not exist")))?;
                *entry = entry.saturating_add(rows);
                Ok(Rows::default())
            }
        }
    }
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetAdapter for MemoryTarget {
    async fn connect(&self, config: &TargetConfig, timeout: Duration) -> Result<Session> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::Connection(format!(
                "could not connect to {}:{}: connection refused",
                config.host, config.port
            )));
        }

        tokio::time::timeout(timeout, tokio::time::sleep(self.settings.connect_latency))
            .await
            .map_err(|_| Error::timeout("connect", timeout))?;

        self.reserve_slot()?;
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        self.sessions.insert(id, config.database.clone());
        debug!(session = id, database = %config.database, "memory target: session opened");
        Ok(Session::new(id))
    }

    async fn execute(&self, session: &Session, query: &str, timeout: Duration) -> Result<Rows> {
        self.ensure_session(session)?;
        if self.take_failure() {
            return Err(Error::Query("server is not accepting queries".to_string()));
        }
        let statement = classify(query).map_err(|e| Error::Query(e.to_string()))?;
        tokio::time::timeout(timeout, self.run(statement))
            .await
            .map_err(|_| Error::timeout("execute", timeout))?
    }

    async fn pool_stats(&self, session: &Session) -> Result<PoolStats> {
        self.ensure_session(session)?;
        Ok(PoolStats {
            active_connections: self.active_sessions() as u64,
        })
    }

    async fn close(&self, session: Session) -> Result<()> {
        if self.sessions.remove(&session.id()).is_some() {
            self.open.fetch_sub(1, Ordering::SeqCst);
            debug!(session = session.id(), "memory target: session closed");
        }
        Ok(())
    }
}

fn duration_to_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
