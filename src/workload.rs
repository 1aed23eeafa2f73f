//! Workload - fixture table and the SQL statements the harness issues
//!
//! Statement text lives here so the injectors stay datastore-agnostic: a target
//! speaking a different dialect only needs a different [`Workload`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, Result};

/// Placeholder substituted in [`Workload::delay_template`].
pub const SECONDS_PLACEHOLDER: &str = "{seconds}";

/// SQL the harness runs against the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workload {
    /// Fixture table name
    pub table: String,
    /// Rows inserted into the fixture during provisioning
    pub rows: u64,
    /// Trivial query used for liveness checks
    pub liveness_query: String,
    /// Read-only query timed for the baseline; defaults to `SELECT COUNT(*) FROM <table>`
    pub reference_query: Option<String>,
    /// Computationally expensive read; defaults to a capped self cross join
    pub expensive_query: Option<String>,
    /// Artificial delay statement, `{seconds}` is replaced by the delay
    pub delay_template: String,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            table: "test_data".to_string(),
            rows: 1000,
            liveness_query: "SELECT 1".to_string(),
            reference_query: None,
            expensive_query: None,
            delay_template: "SELECT pg_sleep({seconds})".to_string(),
        }
    }
}

impl Workload {
    /// Statements that create and fill the fixture table.
    #[must_use]
    pub fn provisioning_statements(&self) -> Vec<String> {
        let table = &self.table;
        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {table} (id SERIAL PRIMARY KEY, data TEXT, created_at TIMESTAMP DEFAULT NOW())"
            ),
            format!(
                "INSERT INTO {table} (data) SELECT 'Test data ' || i FROM generate_series(1, {}) i ON CONFLICT DO NOTHING",
                self.rows
            ),
        ]
    }

    /// Read-only reference query (baseline and re-measurement).
    #[must_use]
    pub fn reference_query(&self) -> String {
        self.reference_query
            .clone()
            .unwrap_or_else(|| format!("SELECT COUNT(*) FROM {}", self.table))
    }

    /// Expensive read used for CPU pressure.
    #[must_use]
    pub fn expensive_query(&self) -> String {
        self.expensive_query.clone().unwrap_or_else(|| {
            let table = &self.table;
            format!("SELECT COUNT(*) FROM {table} t1 CROSS JOIN {table} t2 LIMIT 100000")
        })
    }

    /// Delay statement for `delay`, rendered in whole or fractional seconds.
    #[must_use]
    pub fn delay_query(&self, delay: Duration) -> String {
        let secs = delay.as_secs_f64();
        let rendered = if delay.subsec_nanos() == 0 {
            format!("{}", delay.as_secs())
        } else {
            format!("{secs:.3}")
        };
        self.delay_template.replace(SECONDS_PLACEHOLDER, &rendered)
    }

    /// Check the workload is usable.
    ///
    /// # Errors
    /// `Error::InvalidConfig` for an empty table name or a delay template
    /// without the `{seconds}` placeholder.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(Error::InvalidConfig("workload.table must not be empty".to_string()));
        }
        if !self.delay_template.contains(SECONDS_PLACEHOLDER) {
            return Err(Error::InvalidConfig(format!(
                "workload.delay_template must contain {SECONDS_PLACEHOLDER}"
            )));
        }
        if self.liveness_query.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "workload.liveness_query must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_statements() {
        let w = Workload::default();
        assert_eq!(w.reference_query(), "SELECT COUNT(*) FROM test_data");
        assert!(w.expensive_query().contains("CROSS JOIN test_data t2"));
        assert_eq!(w.provisioning_statements().len(), 2);
        assert!(w.provisioning_statements()[1].contains("generate_series(1, 1000)"));
    }

    #[test]
    fn test_delay_query_rendering() {
        let w = Workload::default();
        assert_eq!(w.delay_query(Duration::from_secs(2)), "SELECT pg_sleep(2)");
        assert_eq!(
            w.delay_query(Duration::from_millis(250)),
            "SELECT pg_sleep(0.250)"
        );
    }

    #[test]
    fn test_validate() {
        assert!(Workload::default().validate().is_ok());
        let bad = Workload {
            delay_template: "SELECT pg_sleep(2)".into(),
            ..Workload::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidConfig(_))));
        let empty = Workload {
            table: " ".into(),
            ..Workload::default()
        };
        assert!(empty.validate().is_err());
    }
}
