//! SQL statement classification for the in-memory target
//!
//! The in-memory target does not evaluate SQL. It recognises the handful of
//! statement shapes the harness issues and simulates their cost:
//!
//! - `SELECT <literal>` (liveness)
//! - `SELECT COUNT(*) FROM t` (reference read)
//! - `SELECT ... FROM a CROSS JOIN b [LIMIT n]` (expensive read)
//! - `SELECT * FROM t [LIMIT n]` (scan)
//! - `SELECT pg_sleep(n)` (artificial delay)
//! - `CREATE TABLE [IF NOT EXISTS] t (...)`
//! - `INSERT INTO t ... FROM generate_series(a, b)`
//!
//! References:
//! - sqlparser-rs: <https://docs.rs/sqlparser>

use sqlparser::ast::{Expr, FunctionArguments, Query, Select, SelectItem, SetExpr, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::time::Duration;

use crate::{Error, Result};

/// Statement shape recognised by the in-memory target.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetStatement {
    /// `SELECT <literal>`
    Literal(serde_json::Value),
    /// `SELECT COUNT(..) FROM table`
    Count {
        /// Table name
        table: String,
    },
    /// Multi-table read without predicates
    CrossJoin {
        /// Joined tables in FROM order
        tables: Vec<String>,
        /// LIMIT, if any
        limit: Option<u64>,
    },
    /// Single-table projection
    Scan {
        /// Table name
        table: String,
        /// LIMIT, if any
        limit: Option<u64>,
    },
    /// `SELECT pg_sleep(seconds)`
    Sleep {
        /// Requested delay
        duration: Duration,
    },
    /// `CREATE TABLE`
    CreateTable {
        /// Table name
        name: String,
        /// `IF NOT EXISTS` was given
        if_not_exists: bool,
    },
    /// `INSERT INTO table ...`
    Insert {
        /// Table name
        table: String,
        /// Rows produced by the source (generate_series span, or 1 for VALUES)
        rows: u64,
    },
}

/// Classify one SQL statement.
///
/// # Errors
/// Returns `Error::ParseError` if:
/// - SQL syntax is invalid
/// - More than one statement is given
/// - The statement shape is not one listed in the module docs
///
/// # Example
/// ```
/// use trueno_chaos::adapter::sql::{classify, TargetStatement};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let stmt = classify("SELECT COUNT(*) FROM test_data")?;
/// assert_eq!(stmt, TargetStatement::Count { table: "test_data".into() });
/// # Ok(())
/// # }
/// ```
pub fn classify(sql: &str) -> Result<TargetStatement> {
    if sql.trim().is_empty() {
        return Err(Error::ParseError("empty statement".to_string()));
    }

    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|e| Error::ParseError(e.to_string()))?;

    if statements.len() != 1 {
        return Err(Error::ParseError(
            "Only single statements supported".to_string(),
        ));
    }

    let stmt = &statements[0];
    match stmt {
        Statement::Query(query) => classify_query(query),
        Statement::CreateTable { .. } => {
            let rendered = stmt.to_string();
            let if_not_exists = rendered.to_uppercase().contains("IF NOT EXISTS");
            let name = identifier_after(&rendered, if if_not_exists { "EXISTS" } else { "TABLE" })
                .ok_or_else(|| Error::ParseError("CREATE TABLE without a name".to_string()))?;
            Ok(TargetStatement::CreateTable {
                name,
                if_not_exists,
            })
        }
        Statement::Insert { .. } => {
            let rendered = stmt.to_string();
            let table = identifier_after(&rendered, "INTO")
                .ok_or_else(|| Error::ParseError("INSERT without a table".to_string()))?;
            let rows = generate_series_span(&rendered)?.unwrap_or(1);
            Ok(TargetStatement::Insert { table, rows })
        }
        other => Err(Error::ParseError(format!(
            "Unsupported statement: {other}"
        ))),
    }
}

fn classify_query(query: &Query) -> Result<TargetStatement> {
    let SetExpr::Select(select) = query.body.as_ref() else {
        return Err(Error::ParseError(
            "Only SELECT queries supported".to_string(),
        ));
    };

    let limit = extract_limit(query.limit.as_ref());

    if select.from.is_empty() {
        return classify_tableless(select);
    }

    let tables = extract_tables(select);
    if tables.len() > 1 {
        return Ok(TargetStatement::CrossJoin { tables, limit });
    }

    let table = tables.into_iter().next().unwrap_or_default();
    if select.projection.iter().any(is_count) {
        Ok(TargetStatement::Count { table })
    } else {
        Ok(TargetStatement::Scan { table, limit })
    }
}

fn classify_tableless(select: &Select) -> Result<TargetStatement> {
    let [SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. }] =
        select.projection.as_slice()
    else {
        return Err(Error::ParseError(
            "Table-less SELECT must project exactly one expression".to_string(),
        ));
    };

    match expr {
        Expr::Value(sqlparser::ast::Value::Number(n, _)) => {
            let value = n
                .parse::<i64>()
                .map(serde_json::Value::from)
                .or_else(|_| n.parse::<f64>().map(serde_json::Value::from))
                .map_err(|e| Error::ParseError(format!("Invalid number {n}: {e}")))?;
            Ok(TargetStatement::Literal(value))
        }
        Expr::Value(sqlparser::ast::Value::SingleQuotedString(s)) => {
            Ok(TargetStatement::Literal(serde_json::Value::from(s.clone())))
        }
        Expr::Function(func) if func.name.to_string().eq_ignore_ascii_case("pg_sleep") => {
            let arg = match &func.args {
                FunctionArguments::List(list) => list.args.first().map(ToString::to_string),
                _ => None,
            }
            .ok_or_else(|| Error::ParseError("pg_sleep requires an argument".to_string()))?;
            let seconds: f64 = arg
                .trim()
                .parse()
                .map_err(|e| Error::ParseError(format!("Invalid pg_sleep argument {arg}: {e}")))?;
            let duration = Duration::try_from_secs_f64(seconds).map_err(|e| {
                Error::ParseError(format!("pg_sleep argument {arg} is not a valid delay: {e}"))
            })?;
            Ok(TargetStatement::Sleep { duration })
        }
        other => Err(Error::ParseError(format!(
            "Unsupported expression: {other}"
        ))),
    }
}

fn extract_tables(select: &Select) -> Vec<String> {
    select
        .from
        .iter()
        .flat_map(|table_with_joins| {
            std::iter::once(table_with_joins.relation.to_string())
                .chain(table_with_joins.joins.iter().map(|j| j.relation.to_string()))
        })
        .map(|name| bare_table_name(&name))
        .collect()
}

fn is_count(item: &SelectItem) -> bool {
    let (SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. }) = item else {
        return false;
    };
    matches!(expr, Expr::Function(func) if func.name.to_string().eq_ignore_ascii_case("count"))
}

fn extract_limit(limit: Option<&Expr>) -> Option<u64> {
    limit.and_then(|expr| {
        if let Expr::Value(sqlparser::ast::Value::Number(n, _)) = expr {
            n.parse().ok()
        } else {
            None
        }
    })
}

/// Strip an alias from a rendered relation (`test_data AS t1` / `test_data t1`).
fn bare_table_name(relation: &str) -> String {
    relation
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// First identifier following `keyword` (case-insensitive) in rendered SQL.
fn identifier_after(rendered: &str, keyword: &str) -> Option<String> {
    let mut tokens = rendered.split_whitespace();
    tokens.find(|t| t.eq_ignore_ascii_case(keyword))?;
    let token = tokens.next()?;
    let name: String = token
        .chars()
        .take_while(|c| *c != '(' && *c != ';')
        .collect();
    (!name.is_empty()).then_some(name)
}

/// Integer bounds of a `generate_series(a, b)` source, if present.
fn generate_series_bounds(rendered: &str) -> Option<(i64, i64)> {
    let lower = rendered.to_lowercase();
    let start = lower.find("generate_series(")? + "generate_series(".len();
    let end = start + lower[start..].find(')')?;
    let mut bounds = lower[start..end].split(',').map(|s| s.trim().parse::<i64>());
    let (Some(Ok(from)), Some(Ok(to))) = (bounds.next(), bounds.next()) else {
        return None;
    };
    Some((from, to))
}

/// Row count of a `generate_series(a, b)` source, if present.
///
/// An empty range (`b < a`) yields zero rows.
///
/// # Errors
/// `Error::ParseError` when the span does not fit in a `u64`.
fn generate_series_span(rendered: &str) -> Result<Option<u64>> {
    let Some((from, to)) = generate_series_bounds(rendered) else {
        return Ok(None);
    };
    if to < from {
        return Ok(Some(0));
    }
    let span = i128::from(to) - i128::from(from) + 1;
    u64::try_from(span).map(Some).map_err(|_| {
        Error::ParseError(format!("generate_series({from}, {to}) produces too many rows"))
    })
}
