use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Executor, Row, SqlitePool, Statement, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::rollup::DateRange;
use crate::storage::ResultSet;

/// Positional parameter bound into a read query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Text(String),
    Int(i64),
    Real(f64),
}

/// `[start, end]` date parameters for the shared `BETWEEN ? AND ?` filter.
pub fn range_params(range: &DateRange) -> Vec<QueryParam> {
    let (start, end) = range.bounds();
    vec![QueryParam::Text(start), QueryParam::Text(end)]
}

/// Read-only, parameterized access to the analytical data source.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn fetch(&self, sql: &str, params: &[QueryParam]) -> Result<ResultSet>;

    fn name(&self) -> &str {
        "query-engine"
    }
}

/// Run a query against an optional view. Any failure means the feature is
/// not deployed here and is reported as `OptionalFeatureUnavailable`.
pub async fn fetch_optional_feature(
    engine: &dyn QueryEngine,
    feature: &str,
    sql: &str,
    params: &[QueryParam],
) -> Result<ResultSet> {
    engine.fetch(sql, params).await.map_err(|e| {
        warn!("Optional feature '{}' unavailable: {}", feature, e);
        Error::feature_unavailable(feature, e)
    })
}

/// `QueryEngine` over the local SQLite usage mirror.
#[derive(Clone)]
pub struct SqliteEngine {
    pool: SqlitePool,
}

impl SqliteEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryEngine for SqliteEngine {
    async fn fetch(&self, sql: &str, params: &[QueryParam]) -> Result<ResultSet> {
        ensure_read_only(sql)?;
        debug!("Executing query with {} parameters", params.len());

        let statement = self.pool.prepare(sql).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let mut query = statement.query();
        for param in params {
            query = match param {
                QueryParam::Text(value) => query.bind(value.clone()),
                QueryParam::Int(value) => query.bind(*value),
                QueryParam::Real(value) => query.bind(*value),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut result = ResultSet::new(columns);
        for row in &rows {
            let mut cells = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                cells.push(extract_value(row, index)?);
            }
            result.push_row(cells);
        }

        debug!("Query returned {} rows", result.len());
        Ok(result)
    }

    fn name(&self) -> &str {
        "sqlite-mirror"
    }
}

fn ensure_read_only(sql: &str) -> Result<()> {
    let head = sql
        .trim_start()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    if head == "SELECT" || head == "WITH" {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Only SELECT queries may be issued, got '{}'",
            head
        )))
    }
}

/// Convert one SQLite cell by its runtime storage class.
fn extract_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_string()
    };

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => Value::Number(row.try_get::<i64, _>(index)?.into()),
        "REAL" | "NUMERIC" => {
            let v: f64 = row.try_get(index)?;
            serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        "BLOB" => {
            let bytes: Vec<u8> = row.try_get(index)?;
            Value::String(format!("<{} bytes>", bytes.len()))
        }
        _ => Value::String(row.try_get::<String, _>(index)?),
    };

    Ok(value)
}
