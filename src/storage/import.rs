use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Account usage views mirrored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MirrorView {
    QueryHistory,
    QueryAttributionHistory,
    CortexFunctionsQueryUsageHistory,
    CortexAnalystUsageHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Int,
    Real,
    Timestamp,
}

struct MirrorColumn {
    name: &'static str,
    kind: ColumnKind,
    required: bool,
}

const fn col(name: &'static str, kind: ColumnKind) -> MirrorColumn {
    MirrorColumn {
        name,
        kind,
        required: false,
    }
}

const fn required(name: &'static str, kind: ColumnKind) -> MirrorColumn {
    MirrorColumn {
        name,
        kind,
        required: true,
    }
}

use ColumnKind::{Int, Real, Text, Timestamp};

const QUERY_HISTORY: &[MirrorColumn] = &[
    required("query_id", Text),
    col("query_text", Text),
    col("query_type", Text),
    col("database_name", Text),
    col("schema_name", Text),
    col("user_name", Text),
    col("role_name", Text),
    col("warehouse_name", Text),
    col("warehouse_size", Text),
    col("execution_status", Text),
    col("error_code", Text),
    col("error_message", Text),
    required("start_time", Timestamp),
    col("end_time", Timestamp),
    col("total_elapsed_time", Int),
    col("execution_time", Int),
    col("compilation_time", Int),
    col("bytes_scanned", Int),
    col("rows_produced", Int),
    col("bytes_spilled_to_local_storage", Int),
    col("bytes_spilled_to_remote_storage", Int),
    col("credits_used_cloud_services", Real),
    col("query_id_url", Text),
];

const QUERY_ATTRIBUTION_HISTORY: &[MirrorColumn] = &[
    required("query_id", Text),
    col("warehouse_name", Text),
    col("user_name", Text),
    col("query_tag", Text),
    required("start_time", Timestamp),
    col("end_time", Timestamp),
    col("credits_attributed_compute", Real),
    col("credits_used_query_acceleration", Real),
];

const CORTEX_FUNCTIONS: &[MirrorColumn] = &[
    required("query_id", Text),
    col("warehouse_id", Text),
    col("function_name", Text),
    col("model_name", Text),
    col("tokens", Int),
    col("token_credits", Real),
];

const CORTEX_ANALYST: &[MirrorColumn] = &[
    required("start_time", Timestamp),
    col("end_time", Timestamp),
    col("username", Text),
    col("credits", Real),
    col("request_count", Int),
];

impl MirrorView {
    pub fn table_name(&self) -> &'static str {
        match self {
            MirrorView::QueryHistory => "query_history",
            MirrorView::QueryAttributionHistory => "query_attribution_history",
            MirrorView::CortexFunctionsQueryUsageHistory => "cortex_functions_query_usage_history",
            MirrorView::CortexAnalystUsageHistory => "cortex_analyst_usage_history",
        }
    }

    fn columns(&self) -> &'static [MirrorColumn] {
        match self {
            MirrorView::QueryHistory => QUERY_HISTORY,
            MirrorView::QueryAttributionHistory => QUERY_ATTRIBUTION_HISTORY,
            MirrorView::CortexFunctionsQueryUsageHistory => CORTEX_FUNCTIONS,
            MirrorView::CortexAnalystUsageHistory => CORTEX_ANALYST,
        }
    }
}

impl fmt::Display for MirrorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub view: MirrorView,
    pub rows_imported: u64,
    pub ignored_columns: Vec<String>,
}

enum Cell {
    Null,
    Text(String),
    Int(i64),
    Real(f64),
}

/// Load a CSV export of `view` from `path` into the mirror.
pub async fn import_csv_file(pool: &SqlitePool, view: MirrorView, path: &Path) -> Result<ImportSummary> {
    info!("Importing {} from {:?}", view, path);
    let file = std::fs::File::open(path)?;
    import_csv(pool, view, file).await
}

/// Load CSV data for `view`. Headers match mirror columns case-insensitively,
/// unknown columns are skipped and empty cells become NULL. All rows are
/// inserted in one transaction.
pub async fn import_csv<R: Read>(pool: &SqlitePool, view: MirrorView, reader: R) -> Result<ImportSummary> {
    let export = parse_export(view, reader)?;

    let placeholders = vec!["?"; export.columns.len()].join(", ");
    let sql = format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        view.table_name(),
        export.columns.join(", "),
        placeholders
    );
    debug!("Import statement: {}", sql);

    let mut tx = pool.begin().await?;
    for cells in &export.rows {
        let mut query = sqlx::query(&sql);
        for cell in cells {
            query = match cell {
                Cell::Null => query.bind(None::<String>),
                Cell::Text(value) => query.bind(value.as_str()),
                Cell::Int(value) => query.bind(*value),
                Cell::Real(value) => query.bind(*value),
            };
        }
        query.execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Imported {} rows into {}", export.rows.len(), view);
    Ok(ImportSummary {
        view,
        rows_imported: export.rows.len() as u64,
        ignored_columns: export.ignored_columns,
    })
}

struct ParsedExport {
    columns: Vec<&'static str>,
    rows: Vec<Vec<Cell>>,
    ignored_columns: Vec<String>,
}

fn parse_export<R: Read>(view: MirrorView, reader: R) -> Result<ParsedExport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = view.columns();

    let mut mapping = Vec::new();
    let mut ignored_columns = Vec::new();
    let mut seen = HashSet::new();
    for (index, header) in headers.iter().enumerate() {
        match columns.iter().find(|c| c.name.eq_ignore_ascii_case(header)) {
            Some(column) if seen.insert(column.name) => mapping.push((index, column)),
            _ => {
                warn!("Ignoring column '{}' for {}", header, view);
                ignored_columns.push(header.to_string());
            }
        }
    }

    if let Some(missing) = columns
        .iter()
        .find(|c| c.required && !seen.contains(c.name))
    {
        return Err(Error::import(format!(
            "{} export is missing required column '{}'",
            view, missing.name
        )));
    }

    let mut rows = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record?;
        let mut cells = Vec::with_capacity(mapping.len());
        for (index, column) in &mapping {
            let raw = record.get(*index).unwrap_or_default();
            let cell = parse_cell(raw, column.kind).map_err(|reason| {
                Error::import(format!(
                    "row {}: column '{}': {}",
                    line + 1,
                    column.name,
                    reason
                ))
            })?;
            if column.required && matches!(cell, Cell::Null) {
                return Err(Error::import(format!(
                    "row {}: column '{}' is required",
                    line + 1,
                    column.name
                )));
            }
            cells.push(cell);
        }
        rows.push(cells);
    }

    Ok(ParsedExport {
        columns: mapping.iter().map(|(_, c)| c.name).collect(),
        rows,
        ignored_columns,
    })
}

fn parse_cell(raw: &str, kind: ColumnKind) -> std::result::Result<Cell, String> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(Cell::Null);
    }

    match kind {
        ColumnKind::Text => Ok(Cell::Text(raw.to_string())),
        ColumnKind::Int => raw
            .parse::<i64>()
            .or_else(|_| raw.parse::<f64>().map(|f| f.round() as i64))
            .map(Cell::Int)
            .map_err(|_| format!("'{}' is not a number", raw)),
        ColumnKind::Real => raw
            .parse::<f64>()
            .map(Cell::Real)
            .map_err(|_| format!("'{}' is not a number", raw)),
        ColumnKind::Timestamp => normalize_timestamp(raw)
            .map(Cell::Text)
            .ok_or_else(|| format!("'{}' is not a recognised timestamp", raw)),
    }
}

/// Normalize export timestamps to `YYYY-MM-DD HH:MM:SS.fff`, keeping the
/// wall-clock time of any offset the export carried.
fn normalize_timestamp(raw: &str) -> Option<String> {
    const OUTPUT: &str = "%Y-%m-%d %H:%M:%S%.3f";
    const WITH_OFFSET: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%:z"];
    const NAIVE: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().format(OUTPUT).to_string());
    }
    for format in WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.naive_local().format(OUTPUT).to_string());
        }
    }
    for format in NAIVE {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.format(OUTPUT).to_string());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format(OUTPUT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use tempfile::TempDir;

    async fn database() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(&temp_dir.path().join("mirror.db"), 1)
            .await
            .unwrap();
        (db, temp_dir)
    }

    #[tokio::test]
    async fn test_import_query_history() {
        let (db, _temp_dir) = database().await;
        let data = "\
QUERY_ID,START_TIME,WAREHOUSE_NAME,EXECUTION_TIME,CREDITS_USED_CLOUD_SERVICES,EXTRA
q1,2024-03-01 10:00:00.000 -0700,WH_A,1500,0.002,x
q2,2024-03-02T11:30:00Z,,,,y
";

        let summary = import_csv(db.pool(), MirrorView::QueryHistory, data.as_bytes())
            .await
            .unwrap();
        assert_eq!(summary.rows_imported, 2);
        assert_eq!(summary.ignored_columns, vec!["EXTRA".to_string()]);

        let (start, warehouse): (String, Option<String>) = sqlx::query_as(
            "SELECT start_time, warehouse_name FROM query_history WHERE query_id = 'q2'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(start, "2024-03-02 11:30:00.000");
        assert_eq!(warehouse, None);

        let start: String =
            sqlx::query_scalar("SELECT start_time FROM query_history WHERE query_id = 'q1'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(start, "2024-03-01 10:00:00.000");
    }

    #[tokio::test]
    async fn test_missing_required_column() {
        let (db, _temp_dir) = database().await;
        let data = "query_id,warehouse_name\nq1,WH_A\n";

        let err = import_csv(db.pool(), MirrorView::QueryHistory, data.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[tokio::test]
    async fn test_bad_number_imports_nothing() {
        let (db, _temp_dir) = database().await;
        let data = "start_time,username,credits,request_count\n\
2024-03-01,alice,0.5,3\n\
2024-03-02,bob,lots,1\n";

        let err = import_csv(db.pool(), MirrorView::CortexAnalystUsageHistory, data.as_bytes())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert_eq!(db.get_statistics().await.unwrap().cortex_analyst_usage, 0);
    }

    #[test]
    fn test_normalize_timestamp_formats() {
        assert_eq!(
            normalize_timestamp("2024-03-01").as_deref(),
            Some("2024-03-01 00:00:00.000")
        );
        assert_eq!(
            normalize_timestamp("2024-03-01 23:59:59.5").as_deref(),
            Some("2024-03-01 23:59:59.500")
        );
        assert_eq!(normalize_timestamp("yesterday"), None);
    }
}
