//! Small deterministic usage dataset shared by tests.
//!
//! March 2024, three warehouses, three users. Query `q6` falls outside
//! [`march_range`] and must never be counted.

use chrono::NaiveDate;
use tempfile::TempDir;

use crate::rollup::DateRange;
use crate::storage::Database;

const SEED: &[&str] = &[
    "INSERT INTO query_history (query_id, query_text, query_type, database_name, schema_name, user_name, warehouse_name, warehouse_size, execution_status, error_message, start_time, total_elapsed_time, execution_time, compilation_time, bytes_scanned, rows_produced, bytes_spilled_to_local_storage, bytes_spilled_to_remote_storage, credits_used_cloud_services, query_id_url) VALUES
        ('q1', 'SELECT * FROM orders', 'SELECT', 'SALES', 'PUBLIC', 'alice', 'WH_A', 'X-Small', 'SUCCESS', NULL, '2024-03-01 09:00:00.000', 2100, 2000, 100, 1073741824, 10, 0, 0, 0.01, 'https://app/q1'),
        ('q2', 'SELECT * FROM orders o JOIN items i ON o.id = i.order_id', 'SELECT', 'SALES', 'PUBLIC', 'bob', 'WH_A', 'X-Small', 'FAILED', 'Out of memory', '2024-03-01 10:00:00.000', 400500, 400000, 500, 2147483648, 0, 1048576, 0, 0.02, 'https://app/q2'),
        ('q3', 'INSERT INTO daily_rollup SELECT * FROM orders', 'INSERT', 'SALES', 'PUBLIC', 'alice', 'WH_B', 'Small', 'SUCCESS', NULL, '2024-03-02 11:00:00.000', 200300, 200000, 300, 0, 500, 0, 0, 0.03, 'https://app/q3'),
        ('q4', 'SELECT region, SUM(total) FROM orders GROUP BY region', 'SELECT', 'SALES', 'PUBLIC', 'carol', 'WH_C', 'Medium', 'SUCCESS', NULL, '2024-03-03 12:00:00.000', 5100, 5000, 100, 536870912, 4, 0, 2097152, 0.04, 'https://app/q4'),
        ('q5', 'SELECT SNOWFLAKE.CORTEX.COMPLETE(''mistral-large'', body) FROM tickets', 'SELECT', 'SUPPORT', 'PUBLIC', 'alice', 'WH_B', 'Small', 'SUCCESS', NULL, '2024-03-04 13:00:00.000', 3100, 3000, 100, 0, 20, 0, 0, 0.05, 'https://app/q5'),
        ('q6', 'SELECT 1', 'SELECT', 'SALES', 'PUBLIC', 'alice', 'WH_A', 'X-Small', 'SUCCESS', NULL, '2024-02-20 08:00:00.000', 1000, 1000, 10, 0, 1, 0, 0, 0.5, 'https://app/q6')",
    "INSERT INTO query_attribution_history (query_id, warehouse_name, user_name, query_tag, start_time, end_time, credits_attributed_compute, credits_used_query_acceleration) VALUES
        ('q1', 'WH_A', 'alice', 'etl', '2024-03-01 09:00:00.000', '2024-03-01 09:00:02.100', 2.0, NULL),
        ('q2', 'WH_A', 'bob', NULL, '2024-03-01 10:00:00.000', '2024-03-01 10:06:40.500', 1.5, 0),
        ('q3', 'WH_B', 'alice', 'etl', '2024-03-02 11:00:00.000', '2024-03-02 11:03:20.300', 3.0, 0.1),
        ('q4', 'WH_C', 'carol', 'bi', '2024-03-03 12:00:00.000', '2024-03-03 12:00:05.100', 0.5, NULL),
        ('q5', 'WH_B', 'alice', NULL, '2024-03-04 13:00:00.000', '2024-03-04 13:00:03.100', 0.25, NULL),
        ('q6', 'WH_A', 'alice', NULL, '2024-02-20 08:00:00.000', '2024-02-20 08:00:01.000', 10.0, NULL)",
    "INSERT INTO cortex_functions_query_usage_history (query_id, warehouse_id, function_name, model_name, tokens, token_credits) VALUES
        ('q5', '2', 'COMPLETE', 'mistral-large', 1000, 0.4),
        ('q1', '1', 'SUMMARIZE', NULL, 200, 0.1)",
    "INSERT INTO cortex_analyst_usage_history (start_time, end_time, username, credits, request_count) VALUES
        ('2024-03-02 09:00:00.000', '2024-03-02 10:00:00.000', 'alice', 0.2, 3)",
];

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub(crate) fn march_range() -> DateRange {
    DateRange::new(date(2024, 3, 1), date(2024, 3, 7)).unwrap()
}

pub(crate) async fn empty_mirror() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(&temp_dir.path().join("mirror.db"), 1)
        .await
        .unwrap();
    (db, temp_dir)
}

pub(crate) async fn seeded_mirror() -> (Database, TempDir) {
    let (db, temp_dir) = empty_mirror().await;
    for statement in SEED {
        sqlx::query(statement).execute(db.pool()).await.unwrap();
    }
    (db, temp_dir)
}

/// Simulate a deployment without the AI usage views.
pub(crate) async fn drop_ai_views(db: &Database) {
    sqlx::query("DROP TABLE cortex_functions_query_usage_history")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query("DROP TABLE cortex_analyst_usage_history")
        .execute(db.pool())
        .await
        .unwrap();
}
