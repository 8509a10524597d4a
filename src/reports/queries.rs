//! Shared read queries against the usage views.
//!
//! Every query takes the inclusive date range as `?1` (start) and `?2`
//! (end), compared against the calendar date of the query start time.
//! Extra parameters follow as `?3`, `?4`.

/// Compute (including query acceleration) and cloud services credits.
pub const ACCOUNT_TOTALS: &str = r#"
SELECT
    COALESCE(SUM(COALESCE(qa.credits_attributed_compute, 0) + COALESCE(qa.credits_used_query_acceleration, 0)), 0) AS compute_credits,
    COALESCE(SUM(COALESCE(qh.credits_used_cloud_services, 0)), 0) AS cloud_services_credits
FROM query_attribution_history qa
LEFT JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
"#;

/// AI function token credits. Optional view.
pub const AI_TOTAL: &str = r#"
SELECT
    COALESCE(SUM(cf.token_credits), 0) AS ai_credits
FROM cortex_functions_query_usage_history cf
JOIN query_history qh ON cf.query_id = qh.query_id
WHERE date(qh.start_time) BETWEEN ?1 AND ?2
"#;

pub const DAILY_COSTS: &str = r#"
SELECT
    date(qa.start_time) AS usage_date,
    SUM(COALESCE(qa.credits_attributed_compute, 0) + COALESCE(qa.credits_used_query_acceleration, 0)) AS compute_credits,
    SUM(COALESCE(qh.credits_used_cloud_services, 0)) AS cloud_services_credits,
    COUNT(DISTINCT qa.user_name) AS active_users,
    COUNT(DISTINCT qa.warehouse_name) AS active_warehouses
FROM query_attribution_history qa
LEFT JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
GROUP BY 1
ORDER BY 1
"#;

/// Per-warehouse summary built from per-day statistics.
pub const WAREHOUSE_SUMMARY: &str = r#"
WITH warehouse_stats AS (
    SELECT
        qa.warehouse_name,
        date(qa.start_time) AS usage_date,
        SUM(COALESCE(qa.credits_attributed_compute, 0)) AS daily_credits,
        COUNT(DISTINCT qa.query_id) AS query_count,
        AVG(qh.execution_time) / 1000.0 AS avg_execution_seconds,
        COUNT(DISTINCT qa.user_name) AS unique_users
    FROM query_attribution_history qa
    JOIN query_history qh ON qa.query_id = qh.query_id
    WHERE date(qa.start_time) BETWEEN ?1 AND ?2
      AND qa.warehouse_name IS NOT NULL
    GROUP BY 1, 2
)
SELECT
    warehouse_name,
    SUM(daily_credits) AS total_credits,
    AVG(daily_credits) AS avg_daily_credits,
    SUM(query_count) AS total_queries,
    AVG(avg_execution_seconds) AS avg_execution_seconds,
    AVG(unique_users) AS avg_daily_users,
    COUNT(DISTINCT usage_date) AS active_days,
    MAX(daily_credits) AS peak_daily_credits
FROM warehouse_stats
GROUP BY 1
ORDER BY total_credits DESC, warehouse_name
"#;

/// Per-warehouse inputs to the savings rules over the whole period.
pub const WAREHOUSE_USAGE: &str = r#"
SELECT
    qa.warehouse_name,
    SUM(COALESCE(qa.credits_attributed_compute, 0)) AS total_credits,
    COUNT(DISTINCT qa.query_id) AS total_queries,
    AVG(qh.execution_time) / 1000.0 AS avg_execution_seconds,
    COUNT(DISTINCT qa.user_name) AS unique_users,
    COUNT(DISTINCT date(qa.start_time)) AS active_days
FROM query_attribution_history qa
JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
  AND qa.warehouse_name IS NOT NULL
GROUP BY 1
ORDER BY 1
"#;

/// Compute credits of failed, spilling and long-running queries.
/// `?3` is the long-running threshold in milliseconds.
pub const QUERY_WASTE: &str = r#"
SELECT
    COALESCE(SUM(CASE WHEN qh.execution_status = 'FAILED' THEN COALESCE(qa.credits_attributed_compute, 0) ELSE 0 END), 0) AS failed_credits,
    COALESCE(SUM(CASE WHEN COALESCE(qh.bytes_spilled_to_local_storage, 0) + COALESCE(qh.bytes_spilled_to_remote_storage, 0) > 0
        THEN COALESCE(qa.credits_attributed_compute, 0) ELSE 0 END), 0) AS spilled_credits,
    COALESCE(SUM(CASE WHEN qh.execution_time > ?3 THEN COALESCE(qa.credits_attributed_compute, 0) ELSE 0 END), 0) AS long_running_credits
FROM query_attribution_history qa
JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
"#;

pub const USER_COSTS: &str = r#"
SELECT
    qa.user_name,
    SUM(COALESCE(qa.credits_attributed_compute, 0) + COALESCE(qa.credits_used_query_acceleration, 0)) AS compute_credits,
    SUM(COALESCE(qh.credits_used_cloud_services, 0)) AS cloud_services_credits,
    COUNT(DISTINCT qa.query_id) AS total_queries,
    COUNT(DISTINCT qa.warehouse_name) AS warehouses_used,
    AVG(qh.execution_time) / 1000.0 AS avg_execution_seconds,
    SUM(CASE WHEN qh.execution_status = 'FAILED' THEN 1 ELSE 0 END) AS failed_queries,
    COUNT(DISTINCT date(qa.start_time)) AS active_days
FROM query_attribution_history qa
JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
GROUP BY 1
"#;

/// Optional view.
pub const USER_AI_COSTS: &str = r#"
SELECT
    qh.user_name,
    SUM(cf.token_credits) AS ai_credits,
    COUNT(*) AS ai_queries
FROM cortex_functions_query_usage_history cf
JOIN query_history qh ON cf.query_id = qh.query_id
WHERE date(qh.start_time) BETWEEN ?1 AND ?2
GROUP BY 1
"#;

pub const DATA_SCANNING: &str = r#"
SELECT
    date(qa.start_time) AS usage_date,
    SUM(qh.bytes_scanned) / 1099511627776.0 AS tb_scanned,
    COUNT(DISTINCT qa.query_id) AS queries_scanning,
    AVG(qh.bytes_scanned) / 1073741824.0 AS avg_gb_per_query,
    SUM(COALESCE(qa.credits_attributed_compute, 0)) AS credits
FROM query_attribution_history qa
JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
  AND qh.bytes_scanned > 0
GROUP BY 1
ORDER BY 1
"#;

/// `?3` is the row limit.
pub const LARGE_SCANS: &str = r#"
SELECT
    qa.user_name,
    qh.query_text,
    qh.bytes_scanned / 1073741824.0 AS gb_scanned,
    COALESCE(qa.credits_attributed_compute, 0) AS credits,
    qh.execution_time / 1000.0 AS execution_seconds,
    qa.start_time
FROM query_attribution_history qa
JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
  AND qh.bytes_scanned > 0
ORDER BY qh.bytes_scanned DESC, qa.query_id
LIMIT ?3
"#;

/// AI usage by day, function and model. Optional view.
pub const AI_SUMMARY: &str = r#"
SELECT
    date(qh.start_time) AS usage_date,
    cf.function_name,
    COALESCE(NULLIF(TRIM(cf.model_name), ''), 'default') AS model_name,
    COALESCE(SUM(cf.tokens), 0) AS total_tokens,
    COALESCE(SUM(cf.token_credits), 0) AS credits,
    COUNT(*) AS request_count,
    COUNT(DISTINCT qh.user_name) AS unique_users
FROM cortex_functions_query_usage_history cf
JOIN query_history qh ON cf.query_id = qh.query_id
WHERE date(qh.start_time) BETWEEN ?1 AND ?2
GROUP BY 1, 2, 3
ORDER BY usage_date DESC, credits DESC, function_name
"#;

/// `?3` is the long-running threshold in milliseconds.
pub const EFFICIENCY_SUMMARY: &str = r#"
SELECT
    COUNT(*) AS total_queries,
    COALESCE(SUM(CASE WHEN qh.execution_status = 'FAILED' THEN 1 ELSE 0 END), 0) AS failed_queries,
    COALESCE(SUM(CASE WHEN COALESCE(qh.bytes_spilled_to_local_storage, 0) + COALESCE(qh.bytes_spilled_to_remote_storage, 0) > 0 THEN 1 ELSE 0 END), 0) AS queries_with_spillage,
    COALESCE(SUM(CASE WHEN qh.execution_time > ?3 THEN 1 ELSE 0 END), 0) AS long_running_queries,
    AVG(qh.execution_time) / 1000.0 AS avg_execution_seconds,
    AVG(qh.compilation_time) / 1000.0 AS avg_compilation_seconds,
    COALESCE(SUM(COALESCE(qa.credits_attributed_compute, 0) + COALESCE(qa.credits_used_query_acceleration, 0)), 0) AS total_credits,
    AVG(qh.bytes_scanned) / 1073741824.0 AS avg_gb_scanned
FROM query_attribution_history qa
JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
  AND qh.execution_time > 0
"#;

/// `?3` is the long-running threshold in milliseconds, `?4` the row limit.
pub const PROBLEM_QUERIES: &str = r#"
SELECT
    qa.user_name,
    qa.warehouse_name,
    qh.execution_time / 1000.0 AS execution_seconds,
    COALESCE(qa.credits_attributed_compute, 0) + COALESCE(qa.credits_used_query_acceleration, 0) AS credits,
    COALESCE(qh.bytes_spilled_to_local_storage, 0) + COALESCE(qh.bytes_spilled_to_remote_storage, 0) AS spillage_bytes,
    qh.execution_status,
    qh.error_code,
    substr(qh.query_text, 1, 200) AS query_preview,
    qa.start_time
FROM query_attribution_history qa
JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
  AND (
    qh.execution_status = 'FAILED'
    OR qh.execution_time > ?3
    OR COALESCE(qh.bytes_spilled_to_local_storage, 0) + COALESCE(qh.bytes_spilled_to_remote_storage, 0) > 0
  )
ORDER BY credits DESC, qa.query_id
LIMIT ?4
"#;

/// Daily compute + query acceleration + cloud services credits.
pub const FORECAST_DAILY: &str = r#"
SELECT
    date(qa.start_time) AS usage_date,
    SUM(COALESCE(qa.credits_attributed_compute, 0) + COALESCE(qa.credits_used_query_acceleration, 0) + COALESCE(qh.credits_used_cloud_services, 0)) AS daily_credits
FROM query_attribution_history qa
LEFT JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
GROUP BY 1
ORDER BY 1
"#;

pub const USER_OVERVIEW: &str = r#"
SELECT
    COUNT(DISTINCT qh.query_id) AS total_queries,
    COALESCE(SUM(COALESCE(qa.credits_attributed_compute, 0)), 0) AS compute_credits,
    COALESCE(SUM(COALESCE(qh.credits_used_cloud_services, 0)), 0) AS cloud_services_credits,
    AVG(qh.total_elapsed_time) / 1000.0 AS avg_execution_seconds
FROM query_history qh
LEFT JOIN query_attribution_history qa ON qh.query_id = qa.query_id
WHERE date(qh.start_time) BETWEEN ?1 AND ?2
"#;

pub const WAREHOUSE_DAILY: &str = r#"
SELECT
    date(start_time) AS usage_date,
    warehouse_name,
    SUM(COALESCE(credits_attributed_compute, 0)) AS wh_credits
FROM query_attribution_history
WHERE date(start_time) BETWEEN ?1 AND ?2
  AND warehouse_name IS NOT NULL
GROUP BY 1, 2
ORDER BY 1, 2
"#;

/// Optional view.
pub const AI_FUNCTIONS_DAILY: &str = r#"
SELECT
    date(qh.start_time) AS usage_date,
    COALESCE(NULLIF(TRIM(cf.model_name), ''), 'default') AS model_name,
    cf.function_name,
    COALESCE(SUM(cf.token_credits), 0) AS credits
FROM cortex_functions_query_usage_history cf
JOIN query_history qh ON cf.query_id = qh.query_id
WHERE date(qh.start_time) BETWEEN ?1 AND ?2
  AND LENGTH(TRIM(cf.function_name)) > 0
GROUP BY 1, 2, 3
ORDER BY 1, 2, 3
"#;

/// Optional view.
pub const ANALYST_DAILY: &str = r#"
SELECT
    date(start_time) AS usage_date,
    COALESCE(SUM(credits), 0) AS credits,
    COALESCE(SUM(request_count), 0) AS requests
FROM cortex_analyst_usage_history
WHERE date(start_time) BETWEEN ?1 AND ?2
GROUP BY 1
ORDER BY 1
"#;

/// `?3` is the row limit.
pub const SPILLED_QUERIES: &str = r#"
SELECT
    date(start_time) AS usage_date,
    start_time,
    COALESCE(bytes_spilled_to_remote_storage, 0) AS remote_spillage,
    COALESCE(bytes_spilled_to_local_storage, 0) AS local_spillage,
    query_id,
    query_id_url AS url,
    warehouse_name,
    warehouse_size,
    bytes_scanned,
    user_name
FROM query_history
WHERE date(start_time) BETWEEN ?1 AND ?2
  AND (COALESCE(bytes_spilled_to_local_storage, 0) > 0 OR COALESCE(bytes_spilled_to_remote_storage, 0) > 0)
ORDER BY remote_spillage DESC, local_spillage DESC, query_id
LIMIT ?3
"#;

/// `?3` is the row limit.
pub const QUERY_DETAILS: &str = r#"
SELECT
    date(start_time) AS usage_date,
    start_time,
    query_text,
    total_elapsed_time / 1000.0 AS execution_time_seconds,
    query_id,
    query_id_url AS url,
    execution_status,
    error_message,
    database_name,
    schema_name,
    warehouse_name,
    bytes_scanned,
    rows_produced,
    credits_used_cloud_services,
    user_name
FROM query_history
WHERE date(start_time) BETWEEN ?1 AND ?2
ORDER BY start_time DESC, query_id
LIMIT ?3
"#;

/// `?3` is the row limit. Optional view.
pub const AI_QUERY_DETAILS: &str = r#"
SELECT
    date(qh.start_time) AS usage_date,
    qh.start_time,
    qh.query_text,
    qh.total_elapsed_time,
    cf.function_name,
    cf.model_name,
    qh.execution_status,
    cf.tokens,
    cf.token_credits,
    cf.query_id,
    qh.query_id_url AS url,
    qh.warehouse_name,
    qh.user_name
FROM cortex_functions_query_usage_history cf
JOIN query_history qh ON cf.query_id = qh.query_id
WHERE date(qh.start_time) BETWEEN ?1 AND ?2
ORDER BY qh.start_time DESC, cf.query_id
LIMIT ?3
"#;

/// `?3` is the row limit.
pub const EXPENSIVE_QUERIES: &str = r#"
SELECT
    date(qa.start_time) AS usage_date,
    qa.start_time,
    qh.query_text,
    COALESCE(qa.credits_attributed_compute, 0) + COALESCE(qa.credits_used_query_acceleration, 0) AS credits,
    qh.query_id_url AS url,
    qa.query_id,
    qh.total_elapsed_time / 1000.0 AS execution_time_seconds,
    qa.warehouse_name,
    qh.execution_status,
    qa.query_tag,
    qa.user_name
FROM query_attribution_history qa
JOIN query_history qh ON qa.query_id = qh.query_id
WHERE date(qa.start_time) BETWEEN ?1 AND ?2
ORDER BY credits DESC, qa.query_id
LIMIT ?3
"#;

/// `?3` is the row limit. Optional view.
pub const EXPENSIVE_AI_QUERIES: &str = r#"
SELECT
    date(qh.start_time) AS usage_date,
    qh.start_time,
    qh.query_text,
    COALESCE(SUM(cf.token_credits), 0) AS credits,
    qh.total_elapsed_time,
    qh.query_id_url AS url,
    cf.query_id,
    cf.function_name,
    COALESCE(NULLIF(TRIM(cf.model_name), ''), 'default') AS model_name,
    COALESCE(SUM(cf.tokens), 0) AS tokens,
    qh.warehouse_name,
    qh.user_name,
    qh.execution_status
FROM cortex_functions_query_usage_history cf
JOIN query_history qh ON cf.query_id = qh.query_id
WHERE date(qh.start_time) BETWEEN ?1 AND ?2
GROUP BY cf.query_id, cf.function_name, 9
ORDER BY credits DESC, cf.query_id
LIMIT ?3
"#;

pub const CLOUD_SERVICES: &str = r#"
SELECT
    date(start_time) AS usage_date,
    COALESCE(query_type, 'UNKNOWN') AS query_type,
    warehouse_name,
    SUM(credits_used_cloud_services) AS cs_credits,
    COUNT(*) AS query_count,
    AVG(compilation_time) / 1000.0 AS avg_compilation_seconds
FROM query_history
WHERE date(start_time) BETWEEN ?1 AND ?2
  AND credits_used_cloud_services > 0
GROUP BY 1, 2, 3
ORDER BY 1 DESC, 4 DESC, 2
"#;

pub const RESOURCE_UTILIZATION: &str = r#"
SELECT
    warehouse_name,
    date(start_time) AS usage_date,
    COUNT(DISTINCT query_id) AS unique_queries,
    AVG(execution_time) / 1000.0 AS avg_execution_seconds,
    AVG(compilation_time) / 1000.0 AS avg_compilation_seconds,
    SUM(CASE WHEN execution_status = 'FAILED' THEN 1 ELSE 0 END) AS failed_queries,
    SUM(CASE WHEN execution_status = 'SUCCESS' THEN 1 ELSE 0 END) AS successful_queries,
    AVG(bytes_scanned) / 1073741824.0 AS avg_gb_scanned,
    SUM(CASE WHEN COALESCE(bytes_spilled_to_local_storage, 0) > 0 OR COALESCE(bytes_spilled_to_remote_storage, 0) > 0 THEN 1 ELSE 0 END) AS queries_with_spillage
FROM query_history
WHERE date(start_time) BETWEEN ?1 AND ?2
  AND warehouse_name IS NOT NULL
GROUP BY 1, 2
ORDER BY 2 DESC, 3 DESC, 1
"#;
