use rust_decimal::Decimal;

use super::long_running_threshold;
use crate::error::Result;
use crate::reports::report::{decimal_cell, float_cell, format_count, format_credits, text_cell};
use crate::reports::{queries, ChartSpec, PageContext, Report, Severity, Table};
use crate::rollup::WasteRates;
use crate::storage::UsageRow;

const RATES_TABLE: &str = "Query health";
const FAILED_TABLE: &str = "Failed queries";
const LONG_RUNNING_TABLE: &str = "Long running queries";
const SPILLAGE_TABLE: &str = "Queries with spillage";

/// Credits assumed lost per failed query when recommending fixes.
fn failed_query_waste() -> Decimal {
    Decimal::new(1, 1)
}

fn rate(part: u64, total: u64) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(total)
}

pub(super) async fn render(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let rates = WasteRates::default();
    let threshold = long_running_threshold(&rates);

    let summary = ctx
        .fetch_with(queries::EFFICIENCY_SUMMARY, &[threshold.clone()])
        .await?;
    let (total, failed, spilled, long_running) = match summary.first() {
        Some(row) => {
            report.metric(
                "Avg Execution Seconds",
                format!("{:.2}", row.float("avg_execution_seconds")),
            );
            report.metric(
                "Avg Compilation Seconds",
                format!("{:.2}", row.float("avg_compilation_seconds")),
            );
            report.metric("Avg GB Scanned", format!("{:.3}", row.float("avg_gb_scanned")));
            report.metric("Query Credits", format_credits(row.decimal("total_credits"), 2));
            (
                row.count("total_queries"),
                row.count("failed_queries"),
                row.count("queries_with_spillage"),
                row.count("long_running_queries"),
            )
        }
        None => (0, 0, 0, 0),
    };

    report.metric("Total Queries", format_count(total));
    report.metric("Failure Rate", format!("{:.1}%", rate(failed, total)));
    report.metric("Spillage Rate", format!("{:.1}%", rate(spilled, total)));
    report.metric("Long Running Rate", format!("{:.1}%", rate(long_running, total)));

    let mut table = Table::new(RATES_TABLE, &["issue", "queries", "rate_percent"]);
    for (issue, count) in [
        ("Failed", failed),
        ("Spillage", spilled),
        ("Long Running", long_running),
    ] {
        table.push_row(vec![
            text_cell(issue),
            count.into(),
            decimal_cell(rate(count, total), 2),
        ]);
    }
    report.push_table(table);
    report.chart(ChartSpec::pie("Query issues", RATES_TABLE, "issue", "queries"));

    if failed > 0 {
        let waste = Decimal::from(failed) * failed_query_waste();
        report.finding(
            Severity::Warning,
            format!(
                "{} failed queries wasted an estimated {} credits; review their error codes",
                failed,
                format_credits(waste, 2)
            ),
        );
    }
    if spilled > 0 {
        report.finding(
            Severity::Warning,
            format!(
                "{} queries spilled to disk; consider a larger warehouse or smaller joins",
                spilled
            ),
        );
    }

    let limit = PageContext::limit(ctx.settings().problem_query_limit);
    let problems = ctx
        .fetch_with(queries::PROBLEM_QUERIES, &[threshold, limit])
        .await?;

    let long_running_seconds = rates.long_running_seconds as f64;
    let mut failed_table = problem_table(FAILED_TABLE);
    let mut long_table = problem_table(LONG_RUNNING_TABLE);
    let mut spill_table = problem_table(SPILLAGE_TABLE);
    for row in problems.rows() {
        if row.text("execution_status") == "FAILED" {
            failed_table.push_row(problem_row(&row));
        }
        if row.float("execution_seconds") > long_running_seconds {
            long_table.push_row(problem_row(&row));
        }
        if row.int("spillage_bytes") > 0 {
            spill_table.push_row(problem_row(&row));
        }
    }

    for table in [failed_table, long_table, spill_table] {
        if table.is_empty() {
            report.finding(
                Severity::Success,
                format!("No {} in this period", table.title.to_lowercase()),
            );
        }
        report.push_table(table);
    }

    Ok(())
}

fn problem_table(title: &str) -> Table {
    Table::new(
        title,
        &[
            "user_name",
            "warehouse_name",
            "execution_seconds",
            "credits",
            "spillage_bytes",
            "execution_status",
            "error_code",
            "query_preview",
            "start_time",
        ],
    )
}

fn problem_row(row: &UsageRow<'_>) -> Vec<serde_json::Value> {
    vec![
        text_cell(row.text("user_name")),
        text_cell(row.text("warehouse_name")),
        float_cell(row.float("execution_seconds"), 2),
        decimal_cell(row.decimal("credits"), 4),
        row.count("spillage_bytes").into(),
        text_cell(row.text("execution_status")),
        row.get("error_code").cloned().unwrap_or(serde_json::Value::Null),
        text_cell(row.text("query_preview")),
        text_cell(row.text("start_time")),
    ]
}
