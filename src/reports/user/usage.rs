use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::reports::admin::ai_credits;
use crate::reports::report::{decimal_cell, float_cell, format_count, format_credits, text_cell};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Table};

const CATEGORY_TABLE: &str = "Credits by category";
const WAREHOUSE_DAILY_TABLE: &str = "Daily warehouse credits";
const WAREHOUSE_TOTAL_TABLE: &str = "Credits by warehouse";
const CLOUD_DAILY_TABLE: &str = "Cloud services by day";
const CLOUD_TYPE_TABLE: &str = "Cloud services by query type";
const UTILIZATION_TABLE: &str = "Warehouse utilization";

pub(super) async fn home(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let overview = ctx.fetch(queries::USER_OVERVIEW).await?;
    let (total_queries, compute, cloud_services, avg_seconds) = match overview.first() {
        Some(row) => (
            row.count("total_queries"),
            row.decimal("compute_credits"),
            row.decimal("cloud_services_credits"),
            row.float("avg_execution_seconds"),
        ),
        None => (0, Decimal::ZERO, Decimal::ZERO, 0.0),
    };
    let ai = ai_credits(ctx, report).await?.unwrap_or(Decimal::ZERO);

    report.metric("Total Queries", format_count(total_queries));
    report.metric("Total Credits", format_credits(compute + cloud_services + ai, 2));
    report.metric("Compute Credits", format_credits(compute, 2));
    report.metric("Cloud Services Credits", format_credits(cloud_services, 2));
    report.metric("AI Credits", format_credits(ai, 2));
    report.metric("Avg Execution Seconds", format!("{:.2}", avg_seconds));

    let mut table = Table::new(CATEGORY_TABLE, &["category", "credits"]);
    for (category, credits) in [
        ("Compute", compute),
        ("Cloud Services", cloud_services),
        ("AI Functions", ai),
    ] {
        table.push_row(vec![text_cell(category), decimal_cell(credits, 4)]);
    }
    report.push_table(table);
    report.chart(ChartSpec::pie("Credits by category", CATEGORY_TABLE, "category", "credits"));
    Ok(())
}

pub(super) async fn warehouse_usage(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let daily = ctx.fetch(queries::WAREHOUSE_DAILY).await?;

    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut table = Table::new(
        WAREHOUSE_DAILY_TABLE,
        &["usage_date", "warehouse_name", "wh_credits"],
    );
    for row in daily.rows() {
        let warehouse = row.text("warehouse_name");
        let credits = row.decimal("wh_credits");
        *totals.entry(warehouse.clone()).or_default() += credits;
        table.push_row(vec![
            text_cell(row.text("usage_date")),
            text_cell(warehouse),
            decimal_cell(credits, 4),
        ]);
    }
    report.push_table(table);
    report.chart(
        ChartSpec::new(
            ChartKind::StackedBar,
            "Warehouse credits by day",
            WAREHOUSE_DAILY_TABLE,
            "usage_date",
            &["wh_credits"],
        )
        .with_color("warehouse_name"),
    );

    let total: Decimal = totals.values().copied().sum();
    report.metric("Warehouse Credits", format_credits(total, 2));
    report.metric("Warehouses Used", totals.len().to_string());

    let mut ranked: Vec<(String, Decimal)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut table = Table::new(WAREHOUSE_TOTAL_TABLE, &["warehouse_name", "wh_credits"]);
    for (warehouse, credits) in ranked {
        table.push_row(vec![text_cell(warehouse), decimal_cell(credits, 4)]);
    }
    report.push_table(table);
    Ok(())
}

pub(super) async fn cloud_services(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let rows = ctx.fetch(queries::CLOUD_SERVICES).await?;

    let mut by_type: BTreeMap<String, (Decimal, u64)> = BTreeMap::new();
    let mut table = Table::new(
        CLOUD_DAILY_TABLE,
        &[
            "usage_date",
            "query_type",
            "warehouse_name",
            "cs_credits",
            "query_count",
            "avg_compilation_seconds",
        ],
    );
    for row in rows.rows() {
        let query_type = row.text("query_type");
        let credits = row.decimal("cs_credits");
        let count = row.count("query_count");

        let entry = by_type.entry(query_type.clone()).or_default();
        entry.0 += credits;
        entry.1 += count;

        table.push_row(vec![
            text_cell(row.text("usage_date")),
            text_cell(query_type),
            row.get("warehouse_name").cloned().unwrap_or_default(),
            decimal_cell(credits, 6),
            count.into(),
            float_cell(row.float("avg_compilation_seconds"), 3),
        ]);
    }
    report.push_table(table);

    let total: Decimal = by_type.values().map(|(credits, _)| *credits).sum();
    report.metric("Cloud Services Credits", format_credits(total, 4));

    let mut ranked: Vec<(String, (Decimal, u64))> = by_type.into_iter().collect();
    ranked.sort_by(|a, b| (b.1).0.cmp(&(a.1).0).then_with(|| a.0.cmp(&b.0)));

    let mut by_type_table = Table::new(CLOUD_TYPE_TABLE, &["query_type", "cs_credits", "query_count"]);
    for (query_type, (credits, count)) in ranked {
        by_type_table.push_row(vec![
            text_cell(query_type),
            decimal_cell(credits, 6),
            count.into(),
        ]);
    }
    report.push_table(by_type_table);

    report.chart(ChartSpec::pie(
        "Cloud services credits by query type",
        CLOUD_TYPE_TABLE,
        "query_type",
        "cs_credits",
    ));
    report.chart(
        ChartSpec::new(
            ChartKind::StackedBar,
            "Cloud services credits by day",
            CLOUD_DAILY_TABLE,
            "usage_date",
            &["cs_credits"],
        )
        .with_color("query_type"),
    );
    Ok(())
}

pub(super) async fn resource_utilization(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let rows = ctx.fetch(queries::RESOURCE_UTILIZATION).await?;

    let mut successful_total = 0u64;
    let mut failed_total = 0u64;
    let mut table = Table::new(
        UTILIZATION_TABLE,
        &[
            "warehouse_name",
            "usage_date",
            "unique_queries",
            "avg_execution_seconds",
            "avg_compilation_seconds",
            "failed_queries",
            "successful_queries",
            "success_rate_percent",
            "avg_gb_scanned",
            "queries_with_spillage",
        ],
    );
    for row in rows.rows() {
        let successful = row.count("successful_queries");
        let failed = row.count("failed_queries");
        successful_total += successful;
        failed_total += failed;

        table.push_row(vec![
            text_cell(row.text("warehouse_name")),
            text_cell(row.text("usage_date")),
            row.count("unique_queries").into(),
            float_cell(row.float("avg_execution_seconds"), 2),
            float_cell(row.float("avg_compilation_seconds"), 3),
            failed.into(),
            successful.into(),
            float_cell(success_rate(successful, failed), 1),
            float_cell(row.float("avg_gb_scanned"), 3),
            row.count("queries_with_spillage").into(),
        ]);
    }
    report.push_table(table);

    report.metric(
        "Success Rate",
        format!("{:.1}%", success_rate(successful_total, failed_total)),
    );
    report.metric("Failed Queries", format_count(failed_total));

    report.chart(
        ChartSpec::new(
            ChartKind::Scatter,
            "Query volume vs execution time",
            UTILIZATION_TABLE,
            "unique_queries",
            &["avg_execution_seconds"],
        )
        .with_color("warehouse_name")
        .with_size("avg_gb_scanned"),
    );
    report.chart(
        ChartSpec::new(
            ChartKind::Bar,
            "Spilling queries by day",
            UTILIZATION_TABLE,
            "usage_date",
            &["queries_with_spillage"],
        )
        .with_color("warehouse_name"),
    );
    Ok(())
}

/// Successful share of finished queries, in percent.
fn success_rate(successful: u64, failed: u64) -> f64 {
    let finished = successful + failed;
    if finished == 0 {
        return 0.0;
    }
    successful as f64 * 100.0 / finished as f64
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::success_rate;
    use crate::app::config::AnalysisConfig;
    use crate::reports::{render, Page, Report, UserPage};
    use crate::storage::fixture::{drop_ai_views, march_range, seeded_mirror};
    use crate::storage::{Database, SqliteEngine};

    async fn user_report(db: &Database, page: UserPage) -> Report {
        let engine = SqliteEngine::new(db.get_pool());
        render(&engine, Page::User(page), march_range(), &AnalysisConfig::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(4, 1), 80.0);
    }

    #[tokio::test]
    async fn test_home_metrics() {
        let (db, _temp_dir) = seeded_mirror().await;
        let report = user_report(&db, UserPage::Home).await;

        assert_eq!(report.metric_value("Total Queries"), Some("5"));
        assert_eq!(report.metric_value("Compute Credits"), Some("7.25"));
        assert_eq!(report.metric_value("AI Credits"), Some("0.50"));
    }

    #[tokio::test]
    async fn test_home_without_ai() {
        let (db, _temp_dir) = seeded_mirror().await;
        drop_ai_views(&db).await;
        let report = user_report(&db, UserPage::Home).await;

        assert_eq!(report.metric_value("AI Credits"), Some("0.00"));
        assert_eq!(report.notices.len(), 1);
    }

    #[tokio::test]
    async fn test_warehouse_usage() {
        let (db, _temp_dir) = seeded_mirror().await;
        let report = user_report(&db, UserPage::WarehouseUsage).await;

        assert_eq!(report.table("Daily warehouse credits").unwrap().len(), 4);
        let totals = report.table("Credits by warehouse").unwrap();
        assert_eq!(
            totals.values("warehouse_name"),
            vec![&Value::from("WH_A"), &Value::from("WH_B"), &Value::from("WH_C")]
        );
        assert_eq!(report.charts[0].color.as_deref(), Some("warehouse_name"));
    }

    #[tokio::test]
    async fn test_cloud_services_by_type() {
        let (db, _temp_dir) = seeded_mirror().await;
        let report = user_report(&db, UserPage::CloudServices).await;

        let by_type = report.table("Cloud services by query type").unwrap();
        // SELECT: q1, q2, q4, q5; INSERT: q3
        assert_eq!(
            by_type.values("query_type"),
            vec![&Value::from("SELECT"), &Value::from("INSERT")]
        );
        assert_eq!(by_type.values("query_count")[0], &Value::from(4u64));
        assert_eq!(by_type.values("cs_credits")[0], &Value::from(0.12));
    }

    #[tokio::test]
    async fn test_resource_utilization_success_rate() {
        let (db, _temp_dir) = seeded_mirror().await;
        let report = user_report(&db, UserPage::ResourceUtilization).await;

        assert_eq!(report.metric_value("Success Rate"), Some("80.0%"));
        let table = report.table("Warehouse utilization").unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(report.charts[0].size.as_deref(), Some("avg_gb_scanned"));
    }
}
