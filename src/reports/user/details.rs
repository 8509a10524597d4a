use rust_decimal::Decimal;

use crate::error::Result;
use crate::reports::admin::AI_FUNCTIONS;
use crate::reports::report::{format_count, format_credits};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Table};

const SPILLAGE_TABLE: &str = "Spilled queries";
const QUERIES_TABLE: &str = "Queries";
const EXPENSIVE_TABLE: &str = "Most expensive queries";
const EXPENSIVE_AI_TABLE: &str = "Most expensive AI queries";

const BYTES_PER_GB: f64 = 1_073_741_824.0;

pub(super) async fn spillage(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let limit = PageContext::limit(ctx.settings().detail_row_limit);
    let spilled = ctx.fetch_with(queries::SPILLED_QUERIES, &[limit]).await?;

    let remote: f64 = spilled.rows().map(|row| row.float("remote_spillage")).sum();
    let local: f64 = spilled.rows().map(|row| row.float("local_spillage")).sum();
    report.metric("Queries with Spillage", format_count(spilled.len() as u64));
    report.metric("Remote Spillage GB", format!("{:.3}", remote / BYTES_PER_GB));
    report.metric("Local Spillage GB", format!("{:.3}", local / BYTES_PER_GB));

    report.push_table(Table::from_result_set(SPILLAGE_TABLE, spilled));
    report.chart(ChartSpec::new(
        ChartKind::StackedBar,
        "Spillage by day (bytes)",
        SPILLAGE_TABLE,
        "usage_date",
        &["remote_spillage", "local_spillage"],
    ));
    Ok(())
}

pub(super) async fn query_details(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let limit = PageContext::limit(ctx.settings().detail_row_limit);
    let details = ctx.fetch_with(queries::QUERY_DETAILS, &[limit]).await?;

    let failed = details
        .rows()
        .filter(|row| row.text("execution_status") == "FAILED")
        .count();
    report.metric("Queries", format_count(details.len() as u64));
    report.metric("Failed Queries", format_count(failed as u64));

    report.push_table(Table::from_result_set(QUERIES_TABLE, details));
    Ok(())
}

pub(super) async fn expensive_queries(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let limit = PageContext::limit(ctx.settings().problem_query_limit);

    let expensive = ctx
        .fetch_with(queries::EXPENSIVE_QUERIES, &[limit.clone()])
        .await?;
    let top = expensive
        .first()
        .map(|row| row.decimal("credits"))
        .unwrap_or(Decimal::ZERO);
    report.metric("Top Query Credits", format_credits(top, 4));
    report.push_table(Table::from_result_set(EXPENSIVE_TABLE, expensive));
    report.chart(
        ChartSpec::new(
            ChartKind::Bar,
            "Credits of the most expensive queries",
            EXPENSIVE_TABLE,
            "query_id",
            &["credits"],
        )
        .with_color("warehouse_name"),
    );

    if let Some(expensive_ai) = ctx
        .fetch_optional_with(AI_FUNCTIONS, queries::EXPENSIVE_AI_QUERIES, &[limit], report)
        .await?
    {
        let top = expensive_ai
            .first()
            .map(|row| row.decimal("credits"))
            .unwrap_or(Decimal::ZERO);
        report.metric("Top AI Query Credits", format_credits(top, 4));
        report.push_table(Table::from_result_set(EXPENSIVE_AI_TABLE, expensive_ai));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::app::config::AnalysisConfig;
    use crate::reports::{render, Page, Report, UserPage};
    use crate::storage::fixture::{drop_ai_views, empty_mirror, march_range, seeded_mirror};
    use crate::storage::{Database, SqliteEngine};

    async fn page_report(db: &Database, page: UserPage, settings: &AnalysisConfig) -> Report {
        let engine = SqliteEngine::new(db.get_pool());
        render(&engine, Page::User(page), march_range(), settings)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_spillage_orders_remote_first() {
        let (db, _temp_dir) = seeded_mirror().await;
        let report = page_report(&db, UserPage::SpillageAnalysis, &AnalysisConfig::default()).await;

        let spilled = report.table("Spilled queries").unwrap();
        assert_eq!(
            spilled.values("query_id"),
            vec![&Value::from("q4"), &Value::from("q2")]
        );
        assert_eq!(spilled.values("url")[0], &Value::from("https://app/q4"));
        assert_eq!(report.metric_value("Queries with Spillage"), Some("2"));
    }

    #[tokio::test]
    async fn test_query_details_respect_limit() {
        let (db, _temp_dir) = seeded_mirror().await;
        let settings = AnalysisConfig {
            detail_row_limit: 3,
            ..AnalysisConfig::default()
        };
        let report = page_report(&db, UserPage::QueryDetails, &settings).await;

        let details = report.table("Queries").unwrap();
        assert_eq!(details.len(), 3);
        assert_eq!(details.values("query_id")[0], &Value::from("q5"));
        assert_eq!(details.values("execution_time_seconds")[0], &Value::from(3.1));
    }

    #[tokio::test]
    async fn test_empty_details_keep_columns() {
        let (db, _temp_dir) = empty_mirror().await;
        let report = page_report(&db, UserPage::QueryDetails, &AnalysisConfig::default()).await;

        let details = report.table("Queries").unwrap();
        assert!(details.is_empty());
        assert!(details.column("query_text").is_some());
        assert_eq!(report.metric_value("Queries"), Some("0"));
    }

    #[tokio::test]
    async fn test_expensive_queries() {
        let (db, _temp_dir) = seeded_mirror().await;
        let report = page_report(&db, UserPage::ExpensiveQueries, &AnalysisConfig::default()).await;

        let expensive = report.table("Most expensive queries").unwrap();
        assert_eq!(expensive.values("query_id")[0], &Value::from("q3"));
        assert_eq!(report.metric_value("Top Query Credits"), Some("3.1000"));

        let ai = report.table("Most expensive AI queries").unwrap();
        assert_eq!(ai.values("query_id")[0], &Value::from("q5"));
    }

    #[tokio::test]
    async fn test_expensive_queries_without_ai() {
        let (db, _temp_dir) = seeded_mirror().await;
        drop_ai_views(&db).await;
        let report = page_report(&db, UserPage::ExpensiveQueries, &AnalysisConfig::default()).await;

        assert!(report.table("Most expensive queries").is_some());
        assert!(report.table("Most expensive AI queries").is_none());
        assert_eq!(report.notices.len(), 1);
    }
}
