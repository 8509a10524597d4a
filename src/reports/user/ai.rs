use rust_decimal::Decimal;

use super::AI_ANALYST;
use crate::error::Result;
use crate::reports::admin::AI_FUNCTIONS;
use crate::reports::report::{decimal_cell, format_count, format_credits, text_cell};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Table};

const FUNCTIONS_TABLE: &str = "AI function credits by day";
const ANALYST_TABLE: &str = "AI analyst usage by day";
const DETAILS_TABLE: &str = "AI queries";

pub(super) async fn ai_usage(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    // The two views degrade independently.
    let functions = ctx
        .fetch_optional(AI_FUNCTIONS, queries::AI_FUNCTIONS_DAILY, report)
        .await?;
    let analyst = ctx
        .fetch_optional(AI_ANALYST, queries::ANALYST_DAILY, report)
        .await?;

    let mut function_credits = Decimal::ZERO;
    let mut table = Table::new(
        FUNCTIONS_TABLE,
        &["usage_date", "model_name", "function_name", "credits"],
    );
    for row in functions.iter().flat_map(|rs| rs.rows()) {
        let credits = row.decimal("credits");
        function_credits += credits;
        table.push_row(vec![
            text_cell(row.text("usage_date")),
            text_cell(row.text("model_name")),
            text_cell(row.text("function_name")),
            decimal_cell(credits, 6),
        ]);
    }
    report.push_table(table);

    let mut analyst_credits = Decimal::ZERO;
    let mut analyst_requests = 0u64;
    let mut table = Table::new(ANALYST_TABLE, &["usage_date", "credits", "requests"]);
    for row in analyst.iter().flat_map(|rs| rs.rows()) {
        let credits = row.decimal("credits");
        let requests = row.count("requests");
        analyst_credits += credits;
        analyst_requests += requests;
        table.push_row(vec![
            text_cell(row.text("usage_date")),
            decimal_cell(credits, 6),
            requests.into(),
        ]);
    }
    report.push_table(table);

    report.metric("AI Function Credits", format_credits(function_credits, 4));
    report.metric("Analyst Credits", format_credits(analyst_credits, 4));
    report.metric("Analyst Requests", format_count(analyst_requests));

    report.chart(
        ChartSpec::new(
            ChartKind::StackedBar,
            "AI function credits by model",
            FUNCTIONS_TABLE,
            "usage_date",
            &["credits"],
        )
        .with_color("model_name"),
    );
    report.chart(ChartSpec::new(
        ChartKind::Line,
        "Analyst requests",
        ANALYST_TABLE,
        "usage_date",
        &["requests"],
    ));
    Ok(())
}

pub(super) async fn ai_query_details(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let limit = PageContext::limit(ctx.settings().detail_row_limit);
    let Some(details) = ctx
        .fetch_optional_with(AI_FUNCTIONS, queries::AI_QUERY_DETAILS, &[limit], report)
        .await?
    else {
        report.metric("AI Queries", "0");
        return Ok(());
    };

    let credits: Decimal = details.rows().map(|row| row.decimal("token_credits")).sum();
    let tokens: u64 = details.rows().map(|row| row.count("tokens")).sum();
    report.metric("AI Queries", format_count(details.len() as u64));
    report.metric("Token Credits", format_credits(credits, 4));
    report.metric("Tokens", format_count(tokens));

    report.push_table(Table::from_result_set(DETAILS_TABLE, details));
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::app::config::AnalysisConfig;
    use crate::reports::testing::ScriptedEngine;
    use crate::reports::{render, Page, UserPage};
    use crate::storage::fixture::{drop_ai_views, march_range, seeded_mirror};
    use crate::storage::SqliteEngine;

    #[tokio::test]
    async fn test_ai_usage() {
        let (db, _temp_dir) = seeded_mirror().await;
        let engine = SqliteEngine::new(db.get_pool());
        let report = render(
            &engine,
            Page::User(UserPage::AiUsage),
            march_range(),
            &AnalysisConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.metric_value("AI Function Credits"), Some("0.5000"));
        assert_eq!(report.metric_value("Analyst Credits"), Some("0.2000"));
        assert_eq!(report.metric_value("Analyst Requests"), Some("3"));

        let functions = report.table("AI function credits by day").unwrap();
        assert_eq!(functions.values("model_name")[0], &Value::from("default"));
    }

    #[tokio::test]
    async fn test_analyst_degrades_alone() {
        let (db, _temp_dir) = seeded_mirror().await;
        let engine = ScriptedEngine::new(
            SqliteEngine::new(db.get_pool()),
            &["cortex_analyst_usage_history"],
        );
        let report = render(
            &engine,
            Page::User(UserPage::AiUsage),
            march_range(),
            &AnalysisConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.metric_value("AI Function Credits"), Some("0.5000"));
        assert_eq!(report.metric_value("Analyst Credits"), Some("0.0000"));
        assert_eq!(report.notices.len(), 1);
        assert!(report.notices[0].starts_with("AI analyst usage"));
        assert!(report.table("AI analyst usage by day").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ai_query_details() {
        let (db, _temp_dir) = seeded_mirror().await;
        let engine = SqliteEngine::new(db.get_pool());
        let report = render(
            &engine,
            Page::User(UserPage::AiQueryDetails),
            march_range(),
            &AnalysisConfig::default(),
        )
        .await
        .unwrap();

        let details = report.table("AI queries").unwrap();
        assert_eq!(details.len(), 2);
        // newest first
        assert_eq!(details.values("query_id")[0], &Value::from("q5"));
        assert_eq!(report.metric_value("Tokens"), Some("1,200"));
    }

    #[tokio::test]
    async fn test_ai_query_details_degrade() {
        let (db, _temp_dir) = seeded_mirror().await;
        drop_ai_views(&db).await;
        let engine = SqliteEngine::new(db.get_pool());
        let report = render(
            &engine,
            Page::User(UserPage::AiQueryDetails),
            march_range(),
            &AnalysisConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(report.metric_value("AI Queries"), Some("0"));
        assert!(report.tables.is_empty());
        assert_eq!(report.notices.len(), 1);
    }
}
