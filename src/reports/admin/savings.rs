use rust_decimal::Decimal;

use super::warehouses::{savings_table, warehouse_savings};
use super::{ai_credits, long_running_threshold};
use crate::error::Result;
use crate::reports::report::{decimal_cell, format_credits, text_cell};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Severity, Table};
use crate::rollup::{action_plan, summarize_savings, Priority, QueryWaste, WasteRates};

const CATEGORY_TABLE: &str = "Savings by category";
const PLAN_TABLE: &str = "Action plan";

pub(super) async fn render(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let rates = WasteRates::default();

    let warehouses = warehouse_savings(ctx).await?;

    let waste = ctx
        .fetch_with(queries::QUERY_WASTE, &[long_running_threshold(&rates)])
        .await?;
    let waste = waste
        .first()
        .map(|row| QueryWaste {
            failed_credits: row.decimal("failed_credits"),
            spilled_credits: row.decimal("spilled_credits"),
            long_running_credits: row.decimal("long_running_credits"),
        })
        .unwrap_or_default();

    let ai = ai_credits(ctx, report).await?.unwrap_or(Decimal::ZERO);
    let summary = summarize_savings(&warehouses, &waste, ai, &rates);
    let total = summary.total();

    report.metric("Total Potential Savings", format_credits(total, 2));
    report.metric("Warehouse Savings", format_credits(summary.warehouse, 2));
    report.metric("Query Savings", format_credits(summary.query_total(), 2));
    report.metric("AI Savings", format_credits(summary.ai, 2));

    let well_optimized = total <= Decimal::ZERO;
    if well_optimized {
        report.finding(
            Severity::Success,
            "No significant savings found; the account appears well optimized",
        );
    }

    let mut table = Table::new(CATEGORY_TABLE, &["category", "potential_savings"]);
    for (category, amount) in summary.breakdown() {
        table.push_row(vec![text_cell(category.label()), decimal_cell(amount, 4)]);
    }
    report.push_table(table);
    report.chart(ChartSpec::pie(
        "Savings by category",
        CATEGORY_TABLE,
        "category",
        "potential_savings",
    ));

    report.push_table(savings_table(&warehouses));

    if well_optimized {
        return Ok(());
    }

    let mut table = Table::new(
        PLAN_TABLE,
        &["priority", "action", "estimated_savings", "timeline"],
    );
    for item in action_plan(&summary) {
        let priority = match item.priority {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        table.push_row(vec![
            text_cell(priority),
            text_cell(item.action),
            decimal_cell(item.estimated_savings, 4),
            text_cell(item.timeline),
        ]);
    }
    report.push_table(table);
    report.chart(ChartSpec::new(
        ChartKind::Bar,
        "Savings by action",
        PLAN_TABLE,
        "action",
        &["estimated_savings"],
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::app::config::AnalysisConfig;
    use crate::reports::{render, AdminPage, Page, Report, Severity};
    use crate::storage::fixture::{drop_ai_views, empty_mirror, march_range, seeded_mirror};
    use crate::storage::{Database, SqliteEngine};

    async fn savings_report(db: &Database) -> Report {
        let engine = SqliteEngine::new(db.get_pool());
        render(
            &engine,
            Page::Admin(AdminPage::SavingsOpportunities),
            march_range(),
            &AnalysisConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_category_amounts() {
        let (db, _temp_dir) = seeded_mirror().await;
        let report = savings_report(&db).await;
        let categories = report.table("Savings by category").unwrap();

        assert_eq!(
            categories.values("category"),
            vec![
                &Value::from("Warehouse Optimization"),
                &Value::from("Query Failures"),
                &Value::from("Memory Spillage"),
                &Value::from("Long Queries"),
                &Value::from("AI Optimization"),
            ]
        );
        assert_eq!(
            categories.values("potential_savings"),
            vec![
                &Value::from(1.675),
                &Value::from(0.75),
                &Value::from(0.4),
                &Value::from(0.15),
                &Value::from(0.05),
            ]
        );
        assert_eq!(report.table("Action plan").unwrap().len(), 5);
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn test_missing_ai_only_drops_ai_savings() {
        let (db, _temp_dir) = seeded_mirror().await;
        drop_ai_views(&db).await;
        let report = savings_report(&db).await;

        assert_eq!(report.metric_value("AI Savings"), Some("0.00"));
        assert_eq!(report.metric_value("Warehouse Savings"), Some("1.68"));
        assert_eq!(report.notices.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_save() {
        let (db, _temp_dir) = empty_mirror().await;
        let report = savings_report(&db).await;

        assert_eq!(report.metric_value("Total Potential Savings"), Some("0.00"));
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, Severity::Success);
        assert!(report.table("Action plan").is_none());
        assert!(report.charts.iter().all(|c| c.table != "Action plan"));
    }
}
