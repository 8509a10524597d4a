use rust_decimal::Decimal;

use crate::error::Result;
use crate::reports::report::{decimal_cell, float_cell, format_credits, text_cell};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Severity, Table};
use crate::rollup::{
    above_percentile, p75, percentile, rollup_groups, GroupRollup, GroupUsage, SavingsRuleSet,
};

const SUMMARY_TABLE: &str = "Warehouse summary";
const SAVINGS_TABLE: &str = "Warehouse savings";

/// Warehouses averaging fewer daily users than this are underutilized.
const LOW_UTILIZATION_USERS: f64 = 2.0;

struct WarehouseSummary {
    name: String,
    total_credits: Decimal,
    avg_daily_credits: Decimal,
    total_queries: u64,
    avg_execution_seconds: f64,
    avg_daily_users: f64,
    active_days: u64,
    peak_daily_credits: Decimal,
    credits_per_query: Decimal,
}

pub(super) async fn render(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let summary: Vec<WarehouseSummary> = ctx
        .fetch(queries::WAREHOUSE_SUMMARY)
        .await?
        .rows()
        .map(|row| {
            let total_credits = row.decimal("total_credits");
            let total_queries = row.count("total_queries");
            WarehouseSummary {
                name: row.text("warehouse_name"),
                total_credits,
                avg_daily_credits: row.decimal("avg_daily_credits"),
                total_queries,
                avg_execution_seconds: row.float("avg_execution_seconds"),
                avg_daily_users: row.float("avg_daily_users"),
                active_days: row.count("active_days"),
                peak_daily_credits: row.decimal("peak_daily_credits"),
                credits_per_query: crate::rollup::credits_per_unit(total_credits, total_queries),
            }
        })
        .collect();

    let total: Decimal = summary.iter().map(|w| w.total_credits).sum();
    report.metric("Active Warehouses", summary.len().to_string());
    report.metric("Warehouse Credits", format_credits(total, 2));

    let mut table = Table::new(
        SUMMARY_TABLE,
        &[
            "warehouse_name",
            "total_credits",
            "avg_daily_credits",
            "peak_daily_credits",
            "total_queries",
            "credits_per_query",
            "avg_execution_seconds",
            "avg_daily_users",
            "active_days",
        ],
    );
    for warehouse in &summary {
        table.push_row(vec![
            text_cell(warehouse.name.as_str()),
            decimal_cell(warehouse.total_credits, 4),
            decimal_cell(warehouse.avg_daily_credits, 4),
            decimal_cell(warehouse.peak_daily_credits, 4),
            warehouse.total_queries.into(),
            decimal_cell(warehouse.credits_per_query, 4),
            float_cell(warehouse.avg_execution_seconds, 2),
            float_cell(warehouse.avg_daily_users, 1),
            warehouse.active_days.into(),
        ]);
    }
    report.push_table(table);
    report.chart(ChartSpec::new(
        ChartKind::Bar,
        "Credits by warehouse",
        SUMMARY_TABLE,
        "warehouse_name",
        &["total_credits"],
    ));
    report.chart(
        ChartSpec::new(
            ChartKind::Scatter,
            "Execution time vs cost per query",
            SUMMARY_TABLE,
            "avg_execution_seconds",
            &["credits_per_query"],
        )
        .with_color("warehouse_name")
        .with_size("total_credits"),
    );

    let costs: Vec<Decimal> = summary.iter().map(|w| w.credits_per_query).collect();
    if let Some(cutoff) = percentile(&costs, p75()) {
        for warehouse in above_percentile(&summary, p75(), |w| w.credits_per_query) {
            report.finding(
                Severity::Warning,
                format!(
                    "{} costs {} credits per query, above the 75th percentile of {}",
                    warehouse.name,
                    format_credits(warehouse.credits_per_query, 4),
                    format_credits(cutoff, 4)
                ),
            );
        }
    }

    for warehouse in summary
        .iter()
        .filter(|w| w.avg_daily_users < LOW_UTILIZATION_USERS)
    {
        report.finding(
            Severity::Info,
            format!(
                "{} averages {:.1} users per active day; consider consolidating it",
                warehouse.name, warehouse.avg_daily_users
            ),
        );
    }

    let rollups = warehouse_savings(ctx).await?;
    let savings: Decimal = rollups.iter().map(|r| r.savings.amount).sum();
    report.metric("Potential Warehouse Savings", format_credits(savings, 2));
    report.push_table(savings_table(&rollups));
    Ok(())
}

/// Savings-rule evaluation of every warehouse over the whole period.
pub(crate) async fn warehouse_savings(ctx: &PageContext<'_>) -> Result<Vec<GroupRollup>> {
    let groups: Vec<GroupUsage> = ctx
        .fetch(queries::WAREHOUSE_USAGE)
        .await?
        .rows()
        .map(|row| {
            GroupUsage::new(
                row.text("warehouse_name"),
                row.decimal("total_credits"),
                row.count("total_queries"),
            )
            .with_unique_users(row.float("unique_users"))
            .with_avg_execution_seconds(row.float("avg_execution_seconds"))
        })
        .collect();

    Ok(rollup_groups(&groups, &SavingsRuleSet::warehouse()))
}

pub(crate) fn savings_table(rollups: &[GroupRollup]) -> Table {
    let mut table = Table::new(
        SAVINGS_TABLE,
        &[
            "warehouse_name",
            "credits",
            "credits_per_query",
            "rule",
            "savings_fraction",
            "potential_savings",
            "recommendation",
        ],
    );
    for rollup in rollups {
        table.push_row(vec![
            text_cell(rollup.key.as_str()),
            decimal_cell(rollup.credits, 4),
            decimal_cell(rollup.credits_per_unit, 4),
            rollup
                .savings
                .rule
                .as_deref()
                .map(text_cell)
                .unwrap_or(serde_json::Value::Null),
            decimal_cell(rollup.savings.fraction, 2),
            decimal_cell(rollup.savings.amount, 4),
            text_cell(rollup.savings.recommendation.as_str()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::app::config::AnalysisConfig;
    use crate::reports::{render, AdminPage, Page, Severity};
    use crate::storage::fixture::{march_range, seeded_mirror};
    use crate::storage::SqliteEngine;

    async fn warehouse_report() -> crate::reports::Report {
        let (db, _temp_dir) = seeded_mirror().await;
        let engine = SqliteEngine::new(db.get_pool());
        render(
            &engine,
            Page::Admin(AdminPage::WarehouseOptimization),
            march_range(),
            &AnalysisConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_summary_ordering_and_cost_per_query() {
        let report = warehouse_report().await;
        let summary = report.table("Warehouse summary").unwrap();

        assert_eq!(
            summary.values("warehouse_name"),
            vec![&Value::from("WH_A"), &Value::from("WH_B"), &Value::from("WH_C")]
        );
        assert_eq!(summary.values("credits_per_query")[0], &Value::from(1.75));
        assert_eq!(summary.values("credits_per_query")[1], &Value::from(1.625));
    }

    #[tokio::test]
    async fn test_outliers_and_low_utilization() {
        let report = warehouse_report().await;

        let warnings: Vec<&str> = report
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("WH_A"));

        let low: Vec<&str> = report
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Info)
            .map(|f| f.message.as_str())
            .collect();
        assert_eq!(low.len(), 2);
        assert!(low[0].starts_with("WH_B"));
        assert!(low[1].starts_with("WH_C"));
    }

    #[tokio::test]
    async fn test_savings_rules_first_match() {
        let report = warehouse_report().await;
        let savings = report.table("Warehouse savings").unwrap();

        // WH_C has 0.5 credits and is not a candidate
        assert_eq!(
            savings.values("warehouse_name"),
            vec![&Value::from("WH_B"), &Value::from("WH_A")]
        );
        assert_eq!(savings.values("rule")[0], &Value::from("low_utilization"));
        assert_eq!(savings.values("potential_savings")[0], &Value::from(0.975));
        assert_eq!(savings.values("rule")[1], &Value::from("long_execution"));
        assert_eq!(savings.values("potential_savings")[1], &Value::from(0.7));
        assert_eq!(report.metric_value("Potential Warehouse Savings"), Some("1.68"));
    }
}
