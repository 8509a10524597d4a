use chrono::NaiveDate;
use tracing::debug;

use crate::error::Result;
use crate::reports::report::{decimal_cell, format_credits, text_cell};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Severity, Table};
use crate::rollup::forecast::projected_decimal;
use crate::rollup::{forecast, DailyCredits, TrendDirection};

const DAILY_TABLE: &str = "Daily credits";
const PROJECTION_TABLE: &str = "Projected daily credits";
const SCENARIO_TABLE: &str = "Monthly scenarios";

pub(super) async fn render(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let rows = ctx.fetch(queries::FORECAST_DAILY).await?;

    let mut days = Vec::with_capacity(rows.len());
    for row in rows.rows() {
        let raw = row.text("usage_date");
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => days.push(DailyCredits {
                date,
                credits: row.decimal("daily_credits"),
            }),
            Err(e) => debug!("Skipping unparseable usage date '{}': {}", raw, e),
        }
    }

    let Some(forecast) = forecast(&days) else {
        report.finding(Severity::Info, "No usage in this period to forecast from");
        return Ok(());
    };

    report.metric("Total Credits", format_credits(forecast.total_credits, 2));
    report.metric("Days With Usage", forecast.period_days.to_string());
    report.metric("Daily Average", format_credits(forecast.daily_average, 2));
    report.metric("Projected Monthly", format_credits(forecast.projected_monthly, 2));

    let mut table = Table::new(DAILY_TABLE, &["usage_date", "daily_credits"]);
    for day in &days {
        table.push_row(vec![
            text_cell(day.date.format("%Y-%m-%d").to_string()),
            decimal_cell(day.credits, 4),
        ]);
    }
    report.push_table(table);
    report.chart(ChartSpec::new(
        ChartKind::Line,
        "Daily credits",
        DAILY_TABLE,
        "usage_date",
        &["daily_credits"],
    ));

    if forecast.projection.is_empty() {
        report.finding(
            Severity::Info,
            "At least 3 days of usage are needed for a daily projection",
        );
    } else {
        let mut table = Table::new(PROJECTION_TABLE, &["usage_date", "projected_credits"]);
        for day in &forecast.projection {
            table.push_row(vec![
                text_cell(day.date.format("%Y-%m-%d").to_string()),
                decimal_cell(projected_decimal(day.credits), 2),
            ]);
        }
        report.push_table(table);
        report.chart(ChartSpec::new(
            ChartKind::Line,
            "30-day projection",
            PROJECTION_TABLE,
            "usage_date",
            &["projected_credits"],
        ));
    }

    let mut table = Table::new(
        SCENARIO_TABLE,
        &["scenario", "monthly_credits", "vs_current_percent"],
    );
    for scenario in &forecast.scenarios {
        table.push_row(vec![
            text_cell(scenario.name),
            decimal_cell(scenario.monthly_credits, 2),
            decimal_cell(scenario.vs_base_percent, 0),
        ]);
    }
    report.push_table(table);
    report.chart(ChartSpec::new(
        ChartKind::Bar,
        "Monthly cost scenarios",
        SCENARIO_TABLE,
        "scenario",
        &["monthly_credits"],
    ));

    if let Some(trend) = &forecast.trend {
        report.metric("Highest Day", format_credits(trend.highest_day, 2));
        report.metric("Lowest Day", format_credits(trend.lowest_day, 2));
        report.metric("Daily Std Dev", format!("{:.2}", trend.std_dev));

        let (severity, direction) = match trend.direction {
            TrendDirection::Increasing => (Severity::Warning, "increasing"),
            TrendDirection::Decreasing => (Severity::Success, "decreasing"),
            TrendDirection::Stable => (Severity::Info, "stable"),
        };
        report.finding(
            severity,
            format!(
                "Spend is {} ({:+.1}% second half vs first half)",
                direction, trend.change_percent
            ),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::app::config::AnalysisConfig;
    use crate::reports::{render, AdminPage, Page, Report, Severity};
    use crate::rollup::DateRange;
    use crate::storage::fixture::{date, empty_mirror, march_range, seeded_mirror};
    use crate::storage::{Database, SqliteEngine};

    async fn forecast_report(db: &Database, range: DateRange) -> Report {
        let engine = SqliteEngine::new(db.get_pool());
        render(
            &engine,
            Page::Admin(AdminPage::CostForecasting),
            range,
            &AnalysisConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_forecast_from_four_days() {
        let (db, _temp_dir) = seeded_mirror().await;
        let report = forecast_report(&db, march_range()).await;

        let daily = report.table("Daily credits").unwrap();
        assert_eq!(
            daily.values("daily_credits"),
            vec![
                &Value::from(3.53),
                &Value::from(3.13),
                &Value::from(0.54),
                &Value::from(0.3)
            ]
        );

        assert_eq!(report.metric_value("Total Credits"), Some("7.50"));
        // 7.50 over 4 days, times 30
        assert_eq!(report.metric_value("Projected Monthly"), Some("56.25"));
        assert_eq!(report.table("Projected daily credits").unwrap().len(), 30);
        assert_eq!(report.table("Monthly scenarios").unwrap().len(), 5);
        // fewer than 7 days: no trend
        assert_eq!(report.metric_value("Highest Day"), None);
    }

    #[tokio::test]
    async fn test_short_history_has_no_projection() {
        let (db, _temp_dir) = seeded_mirror().await;
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 2)).unwrap();
        let report = forecast_report(&db, range).await;

        assert!(report.table("Projected daily credits").is_none());
        assert_eq!(report.findings[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_empty_period() {
        let (db, _temp_dir) = empty_mirror().await;
        let report = forecast_report(&db, march_range()).await;

        assert!(report.metrics.is_empty());
        assert_eq!(report.findings.len(), 1);
    }
}
