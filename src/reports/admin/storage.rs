use rust_decimal::Decimal;

use crate::error::Result;
use crate::reports::report::{
    decimal_cell, float_cell, format_count, format_credits, preview, text_cell,
};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Table};

const SCANNING_TABLE: &str = "Daily data scanning";
const LARGE_SCANS_TABLE: &str = "Largest scans";
const PREVIEW_CHARS: usize = 100;

pub(super) async fn render(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let scanning = ctx.fetch(queries::DATA_SCANNING).await?;

    let mut tb_scanned = 0.0;
    let mut queries_scanning = 0u64;
    let mut credits = Decimal::ZERO;

    let mut table = Table::new(
        SCANNING_TABLE,
        &["usage_date", "tb_scanned", "queries_scanning", "avg_gb_per_query", "credits"],
    );
    for row in scanning.rows() {
        tb_scanned += row.float("tb_scanned");
        queries_scanning += row.count("queries_scanning");
        credits += row.decimal("credits");
        table.push_row(vec![
            text_cell(row.text("usage_date")),
            float_cell(row.float("tb_scanned"), 6),
            row.count("queries_scanning").into(),
            float_cell(row.float("avg_gb_per_query"), 3),
            decimal_cell(row.decimal("credits"), 4),
        ]);
    }

    let avg_gb = if queries_scanning > 0 {
        tb_scanned * 1024.0 / queries_scanning as f64
    } else {
        0.0
    };
    report.metric("TB Scanned", format!("{:.4}", tb_scanned));
    report.metric("Queries Scanning Data", format_count(queries_scanning));
    report.metric("Avg GB per Query", format!("{:.2}", avg_gb));
    report.metric("Scan Credits", format_credits(credits, 2));

    report.push_table(table);
    report.chart(ChartSpec::new(
        ChartKind::Line,
        "Data scanned per day (TB)",
        SCANNING_TABLE,
        "usage_date",
        &["tb_scanned"],
    ));
    report.chart(ChartSpec::new(
        ChartKind::Bar,
        "Scan credits per day",
        SCANNING_TABLE,
        "usage_date",
        &["credits"],
    ));

    let limit = PageContext::limit(ctx.settings().large_scan_limit);
    let scans = ctx.fetch_with(queries::LARGE_SCANS, &[limit]).await?;

    let mut table = Table::new(
        LARGE_SCANS_TABLE,
        &[
            "user_name",
            "query_preview",
            "gb_scanned",
            "credits",
            "execution_seconds",
            "start_time",
        ],
    );
    for row in scans.rows() {
        table.push_row(vec![
            text_cell(row.text("user_name")),
            text_cell(preview(&row.text("query_text"), PREVIEW_CHARS)),
            float_cell(row.float("gb_scanned"), 3),
            decimal_cell(row.decimal("credits"), 4),
            float_cell(row.float("execution_seconds"), 2),
            text_cell(row.text("start_time")),
        ]);
    }
    report.push_table(table);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::app::config::AnalysisConfig;
    use crate::reports::{render, AdminPage, Page};
    use crate::storage::fixture::{march_range, seeded_mirror};
    use crate::storage::SqliteEngine;

    #[tokio::test]
    async fn test_scanning_and_largest_scans() {
        let (db, _temp_dir) = seeded_mirror().await;
        let engine = SqliteEngine::new(db.get_pool());
        let settings = AnalysisConfig {
            large_scan_limit: 2,
            ..AnalysisConfig::default()
        };

        let report = render(
            &engine,
            Page::Admin(AdminPage::StorageDataCosts),
            march_range(),
            &settings,
        )
        .await
        .unwrap();

        let daily = report.table("Daily data scanning").unwrap();
        assert_eq!(
            daily.values("usage_date"),
            vec![&Value::from("2024-03-01"), &Value::from("2024-03-03")]
        );
        assert_eq!(daily.values("queries_scanning")[0], &Value::from(2u64));
        assert_eq!(report.metric_value("Queries Scanning Data"), Some("3"));
        // 3.5 GB over 3 queries
        assert_eq!(report.metric_value("Avg GB per Query"), Some("1.17"));

        let scans = report.table("Largest scans").unwrap();
        assert_eq!(scans.len(), 2);
        assert_eq!(scans.values("user_name")[0], &Value::from("bob"));
        assert_eq!(scans.values("gb_scanned")[0], &Value::from(2.0));
    }

    #[tokio::test]
    async fn test_query_preview_is_truncated() {
        let (db, _temp_dir) = seeded_mirror().await;
        sqlx::query("UPDATE query_history SET query_text = ? WHERE query_id = 'q2'")
            .bind("x".repeat(150))
            .execute(db.pool())
            .await
            .unwrap();
        let engine = SqliteEngine::new(db.get_pool());

        let report = render(
            &engine,
            Page::Admin(AdminPage::StorageDataCosts),
            march_range(),
            &AnalysisConfig::default(),
        )
        .await
        .unwrap();

        let scans = report.table("Largest scans").unwrap();
        let first = scans.values("query_preview")[0].as_str().unwrap();
        assert_eq!(first.len(), 103);
        assert!(first.ends_with("..."));
    }
}
