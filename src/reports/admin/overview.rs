use rust_decimal::Decimal;
use tracing::debug;

use super::account_totals;
use crate::error::Result;
use crate::reports::report::{decimal_cell, format_credits, text_cell};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Table};
use crate::rollup::CostTotals;

const BREAKDOWN_TABLE: &str = "Cost breakdown by category";
const DAILY_TABLE: &str = "Daily costs";

pub(super) async fn home(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let totals = account_totals(ctx, report).await?;
    push_total_metrics(report, &totals);
    report.push_table(breakdown_table(&totals));
    Ok(())
}

pub(super) async fn cost_overview(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let totals = account_totals(ctx, report).await?;
    push_total_metrics(report, &totals);

    let daily = ctx.fetch(queries::DAILY_COSTS).await?;
    debug!("Daily cost rows: {}", daily.len());

    let mut table = Table::new(
        DAILY_TABLE,
        &[
            "usage_date",
            "compute_credits",
            "cloud_services_credits",
            "active_users",
            "active_warehouses",
        ],
    );
    for row in daily.rows() {
        table.push_row(vec![
            text_cell(row.text("usage_date")),
            decimal_cell(row.decimal("compute_credits"), 4),
            decimal_cell(row.decimal("cloud_services_credits"), 4),
            row.count("active_users").into(),
            row.count("active_warehouses").into(),
        ]);
    }
    report.push_table(table);

    report.chart(ChartSpec::new(
        ChartKind::StackedBar,
        "Daily credit consumption",
        DAILY_TABLE,
        "usage_date",
        &["compute_credits", "cloud_services_credits"],
    ));
    report.chart(ChartSpec::new(
        ChartKind::Line,
        "Daily active users",
        DAILY_TABLE,
        "usage_date",
        &["active_users"],
    ));

    report.push_table(breakdown_table(&totals));
    report.chart(ChartSpec::pie(
        "Cost breakdown by category",
        BREAKDOWN_TABLE,
        "category",
        "credits",
    ));
    Ok(())
}

fn push_total_metrics(report: &mut Report, totals: &CostTotals) {
    report.metric("Total Credits", format_credits(totals.total(), 2));
    report.metric("Compute Credits", format_credits(totals.compute, 2));
    report.metric("Cloud Services Credits", format_credits(totals.cloud_services, 2));
    report.metric("AI Credits", format_credits(totals.ai, 2));
}

fn breakdown_table(totals: &CostTotals) -> Table {
    let total = totals.total();
    let mut table = Table::new(BREAKDOWN_TABLE, &["category", "credits", "share_percent"]);
    for (category, credits) in totals.breakdown() {
        let share = if total > Decimal::ZERO {
            credits * Decimal::ONE_HUNDRED / total
        } else {
            Decimal::ZERO
        };
        table.push_row(vec![
            text_cell(category),
            decimal_cell(credits, 4),
            decimal_cell(share, 1),
        ]);
    }
    table
}
