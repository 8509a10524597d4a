use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::AI_FUNCTIONS;
use crate::error::Result;
use crate::reports::report::{decimal_cell, float_cell, format_credits, text_cell};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Severity, Table};
use crate::rollup::{above_percentile, credits_per_unit, p90, percentile, GroupUsage};

const USER_TABLE: &str = "User costs";

/// Users with more failed queries than this are called out.
const FAILED_QUERY_ALERT: u64 = 10;
const MAX_OUTLIER_FINDINGS: usize = 5;

#[derive(Default)]
struct UserCost {
    name: String,
    compute_credits: Decimal,
    cloud_services_credits: Decimal,
    ai_credits: Decimal,
    total_queries: u64,
    ai_queries: u64,
    warehouses_used: u64,
    avg_execution_seconds: f64,
    failed_queries: u64,
    active_days: u64,
}

impl UserCost {
    fn total_credits(&self) -> Decimal {
        self.compute_credits + self.cloud_services_credits + self.ai_credits
    }

    fn credits_per_query(&self) -> Decimal {
        credits_per_unit(self.total_credits(), self.total_queries + self.ai_queries)
    }

    fn failure_rate(&self) -> Decimal {
        GroupUsage::new(self.name.as_str(), self.total_credits(), self.total_queries)
            .with_failed_units(self.failed_queries)
            .failure_rate()
    }
}

pub(super) async fn render(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let mut users: BTreeMap<String, UserCost> = BTreeMap::new();

    for row in ctx.fetch(queries::USER_COSTS).await?.rows() {
        let name = row.text("user_name");
        let user = users.entry(name.clone()).or_default();
        user.name = name;
        user.compute_credits = row.decimal("compute_credits");
        user.cloud_services_credits = row.decimal("cloud_services_credits");
        user.total_queries = row.count("total_queries");
        user.warehouses_used = row.count("warehouses_used");
        user.avg_execution_seconds = row.float("avg_execution_seconds");
        user.failed_queries = row.count("failed_queries");
        user.active_days = row.count("active_days");
    }

    if let Some(ai) = ctx
        .fetch_optional(AI_FUNCTIONS, queries::USER_AI_COSTS, report)
        .await?
    {
        // AI usage only enriches users with compute activity in the range.
        for row in ai.rows() {
            if let Some(user) = users.get_mut(&row.text("user_name")) {
                user.ai_credits = row.decimal("ai_credits");
                user.ai_queries = row.count("ai_queries");
            }
        }
    }

    let mut users: Vec<UserCost> = users.into_values().collect();
    users.sort_by(|a, b| {
        b.total_credits()
            .cmp(&a.total_credits())
            .then_with(|| a.name.cmp(&b.name))
    });

    let total: Decimal = users.iter().map(UserCost::total_credits).sum();
    report.metric("Active Users", users.len().to_string());
    report.metric("User Credits", format_credits(total, 2));
    if let Some(top) = users.first() {
        report.metric("Top User Cost", format_credits(top.total_credits(), 2));
        report.metric(
            "Average Credits per User",
            format_credits(total / Decimal::from(users.len()), 2),
        );
    }

    let mut table = Table::new(
        USER_TABLE,
        &[
            "user_name",
            "total_credits",
            "compute_credits",
            "cloud_services_credits",
            "ai_credits",
            "total_queries",
            "ai_queries",
            "credits_per_query",
            "warehouses_used",
            "avg_execution_seconds",
            "failed_queries",
            "failure_rate_percent",
            "active_days",
        ],
    );
    for user in &users {
        table.push_row(vec![
            text_cell(user.name.as_str()),
            decimal_cell(user.total_credits(), 4),
            decimal_cell(user.compute_credits, 4),
            decimal_cell(user.cloud_services_credits, 4),
            decimal_cell(user.ai_credits, 4),
            user.total_queries.into(),
            user.ai_queries.into(),
            decimal_cell(user.credits_per_query(), 4),
            user.warehouses_used.into(),
            float_cell(user.avg_execution_seconds, 2),
            user.failed_queries.into(),
            decimal_cell(user.failure_rate(), 1),
            user.active_days.into(),
        ]);
    }
    report.push_table(table);
    report.chart(ChartSpec::new(
        ChartKind::StackedBar,
        "Credits by user",
        USER_TABLE,
        "user_name",
        &["compute_credits", "cloud_services_credits", "ai_credits"],
    ));

    let per_query: Vec<Decimal> = users.iter().map(UserCost::credits_per_query).collect();
    if let Some(cutoff) = percentile(&per_query, p90()) {
        let mut outliers = above_percentile(&users, p90(), UserCost::credits_per_query);
        outliers.sort_by(|a, b| {
            b.credits_per_query()
                .cmp(&a.credits_per_query())
                .then_with(|| a.name.cmp(&b.name))
        });
        for user in outliers.into_iter().take(MAX_OUTLIER_FINDINGS) {
            report.finding(
                Severity::Warning,
                format!(
                    "{} averages {} credits per query, above the 90th percentile of {}",
                    user.name,
                    format_credits(user.credits_per_query(), 4),
                    format_credits(cutoff, 4)
                ),
            );
        }
    }

    for user in users.iter().filter(|u| u.failed_queries > FAILED_QUERY_ALERT) {
        report.finding(
            Severity::Critical,
            format!(
                "{} had {} failed queries ({:.1}% failure rate)",
                user.name,
                user.failed_queries,
                user.failure_rate()
            ),
        );
    }

    Ok(())
}
