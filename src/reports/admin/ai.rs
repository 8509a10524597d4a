use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::AI_FUNCTIONS;
use crate::error::Result;
use crate::reports::report::{decimal_cell, format_count, format_credits, text_cell};
use crate::reports::{queries, ChartKind, ChartSpec, PageContext, Report, Severity, Table};
use crate::rollup::{above_percentile, credits_per_unit, p90, percentile};

const USAGE_TABLE: &str = "AI usage";
const FUNCTION_TABLE: &str = "AI credits by function";
const MODEL_TABLE: &str = "AI credits by model";
const MAX_OUTLIER_FINDINGS: usize = 5;

struct AiUsage {
    usage_date: String,
    function_name: String,
    model_name: String,
    total_tokens: u64,
    credits: Decimal,
    request_count: u64,
    unique_users: u64,
}

impl AiUsage {
    fn credits_per_request(&self) -> Decimal {
        credits_per_unit(self.credits, self.request_count)
    }

    fn tokens_per_request(&self) -> Decimal {
        credits_per_unit(Decimal::from(self.total_tokens), self.request_count)
    }
}

#[derive(Default)]
struct Breakdown {
    credits: Decimal,
    requests: u64,
    tokens: u64,
}

pub(super) async fn render(ctx: &PageContext<'_>, report: &mut Report) -> Result<()> {
    let usage: Vec<AiUsage> = match ctx
        .fetch_optional(AI_FUNCTIONS, queries::AI_SUMMARY, report)
        .await?
    {
        Some(result) => result
            .rows()
            .map(|row| AiUsage {
                usage_date: row.text("usage_date"),
                function_name: row.text("function_name"),
                model_name: row.text("model_name"),
                total_tokens: row.count("total_tokens"),
                credits: row.decimal("credits"),
                request_count: row.count("request_count"),
                unique_users: row.count("unique_users"),
            })
            .collect(),
        None => Vec::new(),
    };

    let total_credits: Decimal = usage.iter().map(|u| u.credits).sum();
    let total_requests: u64 = usage.iter().map(|u| u.request_count).sum();
    let total_tokens: u64 = usage.iter().map(|u| u.total_tokens).sum();

    report.metric("AI Credits", format_credits(total_credits, 2));
    report.metric("AI Requests", format_count(total_requests));
    report.metric("Total Tokens", format_count(total_tokens));
    report.metric(
        "Avg Credits per Request",
        format_credits(credits_per_unit(total_credits, total_requests), 4),
    );

    let mut table = Table::new(
        USAGE_TABLE,
        &[
            "usage_date",
            "function_name",
            "model_name",
            "total_tokens",
            "credits",
            "request_count",
            "unique_users",
            "credits_per_request",
            "tokens_per_request",
        ],
    );
    for row in &usage {
        table.push_row(vec![
            text_cell(row.usage_date.as_str()),
            text_cell(row.function_name.as_str()),
            text_cell(row.model_name.as_str()),
            row.total_tokens.into(),
            decimal_cell(row.credits, 4),
            row.request_count.into(),
            row.unique_users.into(),
            decimal_cell(row.credits_per_request(), 6),
            decimal_cell(row.tokens_per_request(), 1),
        ]);
    }
    report.push_table(table);

    if usage.is_empty() {
        if report.notices.is_empty() {
            report.finding(Severity::Info, "No AI usage in this period");
        }
        return Ok(());
    }

    report.push_table(breakdown_table(FUNCTION_TABLE, "function_name", &usage, |u| {
        &u.function_name
    }));
    report.push_table(breakdown_table(MODEL_TABLE, "model_name", &usage, |u| &u.model_name));
    report.chart(ChartSpec::pie(
        "AI credits by function",
        FUNCTION_TABLE,
        "function_name",
        "credits",
    ));
    report.chart(ChartSpec::new(
        ChartKind::Bar,
        "AI credits by model",
        MODEL_TABLE,
        "model_name",
        &["credits"],
    ));
    report.chart(
        ChartSpec::new(
            ChartKind::StackedBar,
            "Daily AI credits",
            USAGE_TABLE,
            "usage_date",
            &["credits"],
        )
        .with_color("function_name"),
    );

    let costs: Vec<Decimal> = usage.iter().map(AiUsage::credits_per_request).collect();
    if let Some(cutoff) = percentile(&costs, p90()) {
        let mut outliers = above_percentile(&usage, p90(), AiUsage::credits_per_request);
        outliers.sort_by(|a, b| b.credits_per_request().cmp(&a.credits_per_request()));
        for row in outliers.into_iter().take(MAX_OUTLIER_FINDINGS) {
            report.finding(
                Severity::Warning,
                format!(
                    "{} ({}) on {} cost {} credits per request, above the 90th percentile of {}",
                    row.function_name,
                    row.model_name,
                    row.usage_date,
                    format_credits(row.credits_per_request(), 4),
                    format_credits(cutoff, 4)
                ),
            );
        }
    }

    Ok(())
}

fn breakdown_table<F>(title: &str, key_column: &str, usage: &[AiUsage], key: F) -> Table
where
    F: Fn(&AiUsage) -> &String,
{
    let mut groups: BTreeMap<&String, Breakdown> = BTreeMap::new();
    for row in usage {
        let entry = groups.entry(key(row)).or_default();
        entry.credits += row.credits;
        entry.requests += row.request_count;
        entry.tokens += row.total_tokens;
    }

    let mut groups: Vec<(&String, Breakdown)> = groups.into_iter().collect();
    groups.sort_by(|a, b| b.1.credits.cmp(&a.1.credits).then_with(|| a.0.cmp(b.0)));

    let mut table = Table::new(title, &[key_column, "credits", "request_count", "total_tokens"]);
    for (name, group) in groups {
        table.push_row(vec![
            text_cell(name.as_str()),
            decimal_cell(group.credits, 4),
            group.requests.into(),
            group.tokens.into(),
        ]);
    }
    table
}
