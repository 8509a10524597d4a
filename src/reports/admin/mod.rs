//! Account-wide pages.

mod ai;
mod efficiency;
mod forecasting;
mod overview;
mod savings;
mod storage;
mod users;
mod warehouses;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::reports::{queries, AdminPage, Page, PageContext, Report};
use crate::rollup::{CostTotals, WasteRates};
use crate::storage::QueryParam;

/// Feature name used in notices when the AI function views are missing.
pub(crate) const AI_FUNCTIONS: &str = "AI function usage";

pub async fn render(ctx: &PageContext<'_>, page: AdminPage) -> Result<Report> {
    let mut report = Report::new(Page::Admin(page), ctx.range());

    match page {
        AdminPage::Home => overview::home(ctx, &mut report).await?,
        AdminPage::CostOverview => overview::cost_overview(ctx, &mut report).await?,
        AdminPage::WarehouseOptimization => warehouses::render(ctx, &mut report).await?,
        AdminPage::UserCostAnalysis => users::render(ctx, &mut report).await?,
        AdminPage::StorageDataCosts => storage::render(ctx, &mut report).await?,
        AdminPage::AiCostManagement => ai::render(ctx, &mut report).await?,
        AdminPage::QueryEfficiency => efficiency::render(ctx, &mut report).await?,
        AdminPage::CostForecasting => forecasting::render(ctx, &mut report).await?,
        AdminPage::SavingsOpportunities => savings::render(ctx, &mut report).await?,
    }

    Ok(report)
}

/// Account totals for the range; AI credits degrade to zero.
pub(crate) async fn account_totals(ctx: &PageContext<'_>, report: &mut Report) -> Result<CostTotals> {
    let totals = ctx.fetch(queries::ACCOUNT_TOTALS).await?;
    let row = totals.first();

    let (compute, cloud_services) = match row {
        Some(row) => (
            row.decimal("compute_credits"),
            row.decimal("cloud_services_credits"),
        ),
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    let (ai, ai_available) = match ai_credits(ctx, report).await? {
        Some(ai) => (ai, true),
        None => (Decimal::ZERO, false),
    };

    Ok(CostTotals {
        compute,
        cloud_services,
        ai,
        ai_available,
    })
}

/// AI function credits for the range, `None` when the view is missing.
pub(crate) async fn ai_credits(ctx: &PageContext<'_>, report: &mut Report) -> Result<Option<Decimal>> {
    let result = ctx
        .fetch_optional(AI_FUNCTIONS, queries::AI_TOTAL, report)
        .await?;
    Ok(result.map(|rs| {
        rs.first()
            .map(|row| row.decimal("ai_credits"))
            .unwrap_or(Decimal::ZERO)
    }))
}

/// `?3` for the long-running predicates, in milliseconds.
pub(crate) fn long_running_threshold(rates: &WasteRates) -> QueryParam {
    QueryParam::Int((rates.long_running_seconds * 1000) as i64)
}
