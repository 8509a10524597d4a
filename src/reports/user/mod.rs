//! Usage pages over the copied cost views.

mod ai;
mod details;
mod usage;

use crate::error::Result;
use crate::reports::{Page, PageContext, Report, UserPage};

/// Feature name used in notices when the analyst view is missing.
pub(crate) const AI_ANALYST: &str = "AI analyst usage";

pub async fn render(ctx: &PageContext<'_>, page: UserPage) -> Result<Report> {
    let mut report = Report::new(Page::User(page), ctx.range());

    match page {
        UserPage::Home => usage::home(ctx, &mut report).await?,
        UserPage::WarehouseUsage => usage::warehouse_usage(ctx, &mut report).await?,
        UserPage::AiUsage => ai::ai_usage(ctx, &mut report).await?,
        UserPage::SpillageAnalysis => details::spillage(ctx, &mut report).await?,
        UserPage::QueryDetails => details::query_details(ctx, &mut report).await?,
        UserPage::AiQueryDetails => ai::ai_query_details(ctx, &mut report).await?,
        UserPage::ExpensiveQueries => details::expensive_queries(ctx, &mut report).await?,
        UserPage::CloudServices => usage::cloud_services(ctx, &mut report).await?,
        UserPage::ResourceUtilization => usage::resource_utilization(ctx, &mut report).await?,
    }

    Ok(report)
}
