use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Account-wide cost dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AdminPage {
    Home,
    CostOverview,
    WarehouseOptimization,
    UserCostAnalysis,
    StorageDataCosts,
    AiCostManagement,
    QueryEfficiency,
    CostForecasting,
    SavingsOpportunities,
}

/// Usage dashboards over the copied cost views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UserPage {
    Home,
    WarehouseUsage,
    AiUsage,
    SpillageAnalysis,
    QueryDetails,
    AiQueryDetails,
    ExpensiveQueries,
    CloudServices,
    ResourceUtilization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "app", content = "page", rename_all = "snake_case")]
pub enum Page {
    Admin(AdminPage),
    User(UserPage),
}

impl Page {
    pub fn all() -> Vec<Page> {
        AdminPage::value_variants()
            .iter()
            .map(|p| Page::Admin(*p))
            .chain(UserPage::value_variants().iter().map(|p| Page::User(*p)))
            .collect()
    }

    pub fn app(&self) -> &'static str {
        match self {
            Page::Admin(_) => "admin",
            Page::User(_) => "user",
        }
    }

    /// Command-line name, e.g. `cost-overview`.
    pub fn name(&self) -> String {
        let value = match self {
            Page::Admin(page) => page.to_possible_value(),
            Page::User(page) => page.to_possible_value(),
        };
        value
            .map(|v| v.get_name().to_string())
            .unwrap_or_default()
    }

    /// `admin/cost-overview`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.app(), self.name())
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Admin(page) => match page {
                AdminPage::Home => "Account Cost Summary",
                AdminPage::CostOverview => "Cost Overview",
                AdminPage::WarehouseOptimization => "Warehouse Optimization",
                AdminPage::UserCostAnalysis => "User Cost Analysis",
                AdminPage::StorageDataCosts => "Storage & Data Costs",
                AdminPage::AiCostManagement => "AI Cost Management",
                AdminPage::QueryEfficiency => "Query Efficiency",
                AdminPage::CostForecasting => "Cost Forecasting",
                AdminPage::SavingsOpportunities => "Savings Opportunities",
            },
            Page::User(page) => match page {
                UserPage::Home => "Usage Overview",
                UserPage::WarehouseUsage => "Warehouse Usage",
                UserPage::AiUsage => "AI Usage",
                UserPage::SpillageAnalysis => "Spillage Analysis",
                UserPage::QueryDetails => "Query Details",
                UserPage::AiQueryDetails => "AI Query Details",
                UserPage::ExpensiveQueries => "Expensive Queries",
                UserPage::CloudServices => "Cloud Services",
                UserPage::ResourceUtilization => "Resource Utilization",
            },
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugs() {
        assert_eq!(Page::Admin(AdminPage::CostOverview).slug(), "admin/cost-overview");
        assert_eq!(Page::User(UserPage::AiQueryDetails).slug(), "user/ai-query-details");
    }

    #[test]
    fn test_all_pages_listed_once() {
        let pages = Page::all();
        assert_eq!(pages.len(), 18);
        let mut slugs: Vec<String> = pages.iter().map(|p| p.slug()).collect();
        slugs.dedup();
        assert_eq!(slugs.len(), 18);
    }
}
