//! Cost and savings rollups over aggregated usage rows.
//!
//! Everything here is pure arithmetic over materialized rows: no queries,
//! no caching. Percentile cutoffs are recomputed from each population.

pub mod calculator;
pub mod forecast;
pub mod percentile;
pub mod range;
pub mod savings;

pub use calculator::{
    action_plan, credits_per_unit, rollup_groups, summarize_savings, ActionItem, CostTotals,
    GroupRollup, GroupUsage, Priority, QueryWaste, SavingsSummary,
};
pub use forecast::{forecast, DailyCredits, Forecast, Scenario, TrendAnalysis, TrendDirection};
pub use percentile::{above_percentile, p75, p90, percentile};
pub use range::DateRange;
pub use savings::{SavingsCategory, SavingsEstimate, SavingsRule, SavingsRuleSet, WasteRates};
