use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calculator::GroupUsage;

/// Where recoverable credits come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsCategory {
    Warehouse,
    QueryFailures,
    Spillage,
    LongRunning,
    Ai,
}

impl SavingsCategory {
    pub const ALL: [SavingsCategory; 5] = [
        SavingsCategory::Warehouse,
        SavingsCategory::QueryFailures,
        SavingsCategory::Spillage,
        SavingsCategory::LongRunning,
        SavingsCategory::Ai,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SavingsCategory::Warehouse => "Warehouse Optimization",
            SavingsCategory::QueryFailures => "Query Failures",
            SavingsCategory::Spillage => "Memory Spillage",
            SavingsCategory::LongRunning => "Long Queries",
            SavingsCategory::Ai => "AI Optimization",
        }
    }
}

/// Threshold test applied to one group.
#[derive(Debug, Clone, PartialEq)]
pub enum RulePredicate {
    UniqueUsersBelow(f64),
    AvgExecutionSecondsAbove(f64),
    CreditsPerUnitAbove(Decimal),
}

impl RulePredicate {
    pub fn matches(&self, group: &GroupUsage) -> bool {
        match self {
            RulePredicate::UniqueUsersBelow(limit) => group.unique_users < *limit,
            RulePredicate::AvgExecutionSecondsAbove(limit) => group.avg_execution_seconds > *limit,
            RulePredicate::CreditsPerUnitAbove(limit) => group.credits_per_unit() > *limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavingsRule {
    pub name: &'static str,
    pub predicate: RulePredicate,
    pub fraction: Decimal,
    pub recommendation: &'static str,
}

/// Ordered rules; the first matching rule decides a group's estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsRuleSet {
    pub name: &'static str,
    pub category: SavingsCategory,
    pub rules: Vec<SavingsRule>,
    /// Groups must exceed this many credits to be listed.
    pub min_credits: Decimal,
    pub fallback_recommendation: &'static str,
}

impl SavingsRuleSet {
    /// Warehouse consolidation and right-sizing heuristics.
    pub fn warehouse() -> Self {
        Self {
            name: "warehouse",
            category: SavingsCategory::Warehouse,
            rules: vec![
                SavingsRule {
                    name: "low_utilization",
                    predicate: RulePredicate::UniqueUsersBelow(2.0),
                    fraction: Decimal::new(30, 2),
                    recommendation: "Low utilization - consider consolidation",
                },
                SavingsRule {
                    name: "long_execution",
                    predicate: RulePredicate::AvgExecutionSecondsAbove(120.0),
                    fraction: Decimal::new(20, 2),
                    recommendation: "Long execution times - consider optimization",
                },
                SavingsRule {
                    name: "high_cost_per_unit",
                    predicate: RulePredicate::CreditsPerUnitAbove(Decimal::new(1, 2)),
                    fraction: Decimal::new(15, 2),
                    recommendation: "High cost per query - review sizing",
                },
            ],
            min_credits: Decimal::ONE,
            fallback_recommendation: "No issues identified",
        }
    }

    pub fn is_candidate(&self, group: &GroupUsage) -> bool {
        group.credits > self.min_credits
    }

    pub fn evaluate(&self, group: &GroupUsage) -> SavingsEstimate {
        match self.rules.iter().find(|rule| rule.predicate.matches(group)) {
            Some(rule) => SavingsEstimate {
                category: self.category,
                rule: Some(rule.name.to_string()),
                fraction: rule.fraction,
                observed_credits: group.credits,
                amount: group.credits * rule.fraction,
                recommendation: rule.recommendation.to_string(),
            },
            None => SavingsEstimate {
                category: self.category,
                rule: None,
                fraction: Decimal::ZERO,
                observed_credits: group.credits,
                amount: Decimal::ZERO,
                recommendation: self.fallback_recommendation.to_string(),
            },
        }
    }
}

/// `observed_credits x fraction` for one group or category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsEstimate {
    pub category: SavingsCategory,
    pub rule: Option<String>,
    pub fraction: Decimal,
    pub observed_credits: Decimal,
    pub amount: Decimal,
    pub recommendation: String,
}

/// Fractions applied to the credits of wasteful queries.
#[derive(Debug, Clone, PartialEq)]
pub struct WasteRates {
    pub failed: Decimal,
    pub spillage: Decimal,
    pub long_running: Decimal,
    pub ai: Decimal,
    /// Queries running longer than this are long-running.
    pub long_running_seconds: u64,
}

impl Default for WasteRates {
    fn default() -> Self {
        Self {
            failed: Decimal::new(5, 1),
            spillage: Decimal::new(2, 1),
            long_running: Decimal::new(1, 1),
            ai: Decimal::new(1, 1),
            long_running_seconds: 300,
        }
    }
}
