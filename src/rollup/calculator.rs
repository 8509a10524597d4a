use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::savings::{SavingsCategory, SavingsEstimate, SavingsRuleSet, WasteRates};

/// Credits per query/request. A group with no units has a ratio of zero.
pub fn credits_per_unit(credits: Decimal, unit_count: u64) -> Decimal {
    if unit_count > 0 {
        credits / Decimal::from(unit_count)
    } else {
        Decimal::ZERO
    }
}

/// Aggregated usage for one value of a dimension (warehouse, user, function).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupUsage {
    pub key: String,
    pub credits: Decimal,
    pub unit_count: u64,
    pub unique_users: f64,
    pub avg_execution_seconds: f64,
    pub failed_units: u64,
}

impl GroupUsage {
    pub fn new(key: impl Into<String>, credits: Decimal, unit_count: u64) -> Self {
        Self {
            key: key.into(),
            credits,
            unit_count,
            unique_users: 0.0,
            avg_execution_seconds: 0.0,
            failed_units: 0,
        }
    }

    pub fn with_unique_users(mut self, unique_users: f64) -> Self {
        self.unique_users = unique_users;
        self
    }

    pub fn with_avg_execution_seconds(mut self, seconds: f64) -> Self {
        self.avg_execution_seconds = seconds;
        self
    }

    pub fn with_failed_units(mut self, failed: u64) -> Self {
        self.failed_units = failed;
        self
    }

    pub fn credits_per_unit(&self) -> Decimal {
        credits_per_unit(self.credits, self.unit_count)
    }

    /// Failed units as a percentage of all units.
    pub fn failure_rate(&self) -> Decimal {
        if self.unit_count > 0 {
            Decimal::from(self.failed_units) * Decimal::ONE_HUNDRED / Decimal::from(self.unit_count)
        } else {
            Decimal::ZERO
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRollup {
    pub key: String,
    pub credits: Decimal,
    pub unit_count: u64,
    pub credits_per_unit: Decimal,
    pub savings: SavingsEstimate,
}

/// One rule-set evaluation per candidate group, ordered by estimated
/// savings (largest first, ties by key).
pub fn rollup_groups(groups: &[GroupUsage], rules: &SavingsRuleSet) -> Vec<GroupRollup> {
    let mut rollups: Vec<GroupRollup> = groups
        .iter()
        .filter(|group| rules.is_candidate(group))
        .map(|group| GroupRollup {
            key: group.key.clone(),
            credits: group.credits,
            unit_count: group.unit_count,
            credits_per_unit: group.credits_per_unit(),
            savings: rules.evaluate(group),
        })
        .collect();

    rollups.sort_by(|a, b| {
        b.savings
            .amount
            .cmp(&a.savings.amount)
            .then_with(|| a.key.cmp(&b.key))
    });

    debug!(
        "Rule set '{}' kept {} of {} groups",
        rules.name,
        rollups.len(),
        groups.len()
    );
    rollups
}

/// Account credits by category for one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostTotals {
    pub compute: Decimal,
    pub cloud_services: Decimal,
    /// Zero when AI usage could not be read.
    pub ai: Decimal,
    pub ai_available: bool,
}

impl CostTotals {
    pub fn total(&self) -> Decimal {
        self.compute + self.cloud_services + self.ai
    }

    pub fn breakdown(&self) -> [(&'static str, Decimal); 3] {
        [
            ("Compute", self.compute),
            ("Cloud Services", self.cloud_services),
            ("AI Functions", self.ai),
        ]
    }
}

/// Compute credits of queries matching each waste predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryWaste {
    pub failed_credits: Decimal,
    pub spilled_credits: Decimal,
    pub long_running_credits: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsSummary {
    pub warehouse: Decimal,
    pub query_failures: Decimal,
    pub spillage: Decimal,
    pub long_running: Decimal,
    pub ai: Decimal,
}

impl SavingsSummary {
    pub fn query_total(&self) -> Decimal {
        self.query_failures + self.spillage + self.long_running
    }

    pub fn total(&self) -> Decimal {
        self.warehouse + self.query_total() + self.ai
    }

    pub fn amount(&self, category: SavingsCategory) -> Decimal {
        match category {
            SavingsCategory::Warehouse => self.warehouse,
            SavingsCategory::QueryFailures => self.query_failures,
            SavingsCategory::Spillage => self.spillage,
            SavingsCategory::LongRunning => self.long_running,
            SavingsCategory::Ai => self.ai,
        }
    }

    pub fn breakdown(&self) -> Vec<(SavingsCategory, Decimal)> {
        SavingsCategory::ALL
            .iter()
            .map(|category| (*category, self.amount(*category)))
            .collect()
    }
}

/// Add up every category of recoverable credits.
pub fn summarize_savings(
    warehouses: &[GroupRollup],
    waste: &QueryWaste,
    ai_credits: Decimal,
    rates: &WasteRates,
) -> SavingsSummary {
    SavingsSummary {
        warehouse: warehouses.iter().map(|w| w.savings.amount).sum(),
        query_failures: waste.failed_credits * rates.failed,
        spillage: waste.spilled_credits * rates.spillage,
        long_running: waste.long_running_credits * rates.long_running,
        ai: ai_credits * rates.ai,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionItem {
    pub priority: Priority,
    pub action: &'static str,
    pub estimated_savings: Decimal,
    pub timeline: &'static str,
}

/// Split category savings into a prioritized implementation plan.
pub fn action_plan(summary: &SavingsSummary) -> Vec<ActionItem> {
    let query_total = summary.query_total();
    vec![
        ActionItem {
            priority: Priority::High,
            action: "Consolidate underutilized warehouses",
            estimated_savings: summary.warehouse * Decimal::new(6, 1),
            timeline: "1-2 weeks",
        },
        ActionItem {
            priority: Priority::High,
            action: "Implement auto-suspend policies",
            estimated_savings: summary.warehouse * Decimal::new(4, 1),
            timeline: "1 week",
        },
        ActionItem {
            priority: Priority::Medium,
            action: "Query optimization training",
            estimated_savings: query_total * Decimal::new(7, 1),
            timeline: "2-4 weeks",
        },
        ActionItem {
            priority: Priority::Medium,
            action: "AI usage governance",
            estimated_savings: summary.ai,
            timeline: "2-3 weeks",
        },
        ActionItem {
            priority: Priority::Low,
            action: "Advanced query monitoring",
            estimated_savings: query_total * Decimal::new(3, 1),
            timeline: "4-6 weeks",
        },
    ]
}
