use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;

const DAYS_PER_MONTH: i64 = 30;
const PROJECTION_DAYS: i64 = 30;
const MIN_DAYS_FOR_PROJECTION: usize = 3;
const MIN_DAYS_FOR_TREND: usize = 7;
/// Half-over-half change (percent) beyond which a trend is not stable.
const TREND_THRESHOLD_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCredits {
    pub date: NaiveDate,
    pub credits: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedDay {
    pub date: NaiveDate,
    pub credits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub name: &'static str,
    pub monthly_credits: Decimal,
    pub vs_base_percent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub change_percent: f64,
    pub highest_day: Decimal,
    pub lowest_day: Decimal,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub total_credits: Decimal,
    pub period_days: usize,
    pub daily_average: Decimal,
    pub projected_monthly: Decimal,
    /// Linear trend extended past the last observed day; empty with too few days.
    pub projection: Vec<ProjectedDay>,
    pub scenarios: Vec<Scenario>,
    pub trend: Option<TrendAnalysis>,
}

/// Forecast from daily credit totals ordered by date. `None` when there is
/// no usage at all.
pub fn forecast(days: &[DailyCredits]) -> Option<Forecast> {
    if days.is_empty() {
        return None;
    }

    let period_days = days.len();
    let total_credits: Decimal = days.iter().map(|d| d.credits).sum();
    let daily_average = total_credits / Decimal::from(period_days);
    let projected_monthly = daily_average * Decimal::from(DAYS_PER_MONTH);

    let projection = if period_days >= MIN_DAYS_FOR_PROJECTION {
        project(days)
    } else {
        Vec::new()
    };

    let trend = if period_days >= MIN_DAYS_FOR_TREND {
        Some(analyze_trend(days))
    } else {
        None
    };

    Some(Forecast {
        total_credits,
        period_days,
        daily_average,
        projected_monthly,
        projection,
        scenarios: scenarios(projected_monthly),
        trend,
    })
}

fn scenarios(base_monthly: Decimal) -> Vec<Scenario> {
    [
        ("Current Trend", Decimal::ONE),
        ("Growth Scenario (+20%)", Decimal::new(12, 1)),
        ("Optimization Scenario (-15%)", Decimal::new(85, 2)),
        ("High Activity (+50%)", Decimal::new(15, 1)),
        ("Cost Reduction (-30%)", Decimal::new(7, 1)),
    ]
    .into_iter()
    .map(|(name, factor)| Scenario {
        name,
        monthly_credits: base_monthly * factor,
        vs_base_percent: (factor - Decimal::ONE) * Decimal::ONE_HUNDRED,
    })
    .collect()
}

fn project(days: &[DailyCredits]) -> Vec<ProjectedDay> {
    let ys: Vec<f64> = days.iter().map(|d| d.credits.to_f64().unwrap_or(0.0)).collect();
    let (slope, intercept) = linear_fit(&ys);
    let n = ys.len();
    let Some(last) = days.last().map(|d| d.date) else {
        return Vec::new();
    };

    (0..PROJECTION_DAYS)
        .map(|offset| {
            let x = (n as i64 + offset) as f64;
            ProjectedDay {
                date: last + Duration::days(offset + 1),
                credits: slope * x + intercept,
            }
        })
        .collect()
}

/// Least-squares line through `(index, y)`.
fn linear_fit(ys: &[f64]) -> (f64, f64) {
    let n = ys.len() as f64;
    if ys.len() < 2 {
        return (0.0, ys.first().copied().unwrap_or(0.0));
    }

    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut covariance, mut variance) = (0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        covariance += dx * (y - mean_y);
        variance += dx * dx;
    }

    let slope = covariance / variance;
    (slope, mean_y - slope * mean_x)
}

fn analyze_trend(days: &[DailyCredits]) -> TrendAnalysis {
    let half = days.len() / 2;
    let mean = |slice: &[DailyCredits]| -> Decimal {
        let sum: Decimal = slice.iter().map(|d| d.credits).sum();
        sum / Decimal::from(slice.len())
    };

    let first_half = mean(&days[..half]);
    let second_half = mean(&days[days.len() - half..]);

    let change_percent = if first_half > Decimal::ZERO {
        ((second_half - first_half) / first_half * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
    } else {
        0.0
    };

    let direction = if change_percent > TREND_THRESHOLD_PERCENT {
        TrendDirection::Increasing
    } else if change_percent < -TREND_THRESHOLD_PERCENT {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    let highest_day = days.iter().map(|d| d.credits).max().unwrap_or_default();
    let lowest_day = days.iter().map(|d| d.credits).min().unwrap_or_default();

    TrendAnalysis {
        direction,
        change_percent,
        highest_day,
        lowest_day,
        std_dev: sample_std_dev(days),
    }
}

fn sample_std_dev(days: &[DailyCredits]) -> f64 {
    if days.len() < 2 {
        return 0.0;
    }
    let values: Vec<f64> = days.iter().map(|d| d.credits.to_f64().unwrap_or(0.0)).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Round a projected value for display.
pub fn projected_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}
