//! WeeklyMetric / WeeklySummary entities — materialized per `(userId, weekStart)`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{InsightId, UserId};
use super::insight::Insight;

pub const WEEKLY_SUMMARY_TTL_DAYS: i64 = 90;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryBreakdownEntry {
    pub category_name: String,
    pub total: Decimal,
    pub percentage_of_total: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetStatusEntry {
    pub budget_name: String,
    pub spent: Decimal,
    pub limit: Decimal,
    pub utilization: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeekdayWeekendSplit {
    pub weekday_total: Decimal,
    pub weekend_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyMetric {
    pub user_id: UserId,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub income: Decimal,
    pub expenses: Decimal,
    pub savings: Decimal,
    pub net: Decimal,
    pub category_breakdown: Vec<CategoryBreakdownEntry>,
    pub budget_status: Vec<BudgetStatusEntry>,
    pub volatility: f64,
    pub weekday_vs_weekend: WeekdayWeekendSplit,
    pub created_at: DateTime<Utc>,
}

impl WeeklyMetric {
    pub fn new(user_id: UserId, week_start: DateTime<Utc>, week_end: DateTime<Utc>) -> Self {
        Self {
            user_id,
            week_start,
            week_end,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            savings: Decimal::ZERO,
            net: Decimal::ZERO,
            category_breakdown: Vec::new(),
            budget_status: Vec::new(),
            volatility: 0.0,
            weekday_vs_weekend: WeekdayWeekendSplit::default(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftTier {
    Minor,
    Notable,
    Major,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificantShift {
    pub metric_name: String,
    pub previous_value: Decimal,
    pub current_value: Decimal,
    pub percentage_change: f64,
    pub absolute_change: Decimal,
    pub tier: ShiftTier,
}

/// A shift is significant iff `|%| > 20 AND |$| > 50`.
pub fn is_significant_shift(percentage_change: f64, absolute_change: Decimal) -> bool {
    percentage_change.abs() > 20.0 && absolute_change.abs() > Decimal::from(50)
}

/// Three-tier significance ladder by magnitude of percentage change.
pub fn shift_tier(percentage_change: f64) -> ShiftTier {
    let magnitude = percentage_change.abs();
    if magnitude > 75.0 {
        ShiftTier::Major
    } else if magnitude > 40.0 {
        ShiftTier::Notable
    } else {
        ShiftTier::Minor
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub user_id: UserId,
    pub week_start: DateTime<Utc>,
    pub metric: WeeklyMetric,
    pub insight_ids: Vec<InsightId>,
    pub insights: Vec<Insight>,
    pub significant_shifts: Vec<SignificantShift>,
    pub overview: String,
    pub generated_with_llm: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl WeeklySummary {
    pub fn new(metric: WeeklyMetric, overview: impl Into<String>, generated_with_llm: bool) -> Self {
        let now = Utc::now();
        Self {
            user_id: metric.user_id,
            week_start: metric.week_start,
            metric,
            insight_ids: Vec::new(),
            insights: Vec::new(),
            significant_shifts: Vec::new(),
            overview: overview.into(),
            generated_with_llm,
            created_at: now,
            expires_at: now + chrono::Duration::days(WEEKLY_SUMMARY_TTL_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn significance_requires_both_thresholds() {
        assert!(is_significant_shift(25.0, dec!(60)));
        assert!(!is_significant_shift(25.0, dec!(10)));
        assert!(!is_significant_shift(5.0, dec!(200)));
    }

    #[test]
    fn tier_buckets_by_magnitude() {
        assert_eq!(shift_tier(90.0), ShiftTier::Major);
        assert_eq!(shift_tier(50.0), ShiftTier::Notable);
        assert_eq!(shift_tier(22.0), ShiftTier::Minor);
    }
}
