//! Budget and goal risk detectors (C3).
//!
//! Each detector builds a result via a severity-ladder (alert-type enum +
//! severity enum + threshold match arms) over strict/flexible budget rules
//! and stalled-goal detection.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dates::{self, WeekStart};
use crate::domain::{
    Budget, BudgetFlexibility, CategoryId, Result, RiskLevel, SavingsGoal, Transaction,
    TransactionStatus, TransactionType, UserId,
};
use crate::storage::TransactionRepository;

fn is_completed_expense(tx: &Transaction) -> bool {
    tx.status == TransactionStatus::Completed && tx.transaction_type == TransactionType::Expense
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDriftResult {
    pub budget_id: crate::domain::BudgetId,
    pub category_id: CategoryId,
    pub current_spent: Decimal,
    pub projected_total: Decimal,
    pub projected_overshoot: Decimal,
    pub drift_percentage: f64,
    pub has_drift: bool,
    pub severity: RiskLevel,
    pub consistently_overspent: bool,
    pub recommendations: Vec<String>,
}

pub struct BudgetDriftDetector {
    transactions: std::sync::Arc<dyn TransactionRepository>,
}

impl BudgetDriftDetector {
    pub fn new(transactions: std::sync::Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    pub async fn detect(
        &self,
        user_id: UserId,
        budget: &Budget,
        reference: DateTime<Utc>,
        week_start: WeekStart,
    ) -> Result<BudgetDriftResult> {
        let (period_start, period_end) =
            dates::period_bounds(budget.period, reference, week_start);
        let days_elapsed = dates::days_elapsed(period_start, reference);
        let total_days = dates::total_days(period_start, period_end);

        let txs = self
            .transactions
            .list_in_range(user_id, Some(budget.category_id), period_start, reference)
            .await?;
        let current_spent: Decimal = txs
            .iter()
            .filter(|t| is_completed_expense(t))
            .map(|t| t.amount.abs())
            .sum();

        let daily_rate = current_spent / Decimal::from(days_elapsed);
        let projected_total = daily_rate * Decimal::from(total_days);
        let projected_overshoot = (projected_total - budget.amount).max(Decimal::ZERO);

        let expected_so_far =
            budget.amount * Decimal::from(days_elapsed) / Decimal::from(total_days);
        let drift_percentage = if expected_so_far == Decimal::ZERO {
            0.0
        } else {
            ((current_spent / expected_so_far - Decimal::ONE) * Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0)
        };

        let overshoot_f = projected_overshoot.to_f64().unwrap_or(0.0);
        let severity = severity_for_drift(budget.flexibility, drift_percentage, overshoot_f);
        let has_drift = severity.is_some();

        let consistently_overspent = self
            .historical_overspend(user_id, budget, reference, week_start)
            .await?;

        let mut recommendations = Vec::new();
        if has_drift {
            recommendations.push(format!(
                "At this pace you'll spend about ${:.2} this period, ${:.2} over budget.",
                projected_total, projected_overshoot
            ));
        }
        if consistently_overspent {
            recommendations.push(format!(
                "This category has exceeded its ${:.2} budget for the last 3 months straight.",
                budget.amount
            ));
        }

        Ok(BudgetDriftResult {
            budget_id: budget.id,
            category_id: budget.category_id,
            current_spent,
            projected_total,
            projected_overshoot,
            drift_percentage,
            has_drift,
            severity: severity.unwrap_or(RiskLevel::Low),
            consistently_overspent,
            recommendations,
        })
    }

    async fn historical_overspend(
        &self,
        user_id: UserId,
        budget: &Budget,
        reference: DateTime<Utc>,
        week_start: WeekStart,
    ) -> Result<bool> {
        for months_back in 1..=3 {
            let anchor = dates::add_months(reference, -months_back);
            let (start, end) = dates::period_bounds(budget.period, anchor, week_start);
            let txs = self
                .transactions
                .list_in_range(user_id, Some(budget.category_id), start, end)
                .await?;
            let total: Decimal = txs
                .iter()
                .filter(|t| is_completed_expense(t))
                .map(|t| t.amount.abs())
                .sum();
            if total <= budget.amount {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// `None` when spend is within tolerance for the budget's flexibility tier.
fn severity_for_drift(
    flexibility: BudgetFlexibility,
    drift_percentage: f64,
    overshoot: f64,
) -> Option<RiskLevel> {
    match flexibility {
        BudgetFlexibility::Strict => {
            if drift_percentage > 30.0 || overshoot > 500.0 {
                Some(RiskLevel::High)
            } else if drift_percentage > 15.0 || overshoot > 200.0 {
                Some(RiskLevel::Medium)
            } else if drift_percentage > 10.0 {
                Some(RiskLevel::Low)
            } else {
                None
            }
        }
        BudgetFlexibility::Flexible => {
            if drift_percentage > 50.0 || overshoot > 1000.0 {
                Some(RiskLevel::High)
            } else if drift_percentage > 25.0 || overshoot > 500.0 {
                Some(RiskLevel::Medium)
            } else if drift_percentage > 10.0 {
                Some(RiskLevel::Low)
            } else {
                None
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalUnderfundingResult {
    pub goal_id: crate::domain::SavingsGoalId,
    pub required_monthly: Decimal,
    pub average_monthly: Decimal,
    pub shortfall: Decimal,
    pub shortfall_percentage: f64,
    pub is_stalled: bool,
    pub is_underfunded: bool,
    pub severity: RiskLevel,
    pub projected_completion: Option<DateTime<Utc>>,
}

pub struct GoalUnderfundingDetector;

impl GoalUnderfundingDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(
        &self,
        goal: &SavingsGoal,
        reference: DateTime<Utc>,
        months_remaining: i64,
    ) -> GoalUnderfundingResult {
        let remaining_amount = (goal.target_amount - goal.current_amount).max(Decimal::ZERO);
        let months_remaining = months_remaining.max(1);
        let required_monthly = remaining_amount / Decimal::from(months_remaining);

        let average_monthly = average_monthly_contribution(goal, reference);
        let shortfall = (required_monthly - average_monthly).max(Decimal::ZERO);
        let shortfall_percentage = if required_monthly == Decimal::ZERO {
            0.0
        } else {
            (shortfall / required_monthly * Decimal::from(100))
                .to_f64()
                .unwrap_or(0.0)
        };

        let is_stalled = goal
            .contributions
            .last()
            .map(|c| (reference - c.date).num_days() > 30)
            .unwrap_or(true)
            && remaining_amount > Decimal::ZERO;
        let is_underfunded = shortfall > Decimal::ZERO;

        let severity = if is_stalled {
            RiskLevel::High
        } else if months_remaining < 3 && shortfall_percentage > 30.0 {
            RiskLevel::High
        } else if shortfall_percentage > 50.0 {
            RiskLevel::High
        } else if shortfall_percentage > 25.0 {
            RiskLevel::Medium
        } else if shortfall_percentage > 10.0 {
            RiskLevel::Low
        } else {
            RiskLevel::Low
        };

        let projected_completion = if average_monthly > Decimal::ZERO {
            let months_needed = (remaining_amount / average_monthly)
                .to_f64()
                .unwrap_or(0.0)
                .ceil() as i32;
            Some(dates::add_months(reference, months_needed))
        } else {
            None
        };

        GoalUnderfundingResult {
            goal_id: goal.id,
            required_monthly,
            average_monthly,
            shortfall,
            shortfall_percentage,
            is_stalled,
            is_underfunded,
            severity,
            projected_completion,
        }
    }
}

impl Default for GoalUnderfundingDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn average_monthly_contribution(goal: &SavingsGoal, reference: DateTime<Utc>) -> Decimal {
    let window_start = dates::add_months(reference, -6);
    let recent: Vec<Decimal> = goal
        .contributions
        .iter()
        .filter(|c| c.date >= window_start)
        .map(|c| c.amount)
        .collect();
    if recent.is_empty() {
        return Decimal::ZERO;
    }
    recent.iter().sum::<Decimal>() / Decimal::from(recent.len())
}

/// Convenience helper engines use to pull completed expenses for a detector
/// without repeating the repository call each time.
pub async fn completed_expenses(
    transactions: &dyn TransactionRepository,
    user_id: UserId,
    category_id: Option<CategoryId>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    Ok(transactions
        .list_in_range(user_id, category_id, start, end)
        .await?
        .into_iter()
        .filter(is_completed_expense)
        .collect())
}
