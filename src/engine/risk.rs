//! RiskEngine — composes budget, goal, cash-flow, subscription, and
//! concentration risks into a single weighted score (C4).
//!
//! A fixed set of independent checks run against one context and folded
//! into a single result, weighted by risk kind.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CategoryId, FinancialSignal, Result, RiskLevel, SignalPeriod, SignalType, Transaction,
    TransactionType, UserId,
};
use crate::engine::calculators;
use crate::engine::detectors::{BudgetDriftDetector, BudgetDriftResult, GoalUnderfundingDetector, GoalUnderfundingResult};
use crate::storage::{
    BudgetRepository, SavingsGoalRepository, SubscriptionRepository, TransactionRepository,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    BudgetDrift,
    ConsistentOverspending,
    GoalUnderfunding,
    StalledGoal,
    FrequentNegativeFlow,
    LowLiquidity,
    UpcomingExpensesRisk,
    CategoryVolatility,
    CategoryConcentration,
}

impl RiskKind {
    /// Fixed weight table from the glossary.
    pub fn weight(&self) -> f64 {
        match self {
            RiskKind::BudgetDrift => 30.0,
            RiskKind::ConsistentOverspending => 40.0,
            RiskKind::GoalUnderfunding => 35.0,
            RiskKind::StalledGoal => 20.0,
            RiskKind::FrequentNegativeFlow => 45.0,
            RiskKind::LowLiquidity => 50.0,
            RiskKind::UpcomingExpensesRisk => 30.0,
            RiskKind::CategoryVolatility => 25.0,
            RiskKind::CategoryConcentration => 20.0,
        }
    }
}

fn severity_score(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 0.3,
        RiskLevel::Medium => 0.6,
        RiskLevel::High => 1.0,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskItem {
    pub kind: RiskKind,
    pub severity: RiskLevel,
    pub category_id: Option<CategoryId>,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskResult {
    pub items: Vec<RiskItem>,
    pub overall_score: f64,
    pub signals: Vec<FinancialSignal>,
}

pub struct RiskEngineConfig {
    /// Documented simplification: "current balance" is proxied by a net-flow
    /// window rather than modeled as an account balance.
    pub balance_proxy_window_days: i64,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            balance_proxy_window_days: 30,
        }
    }
}

pub struct RiskEngine {
    transactions: Arc<dyn TransactionRepository>,
    budgets: Arc<dyn BudgetRepository>,
    goals: Arc<dyn SavingsGoalRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    config: RiskEngineConfig,
}

impl RiskEngine {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        budgets: Arc<dyn BudgetRepository>,
        goals: Arc<dyn SavingsGoalRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        config: RiskEngineConfig,
    ) -> Self {
        Self {
            transactions,
            budgets,
            goals,
            subscriptions,
            config,
        }
    }

    pub async fn run_risk_analysis(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        week_start: crate::dates::WeekStart,
    ) -> Result<RiskResult> {
        let mut items = Vec::new();

        self.budget_risks(user_id, reference, week_start, &mut items)
            .await?;
        self.goal_risks(user_id, reference, &mut items).await?;

        let balance = self.balance_proxy(user_id, reference).await?;
        self.cash_flow_risks(user_id, reference, &mut items).await?;
        self.upcoming_expense_risk(user_id, reference, balance, &mut items)
            .await?;
        self.concentration_risks(user_id, reference, &mut items).await?;

        let overall_score = weighted_score(&items);
        let signals = emit_high_severity_signals(user_id, reference, &items);

        Ok(RiskResult {
            items,
            overall_score,
            signals,
        })
    }

    async fn budget_risks(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        week_start: crate::dates::WeekStart,
        items: &mut Vec<RiskItem>,
    ) -> Result<()> {
        let detector = BudgetDriftDetector::new(self.transactions.clone());
        let budgets = self.budgets.list_active_by_user(user_id).await?;
        for budget in &budgets {
            let result: BudgetDriftResult = detector
                .detect(user_id, budget, reference, week_start)
                .await?;
            if result.has_drift {
                items.push(RiskItem {
                    kind: RiskKind::BudgetDrift,
                    severity: result.severity,
                    category_id: Some(result.category_id),
                    detail: format!(
                        "projected overshoot ${:.2} ({:.1}% drift)",
                        result.projected_overshoot, result.drift_percentage
                    ),
                });
            }
            if result.consistently_overspent {
                items.push(RiskItem {
                    kind: RiskKind::ConsistentOverspending,
                    severity: RiskLevel::High,
                    category_id: Some(result.category_id),
                    detail: "exceeded budget for 3 consecutive months".to_string(),
                });
            }
        }
        Ok(())
    }

    async fn goal_risks(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        items: &mut Vec<RiskItem>,
    ) -> Result<()> {
        let detector = GoalUnderfundingDetector::new();
        let goals = self.goals.list_active_by_user(user_id).await?;
        for goal in &goals {
            let months_remaining =
                ((goal.target_date - reference).num_days() as f64 / 30.0).ceil() as i64;
            let result: GoalUnderfundingResult = detector.detect(goal, reference, months_remaining);
            if result.is_stalled {
                items.push(RiskItem {
                    kind: RiskKind::StalledGoal,
                    severity: RiskLevel::High,
                    category_id: None,
                    detail: format!("goal \"{}\" has had no contribution in over 30 days", goal.name),
                });
            }
            if result.is_underfunded {
                items.push(RiskItem {
                    kind: RiskKind::GoalUnderfunding,
                    severity: result.severity,
                    category_id: None,
                    detail: format!(
                        "shortfall ${:.2}/mo ({:.1}%)",
                        result.shortfall, result.shortfall_percentage
                    ),
                });
            }
        }
        Ok(())
    }

    async fn balance_proxy(&self, user_id: UserId, reference: DateTime<Utc>) -> Result<Decimal> {
        let start = reference - chrono::Duration::days(self.config.balance_proxy_window_days);
        let txs = self
            .transactions
            .list_in_range(user_id, None, start, reference)
            .await?;
        Ok(net_flow(&txs))
    }

    async fn cash_flow_risks(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        items: &mut Vec<RiskItem>,
    ) -> Result<()> {
        let start = reference - chrono::Duration::days(90);
        let txs = self
            .transactions
            .list_in_range(user_id, None, start, reference)
            .await?;

        let mut daily_net: HashMap<chrono::NaiveDate, Decimal> = HashMap::new();
        for tx in &txs {
            if tx.status != crate::domain::TransactionStatus::Completed {
                continue;
            }
            let signed = match tx.transaction_type {
                TransactionType::Income => tx.amount.abs(),
                TransactionType::Expense => -tx.amount.abs(),
                TransactionType::Transfer => Decimal::ZERO,
            };
            *daily_net.entry(tx.date.date_naive()).or_insert(Decimal::ZERO) += signed;
        }

        let total_days = 90i64;
        let negative_days = daily_net.values().filter(|v| **v < Decimal::ZERO).count() as i64;
        let ratio = negative_days as f64 / total_days as f64;

        let mut longest_negative_run = 0i64;
        let mut current_run = 0i64;
        let mut day = start.date_naive();
        let end_day = reference.date_naive();
        while day <= end_day {
            let is_negative = daily_net.get(&day).is_some_and(|v| *v < Decimal::ZERO);
            if is_negative {
                current_run += 1;
                longest_negative_run = longest_negative_run.max(current_run);
            } else {
                current_run = 0;
            }
            day += chrono::Duration::days(1);
        }

        if ratio > 0.3 {
            items.push(RiskItem {
                kind: RiskKind::FrequentNegativeFlow,
                severity: if ratio > 0.5 { RiskLevel::High } else { RiskLevel::Medium },
                category_id: None,
                detail: format!(
                    "{:.0}% of the last 90 days had negative cash flow, longest consecutive run {} days",
                    ratio * 100.0,
                    longest_negative_run
                ),
            });
        }

        let monthly_avg_expense = {
            let expenses: Decimal = txs
                .iter()
                .filter(|t| {
                    t.transaction_type == TransactionType::Expense
                        && t.status == crate::domain::TransactionStatus::Completed
                })
                .map(|t| t.amount.abs())
                .sum();
            expenses / Decimal::from(3)
        };
        if monthly_avg_expense > Decimal::ZERO {
            let balance = self.balance_proxy(user_id, reference).await?;
            let months_of_coverage = (balance / monthly_avg_expense).to_f64().unwrap_or(0.0);
            if months_of_coverage < 1.0 {
                items.push(RiskItem {
                    kind: RiskKind::LowLiquidity,
                    severity: if months_of_coverage < 0.5 {
                        RiskLevel::High
                    } else {
                        RiskLevel::Medium
                    },
                    category_id: None,
                    detail: format!("{:.1} months of expense coverage", months_of_coverage),
                });
            }
        }

        Ok(())
    }

    async fn upcoming_expense_risk(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        balance: Decimal,
        items: &mut Vec<RiskItem>,
    ) -> Result<()> {
        let subscriptions = self.subscriptions.list_active_by_user(user_id).await?;
        let horizon = reference + chrono::Duration::days(30);
        let upcoming: Decimal = subscriptions
            .iter()
            .filter(|s| s.recurrence.next_billing_date <= horizon)
            .map(|s| s.amount)
            .sum();

        if upcoming > balance * Decimal::new(5, 1) {
            items.push(RiskItem {
                kind: RiskKind::UpcomingExpensesRisk,
                severity: RiskLevel::Medium,
                category_id: None,
                detail: format!("${:.2} in subscriptions due within 30 days", upcoming),
            });
        }
        Ok(())
    }

    async fn concentration_risks(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        items: &mut Vec<RiskItem>,
    ) -> Result<()> {
        let start = reference - chrono::Duration::days(90);
        let txs = self
            .transactions
            .list_in_range(user_id, None, start, reference)
            .await?;
        let expenses: Vec<&Transaction> = txs
            .iter()
            .filter(|t| {
                t.transaction_type == TransactionType::Expense
                    && t.status == crate::domain::TransactionStatus::Completed
            })
            .collect();
        if expenses.is_empty() {
            return Ok(());
        }

        let mut by_category: HashMap<Option<CategoryId>, Vec<Decimal>> = HashMap::new();
        for tx in &expenses {
            by_category.entry(tx.category_id).or_default().push(tx.amount.abs());
        }
        let grand_total: Decimal = expenses.iter().map(|t| t.amount.abs()).sum();

        for (category_id, amounts) in &by_category {
            let total: Decimal = amounts.iter().copied().sum();
            let share = if grand_total == Decimal::ZERO {
                0.0
            } else {
                (total / grand_total * Decimal::from(100)).to_f64().unwrap_or(0.0)
            };
            if share > 30.0 {
                items.push(RiskItem {
                    kind: RiskKind::CategoryConcentration,
                    severity: RiskLevel::Medium,
                    category_id: *category_id,
                    detail: format!("{:.1}% of spending concentrated in one category", share),
                });
            }

            let floats: Vec<f64> = amounts.iter().filter_map(|d| d.to_f64()).collect();
            let cv = calculators::coefficient_of_variation(&floats);
            if cv > 0.5 {
                items.push(RiskItem {
                    kind: RiskKind::CategoryVolatility,
                    severity: RiskLevel::Low,
                    category_id: *category_id,
                    detail: format!("spending volatility coefficient {:.2}", cv),
                });
            }
        }

        Ok(())
    }
}

fn net_flow(txs: &[Transaction]) -> Decimal {
    txs.iter()
        .filter(|t| t.status == crate::domain::TransactionStatus::Completed)
        .map(|t| match t.transaction_type {
            TransactionType::Income => t.amount.abs(),
            TransactionType::Expense => -t.amount.abs(),
            TransactionType::Transfer => Decimal::ZERO,
        })
        .sum()
}

fn weighted_score(items: &[RiskItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for item in items {
        let weight = item.kind.weight();
        weighted_sum += weight * severity_score(item.severity);
        weight_total += weight;
    }
    if weight_total == 0.0 {
        0.0
    } else {
        (weighted_sum / weight_total * 100.0).clamp(0.0, 100.0)
    }
}

fn emit_high_severity_signals(
    user_id: UserId,
    reference: DateTime<Utc>,
    items: &[RiskItem],
) -> Vec<FinancialSignal> {
    let period = SignalPeriod {
        start_date: reference - chrono::Duration::days(90),
        end_date: reference,
        comparison_start: None,
        comparison_end: None,
    };
    items
        .iter()
        .filter(|item| item.severity == RiskLevel::High)
        .map(|item| {
            FinancialSignal::new(
                user_id,
                SignalType::RiskDetected,
                item.detail.clone(),
                crate::domain::SignalValue::default(),
                period.clone(),
                item.category_id,
                1,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn negative_cash_flow_over_half_the_window_is_high_severity() {
        let store = Arc::new(MemoryStore::new());
        let user_id = UserId::new();
        let now = Utc::now();

        for i in 0..60 {
            let mut tx = Transaction::new(
                user_id,
                dec!(-50),
                TransactionType::Expense,
                "daily spend",
                now - chrono::Duration::days(i),
            );
            tx.status = crate::domain::TransactionStatus::Completed;
            store.create(&tx).await.unwrap();
        }

        let engine = RiskEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            RiskEngineConfig::default(),
        );
        let result = engine
            .run_risk_analysis(user_id, now, crate::dates::WeekStart::Monday)
            .await
            .unwrap();

        assert!(result
            .items
            .iter()
            .any(|i| i.kind == RiskKind::FrequentNegativeFlow && i.severity == RiskLevel::High));
        assert!(result.overall_score > 0.0);
    }
}
