//! AggregationEngine — category totals, deltas, and overall cash-flow figures
//! over rolling windows (C4).
//!
//! Holds no mutable state, takes repository handles, returns a result plus
//! the signals to persist rather than persisting them itself.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CategoryId, FinancialSignal, Result, SignalPeriod, SignalType, Transaction, TransactionType,
    UserId,
};
use crate::engine::calculators;
use crate::storage::TransactionRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_id: Option<CategoryId>,
    pub total: Decimal,
    pub count: usize,
    pub avg: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub first_tx: DateTime<Utc>,
    pub last_tx: DateTime<Utc>,
    pub percentage_of_total: f64,
    pub daily_average: Decimal,
    pub volatility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDelta {
    pub category_id: Option<CategoryId>,
    pub current_total: Decimal,
    pub previous_total: Decimal,
    pub absolute_delta: Decimal,
    pub percentage_delta: f64,
    pub is_significant: bool,
    pub trend: calculators::Direction,
    pub is_new: bool,
    pub is_discontinued: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct OverallTotals {
    pub income: Decimal,
    pub expenses: Decimal,
    pub transfers: Decimal,
    pub net: Decimal,
    pub savings_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowAggregation {
    pub window_days: i64,
    pub category_totals: Vec<CategoryTotal>,
    pub category_deltas: Vec<CategoryDelta>,
    pub overall: OverallTotals,
    pub daily_average_expense: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    pub windows: Vec<WindowAggregation>,
    pub signals: Vec<FinancialSignal>,
}

#[derive(Debug, Clone)]
pub struct AggregationOptions {
    pub periods: Vec<i64>,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            periods: vec![30, 60, 90],
        }
    }
}

pub struct AggregationEngine {
    transactions: Arc<dyn TransactionRepository>,
}

impl AggregationEngine {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    pub async fn run_aggregation(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        options: &AggregationOptions,
    ) -> Result<AggregationResult> {
        let mut windows = Vec::with_capacity(options.periods.len());
        let mut signals = Vec::new();

        for &d in &options.periods {
            let window = self.aggregate_window(user_id, reference, d).await?;
            signals.extend(self.emit_window_signals(user_id, reference, d, &window));
            windows.push(window);
        }

        Ok(AggregationResult { windows, signals })
    }

    async fn aggregate_window(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        window_days: i64,
    ) -> Result<WindowAggregation> {
        let current_start = reference - chrono::Duration::days(window_days);
        let previous_start = reference - chrono::Duration::days(window_days * 2);
        let previous_end = current_start;

        let current_txs = self
            .transactions
            .list_in_range(user_id, None, current_start, reference)
            .await?;
        let previous_txs = self
            .transactions
            .list_in_range(user_id, None, previous_start, previous_end)
            .await?;

        let category_totals = bucket_totals(&current_txs, window_days);
        let grand_total: Decimal = category_totals.iter().map(|c| c.total).sum();
        let category_totals: Vec<CategoryTotal> = category_totals
            .into_iter()
            .map(|mut c| {
                c.percentage_of_total = if grand_total == Decimal::ZERO {
                    0.0
                } else {
                    (c.total / grand_total * Decimal::from(100))
                        .to_f64()
                        .unwrap_or(0.0)
                };
                c
            })
            .collect();

        let previous_totals = bucket_totals(&previous_txs, window_days);
        let category_deltas = build_deltas(&category_totals, &previous_totals);

        let overall = overall_totals(&current_txs);
        let daily_average_expense = overall.expenses / Decimal::from(window_days.max(1));

        Ok(WindowAggregation {
            window_days,
            category_totals,
            category_deltas,
            overall,
            daily_average_expense,
        })
    }

    fn emit_window_signals(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
        window_days: i64,
        window: &WindowAggregation,
    ) -> Vec<FinancialSignal> {
        let mut signals = Vec::new();
        let period = SignalPeriod {
            start_date: reference - chrono::Duration::days(window_days),
            end_date: reference,
            comparison_start: None,
            comparison_end: None,
        };

        for total in &window.category_totals {
            if total.total > Decimal::from(1000) {
                let priority = if total.percentage_of_total > 30.0 { 1 } else { 3 };
                signals.push(
                    FinancialSignal::new(
                        user_id,
                        SignalType::CategoryAggregation,
                        format!("High spending in category over {window_days} days"),
                        crate::domain::SignalValue {
                            current: total.total,
                            previous: None,
                            delta: None,
                            percentage: Some(total.percentage_of_total),
                        },
                        period.clone(),
                        total.category_id,
                        priority,
                    )
                    .with_aggregated_data(serde_json::json!({ "window_days": window_days })),
                );
            }
        }

        for delta in &window.category_deltas {
            if delta.is_significant {
                let priority = if delta.percentage_delta.abs() > 50.0 { 1 } else { 2 };
                signals.push(FinancialSignal::new(
                    user_id,
                    SignalType::CategoryDelta,
                    format!("Significant spending change over {window_days} days"),
                    crate::domain::SignalValue {
                        current: delta.current_total,
                        previous: Some(delta.previous_total),
                        delta: Some(delta.absolute_delta),
                        percentage: Some(delta.percentage_delta),
                    },
                    period.clone(),
                    delta.category_id,
                    priority,
                ));
            }
        }

        if window.overall.net < Decimal::ZERO {
            signals.push(FinancialSignal::new(
                user_id,
                SignalType::RiskDetected,
                format!("Negative cash flow over {window_days} days"),
                crate::domain::SignalValue {
                    current: window.overall.net,
                    previous: None,
                    delta: None,
                    percentage: None,
                },
                period.clone(),
                None,
                1,
            ));
        }

        if window.overall.income > Decimal::ZERO && window.overall.savings_rate < 10.0 {
            signals.push(FinancialSignal::new(
                user_id,
                SignalType::RiskDetected,
                format!("Low savings rate over {window_days} days"),
                crate::domain::SignalValue {
                    current: Decimal::ZERO,
                    previous: None,
                    delta: None,
                    percentage: Some(window.overall.savings_rate),
                },
                period,
                None,
                2,
            ));
        }

        signals
    }
}

fn bucket_totals(txs: &[Transaction], window_days: i64) -> Vec<CategoryTotal> {
    let mut buckets: HashMap<Option<CategoryId>, Vec<&Transaction>> = HashMap::new();
    for tx in txs {
        if tx.transaction_type != TransactionType::Expense
            || tx.status != crate::domain::TransactionStatus::Completed
        {
            continue;
        }
        buckets.entry(tx.category_id).or_default().push(tx);
    }

    buckets
        .into_iter()
        .filter(|(_, txs)| !txs.is_empty())
        .map(|(category_id, txs)| {
            let amounts: Vec<Decimal> = txs.iter().map(|t| t.amount.abs()).collect();
            let total: Decimal = amounts.iter().copied().sum();
            let count = amounts.len();
            let avg = total / Decimal::from(count as i64);
            let min = amounts.iter().copied().min().unwrap_or(Decimal::ZERO);
            let max = amounts.iter().copied().max().unwrap_or(Decimal::ZERO);
            let first_tx = txs.iter().map(|t| t.date).min().unwrap_or_default();
            let last_tx = txs.iter().map(|t| t.date).max().unwrap_or_default();
            let floats: Vec<f64> = amounts.iter().filter_map(|d| d.to_f64()).collect();
            let volatility = calculators::coefficient_of_variation(&floats);
            CategoryTotal {
                category_id,
                total,
                count,
                avg,
                min,
                max,
                first_tx,
                last_tx,
                percentage_of_total: 0.0,
                daily_average: total / Decimal::from(window_days.max(1)),
                volatility,
            }
        })
        .collect()
}

fn build_deltas(current: &[CategoryTotal], previous: &[CategoryTotal]) -> Vec<CategoryDelta> {
    let mut by_category: HashMap<Option<CategoryId>, (Decimal, Decimal)> = HashMap::new();
    for c in current {
        by_category.entry(c.category_id).or_insert((Decimal::ZERO, Decimal::ZERO)).0 = c.total;
    }
    for p in previous {
        by_category.entry(p.category_id).or_insert((Decimal::ZERO, Decimal::ZERO)).1 = p.total;
    }

    by_category
        .into_iter()
        .map(|(category_id, (current_total, previous_total))| {
            let result = calculators::delta(current_total, previous_total);
            CategoryDelta {
                category_id,
                current_total,
                previous_total,
                absolute_delta: result.absolute,
                percentage_delta: result.percentage,
                is_significant: result.percentage.abs() > 20.0,
                trend: result.direction,
                is_new: previous_total == Decimal::ZERO && current_total > Decimal::ZERO,
                is_discontinued: current_total == Decimal::ZERO && previous_total > Decimal::ZERO,
            }
        })
        .collect()
}

fn overall_totals(txs: &[Transaction]) -> OverallTotals {
    let mut income = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    let mut transfers = Decimal::ZERO;

    for tx in txs {
        if tx.status != crate::domain::TransactionStatus::Completed {
            continue;
        }
        match tx.transaction_type {
            TransactionType::Income => income += tx.amount.abs(),
            TransactionType::Expense => expenses += tx.amount.abs(),
            TransactionType::Transfer => transfers += tx.amount.abs(),
        }
    }

    let net = income - expenses;
    let savings_rate = if income == Decimal::ZERO {
        0.0
    } else {
        (net / income * Decimal::from(100)).to_f64().unwrap_or(0.0)
    };

    OverallTotals {
        income,
        expenses,
        transfers,
        net,
        savings_rate,
    }
}
