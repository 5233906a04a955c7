//! PatternEngine — monthly growth, spending-day patterns, income regularity,
//! and seasonal bumps over a trailing lookback window (C4).
//!
//! A stateless engine that pulls a time series, runs it through the shared
//! calculators, and emits signals rather than returning raw numbers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc, Weekday};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::domain::{
    CategoryId, FinancialSignal, Result, SignalPeriod, SignalType, Transaction, TransactionType,
    UserId,
};
use crate::engine::calculators::{self, DatedAmount};
use crate::storage::TransactionRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingPattern {
    WeekendFocused,
    WeekdayFocused,
    Mixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPattern {
    pub category_id: Option<CategoryId>,
    pub monthly_totals: Vec<f64>,
    pub growth: calculators::GrowthResult,
    pub spending_pattern: SpendingPattern,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IncomePattern {
    pub stability: f64,
    pub is_regular: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalBump {
    pub month: u32,
    pub factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternResult {
    pub categories: Vec<CategoryPattern>,
    pub income: IncomePattern,
    pub seasonal_bumps: Vec<SeasonalBump>,
    pub signals: Vec<FinancialSignal>,
}

#[derive(Debug, Clone, Copy)]
pub struct PatternEngineConfig {
    pub lookback_months: i32,
    /// Inter-arrival coefficient-of-variation threshold below which income is
    /// considered regular. Configurable rather than derived statistically;
    /// default 0.2.
    pub income_regularity_threshold: f64,
}

impl Default for PatternEngineConfig {
    fn default() -> Self {
        Self {
            lookback_months: 6,
            income_regularity_threshold: 0.2,
        }
    }
}

pub struct PatternEngine {
    transactions: Arc<dyn TransactionRepository>,
    config: PatternEngineConfig,
}

impl PatternEngine {
    pub fn new(transactions: Arc<dyn TransactionRepository>, config: PatternEngineConfig) -> Self {
        Self { transactions, config }
    }

    pub async fn run_pattern_analysis(
        &self,
        user_id: UserId,
        reference: DateTime<Utc>,
    ) -> Result<PatternResult> {
        let start = dates::add_months(reference, -self.config.lookback_months);
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
        let income: Vec<&Transaction> = txs
            .iter()
            .filter(|t| {
                t.transaction_type == TransactionType::Income
                    && t.status == crate::domain::TransactionStatus::Completed
            })
            .collect();

        let categories = self.category_patterns(&expenses, reference);
        let income_pattern = self.income_pattern(&income);
        let seasonal_bumps = seasonal_bumps(&expenses, reference);

        let period = SignalPeriod {
            start_date: start,
            end_date: reference,
            comparison_start: None,
            comparison_end: None,
        };

        let mut signals = Vec::new();
        for cat in &categories {
            if cat.growth.average_rate > 0.1 {
                signals.push(FinancialSignal::new(
                    user_id,
                    SignalType::GrowthTrend,
                    "Rising spending trend in category",
                    crate::domain::SignalValue {
                        current: rust_decimal::Decimal::ZERO,
                        previous: None,
                        delta: None,
                        percentage: Some(cat.growth.average_rate * 100.0),
                    },
                    period.clone(),
                    cat.category_id,
                    2,
                ));
            }
        }

        let dated_amounts: Vec<DatedAmount> = expenses
            .iter()
            .map(|t| DatedAmount {
                date: t.date,
                amount: t.amount.abs(),
            })
            .collect();
        let clusters = calculators::cluster(&dated_amounts, 14, 3);
        for cluster in clusters.iter().filter(|c| c.is_outlier) {
            signals.push(FinancialSignal::new(
                user_id,
                SignalType::SpendingCluster,
                "Unusual spending cluster detected",
                crate::domain::SignalValue {
                    current: cluster.total,
                    previous: None,
                    delta: None,
                    percentage: None,
                },
                period.clone(),
                None,
                2,
            ));
        }

        if income_pattern.stability < 0.7 {
            signals.push(FinancialSignal::new(
                user_id,
                SignalType::IncomeStability,
                "Income has become less stable",
                crate::domain::SignalValue {
                    current: rust_decimal::Decimal::ZERO,
                    previous: None,
                    delta: None,
                    percentage: Some(income_pattern.stability * 100.0),
                },
                period,
                None,
                2,
            ));
        }

        Ok(PatternResult {
            categories,
            income: income_pattern,
            seasonal_bumps,
            signals,
        })
    }

    fn category_patterns(
        &self,
        expenses: &[&Transaction],
        reference: DateTime<Utc>,
    ) -> Vec<CategoryPattern> {
        let mut by_category: HashMap<Option<CategoryId>, Vec<&Transaction>> = HashMap::new();
        for tx in expenses {
            by_category.entry(tx.category_id).or_default().push(tx);
        }

        by_category
            .into_iter()
            .map(|(category_id, txs)| {
                let monthly_totals = monthly_totals(&txs, reference, self.config.lookback_months);
                let growth = calculators::growth(&monthly_totals, false);
                let spending_pattern = weekday_weekend_pattern(&txs);
                CategoryPattern {
                    category_id,
                    monthly_totals,
                    growth,
                    spending_pattern,
                }
            })
            .collect()
    }

    fn income_pattern(&self, income: &[&Transaction]) -> IncomePattern {
        if income.len() < 2 {
            return IncomePattern {
                stability: 1.0,
                is_regular: false,
            };
        }
        let mut sorted: Vec<&&Transaction> = income.iter().collect();
        sorted.sort_by_key(|t| t.date);

        let monthly_totals = monthly_totals_by_calendar_month(income);
        let cv = calculators::coefficient_of_variation(&monthly_totals);
        let stability = (1.0 - cv).max(0.0);

        let intervals: Vec<f64> = sorted
            .windows(2)
            .map(|w| (w[1].date - w[0].date).num_days() as f64)
            .collect();
        let interval_cv = calculators::coefficient_of_variation(&intervals);
        let is_regular = interval_cv < self.config.income_regularity_threshold;

        IncomePattern { stability, is_regular }
    }
}

fn monthly_totals(txs: &[&Transaction], reference: DateTime<Utc>, lookback_months: i32) -> Vec<f64> {
    let mut totals = vec![0.0; lookback_months as usize];
    for tx in txs {
        for i in 0..lookback_months {
            let month_start = dates::add_months(reference, -(i + 1));
            let month_end = dates::add_months(reference, -i);
            if tx.date >= month_start && tx.date < month_end {
                let idx = (lookback_months - 1 - i) as usize;
                totals[idx] += tx.amount.abs().to_f64().unwrap_or(0.0);
                break;
            }
        }
    }
    totals
}

fn monthly_totals_by_calendar_month(txs: &[&Transaction]) -> Vec<f64> {
    let mut by_month: HashMap<(i32, u32), f64> = HashMap::new();
    for tx in txs {
        let key = (tx.date.year(), tx.date.month());
        *by_month.entry(key).or_insert(0.0) += tx.amount.abs().to_f64().unwrap_or(0.0);
    }
    let mut keys: Vec<(i32, u32)> = by_month.keys().copied().collect();
    keys.sort();
    keys.into_iter().map(|k| by_month[&k]).collect()
}

fn weekday_weekend_pattern(txs: &[&Transaction]) -> SpendingPattern {
    let weekend_count = txs
        .iter()
        .filter(|t| matches!(t.date.weekday(), Weekday::Sat | Weekday::Sun))
        .count();
    let weekday_count = txs.len() - weekend_count;

    if weekday_count > 0 && weekend_count > weekday_count * 2 {
        SpendingPattern::WeekendFocused
    } else if weekend_count > 0 && weekday_count > weekend_count * 2 {
        SpendingPattern::WeekdayFocused
    } else {
        SpendingPattern::Mixed
    }
}

fn seasonal_bumps(expenses: &[&Transaction], reference: DateTime<Utc>) -> Vec<SeasonalBump> {
    let mut by_month: HashMap<u32, f64> = HashMap::new();
    for tx in expenses {
        if tx.date.year() == reference.year() - 1 || tx.date.year() == reference.year() {
            *by_month.entry(tx.date.month()).or_insert(0.0) += tx.amount.abs().to_f64().unwrap_or(0.0);
        }
    }
    if by_month.is_empty() {
        return Vec::new();
    }
    let yearly_average = by_month.values().sum::<f64>() / by_month.len() as f64;
    if yearly_average == 0.0 {
        return Vec::new();
    }
    let mut bumps: Vec<SeasonalBump> = by_month
        .into_iter()
        .map(|(month, total)| SeasonalBump {
            month,
            factor: total / yearly_average,
        })
        .filter(|b| b.factor > 1.3)
        .collect();
    bumps.sort_by_key(|b| b.month);
    bumps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn unstable_income_emits_stability_signal() {
        let store = Arc::new(MemoryStore::new());
        let user_id = UserId::new();
        let now = Utc::now();

        let amounts = [dec!(3000), dec!(500), dec!(4200), dec!(100)];
        for (i, amount) in amounts.iter().enumerate() {
            let mut tx = Transaction::new(
                user_id,
                *amount,
                TransactionType::Income,
                "paycheck",
                now - chrono::Duration::days(30 * i as i64),
            );
            tx.status = crate::domain::TransactionStatus::Completed;
            store.create(&tx).await.unwrap();
        }

        let engine = PatternEngine::new(store, PatternEngineConfig::default());
        let result = engine.run_pattern_analysis(user_id, now).await.unwrap();

        assert!(result.income.stability < 0.7);
        assert!(result
            .signals
            .iter()
            .any(|s| s.signal_type == SignalType::IncomeStability));
    }
}
