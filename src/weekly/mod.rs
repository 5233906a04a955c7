//! Weekly Summary service (C9): metric aggregation, shift detection, insight
//! filtering, and LLM-backed narrative synthesis.
//!
//! A single aggregate -> compare -> prompt -> filter -> render pipeline,
//! with an explicit fallback path the summary generator takes whenever the
//! narrative step fails rather than ever serving a stale cached summary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::dates::{self, WeekStart};
use crate::domain::{
    is_significant_shift, shift_tier, BudgetStatusEntry, CategoryBreakdownEntry, Insight,
    InsightKind, Result, ShiftTier, SignificantShift, Transaction, TransactionType, UserId,
    WeekdayWeekendSplit, WeeklyMetric, WeeklySummary,
};
use crate::engine::calculators;
use crate::llm::{sanitize_pii, truncate_for_prompt, validate_no_invented_ids, LlmClient};
use crate::storage::Repositories;

const MIN_INSIGHT_CONFIDENCE: u8 = 70;
const MIN_IMPACT_AMOUNT: i64 = 10;
const MIN_IMPACT_PERCENTAGE: f64 = 5.0;
const MAX_PER_TYPE: usize = 2;
const MAX_INSIGHTS: usize = 5;
const MOVING_AVERAGE_WEEKS: usize = 4;

/// Builds a `WeeklyMetric` for one `(user_id, week_start..week_end)` window.
pub struct MetricAggregator {
    repos: Repositories,
}

impl MetricAggregator {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn aggregate_weekly_metrics(
        &self,
        user_id: UserId,
        week_start: DateTime<Utc>,
        week_end: DateTime<Utc>,
    ) -> Result<WeeklyMetric> {
        let transactions = self
            .repos
            .transactions
            .list_in_range(user_id, None, week_start, week_end)
            .await?;
        let completed: Vec<&Transaction> = transactions.iter().filter(|t| t.is_completed()).collect();

        let mut metric = WeeklyMetric::new(user_id, week_start, week_end);

        let income: Decimal = completed
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Income)
            .map(|t| t.amount)
            .sum();
        let expenses: Decimal = completed
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Expense)
            .map(|t| t.amount)
            .sum();
        metric.income = income;
        metric.expenses = expenses;
        metric.net = income - expenses;
        metric.savings = if metric.net > Decimal::ZERO { metric.net } else { Decimal::ZERO };

        metric.category_breakdown = self.category_breakdown(user_id, &completed).await?;
        metric.budget_status = self.budget_status(user_id, week_start, &completed).await?;
        metric.volatility = self.expense_volatility(&completed);
        metric.weekday_vs_weekend = weekday_weekend_split(&completed);

        Ok(metric)
    }

    async fn category_breakdown(
        &self,
        user_id: UserId,
        completed: &[&Transaction],
    ) -> Result<Vec<CategoryBreakdownEntry>> {
        let categories = self.repos.categories.list_by_user(user_id).await?;
        let names: HashMap<_, _> = categories.iter().map(|c| (c.id, c.name.clone())).collect();

        let total: Decimal = completed
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Expense)
            .map(|t| t.amount)
            .sum();

        let mut totals: HashMap<_, Decimal> = HashMap::new();
        for t in completed.iter().filter(|t| t.transaction_type == TransactionType::Expense) {
            if let Some(category_id) = t.category_id {
                *totals.entry(category_id).or_insert(Decimal::ZERO) += t.amount;
            }
        }

        let mut breakdown: Vec<CategoryBreakdownEntry> = totals
            .into_iter()
            .map(|(category_id, amount)| {
                let percentage = if total == Decimal::ZERO {
                    0.0
                } else {
                    (amount / total * Decimal::from(100)).to_f64().unwrap_or(0.0)
                };
                CategoryBreakdownEntry {
                    category_name: names.get(&category_id).cloned().unwrap_or_else(|| "Uncategorized".into()),
                    total: amount,
                    percentage_of_total: percentage,
                }
            })
            .collect();
        breakdown.sort_by(|a, b| b.total.cmp(&a.total));
        Ok(breakdown)
    }

    async fn budget_status(
        &self,
        user_id: UserId,
        week_start: DateTime<Utc>,
        completed: &[&Transaction],
    ) -> Result<Vec<BudgetStatusEntry>> {
        let budgets = self.repos.budgets.list_active_by_user(user_id).await?;
        let mut entries = Vec::with_capacity(budgets.len());
        for budget in budgets {
            let period_limit = per_week_share(budget.amount, budget.period);
            let spent: Decimal = completed
                .iter()
                .filter(|t| t.transaction_type == TransactionType::Expense && t.category_id == Some(budget.category_id))
                .map(|t| t.amount)
                .sum();
            let utilization = if period_limit == Decimal::ZERO {
                0.0
            } else {
                (spent / period_limit).to_f64().unwrap_or(0.0)
            };
            entries.push(BudgetStatusEntry {
                budget_name: budget.name,
                spent,
                limit: period_limit,
                utilization,
            });
        }
        let _ = week_start;
        Ok(entries)
    }

    fn expense_volatility(&self, completed: &[&Transaction]) -> f64 {
        let amounts: Vec<f64> = completed
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Expense)
            .map(|t| t.amount.to_f64().unwrap_or(0.0))
            .collect();
        calculators::coefficient_of_variation(&amounts)
    }
}

fn per_week_share(amount: Decimal, period: crate::domain::BudgetPeriod) -> Decimal {
    use crate::domain::BudgetPeriod::*;
    match period {
        Weekly => amount,
        Monthly => amount / Decimal::from(52) * Decimal::from(12),
        Yearly => amount / Decimal::from(52),
    }
}

fn weekday_weekend_split(completed: &[&Transaction]) -> WeekdayWeekendSplit {
    use chrono::Datelike;
    let mut split = WeekdayWeekendSplit::default();
    for t in completed.iter().filter(|t| t.transaction_type == TransactionType::Expense) {
        match t.date.weekday() {
            chrono::Weekday::Sat | chrono::Weekday::Sun => split.weekend_total += t.amount,
            _ => split.weekday_total += t.amount,
        }
    }
    split
}

/// Compares a current `WeeklyMetric` against the previous week and the
/// trailing 4-week moving average, surfacing every significant shift.
pub struct ShiftDetector;

impl ShiftDetector {
    pub fn detect_shifts(
        current: &WeeklyMetric,
        previous: Option<&WeeklyMetric>,
        historical: &[WeeklyMetric],
    ) -> Vec<SignificantShift> {
        let mut shifts = Vec::new();

        if let Some(previous) = previous {
            push_shift(&mut shifts, "expenses", previous.expenses, current.expenses);
            push_shift(&mut shifts, "income", previous.income, current.income);
            push_shift(&mut shifts, "savings", previous.savings, current.savings);
            push_shift(&mut shifts, "net", previous.net, current.net);
        }

        if historical.len() >= MOVING_AVERAGE_WEEKS {
            let window = &historical[historical.len() - MOVING_AVERAGE_WEEKS..];
            let average_expenses = average(window.iter().map(|m| m.expenses));
            push_shift(&mut shifts, "expenses_vs_4wk_avg", average_expenses, current.expenses);
        }

        shifts
    }
}

fn average(values: impl Iterator<Item = Decimal>) -> Decimal {
    let values: Vec<Decimal> = values.collect();
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len() as u64)
}

fn push_shift(shifts: &mut Vec<SignificantShift>, metric_name: &str, previous: Decimal, current: Decimal) {
    let result = calculators::delta(current, previous);
    if is_significant_shift(result.percentage, result.absolute) {
        shifts.push(SignificantShift {
            metric_name: metric_name.to_string(),
            previous_value: previous,
            current_value: current,
            percentage_change: result.percentage,
            absolute_change: result.absolute,
            tier: shift_tier(result.percentage),
        });
    }
}

/// Scores and trims a candidate insight list down to the top 5.
pub struct InsightFilter;

impl InsightFilter {
    pub fn filter_insights(candidates: Vec<Insight>, shifts: &[SignificantShift]) -> Vec<Insight> {
        let aligned_metrics: std::collections::HashSet<&str> =
            shifts.iter().map(|s| s.metric_name.as_str()).collect();

        let mut scored: Vec<(f64, Insight)> = candidates
            .into_iter()
            .filter(|insight| insight.confidence >= MIN_INSIGHT_CONFIDENCE)
            .filter(|insight| passes_impact_floor(insight))
            .map(|insight| (Self::score(&insight, &aligned_metrics), insight))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut per_type: HashMap<InsightKind, usize> = HashMap::new();
        let mut result = Vec::new();
        for (_, insight) in scored {
            let count = per_type.entry(insight.kind).or_insert(0);
            if *count >= MAX_PER_TYPE {
                continue;
            }
            *count += 1;
            result.push(insight);
            if result.len() >= MAX_INSIGHTS {
                break;
            }
        }
        result
    }

    fn score(insight: &Insight, aligned_metrics: &std::collections::HashSet<&str>) -> f64 {
        let mut score = insight.confidence as f64;
        if !insight.action_items.is_empty() {
            score += 15.0;
        }
        if insight
            .signal_type
            .map(|t| aligned_metrics.contains(format!("{t:?}").to_lowercase().as_str()))
            .unwrap_or(false)
        {
            score += 10.0;
        }
        score
    }
}

fn passes_impact_floor(insight: &Insight) -> bool {
    let amount_ok = insight
        .impact_amount
        .map(|amount| amount.abs() >= Decimal::from(MIN_IMPACT_AMOUNT))
        .unwrap_or(true);
    let percentage_ok = insight
        .impact_percentage
        .map(|pct| pct.abs() >= MIN_IMPACT_PERCENTAGE)
        .unwrap_or(true);
    amount_ok && percentage_ok
}

/// Orchestrates aggregate -> compare -> prompt LLM -> filter -> render.
pub struct SummaryGenerator<'a, C: LlmClient + ?Sized> {
    repos: Repositories,
    llm: &'a C,
    week_start_config: WeekStart,
}

const WEEKLY_SCHEMA_REQUIRED: &[&str] = &["overview", "insights"];

impl<'a, C: LlmClient + ?Sized> SummaryGenerator<'a, C> {
    pub fn new(repos: Repositories, llm: &'a C, week_start_config: WeekStart) -> Self {
        Self {
            repos,
            llm,
            week_start_config,
        }
    }

    pub async fn generate(&self, user_id: UserId, reference: DateTime<Utc>) -> Result<WeeklySummary> {
        let week_start = dates::week_start_for(reference, self.week_start_config);
        let week_end = week_start + chrono::Duration::days(6) + chrono::Duration::milliseconds(86_399_999);

        let aggregator = MetricAggregator::new(self.repos.clone());
        let metric = aggregator
            .aggregate_weekly_metrics(user_id, week_start, week_end)
            .await?;

        let historical = self.repos.weekly.list_recent_metrics(user_id, 8).await?;
        let previous = historical.last();
        let shifts = ShiftDetector::detect_shifts(&metric, previous, &historical);

        match self.try_llm_summary(user_id, &metric, &shifts).await {
            Ok((overview, insights)) => {
                let filtered = InsightFilter::filter_insights(insights, &shifts);
                let mut summary = WeeklySummary::new(metric, overview, true);
                summary.insight_ids = filtered.iter().map(|i| i.id).collect();
                summary.insights = filtered;
                summary.significant_shifts = shifts;
                self.repos.weekly.upsert_metric(&summary.metric).await?;
                self.repos.weekly.upsert_summary(&summary).await?;
                Ok(summary)
            }
            Err(_) => {
                let fallback_insight = Insight::fallback_summary_incomplete(user_id);
                let overview = format!(
                    "Weekly metrics for the week of {} were computed, but narrative synthesis failed.",
                    week_start.format("%Y-%m-%d")
                );
                let mut summary = WeeklySummary::new(metric, overview, false);
                summary.insight_ids = vec![fallback_insight.id];
                summary.insights = vec![fallback_insight];
                summary.significant_shifts = shifts;
                self.repos.weekly.upsert_metric(&summary.metric).await?;
                self.repos.weekly.upsert_summary(&summary).await?;
                Ok(summary)
            }
        }
    }

    async fn try_llm_summary(
        &self,
        user_id: UserId,
        metric: &WeeklyMetric,
        shifts: &[SignificantShift],
    ) -> Result<(String, Vec<Insight>)> {
        let (prompt, payload) = build_prompt(metric, shifts);
        let schema = json!({ "required": WEEKLY_SCHEMA_REQUIRED });
        let response = self.llm.generate_structured(&prompt, &schema).await?;

        validate_no_invented_ids(&response.data, &payload, &["category_name"])?;

        let overview = response
            .data
            .get("overview")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let insights = response
            .data
            .get("insights")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|item| insight_from_json(user_id, item)).collect())
            .unwrap_or_default();

        Ok((overview, insights))
    }
}

/// Builds the LLM prompt and returns the (sanitized, truncated) payload
/// alongside it so the caller can validate the response against the same
/// known-identifier set that was actually sent.
fn build_prompt(metric: &WeeklyMetric, shifts: &[SignificantShift]) -> (String, Value) {
    let categories: Vec<Value> = metric
        .category_breakdown
        .iter()
        .map(|c| json!(c))
        .collect();
    let deltas: Vec<Value> = shifts
        .iter()
        .map(|s| json!({
            "metric": s.metric_name,
            "percentage_change": s.percentage_change,
            "absolute_change": s.absolute_change.to_string(),
            "tier": format!("{:?}", s.tier),
        }))
        .collect();
    let (categories, deltas, _risks) = truncate_for_prompt(categories, deltas, Vec::new());

    let payload = sanitize_pii(&json!({
        "income": metric.income.to_string(),
        "expenses": metric.expenses.to_string(),
        "savings": metric.savings.to_string(),
        "net": metric.net.to_string(),
        "volatility": metric.volatility,
        "category_breakdown": categories,
        "shifts": deltas,
    }));

    let prompt = format!(
        "ANALYSIS TASK: Summarize this user's weekly financial activity and surface notable insights.\n\
         Data: {payload}\n\
         RESPONSE FORMAT: JSON object with an \"overview\" string and an \"insights\" array, each insight \
         carrying title, description, confidence (0-100), kind (warning|opportunity|info|achievement). \
         Only reference categories by the category_name values given above."
    );
    (prompt, payload)
}

fn insight_from_json(user_id: UserId, value: &Value) -> Option<Insight> {
    let title = value.get("title")?.as_str()?.to_string();
    let description = value.get("description").and_then(Value::as_str).unwrap_or_default();
    let confidence = value.get("confidence").and_then(Value::as_u64).unwrap_or(0) as u8;
    let kind = match value.get("kind").and_then(Value::as_str).unwrap_or("info") {
        "warning" => InsightKind::Warning,
        "opportunity" => InsightKind::Opportunity,
        "achievement" => InsightKind::Achievement,
        _ => InsightKind::Info,
    };

    let mut insight = Insight::new(user_id, kind, title, description, confidence);
    if let (Some(amount), Some(percentage)) = (
        value.get("impact_amount").and_then(Value::as_f64),
        value.get("impact_percentage").and_then(Value::as_f64),
    ) {
        insight = insight.with_impact(Decimal::try_from(amount).unwrap_or(Decimal::ZERO), percentage);
    }
    if let Some(items) = value.get("action_items").and_then(Value::as_array) {
        let action_items = items.iter().filter_map(|v| v.as_str().map(String::from)).collect();
        insight = insight.with_action_items(action_items);
    }
    Some(insight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, CategoryType, Transaction, TransactionStatus};
    use crate::llm::{LlmTransportError, RawLlmClient};
    use rust_decimal_macros::dec;

    struct StubLlm {
        response: String,
    }

    #[async_trait::async_trait]
    impl RawLlmClient for StubLlm {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, LlmTransportError> {
            Ok(self.response.clone())
        }
    }

    struct FailingLlm;

    #[async_trait::async_trait]
    impl RawLlmClient for FailingLlm {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, LlmTransportError> {
            Err(LlmTransportError::Transport("down".into()))
        }
    }

    async fn seed_transactions(repos: &Repositories, user_id: UserId, week_start: DateTime<Utc>) {
        let category = Category::new(user_id, "Groceries", CategoryType::Need);
        repos.categories.create(&category).await.unwrap();

        let income = Transaction::new(user_id, dec!(1000), TransactionType::Income, "Paycheck", week_start)
            .with_status(TransactionStatus::Completed);
        repos.transactions.create(&income).await.unwrap();

        let expense = Transaction::new(user_id, dec!(200), TransactionType::Expense, "Weekly shop", week_start + chrono::Duration::days(1))
            .with_status(TransactionStatus::Completed)
            .with_category(category.id);
        repos.transactions.create(&expense).await.unwrap();
    }

    #[tokio::test]
    async fn aggregates_income_and_expenses() {
        let repos = Repositories::in_memory();
        let user_id = UserId::new();
        let week_start = dates::week_start_for(Utc::now(), WeekStart::Monday);
        seed_transactions(&repos, user_id, week_start).await;

        let aggregator = MetricAggregator::new(repos);
        let metric = aggregator
            .aggregate_weekly_metrics(user_id, week_start, week_start + chrono::Duration::days(6))
            .await
            .unwrap();

        assert_eq!(metric.income, dec!(1000));
        assert_eq!(metric.expenses, dec!(200));
        assert_eq!(metric.net, dec!(800));
        assert_eq!(metric.category_breakdown.len(), 1);
    }

    #[test]
    fn shift_detector_flags_large_expense_jump() {
        let user_id = UserId::new();
        let week_start = Utc::now();
        let mut previous = WeeklyMetric::new(user_id, week_start, week_start);
        previous.expenses = dec!(100);
        let mut current = WeeklyMetric::new(user_id, week_start, week_start);
        current.expenses = dec!(300);

        let shifts = ShiftDetector::detect_shifts(&current, Some(&previous), &[]);
        assert!(shifts.iter().any(|s| s.metric_name == "expenses"));
    }

    #[test]
    fn insight_filter_drops_low_confidence_and_low_impact() {
        let user_id = UserId::new();
        let low_confidence = Insight::new(user_id, InsightKind::Info, "low", "x", 50);
        let mut low_impact = Insight::new(user_id, InsightKind::Info, "tiny", "x", 90);
        low_impact = low_impact.with_impact(dec!(2), 1.0);
        let mut keeper = Insight::new(user_id, InsightKind::Warning, "big", "x", 90);
        keeper = keeper.with_impact(dec!(200), 30.0);

        let filtered = InsightFilter::filter_insights(vec![low_confidence, low_impact, keeper], &[]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "big");
    }

    #[test]
    fn insight_filter_caps_per_type() {
        let user_id = UserId::new();
        let insights: Vec<Insight> = (0..5)
            .map(|i| {
                let mut insight = Insight::new(user_id, InsightKind::Warning, format!("w{i}"), "x", 90);
                insight = insight.with_impact(dec!(200), 30.0);
                insight
            })
            .collect();
        let filtered = InsightFilter::filter_insights(insights, &[]);
        assert_eq!(filtered.len(), 2);
    }

    #[tokio::test]
    async fn summary_generator_falls_back_on_llm_failure() {
        let repos = Repositories::in_memory();
        let user_id = UserId::new();
        let week_start = dates::week_start_for(Utc::now(), WeekStart::Monday);
        seed_transactions(&repos, user_id, week_start).await;

        let raw = FailingLlm;
        let adapter = crate::llm::LlmAdapter::new(raw).with_timeout(std::time::Duration::from_millis(50));
        let generator = SummaryGenerator::new(repos, &adapter, WeekStart::Monday);

        let summary = generator.generate(user_id, Utc::now()).await.unwrap();
        assert!(!summary.generated_with_llm);
        assert_eq!(summary.insights.len(), 1);
        assert_eq!(summary.insights[0].title, "Summary generation incomplete");
        assert_eq!(summary.insights[0].confidence, 100);
    }

    #[tokio::test]
    async fn summary_generator_uses_llm_overview_on_success() {
        let repos = Repositories::in_memory();
        let user_id = UserId::new();
        let week_start = dates::week_start_for(Utc::now(), WeekStart::Monday);
        seed_transactions(&repos, user_id, week_start).await;

        let raw = StubLlm {
            response: json!({
                "overview": "Spending was stable this week.",
                "insights": [{
                    "title": "Groceries on track",
                    "description": "Spending matched budget.",
                    "confidence": 80,
                    "kind": "info",
                    "impact_amount": 200.0,
                    "impact_percentage": 10.0,
                }]
            })
            .to_string(),
        };
        let adapter = crate::llm::LlmAdapter::new(raw);
        let generator = SummaryGenerator::new(repos, &adapter, WeekStart::Monday);

        let summary = generator.generate(user_id, Utc::now()).await.unwrap();
        assert!(summary.generated_with_llm);
        assert_eq!(summary.overview, "Spending was stable this week.");
        assert_eq!(summary.insights.len(), 1);
    }
}
