//! In-memory repository implementations.
//!
//! The primary wiring for tests and for the CLI's `--storage memory` mode:
//! a `RwLock`-guarded `HashMap` behind a cheap-to-clone handle.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{
    Budget, BudgetId, Category, CategoryId, Insight, InsightId, PendingSuggestion, Result,
    SavingsGoal, SavingsGoalId, SignalId, Subscription, SubscriptionId, SuggestionFeedback,
    SuggestionId, SuggestionLog, SuggestionStatus, SuggestionType, Transaction, TransactionId,
    UserId, UserPreference, WeeklyMetric, WeeklySummary,
};
use crate::domain::error::FinanceOpsError;
use crate::domain::signal::FinancialSignal;

use super::repository::{
    AuditLogRepository, BudgetRepository, CategoryRepository, FeedbackRepository,
    InsightRepository, PreferenceRepository, SavingsGoalRepository, SignalQuery, SignalRepository,
    SignalStats, SubscriptionRepository, SuggestionRepository, TransactionRepository,
    WeeklyRepository,
};

#[derive(Default, Clone)]
pub struct MemoryStore {
    pub transactions: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
    pub categories: Arc<RwLock<HashMap<CategoryId, Category>>>,
    pub budgets: Arc<RwLock<HashMap<BudgetId, Budget>>>,
    pub goals: Arc<RwLock<HashMap<SavingsGoalId, SavingsGoal>>>,
    pub subscriptions: Arc<RwLock<HashMap<SubscriptionId, Subscription>>>,
    pub signals: Arc<RwLock<HashMap<SignalId, FinancialSignal>>>,
    pub insights: Arc<RwLock<HashMap<InsightId, Insight>>>,
    pub suggestions: Arc<RwLock<HashMap<SuggestionId, PendingSuggestion>>>,
    pub feedback: Arc<RwLock<HashMap<SuggestionId, SuggestionFeedback>>>,
    pub preferences: Arc<RwLock<HashMap<UserId, UserPreference>>>,
    pub audit_log: Arc<RwLock<Vec<SuggestionLog>>>,
    pub weekly_metrics: Arc<RwLock<HashMap<(UserId, DateTime<Utc>), WeeklyMetric>>>,
    pub weekly_summaries: Arc<RwLock<HashMap<(UserId, DateTime<Utc>), WeeklySummary>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn create(&self, transaction: &Transaction) -> Result<()> {
        self.transactions
            .write()
            .await
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn get_by_id(&self, user_id: UserId, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .await
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn update(&self, transaction: &Transaction) -> Result<()> {
        self.transactions
            .write()
            .await
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn list_in_range(
        &self,
        user_id: UserId,
        category_id: Option<CategoryId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let txs = self.transactions.read().await;
        let mut out: Vec<Transaction> = txs
            .values()
            .filter(|t| {
                t.user_id == user_id
                    && t.date >= start
                    && t.date <= end
                    && category_id.map(|c| t.category_id == Some(c)).unwrap_or(true)
            })
            .cloned()
            .collect();
        out.sort_by_key(|t| t.date);
        Ok(out)
    }

    async fn list_all_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let txs = self.transactions.read().await;
        let mut out: Vec<Transaction> = txs.values().filter(|t| t.user_id == user_id).cloned().collect();
        out.sort_by_key(|t| t.date);
        Ok(out)
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: &Category) -> Result<()> {
        self.categories
            .write()
            .await
            .insert(category.id, category.clone());
        Ok(())
    }

    async fn get_by_id(&self, user_id: UserId, id: CategoryId) -> Result<Option<Category>> {
        Ok(self
            .categories
            .read()
            .await
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn get_by_name(&self, user_id: UserId, name_key: &str) -> Result<Option<Category>> {
        Ok(self
            .categories
            .read()
            .await
            .values()
            .find(|c| c.user_id == user_id && c.name_key() == name_key)
            .cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Category>> {
        Ok(self
            .categories
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update(&self, category: &Category) -> Result<()> {
        self.categories
            .write()
            .await
            .insert(category.id, category.clone());
        Ok(())
    }

    async fn delete(&self, user_id: UserId, id: CategoryId) -> Result<()> {
        let mut categories = self.categories.write().await;
        if let Some(existing) = categories.get(&id) {
            if existing.user_id != user_id {
                return super::repository::not_found("Category", id);
            }
            if !existing.can_delete() {
                return Err(FinanceOpsError::validation("system categories cannot be deleted"));
            }
        }
        categories.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BudgetRepository for MemoryStore {
    async fn create(&self, budget: &Budget) -> Result<()> {
        self.budgets.write().await.insert(budget.id, budget.clone());
        Ok(())
    }

    async fn get_by_id(&self, user_id: UserId, id: BudgetId) -> Result<Option<Budget>> {
        Ok(self
            .budgets
            .read()
            .await
            .get(&id)
            .filter(|b| b.user_id == user_id)
            .cloned())
    }

    async fn list_active_by_user(&self, user_id: UserId) -> Result<Vec<Budget>> {
        Ok(self
            .budgets
            .read()
            .await
            .values()
            .filter(|b| b.user_id == user_id && b.is_active)
            .cloned()
            .collect())
    }

    async fn update(&self, budget: &Budget) -> Result<()> {
        self.budgets.write().await.insert(budget.id, budget.clone());
        Ok(())
    }

    async fn delete(&self, user_id: UserId, id: BudgetId) -> Result<()> {
        let mut budgets = self.budgets.write().await;
        if let Some(existing) = budgets.get(&id) {
            if existing.user_id != user_id {
                return super::repository::not_found("Budget", id);
            }
        }
        budgets.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl SavingsGoalRepository for MemoryStore {
    async fn create(&self, goal: &SavingsGoal) -> Result<()> {
        self.goals.write().await.insert(goal.id, goal.clone());
        Ok(())
    }

    async fn get_by_id(&self, user_id: UserId, id: SavingsGoalId) -> Result<Option<SavingsGoal>> {
        Ok(self
            .goals
            .read()
            .await
            .get(&id)
            .filter(|g| g.user_id == user_id)
            .cloned())
    }

    async fn list_active_by_user(&self, user_id: UserId) -> Result<Vec<SavingsGoal>> {
        use crate::domain::SavingsGoalStatus;
        Ok(self
            .goals
            .read()
            .await
            .values()
            .filter(|g| g.user_id == user_id && g.status == SavingsGoalStatus::Active)
            .cloned()
            .collect())
    }

    async fn update(&self, goal: &SavingsGoal) -> Result<()> {
        self.goals.write().await.insert(goal.id, goal.clone());
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn create(&self, subscription: &Subscription) -> Result<()> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn get_by_id(&self, user_id: UserId, id: SubscriptionId) -> Result<Option<Subscription>> {
        Ok(self
            .subscriptions
            .read()
            .await
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned())
    }

    async fn list_active_by_user(&self, user_id: UserId) -> Result<Vec<Subscription>> {
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id && s.is_active())
            .cloned()
            .collect())
    }

    async fn update(&self, subscription: &Subscription) -> Result<()> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.id, subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl SignalRepository for MemoryStore {
    async fn store_signal(&self, signal: &FinancialSignal) -> Result<bool> {
        let mut signals = self.signals.write().await;
        let duplicate = signals.values().any(|s| {
            s.is_active && s.data.signal_hash == signal.data.signal_hash
        });
        if duplicate {
            return Ok(false);
        }
        signals.insert(signal.id, signal.clone());
        Ok(true)
    }

    async fn store_signals(&self, signals: &[FinancialSignal]) -> Result<usize> {
        let mut inserted = 0;
        // Sequential to keep the batch's own dedup pass atomic with the store.
        for signal in signals {
            if self.store_signal(signal).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get_user_signals(
        &self,
        user_id: UserId,
        query: &SignalQuery,
    ) -> Result<Vec<FinancialSignal>> {
        let now = Utc::now();
        let signals = self.signals.read().await;
        let mut out: Vec<FinancialSignal> = signals
            .values()
            .filter(|s| s.user_id == user_id)
            .filter(|s| s.expires_at > now)
            .filter(|s| query.include_inactive || s.is_active)
            .filter(|s| {
                query
                    .types
                    .as_ref()
                    .map(|types| types.contains(&s.signal_type))
                    .unwrap_or(true)
            })
            .filter(|s| query.min_priority.map(|p| s.priority <= p).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by_key(|s| s.priority);
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn get_signal_by_id(&self, id: SignalId) -> Result<Option<FinancialSignal>> {
        Ok(self.signals.read().await.get(&id).cloned())
    }

    async fn update_signal_status(
        &self,
        id: SignalId,
        dismissed: bool,
        actioned: bool,
    ) -> Result<()> {
        let mut signals = self.signals.write().await;
        let signal = signals
            .get_mut(&id)
            .ok_or_else(|| FinanceOpsError::not_found("FinancialSignal", id))?;
        if dismissed {
            signal.dismiss();
        } else if actioned {
            signal.mark_actioned();
        } else {
            signal.is_active = true;
            signal.dismissed_at = None;
            signal.actioned_at = None;
        }
        Ok(())
    }

    async fn get_related_signals(&self, id: SignalId, limit: usize) -> Result<Vec<FinancialSignal>> {
        let signals = self.signals.read().await;
        let Some(anchor) = signals.get(&id) else {
            return Ok(Vec::new());
        };
        let mut related: Vec<FinancialSignal> = signals
            .values()
            .filter(|s| {
                s.id != anchor.id
                    && s.user_id == anchor.user_id
                    && (s.category == anchor.category || s.signal_type == anchor.signal_type)
            })
            .cloned()
            .collect();
        related.sort_by_key(|s| s.priority);
        related.truncate(limit);
        Ok(related)
    }

    async fn archive_old_signals(&self, days_old: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(days_old);
        let mut signals = self.signals.write().await;
        let before = signals.len();
        signals.retain(|_, s| s.created_at > cutoff);
        Ok(before - signals.len())
    }

    async fn get_signal_stats(&self, user_id: UserId, days: i64) -> Result<SignalStats> {
        let cutoff = Utc::now() - Duration::days(days);
        let signals = self.signals.read().await;
        let relevant: Vec<&FinancialSignal> = signals
            .values()
            .filter(|s| s.user_id == user_id && s.created_at > cutoff)
            .collect();
        let mut by_type: HashMap<crate::domain::SignalType, u64> = HashMap::new();
        for s in &relevant {
            *by_type.entry(s.signal_type).or_insert(0) += 1;
        }
        Ok(SignalStats {
            total: relevant.len() as u64,
            active: relevant.iter().filter(|s| s.is_active).count() as u64,
            by_type: by_type.into_iter().collect(),
        })
    }
}

#[async_trait]
impl InsightRepository for MemoryStore {
    async fn create(&self, insight: &Insight) -> Result<()> {
        self.insights.write().await.insert(insight.id, insight.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: InsightId) -> Result<Option<Insight>> {
        Ok(self.insights.read().await.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: UserId, limit: usize) -> Result<Vec<Insight>> {
        let insights = self.insights.read().await;
        let mut out: Vec<Insight> = insights
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|i| std::cmp::Reverse(i.created_at));
        out.truncate(limit);
        Ok(out)
    }
}

#[async_trait]
impl SuggestionRepository for MemoryStore {
    async fn create(&self, suggestion: &PendingSuggestion) -> Result<()> {
        self.suggestions
            .write()
            .await
            .insert(suggestion.id, suggestion.clone());
        Ok(())
    }

    async fn get_by_id(
        &self,
        user_id: UserId,
        id: SuggestionId,
    ) -> Result<Option<PendingSuggestion>> {
        Ok(self
            .suggestions
            .read()
            .await
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned())
    }

    async fn update_if_status(
        &self,
        suggestion: &PendingSuggestion,
        expected_status: SuggestionStatus,
    ) -> Result<()> {
        let mut suggestions = self.suggestions.write().await;
        let stored = suggestions
            .get(&suggestion.id)
            .ok_or_else(|| FinanceOpsError::not_found("PendingSuggestion", suggestion.id))?;
        if stored.status != expected_status {
            return Err(FinanceOpsError::concurrency("PendingSuggestion", suggestion.id));
        }
        suggestions.insert(suggestion.id, suggestion.clone());
        Ok(())
    }

    async fn find_active_by_target(
        &self,
        user_id: UserId,
        suggestion_type: SuggestionType,
        target_id: &str,
    ) -> Result<Option<PendingSuggestion>> {
        let suggestions = self.suggestions.read().await;
        Ok(suggestions
            .values()
            .find(|s| {
                s.user_id == user_id
                    && s.suggestion_type == suggestion_type
                    && s.proposed_changes.target_id() == target_id
                    && matches!(
                        s.status,
                        SuggestionStatus::Pending | SuggestionStatus::Approved | SuggestionStatus::Conflict
                    )
            })
            .cloned())
    }

    async fn list_active_by_type(
        &self,
        user_id: UserId,
        suggestion_type: SuggestionType,
    ) -> Result<Vec<PendingSuggestion>> {
        let suggestions = self.suggestions.read().await;
        Ok(suggestions
            .values()
            .filter(|s| {
                s.user_id == user_id
                    && s.suggestion_type == suggestion_type
                    && matches!(
                        s.status,
                        SuggestionStatus::Pending | SuggestionStatus::Approved
                    )
            })
            .cloned()
            .collect())
    }

    async fn list_by_status(
        &self,
        user_id: UserId,
        status: SuggestionStatus,
    ) -> Result<Vec<PendingSuggestion>> {
        let suggestions = self.suggestions.read().await;
        let mut out: Vec<PendingSuggestion> = suggestions
            .values()
            .filter(|s| s.user_id == user_id && s.status == status)
            .cloned()
            .collect();
        out.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(out)
    }

    async fn list_expirable(&self, now: DateTime<Utc>) -> Result<Vec<PendingSuggestion>> {
        let suggestions = self.suggestions.read().await;
        Ok(suggestions
            .values()
            .filter(|s| {
                matches!(s.status, SuggestionStatus::Pending | SuggestionStatus::Approved)
                    && s.metadata.expires_at < now
            })
            .cloned()
            .collect())
    }

    async fn list_terminal_by_type(
        &self,
        user_id: UserId,
        suggestion_type: SuggestionType,
    ) -> Result<Vec<PendingSuggestion>> {
        let suggestions = self.suggestions.read().await;
        let mut out: Vec<PendingSuggestion> = suggestions
            .values()
            .filter(|s| {
                s.user_id == user_id
                    && s.suggestion_type == suggestion_type
                    && matches!(s.status, SuggestionStatus::Applied | SuggestionStatus::Rejected)
            })
            .cloned()
            .collect();
        out.sort_by_key(|s| std::cmp::Reverse(s.updated_at));
        Ok(out)
    }
}

#[async_trait]
impl FeedbackRepository for MemoryStore {
    async fn create(&self, feedback: &SuggestionFeedback) -> Result<()> {
        self.feedback
            .write()
            .await
            .insert(feedback.suggestion_id, feedback.clone());
        Ok(())
    }

    async fn get_by_suggestion(&self, suggestion_id: SuggestionId) -> Result<Option<SuggestionFeedback>> {
        Ok(self.feedback.read().await.get(&suggestion_id).cloned())
    }

    async fn count_by_type(&self, user_id: UserId, suggestion_type: SuggestionType) -> Result<u32> {
        Ok(self
            .feedback
            .read()
            .await
            .values()
            .filter(|f| f.user_id == user_id && f.suggestion_type == suggestion_type)
            .count() as u32)
    }
}

#[async_trait]
impl PreferenceRepository for MemoryStore {
    async fn get_or_create(&self, user_id: UserId) -> Result<UserPreference> {
        let mut preferences = self.preferences.write().await;
        Ok(preferences
            .entry(user_id)
            .or_insert_with(|| UserPreference::new(user_id))
            .clone())
    }

    async fn update(&self, preference: &UserPreference) -> Result<()> {
        self.preferences
            .write()
            .await
            .insert(preference.user_id, preference.clone());
        Ok(())
    }

    async fn list_user_ids(&self) -> Result<Vec<UserId>> {
        Ok(self.preferences.read().await.keys().copied().collect())
    }
}

#[async_trait]
impl AuditLogRepository for MemoryStore {
    async fn append(&self, entry: &SuggestionLog) -> Result<()> {
        self.audit_log.write().await.push(entry.clone());
        Ok(())
    }

    async fn get_suggestion_trail(
        &self,
        suggestion_id: SuggestionId,
        limit: usize,
    ) -> Result<Vec<SuggestionLog>> {
        let log = self.audit_log.read().await;
        let mut out: Vec<SuggestionLog> = log
            .iter()
            .filter(|e| e.suggestion_id == suggestion_id)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.timestamp);
        out.truncate(limit);
        Ok(out)
    }

    async fn get_user_activity(&self, user_id: UserId, days: i64) -> Result<Vec<SuggestionLog>> {
        let cutoff = Utc::now() - Duration::days(days);
        let log = self.audit_log.read().await;
        Ok(log
            .iter()
            .filter(|e| e.user_id == user_id && e.timestamp > cutoff)
            .cloned()
            .collect())
    }

    async fn clean_old_logs(&self, days_to_keep: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(days_to_keep);
        let mut log = self.audit_log.write().await;
        let before = log.len();
        log.retain(|e| e.timestamp > cutoff);
        Ok(before - log.len())
    }
}

#[async_trait]
impl WeeklyRepository for MemoryStore {
    async fn upsert_metric(&self, metric: &WeeklyMetric) -> Result<()> {
        self.weekly_metrics
            .write()
            .await
            .insert((metric.user_id, metric.week_start), metric.clone());
        Ok(())
    }

    async fn upsert_summary(&self, summary: &WeeklySummary) -> Result<()> {
        self.weekly_summaries
            .write()
            .await
            .insert((summary.user_id, summary.week_start), summary.clone());
        Ok(())
    }

    async fn get_latest_summary(&self, user_id: UserId) -> Result<Option<WeeklySummary>> {
        let summaries = self.weekly_summaries.read().await;
        Ok(summaries
            .values()
            .filter(|s| s.user_id == user_id)
            .max_by_key(|s| s.week_start)
            .cloned())
    }

    async fn get_metric(
        &self,
        user_id: UserId,
        week_start: DateTime<Utc>,
    ) -> Result<Option<WeeklyMetric>> {
        Ok(self
            .weekly_metrics
            .read()
            .await
            .get(&(user_id, week_start))
            .cloned())
    }

    async fn list_recent_metrics(&self, user_id: UserId, weeks: usize) -> Result<Vec<WeeklyMetric>> {
        let metrics = self.weekly_metrics.read().await;
        let mut out: Vec<WeeklyMetric> = metrics
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| std::cmp::Reverse(m.week_start));
        out.truncate(weeks);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SignalPeriod, SignalType, SignalValue};

    fn period() -> SignalPeriod {
        let now = Utc::now();
        SignalPeriod {
            start_date: now - Duration::days(30),
            end_date: now,
            comparison_start: None,
            comparison_end: None,
        }
    }

    #[tokio::test]
    async fn storing_the_same_signal_batch_twice_is_idempotent() {
        let store = MemoryStore::new();
        let user_id = UserId::new();
        let signal = FinancialSignal::new(
            user_id,
            SignalType::BudgetDrift,
            "drift",
            SignalValue::default(),
            period(),
            None,
            1,
        );
        let inserted_first = store.store_signals(&[signal.clone()]).await.unwrap();
        let inserted_second = store.store_signals(&[signal]).await.unwrap();
        assert_eq!(inserted_first, 1);
        assert_eq!(inserted_second, 0);

        let stats = store.get_signal_stats(user_id, 90).await.unwrap();
        assert_eq!(stats.total, 1);
    }

    #[tokio::test]
    async fn optimistic_update_rejects_stale_status() {
        use crate::domain::{Budget, BudgetId, BudgetPeriod, CategoryId, ProposedChange, EstimatedImpact, PendingSuggestion};
        use rust_decimal_macros::dec;

        let store = MemoryStore::new();
        let user_id = UserId::new();
        let suggestion = PendingSuggestion::new(
            user_id,
            "Raise budget",
            "desc",
            serde_json::Value::Null,
            ProposedChange::BudgetAdjustment {
                budget_id: BudgetId::new(),
                category_id: CategoryId::new(),
                old_amount: dec!(500),
                new_amount: dec!(600),
            },
            EstimatedImpact {
                amount: Some(dec!(100)),
                percentage: None,
                timeframe: "monthly".into(),
                confidence: 90,
            },
        );
        store.create(&suggestion).await.unwrap();

        let mut approved = suggestion.clone();
        approved.status = SuggestionStatus::Approved;
        store
            .update_if_status(&approved, SuggestionStatus::Pending)
            .await
            .unwrap();

        let mut stale = suggestion.clone();
        stale.status = SuggestionStatus::Rejected;
        let err = store
            .update_if_status(&stale, SuggestionStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, FinanceOpsError::Concurrency { .. }));
        let _ = Budget::new(user_id, CategoryId::new(), "x", dec!(1), BudgetPeriod::Monthly, Utc::now());
    }
}
