//! Repository trait contracts — one async trait per entity, injected into
//! engines and services as `Arc<dyn Trait>` rather than reached for as a
//! module-level singleton.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Budget, BudgetId, Category, CategoryId, FinanceOpsError, Insight, InsightId, PendingSuggestion,
    Result, SavingsGoal, SavingsGoalId, SignalId, SignalType, Subscription, SubscriptionId,
    SuggestionFeedback, SuggestionId, SuggestionLog, SuggestionStatus, SuggestionType, Transaction,
    TransactionId, UserId, UserPreference, WeeklyMetric, WeeklySummary,
};
use crate::domain::signal::FinancialSignal;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: &Transaction) -> Result<()>;
    async fn get_by_id(&self, user_id: UserId, id: TransactionId) -> Result<Option<Transaction>>;
    async fn update(&self, transaction: &Transaction) -> Result<()>;
    /// Completed transactions for `user_id` with `date` in `[start, end]`, optionally
    /// filtered to a single category.
    async fn list_in_range(
        &self,
        user_id: UserId,
        category_id: Option<CategoryId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>>;
    async fn list_all_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<()>;
    async fn get_by_id(&self, user_id: UserId, id: CategoryId) -> Result<Option<Category>>;
    async fn get_by_name(&self, user_id: UserId, name_key: &str) -> Result<Option<Category>>;
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Category>>;
    async fn update(&self, category: &Category) -> Result<()>;
    async fn delete(&self, user_id: UserId, id: CategoryId) -> Result<()>;
}

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn create(&self, budget: &Budget) -> Result<()>;
    async fn get_by_id(&self, user_id: UserId, id: BudgetId) -> Result<Option<Budget>>;
    async fn list_active_by_user(&self, user_id: UserId) -> Result<Vec<Budget>>;
    async fn update(&self, budget: &Budget) -> Result<()>;
    async fn delete(&self, user_id: UserId, id: BudgetId) -> Result<()>;
}

#[async_trait]
pub trait SavingsGoalRepository: Send + Sync {
    async fn create(&self, goal: &SavingsGoal) -> Result<()>;
    async fn get_by_id(&self, user_id: UserId, id: SavingsGoalId) -> Result<Option<SavingsGoal>>;
    async fn list_active_by_user(&self, user_id: UserId) -> Result<Vec<SavingsGoal>>;
    async fn update(&self, goal: &SavingsGoal) -> Result<()>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> Result<()>;
    async fn get_by_id(
        &self,
        user_id: UserId,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>>;
    async fn list_active_by_user(&self, user_id: UserId) -> Result<Vec<Subscription>>;
    async fn update(&self, subscription: &Subscription) -> Result<()>;
}

/// Filters accepted by `SignalRepository::get_user_signals` (C5).
#[derive(Debug, Clone, Default)]
pub struct SignalQuery {
    pub types: Option<Vec<SignalType>>,
    pub min_priority: Option<u8>,
    pub limit: Option<usize>,
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SignalStats {
    pub total: u64,
    pub active: u64,
    pub by_type: Vec<(SignalType, u64)>,
}

#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// Inserts a signal unless an active signal with the same `signal_hash`
    /// already exists, in which case the insert is silently skipped (dedup law).
    async fn store_signal(&self, signal: &FinancialSignal) -> Result<bool>;
    async fn store_signals(&self, signals: &[FinancialSignal]) -> Result<usize>;
    async fn get_user_signals(
        &self,
        user_id: UserId,
        query: &SignalQuery,
    ) -> Result<Vec<FinancialSignal>>;
    async fn get_signal_by_id(&self, id: SignalId) -> Result<Option<FinancialSignal>>;
    async fn update_signal_status(
        &self,
        id: SignalId,
        dismissed: bool,
        actioned: bool,
    ) -> Result<()>;
    async fn get_related_signals(&self, id: SignalId, limit: usize) -> Result<Vec<FinancialSignal>>;
    async fn archive_old_signals(&self, days_old: i64) -> Result<usize>;
    async fn get_signal_stats(&self, user_id: UserId, days: i64) -> Result<SignalStats>;
}

#[async_trait]
pub trait InsightRepository: Send + Sync {
    async fn create(&self, insight: &Insight) -> Result<()>;
    async fn get_by_id(&self, id: InsightId) -> Result<Option<Insight>>;
    async fn list_by_user(&self, user_id: UserId, limit: usize) -> Result<Vec<Insight>>;
}

#[async_trait]
pub trait SuggestionRepository: Send + Sync {
    async fn create(&self, suggestion: &PendingSuggestion) -> Result<()>;
    async fn get_by_id(
        &self,
        user_id: UserId,
        id: SuggestionId,
    ) -> Result<Option<PendingSuggestion>>;
    /// Optimistic conditional update: succeeds only if the stored row's status
    /// still equals `expected_status`, returning `FinanceOpsError::Concurrency`
    /// otherwise.
    async fn update_if_status(
        &self,
        suggestion: &PendingSuggestion,
        expected_status: SuggestionStatus,
    ) -> Result<()>;
    async fn find_active_by_target(
        &self,
        user_id: UserId,
        suggestion_type: SuggestionType,
        target_id: &str,
    ) -> Result<Option<PendingSuggestion>>;
    async fn list_active_by_type(
        &self,
        user_id: UserId,
        suggestion_type: SuggestionType,
    ) -> Result<Vec<PendingSuggestion>>;
    async fn list_by_status(
        &self,
        user_id: UserId,
        status: SuggestionStatus,
    ) -> Result<Vec<PendingSuggestion>>;
    async fn list_expirable(&self, now: DateTime<Utc>) -> Result<Vec<PendingSuggestion>>;
    /// Suggestions of `suggestion_type` for `user_id` that reached `Applied` or
    /// `Rejected` terminal states, most recent first (cooldown lookups).
    async fn list_terminal_by_type(
        &self,
        user_id: UserId,
        suggestion_type: SuggestionType,
    ) -> Result<Vec<PendingSuggestion>>;
}

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn create(&self, feedback: &SuggestionFeedback) -> Result<()>;
    async fn get_by_suggestion(&self, suggestion_id: SuggestionId) -> Result<Option<SuggestionFeedback>>;
    async fn count_by_type(&self, user_id: UserId, suggestion_type: SuggestionType) -> Result<u32>;
}

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Returns the user's preference state, creating a default one if absent.
    async fn get_or_create(&self, user_id: UserId) -> Result<UserPreference>;
    async fn update(&self, preference: &UserPreference) -> Result<()>;
    /// Every user with a materialized preference record — the scheduler's
    /// source of truth for "all known users" (C10 weekly tick batching).
    async fn list_user_ids(&self) -> Result<Vec<UserId>>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn append(&self, entry: &SuggestionLog) -> Result<()>;
    async fn get_suggestion_trail(
        &self,
        suggestion_id: SuggestionId,
        limit: usize,
    ) -> Result<Vec<SuggestionLog>>;
    async fn get_user_activity(&self, user_id: UserId, days: i64) -> Result<Vec<SuggestionLog>>;
    async fn clean_old_logs(&self, days_to_keep: i64) -> Result<usize>;
}

#[async_trait]
pub trait WeeklyRepository: Send + Sync {
    async fn upsert_metric(&self, metric: &WeeklyMetric) -> Result<()>;
    async fn upsert_summary(&self, summary: &WeeklySummary) -> Result<()>;
    async fn get_latest_summary(&self, user_id: UserId) -> Result<Option<WeeklySummary>>;
    async fn get_metric(
        &self,
        user_id: UserId,
        week_start: DateTime<Utc>,
    ) -> Result<Option<WeeklyMetric>>;
    async fn list_recent_metrics(&self, user_id: UserId, weeks: usize) -> Result<Vec<WeeklyMetric>>;
}

/// Maps a missing-row lookup to the shared `NotFound` error with a consistent
/// entity label (responses never distinguish "absent" from "wrong owner").
pub fn not_found<T>(entity: &'static str, id: impl ToString) -> Result<T> {
    Err(FinanceOpsError::not_found(entity, id))
}
