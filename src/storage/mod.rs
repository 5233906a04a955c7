//! Storage layer: repository trait contracts plus an in-memory implementation.
//!
//! A `sqlx`-backed implementation is deliberately not wired in here: `sqlx::
//! query!` needs a live `DATABASE_URL` at build time to type-check.
//! `MemoryStore` is the engine's real dependency for now (see DESIGN.md).

pub mod memory;
pub mod repository;

pub use memory::MemoryStore;
pub use repository::{
    not_found, AuditLogRepository, BudgetRepository, CategoryRepository, FeedbackRepository,
    InsightRepository, PreferenceRepository, SavingsGoalRepository, SignalQuery, SignalRepository,
    SignalStats, SubscriptionRepository, SuggestionRepository, TransactionRepository,
    WeeklyRepository,
};

use std::sync::Arc;

/// Bundles every repository trait object the engines/services need, as a
/// handful of `Arc<dyn Repo>` fields rather than a single god-object store.
#[derive(Clone)]
pub struct Repositories {
    pub transactions: Arc<dyn TransactionRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub budgets: Arc<dyn BudgetRepository>,
    pub goals: Arc<dyn SavingsGoalRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub signals: Arc<dyn SignalRepository>,
    pub insights: Arc<dyn InsightRepository>,
    pub suggestions: Arc<dyn SuggestionRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub preferences: Arc<dyn PreferenceRepository>,
    pub audit_log: Arc<dyn AuditLogRepository>,
    pub weekly: Arc<dyn WeeklyRepository>,
}

impl Repositories {
    /// Wires every trait to a single shared `MemoryStore` handle.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            transactions: store.clone(),
            categories: store.clone(),
            budgets: store.clone(),
            goals: store.clone(),
            subscriptions: store.clone(),
            signals: store.clone(),
            insights: store.clone(),
            suggestions: store.clone(),
            feedback: store.clone(),
            preferences: store.clone(),
            audit_log: store.clone(),
            weekly: store,
        }
    }
}
