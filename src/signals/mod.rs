//! Signal store service (C5): the read/write surface analysis consumers see,
//! layered over `SignalRepository`'s dedup/TTL mechanics.
//!
//! Exposes query/update/stats operations over a lower-level persistence
//! trait rather than having callers reach into the repository directly.

use std::sync::Arc;

use crate::domain::{FinanceOpsError, Result, SignalId, UserId};
use crate::domain::signal::FinancialSignal;
use crate::storage::{SignalQuery, SignalRepository, SignalStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatusUpdate {
    Active,
    Dismissed,
    Actioned,
}

pub struct SignalStore {
    repo: Arc<dyn SignalRepository>,
}

impl SignalStore {
    pub fn new(repo: Arc<dyn SignalRepository>) -> Self {
        Self { repo }
    }

    /// Inserts one signal, skipped silently if an active duplicate exists.
    pub async fn store_signal(&self, signal: &FinancialSignal) -> Result<bool> {
        self.repo.store_signal(signal).await
    }

    /// Inserts a batch, returning the count actually stored after dedup.
    pub async fn store_signals(&self, signals: &[FinancialSignal]) -> Result<usize> {
        self.repo.store_signals(signals).await
    }

    pub async fn get_user_signals(
        &self,
        user_id: UserId,
        query: &SignalQuery,
    ) -> Result<Vec<FinancialSignal>> {
        self.repo.get_user_signals(user_id, query).await
    }

    pub async fn get_signal_by_id(&self, id: SignalId) -> Result<Option<FinancialSignal>> {
        self.repo.get_signal_by_id(id).await
    }

    /// Translates the three-way status the API surface exposes into the
    /// repository's `(dismissed, actioned)` flag pair.
    pub async fn update_signal_status(&self, id: SignalId, status: SignalStatusUpdate) -> Result<()> {
        if self.repo.get_signal_by_id(id).await?.is_none() {
            return Err(FinanceOpsError::not_found("FinancialSignal", id));
        }
        let (dismissed, actioned) = match status {
            SignalStatusUpdate::Active => (false, false),
            SignalStatusUpdate::Dismissed => (true, false),
            SignalStatusUpdate::Actioned => (false, true),
        };
        self.repo.update_signal_status(id, dismissed, actioned).await
    }

    pub async fn get_related_signals(&self, id: SignalId, limit: usize) -> Result<Vec<FinancialSignal>> {
        self.repo.get_related_signals(id, limit).await
    }

    pub async fn archive_old_signals(&self, days_old: i64) -> Result<usize> {
        self.repo.archive_old_signals(days_old).await
    }

    pub async fn get_signal_stats(&self, user_id: UserId, days: i64) -> Result<SignalStats> {
        self.repo.get_signal_stats(user_id, days).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{SignalPeriod, SignalType, SignalValue};
    use crate::storage::Repositories;
    use chrono::{Duration, Utc};

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
    async fn status_update_maps_to_dismissed_flag() {
        let repos = Repositories::in_memory();
        let store = SignalStore::new(repos.signals.clone());
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
        store.store_signal(&signal).await.unwrap();

        store
            .update_signal_status(signal.id, SignalStatusUpdate::Dismissed)
            .await
            .unwrap();

        let query = SignalQuery::default();
        let active = store.get_user_signals(user_id, &query).await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn unknown_signal_status_update_errors() {
        let repos = Repositories::in_memory();
        let store = SignalStore::new(repos.signals.clone());
        let result = store
            .update_signal_status(SignalId::new(), SignalStatusUpdate::Actioned)
            .await;
        assert!(result.is_err());
    }
}
