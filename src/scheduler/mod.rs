//! Scheduler (C10): weekly summary tick, daily TTL sweeps, and the pending
//! suggestion expiry pass.
//!
//! A `cron::Schedule` + `chrono_tz::Tz` pair drives a `tokio::select!` loop
//! between an interval tick and a `broadcast` shutdown channel. Batch
//! failures are collected rather than aborting the batch (via
//! `futures::future::join_all` over fixed-size chunks), and a re-entrancy
//! guard keeps overlapping ticks from double-running the same week.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::dates::WeekStart;
use crate::domain::{FinanceOpsError, Result, UserId};
use crate::llm::LlmClient;
use crate::storage::Repositories;
use crate::suggestion::SuggestionLifecycle;
use crate::weekly::SummaryGenerator;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_BATCH_DELAY_MS: u64 = 1_000;
const POLL_INTERVAL_SECS: u64 = 60;
const SIGNAL_TTL_DAYS: i64 = 90;
const AUDIT_LOG_RETENTION_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub weekly_cron: String,
    pub timezone: Tz,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub week_start: WeekStart,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            weekly_cron: "0 2 * * 1".to_string(),
            timezone: Tz::UTC,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            week_start: WeekStart::Monday,
        }
    }
}

/// Outcome of one weekly-tick pass over every known user.
#[derive(Debug, Clone, Default)]
pub struct WeeklyTickSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Outcome of one daily TTL sweep + expiry pass.
#[derive(Debug, Clone, Default)]
pub struct DailySweepSummary {
    pub suggestions_expired: usize,
    pub signals_archived: usize,
    pub audit_logs_cleaned: usize,
}

pub struct Scheduler {
    repos: Repositories,
    llm: Arc<dyn LlmClient>,
    settings: SchedulerSettings,
    schedule: Schedule,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(repos: Repositories, llm: Arc<dyn LlmClient>, settings: SchedulerSettings) -> Result<Self> {
        let schedule = Schedule::from_str(&settings.weekly_cron).map_err(|e| {
            FinanceOpsError::validation(format!("invalid scheduler cron expression: {e}"))
        })?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            repos,
            llm,
            settings,
            schedule,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        })
    }

    /// Starts the background loop: polls every minute, firing the weekly
    /// tick when the cron schedule is due and a daily sweep once a day.
    /// Returns the task handle; call `shutdown()` to stop it.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(POLL_INTERVAL_SECS));
            let mut next_weekly = self.next_weekly_run(Utc::now());
            let mut next_daily = Utc::now() + Duration::days(1);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = Utc::now();
                        if now >= next_weekly {
                            let result = self.clone().run_weekly_tick().await;
                            match result {
                                Ok(summary) => info!(
                                    attempted = summary.attempted,
                                    succeeded = summary.succeeded,
                                    failed = summary.failed,
                                    "weekly tick complete"
                                ),
                                Err(e) => error!(error = %e, "weekly tick failed to start"),
                            }
                            next_weekly = self.next_weekly_run(now);
                        }
                        if now >= next_daily {
                            match self.run_daily_sweep().await {
                                Ok(summary) => info!(
                                    expired = summary.suggestions_expired,
                                    archived = summary.signals_archived,
                                    cleaned = summary.audit_logs_cleaned,
                                    "daily sweep complete"
                                ),
                                Err(e) => error!(error = %e, "daily sweep failed"),
                            }
                            next_daily = now + Duration::days(1);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("scheduler shutting down");
                        break;
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    fn next_weekly_run(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        self.schedule
            .after(&after.with_timezone(&self.settings.timezone))
            .next()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(after + Duration::weeks(1))
    }

    /// Runs the weekly summary generation for every known user, in batches,
    /// guarded against overlapping runs by a single `AtomicBool` flag.
    pub async fn run_weekly_tick(self: Arc<Self>) -> Result<WeeklyTickSummary> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("weekly tick already running, skipping overlapping invocation");
            return Ok(WeeklyTickSummary::default());
        }
        let result = self.run_weekly_tick_inner(Utc::now()).await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_weekly_tick_inner(&self, reference: DateTime<Utc>) -> Result<WeeklyTickSummary> {
        let user_ids = self.repos.preferences.list_user_ids().await?;
        let mut summary = WeeklyTickSummary::default();

        for batch in user_ids.chunks(self.settings.batch_size.max(1)) {
            let results = futures::future::join_all(
                batch
                    .iter()
                    .map(|user_id| self.generate_for_user(*user_id, reference)),
            )
            .await;

            for (user_id, outcome) in batch.iter().zip(results) {
                summary.attempted += 1;
                match outcome {
                    Ok(()) => summary.succeeded += 1,
                    Err(e) => {
                        warn!(%user_id, error = %e, "weekly summary generation failed");
                        summary.failed += 1;
                        summary.errors.push(format!("{user_id}: {e}"));
                    }
                }
            }

            if batch.len() == self.settings.batch_size.max(1) {
                tokio::time::sleep(tokio::time::Duration::from_millis(self.settings.batch_delay_ms)).await;
            }
        }

        Ok(summary)
    }

    async fn generate_for_user(&self, user_id: UserId, reference: DateTime<Utc>) -> Result<()> {
        let generator = SummaryGenerator::new(self.repos.clone(), self.llm.as_ref(), self.settings.week_start);
        generator.generate(user_id, reference).await.map(|_| ())
    }

    /// Daily TTL sweep: archives stale signals, expires due suggestions, and
    /// trims the audit log. Never called as part of startup backfill.
    pub async fn run_daily_sweep(&self) -> Result<DailySweepSummary> {
        let lifecycle = SuggestionLifecycle::new(self.repos.clone());
        let suggestions_expired = lifecycle.expire_due_suggestions().await?;
        let signals_archived = self.repos.signals.archive_old_signals(SIGNAL_TTL_DAYS).await?;
        let audit_logs_cleaned = self
            .repos
            .audit_log
            .clean_old_logs(AUDIT_LOG_RETENTION_DAYS)
            .await?;

        Ok(DailySweepSummary {
            suggestions_expired,
            signals_archived,
            audit_logs_cleaned,
        })
    }

    /// Explicit backfill: re-runs weekly generation for every known user as
    /// of `days_back` days ago. The scheduler never does this on its own —
    /// a missed tick stays missed until an operator calls this.
    pub async fn retry_failed(self: Arc<Self>, days_back: i64) -> Result<WeeklyTickSummary> {
        let reference = Utc::now() - Duration::days(days_back);
        self.run_weekly_tick_inner(reference).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, CategoryType, Transaction, TransactionStatus, TransactionType};
    use crate::llm::{LlmTransportError, RawLlmClient};
    use rust_decimal_macros::dec;

    struct StubLlm;

    #[async_trait::async_trait]
    impl RawLlmClient for StubLlm {
        async fn complete(&self, _prompt: &str) -> std::result::Result<String, LlmTransportError> {
            Err(LlmTransportError::Transport("no llm in tests".into()))
        }
    }

    fn test_scheduler(repos: Repositories) -> Arc<Scheduler> {
        let llm: Arc<dyn LlmClient> = Arc::new(crate::llm::LlmAdapter::new(StubLlm).with_timeout(std::time::Duration::from_millis(20)));
        Arc::new(Scheduler::new(repos, llm, SchedulerSettings::default()).unwrap())
    }

    #[tokio::test]
    async fn weekly_tick_processes_every_known_user() {
        let repos = Repositories::in_memory();
        for _ in 0..3 {
            let user_id = UserId::new();
            repos.preferences.get_or_create(user_id).await.unwrap();
            let category = Category::new(user_id, "Misc", CategoryType::Want);
            repos.categories.create(&category).await.unwrap();
            let tx = Transaction::new(user_id, dec!(50), TransactionType::Expense, "Coffee", Utc::now())
                .with_status(TransactionStatus::Completed)
                .with_category(category.id);
            repos.transactions.create(&tx).await.unwrap();
        }

        let scheduler = test_scheduler(repos);
        let summary = scheduler.run_weekly_tick().await.unwrap();
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.succeeded, 3);
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let repos = Repositories::in_memory();
        let scheduler = test_scheduler(repos);
        scheduler.running.store(true, Ordering::SeqCst);

        let summary = scheduler.clone().run_weekly_tick().await.unwrap();
        assert_eq!(summary.attempted, 0);
    }

    #[tokio::test]
    async fn daily_sweep_runs_without_error_on_empty_store() {
        let repos = Repositories::in_memory();
        let scheduler = test_scheduler(repos);
        let summary = scheduler.run_daily_sweep().await.unwrap();
        assert_eq!(summary.suggestions_expired, 0);
    }

    #[tokio::test]
    async fn retry_failed_uses_backdated_reference() {
        let repos = Repositories::in_memory();
        let user_id = UserId::new();
        repos.preferences.get_or_create(user_id).await.unwrap();

        let scheduler = test_scheduler(repos);
        let summary = scheduler.retry_failed(14).await.unwrap();
        assert_eq!(summary.attempted, 1);
    }
}
