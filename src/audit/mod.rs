//! Audit log service (C7): append-only event trail over `AuditLogRepository`.
//!
//! A thin wrapper around a storage trait that builds events and forwards
//! queries, plus export/retention operations the row layer doesn't own.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    audit_log::AuditAction, Actor, ActionOutcome, FinanceOpsError, Result, SuggestionId,
    SuggestionLog, UserId,
};
use crate::storage::AuditLogRepository;

/// Parameters for `AuditLogger::log_action`, mirroring `SuggestionLog::new`'s
/// argument list without forcing every call site to spell it out.
pub struct LogActionRequest {
    pub user_id: UserId,
    pub suggestion_id: SuggestionId,
    pub action: AuditAction,
    pub actor: Actor,
    pub previous_state: Option<serde_json::Value>,
    pub new_state: Option<serde_json::Value>,
    pub outcome: ActionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Default)]
pub struct ExportQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub actions: Option<Vec<AuditAction>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserActivitySummary {
    pub total_events: usize,
    pub success_count: usize,
    pub success_rate: f64,
    pub by_action: Vec<(AuditAction, usize)>,
}

pub struct AuditLogger {
    repo: Arc<dyn AuditLogRepository>,
}

impl AuditLogger {
    pub fn new(repo: Arc<dyn AuditLogRepository>) -> Self {
        Self { repo }
    }

    /// Appends one event. The caller is responsible for only calling this
    /// after the corresponding state change has committed.
    pub async fn log_action(&self, request: LogActionRequest) -> Result<()> {
        let entry = SuggestionLog::new(
            request.user_id,
            request.suggestion_id,
            request.action,
            request.actor,
            request.previous_state,
            request.new_state,
            request.outcome,
        );
        self.repo.append(&entry).await
    }

    pub async fn get_suggestion_audit_trail(
        &self,
        suggestion_id: SuggestionId,
        limit: usize,
    ) -> Result<Vec<SuggestionLog>> {
        self.repo.get_suggestion_trail(suggestion_id, limit).await
    }

    /// Activity for a user over the last `days`, grouped by action with a
    /// success rate — the shape a dashboard summary would read directly.
    pub async fn get_user_activity(&self, user_id: UserId, days: i64) -> Result<UserActivitySummary> {
        let events = self.repo.get_user_activity(user_id, days).await?;
        let total_events = events.len();
        let success_count = events.iter().filter(|e| e.outcome.success).count();
        let success_rate = if total_events == 0 {
            0.0
        } else {
            success_count as f64 / total_events as f64
        };

        let mut counts: HashMap<AuditAction, usize> = HashMap::new();
        for event in &events {
            *counts.entry(event.action).or_insert(0) += 1;
        }
        let mut by_action: Vec<(AuditAction, usize)> = counts.into_iter().collect();
        by_action.sort_by_key(|(action, _)| format!("{action:?}"));

        Ok(UserActivitySummary {
            total_events,
            success_count,
            success_rate,
            by_action,
        })
    }

    /// Renders a user's activity as JSON or CSV for a bounded window, filtered
    /// to the given actions when provided.
    pub async fn export_audit_log(
        &self,
        user_id: UserId,
        query: ExportQuery,
        format: ExportFormat,
    ) -> Result<String> {
        let lookback_days = query
            .start_date
            .map(|start| (Utc::now() - start).num_days().max(1))
            .unwrap_or(365);
        let mut events = self.repo.get_user_activity(user_id, lookback_days).await?;

        if let Some(end) = query.end_date {
            events.retain(|e| e.timestamp <= end);
        }
        if let Some(start) = query.start_date {
            events.retain(|e| e.timestamp >= start);
        }
        if let Some(ref actions) = query.actions {
            events.retain(|e| actions.contains(&e.action));
        }

        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(&events).map_err(FinanceOpsError::from)
            }
            ExportFormat::Csv => Ok(render_csv(&events)),
        }
    }

    pub async fn clean_old_logs(&self, days_to_keep: i64) -> Result<usize> {
        self.repo.clean_old_logs(days_to_keep).await
    }
}

fn render_csv(events: &[SuggestionLog]) -> String {
    let mut out = String::from("id,user_id,suggestion_id,action,timestamp,actor_type,success,error\n");
    for event in events {
        out.push_str(&format!(
            "{},{},{},{:?},{},{:?},{},{}\n",
            event.id,
            event.user_id,
            event.suggestion_id,
            event.action,
            event.timestamp.to_rfc3339(),
            event.actor.actor_type,
            event.outcome.success,
            event.outcome.error.as_deref().unwrap_or(""),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SuggestionId as Sid;
    use crate::storage::Repositories;

    fn repos() -> Repositories {
        Repositories::in_memory()
    }

    #[tokio::test]
    async fn logs_and_retrieves_trail() {
        let repos = repos();
        let logger = AuditLogger::new(repos.audit_log.clone());
        let user_id = UserId::new();
        let suggestion_id = Sid::new();

        logger
            .log_action(LogActionRequest {
                user_id,
                suggestion_id,
                action: AuditAction::Created,
                actor: Actor::system(),
                previous_state: None,
                new_state: Some(serde_json::json!({"status": "pending"})),
                outcome: ActionOutcome {
                    success: true,
                    error: None,
                    duration_ms: 5,
                },
            })
            .await
            .unwrap();

        let trail = logger.get_suggestion_audit_trail(suggestion_id, 10).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, AuditAction::Created);
    }

    #[tokio::test]
    async fn user_activity_computes_success_rate() {
        let repos = repos();
        let logger = AuditLogger::new(repos.audit_log.clone());
        let user_id = UserId::new();

        for (action, success) in [
            (AuditAction::Created, true),
            (AuditAction::Applied, true),
            (AuditAction::Failed, false),
        ] {
            logger
                .log_action(LogActionRequest {
                    user_id,
                    suggestion_id: Sid::new(),
                    action,
                    actor: Actor::system(),
                    previous_state: None,
                    new_state: None,
                    outcome: ActionOutcome {
                        success,
                        error: None,
                        duration_ms: 1,
                    },
                })
                .await
                .unwrap();
        }

        let summary = logger.get_user_activity(user_id, 30).await.unwrap();
        assert_eq!(summary.total_events, 3);
        assert!((summary.success_rate - (2.0 / 3.0)).abs() < 1e-9);
    }
}
