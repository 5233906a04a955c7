//! FeedbackProcessor — ingests a user's decision on a suggestion and folds
//! it into `UserPreference`.
//!
//! Separates the in-transaction write from a decoupled post-commit hook:
//! weight readjustment is enqueued on a bounded channel rather than called
//! inline, so a slow/failing `WeightAdjuster` run can never abort the
//! user's decision.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::audit::{AuditLogger, LogActionRequest};
use crate::domain::{
    Actor, ActionOutcome, AuditAction, FeedbackContext, FeedbackDecision, FeedbackOutcome,
    FeedbackReasons, FinanceOpsError, PendingSuggestion, Result, RiskTolerance, SuggestionFeedback,
    SuggestionId, TimeOfDay, UserId,
};
use crate::storage::Repositories;

/// Caller-supplied context for one feedback decision.
pub struct DecisionInput {
    pub decision: FeedbackDecision,
    pub responded_at: DateTime<Utc>,
    pub response_time_ms: i64,
    pub viewed_duration_ms: Option<i64>,
    pub reasons: FeedbackReasons,
}

/// Significant-impact threshold used by the impact-preference nudge in step 6.
const SIGNIFICANT_IMPACT: Decimal = Decimal::from_parts(100_00, 0, 0, false, 2);

pub struct FeedbackProcessor {
    repos: Repositories,
    audit: AuditLogger,
    adjuster_tx: mpsc::Sender<UserId>,
}

impl FeedbackProcessor {
    pub fn new(repos: Repositories, adjuster_tx: mpsc::Sender<UserId>) -> Self {
        let audit = AuditLogger::new(repos.audit_log.clone());
        Self {
            repos,
            audit,
            adjuster_tx,
        }
    }

    pub async fn process_decision(
        &self,
        user_id: UserId,
        suggestion_id: SuggestionId,
        input: DecisionInput,
    ) -> Result<SuggestionFeedback> {
        let suggestion = self
            .repos
            .suggestions
            .get_by_id(user_id, suggestion_id)
            .await?
            .ok_or_else(|| FinanceOpsError::not_found("PendingSuggestion", suggestion_id))?;

        let feedback = self.record_feedback(&suggestion, &input).await?;
        self.update_type_preference(user_id, &suggestion, &input).await?;
        self.update_category_preference(user_id, &suggestion, &input).await?;
        self.update_time_preference(user_id, input.responded_at).await?;
        self.update_impact_preference(user_id, &suggestion, &input).await?;

        self.audit
            .log_action(LogActionRequest {
                user_id,
                suggestion_id,
                action: AuditAction::Updated,
                actor: Actor::user(user_id),
                previous_state: None,
                new_state: serde_json::to_value(&feedback).ok(),
                outcome: ActionOutcome {
                    success: true,
                    error: None,
                    duration_ms: 0,
                },
            })
            .await?;

        // Step 8: the adjuster reacts asynchronously; a full channel just
        // means this cycle's readjustment is skipped, not that feedback fails.
        let _ = self.adjuster_tx.try_send(user_id);

        Ok(feedback)
    }

    async fn record_feedback(
        &self,
        suggestion: &PendingSuggestion,
        input: &DecisionInput,
    ) -> Result<SuggestionFeedback> {
        let context = FeedbackContext {
            suggested_at: suggestion.created_at,
            responded_at: input.responded_at,
            response_time_ms: input.response_time_ms,
            viewed_duration_ms: input.viewed_duration_ms,
        };
        let feedback = SuggestionFeedback::new(
            suggestion.user_id,
            suggestion.id,
            suggestion.suggestion_type,
            input.decision,
            context,
        )
        .with_reasons(input.reasons.clone());
        self.repos.feedback.create(&feedback).await?;
        Ok(feedback)
    }

    async fn update_type_preference(
        &self,
        user_id: UserId,
        suggestion: &PendingSuggestion,
        input: &DecisionInput,
    ) -> Result<()> {
        let mut preference = self.repos.preferences.get_or_create(user_id).await?;
        let type_pref = preference.type_preference_mut(suggestion.suggestion_type);
        match input.decision {
            FeedbackDecision::Accepted => {
                type_pref.accepted_count += 1;
                type_pref.apply_delta(0.1);
            }
            FeedbackDecision::Rejected => {
                type_pref.rejected_count += 1;
                type_pref.apply_delta(-0.15);
            }
            FeedbackDecision::Ignored | FeedbackDecision::Modified => {}
        }
        type_pref.last_action = Some(input.responded_at);
        preference.suggestion_preferences.global.record_shown(input.responded_at);
        if matches!(input.decision, FeedbackDecision::Accepted) {
            preference.suggestion_preferences.global.total_accepted += 1;
        } else if matches!(input.decision, FeedbackDecision::Rejected) {
            preference.suggestion_preferences.global.total_rejected += 1;
        }
        let global = &mut preference.suggestion_preferences.global;
        if global.total_shown > 0 {
            global.acceptance_rate = global.total_accepted as f64 / global.total_shown as f64;
        }
        self.repos.preferences.update(&preference).await
    }

    async fn update_category_preference(
        &self,
        user_id: UserId,
        suggestion: &PendingSuggestion,
        input: &DecisionInput,
    ) -> Result<()> {
        let Some(category_id) = suggestion.proposed_changes.category_id() else {
            return Ok(());
        };
        let mut preference = self.repos.preferences.get_or_create(user_id).await?;
        let category_pref = preference.category_preferences.entry(category_id).or_default();
        category_pref.interactions += 1;
        match input.decision {
            FeedbackDecision::Accepted => {
                category_pref.weight = (category_pref.weight + 0.1).clamp(0.0, 2.0);
                category_pref.change_tolerance = (category_pref.change_tolerance + 0.05).clamp(0.0, 1.0);
            }
            FeedbackDecision::Rejected => {
                category_pref.weight = (category_pref.weight - 0.15).clamp(0.0, 2.0);
                category_pref.price_sensitivity = (category_pref.price_sensitivity + 0.1).clamp(0.0, 1.0);
            }
            FeedbackDecision::Ignored | FeedbackDecision::Modified => {}
        }
        if let Some(primary) = input.reasons.primary {
            category_pref.feedback.push(format!("{primary:?}"));
        }
        self.repos.preferences.update(&preference).await
    }

    async fn update_time_preference(&self, user_id: UserId, responded_at: DateTime<Utc>) -> Result<()> {
        use chrono::Timelike;
        let mut preference = self.repos.preferences.get_or_create(user_id).await?;
        let hour = responded_at.hour() as usize;
        preference.time_preferences.response_time_by_hour[hour] += 1;

        if preference.time_preferences.adaptive {
            let (best_hour, _) = preference
                .time_preferences
                .response_time_by_hour
                .iter()
                .enumerate()
                .max_by_key(|(_, count)| **count)
                .unwrap_or((hour, &0));
            preference.time_preferences.best_time_to_suggest =
                Some(TimeOfDay::from_hour(best_hour as u8));
        }
        self.repos.preferences.update(&preference).await
    }

    async fn update_impact_preference(
        &self,
        user_id: UserId,
        suggestion: &PendingSuggestion,
        input: &DecisionInput,
    ) -> Result<()> {
        let Some(amount) = suggestion.estimated_impact.amount else {
            return Ok(());
        };
        let mut preference = self.repos.preferences.get_or_create(user_id).await?;
        let significant = amount.abs() >= SIGNIFICANT_IMPACT;
        match input.decision {
            FeedbackDecision::Accepted if significant => {
                let target = preference.impact_preferences.min_savings_amount.max(amount.abs());
                preference.impact_preferences.min_savings_amount =
                    (preference.impact_preferences.min_savings_amount + target) / Decimal::from(2);
            }
            FeedbackDecision::Rejected if !significant => {
                preference.impact_preferences.min_savings_amount += Decimal::from(5);
            }
            _ => {}
        }
        if suggestion.metadata.risk_level == crate::domain::RiskLevel::High {
            preference.impact_preferences.max_risk_tolerance = match input.decision {
                FeedbackDecision::Accepted => bump_risk_tolerance(preference.impact_preferences.max_risk_tolerance),
                FeedbackDecision::Rejected => lower_risk_tolerance(preference.impact_preferences.max_risk_tolerance),
                _ => preference.impact_preferences.max_risk_tolerance,
            };
        }
        self.repos.preferences.update(&preference).await
    }
}

fn bump_risk_tolerance(current: RiskTolerance) -> RiskTolerance {
    match current {
        RiskTolerance::Low => RiskTolerance::Medium,
        RiskTolerance::Medium | RiskTolerance::High => RiskTolerance::High,
    }
}

fn lower_risk_tolerance(current: RiskTolerance) -> RiskTolerance {
    match current {
        RiskTolerance::High => RiskTolerance::Medium,
        RiskTolerance::Medium | RiskTolerance::Low => RiskTolerance::Low,
    }
}

/// Spawns a `WeightAdjuster` consumer loop over the channel this processor
/// feeds; intended to run for the lifetime of the process.
pub fn spawn_adjuster_loop(
    repos: Repositories,
    mut rx: mpsc::Receiver<UserId>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let adjuster = Arc::new(super::WeightAdjuster::new(repos));
        while let Some(user_id) = rx.recv().await {
            if let Err(err) = adjuster.adjust_weights(user_id).await {
                tracing::warn!(%user_id, error = %err, "weight adjustment failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Budget, BudgetFlexibility, BudgetPeriod, CategoryId, EstimatedImpact, ProposedChange};
    use rust_decimal_macros::dec;

    async fn seed_suggestion(repos: &Repositories, user_id: UserId) -> PendingSuggestion {
        let category_id = CategoryId::new();
        let budget = Budget::new(
            user_id,
            category_id,
            "Groceries",
            dec!(500),
            BudgetPeriod::Monthly,
            Utc::now(),
        );
        repos.budgets.create(&budget).await.unwrap();
        let suggestion = PendingSuggestion::new(
            user_id,
            "Raise Groceries budget",
            "desc",
            serde_json::json!({}),
            ProposedChange::BudgetAdjustment {
                budget_id: budget.id,
                category_id,
                old_amount: dec!(500),
                new_amount: dec!(600),
            },
            EstimatedImpact {
                amount: Some(dec!(150)),
                percentage: Some(20.0),
                timeframe: "monthly".into(),
                confidence: 80,
            },
        );
        repos.suggestions.create(&suggestion).await.unwrap();
        suggestion
    }

    #[tokio::test]
    async fn accepted_decision_raises_type_weight() {
        let repos = Repositories::in_memory();
        let (tx, _rx) = mpsc::channel(8);
        let processor = FeedbackProcessor::new(repos.clone(), tx);
        let user_id = UserId::new();
        let suggestion = seed_suggestion(&repos, user_id).await;

        processor
            .process_decision(
                user_id,
                suggestion.id,
                DecisionInput {
                    decision: FeedbackDecision::Accepted,
                    responded_at: Utc::now(),
                    response_time_ms: 1000,
                    viewed_duration_ms: Some(2000),
                    reasons: FeedbackReasons::default(),
                },
            )
            .await
            .unwrap();

        let preference = repos.preferences.get_or_create(user_id).await.unwrap();
        let type_pref = preference
            .suggestion_preferences
            .types
            .get(&suggestion.suggestion_type)
            .unwrap();
        assert_eq!(type_pref.accepted_count, 1);
        assert!((type_pref.weight - 1.1).abs() < 1e-9);

        let category_id = suggestion.proposed_changes.category_id().unwrap();
        let category_pref = preference.category_preferences.get(&category_id).unwrap();
        assert_eq!(category_pref.interactions, 1);
    }

    #[tokio::test]
    async fn rejected_decision_lowers_type_weight() {
        let repos = Repositories::in_memory();
        let (tx, _rx) = mpsc::channel(8);
        let processor = FeedbackProcessor::new(repos.clone(), tx);
        let user_id = UserId::new();
        let suggestion = seed_suggestion(&repos, user_id).await;

        processor
            .process_decision(
                user_id,
                suggestion.id,
                DecisionInput {
                    decision: FeedbackDecision::Rejected,
                    responded_at: Utc::now(),
                    response_time_ms: 500,
                    viewed_duration_ms: None,
                    reasons: FeedbackReasons::default(),
                },
            )
            .await
            .unwrap();

        let preference = repos.preferences.get_or_create(user_id).await.unwrap();
        let type_pref = preference
            .suggestion_preferences
            .types
            .get(&suggestion.suggestion_type)
            .unwrap();
        assert_eq!(type_pref.rejected_count, 1);
        assert!((type_pref.weight - 0.85).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_suggestion_is_rejected() {
        let repos = Repositories::in_memory();
        let (tx, _rx) = mpsc::channel(8);
        let processor = FeedbackProcessor::new(repos.clone(), tx);
        let result = processor
            .process_decision(
                UserId::new(),
                SuggestionId::new(),
                DecisionInput {
                    decision: FeedbackDecision::Ignored,
                    responded_at: Utc::now(),
                    response_time_ms: 0,
                    viewed_duration_ms: None,
                    reasons: FeedbackReasons::default(),
                },
            )
            .await;
        assert!(result.is_err());
    }
}
