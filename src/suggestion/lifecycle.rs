//! The suggestion state machine: creation, approval, application, rollback,
//! rejection/cancellation, and expiry.
//!
//! A thin orchestration struct wired to `Arc<dyn Repo>` fields plus an
//! `AuditLogger` collaborator, driving a status-carrying entity through an
//! explicit transition table rather than a stateless rule set.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::audit::{AuditLogger, LogActionRequest};
use crate::domain::{
    Actor, ActionOutcome, Approval, ApprovalMethod, AuditAction, ConflictResolution,
    EstimatedImpact, FinanceOpsError, InsightId, PendingSuggestion, Prerequisite, ProposedChange,
    Result, RiskLevel, SuggestionConflict, SuggestionId, SuggestionStatus, SuggestionType, UserId,
    compute_priority,
};
use crate::storage::Repositories;
use crate::suggestion::transform;

pub struct SuggestionLifecycle {
    repos: Repositories,
    audit: AuditLogger,
}

impl SuggestionLifecycle {
    pub fn new(repos: Repositories) -> Self {
        let audit = AuditLogger::new(repos.audit_log.clone());
        Self { repos, audit }
    }

    async fn log(
        &self,
        user_id: UserId,
        suggestion_id: SuggestionId,
        action: AuditAction,
        actor: Actor,
        previous_state: Option<serde_json::Value>,
        new_state: Option<serde_json::Value>,
        outcome: ActionOutcome,
    ) -> Result<()> {
        self.audit
            .log_action(LogActionRequest {
                user_id,
                suggestion_id,
                action,
                actor,
                previous_state,
                new_state,
                outcome,
            })
            .await
    }

    fn ok_outcome() -> ActionOutcome {
        ActionOutcome {
            success: true,
            error: None,
            duration_ms: 0,
        }
    }

    fn err_outcome(message: impl Into<String>) -> ActionOutcome {
        ActionOutcome {
            success: false,
            error: Some(message.into()),
            duration_ms: 0,
        }
    }

    /// `current_state` is the caller's snapshot of the entities
    /// `proposed_changes` targets; `insight_id` links back to the analysis
    /// artifact that produced this suggestion, when one exists.
    pub async fn create_suggestion(
        &self,
        user_id: UserId,
        insight_id: Option<InsightId>,
        title: impl Into<String>,
        description: impl Into<String>,
        current_state: serde_json::Value,
        proposed_changes: ProposedChange,
        estimated_impact: EstimatedImpact,
    ) -> Result<PendingSuggestion> {
        let suggestion_type = proposed_changes.suggestion_type();
        let target_id = proposed_changes.target_id();

        if let Some(existing) = self
            .repos
            .suggestions
            .find_active_by_target(user_id, suggestion_type, &target_id)
            .await?
        {
            let previous = serde_json::to_value(&existing).ok();
            let mut updated = existing.clone();
            updated.title = title.into();
            updated.description = description.into();
            updated.current_state = current_state;
            updated.proposed_changes = proposed_changes;
            updated.estimated_impact = estimated_impact;
            updated.metadata.version += 1;
            updated.updated_at = Utc::now();

            self.repos
                .suggestions
                .update_if_status(&updated, existing.status)
                .await?;
            let new_state = serde_json::to_value(&updated).ok();
            self.log(
                user_id,
                updated.id,
                AuditAction::Updated,
                Actor::system(),
                previous,
                new_state,
                Self::ok_outcome(),
            )
            .await?;
            return Ok(updated);
        }

        let mut suggestion = PendingSuggestion::new(
            user_id,
            title,
            description,
            current_state,
            proposed_changes.clone(),
            estimated_impact.clone(),
        );
        suggestion.insight_id = insight_id;
        suggestion.prerequisites = derive_prerequisites(&self.repos, user_id, &proposed_changes).await?;
        suggestion.metadata.priority = compute_priority(
            estimated_impact.amount.unwrap_or(Decimal::ZERO),
            estimated_impact.confidence,
        );
        suggestion.metadata.risk_level =
            risk_level(&proposed_changes, estimated_impact.amount.unwrap_or(Decimal::ZERO));

        let conflicts = self
            .detect_conflicts(user_id, proposed_changes.category_id())
            .await?;
        if !conflicts.is_empty() {
            suggestion.conflicts = conflicts;
            suggestion.status = SuggestionStatus::Conflict;
        }

        self.repos.suggestions.create(&suggestion).await?;
        let new_state = serde_json::to_value(&suggestion).ok();
        self.log(
            user_id,
            suggestion.id,
            AuditAction::Created,
            Actor::system(),
            None,
            new_state.clone(),
            Self::ok_outcome(),
        )
        .await?;
        if suggestion.status == SuggestionStatus::Conflict {
            self.log(
                user_id,
                suggestion.id,
                AuditAction::ConflictDetected,
                Actor::system(),
                None,
                new_state,
                Self::ok_outcome(),
            )
            .await?;
        }
        Ok(suggestion)
    }

    async fn detect_conflicts(
        &self,
        user_id: UserId,
        category_id: Option<crate::domain::CategoryId>,
    ) -> Result<Vec<SuggestionConflict>> {
        let Some(category_id) = category_id else {
            return Ok(Vec::new());
        };
        let mut active = self
            .repos
            .suggestions
            .list_by_status(user_id, SuggestionStatus::Pending)
            .await?;
        active.extend(
            self.repos
                .suggestions
                .list_by_status(user_id, SuggestionStatus::Approved)
                .await?,
        );
        Ok(active
            .into_iter()
            .filter(|s| s.proposed_changes.category_id() == Some(category_id))
            .map(|s| SuggestionConflict {
                with_suggestion_id: s.id,
                conflict_type: "overlapping_category".into(),
                resolution: ConflictResolution::Unresolved,
            })
            .collect())
    }

    /// Transitions a pending suggestion to approved, applying cooldown and
    /// confirmation rules along the way.
    pub async fn approve_suggestion(
        &self,
        user_id: UserId,
        suggestion_id: SuggestionId,
        approved_by: UserId,
        method: ApprovalMethod,
        ip: Option<String>,
    ) -> Result<PendingSuggestion> {
        let mut suggestion = self
            .repos
            .suggestions
            .get_by_id(user_id, suggestion_id)
            .await?
            .ok_or_else(|| FinanceOpsError::not_found("PendingSuggestion", suggestion_id))?;

        if suggestion.status != SuggestionStatus::Pending {
            return Err(FinanceOpsError::state_machine(
                "PendingSuggestion",
                suggestion_id,
                format!("{:?}", suggestion.status),
                "approved",
            ));
        }
        let now = Utc::now();
        if suggestion.is_expired(now) {
            return Err(FinanceOpsError::state_machine(
                "PendingSuggestion",
                suggestion_id,
                "pending",
                "approved (expired)",
            ));
        }
        if !suggestion.all_prerequisites_satisfied() {
            return Err(FinanceOpsError::validation("prerequisites not satisfied"));
        }
        if suggestion.has_conflicts() {
            return Err(FinanceOpsError::validation("suggestion has unresolved conflicts"));
        }

        let impact = suggestion
            .estimated_impact
            .amount
            .unwrap_or(Decimal::ZERO)
            .abs();
        let confidence = suggestion.estimated_impact.confidence;
        let suggestion_type = suggestion.suggestion_type;
        let high_risk = suggestion_type.is_high_risk();
        let requires_confirmation =
            impact > Decimal::from(500) || high_risk || confidence < 70;

        if method == ApprovalMethod::Auto {
            let auto_approve_ok =
                impact < Decimal::from(50) && confidence >= 80 && !high_risk;
            if !auto_approve_ok || requires_confirmation {
                return Err(FinanceOpsError::validation(
                    "suggestion requires manual confirmation",
                ));
            }
        }

        let cooldown_days = suggestion_type.cooldown_days();
        if cooldown_days > 0 {
            let terminal = self
                .repos
                .suggestions
                .list_terminal_by_type(user_id, suggestion_type)
                .await?;
            let cutoff = now - chrono::Duration::days(cooldown_days);
            if terminal.iter().any(|s| s.updated_at > cutoff) {
                return Err(FinanceOpsError::validation(format!(
                    "cooldown active for {:?} ({} days)",
                    suggestion_type, cooldown_days
                )));
            }
        }

        let previous = serde_json::to_value(&suggestion).ok();
        suggestion.status = SuggestionStatus::Approved;
        suggestion.approval = Some(Approval {
            at: now,
            by: approved_by,
            method,
            ip,
        });
        suggestion.updated_at = now;
        self.repos
            .suggestions
            .update_if_status(&suggestion, SuggestionStatus::Pending)
            .await?;

        self.log(
            user_id,
            suggestion_id,
            AuditAction::Approved,
            Actor::user(approved_by),
            previous,
            serde_json::to_value(&suggestion).ok(),
            Self::ok_outcome(),
        )
        .await?;
        Ok(suggestion)
    }

    pub async fn reject_suggestion(
        &self,
        user_id: UserId,
        suggestion_id: SuggestionId,
        actor: Actor,
    ) -> Result<PendingSuggestion> {
        self.terminal_transition(
            user_id,
            suggestion_id,
            &[SuggestionStatus::Pending],
            SuggestionStatus::Rejected,
            AuditAction::Rejected,
            actor,
        )
        .await
    }

    pub async fn cancel_suggestion(
        &self,
        user_id: UserId,
        suggestion_id: SuggestionId,
        actor: Actor,
    ) -> Result<PendingSuggestion> {
        self.terminal_transition(
            user_id,
            suggestion_id,
            &[SuggestionStatus::Pending, SuggestionStatus::Approved],
            SuggestionStatus::Cancelled,
            AuditAction::Cancelled,
            actor,
        )
        .await
    }

    async fn terminal_transition(
        &self,
        user_id: UserId,
        suggestion_id: SuggestionId,
        allowed_from: &[SuggestionStatus],
        to: SuggestionStatus,
        action: AuditAction,
        actor: Actor,
    ) -> Result<PendingSuggestion> {
        let mut suggestion = self
            .repos
            .suggestions
            .get_by_id(user_id, suggestion_id)
            .await?
            .ok_or_else(|| FinanceOpsError::not_found("PendingSuggestion", suggestion_id))?;
        if !allowed_from.contains(&suggestion.status) {
            return Err(FinanceOpsError::state_machine(
                "PendingSuggestion",
                suggestion_id,
                format!("{:?}", suggestion.status),
                format!("{:?}", to),
            ));
        }
        let previous = serde_json::to_value(&suggestion).ok();
        let from_status = suggestion.status;
        suggestion.status = to;
        suggestion.updated_at = Utc::now();
        self.repos
            .suggestions
            .update_if_status(&suggestion, from_status)
            .await?;
        self.log(
            user_id,
            suggestion_id,
            action,
            actor,
            previous,
            serde_json::to_value(&suggestion).ok(),
            Self::ok_outcome(),
        )
        .await?;
        Ok(suggestion)
    }

    /// Commits an approved suggestion's proposed changes.
    pub async fn apply_suggestion(
        &self,
        user_id: UserId,
        suggestion_id: SuggestionId,
    ) -> Result<PendingSuggestion> {
        let mut suggestion = self
            .repos
            .suggestions
            .get_by_id(user_id, suggestion_id)
            .await?
            .ok_or_else(|| FinanceOpsError::not_found("PendingSuggestion", suggestion_id))?;
        if suggestion.status != SuggestionStatus::Approved {
            return Err(FinanceOpsError::state_machine(
                "PendingSuggestion",
                suggestion_id,
                format!("{:?}", suggestion.status),
                "applied",
            ));
        }
        let now = Utc::now();
        if suggestion.is_expired(now) {
            return Err(FinanceOpsError::state_machine(
                "PendingSuggestion",
                suggestion_id,
                "approved",
                "applied (expired)",
            ));
        }

        let previous = serde_json::to_value(&suggestion).ok();

        if let Err(err) = transform::validate(&self.repos, user_id, &suggestion.proposed_changes).await {
            suggestion.status = SuggestionStatus::Failed;
            suggestion.execution.at = Some(now);
            suggestion.execution.by = Some(user_id);
            suggestion.execution.results.push(crate::domain::ExecutionStep {
                step: "validate".into(),
                success: false,
                data: None,
                error: Some(err.to_string()),
            });
            suggestion.updated_at = now;
            self.repos
                .suggestions
                .update_if_status(&suggestion, SuggestionStatus::Approved)
                .await?;
            self.log(
                user_id,
                suggestion_id,
                AuditAction::Failed,
                Actor::system(),
                previous,
                serde_json::to_value(&suggestion).ok(),
                Self::err_outcome(err.to_string()),
            )
            .await?;
            return Err(err);
        }

        match transform::apply(&self.repos, user_id, &suggestion.proposed_changes).await {
            Ok(step) => {
                suggestion.execution.at = Some(now);
                suggestion.execution.by = Some(user_id);
                let success = step.success;
                suggestion.execution.results.push(step);
                suggestion.status = if success {
                    SuggestionStatus::Applied
                } else {
                    SuggestionStatus::Failed
                };
                suggestion.updated_at = now;
                self.repos
                    .suggestions
                    .update_if_status(&suggestion, SuggestionStatus::Approved)
                    .await?;
                self.log(
                    user_id,
                    suggestion_id,
                    if success { AuditAction::Applied } else { AuditAction::Failed },
                    Actor::system(),
                    previous,
                    serde_json::to_value(&suggestion).ok(),
                    if success { Self::ok_outcome() } else { Self::err_outcome("transformation step failed") },
                )
                .await?;
                Ok(suggestion)
            }
            Err(err) => {
                suggestion.status = SuggestionStatus::Failed;
                suggestion.execution.at = Some(now);
                suggestion.execution.by = Some(user_id);
                suggestion.execution.results.push(crate::domain::ExecutionStep {
                    step: "apply".into(),
                    success: false,
                    data: None,
                    error: Some(err.to_string()),
                });
                suggestion.updated_at = now;
                self.repos
                    .suggestions
                    .update_if_status(&suggestion, SuggestionStatus::Approved)
                    .await?;
                self.log(
                    user_id,
                    suggestion_id,
                    AuditAction::Failed,
                    Actor::system(),
                    previous,
                    serde_json::to_value(&suggestion).ok(),
                    Self::err_outcome(err.to_string()),
                )
                .await?;
                Err(err)
            }
        }
    }

    /// Reverses an applied suggestion's changes. A failed reversal leaves
    /// `status = Applied` untouched — partial rollback is forbidden.
    pub async fn rollback_suggestion(
        &self,
        user_id: UserId,
        suggestion_id: SuggestionId,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<PendingSuggestion> {
        let mut suggestion = self
            .repos
            .suggestions
            .get_by_id(user_id, suggestion_id)
            .await?
            .ok_or_else(|| FinanceOpsError::not_found("PendingSuggestion", suggestion_id))?;
        if suggestion.status != SuggestionStatus::Applied {
            return Err(FinanceOpsError::state_machine(
                "PendingSuggestion",
                suggestion_id,
                format!("{:?}", suggestion.status),
                "rolled_back",
            ));
        }

        let previous = serde_json::to_value(&suggestion).ok();
        let now = Utc::now();

        match transform::rollback(&self.repos, user_id, &suggestion.proposed_changes).await {
            Ok(()) => {
                suggestion.rollback.at = Some(now);
                suggestion.rollback.by = Some(user_id);
                suggestion.rollback.reason = reason;
                suggestion.rollback.success = true;
                suggestion.rollback.error = None;
                suggestion.status = SuggestionStatus::RolledBack;
                suggestion.updated_at = now;
                self.repos
                    .suggestions
                    .update_if_status(&suggestion, SuggestionStatus::Applied)
                    .await?;
                self.log(
                    user_id,
                    suggestion_id,
                    AuditAction::RolledBack,
                    actor,
                    previous,
                    serde_json::to_value(&suggestion).ok(),
                    Self::ok_outcome(),
                )
                .await?;
                Ok(suggestion)
            }
            Err(err) => {
                suggestion.rollback.at = Some(now);
                suggestion.rollback.by = Some(user_id);
                suggestion.rollback.reason = reason;
                suggestion.rollback.success = false;
                suggestion.rollback.error = Some(err.to_string());
                suggestion.updated_at = now;
                // Status stays Applied; this update is unconditional metadata only,
                // so it uses the same expected status rather than a transition.
                self.repos
                    .suggestions
                    .update_if_status(&suggestion, SuggestionStatus::Applied)
                    .await?;
                self.log(
                    user_id,
                    suggestion_id,
                    AuditAction::Failed,
                    actor,
                    previous,
                    serde_json::to_value(&suggestion).ok(),
                    Self::err_outcome(err.to_string()),
                )
                .await?;
                Err(err)
            }
        }
    }

    /// Background TTL sweep (driven by C10): transitions unacted `Pending`/
    /// `Approved` suggestions whose `expires_at` has passed to `Expired`.
    pub async fn expire_due_suggestions(&self) -> Result<usize> {
        let now = Utc::now();
        let expirable = self.repos.suggestions.list_expirable(now).await?;
        let mut count = 0;
        for mut suggestion in expirable {
            if !matches!(
                suggestion.status,
                SuggestionStatus::Pending | SuggestionStatus::Approved
            ) {
                continue;
            }
            let previous = serde_json::to_value(&suggestion).ok();
            let from_status = suggestion.status;
            suggestion.status = SuggestionStatus::Expired;
            suggestion.updated_at = now;
            self.repos
                .suggestions
                .update_if_status(&suggestion, from_status)
                .await?;
            self.log(
                suggestion.user_id,
                suggestion.id,
                AuditAction::Expired,
                Actor::scheduler(),
                previous,
                serde_json::to_value(&suggestion).ok(),
                Self::ok_outcome(),
            )
            .await?;
            count += 1;
        }
        Ok(count)
    }
}

fn risk_level(change: &ProposedChange, impact_amount: Decimal) -> RiskLevel {
    let impact_amount = impact_amount.abs();
    if change.suggestion_type().is_high_risk() {
        if impact_amount > Decimal::from(500) {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    } else if impact_amount > Decimal::from(1000) {
        RiskLevel::High
    } else if impact_amount > Decimal::from(200) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

async fn derive_prerequisites(
    repos: &Repositories,
    user_id: UserId,
    change: &ProposedChange,
) -> Result<Vec<Prerequisite>> {
    let mut prereqs = Vec::new();
    match change {
        ProposedChange::BudgetAdjustment { budget_id, .. } => {
            let satisfied = repos.budgets.get_by_id(user_id, *budget_id).await?.is_some();
            prereqs.push(Prerequisite {
                prerequisite_type: "has_budget".into(),
                satisfied,
                details: if satisfied { "budget exists".into() } else { "budget not found".into() },
            });
        }
        ProposedChange::SavingsIncrease { goal_id, .. } | ProposedChange::GoalAdjustment { goal_id, .. } => {
            let satisfied = repos.goals.get_by_id(user_id, *goal_id).await?.is_some();
            prereqs.push(Prerequisite {
                prerequisite_type: "has_goal".into(),
                satisfied,
                details: if satisfied { "goal exists".into() } else { "goal not found".into() },
            });
        }
        ProposedChange::SubscriptionCancellation { subscription_id, .. } => {
            let satisfied = repos
                .subscriptions
                .get_by_id(user_id, *subscription_id)
                .await?
                .map(|s| s.is_active())
                .unwrap_or(false);
            prereqs.push(Prerequisite {
                prerequisite_type: "subscription_active".into(),
                satisfied,
                details: if satisfied { "subscription is active".into() } else { "subscription not active".into() },
            });
        }
        ProposedChange::CategoryCreation { category_id, .. } => {
            let satisfied = repos.categories.get_by_id(user_id, *category_id).await?.is_none();
            prereqs.push(Prerequisite {
                prerequisite_type: "category_available".into(),
                satisfied,
                details: if satisfied { "category id is free".into() } else { "category id already in use".into() },
            });
        }
        ProposedChange::BudgetCreation { category_id, .. } => {
            let satisfied = repos.categories.get_by_id(user_id, *category_id).await?.is_some();
            prereqs.push(Prerequisite {
                prerequisite_type: "has_category".into(),
                satisfied,
                details: if satisfied { "category exists".into() } else { "category not found".into() },
            });
        }
        ProposedChange::TransactionCategorization { transaction_id, new_category_id, .. } => {
            let tx_satisfied = repos.transactions.get_by_id(user_id, *transaction_id).await?.is_some();
            let cat_satisfied = repos.categories.get_by_id(user_id, *new_category_id).await?.is_some();
            prereqs.push(Prerequisite {
                prerequisite_type: "has_transaction".into(),
                satisfied: tx_satisfied,
                details: if tx_satisfied { "transaction exists".into() } else { "transaction not found".into() },
            });
            prereqs.push(Prerequisite {
                prerequisite_type: "has_category".into(),
                satisfied: cat_satisfied,
                details: if cat_satisfied { "category exists".into() } else { "category not found".into() },
            });
        }
    }
    Ok(prereqs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Budget, BudgetFlexibility, BudgetPeriod, Category, CategoryType};
    use rust_decimal_macros::dec;

    async fn seeded_budget(repos: &Repositories, user_id: UserId) -> (crate::domain::CategoryId, crate::domain::BudgetId) {
        let category = Category::new(user_id, "Groceries", CategoryType::Need);
        repos.categories.create(&category).await.unwrap();
        let mut budget = Budget::new(
            user_id,
            category.id,
            "Groceries budget",
            dec!(300),
            BudgetPeriod::Monthly,
            Utc::now(),
        );
        budget.flexibility = BudgetFlexibility::Flexible;
        repos.budgets.create(&budget).await.unwrap();
        (category.id, budget.id)
    }

    fn impact(amount: Decimal, confidence: u8) -> EstimatedImpact {
        EstimatedImpact {
            amount: Some(amount),
            percentage: None,
            timeframe: "monthly".into(),
            confidence,
        }
    }

    #[tokio::test]
    async fn full_lifecycle_round_trip_applies_and_rolls_back() {
        let repos = Repositories::in_memory();
        let lifecycle = SuggestionLifecycle::new(repos.clone());
        let user_id = UserId::new();
        let (category_id, budget_id) = seeded_budget(&repos, user_id).await;

        let change = ProposedChange::BudgetAdjustment {
            budget_id,
            category_id,
            old_amount: dec!(300),
            new_amount: dec!(350),
        };
        let suggestion = lifecycle
            .create_suggestion(
                user_id,
                None,
                "Raise groceries budget",
                "Spending has drifted above the current cap.",
                serde_json::json!({"amount": 300}),
                change,
                impact(dec!(50), 75),
            )
            .await
            .unwrap();
        assert_eq!(suggestion.status, SuggestionStatus::Pending);

        let approved = lifecycle
            .approve_suggestion(user_id, suggestion.id, user_id, ApprovalMethod::Manual, None)
            .await
            .unwrap();
        assert_eq!(approved.status, SuggestionStatus::Approved);

        let applied = lifecycle.apply_suggestion(user_id, suggestion.id).await.unwrap();
        assert_eq!(applied.status, SuggestionStatus::Applied);
        let budget = repos.budgets.get_by_id(user_id, budget_id).await.unwrap().unwrap();
        assert_eq!(budget.amount, dec!(350));

        let rolled_back = lifecycle
            .rollback_suggestion(user_id, suggestion.id, Actor::user(user_id), None)
            .await
            .unwrap();
        assert_eq!(rolled_back.status, SuggestionStatus::RolledBack);
        let budget = repos.budgets.get_by_id(user_id, budget_id).await.unwrap().unwrap();
        assert_eq!(budget.amount, dec!(300));

        let trail = repos.audit_log.get_suggestion_trail(suggestion.id, 10).await.unwrap();
        assert_eq!(trail.len(), 4);
    }

    #[tokio::test]
    async fn cooldown_blocks_reapproval_of_recently_terminal_type() {
        let repos = Repositories::in_memory();
        let lifecycle = SuggestionLifecycle::new(repos.clone());
        let user_id = UserId::new();
        let (category_id, budget_id) = seeded_budget(&repos, user_id).await;

        let first_change = ProposedChange::BudgetAdjustment {
            budget_id,
            category_id,
            old_amount: dec!(300),
            new_amount: dec!(320),
        };
        let first = lifecycle
            .create_suggestion(
                user_id,
                None,
                "first",
                "first",
                serde_json::json!({}),
                first_change,
                impact(dec!(20), 75),
            )
            .await
            .unwrap();
        lifecycle
            .reject_suggestion(user_id, first.id, Actor::user(user_id))
            .await
            .unwrap();

        let second_change = ProposedChange::BudgetAdjustment {
            budget_id,
            category_id,
            old_amount: dec!(300),
            new_amount: dec!(330),
        };
        let second = lifecycle
            .create_suggestion(
                user_id,
                None,
                "second",
                "second",
                serde_json::json!({}),
                second_change,
                impact(dec!(30), 75),
            )
            .await
            .unwrap();

        let result = lifecycle
            .approve_suggestion(user_id, second.id, user_id, ApprovalMethod::Manual, None)
            .await;
        assert!(result.is_err());
    }
}
