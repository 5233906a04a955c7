//! Typed validator + applier pairs for each `SuggestionType` (C6 sub).
//!
//! One file per type: a pure step that computes `{before, after}` and a
//! separate step that commits it. `dry_run` reuses the pure half only.

mod budget_adjustment;
mod budget_creation;
mod category_creation;
mod goal_adjustment;
mod savings_increase;
mod subscription_cancellation;
mod transaction_categorization;

use crate::domain::{ExecutionStep, ProposedChange, Result, UserId};
use crate::storage::Repositories;

/// `{before, after, difference}` shape shared by simulation and real application.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Simulation {
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub difference: Vec<crate::domain::FieldChange>,
}

/// Validates that the proposed change can still be applied against current state.
pub async fn validate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    match change {
        ProposedChange::BudgetAdjustment { .. } => budget_adjustment::validate(repos, user_id, change).await,
        ProposedChange::SavingsIncrease { .. } => savings_increase::validate(repos, user_id, change).await,
        ProposedChange::SubscriptionCancellation { .. } => {
            subscription_cancellation::validate(repos, user_id, change).await
        }
        ProposedChange::CategoryCreation { .. } => category_creation::validate(repos, user_id, change).await,
        ProposedChange::BudgetCreation { .. } => budget_creation::validate(repos, user_id, change).await,
        ProposedChange::GoalAdjustment { .. } => goal_adjustment::validate(repos, user_id, change).await,
        ProposedChange::TransactionCategorization { .. } => {
            transaction_categorization::validate(repos, user_id, change).await
        }
    }
}

/// Computes `{before, after}` without writing anything (used by both `dry_run`
/// and as the first half of `apply`).
pub async fn simulate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<Simulation> {
    match change {
        ProposedChange::BudgetAdjustment { .. } => budget_adjustment::simulate(repos, user_id, change).await,
        ProposedChange::SavingsIncrease { .. } => savings_increase::simulate(repos, user_id, change).await,
        ProposedChange::SubscriptionCancellation { .. } => {
            subscription_cancellation::simulate(repos, user_id, change).await
        }
        ProposedChange::CategoryCreation { .. } => category_creation::simulate(repos, user_id, change).await,
        ProposedChange::BudgetCreation { .. } => budget_creation::simulate(repos, user_id, change).await,
        ProposedChange::GoalAdjustment { .. } => goal_adjustment::simulate(repos, user_id, change).await,
        ProposedChange::TransactionCategorization { .. } => {
            transaction_categorization::simulate(repos, user_id, change).await
        }
    }
}

/// Commits the change, returning the execution step recorded on the suggestion.
pub async fn apply(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<ExecutionStep> {
    match change {
        ProposedChange::BudgetAdjustment { .. } => budget_adjustment::apply(repos, user_id, change).await,
        ProposedChange::SavingsIncrease { .. } => savings_increase::apply(repos, user_id, change).await,
        ProposedChange::SubscriptionCancellation { .. } => {
            subscription_cancellation::apply(repos, user_id, change).await
        }
        ProposedChange::CategoryCreation { .. } => category_creation::apply(repos, user_id, change).await,
        ProposedChange::BudgetCreation { .. } => budget_creation::apply(repos, user_id, change).await,
        ProposedChange::GoalAdjustment { .. } => goal_adjustment::apply(repos, user_id, change).await,
        ProposedChange::TransactionCategorization { .. } => {
            transaction_categorization::apply(repos, user_id, change).await
        }
    }
}

/// Type-specific reversal. Leaves state untouched and returns an error on
/// failure rather than attempting a partial undo.
pub async fn rollback(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    match change {
        ProposedChange::BudgetAdjustment { .. } => budget_adjustment::rollback(repos, user_id, change).await,
        ProposedChange::SavingsIncrease { .. } => savings_increase::rollback(repos, user_id, change).await,
        ProposedChange::SubscriptionCancellation { .. } => {
            subscription_cancellation::rollback(repos, user_id, change).await
        }
        ProposedChange::CategoryCreation { .. } => category_creation::rollback(repos, user_id, change).await,
        ProposedChange::BudgetCreation { .. } => budget_creation::rollback(repos, user_id, change).await,
        ProposedChange::GoalAdjustment { .. } => goal_adjustment::rollback(repos, user_id, change).await,
        ProposedChange::TransactionCategorization { .. } => {
            transaction_categorization::rollback(repos, user_id, change).await
        }
    }
}
