use crate::domain::{audit_log::diff_states, ExecutionStep, FinanceOpsError, ProposedChange, Result, UserId};
use crate::storage::Repositories;

use super::Simulation;

fn fields(
    change: &ProposedChange,
) -> (
    crate::domain::SavingsGoalId,
    rust_decimal::Decimal,
    rust_decimal::Decimal,
    bool,
) {
    match change {
        ProposedChange::SavingsIncrease {
            goal_id,
            old_auto_save_amount,
            new_auto_save_amount,
            newly_enabled,
        } => (*goal_id, *old_auto_save_amount, *new_auto_save_amount, *newly_enabled),
        _ => unreachable!("dispatched only for SavingsIncrease"),
    }
}

pub async fn validate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (goal_id, old_amount, _, _) = fields(change);
    let goal = repos
        .goals
        .get_by_id(user_id, goal_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("SavingsGoal", goal_id))?;
    if goal.auto_save.amount != old_amount {
        return Err(FinanceOpsError::validation(
            "auto-save amount changed since suggestion was created",
        ));
    }
    Ok(())
}

pub async fn simulate(_repos: &Repositories, _user_id: UserId, change: &ProposedChange) -> Result<Simulation> {
    let (goal_id, old_amount, new_amount, newly_enabled) = fields(change);
    let before = serde_json::json!({ "goal_id": goal_id, "auto_save_amount": old_amount, "auto_save_enabled": !newly_enabled });
    let after = serde_json::json!({ "goal_id": goal_id, "auto_save_amount": new_amount, "auto_save_enabled": true });
    let difference = diff_states(Some(&before), Some(&after));
    Ok(Simulation { before, after, difference })
}

pub async fn apply(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<ExecutionStep> {
    let (goal_id, _old_amount, new_amount, _) = fields(change);
    let mut goal = repos
        .goals
        .get_by_id(user_id, goal_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("SavingsGoal", goal_id))?;
    goal.auto_save.amount = new_amount;
    goal.auto_save.enabled = true;
    goal.updated_at = chrono::Utc::now();
    repos.goals.update(&goal).await?;
    Ok(ExecutionStep {
        step: "update_auto_save_amount".into(),
        success: true,
        data: Some(serde_json::json!({ "goal_id": goal_id, "new_auto_save_amount": new_amount })),
        error: None,
    })
}

pub async fn rollback(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (goal_id, old_amount, _, newly_enabled) = fields(change);
    let mut goal = repos
        .goals
        .get_by_id(user_id, goal_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("SavingsGoal", goal_id))?;
    goal.auto_save.amount = old_amount;
    if newly_enabled {
        goal.auto_save.enabled = false;
    }
    goal.updated_at = chrono::Utc::now();
    repos.goals.update(&goal).await?;
    Ok(())
}
