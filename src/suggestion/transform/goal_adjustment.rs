use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{audit_log::diff_states, ExecutionStep, FinanceOpsError, ProposedChange, Result, UserId};
use crate::storage::Repositories;

use super::Simulation;

struct Fields {
    goal_id: crate::domain::SavingsGoalId,
    old_target_amount: Decimal,
    new_target_amount: Decimal,
    old_target_date: DateTime<Utc>,
    new_target_date: DateTime<Utc>,
    old_priority: u8,
    new_priority: u8,
}

fn fields(change: &ProposedChange) -> Fields {
    match change {
        ProposedChange::GoalAdjustment {
            goal_id,
            old_target_amount,
            new_target_amount,
            old_target_date,
            new_target_date,
            old_priority,
            new_priority,
        } => Fields {
            goal_id: *goal_id,
            old_target_amount: *old_target_amount,
            new_target_amount: *new_target_amount,
            old_target_date: *old_target_date,
            new_target_date: *new_target_date,
            old_priority: *old_priority,
            new_priority: *new_priority,
        },
        _ => unreachable!("dispatched only for GoalAdjustment"),
    }
}

pub async fn validate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let f = fields(change);
    let goal = repos
        .goals
        .get_by_id(user_id, f.goal_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("SavingsGoal", f.goal_id))?;
    if goal.target_amount != f.old_target_amount || goal.priority != f.old_priority {
        return Err(FinanceOpsError::validation(
            "savings goal changed since suggestion was created",
        ));
    }
    Ok(())
}

pub async fn simulate(_repos: &Repositories, _user_id: UserId, change: &ProposedChange) -> Result<Simulation> {
    let f = fields(change);
    let before = serde_json::json!({
        "goal_id": f.goal_id,
        "target_amount": f.old_target_amount,
        "target_date": f.old_target_date,
        "priority": f.old_priority,
    });
    let after = serde_json::json!({
        "goal_id": f.goal_id,
        "target_amount": f.new_target_amount,
        "target_date": f.new_target_date,
        "priority": f.new_priority,
    });
    let difference = diff_states(Some(&before), Some(&after));
    Ok(Simulation { before, after, difference })
}

pub async fn apply(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<ExecutionStep> {
    let f = fields(change);
    let mut goal = repos
        .goals
        .get_by_id(user_id, f.goal_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("SavingsGoal", f.goal_id))?;
    goal.target_amount = f.new_target_amount;
    goal.target_date = f.new_target_date;
    goal.priority = f.new_priority;
    goal.updated_at = chrono::Utc::now();
    repos.goals.update(&goal).await?;
    Ok(ExecutionStep {
        step: "adjust_goal".into(),
        success: true,
        data: Some(serde_json::json!({
            "goal_id": f.goal_id,
            "new_target_amount": f.new_target_amount,
            "new_target_date": f.new_target_date,
            "new_priority": f.new_priority,
        })),
        error: None,
    })
}

pub async fn rollback(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let f = fields(change);
    let mut goal = repos
        .goals
        .get_by_id(user_id, f.goal_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("SavingsGoal", f.goal_id))?;
    goal.target_amount = f.old_target_amount;
    goal.target_date = f.old_target_date;
    goal.priority = f.old_priority;
    goal.updated_at = chrono::Utc::now();
    repos.goals.update(&goal).await?;
    Ok(())
}
