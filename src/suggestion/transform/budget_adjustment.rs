use crate::domain::{audit_log::diff_states, ExecutionStep, FinanceOpsError, ProposedChange, Result, UserId};
use crate::storage::Repositories;

use super::Simulation;

fn fields(change: &ProposedChange) -> (crate::domain::BudgetId, rust_decimal::Decimal, rust_decimal::Decimal) {
    match change {
        ProposedChange::BudgetAdjustment {
            budget_id,
            old_amount,
            new_amount,
            ..
        } => (*budget_id, *old_amount, *new_amount),
        _ => unreachable!("dispatched only for BudgetAdjustment"),
    }
}

pub async fn validate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (budget_id, old_amount, _) = fields(change);
    let budget = repos
        .budgets
        .get_by_id(user_id, budget_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Budget", budget_id))?;
    if budget.amount != old_amount {
        return Err(FinanceOpsError::validation(
            "budget amount changed since suggestion was created",
        ));
    }
    Ok(())
}

pub async fn simulate(_repos: &Repositories, _user_id: UserId, change: &ProposedChange) -> Result<Simulation> {
    let (budget_id, old_amount, new_amount) = fields(change);
    let before = serde_json::json!({ "budget_id": budget_id, "amount": old_amount });
    let after = serde_json::json!({ "budget_id": budget_id, "amount": new_amount });
    let difference = diff_states(Some(&before), Some(&after));
    Ok(Simulation { before, after, difference })
}

pub async fn apply(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<ExecutionStep> {
    let (budget_id, _old_amount, new_amount) = fields(change);
    let mut budget = repos
        .budgets
        .get_by_id(user_id, budget_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Budget", budget_id))?;
    budget.amount = new_amount;
    budget.updated_at = chrono::Utc::now();
    repos.budgets.update(&budget).await?;
    Ok(ExecutionStep {
        step: "update_budget_amount".into(),
        success: true,
        data: Some(serde_json::json!({ "budget_id": budget_id, "new_amount": new_amount })),
        error: None,
    })
}

pub async fn rollback(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (budget_id, old_amount, _) = fields(change);
    let mut budget = repos
        .budgets
        .get_by_id(user_id, budget_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Budget", budget_id))?;
    budget.amount = old_amount;
    budget.updated_at = chrono::Utc::now();
    repos.budgets.update(&budget).await?;
    Ok(())
}
