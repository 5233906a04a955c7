use crate::domain::{
    audit_log::diff_states, Budget, BudgetPeriod, ExecutionStep, FinanceOpsError, ProposedChange,
    Result, UserId,
};
use crate::storage::Repositories;

use super::Simulation;

fn fields(
    change: &ProposedChange,
) -> (crate::domain::BudgetId, crate::domain::CategoryId, rust_decimal::Decimal) {
    match change {
        ProposedChange::BudgetCreation {
            budget_id,
            category_id,
            amount,
        } => (*budget_id, *category_id, *amount),
        _ => unreachable!("dispatched only for BudgetCreation"),
    }
}

pub async fn validate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (budget_id, category_id, _) = fields(change);
    if repos.budgets.get_by_id(user_id, budget_id).await?.is_some() {
        return Err(FinanceOpsError::validation("budget already exists"));
    }
    if repos.categories.get_by_id(user_id, category_id).await?.is_none() {
        return Err(FinanceOpsError::not_found("Category", category_id));
    }
    Ok(())
}

pub async fn simulate(_repos: &Repositories, _user_id: UserId, change: &ProposedChange) -> Result<Simulation> {
    let (budget_id, category_id, amount) = fields(change);
    let before = serde_json::Value::Null;
    let after = serde_json::json!({ "budget_id": budget_id, "category_id": category_id, "amount": amount });
    let difference = diff_states(None, Some(&after));
    Ok(Simulation { before, after, difference })
}

pub async fn apply(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<ExecutionStep> {
    let (budget_id, category_id, amount) = fields(change);
    let mut budget = Budget::new(
        user_id,
        category_id,
        "Suggested budget",
        amount,
        BudgetPeriod::Monthly,
        chrono::Utc::now(),
    );
    budget.id = budget_id;
    repos.budgets.create(&budget).await?;
    Ok(ExecutionStep {
        step: "create_budget".into(),
        success: true,
        data: Some(serde_json::json!({ "budget_id": budget_id, "amount": amount })),
        error: None,
    })
}

pub async fn rollback(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (budget_id, _, _) = fields(change);
    repos.budgets.delete(user_id, budget_id).await?;
    Ok(())
}
