use crate::domain::{audit_log::diff_states, ExecutionStep, FinanceOpsError, ProposedChange, Result, UserId};
use crate::storage::Repositories;

use super::Simulation;

fn fields(
    change: &ProposedChange,
) -> (
    crate::domain::TransactionId,
    Option<crate::domain::CategoryId>,
    crate::domain::CategoryId,
) {
    match change {
        ProposedChange::TransactionCategorization {
            transaction_id,
            old_category_id,
            new_category_id,
        } => (*transaction_id, *old_category_id, *new_category_id),
        _ => unreachable!("dispatched only for TransactionCategorization"),
    }
}

pub async fn validate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (transaction_id, old_category_id, _) = fields(change);
    let transaction = repos
        .transactions
        .get_by_id(user_id, transaction_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Transaction", transaction_id))?;
    if transaction.category_id != old_category_id {
        return Err(FinanceOpsError::validation(
            "transaction category changed since suggestion was created",
        ));
    }
    Ok(())
}

pub async fn simulate(_repos: &Repositories, _user_id: UserId, change: &ProposedChange) -> Result<Simulation> {
    let (transaction_id, old_category_id, new_category_id) = fields(change);
    let before = serde_json::json!({ "transaction_id": transaction_id, "category_id": old_category_id });
    let after = serde_json::json!({ "transaction_id": transaction_id, "category_id": new_category_id });
    let difference = diff_states(Some(&before), Some(&after));
    Ok(Simulation { before, after, difference })
}

pub async fn apply(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<ExecutionStep> {
    let (transaction_id, _old_category_id, new_category_id) = fields(change);
    let mut transaction = repos
        .transactions
        .get_by_id(user_id, transaction_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Transaction", transaction_id))?;
    transaction.category_id = Some(new_category_id);
    transaction.updated_at = chrono::Utc::now();
    repos.transactions.update(&transaction).await?;
    Ok(ExecutionStep {
        step: "recategorize_transaction".into(),
        success: true,
        data: Some(serde_json::json!({ "transaction_id": transaction_id, "new_category_id": new_category_id })),
        error: None,
    })
}

pub async fn rollback(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (transaction_id, old_category_id, _) = fields(change);
    let mut transaction = repos
        .transactions
        .get_by_id(user_id, transaction_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Transaction", transaction_id))?;
    transaction.category_id = old_category_id;
    transaction.updated_at = chrono::Utc::now();
    repos.transactions.update(&transaction).await?;
    Ok(())
}
