use crate::domain::{
    audit_log::diff_states, ExecutionStep, FinanceOpsError, ProposedChange, Result,
    SubscriptionStatus, Transaction, TransactionStatus, TransactionType, UserId,
};
use crate::storage::Repositories;

use super::Simulation;

fn fields(change: &ProposedChange) -> (crate::domain::SubscriptionId, rust_decimal::Decimal) {
    match change {
        ProposedChange::SubscriptionCancellation {
            subscription_id,
            monthly_savings,
        } => (*subscription_id, *monthly_savings),
        _ => unreachable!("dispatched only for SubscriptionCancellation"),
    }
}

pub async fn validate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (subscription_id, _) = fields(change);
    let subscription = repos
        .subscriptions
        .get_by_id(user_id, subscription_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Subscription", subscription_id))?;
    if !subscription.is_active() {
        return Err(FinanceOpsError::validation(
            "subscription is no longer active",
        ));
    }
    Ok(())
}

pub async fn simulate(_repos: &Repositories, _user_id: UserId, change: &ProposedChange) -> Result<Simulation> {
    let (subscription_id, monthly_savings) = fields(change);
    let before = serde_json::json!({ "subscription_id": subscription_id, "status": "active" });
    let after = serde_json::json!({
        "subscription_id": subscription_id,
        "status": "cancelled",
        "monthly_savings": monthly_savings,
    });
    let difference = diff_states(Some(&before), Some(&after));
    Ok(Simulation { before, after, difference })
}

pub async fn apply(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<ExecutionStep> {
    let (subscription_id, monthly_savings) = fields(change);
    let mut subscription = repos
        .subscriptions
        .get_by_id(user_id, subscription_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Subscription", subscription_id))?;
    subscription.cancel();
    repos.subscriptions.update(&subscription).await?;
    Ok(ExecutionStep {
        step: "cancel_subscription".into(),
        success: true,
        data: Some(serde_json::json!({
            "subscription_id": subscription_id,
            "monthly_savings": monthly_savings,
        })),
        error: None,
    })
}

pub async fn rollback(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (subscription_id, _) = fields(change);
    let mut subscription = repos
        .subscriptions
        .get_by_id(user_id, subscription_id)
        .await?
        .ok_or_else(|| FinanceOpsError::not_found("Subscription", subscription_id))?;
    subscription.status = SubscriptionStatus::Active;
    subscription.auto_renew = true;
    subscription.updated_at = chrono::Utc::now();
    repos.subscriptions.update(&subscription).await?;

    // Marker transaction so a reactivation is visible in the transaction
    // history even though no real money moved; amount is nominal and the
    // Transfer type keeps it net-zero in cash-flow calculations.
    let marker = Transaction::new(
        user_id,
        rust_decimal::Decimal::new(1, 2),
        TransactionType::Transfer,
        format!("Subscription '{}' reactivated (rollback)", subscription.name),
        chrono::Utc::now(),
    )
    .with_status(TransactionStatus::Completed)
    .with_subscription(subscription_id)
    .with_tags(vec!["synthetic".into(), "rollback".into()]);
    repos.transactions.create(&marker).await?;

    Ok(())
}
