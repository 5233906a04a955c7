use crate::domain::{
    audit_log::diff_states, Category, CategoryType, ExecutionStep, FinanceOpsError, ProposedChange,
    Result, UserId,
};
use crate::storage::Repositories;

use super::Simulation;

fn fields(change: &ProposedChange) -> (crate::domain::CategoryId, &str) {
    match change {
        ProposedChange::CategoryCreation { category_id, name } => (*category_id, name.as_str()),
        _ => unreachable!("dispatched only for CategoryCreation"),
    }
}

pub async fn validate(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (category_id, name) = fields(change);
    if repos.categories.get_by_id(user_id, category_id).await?.is_some() {
        return Err(FinanceOpsError::validation("category already exists"));
    }
    let name_key = name.trim().to_lowercase();
    if repos.categories.get_by_name(user_id, &name_key).await?.is_some() {
        return Err(FinanceOpsError::validation(
            "a category with this name already exists",
        ));
    }
    Ok(())
}

pub async fn simulate(_repos: &Repositories, _user_id: UserId, change: &ProposedChange) -> Result<Simulation> {
    let (category_id, name) = fields(change);
    let before = serde_json::Value::Null;
    let after = serde_json::json!({ "category_id": category_id, "name": name });
    let difference = diff_states(None, Some(&after));
    Ok(Simulation { before, after, difference })
}

pub async fn apply(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<ExecutionStep> {
    let (category_id, name) = fields(change);
    let mut category = Category::new(user_id, name, CategoryType::Want);
    category.id = category_id;
    repos.categories.create(&category).await?;
    Ok(ExecutionStep {
        step: "create_category".into(),
        success: true,
        data: Some(serde_json::json!({ "category_id": category_id, "name": name })),
        error: None,
    })
}

pub async fn rollback(repos: &Repositories, user_id: UserId, change: &ProposedChange) -> Result<()> {
    let (category_id, _) = fields(change);
    let referenced = repos
        .transactions
        .list_all_for_user(user_id)
        .await?
        .iter()
        .any(|tx| tx.category_id == Some(category_id));
    if referenced {
        return Err(FinanceOpsError::validation(
            "cannot roll back category_creation: transactions reference this category",
        ));
    }
    repos.categories.delete(user_id, category_id).await?;
    Ok(())
}
