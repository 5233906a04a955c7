//! Integration coverage for `SuggestionLifecycle::create_suggestion` paths
//! that only show up once multiple suggestions interact: the in-place
//! update rule and category-overlap conflict detection.

use chrono::Utc;
use finance_ops::domain::{
    Budget, BudgetPeriod, Category, CategoryType, EstimatedImpact, ProposedChange,
    SuggestionStatus, UserId,
};
use finance_ops::storage::Repositories;
use finance_ops::SuggestionLifecycle;
use rust_decimal_macros::dec;

fn impact(amount: rust_decimal::Decimal, confidence: u8) -> EstimatedImpact {
    EstimatedImpact {
        amount: Some(amount),
        percentage: None,
        timeframe: "monthly".into(),
        confidence,
    }
}

async fn seed_budget(repos: &Repositories, user_id: UserId) -> (finance_ops::domain::CategoryId, finance_ops::domain::BudgetId) {
    let category = Category::new(user_id, "Groceries", CategoryType::Need);
    repos.categories.create(&category).await.unwrap();
    let budget = Budget::new(
        user_id,
        category.id,
        "Groceries budget",
        dec!(500),
        BudgetPeriod::Monthly,
        Utc::now(),
    );
    repos.budgets.create(&budget).await.unwrap();
    (category.id, budget.id)
}

#[tokio::test]
async fn repeat_suggestion_for_same_target_updates_in_place() {
    let repos = Repositories::in_memory();
    let lifecycle = SuggestionLifecycle::new(repos.clone());
    let user_id = UserId::new();
    let (category_id, budget_id) = seed_budget(&repos, user_id).await;

    let first_change = ProposedChange::BudgetAdjustment {
        budget_id,
        category_id,
        old_amount: dec!(500),
        new_amount: dec!(550),
    };
    let first = lifecycle
        .create_suggestion(
            user_id,
            None,
            "Raise groceries budget",
            "first pass",
            serde_json::json!({}),
            first_change,
            impact(dec!(50), 75),
        )
        .await
        .unwrap();

    let second_change = ProposedChange::BudgetAdjustment {
        budget_id,
        category_id,
        old_amount: dec!(500),
        new_amount: dec!(600),
    };
    let second = lifecycle
        .create_suggestion(
            user_id,
            None,
            "Raise groceries budget",
            "refreshed analysis",
            serde_json::json!({}),
            second_change,
            impact(dec!(100), 80),
        )
        .await
        .unwrap();

    // Same suggestion id, bumped version, fresh fields — not a second row.
    assert_eq!(first.id, second.id);
    assert_eq!(second.metadata.version, first.metadata.version + 1);
    assert_eq!(second.description, "refreshed analysis");

    let stored = repos
        .suggestions
        .get_by_id(user_id, first.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.metadata.version, second.metadata.version);

    let trail = repos
        .audit_log
        .get_suggestion_trail(first.id, 10)
        .await
        .unwrap();
    // created, then updated — no duplicate "created" event for the repeat call.
    assert_eq!(trail.len(), 2);
}

#[tokio::test]
async fn overlapping_category_suggestions_are_flagged_conflict() {
    let repos = Repositories::in_memory();
    let lifecycle = SuggestionLifecycle::new(repos.clone());
    let user_id = UserId::new();
    let (category_id, budget_id) = seed_budget(&repos, user_id).await;

    let first_change = ProposedChange::BudgetAdjustment {
        budget_id,
        category_id,
        old_amount: dec!(500),
        new_amount: dec!(550),
    };
    let first = lifecycle
        .create_suggestion(
            user_id,
            None,
            "Raise groceries budget",
            "desc",
            serde_json::json!({}),
            first_change,
            impact(dec!(50), 75),
        )
        .await
        .unwrap();
    assert_eq!(first.status, SuggestionStatus::Pending);

    // A different target entity, same category: must conflict with `first`
    // because both carry `proposed_changes.category_id() == category_id`.
    let new_category_suggestion = ProposedChange::CategoryCreation {
        category_id,
        name: "Groceries (split)".into(),
    };
    let second = lifecycle
        .create_suggestion(
            user_id,
            None,
            "Split groceries category",
            "desc",
            serde_json::json!({}),
            new_category_suggestion,
            impact(dec!(0), 60),
        )
        .await
        .unwrap();

    assert_eq!(second.status, SuggestionStatus::Conflict);
    assert_eq!(second.conflicts.len(), 1);
    assert_eq!(second.conflicts[0].with_suggestion_id, first.id);

    let trail = repos
        .audit_log
        .get_suggestion_trail(second.id, 10)
        .await
        .unwrap();
    assert!(trail
        .iter()
        .any(|e| e.action == finance_ops::domain::AuditAction::ConflictDetected));
}
