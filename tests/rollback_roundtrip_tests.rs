//! Invariant 5 (rollback reversibility): for every `SuggestionType`,
//! `apply` followed by `rollback` restores the targeted entity's fields to
//! their pre-apply snapshot. Each test drives the typed transform pair
//! directly against an in-memory store rather than the full lifecycle, since
//! the property under test belongs to the transform layer.

use chrono::Utc;
use finance_ops::domain::{
    AutoSave, AutoSaveFrequency, Budget, BudgetPeriod, Category, CategoryType, ProposedChange,
    RecurrenceFrequency, SavingsGoal, Subscription, SubscriptionStatus, Transaction,
    TransactionStatus, TransactionType,
};
use finance_ops::storage::Repositories;
use finance_ops::suggestion::transform;
use rust_decimal_macros::dec;

async fn seed_category(repos: &Repositories, user_id: finance_ops::domain::UserId) -> finance_ops::domain::CategoryId {
    let category = Category::new(user_id, "Groceries", CategoryType::Need);
    repos.categories.create(&category).await.unwrap();
    category.id
}

#[tokio::test]
async fn budget_adjustment_round_trips() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let category_id = seed_category(&repos, user_id).await;
    let budget = Budget::new(user_id, category_id, "Groceries budget", dec!(300), BudgetPeriod::Monthly, Utc::now());
    let budget_id = budget.id;
    repos.budgets.create(&budget).await.unwrap();

    let change = ProposedChange::BudgetAdjustment {
        budget_id,
        category_id,
        old_amount: dec!(300),
        new_amount: dec!(400),
    };
    transform::apply(&repos, user_id, &change).await.unwrap();
    assert_eq!(repos.budgets.get_by_id(user_id, budget_id).await.unwrap().unwrap().amount, dec!(400));

    transform::rollback(&repos, user_id, &change).await.unwrap();
    assert_eq!(repos.budgets.get_by_id(user_id, budget_id).await.unwrap().unwrap().amount, dec!(300));
}

#[tokio::test]
async fn savings_increase_round_trips_amount_and_auto_save_flag() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let goal = SavingsGoal::new(user_id, "Emergency fund", dec!(10_000), "savings", Utc::now() + chrono::Duration::days(180));
    let goal_id = goal.id;
    repos.goals.create(&goal).await.unwrap();

    let change = ProposedChange::SavingsIncrease {
        goal_id,
        old_auto_save_amount: dec!(0),
        new_auto_save_amount: dec!(100),
        newly_enabled: true,
    };
    transform::apply(&repos, user_id, &change).await.unwrap();
    let after_apply = repos.goals.get_by_id(user_id, goal_id).await.unwrap().unwrap();
    assert_eq!(after_apply.auto_save.amount, dec!(100));
    assert!(after_apply.auto_save.enabled);

    transform::rollback(&repos, user_id, &change).await.unwrap();
    let after_rollback = repos.goals.get_by_id(user_id, goal_id).await.unwrap().unwrap();
    assert_eq!(after_rollback.auto_save.amount, dec!(0));
    assert!(!after_rollback.auto_save.enabled);
}

#[tokio::test]
async fn savings_increase_rollback_leaves_auto_save_enabled_when_it_was_not_newly_enabled() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let mut goal = SavingsGoal::new(user_id, "Emergency fund", dec!(10_000), "savings", Utc::now() + chrono::Duration::days(180));
    goal.auto_save = AutoSave {
        enabled: true,
        amount: dec!(50),
        frequency: AutoSaveFrequency::Monthly,
        day_of_month: Some(1),
    };
    let goal_id = goal.id;
    repos.goals.create(&goal).await.unwrap();

    let change = ProposedChange::SavingsIncrease {
        goal_id,
        old_auto_save_amount: dec!(50),
        new_auto_save_amount: dec!(100),
        newly_enabled: false,
    };
    transform::apply(&repos, user_id, &change).await.unwrap();
    transform::rollback(&repos, user_id, &change).await.unwrap();

    let after_rollback = repos.goals.get_by_id(user_id, goal_id).await.unwrap().unwrap();
    assert_eq!(after_rollback.auto_save.amount, dec!(50));
    assert!(after_rollback.auto_save.enabled, "auto-save was already on before apply; rollback must not disable it");
}

#[tokio::test]
async fn subscription_cancellation_round_trips_and_leaves_a_synthetic_marker() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let category_id = seed_category(&repos, user_id).await;
    let subscription = Subscription::new(
        user_id,
        category_id,
        "Streaming service",
        dec!(15),
        finance_ops::domain::Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            interval: 1,
            billing_date: Utc::now(),
            next_billing_date: Utc::now() + chrono::Duration::days(10),
            end_date: None,
        },
    );
    let subscription_id = subscription.id;
    repos.subscriptions.create(&subscription).await.unwrap();

    let change = ProposedChange::SubscriptionCancellation {
        subscription_id,
        monthly_savings: dec!(15),
    };
    transform::apply(&repos, user_id, &change).await.unwrap();
    assert_eq!(
        repos.subscriptions.get_by_id(user_id, subscription_id).await.unwrap().unwrap().status,
        SubscriptionStatus::Cancelled
    );

    transform::rollback(&repos, user_id, &change).await.unwrap();
    let restored = repos.subscriptions.get_by_id(user_id, subscription_id).await.unwrap().unwrap();
    assert_eq!(restored.status, SubscriptionStatus::Active);
    assert!(restored.auto_renew);

    let markers = repos.transactions.list_all_for_user(user_id).await.unwrap();
    assert!(
        markers.iter().any(|t| t.subscription_id == Some(subscription_id) && t.tags.contains(&"synthetic".to_string())),
        "rollback must append a synthetic marker transaction for the reactivation"
    );
}

#[tokio::test]
async fn category_creation_rolls_back_when_unreferenced() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let category_id = finance_ops::domain::CategoryId::new();

    let change = ProposedChange::CategoryCreation {
        category_id,
        name: "Hobbies".to_string(),
    };
    transform::apply(&repos, user_id, &change).await.unwrap();
    assert!(repos.categories.get_by_id(user_id, category_id).await.unwrap().is_some());

    transform::rollback(&repos, user_id, &change).await.unwrap();
    assert!(repos.categories.get_by_id(user_id, category_id).await.unwrap().is_none());
}

#[tokio::test]
async fn category_creation_rollback_is_refused_once_a_transaction_references_it() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let category_id = finance_ops::domain::CategoryId::new();

    let change = ProposedChange::CategoryCreation {
        category_id,
        name: "Hobbies".to_string(),
    };
    transform::apply(&repos, user_id, &change).await.unwrap();

    let tx = Transaction::new(user_id, dec!(20), TransactionType::Expense, "Board game", Utc::now())
        .with_category(category_id)
        .with_status(TransactionStatus::Completed);
    repos.transactions.create(&tx).await.unwrap();

    let result = transform::rollback(&repos, user_id, &change).await;
    assert!(result.is_err());
    assert!(repos.categories.get_by_id(user_id, category_id).await.unwrap().is_some());
}

#[tokio::test]
async fn budget_creation_round_trips() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let category_id = seed_category(&repos, user_id).await;
    let budget_id = finance_ops::domain::BudgetId::new();

    let change = ProposedChange::BudgetCreation {
        budget_id,
        category_id,
        amount: dec!(250),
    };
    transform::apply(&repos, user_id, &change).await.unwrap();
    assert!(repos.budgets.get_by_id(user_id, budget_id).await.unwrap().is_some());

    transform::rollback(&repos, user_id, &change).await.unwrap();
    assert!(repos.budgets.get_by_id(user_id, budget_id).await.unwrap().is_none());
}

#[tokio::test]
async fn goal_adjustment_round_trips() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let old_date = Utc::now() + chrono::Duration::days(180);
    let new_date = Utc::now() + chrono::Duration::days(365);
    let mut goal = SavingsGoal::new(user_id, "New car", dec!(5_000), "savings", old_date);
    goal.priority = 2;
    let goal_id = goal.id;
    repos.goals.create(&goal).await.unwrap();

    let change = ProposedChange::GoalAdjustment {
        goal_id,
        old_target_amount: dec!(5_000),
        new_target_amount: dec!(8_000),
        old_target_date: old_date,
        new_target_date: new_date,
        old_priority: 2,
        new_priority: 1,
    };
    transform::apply(&repos, user_id, &change).await.unwrap();
    let after_apply = repos.goals.get_by_id(user_id, goal_id).await.unwrap().unwrap();
    assert_eq!(after_apply.target_amount, dec!(8_000));
    assert_eq!(after_apply.priority, 1);

    transform::rollback(&repos, user_id, &change).await.unwrap();
    let after_rollback = repos.goals.get_by_id(user_id, goal_id).await.unwrap().unwrap();
    assert_eq!(after_rollback.target_amount, dec!(5_000));
    assert_eq!(after_rollback.priority, 2);
    assert_eq!(after_rollback.target_date, old_date);
}

#[tokio::test]
async fn transaction_categorization_round_trips() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();
    let old_category = seed_category(&repos, user_id).await;
    let new_category = {
        let category = Category::new(user_id, "Entertainment", CategoryType::Want);
        repos.categories.create(&category).await.unwrap();
        category.id
    };
    let tx = Transaction::new(user_id, dec!(30), TransactionType::Expense, "Movie night", Utc::now())
        .with_category(old_category)
        .with_status(TransactionStatus::Completed);
    let transaction_id = tx.id;
    repos.transactions.create(&tx).await.unwrap();

    let change = ProposedChange::TransactionCategorization {
        transaction_id,
        old_category_id: Some(old_category),
        new_category_id: new_category,
    };
    transform::apply(&repos, user_id, &change).await.unwrap();
    assert_eq!(
        repos.transactions.get_by_id(user_id, transaction_id).await.unwrap().unwrap().category_id,
        Some(new_category)
    );

    transform::rollback(&repos, user_id, &change).await.unwrap();
    assert_eq!(
        repos.transactions.get_by_id(user_id, transaction_id).await.unwrap().unwrap().category_id,
        Some(old_category)
    );
}
