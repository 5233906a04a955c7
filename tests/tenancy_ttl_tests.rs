//! Cross-cutting invariants that only surface once two users (or an expired
//! record) are in play: ownership isolation and TTL exclusion from list
//! queries.

use chrono::Utc;
use finance_ops::domain::{
    signal::{SignalPeriod, SignalType, SignalValue},
    Budget, BudgetPeriod, Category, CategoryType, FinancialSignal, Transaction,
    TransactionStatus, TransactionType,
};
use finance_ops::storage::{Repositories, SignalQuery};
use rust_decimal_macros::dec;

fn period() -> SignalPeriod {
    let now = Utc::now();
    SignalPeriod {
        start_date: now - chrono::Duration::days(30),
        end_date: now,
        comparison_start: None,
        comparison_end: None,
    }
}

#[tokio::test]
async fn category_lookup_never_crosses_user_boundary() {
    let repos = Repositories::in_memory();
    let owner = finance_ops::domain::UserId::new();
    let stranger = finance_ops::domain::UserId::new();

    let category = Category::new(owner, "Groceries", CategoryType::Need);
    repos.categories.create(&category).await.unwrap();

    // A budget scoped to the owner resolves normally...
    let budget = Budget::new(
        owner,
        category.id,
        "Groceries budget",
        dec!(400),
        BudgetPeriod::Monthly,
        Utc::now(),
    );
    repos.budgets.create(&budget).await.unwrap();
    assert!(repos.budgets.get_by_id(owner, budget.id).await.unwrap().is_some());

    // ...but is invisible to a different user querying the same id. The
    // response must be indistinguishable from "not found".
    assert!(repos.budgets.get_by_id(stranger, budget.id).await.unwrap().is_none());
    assert!(repos
        .categories
        .get_by_id(stranger, category.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn transactions_are_scoped_per_user_in_range_queries() {
    let repos = Repositories::in_memory();
    let alice = finance_ops::domain::UserId::new();
    let bob = finance_ops::domain::UserId::new();
    let now = Utc::now();

    let mut tx_alice = Transaction::new(alice, dec!(50), TransactionType::Expense, "Coffee", now);
    tx_alice.status = TransactionStatus::Completed;
    repos.transactions.create(&tx_alice).await.unwrap();

    let mut tx_bob = Transaction::new(bob, dec!(9000), TransactionType::Expense, "Yacht", now);
    tx_bob.status = TransactionStatus::Completed;
    repos.transactions.create(&tx_bob).await.unwrap();

    let window_start = now - chrono::Duration::days(1);
    let alice_txs = repos
        .transactions
        .list_in_range(alice, None, window_start, now)
        .await
        .unwrap();
    assert_eq!(alice_txs.len(), 1);
    assert_eq!(alice_txs[0].id, tx_alice.id);

    let bob_txs = repos
        .transactions
        .list_in_range(bob, None, window_start, now)
        .await
        .unwrap();
    assert_eq!(bob_txs.len(), 1);
    assert_eq!(bob_txs[0].id, tx_bob.id);
}

#[tokio::test]
async fn expired_signal_is_never_returned_even_when_include_inactive_is_set() {
    let repos = Repositories::in_memory();
    let user_id = finance_ops::domain::UserId::new();

    let mut expired = FinancialSignal::new(
        user_id,
        SignalType::BudgetDrift,
        "stale drift",
        SignalValue::default(),
        period(),
        None,
        1,
    );
    expired.expires_at = Utc::now() - chrono::Duration::days(1);
    repos.signals.store_signal(&expired).await.unwrap();

    let mut fresh = FinancialSignal::new(
        user_id,
        SignalType::GrowthTrend,
        "fresh trend",
        SignalValue::default(),
        period(),
        None,
        2,
    );
    fresh.category = None;
    repos.signals.store_signal(&fresh).await.unwrap();

    let query = SignalQuery {
        include_inactive: true,
        ..Default::default()
    };
    let visible = repos.signals.get_user_signals(user_id, &query).await.unwrap();

    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, fresh.id);
}
