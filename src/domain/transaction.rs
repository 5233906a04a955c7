//! Transaction entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{FinanceOpsError, Result};
use super::ids::{CategoryId, SubscriptionId, TransactionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    pub name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub category_id: Option<CategoryId>,
    pub description: String,
    pub date: DateTime<Utc>,
    pub payment_method: Option<String>,
    pub status: TransactionStatus,
    pub is_recurring: bool,
    pub subscription_id: Option<SubscriptionId>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub merchant: Option<Merchant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        amount: Decimal,
        transaction_type: TransactionType,
        description: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            user_id,
            amount,
            transaction_type,
            category_id: None,
            description: description.into(),
            date,
            payment_method: None,
            status: TransactionStatus::Pending,
            is_recurring: false,
            subscription_id: None,
            tags: Vec::new(),
            notes: None,
            merchant: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn with_subscription(mut self, subscription_id: SubscriptionId) -> Self {
        self.subscription_id = Some(subscription_id);
        self.is_recurring = true;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_merchant(mut self, merchant: Merchant) -> Self {
        self.merchant = Some(merchant);
        self
    }

    /// Amount is always stored positive; sign is carried by `transaction_type`.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(FinanceOpsError::validation(
                "transaction amount must be positive",
            ));
        }

        if self.transaction_type != TransactionType::Transfer && self.category_id.is_none() {
            return Err(FinanceOpsError::validation(
                "category_id is required unless transaction_type is transfer",
            ));
        }

        if self.description.trim().is_empty() {
            return Err(FinanceOpsError::validation(
                "transaction description must not be empty",
            ));
        }

        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Signed amount, income positive and expense negative; transfers are zero-net.
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
            TransactionType::Transfer => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Transaction {
        Transaction::new(
            UserId::new(),
            dec!(42.50),
            TransactionType::Expense,
            "Groceries",
            Utc::now(),
        )
        .with_category(CategoryId::new())
    }

    #[test]
    fn rejects_non_positive_amount() {
        let mut tx = sample();
        tx.amount = Decimal::ZERO;
        assert!(tx.validate().is_err());
    }

    #[test]
    fn requires_category_unless_transfer() {
        let mut tx = sample();
        tx.category_id = None;
        assert!(tx.validate().is_err());

        tx.transaction_type = TransactionType::Transfer;
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn signed_amount_matches_type() {
        let tx = sample();
        assert_eq!(tx.signed_amount(), dec!(-42.50));
    }
}
