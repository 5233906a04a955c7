//! Subscription entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{FinanceOpsError, Result};
use super::ids::{CategoryId, SubscriptionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Cancelled,
    Expired,
    Trial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,
    pub interval: u32,
    pub billing_date: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    pub date: DateTime<Utc>,
    pub amount: Decimal,
    pub successful: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub name: String,
    pub amount: Decimal,
    pub recurrence: Recurrence,
    pub status: SubscriptionStatus,
    pub auto_renew: bool,
    pub billing_history: Vec<BillingRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        user_id: UserId,
        category_id: CategoryId,
        name: impl Into<String>,
        amount: Decimal,
        recurrence: Recurrence,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            category_id,
            name: name.into(),
            amount,
            recurrence,
            status: SubscriptionStatus::Active,
            auto_renew: true,
            billing_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_auto_renew(mut self, auto_renew: bool) -> Self {
        self.auto_renew = auto_renew;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(FinanceOpsError::validation(
                "subscription amount must be positive",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(FinanceOpsError::validation(
                "subscription name must not be empty",
            ));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    pub fn cancel(&mut self) {
        self.status = SubscriptionStatus::Cancelled;
        self.auto_renew = false;
        self.updated_at = Utc::now();
    }

    pub fn reactivate(&mut self) {
        self.status = SubscriptionStatus::Active;
        self.updated_at = Utc::now();
    }

    pub fn bills_within(&self, until: DateTime<Utc>) -> bool {
        self.is_active() && self.recurrence.next_billing_date <= until
    }
}
