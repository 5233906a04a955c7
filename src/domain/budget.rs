//! Budget entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{FinanceOpsError, Result};
use super::ids::{BudgetId, CategoryId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetFlexibility {
    Strict,
    Flexible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub name: String,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub flexibility: BudgetFlexibility,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub alert_threshold: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(
        user_id: UserId,
        category_id: CategoryId,
        name: impl Into<String>,
        amount: Decimal,
        period: BudgetPeriod,
        start_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BudgetId::new(),
            user_id,
            category_id,
            name: name.into(),
            amount,
            period,
            flexibility: BudgetFlexibility::Flexible,
            start_date,
            end_date: None,
            is_active: true,
            alert_threshold: 0.8,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_flexibility(mut self, flexibility: BudgetFlexibility) -> Self {
        self.flexibility = flexibility;
        self
    }

    pub fn with_alert_threshold(mut self, threshold: f64) -> Self {
        self.alert_threshold = threshold;
        self
    }

    pub fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount < Decimal::ZERO {
            return Err(FinanceOpsError::validation("budget amount must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.alert_threshold) {
            return Err(FinanceOpsError::validation(
                "budget alert_threshold must be between 0 and 1",
            ));
        }
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                return Err(FinanceOpsError::validation(
                    "budget end_date must be after start_date",
                ));
            }
        }
        Ok(())
    }
}
