//! SavingsGoal entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{FinanceOpsError, Result};
use super::ids::{SavingsGoalId, TransactionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsGoalStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub transaction_id: Option<TransactionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSaveFrequency {
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSave {
    pub enabled: bool,
    pub amount: Decimal,
    pub frequency: AutoSaveFrequency,
    pub day_of_month: Option<u8>,
}

impl Default for AutoSave {
    fn default() -> Self {
        Self {
            enabled: false,
            amount: Decimal::ZERO,
            frequency: AutoSaveFrequency::Monthly,
            day_of_month: Some(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub amount: Decimal,
    pub achieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: SavingsGoalId,
    pub user_id: UserId,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub priority: u8,
    pub category: String,
    pub target_date: DateTime<Utc>,
    pub status: SavingsGoalStatus,
    pub contributions: Vec<Contribution>,
    pub auto_save: AutoSave,
    pub milestones: Vec<Milestone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavingsGoal {
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        target_amount: Decimal,
        category: impl Into<String>,
        target_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SavingsGoalId::new(),
            user_id,
            name: name.into(),
            target_amount,
            current_amount: Decimal::ZERO,
            priority: 3,
            category: category.into(),
            target_date,
            status: SavingsGoalStatus::Active,
            contributions: Vec::new(),
            auto_save: AutoSave::default(),
            milestones: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_auto_save(mut self, auto_save: AutoSave) -> Self {
        self.auto_save = auto_save;
        self
    }

    pub fn add_contribution(&mut self, contribution: Contribution) {
        self.current_amount += contribution.amount;
        self.contributions.push(contribution);
        self.updated_at = Utc::now();
        if self.current_amount >= self.target_amount
            && self.status == SavingsGoalStatus::Active
        {
            self.status = SavingsGoalStatus::Completed;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_amount <= Decimal::ZERO {
            return Err(FinanceOpsError::validation(
                "savings goal target_amount must be positive",
            ));
        }
        if self.current_amount < Decimal::ZERO {
            return Err(FinanceOpsError::validation(
                "savings goal current_amount must be non-negative",
            ));
        }
        if !(1..=5).contains(&self.priority) {
            return Err(FinanceOpsError::validation(
                "savings goal priority must be between 1 and 5",
            ));
        }
        let summed: Decimal = self.contributions.iter().map(|c| c.amount).sum();
        if summed != self.current_amount {
            return Err(FinanceOpsError::validation(
                "savings goal current_amount must equal the sum of contributions",
            ));
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.current_amount >= self.target_amount
    }

    pub fn last_contribution_at(&self) -> Option<DateTime<Utc>> {
        self.contributions.iter().map(|c| c.date).max()
    }
}
