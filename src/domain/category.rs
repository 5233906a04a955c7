//! Category entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{FinanceOpsError, Result};
use super::ids::{CategoryId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Need,
    Want,
    Saving,
    Fixed,
    Income,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: String,
    pub category_type: CategoryType,
    pub monthly_budget: Option<Decimal>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(user_id: UserId, name: impl Into<String>, category_type: CategoryType) -> Self {
        let now = Utc::now();
        Self {
            id: CategoryId::new(),
            user_id,
            name: name.into(),
            category_type,
            monthly_budget: None,
            is_system: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_monthly_budget(mut self, amount: Decimal) -> Self {
        self.monthly_budget = Some(amount);
        self
    }

    pub fn as_system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FinanceOpsError::validation("category name must not be empty"));
        }
        if let Some(budget) = self.monthly_budget {
            if budget < Decimal::ZERO {
                return Err(FinanceOpsError::validation(
                    "category monthly_budget must be non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Case-insensitive comparison used for the per-user uniqueness constraint.
    pub fn name_key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn can_delete(&self) -> bool {
        !self.is_system
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_key_normalizes_case_and_whitespace() {
        let c = Category::new(UserId::new(), "  Groceries ", CategoryType::Need);
        assert_eq!(c.name_key(), "groceries");
    }

    #[test]
    fn system_categories_cannot_be_deleted() {
        let c = Category::new(UserId::new(), "Income", CategoryType::Income).as_system();
        assert!(!c.can_delete());
    }

    #[test]
    fn rejects_empty_name() {
        let c = Category::new(UserId::new(), "   ", CategoryType::Want);
        assert!(c.validate().is_err());
    }
}
