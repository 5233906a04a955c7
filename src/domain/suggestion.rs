//! PendingSuggestion entity and the typed payloads that drive the lifecycle state machine.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{
    BudgetId, CategoryId, InsightId, SavingsGoalId, SubscriptionId, SuggestionId, TransactionId,
    UserId,
};

pub const SUGGESTION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Applied,
    Failed,
    RolledBack,
    Cancelled,
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    BudgetAdjustment,
    SavingsIncrease,
    SubscriptionCancellation,
    CategoryCreation,
    BudgetCreation,
    GoalAdjustment,
    TransactionCategorization,
}

impl SuggestionType {
    /// Suggestions that always require explicit user confirmation regardless of impact/confidence.
    pub fn is_high_risk(&self) -> bool {
        matches!(
            self,
            SuggestionType::SubscriptionCancellation | SuggestionType::GoalAdjustment
        )
    }

    /// Cooldown, in days, between a prior suggestion of this type reaching a terminal
    /// decision (applied/rejected) and the next suggestion of the same type being approvable.
    pub fn cooldown_days(&self) -> i64 {
        match self {
            SuggestionType::BudgetAdjustment => 7,
            SuggestionType::SavingsIncrease => 14,
            SuggestionType::SubscriptionCancellation => 30,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Typed, closed payload carried by `proposedChanges` — narrowed per suggestion type
/// rather than a dynamically-typed "any" field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposedChange {
    BudgetAdjustment {
        budget_id: BudgetId,
        category_id: CategoryId,
        old_amount: Decimal,
        new_amount: Decimal,
    },
    SavingsIncrease {
        goal_id: SavingsGoalId,
        old_auto_save_amount: Decimal,
        new_auto_save_amount: Decimal,
        newly_enabled: bool,
    },
    SubscriptionCancellation {
        subscription_id: SubscriptionId,
        monthly_savings: Decimal,
    },
    CategoryCreation {
        category_id: CategoryId,
        name: String,
    },
    BudgetCreation {
        budget_id: BudgetId,
        category_id: CategoryId,
        amount: Decimal,
    },
    GoalAdjustment {
        goal_id: SavingsGoalId,
        old_target_amount: Decimal,
        new_target_amount: Decimal,
        old_target_date: DateTime<Utc>,
        new_target_date: DateTime<Utc>,
        old_priority: u8,
        new_priority: u8,
    },
    TransactionCategorization {
        transaction_id: TransactionId,
        old_category_id: Option<CategoryId>,
        new_category_id: CategoryId,
    },
}

impl ProposedChange {
    /// The entity this change targets, used for the "same (userId, type, targetId)"
    /// in-place update rule in suggestion creation.
    pub fn target_id(&self) -> String {
        match self {
            ProposedChange::BudgetAdjustment { budget_id, .. } => budget_id.to_string(),
            ProposedChange::SavingsIncrease { goal_id, .. } => goal_id.to_string(),
            ProposedChange::SubscriptionCancellation { subscription_id, .. } => {
                subscription_id.to_string()
            }
            ProposedChange::CategoryCreation { category_id, .. } => category_id.to_string(),
            ProposedChange::BudgetCreation { budget_id, .. } => budget_id.to_string(),
            ProposedChange::GoalAdjustment { goal_id, .. } => goal_id.to_string(),
            ProposedChange::TransactionCategorization { transaction_id, .. } => {
                transaction_id.to_string()
            }
        }
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        match self {
            ProposedChange::BudgetAdjustment { category_id, .. } => Some(*category_id),
            ProposedChange::BudgetCreation { category_id, .. } => Some(*category_id),
            ProposedChange::CategoryCreation { category_id, .. } => Some(*category_id),
            ProposedChange::TransactionCategorization { new_category_id, .. } => {
                Some(*new_category_id)
            }
            _ => None,
        }
    }

    pub fn suggestion_type(&self) -> SuggestionType {
        match self {
            ProposedChange::BudgetAdjustment { .. } => SuggestionType::BudgetAdjustment,
            ProposedChange::SavingsIncrease { .. } => SuggestionType::SavingsIncrease,
            ProposedChange::SubscriptionCancellation { .. } => {
                SuggestionType::SubscriptionCancellation
            }
            ProposedChange::CategoryCreation { .. } => SuggestionType::CategoryCreation,
            ProposedChange::BudgetCreation { .. } => SuggestionType::BudgetCreation,
            ProposedChange::GoalAdjustment { .. } => SuggestionType::GoalAdjustment,
            ProposedChange::TransactionCategorization { .. } => {
                SuggestionType::TransactionCategorization
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedImpact {
    pub amount: Option<Decimal>,
    pub percentage: Option<f64>,
    pub timeframe: String,
    pub confidence: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prerequisite {
    pub prerequisite_type: String,
    pub satisfied: bool,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    Unresolved,
    KeepFirst,
    KeepSecond,
    Merged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionConflict {
    pub with_suggestion_id: SuggestionId,
    pub conflict_type: String,
    pub resolution: ConflictResolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMethod {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub at: DateTime<Utc>,
    pub by: UserId,
    pub method: ApprovalMethod,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step: String,
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Execution {
    pub at: Option<DateTime<Utc>>,
    pub by: Option<UserId>,
    pub results: Vec<ExecutionStep>,
    pub transaction_ids: Vec<TransactionId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rollback {
    pub at: Option<DateTime<Utc>>,
    pub by: Option<UserId>,
    pub reason: Option<String>,
    pub original_state: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    pub viewed_at: Option<DateTime<Utc>>,
    pub viewed_count: u32,
    pub user_rating: Option<u8>,
    pub user_feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionMetadata {
    pub priority: SuggestionPriority,
    pub risk_level: RiskLevel,
    pub expires_at: DateTime<Utc>,
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSuggestion {
    pub id: SuggestionId,
    pub user_id: UserId,
    pub insight_id: Option<InsightId>,
    pub suggestion_type: SuggestionType,
    pub title: String,
    pub description: String,
    pub current_state: serde_json::Value,
    pub proposed_changes: ProposedChange,
    pub estimated_impact: EstimatedImpact,
    pub prerequisites: Vec<Prerequisite>,
    pub conflicts: Vec<SuggestionConflict>,
    pub status: SuggestionStatus,
    pub approval: Option<Approval>,
    pub execution: Execution,
    pub rollback: Rollback,
    pub review: Review,
    pub metadata: SuggestionMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingSuggestion {
    pub fn new(
        user_id: UserId,
        title: impl Into<String>,
        description: impl Into<String>,
        current_state: serde_json::Value,
        proposed_changes: ProposedChange,
        estimated_impact: EstimatedImpact,
    ) -> Self {
        let now = Utc::now();
        let suggestion_type = proposed_changes.suggestion_type();
        Self {
            id: SuggestionId::new(),
            user_id,
            insight_id: None,
            suggestion_type,
            title: title.into(),
            description: description.into(),
            current_state,
            proposed_changes,
            estimated_impact,
            prerequisites: Vec::new(),
            conflicts: Vec::new(),
            status: SuggestionStatus::Pending,
            approval: None,
            execution: Execution::default(),
            rollback: Rollback::default(),
            review: Review::default(),
            metadata: SuggestionMetadata {
                priority: SuggestionPriority::Low,
                risk_level: RiskLevel::Low,
                expires_at: now + Duration::days(SUGGESTION_TTL_DAYS),
                version: 1,
            },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.metadata.expires_at < now
    }

    pub fn all_prerequisites_satisfied(&self) -> bool {
        self.prerequisites.iter().all(|p| p.satisfied)
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicts
            .iter()
            .any(|c| c.resolution == ConflictResolution::Unresolved)
    }
}

/// Priority from impact amount × confidence, per the creation algorithm.
pub fn compute_priority(impact_amount: Decimal, confidence: u8) -> SuggestionPriority {
    let amount = impact_amount.abs();
    let confidence = confidence as f64;
    if amount > Decimal::from(1000) && confidence > 80.0 {
        SuggestionPriority::Critical
    } else if amount > Decimal::from(500) && confidence > 70.0 {
        SuggestionPriority::High
    } else if amount > Decimal::from(100) && confidence > 60.0 {
        SuggestionPriority::Medium
    } else {
        SuggestionPriority::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn priority_thresholds_match_spec() {
        assert_eq!(compute_priority(dec!(1500), 85), SuggestionPriority::Critical);
        assert_eq!(compute_priority(dec!(600), 75), SuggestionPriority::High);
        assert_eq!(compute_priority(dec!(150), 65), SuggestionPriority::Medium);
        assert_eq!(compute_priority(dec!(10), 90), SuggestionPriority::Low);
    }

    #[test]
    fn cooldown_matches_spec_table() {
        assert_eq!(SuggestionType::BudgetAdjustment.cooldown_days(), 7);
        assert_eq!(SuggestionType::SavingsIncrease.cooldown_days(), 14);
        assert_eq!(SuggestionType::SubscriptionCancellation.cooldown_days(), 30);
        assert_eq!(SuggestionType::CategoryCreation.cooldown_days(), 0);
    }

    #[test]
    fn high_risk_types_require_confirmation() {
        assert!(SuggestionType::SubscriptionCancellation.is_high_risk());
        assert!(SuggestionType::GoalAdjustment.is_high_risk());
        assert!(!SuggestionType::BudgetAdjustment.is_high_risk());
    }
}
