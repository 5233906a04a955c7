//! Domain entities for the finance analysis and suggestion engine.
//!
//! Every entity here is a plain data type with a `new`/`validate` pair; the
//! behavior that mutates or derives from these types lives in `engine`,
//! `suggestion`, `preference`, and `weekly` instead.

pub mod audit_log;
pub mod budget;
pub mod category;
pub mod error;
pub mod feedback;
pub mod ids;
pub mod insight;
pub mod preference;
pub mod savings_goal;
pub mod signal;
pub mod subscription;
pub mod suggestion;
pub mod transaction;
pub mod weekly;

pub use audit_log::{
    ActionOutcome, Actor, ActorType, AuditAction, FieldChange, SuggestionLog,
};
pub use budget::{Budget, BudgetFlexibility, BudgetPeriod};
pub use category::{Category, CategoryType};
pub use error::{FinanceOpsError, Result};
pub use feedback::{
    FeedbackContext, FeedbackDecision, FeedbackOutcome, FeedbackReason, FeedbackReasons,
    Modifications, SuggestionFeedback,
};
pub use ids::{
    AuditLogId, BudgetId, CategoryId, FeedbackId, InsightId, SavingsGoalId, SignalId,
    SubscriptionId, SuggestionId, TransactionId, UserId,
};
pub use insight::{Insight, InsightKind, InsightStatus};
pub use preference::{
    CategoryPreference, GlobalPreference, ImpactPreferences, PreferenceMetadata, QuietHours,
    RiskTolerance, SuggestionFrequency, SuggestionPreferences, TimeOfDay, TimePreferences,
    TypePreference, UserPreference,
};
pub use savings_goal::{
    AutoSave, AutoSaveFrequency, Contribution, Milestone, SavingsGoal, SavingsGoalStatus,
};
pub use signal::{
    compute_signal_hash, FinancialSignal, SignalData, SignalPeriod, SignalStatus, SignalType,
    SignalValue,
};
pub use subscription::{BillingRecord, Recurrence, RecurrenceFrequency, Subscription, SubscriptionStatus};
pub use suggestion::{
    compute_priority, Approval, ApprovalMethod, ConflictResolution, EstimatedImpact, Execution,
    ExecutionStep, PendingSuggestion, Prerequisite, ProposedChange, Review, RiskLevel, Rollback,
    SuggestionConflict, SuggestionMetadata, SuggestionPriority, SuggestionStatus, SuggestionType,
};
pub use transaction::{Merchant, Transaction, TransactionStatus, TransactionType};
pub use weekly::{
    is_significant_shift, shift_tier, BudgetStatusEntry, CategoryBreakdownEntry, ShiftTier,
    SignificantShift, WeekdayWeekendSplit, WeeklyMetric, WeeklySummary,
};
