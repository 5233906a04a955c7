//! SuggestionFeedback entity — user decisions that drive preference learning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{FeedbackId, SuggestionId, UserId};
use super::suggestion::SuggestionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackDecision {
    Accepted,
    Rejected,
    Ignored,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackReason {
    NotRelevant,
    AmountWrong,
    TimingWrong,
    AlreadyHandled,
    TooRisky,
    DontUnderstand,
    PreferManualControl,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackContext {
    pub suggested_at: DateTime<Utc>,
    pub responded_at: DateTime<Utc>,
    pub response_time_ms: i64,
    pub viewed_duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackReasons {
    pub primary: Option<FeedbackReason>,
    pub secondary: Vec<FeedbackReason>,
    pub custom_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modifications {
    pub original: serde_json::Value,
    pub modified: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub applied: bool,
    pub successful: bool,
    pub rolled_back: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionFeedback {
    pub id: FeedbackId,
    pub user_id: UserId,
    pub suggestion_id: SuggestionId,
    pub suggestion_type: SuggestionType,
    pub decision: FeedbackDecision,
    pub context: FeedbackContext,
    pub reasons: FeedbackReasons,
    pub modifications: Option<Modifications>,
    pub outcome: FeedbackOutcome,
    pub created_at: DateTime<Utc>,
}

impl SuggestionFeedback {
    pub fn new(
        user_id: UserId,
        suggestion_id: SuggestionId,
        suggestion_type: SuggestionType,
        decision: FeedbackDecision,
        context: FeedbackContext,
    ) -> Self {
        Self {
            id: FeedbackId::new(),
            user_id,
            suggestion_id,
            suggestion_type,
            decision,
            context,
            reasons: FeedbackReasons::default(),
            modifications: None,
            outcome: FeedbackOutcome::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_reasons(mut self, reasons: FeedbackReasons) -> Self {
        self.reasons = reasons;
        self
    }
}
