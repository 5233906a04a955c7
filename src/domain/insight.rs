//! Insight entity — LLM-synthesized artifact referencing signals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{InsightId, SignalId, UserId};
use super::signal::SignalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    Generated,
    Actioned,
    Dismissed,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Warning,
    Opportunity,
    Info,
    Achievement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: InsightId,
    pub user_id: UserId,
    pub kind: InsightKind,
    pub signal_type: Option<SignalType>,
    pub source_signals: Vec<SignalId>,
    pub title: String,
    pub description: String,
    /// Confidence in [0, 100]; unlike signals, this reflects LLM-reported confidence.
    pub confidence: u8,
    pub impact_amount: Option<rust_decimal::Decimal>,
    pub impact_percentage: Option<f64>,
    pub action_items: Vec<String>,
    pub status: InsightStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Insight {
    pub fn new(
        user_id: UserId,
        kind: InsightKind,
        title: impl Into<String>,
        description: impl Into<String>,
        confidence: u8,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InsightId::new(),
            user_id,
            kind,
            signal_type: None,
            source_signals: Vec::new(),
            title: title.into(),
            description: description.into(),
            confidence: confidence.min(100),
            impact_amount: None,
            impact_percentage: None,
            action_items: Vec::new(),
            status: InsightStatus::Generated,
            created_at: now,
            expires_at: now + chrono::Duration::days(90),
        }
    }

    pub fn with_source_signals(mut self, signals: Vec<SignalId>) -> Self {
        self.source_signals = signals;
        self
    }

    pub fn with_impact(mut self, amount: rust_decimal::Decimal, percentage: f64) -> Self {
        self.impact_amount = Some(amount);
        self.impact_percentage = Some(percentage);
        self
    }

    pub fn with_action_items(mut self, items: Vec<String>) -> Self {
        self.action_items = items;
        self
    }

    /// Fallback insight used when the weekly summary LLM call fails.
    pub fn fallback_summary_incomplete(user_id: UserId) -> Self {
        Self::new(
            user_id,
            InsightKind::Warning,
            "Summary generation incomplete",
            "Weekly metrics were computed but narrative synthesis was unavailable.",
            100,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_insight_has_full_confidence() {
        let insight = Insight::fallback_summary_incomplete(UserId::new());
        assert_eq!(insight.confidence, 100);
        assert_eq!(insight.title, "Summary generation incomplete");
    }
}
