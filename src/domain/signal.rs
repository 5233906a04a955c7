//! FinancialSignal entity — deterministic, deduplicated, expirable findings.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ids::{CategoryId, SignalId, UserId};

pub const SIGNAL_TTL_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    CategoryAggregation,
    CategoryDelta,
    GrowthTrend,
    SpendingCluster,
    BudgetDrift,
    GoalUnderfunding,
    IncomeStability,
    ExpenseVolatility,
    RiskDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Active,
    Dismissed,
    Actioned,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalValue {
    pub current: Decimal,
    pub previous: Option<Decimal>,
    pub delta: Option<Decimal>,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub comparison_start: Option<DateTime<Utc>>,
    pub comparison_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalData {
    pub raw: serde_json::Value,
    pub aggregated: serde_json::Value,
    pub signal_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSignal {
    pub id: SignalId,
    pub user_id: UserId,
    pub signal_type: SignalType,
    pub name: String,
    pub value: SignalValue,
    /// Confidence in [0, 100]; always 100 for deterministically computed signals.
    pub confidence: u8,
    pub category: Option<CategoryId>,
    pub period: SignalPeriod,
    pub data: SignalData,
    /// 1 = highest priority.
    pub priority: u8,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub actioned_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl FinancialSignal {
    pub fn new(
        user_id: UserId,
        signal_type: SignalType,
        name: impl Into<String>,
        value: SignalValue,
        period: SignalPeriod,
        category: Option<CategoryId>,
        priority: u8,
    ) -> Self {
        let now = Utc::now();
        let signal_hash = compute_signal_hash(&user_id, signal_type, category, &period);
        Self {
            id: SignalId::new(),
            user_id,
            signal_type,
            name: name.into(),
            value,
            confidence: 100,
            category,
            period,
            data: SignalData {
                raw: serde_json::Value::Null,
                aggregated: serde_json::Value::Null,
                signal_hash,
            },
            priority: priority.clamp(1, 5),
            tags: Vec::new(),
            is_active: true,
            dismissed_at: None,
            actioned_at: None,
            expires_at: now + Duration::days(SIGNAL_TTL_DAYS),
            created_at: now,
        }
    }

    pub fn with_raw_data(mut self, raw: serde_json::Value) -> Self {
        self.data.raw = raw;
        self
    }

    pub fn with_aggregated_data(mut self, aggregated: serde_json::Value) -> Self {
        self.data.aggregated = aggregated;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn dismiss(&mut self) {
        self.is_active = false;
        self.dismissed_at = Some(Utc::now());
    }

    pub fn mark_actioned(&mut self) {
        self.is_active = false;
        self.actioned_at = Some(Utc::now());
    }
}

/// Stable hash over `(userId, type, category, periodStart, periodEnd)` used as the
/// deduplication key for active signals; deterministic across processes.
pub fn compute_signal_hash(
    user_id: &UserId,
    signal_type: SignalType,
    category: Option<CategoryId>,
    period: &SignalPeriod,
) -> String {
    let canonical = serde_json::json!({
        "userId": user_id.to_string(),
        "type": signal_type,
        "category": category.map(|c| c.to_string()),
        "periodStart": period.start_date.to_rfc3339(),
        "periodEnd": period.end_date.to_rfc3339(),
    });
    let bytes = serde_json::to_vec(&canonical).expect("canonical signal key is serializable");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period() -> SignalPeriod {
        let now = Utc::now();
        SignalPeriod {
            start_date: now - Duration::days(30),
            end_date: now,
            comparison_start: None,
            comparison_end: None,
        }
    }

    #[test]
    fn hash_is_deterministic_for_identical_inputs() {
        let user_id = UserId::new();
        let category = Some(CategoryId::new());
        let p = period();
        let h1 = compute_signal_hash(&user_id, SignalType::BudgetDrift, category, &p);
        let h2 = compute_signal_hash(&user_id, SignalType::BudgetDrift, category, &p);
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_differs_by_type() {
        let user_id = UserId::new();
        let category = Some(CategoryId::new());
        let p = period();
        let h1 = compute_signal_hash(&user_id, SignalType::BudgetDrift, category, &p);
        let h2 = compute_signal_hash(&user_id, SignalType::GoalUnderfunding, category, &p);
        assert_ne!(h1, h2);
    }

    #[test]
    fn priority_is_clamped_to_valid_range() {
        let s = FinancialSignal::new(
            UserId::new(),
            SignalType::RiskDetected,
            "test",
            SignalValue::default(),
            period(),
            None,
            0,
        );
        assert_eq!(s.priority, 1);
    }
}
