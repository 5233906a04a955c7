//! UserPreference entity — per-user learning state consumed by the frequency gate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ids::{CategoryId, UserId};
use super::suggestion::SuggestionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionFrequency {
    Low,
    Medium,
    High,
    Adaptive,
}

impl SuggestionFrequency {
    /// Daily suggestion cap per the frequency ladder.
    pub fn daily_max(&self) -> u32 {
        match self {
            SuggestionFrequency::Low => 2,
            SuggestionFrequency::Medium => 5,
            SuggestionFrequency::High => 10,
            SuggestionFrequency::Adaptive => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypePreference {
    pub weight: f64,
    pub accepted_count: u32,
    pub rejected_count: u32,
    pub last_shown: Option<DateTime<Utc>>,
    pub last_action: Option<DateTime<Utc>>,
    pub cooldown_days: i64,
}

impl Default for TypePreference {
    fn default() -> Self {
        Self {
            weight: 1.0,
            accepted_count: 0,
            rejected_count: 0,
            last_shown: None,
            last_action: None,
            cooldown_days: 0,
        }
    }
}

impl TypePreference {
    pub fn interactions(&self) -> u32 {
        self.accepted_count + self.rejected_count
    }

    pub fn acceptance_rate(&self) -> f64 {
        let total = self.interactions();
        if total == 0 {
            0.0
        } else {
            self.accepted_count as f64 / total as f64
        }
    }

    /// Adjusts the weight by the feedback delta, clamped to [0, 2] (invariant I-6).
    pub fn apply_delta(&mut self, delta: f64) {
        self.weight = (self.weight + delta).clamp(0.0, 2.0);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    pub start_hour: u8,
    pub end_hour: u8,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: 22,
            end_hour: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalPreference {
    pub total_shown: u32,
    pub total_accepted: u32,
    pub total_rejected: u32,
    pub acceptance_rate: f64,
    pub suggestion_frequency: SuggestionFrequency,
    pub quiet_hours: QuietHours,
    /// Suggestions shown today, reset when `daily_shown_date` rolls over.
    pub daily_shown: u32,
    pub daily_shown_date: Option<DateTime<Utc>>,
    pub last_active: Option<DateTime<Utc>>,
}

impl Default for GlobalPreference {
    fn default() -> Self {
        Self {
            total_shown: 0,
            total_accepted: 0,
            total_rejected: 0,
            acceptance_rate: 0.0,
            suggestion_frequency: SuggestionFrequency::Medium,
            quiet_hours: QuietHours::default(),
            daily_shown: 0,
            daily_shown_date: None,
            last_active: None,
        }
    }
}

impl GlobalPreference {
    /// Shown-today count, rolling over to zero once `daily_shown_date` is a
    /// different calendar day from `now`.
    pub fn daily_shown_on(&self, now: DateTime<Utc>) -> u32 {
        match self.daily_shown_date {
            Some(date) if date.date_naive() == now.date_naive() => self.daily_shown,
            _ => 0,
        }
    }

    pub fn record_shown(&mut self, now: DateTime<Utc>) {
        if self.daily_shown_on(now) == 0 {
            self.daily_shown_date = Some(now);
            self.daily_shown = 1;
        } else {
            self.daily_shown += 1;
        }
        self.total_shown += 1;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionPreferences {
    pub types: HashMap<SuggestionType, TypePreference>,
    pub global: GlobalPreference,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPreference {
    pub weight: f64,
    pub interactions: u32,
    pub price_sensitivity: f64,
    pub change_tolerance: f64,
    pub feedback: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn from_hour(hour: u8) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePreferences {
    pub best_time_to_suggest: Option<TimeOfDay>,
    pub adaptive: bool,
    pub response_time_by_hour: [u32; 24],
}

impl Default for TimePreferences {
    fn default() -> Self {
        Self {
            best_time_to_suggest: None,
            adaptive: true,
            response_time_by_hour: [0; 24],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactPreferences {
    pub min_savings_amount: Decimal,
    pub max_risk_tolerance: RiskTolerance,
}

impl Default for ImpactPreferences {
    fn default() -> Self {
        Self {
            min_savings_amount: Decimal::ZERO,
            max_risk_tolerance: RiskTolerance::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceMetadata {
    pub learning_enabled: bool,
    pub version: u32,
}

impl Default for PreferenceMetadata {
    fn default() -> Self {
        Self {
            learning_enabled: true,
            version: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: UserId,
    pub suggestion_preferences: SuggestionPreferences,
    pub category_preferences: HashMap<CategoryId, CategoryPreference>,
    pub time_preferences: TimePreferences,
    pub impact_preferences: ImpactPreferences,
    pub metadata: PreferenceMetadata,
}

impl UserPreference {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn type_preference_mut(&mut self, suggestion_type: SuggestionType) -> &mut TypePreference {
        self.suggestion_preferences
            .types
            .entry(suggestion_type)
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_clamps_to_bounds() {
        let mut pref = TypePreference::default();
        pref.weight = 1.95;
        pref.apply_delta(0.5);
        assert_eq!(pref.weight, 2.0);

        pref.weight = 0.05;
        pref.apply_delta(-0.5);
        assert_eq!(pref.weight, 0.0);
    }

    #[test]
    fn daily_max_matches_frequency_ladder() {
        assert_eq!(SuggestionFrequency::Low.daily_max(), 2);
        assert_eq!(SuggestionFrequency::Medium.daily_max(), 5);
        assert_eq!(SuggestionFrequency::High.daily_max(), 10);
        assert_eq!(SuggestionFrequency::Adaptive.daily_max(), 5);
    }

    #[test]
    fn time_of_day_buckets_match_spec() {
        assert_eq!(TimeOfDay::from_hour(8), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(14), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(2), TimeOfDay::Evening);
    }
}
