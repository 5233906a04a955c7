//! WeightAdjuster — periodic weight/frequency recompute over accumulated
//! feedback.
//!
//! Runs out-of-band from `FeedbackProcessor` (see `feedback_processor::spawn_adjuster_loop`),
//! so a slow recompute never blocks the user-facing decision call.

use chrono::{Duration, Utc};

use crate::domain::{Result, SuggestionFrequency, UserId};
use crate::engine::calculators;
use crate::storage::Repositories;

/// Interactions required before a type/category is eligible for readjustment.
const MIN_TYPE_INTERACTIONS: u32 = 5;
const MIN_CATEGORY_INTERACTIONS: u32 = 3;
const RECENT_ACTION_WINDOW_DAYS: i64 = 7;
const CATEGORY_VOLATILITY_THRESHOLD: f64 = 0.5;
const CATEGORY_VOLATILITY_PENALTY: f64 = 0.8;

pub struct WeightAdjuster {
    repos: Repositories,
}

impl WeightAdjuster {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn adjust_weights(&self, user_id: UserId) -> Result<()> {
        let mut preference = self.repos.preferences.get_or_create(user_id).await?;
        let now = Utc::now();

        for type_pref in preference.suggestion_preferences.types.values_mut() {
            let interactions = type_pref.interactions();
            if interactions < MIN_TYPE_INTERACTIONS {
                continue;
            }
            let recency = type_pref
                .last_action
                .map(|at| {
                    if now - at <= Duration::days(RECENT_ACTION_WINDOW_DAYS) {
                        1.0
                    } else {
                        0.5
                    }
                })
                .unwrap_or(0.5);
            let rate = type_pref.acceptance_rate();
            if rate > 0.7 {
                type_pref.apply_delta(0.2 * recency);
            } else if rate < 0.3 {
                type_pref.apply_delta(-0.3 * recency);
            }
        }

        let global = &mut preference.suggestion_preferences.global;
        let forced_low = global
            .last_active
            .map(|at| now - at > Duration::days(14))
            .unwrap_or(false);
        global.suggestion_frequency = if forced_low {
            SuggestionFrequency::Low
        } else if global.acceptance_rate > 0.6 {
            SuggestionFrequency::High
        } else if global.acceptance_rate > 0.3 {
            SuggestionFrequency::Medium
        } else {
            SuggestionFrequency::Low
        };

        for (category_id, category_pref) in preference.category_preferences.iter_mut() {
            if category_pref.interactions < MIN_CATEGORY_INTERACTIONS {
                continue;
            }
            // Weight already carries the feedback sign; here we reinforce it
            // the same way the type ladder reinforces acceptance
            // rate, using distance from the neutral baseline as the proxy
            // (a dedicated per-category accepted/rejected counter is not part
            // of the stored entity — documented open decision in DESIGN.md).
            if category_pref.weight > 1.3 {
                category_pref.weight = (category_pref.weight + 0.1).clamp(0.0, 2.0);
            } else if category_pref.weight < 0.7 {
                category_pref.weight = (category_pref.weight - 0.1).clamp(0.0, 2.0);
            }

            let window_start = now - Duration::days(90);
            let transactions = self
                .repos
                .transactions
                .list_in_range(user_id, Some(*category_id), window_start, now)
                .await?;
            if transactions.len() >= 2 {
                let amounts: Vec<f64> = transactions
                    .iter()
                    .map(|t| rust_decimal::prelude::ToPrimitive::to_f64(&t.amount).unwrap_or(0.0))
                    .collect();
                let volatility = calculators::coefficient_of_variation(&amounts);
                if volatility > CATEGORY_VOLATILITY_THRESHOLD {
                    category_pref.weight = (category_pref.weight * CATEGORY_VOLATILITY_PENALTY).clamp(0.0, 2.0);
                }
            }
        }

        self.repos.preferences.update(&preference).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SuggestionType;

    #[tokio::test]
    async fn below_threshold_interactions_are_untouched() {
        let repos = Repositories::in_memory();
        let user_id = UserId::new();
        let mut preference = repos.preferences.get_or_create(user_id).await.unwrap();
        let type_pref = preference.type_preference_mut(SuggestionType::BudgetAdjustment);
        type_pref.accepted_count = 2;
        type_pref.weight = 1.0;
        repos.preferences.update(&preference).await.unwrap();

        let adjuster = WeightAdjuster::new(repos.clone());
        adjuster.adjust_weights(user_id).await.unwrap();

        let after = repos.preferences.get_or_create(user_id).await.unwrap();
        let type_pref = after
            .suggestion_preferences
            .types
            .get(&SuggestionType::BudgetAdjustment)
            .unwrap();
        assert_eq!(type_pref.weight, 1.0);
    }

    #[tokio::test]
    async fn high_acceptance_raises_weight_after_threshold() {
        let repos = Repositories::in_memory();
        let user_id = UserId::new();
        let mut preference = repos.preferences.get_or_create(user_id).await.unwrap();
        let type_pref = preference.type_preference_mut(SuggestionType::BudgetAdjustment);
        type_pref.accepted_count = 9;
        type_pref.rejected_count = 1;
        type_pref.weight = 1.0;
        type_pref.last_action = Some(Utc::now());
        repos.preferences.update(&preference).await.unwrap();

        let adjuster = WeightAdjuster::new(repos.clone());
        adjuster.adjust_weights(user_id).await.unwrap();

        let after = repos.preferences.get_or_create(user_id).await.unwrap();
        let type_pref = after
            .suggestion_preferences
            .types
            .get(&SuggestionType::BudgetAdjustment)
            .unwrap();
        assert!(type_pref.weight > 1.0);
    }

    #[tokio::test]
    async fn stale_user_forces_low_frequency() {
        let repos = Repositories::in_memory();
        let user_id = UserId::new();
        let mut preference = repos.preferences.get_or_create(user_id).await.unwrap();
        preference.suggestion_preferences.global.last_active = Some(Utc::now() - Duration::days(30));
        preference.suggestion_preferences.global.suggestion_frequency = SuggestionFrequency::High;
        repos.preferences.update(&preference).await.unwrap();

        let adjuster = WeightAdjuster::new(repos.clone());
        adjuster.adjust_weights(user_id).await.unwrap();

        let after = repos.preferences.get_or_create(user_id).await.unwrap();
        assert_eq!(
            after.suggestion_preferences.global.suggestion_frequency,
            SuggestionFrequency::Low
        );
    }
}
