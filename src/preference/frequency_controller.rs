//! FrequencyController — `should_show_suggestion` blocking-check chain.

use chrono::{Duration, Utc};

use crate::domain::{Result, SuggestionType, UserId};
use crate::storage::Repositories;

const WEIGHT_FLOOR: f64 = 0.1;

pub struct FrequencyController {
    repos: Repositories,
}

impl FrequencyController {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Composes the blocking checks in a fixed order: the first one that
    /// matches decides the outcome.
    pub async fn should_show_suggestion(
        &self,
        user_id: UserId,
        suggestion_type: SuggestionType,
    ) -> Result<bool> {
        let preference = self.repos.preferences.get_or_create(user_id).await?;
        if !preference.metadata.learning_enabled {
            return Ok(true);
        }

        let now = Utc::now();
        let quiet_hours = &preference.suggestion_preferences.global.quiet_hours;
        if quiet_hours.enabled && in_quiet_hours(quiet_hours, now) {
            return Ok(false);
        }

        if let Some(type_pref) = preference.suggestion_preferences.types.get(&suggestion_type) {
            if let Some(last_action) = type_pref.last_action {
                if type_pref.cooldown_days > 0
                    && now - last_action < Duration::days(type_pref.cooldown_days)
                {
                    return Ok(false);
                }
            }
            if type_pref.weight <= WEIGHT_FLOOR {
                return Ok(false);
            }
        }

        let global = &preference.suggestion_preferences.global;
        let daily_max = global.suggestion_frequency.daily_max();
        if global.daily_shown_on(now) >= daily_max {
            return Ok(false);
        }

        Ok(true)
    }
}

fn in_quiet_hours(quiet_hours: &crate::domain::QuietHours, now: chrono::DateTime<Utc>) -> bool {
    use chrono::Timelike;
    let hour = now.hour() as u8;
    if quiet_hours.start_hour <= quiet_hours.end_hour {
        hour >= quiet_hours.start_hour && hour < quiet_hours.end_hour
    } else {
        // Wraps past midnight, e.g. 22:00-07:00.
        hour >= quiet_hours.start_hour || hour < quiet_hours.end_hour
    }
}
