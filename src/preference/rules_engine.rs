//! RulesEngine — named predicate rules over a built `EvaluationContext`.
//!
//! Each rule is a pure function from context to an optional `RuleAction`,
//! and the engine folds the list into a single `should_show`/multiplier
//! decision rather than branching imperatively per rule.

use chrono::{DateTime, Utc};

use crate::domain::{CategoryId, EstimatedImpact, RiskLevel, SuggestionType, UserPreference};

const MULTIPLIER_FLOOR: f64 = 0.1;
const MULTIPLIER_CEILING: f64 = 2.0;

/// Snapshot of everything a rule might need, built once per evaluation so
/// individual rules stay pure and order-independent.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub suggestion_type: SuggestionType,
    pub category_id: Option<CategoryId>,
    pub estimated_impact: EstimatedImpact,
    pub risk_level: RiskLevel,
    pub now: DateTime<Utc>,
    pub type_accepted: u32,
    pub type_rejected: u32,
    pub type_last_action: Option<DateTime<Utc>>,
    pub category_volatility: f64,
    pub shown_today_for_type: u32,
    pub response_time_by_hour: [u32; 24],
}

impl EvaluationContext {
    pub fn build(preference: &UserPreference, suggestion_type: SuggestionType, now: DateTime<Utc>) -> Self {
        let type_pref = preference.suggestion_preferences.types.get(&suggestion_type);
        Self {
            suggestion_type,
            category_id: None,
            estimated_impact: EstimatedImpact {
                amount: None,
                percentage: None,
                timeframe: String::new(),
                confidence: 0,
            },
            risk_level: RiskLevel::Low,
            now,
            type_accepted: type_pref.map(|p| p.accepted_count).unwrap_or(0),
            type_rejected: type_pref.map(|p| p.rejected_count).unwrap_or(0),
            type_last_action: type_pref.and_then(|p| p.last_action),
            category_volatility: 0.0,
            shown_today_for_type: 0,
            response_time_by_hour: preference.time_preferences.response_time_by_hour,
        }
    }

    fn interactions(&self) -> u32 {
        self.type_accepted + self.type_rejected
    }

    fn rejection_rate(&self) -> f64 {
        let total = self.interactions();
        if total == 0 {
            0.0
        } else {
            self.type_rejected as f64 / total as f64
        }
    }

    fn acceptance_rate(&self) -> f64 {
        let total = self.interactions();
        if total == 0 {
            0.0
        } else {
            self.type_accepted as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    FilterLowImpact,
    FilterHighRisk,
    PauseType,
    Boost,
}

#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule: &'static str,
    pub action: RuleAction,
    pub factor: f64,
}

type RuleFn = fn(&EvaluationContext) -> Option<RuleOutcome>;

const RULES: &[RuleFn] = &[
    repeated_rejection,
    high_acceptance,
    low_engagement,
    category_saturation,
    time_pattern,
    impact_threshold,
    risk_tolerance,
    type_fatigue,
];

pub struct RulesEngine;

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub should_show: bool,
    pub weight_multiplier: f64,
    pub matched: Vec<RuleOutcome>,
}

impl RulesEngine {
    pub fn evaluate_suggestion(context: &EvaluationContext) -> Evaluation {
        let matched: Vec<RuleOutcome> = RULES.iter().filter_map(|rule| rule(context)).collect();

        let blocked = matched
            .iter()
            .any(|outcome| matches!(outcome.action, RuleAction::FilterLowImpact | RuleAction::FilterHighRisk | RuleAction::PauseType));

        let weight_multiplier = matched
            .iter()
            .fold(1.0_f64, |acc, outcome| acc * outcome.factor)
            .clamp(MULTIPLIER_FLOOR, MULTIPLIER_CEILING);

        Evaluation {
            should_show: !blocked,
            weight_multiplier,
            matched,
        }
    }
}

/// ≥5 interactions with a rejection rate over 70% pauses the type outright.
fn repeated_rejection(ctx: &EvaluationContext) -> Option<RuleOutcome> {
    if ctx.interactions() >= 5 && ctx.rejection_rate() > 0.7 {
        Some(RuleOutcome {
            rule: "repeated-rejection",
            action: RuleAction::PauseType,
            factor: 0.0,
        })
    } else {
        None
    }
}

/// ≥5 interactions with an acceptance rate over 80% boosts future ranking.
fn high_acceptance(ctx: &EvaluationContext) -> Option<RuleOutcome> {
    if ctx.interactions() >= 5 && ctx.acceptance_rate() > 0.8 {
        Some(RuleOutcome {
            rule: "high-acceptance",
            action: RuleAction::Boost,
            factor: 1.3,
        })
    } else {
        None
    }
}

/// No interaction at all in the last 60 days dampens, but does not block.
fn low_engagement(ctx: &EvaluationContext) -> Option<RuleOutcome> {
    match ctx.type_last_action {
        Some(last) if ctx.now - last > chrono::Duration::days(60) => Some(RuleOutcome {
            rule: "low-engagement",
            action: RuleAction::Boost,
            factor: 0.7,
        }),
        None if ctx.interactions() == 0 => None,
        _ => None,
    }
}

/// A volatile category (routine spend that swings wildly) is a weaker signal
/// for a budget-style suggestion; dampen rather than suppress.
fn category_saturation(ctx: &EvaluationContext) -> Option<RuleOutcome> {
    if ctx.category_id.is_some() && ctx.category_volatility > 0.5 {
        Some(RuleOutcome {
            rule: "category-saturation",
            action: RuleAction::Boost,
            factor: 0.8,
        })
    } else {
        None
    }
}

/// Hour-of-day response history below a floor is treated as "never engages
/// in this window" and dampens a touch rather than blocking entirely.
fn time_pattern(ctx: &EvaluationContext) -> Option<RuleOutcome> {
    use chrono::Timelike;
    let hour = ctx.now.hour() as usize;
    let total: u32 = ctx.response_time_by_hour.iter().sum();
    if total >= 10 && ctx.response_time_by_hour[hour] == 0 {
        Some(RuleOutcome {
            rule: "time-pattern",
            action: RuleAction::Boost,
            factor: 0.85,
        })
    } else {
        None
    }
}

/// Below-$10 impact is filtered outright, mirroring the weekly insight
/// filter's own impact floor.
fn impact_threshold(ctx: &EvaluationContext) -> Option<RuleOutcome> {
    let below_floor = ctx
        .estimated_impact
        .amount
        .map(|amount| amount.abs() < rust_decimal::Decimal::from(10))
        .unwrap_or(false);
    if below_floor {
        Some(RuleOutcome {
            rule: "impact-threshold",
            action: RuleAction::FilterLowImpact,
            factor: 0.0,
        })
    } else {
        None
    }
}

/// High-risk suggestions under a rejection-heavy history are filtered.
fn risk_tolerance(ctx: &EvaluationContext) -> Option<RuleOutcome> {
    if ctx.risk_level == RiskLevel::High && ctx.interactions() >= 3 && ctx.rejection_rate() > 0.5 {
        Some(RuleOutcome {
            rule: "risk-tolerance",
            action: RuleAction::FilterHighRisk,
            factor: 0.0,
        })
    } else {
        None
    }
}

/// Shown 3+ times today already for this exact type — don't pile on more.
fn type_fatigue(ctx: &EvaluationContext) -> Option<RuleOutcome> {
    if ctx.shown_today_for_type >= 3 {
        Some(RuleOutcome {
            rule: "type-fatigue",
            action: RuleAction::Boost,
            factor: 0.6,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_context() -> EvaluationContext {
        EvaluationContext {
            suggestion_type: SuggestionType::BudgetAdjustment,
            category_id: None,
            estimated_impact: EstimatedImpact {
                amount: Some(rust_decimal::Decimal::from(200)),
                percentage: Some(10.0),
                timeframe: "monthly".into(),
                confidence: 80,
            },
            risk_level: RiskLevel::Low,
            now: Utc::now(),
            type_accepted: 0,
            type_rejected: 0,
            type_last_action: None,
            category_volatility: 0.0,
            shown_today_for_type: 0,
            response_time_by_hour: [0; 24],
        }
    }

    #[test]
    fn repeated_rejection_pauses_the_type() {
        let mut ctx = base_context();
        ctx.type_accepted = 1;
        ctx.type_rejected = 5;
        let eval = RulesEngine::evaluate_suggestion(&ctx);
        assert!(!eval.should_show);
    }

    #[test]
    fn clean_history_allows_and_keeps_neutral_multiplier() {
        let ctx = base_context();
        let eval = RulesEngine::evaluate_suggestion(&ctx);
        assert!(eval.should_show);
        assert!((eval.weight_multiplier - 1.0).abs() < 1e-9);
    }

    #[test]
    fn high_acceptance_boosts_multiplier() {
        let mut ctx = base_context();
        ctx.type_accepted = 9;
        ctx.type_rejected = 1;
        let eval = RulesEngine::evaluate_suggestion(&ctx);
        assert!(eval.should_show);
        assert!(eval.weight_multiplier > 1.0);
    }

    #[test]
    fn low_impact_is_filtered() {
        let mut ctx = base_context();
        ctx.estimated_impact.amount = Some(rust_decimal::Decimal::from(5));
        let eval = RulesEngine::evaluate_suggestion(&ctx);
        assert!(!eval.should_show);
    }

    #[test]
    fn high_risk_with_rejection_history_is_filtered() {
        let mut ctx = base_context();
        ctx.risk_level = RiskLevel::High;
        ctx.type_accepted = 1;
        ctx.type_rejected = 3;
        let eval = RulesEngine::evaluate_suggestion(&ctx);
        assert!(!eval.should_show);
    }

    #[test]
    fn multiplier_stays_within_bounds() {
        let mut ctx = base_context();
        ctx.type_accepted = 9;
        ctx.type_rejected = 1;
        ctx.category_id = Some(CategoryId::new());
        ctx.category_volatility = 0.9;
        ctx.shown_today_for_type = 4;
        let eval = RulesEngine::evaluate_suggestion(&ctx);
        assert!(eval.weight_multiplier >= 0.1 && eval.weight_multiplier <= 2.0);
    }
}
