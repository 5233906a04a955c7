//! Preference & learning engine (C8): feedback ingestion, weight adjustment,
//! frequency gating, and rule-based suggestion filtering.

mod feedback_processor;
mod frequency_controller;
mod rules_engine;
mod weight_adjuster;

pub use feedback_processor::{spawn_adjuster_loop, DecisionInput, FeedbackProcessor};
pub use frequency_controller::FrequencyController;
pub use rules_engine::{Evaluation, EvaluationContext, RuleAction, RuleOutcome, RulesEngine};
pub use weight_adjuster::WeightAdjuster;
