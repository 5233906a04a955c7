//! Analysis engines and the pure calculators/detectors they're built from.
//!
//! Engines are stateless, hold only repository handles and config, and
//! return signals rather than mutate anything.

pub mod aggregation;
pub mod calculators;
pub mod detectors;
pub mod pattern;
pub mod risk;

pub use aggregation::{AggregationEngine, AggregationOptions, AggregationResult};
pub use detectors::{BudgetDriftDetector, BudgetDriftResult, GoalUnderfundingDetector, GoalUnderfundingResult};
pub use pattern::{PatternEngine, PatternEngineConfig, PatternResult};
pub use risk::{RiskEngine, RiskEngineConfig, RiskItem, RiskKind, RiskResult};
