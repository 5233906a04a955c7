//! finance-ops - personal finance analytics backend
//!
//! Detects financial signals (budget drift, goal underfunding, recurring
//! patterns, risk) from a user's transactions, budgets, goals and
//! subscriptions, and drives the suggestion lifecycle (propose -> approve
//! -> apply -> rollback) those signals feed into.

pub mod audit;
pub mod cli;
pub mod config;
pub mod dates;
pub mod domain;
pub mod engine;
pub mod llm;
pub mod metrics;
pub mod observability;
pub mod preference;
pub mod scheduler;
pub mod signals;
pub mod storage;
pub mod suggestion;
pub mod weekly;

// Re-export commonly used types
pub use domain::{FinanceOpsError, Result};

pub use audit::{AuditLogger, ExportFormat, ExportQuery, LogActionRequest, UserActivitySummary};

pub use config::Config;

pub use engine::{
    AggregationEngine, AggregationOptions, AggregationResult, BudgetDriftDetector,
    BudgetDriftResult, GoalUnderfundingDetector, GoalUnderfundingResult, PatternEngine,
    PatternEngineConfig, PatternResult, RiskEngine, RiskEngineConfig, RiskItem, RiskKind,
    RiskResult,
};

pub use llm::{LlmAdapter, LlmClient, LlmTransportError, RawLlmClient, StructuredResponse};

pub use metrics::{init_metrics, MetricsConfig};

pub use observability::{
    ComponentHealth, HealthCheck, HealthChecker, HealthConfig, HealthStatus, LoggingConfig,
    ObservabilityConfig, TracingConfig,
};
pub use observability::{init_tracing, CorrelationId, RequestId, TraceContext};

pub use preference::{
    spawn_adjuster_loop, DecisionInput, Evaluation, EvaluationContext, FeedbackProcessor,
    FrequencyController, RuleAction, RuleOutcome, RulesEngine, WeightAdjuster,
};

pub use scheduler::{DailySweepSummary, Scheduler, SchedulerSettings, WeeklyTickSummary};

pub use signals::{SignalStatusUpdate, SignalStore};

pub use storage::{MemoryStore, Repositories};

pub use suggestion::SuggestionLifecycle;

pub use weekly::{InsightFilter, MetricAggregator, ShiftDetector, SummaryGenerator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
