//! Ambient observability: structured logging init, correlation IDs, and a
//! health-check registry an outer HTTP adapter would expose.

pub mod config;
pub mod health;
pub mod tracing;

pub use config::{HealthConfig, LoggingConfig, MetricsConfig, ObservabilityConfig, TracingConfig};
pub use health::{ComponentHealth, HealthCheck, HealthChecker, HealthStatus};
pub use tracing::{init_tracing, CorrelationId, RequestId, TraceContext};
