//! Domain error taxonomy for the finance analysis and suggestion engine.

use thiserror::Error;

/// Top-level error type returned by every domain, engine, and service operation.
#[derive(Debug, Error)]
pub enum FinanceOpsError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid state transition: {from} -> {to} for {entity} {id}")]
    StateMachine {
        entity: &'static str,
        id: String,
        from: String,
        to: String,
    },

    #[error("concurrent modification of {entity} {id}")]
    Concurrency { entity: &'static str, id: String },

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("LLM response failed validation: {0}")]
    LlmValidation(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl FinanceOpsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn state_machine(
        entity: &'static str,
        id: impl ToString,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Self::StateMachine {
            entity,
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn concurrency(entity: &'static str, id: impl ToString) -> Self {
        Self::Concurrency {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FinanceOpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = FinanceOpsError::not_found("Budget", "abc-123");
        assert_eq!(err.to_string(), "Budget abc-123 not found");
    }

    #[test]
    fn state_machine_formats_transition() {
        let err = FinanceOpsError::state_machine("Suggestion", "s1", "pending", "applied");
        assert_eq!(
            err.to_string(),
            "invalid state transition: pending -> applied for Suggestion s1"
        );
    }
}
