//! SuggestionLog entity — append-only audit event for every lifecycle transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AuditLogId, SuggestionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Viewed,
    Approved,
    Rejected,
    Applied,
    Failed,
    Expired,
    RolledBack,
    Cancelled,
    ConflictDetected,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    System,
    Ai,
    Scheduler,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub actor_type: ActorType,
    pub id: Option<String>,
    pub ip: Option<String>,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            actor_type: ActorType::System,
            id: None,
            ip: None,
        }
    }

    pub fn scheduler() -> Self {
        Self {
            actor_type: ActorType::Scheduler,
            id: None,
            ip: None,
        }
    }

    pub fn user(user_id: UserId) -> Self {
        Self {
            actor_type: ActorType::User,
            id: Some(user_id.to_string()),
            ip: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionLog {
    pub id: AuditLogId,
    pub user_id: UserId,
    pub suggestion_id: SuggestionId,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
    pub actor: Actor,
    pub previous_state: Option<serde_json::Value>,
    pub new_state: Option<serde_json::Value>,
    pub changes: Vec<FieldChange>,
    pub diff: serde_json::Value,
    pub outcome: ActionOutcome,
}

impl SuggestionLog {
    pub fn new(
        user_id: UserId,
        suggestion_id: SuggestionId,
        action: AuditAction,
        actor: Actor,
        previous_state: Option<serde_json::Value>,
        new_state: Option<serde_json::Value>,
        outcome: ActionOutcome,
    ) -> Self {
        let changes = diff_states(previous_state.as_ref(), new_state.as_ref());
        let diff = serde_json::to_value(&changes).unwrap_or(serde_json::Value::Null);
        Self {
            id: AuditLogId::new(),
            user_id,
            suggestion_id,
            action,
            timestamp: Utc::now(),
            actor,
            previous_state,
            new_state,
            changes,
            diff,
            outcome,
        }
    }
}

/// Recursive diff of two JSON object trees, skipping keys beginning with `_`.
/// Only top-level-and-nested object keys are compared; arrays are compared wholesale.
pub fn diff_states(
    previous: Option<&serde_json::Value>,
    new: Option<&serde_json::Value>,
) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    diff_into(previous, new, "", &mut changes);
    changes
}

fn diff_into(
    previous: Option<&serde_json::Value>,
    new: Option<&serde_json::Value>,
    prefix: &str,
    out: &mut Vec<FieldChange>,
) {
    use serde_json::Value;
    match (previous, new) {
        (Some(Value::Object(p)), Some(Value::Object(n))) => {
            let mut keys: Vec<&String> = p.keys().chain(n.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                if key.starts_with('_') {
                    continue;
                }
                let field = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                diff_into(p.get(key), n.get(key), &field, out);
            }
        }
        (p, n) if p == n => {}
        (p, n) => {
            if !prefix.is_empty() {
                out.push(FieldChange {
                    field: prefix.to_string(),
                    old_value: p.cloned().unwrap_or(Value::Null),
                    new_value: n.cloned().unwrap_or(Value::Null),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn diff_reports_changed_leaf_fields() {
        let prev = json!({"amount": 500, "name": "Groceries", "_internal": 1});
        let new = json!({"amount": 600, "name": "Groceries", "_internal": 2});
        let changes = diff_states(Some(&prev), Some(&new));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "amount");
    }

    #[test]
    fn diff_is_empty_for_identical_states() {
        let state = json!({"amount": 500});
        assert!(diff_states(Some(&state), Some(&state)).is_empty());
    }

    #[test]
    fn diff_recurses_into_nested_objects() {
        let prev = json!({"budget": {"amount": 500}});
        let new = json!({"budget": {"amount": 600}});
        let changes = diff_states(Some(&prev), Some(&new));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "budget.amount");
    }
}
