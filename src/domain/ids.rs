//! Strongly-typed identifiers.
//!
//! Every entity is keyed by a newtype around `Uuid` rather than a bare `Uuid`
//! so that mixing up, say, a `UserId` and a `BudgetId` is a compile error.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

id_type!(UserId);
id_type!(TransactionId);
id_type!(CategoryId);
id_type!(BudgetId);
id_type!(SavingsGoalId);
id_type!(SubscriptionId);
id_type!(SignalId);
id_type!(InsightId);
id_type!(SuggestionId);
id_type!(FeedbackId);
id_type!(AuditLogId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_display_and_parse() {
        let id = UserId::new();
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_id_types_are_distinct_types() {
        let user = UserId::new();
        let budget = BudgetId::new();
        assert_ne!(user.as_uuid(), Uuid::nil());
        assert_ne!(budget.as_uuid(), Uuid::nil());
    }
}
