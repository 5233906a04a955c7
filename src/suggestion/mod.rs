//! Suggestion engine (C6): the transactional state machine over `PendingSuggestion`,
//! plus the typed transformation layer it dispatches into.

pub mod lifecycle;
pub mod transform;

pub use lifecycle::SuggestionLifecycle;
