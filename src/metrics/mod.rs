//! Prometheus metrics: initialization plus the named counters/histograms
//! the engines and scheduler record against.

pub mod recorder;

pub use recorder::{init_metrics, MetricsConfig};

/// Registers every named metric this crate emits, so the exporter's `/metrics`
/// endpoint has descriptions even before the first event fires.
pub fn describe_all() {
    metrics::describe_counter!("signals_emitted_total", "Financial signals written by the analysis engines");
    metrics::describe_counter!("suggestions_created_total", "Pending suggestions created by the suggestion engine");
    metrics::describe_counter!("suggestions_applied_total", "Suggestions successfully applied");
    metrics::describe_histogram!("suggestion_apply_duration_seconds", "Time to apply one suggestion, including rollback-state capture");
    metrics::describe_histogram!("scheduler_batch_duration_seconds", "Time to process one scheduler batch of users");
}

pub fn record_signal_emitted() {
    metrics::counter!("signals_emitted_total", 1);
}

pub fn record_suggestion_created() {
    metrics::counter!("suggestions_created_total", 1);
}

pub fn record_suggestion_applied(duration_secs: f64) {
    metrics::counter!("suggestions_applied_total", 1);
    metrics::histogram!("suggestion_apply_duration_seconds", duration_secs);
}

pub fn record_scheduler_batch(duration_secs: f64) {
    metrics::histogram!("scheduler_batch_duration_seconds", duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_helpers_do_not_panic_without_an_installed_recorder() {
        record_signal_emitted();
        record_suggestion_created();
        record_suggestion_applied(0.05);
        record_scheduler_batch(1.2);
    }
}
