//! Metrics collection
//!
//! Thin wrappers over the `metrics` facade. Nothing is exported unless the
//! binary installs a recorder, so these calls are free in tests.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::report::AnalysisOutcome;

/// Counter of store operations, labelled by operation and status.
pub const DB_OPERATIONS_TOTAL: &str = "oneframe_db_operations_total";
/// Histogram of store operation latency in seconds.
pub const DB_OPERATION_DURATION: &str = "oneframe_db_operation_duration_seconds";
/// Counter of saved diary entries.
pub const ENTRIES_SAVED_TOTAL: &str = "oneframe_entries_saved_total";
/// Counter of analysis requests, labelled by kind and outcome.
pub const ANALYSIS_REQUESTS_TOTAL: &str = "oneframe_analysis_requests_total";
/// Histogram of analysis latency in seconds.
pub const ANALYSIS_DURATION: &str = "oneframe_analysis_duration_seconds";

/// Record database operation metrics
pub fn record_db_operation(operation: &'static str, duration: Duration, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(DB_OPERATIONS_TOTAL, "operation" => operation, "status" => status).increment(1);
    histogram!(DB_OPERATION_DURATION, "operation" => operation).record(duration.as_secs_f64());
}

/// Record a saved entry
pub fn record_entry_saved() {
    counter!(ENTRIES_SAVED_TOTAL).increment(1);
}

/// Record an analysis round trip
pub fn record_analysis(kind: &'static str, outcome: &AnalysisOutcome, duration: Duration) {
    counter!(ANALYSIS_REQUESTS_TOTAL, "kind" => kind, "outcome" => outcome.metric_label()).increment(1);
    histogram!(ANALYSIS_DURATION, "kind" => kind).record(duration.as_secs_f64());
}
