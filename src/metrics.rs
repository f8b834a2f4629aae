// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the env-injector webhook.
//!
//! All metrics share the namespace prefix `env_injector_`.
//!
//! # Metrics Categories
//!
//! - **Admission Metrics** - Request outcomes and handling latency
//! - **Patch Metrics** - Patch operations emitted per field category
//! - **Configuration Metrics** - Entries loaded per field category
//! - **Error Metrics** - Error conditions by type
//!
//! # Example
//!
//! ```rust,no_run
//! use env_injector::metrics::{record_admission, AdmissionOutcome};
//!
//! record_admission(AdmissionOutcome::Mutated, std::time::Duration::from_millis(3));
//! ```

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all env-injector metrics
const METRICS_NAMESPACE: &str = "env_injector";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Admission Metrics
// ============================================================================

/// How an admission request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Allowed with a patch
    Mutated,
    /// Allowed unchanged because the gate declined it
    Skipped,
    /// Refused because the patch could not be computed
    Denied,
    /// The review or its object could not be decoded
    Invalid,
}

impl AdmissionOutcome {
    /// Label value
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mutated => "mutated",
            Self::Skipped => "skipped",
            Self::Denied => "denied",
            Self::Invalid => "invalid",
        }
    }
}

/// Total number of admission requests by outcome
///
/// Labels:
/// - `outcome`: `mutated`, `skipped`, `denied`, `invalid`
pub static ADMISSION_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_admission_requests_total"),
        "Total number of admission requests by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Time spent answering an admission request
///
/// Labels:
/// - `outcome`: same values as [`ADMISSION_REQUESTS_TOTAL`]
pub static ADMISSION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_admission_duration_seconds"),
        "Time spent answering admission requests in seconds",
    )
    .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]);
    let histogram = HistogramVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Patch Metrics
// ============================================================================

/// Total number of patch operations emitted
///
/// Labels:
/// - `category`: field category (`env`, `tolerations`, ...), `scaffold` or `annotations`
/// - `op`: `add`, `replace`, `remove`
pub static PATCH_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_patch_operations_total"),
        "Total number of JSON patch operations emitted by category and operation",
    );
    let counter = CounterVec::new(opts, &["category", "op"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Configuration Metrics
// ============================================================================

/// Number of configured entries per field category
///
/// Labels:
/// - `category`: field category
pub static CONFIG_ENTRIES: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_config_entries"),
        "Number of configured entries by field category",
    );
    let gauge = GaugeVec::new(opts, &["category"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by type
///
/// Labels:
/// - `error_type`: `invalid_review`, `invalid_object`, `merge`, `patch_encoding`, `tls_reload`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by type",
    );
    let counter = CounterVec::new(opts, &["error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record an answered admission request
///
/// # Arguments
/// * `outcome` - How the request was answered
/// * `duration` - Time spent handling it
pub fn record_admission(outcome: AdmissionOutcome, duration: Duration) {
    ADMISSION_REQUESTS_TOTAL
        .with_label_values(&[outcome.as_str()])
        .inc();
    ADMISSION_DURATION_SECONDS
        .with_label_values(&[outcome.as_str()])
        .observe(duration.as_secs_f64());
}

/// Record emitted patch operations
///
/// # Arguments
/// * `category` - Field category or step name
/// * `op` - Operation name
/// * `count` - Number of operations
#[allow(clippy::cast_precision_loss)]
pub fn record_patch_operations(category: &str, op: &str, count: usize) {
    if count == 0 {
        return;
    }
    PATCH_OPERATIONS_TOTAL
        .with_label_values(&[category, op])
        .inc_by(count as f64);
}

/// Record the number of configured entries for a field category
#[allow(clippy::cast_precision_loss)]
pub fn record_config_entries(category: &str, count: usize) {
    CONFIG_ENTRIES
        .with_label_values(&[category])
        .set(count as f64);
}

/// Record an error
///
/// # Arguments
/// * `error_type` - Category of error (e.g., `merge`, `invalid_review`)
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_admission() {
        record_admission(AdmissionOutcome::Skipped, Duration::from_millis(2));

        let counter = ADMISSION_REQUESTS_TOTAL.with_label_values(&["skipped"]);
        assert!(counter.get() > 0.0);

        let histogram = ADMISSION_DURATION_SECONDS.with_label_values(&["skipped"]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_patch_operations_ignores_zero() {
        record_patch_operations("metricsTestCategory", "add", 0);
        record_patch_operations("metricsTestCategory", "replace", 3);

        let counter = PATCH_OPERATIONS_TOTAL.with_label_values(&["metricsTestCategory", "replace"]);
        assert!(counter.get() >= 3.0);
    }

    #[test]
    fn test_record_config_entries() {
        record_config_entries("metricsTestEntries", 4);

        assert!(
            (CONFIG_ENTRIES
                .with_label_values(&["metricsTestEntries"])
                .get()
                - 4.0)
                .abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn test_gather_metrics() {
        record_admission(AdmissionOutcome::Mutated, Duration::from_millis(1));
        record_error("metrics_test");

        let metrics_text = gather_metrics().expect("gathering metrics should succeed");
        assert!(
            metrics_text.contains("env_injector_admission_requests_total"),
            "Metrics should contain admission counter"
        );
        assert!(
            metrics_text.contains("env_injector_errors_total"),
            "Metrics should contain error counter"
        );
    }
}
