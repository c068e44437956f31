//! Prometheus counters for the logging pipeline.
//!
//! Injected into [`crate::interceptor::RequestLoggingLayer`] at construction
//! rather than living as process-wide globals, so the pipeline stays
//! testable in isolation. All instruments are atomic and safe to update from
//! any number of in-flight requests.

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Duration buckets in seconds.
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

/// Metrics collaborator for the request logger.
///
/// # Instruments
///
/// - `request_logger_requests_total` - requests that produced log lines
/// - `request_logger_masked_fields_total` - substitutions made by the masker
/// - `request_logger_errors_total` - handler errors observed while logging
/// - `request_logger_processing_seconds` - request handling duration
#[derive(Clone)]
pub struct RequestLoggingMetrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    requests_total: IntCounter,
    masked_fields_total: IntCounter,
    errors_total: IntCounter,
    processing_seconds: Histogram,
}

impl RequestLoggingMetrics {
    /// Create metrics backed by a fresh registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create metrics registered in a shared registry.
    pub fn with_registry(registry: Registry) -> Self {
        let requests_total = IntCounter::with_opts(Opts::new(
            "request_logger_requests_total",
            "Total number of requests logged",
        ))
        .expect("failed to create request_logger_requests_total");

        let masked_fields_total = IntCounter::with_opts(Opts::new(
            "request_logger_masked_fields_total",
            "Number of fields masked in requests and responses",
        ))
        .expect("failed to create request_logger_masked_fields_total");

        let errors_total = IntCounter::with_opts(Opts::new(
            "request_logger_errors_total",
            "Number of handler errors observed while logging",
        ))
        .expect("failed to create request_logger_errors_total");

        let processing_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "request_logger_processing_seconds",
                "Time spent handling logged requests",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
        )
        .expect("failed to create request_logger_processing_seconds");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("failed to register request_logger_requests_total");
        registry
            .register(Box::new(masked_fields_total.clone()))
            .expect("failed to register request_logger_masked_fields_total");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("failed to register request_logger_errors_total");
        registry
            .register(Box::new(processing_seconds.clone()))
            .expect("failed to register request_logger_processing_seconds");

        Self {
            inner: Arc::new(MetricsInner {
                registry,
                requests_total,
                masked_fields_total,
                errors_total,
                processing_seconds,
            }),
        }
    }

    /// The backing registry, for scraping or registering extra collectors.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Count one logged request.
    pub fn increment_total_requests(&self) {
        self.inner.requests_total.inc();
    }

    /// Count `count` masked substitutions.
    pub fn add_masked_fields(&self, count: usize) {
        self.inner.masked_fields_total.inc_by(count as u64);
    }

    /// Count one handler error.
    pub fn increment_errors(&self) {
        self.inner.errors_total.inc();
    }

    /// Record one handling duration sample.
    pub fn observe_duration(&self, seconds: f64) {
        self.inner.processing_seconds.observe(seconds);
    }

    #[cfg(test)]
    pub(crate) fn requests_total(&self) -> u64 {
        self.inner.requests_total.get()
    }

    #[cfg(test)]
    pub(crate) fn masked_fields_total(&self) -> u64 {
        self.inner.masked_fields_total.get()
    }

    #[cfg(test)]
    pub(crate) fn errors_total(&self) -> u64 {
        self.inner.errors_total.get()
    }
}

impl Default for RequestLoggingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_instruments() {
        let metrics = RequestLoggingMetrics::new();
        let names: Vec<String> = metrics
            .registry()
            .gather()
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect();
        assert!(names.contains(&"request_logger_requests_total".to_string()));
        assert!(names.contains(&"request_logger_masked_fields_total".to_string()));
        assert!(names.contains(&"request_logger_errors_total".to_string()));
        assert!(names.contains(&"request_logger_processing_seconds".to_string()));
    }

    #[test]
    fn counters_accumulate() {
        let metrics = RequestLoggingMetrics::new();
        metrics.increment_total_requests();
        metrics.increment_total_requests();
        metrics.add_masked_fields(3);
        metrics.increment_errors();
        metrics.observe_duration(0.012);

        assert_eq!(metrics.requests_total(), 2);
        assert_eq!(metrics.masked_fields_total(), 3);
        assert_eq!(metrics.errors_total(), 1);
    }

    #[test]
    fn clones_share_the_same_instruments() {
        let metrics = RequestLoggingMetrics::new();
        let other = metrics.clone();
        other.increment_total_requests();
        assert_eq!(metrics.requests_total(), 1);
    }
}
