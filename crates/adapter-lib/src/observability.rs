//! Observability infrastructure for the metrics adapter
//!
//! Provides:
//! - Prometheus self-metrics (query outcomes, resolution latency, last resolved
//!   value, catalog size, HTTP requests)
//! - Structured JSON logging with tracing

use crate::error::ProviderError;
use crate::models::{GroupResource, MetricInfo, MetricValue};
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, register_int_gauge, Gauge,
    HistogramVec, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for resolution latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AdapterMetricsInner> = OnceLock::new();

struct AdapterMetricsInner {
    queries_total: IntCounterVec,
    resolution_latency_seconds: HistogramVec,
    last_value: Gauge,
    catalog_size: IntGauge,
    http_requests_total: IntCounterVec,
}

impl AdapterMetricsInner {
    fn new() -> Self {
        Self {
            queries_total: register_int_counter_vec!(
                "custom_metrics_adapter_queries_total",
                "Metric queries handled, by query shape and outcome",
                &["variant", "outcome"]
            )
            .expect("Failed to register queries_total"),

            resolution_latency_seconds: register_histogram_vec!(
                "custom_metrics_adapter_resolution_latency_seconds",
                "Time spent resolving a metric query",
                &["variant"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register resolution_latency_seconds"),

            last_value: register_gauge!(
                "custom_metrics_adapter_last_value",
                "Value of the most recently resolved metric"
            )
            .expect("Failed to register last_value"),

            catalog_size: register_int_gauge!(
                "custom_metrics_adapter_catalog_size",
                "Number of metrics advertised by the provider"
            )
            .expect("Failed to register catalog_size"),

            http_requests_total: register_int_counter_vec!(
                "custom_metrics_adapter_http_requests_total",
                "HTTP requests served, by route and status code",
                &["route", "code"]
            )
            .expect("Failed to register http_requests_total"),
        }
    }
}

/// Adapter metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying collectors.
#[derive(Clone)]
pub struct AdapterMetrics {
    _private: (),
}

impl Default for AdapterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AdapterMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AdapterMetricsInner {
        GLOBAL_METRICS.get_or_init(AdapterMetricsInner::new)
    }

    /// Record the outcome of one query resolution
    pub fn observe_query(&self, variant: &str, outcome: &str, duration_secs: f64) {
        self.inner()
            .queries_total
            .with_label_values(&[variant, outcome])
            .inc();
        self.inner()
            .resolution_latency_seconds
            .with_label_values(&[variant])
            .observe(duration_secs);
    }

    /// Record the most recently resolved value, given in milli-units
    pub fn set_last_value(&self, milli_value: i64) {
        self.inner().last_value.set(milli_value as f64 / 1000.0);
    }

    pub fn set_catalog_size(&self, size: usize) {
        self.inner().catalog_size.set(size as i64);
    }

    pub fn inc_http_requests(&self, route: &str, code: u16) {
        self.inner()
            .http_requests_total
            .with_label_values(&[route, &code.to_string()])
            .inc();
    }

    /// Encode every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<Vec<u8>, prometheus::Error> {
        use prometheus::{Encoder, TextEncoder};

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Structured logger for adapter events
///
/// Every query is logged with its full inputs before it is resolved, and
/// again with its outcome.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    adapter: String,
}

impl StructuredLogger {
    pub fn new(adapter: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
        }
    }

    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    /// Log an inbound query before resolution
    pub fn log_query(
        &self,
        variant: &str,
        group_resource: &GroupResource,
        namespace: Option<&str>,
        target: &str,
        metric_name: &str,
    ) {
        info!(
            event = "metric_query",
            adapter = %self.adapter,
            variant = %variant,
            group_resource = %group_resource,
            namespace = ?namespace,
            target = %target,
            metric_name = %metric_name,
            "Resolving metric query"
        );
    }

    /// Log a successfully resolved value
    pub fn log_resolved(&self, value: &MetricValue) {
        info!(
            event = "metric_resolved",
            adapter = %self.adapter,
            api_version = %value.described_object.api_version,
            name = %value.described_object.name,
            namespace = ?value.described_object.namespace,
            metric_name = %value.metric_name,
            value = %value.value,
            timestamp = %value.timestamp,
            "Found metric"
        );
    }

    /// Log a query that produced no value
    pub fn log_rejected(&self, variant: &str, metric_name: &str, error: &ProviderError) {
        match error {
            ProviderError::Backend(_) => {
                warn!(
                    event = "metric_rejected",
                    adapter = %self.adapter,
                    variant = %variant,
                    metric_name = %metric_name,
                    reason = error.kind(),
                    error = %error,
                    "Metric backend failed"
                );
            }
            _ => {
                info!(
                    event = "metric_rejected",
                    adapter = %self.adapter,
                    variant = %variant,
                    metric_name = %metric_name,
                    reason = error.kind(),
                    error = %error,
                    "Metric not available"
                );
            }
        }
    }

    /// Log the advertised catalog
    pub fn log_catalog(&self, metrics: &[MetricInfo]) {
        let names: Vec<String> = metrics
            .iter()
            .map(|m| format!("{}/{}", m.group_resource, m.metric))
            .collect();
        info!(
            event = "list_all_metrics",
            adapter = %self.adapter,
            count = metrics.len(),
            metrics = ?names,
            "Listed available metrics"
        );
    }

    /// Log a lifecycle state change
    pub fn log_transition(&self, from: &str, to: &str) {
        info!(
            event = "lifecycle_transition",
            adapter = %self.adapter,
            from = %from,
            to = %to,
            "Adapter lifecycle transition"
        );
    }

    pub fn log_startup(&self, version: &str, listen: &str, enable_metrics: bool) {
        info!(
            event = "adapter_started",
            adapter = %self.adapter,
            adapter_version = %version,
            listen = %listen,
            enable_metrics = enable_metrics,
            "Custom metrics adapter serving"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "adapter_shutdown",
            adapter = %self.adapter,
            reason = %reason,
            "Custom metrics adapter shutting down"
        );
    }
}
