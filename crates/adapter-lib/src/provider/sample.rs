//! Reference provider
//!
//! Serves the namespaced by-name path from a [`MetricBackend`]; every other
//! query shape is answered with a typed failure.

use super::{async_trait, CustomMetricsProvider, MetricBackend, ObjectIdentity, SyntheticBackend};
use crate::error::{ProviderError, ProviderResult};
use crate::models::{
    GroupResource, MetricInfo, MetricValue, MetricValueList, ObjectReference, Quantity, Selector,
    API_VERSION_INTERNAL,
};
use crate::observability::StructuredLogger;

/// Catalog advertised by the reference provider
pub fn sample_catalog() -> Vec<MetricInfo> {
    vec![
        MetricInfo::new(GroupResource::core("pods"), true, super::SAMPLE_METRIC),
        MetricInfo::new(GroupResource::core("pods"), true, "this-is-my-custom-metric"),
    ]
}

/// Provider resolving queries against a pluggable backend
pub struct SampleMetricsProvider<B = SyntheticBackend> {
    backend: B,
    catalog: Vec<MetricInfo>,
    logger: StructuredLogger,
}

impl SampleMetricsProvider<SyntheticBackend> {
    /// Provider over a fresh synthetic backend
    pub fn new(logger: StructuredLogger) -> Self {
        Self::with_backend(SyntheticBackend::default(), logger)
    }
}

impl<B: MetricBackend> SampleMetricsProvider<B> {
    pub fn with_backend(backend: B, logger: StructuredLogger) -> Self {
        Self {
            backend,
            catalog: sample_catalog(),
            logger,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn reject<T>(
        &self,
        variant: &str,
        metric_name: &str,
        error: ProviderError,
    ) -> ProviderResult<T> {
        self.logger.log_rejected(variant, metric_name, &error);
        Err(error)
    }
}

#[async_trait]
impl<B: MetricBackend> CustomMetricsProvider for SampleMetricsProvider<B> {
    fn list_all_metrics(&self) -> Vec<MetricInfo> {
        self.logger.log_catalog(&self.catalog);
        self.catalog.clone()
    }

    async fn get_root_scoped_metric_by_name(
        &self,
        group_resource: &GroupResource,
        name: &str,
        metric_name: &str,
    ) -> ProviderResult<MetricValue> {
        self.logger
            .log_query("root_by_name", group_resource, None, name, metric_name);
        self.reject("root_by_name", metric_name, ProviderError::not_found(metric_name))
    }

    async fn get_root_scoped_metric_by_selector(
        &self,
        group_resource: &GroupResource,
        selector: &Selector,
        metric_name: &str,
    ) -> ProviderResult<MetricValueList> {
        self.logger.log_query(
            "root_by_selector",
            group_resource,
            None,
            &selector.to_string(),
            metric_name,
        );
        self.reject(
            "root_by_selector",
            metric_name,
            ProviderError::unsupported(metric_name, "root-scoped selector"),
        )
    }

    async fn get_namespaced_metric_by_name(
        &self,
        group_resource: &GroupResource,
        namespace: &str,
        name: &str,
        metric_name: &str,
    ) -> ProviderResult<MetricValue> {
        self.logger.log_query(
            "namespaced_by_name",
            group_resource,
            Some(namespace),
            name,
            metric_name,
        );

        let object = ObjectIdentity {
            group_resource,
            namespace: Some(namespace),
            name,
            metric_name,
        };

        let count = match self.backend.counter(&object).await {
            Ok(Some(count)) => count,
            Ok(None) => {
                return self.reject(
                    "namespaced_by_name",
                    metric_name,
                    ProviderError::not_found(metric_name),
                )
            }
            Err(err) => return self.reject("namespaced_by_name", metric_name, err),
        };

        let value = MetricValue {
            described_object: ObjectReference {
                api_version: format!("{}/{}", group_resource.group, API_VERSION_INTERNAL),
                name: name.to_string(),
                namespace: Some(namespace.to_string()),
            },
            metric_name: metric_name.to_string(),
            timestamp: chrono::Utc::now(),
            value: Quantity::from_milli(count.saturating_mul(1000)),
        };

        self.logger.log_resolved(&value);
        Ok(value)
    }

    async fn get_namespaced_metric_by_selector(
        &self,
        group_resource: &GroupResource,
        namespace: &str,
        selector: &Selector,
        metric_name: &str,
    ) -> ProviderResult<MetricValueList> {
        self.logger.log_query(
            "namespaced_by_selector",
            group_resource,
            Some(namespace),
            &selector.to_string(),
            metric_name,
        );
        self.reject(
            "namespaced_by_selector",
            metric_name,
            ProviderError::unsupported(metric_name, "namespaced selector"),
        )
    }
}
