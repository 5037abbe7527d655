//! Pluggable metric backends

use super::async_trait;
use crate::error::ProviderResult;
use crate::generator::SyntheticGenerator;
use crate::models::GroupResource;

/// Metric served by the synthetic backend
pub const SAMPLE_METRIC: &str = "http_requests_custom_metric";
/// Only object the synthetic backend knows
pub const SAMPLE_OBJECT: &str = "sample-metrics-app";
/// Namespace of [`SAMPLE_OBJECT`]
pub const SAMPLE_NAMESPACE: &str = "default";

/// Identity of the object a counter is requested for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity<'a> {
    pub group_resource: &'a GroupResource,
    pub namespace: Option<&'a str>,
    pub name: &'a str,
    pub metric_name: &'a str,
}

/// Source of metric values.
///
/// Returns `Ok(None)` when the backend has no data for the object, which
/// the provider reports as not found.
#[async_trait]
pub trait MetricBackend: Send + Sync {
    async fn counter(&self, object: &ObjectIdentity<'_>) -> ProviderResult<Option<i64>>;
}

/// Backend answering for a single hardcoded object from a synthetic counter
#[derive(Debug, Default)]
pub struct SyntheticBackend {
    generator: SyntheticGenerator,
}

impl SyntheticBackend {
    pub fn new(generator: SyntheticGenerator) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &SyntheticGenerator {
        &self.generator
    }

    fn is_target(object: &ObjectIdentity<'_>) -> bool {
        object.metric_name == SAMPLE_METRIC
            && object.name == SAMPLE_OBJECT
            && object.namespace == Some(SAMPLE_NAMESPACE)
    }
}

#[async_trait]
impl MetricBackend for SyntheticBackend {
    async fn counter(&self, object: &ObjectIdentity<'_>) -> ProviderResult<Option<i64>> {
        if !Self::is_target(object) {
            return Ok(None);
        }
        Ok(Some(self.generator.next_value().await))
    }
}
