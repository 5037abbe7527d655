//! Metrics provider contract and resolution engine
//!
//! This module provides:
//! - The provider contract served by the custom metrics API (one operation
//!   per query shape plus catalog listing)
//! - A pluggable backend trait that computes a counter for one object
//! - The reference provider backed by the synthetic generator

mod backend;
mod sample;

#[cfg(test)]
mod tests;

pub use backend::{
    MetricBackend, ObjectIdentity, SyntheticBackend, SAMPLE_METRIC, SAMPLE_NAMESPACE,
    SAMPLE_OBJECT,
};
pub use sample::{sample_catalog, SampleMetricsProvider};

use crate::error::ProviderResult;
use crate::models::{
    GroupResource, MetricInfo, MetricQuery, MetricValue, MetricValueList, Selector,
};

pub use async_trait::async_trait;

/// Contract every metrics provider implements
#[async_trait]
pub trait CustomMetricsProvider: Send + Sync {
    /// Full, fixed catalog of metrics this provider can answer for
    fn list_all_metrics(&self) -> Vec<MetricInfo>;

    async fn get_root_scoped_metric_by_name(
        &self,
        group_resource: &GroupResource,
        name: &str,
        metric_name: &str,
    ) -> ProviderResult<MetricValue>;

    async fn get_root_scoped_metric_by_selector(
        &self,
        group_resource: &GroupResource,
        selector: &Selector,
        metric_name: &str,
    ) -> ProviderResult<MetricValueList>;

    async fn get_namespaced_metric_by_name(
        &self,
        group_resource: &GroupResource,
        namespace: &str,
        name: &str,
        metric_name: &str,
    ) -> ProviderResult<MetricValue>;

    async fn get_namespaced_metric_by_selector(
        &self,
        group_resource: &GroupResource,
        namespace: &str,
        selector: &Selector,
        metric_name: &str,
    ) -> ProviderResult<MetricValueList>;

    /// Dispatch a query to the operation matching its shape.
    ///
    /// By-name answers are returned as single-item lists, which is how the
    /// API serves them.
    async fn resolve(&self, query: &MetricQuery) -> ProviderResult<MetricValueList> {
        let list = match query {
            MetricQuery::RootByName {
                group_resource,
                name,
                metric_name,
            } => MetricValueList::new(vec![
                self.get_root_scoped_metric_by_name(group_resource, name, metric_name)
                    .await?,
            ]),
            MetricQuery::RootBySelector {
                group_resource,
                selector,
                metric_name,
            } => {
                self.get_root_scoped_metric_by_selector(group_resource, selector, metric_name)
                    .await?
            }
            MetricQuery::NamespacedByName {
                group_resource,
                namespace,
                name,
                metric_name,
            } => MetricValueList::new(vec![
                self.get_namespaced_metric_by_name(group_resource, namespace, name, metric_name)
                    .await?,
            ]),
            MetricQuery::NamespacedBySelector {
                group_resource,
                namespace,
                selector,
                metric_name,
            } => {
                self.get_namespaced_metric_by_selector(
                    group_resource,
                    namespace,
                    selector,
                    metric_name,
                )
                .await?
            }
        };

        Ok(list.with_self_link(query.self_link()))
    }
}
