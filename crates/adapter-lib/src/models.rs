//! Core data models for the custom metrics API
//!
//! Value types for metric identity, the four query shapes served by the
//! adapter and the values returned to callers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// API group/version the adapter serves
pub const CUSTOM_METRICS_GROUP_VERSION: &str = "custom.metrics.k8s.io/v1beta1";

/// Version marker used for described objects whose version is not known
pub const API_VERSION_INTERNAL: &str = "__internal";

/// Resource kind of a metric query (e.g. `pods` or `deployments.apps`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }

    /// Resource in the core (empty) group
    pub fn core(resource: impl Into<String>) -> Self {
        Self::new("", resource)
    }

    /// Parse the `resource[.group]` form used in request paths
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('.') {
            Some((resource, group)) => Self::new(group, resource),
            None => Self::core(raw),
        }
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

/// One metric the provider advertises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricInfo {
    pub group_resource: GroupResource,
    pub namespaced: bool,
    pub metric: String,
}

impl MetricInfo {
    pub fn new(group_resource: GroupResource, namespaced: bool, metric: impl Into<String>) -> Self {
        Self {
            group_resource,
            namespaced,
            metric: metric.into(),
        }
    }
}

/// Label selector as supplied by the caller.
///
/// The adapter never interprets the expression; it is handed to whichever
/// backend knows how to match it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector(String);

impl Selector {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Selector matching every object
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_everything(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_everything() {
            write!(f, "<everything>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A single inbound metric query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricQuery {
    RootByName {
        group_resource: GroupResource,
        name: String,
        metric_name: String,
    },
    RootBySelector {
        group_resource: GroupResource,
        selector: Selector,
        metric_name: String,
    },
    NamespacedByName {
        group_resource: GroupResource,
        namespace: String,
        name: String,
        metric_name: String,
    },
    NamespacedBySelector {
        group_resource: GroupResource,
        namespace: String,
        selector: Selector,
        metric_name: String,
    },
}

impl MetricQuery {
    pub fn group_resource(&self) -> &GroupResource {
        match self {
            MetricQuery::RootByName { group_resource, .. }
            | MetricQuery::RootBySelector { group_resource, .. }
            | MetricQuery::NamespacedByName { group_resource, .. }
            | MetricQuery::NamespacedBySelector { group_resource, .. } => group_resource,
        }
    }

    pub fn metric_name(&self) -> &str {
        match self {
            MetricQuery::RootByName { metric_name, .. }
            | MetricQuery::RootBySelector { metric_name, .. }
            | MetricQuery::NamespacedByName { metric_name, .. }
            | MetricQuery::NamespacedBySelector { metric_name, .. } => metric_name,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            MetricQuery::NamespacedByName { namespace, .. }
            | MetricQuery::NamespacedBySelector { namespace, .. } => Some(namespace),
            MetricQuery::RootByName { .. } | MetricQuery::RootBySelector { .. } => None,
        }
    }

    /// Stable label for logs and metrics
    pub fn variant(&self) -> &'static str {
        match self {
            MetricQuery::RootByName { .. } => "root_by_name",
            MetricQuery::RootBySelector { .. } => "root_by_selector",
            MetricQuery::NamespacedByName { .. } => "namespaced_by_name",
            MetricQuery::NamespacedBySelector { .. } => "namespaced_by_selector",
        }
    }

    /// Path of this query below the API group/version root
    pub fn self_link(&self) -> String {
        let base = format!("/apis/{}", CUSTOM_METRICS_GROUP_VERSION);
        match self {
            MetricQuery::RootByName {
                group_resource,
                name,
                metric_name,
            } => format!("{}/{}/{}/{}", base, group_resource, name, metric_name),
            MetricQuery::RootBySelector {
                group_resource,
                metric_name,
                ..
            } => format!("{}/{}/*/{}", base, group_resource, metric_name),
            MetricQuery::NamespacedByName {
                group_resource,
                namespace,
                name,
                metric_name,
            } => format!(
                "{}/namespaces/{}/{}/{}/{}",
                base, namespace, group_resource, name, metric_name
            ),
            MetricQuery::NamespacedBySelector {
                group_resource,
                namespace,
                metric_name,
                ..
            } => format!(
                "{}/namespaces/{}/{}/*/{}",
                base, namespace, group_resource, metric_name
            ),
        }
    }
}

/// Reference to the object a metric value describes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub api_version: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Scale of a [`Quantity`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Unit,
    Milli,
}

/// Fixed-point numeric value (integer magnitude plus decimal scale)
#[derive(Debug, Clone, Copy)]
pub struct Quantity {
    unscaled: i64,
    scale: Scale,
}

impl Quantity {
    pub fn from_int(value: i64) -> Self {
        Self {
            unscaled: value,
            scale: Scale::Unit,
        }
    }

    pub fn from_milli(milli: i64) -> Self {
        Self {
            unscaled: milli,
            scale: Scale::Milli,
        }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Value expressed in thousandths
    pub fn milli_value(&self) -> i64 {
        match self.scale {
            Scale::Unit => self.unscaled.saturating_mul(1000),
            Scale::Milli => self.unscaled,
        }
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.milli_value() == other.milli_value()
    }
}

impl Eq for Quantity {}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let milli = self.milli_value();
        if milli % 1000 == 0 {
            write!(f, "{}", milli / 1000)
        } else {
            write!(f, "{}m", milli)
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// A resolved metric value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub described_object: ObjectReference,
    pub metric_name: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub value: Quantity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub self_link: String,
}

/// Ordered list of metric values; an empty list is a valid answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValueList {
    pub kind: &'static str,
    pub api_version: &'static str,
    pub metadata: ListMeta,
    pub items: Vec<MetricValue>,
}

impl MetricValueList {
    pub fn new(items: Vec<MetricValue>) -> Self {
        Self {
            kind: "MetricValueList",
            api_version: CUSTOM_METRICS_GROUP_VERSION,
            metadata: ListMeta::default(),
            items,
        }
    }

    pub fn with_self_link(mut self, self_link: impl Into<String>) -> Self {
        self.metadata.self_link = self_link.into();
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
