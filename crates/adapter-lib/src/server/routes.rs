//! HTTP API for the custom metrics group, health checks and self metrics

use crate::error::ProviderError;
use crate::health::HealthRegistry;
use crate::models::{
    GroupResource, MetricInfo, MetricQuery, Selector, CUSTOM_METRICS_GROUP_VERSION,
};
use crate::observability::AdapterMetrics;
use crate::provider::CustomMetricsProvider;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

/// Root path of the custom metrics API
pub const API_ROOT: &str = "/apis/custom.metrics.k8s.io/v1beta1";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn CustomMetricsProvider>,
    pub health_registry: HealthRegistry,
    /// Present when self metrics are enabled
    pub metrics: Option<AdapterMetrics>,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn CustomMetricsProvider>,
        health_registry: HealthRegistry,
        metrics: Option<AdapterMetrics>,
    ) -> Self {
        Self {
            provider,
            health_registry,
            metrics,
        }
    }

    fn record_request(&self, route: &str, code: StatusCode) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_http_requests(route, code.as_u16());
        }
    }
}

/// Decode the path below [`API_ROOT`] into a query.
///
/// Supported shapes are `{resource}/{name}/{metric}` and
/// `namespaces/{namespace}/{resource}/{name}/{metric}`; a name of `*`
/// selects objects by `selector` instead.
pub fn parse_metric_path(path: &str, selector: Option<&str>) -> Option<MetricQuery> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let make_selector = || Selector::new(selector.unwrap_or_default());

    let query = match segments.as_slice() {
        ["namespaces", namespace, resource, "*", metric] => MetricQuery::NamespacedBySelector {
            group_resource: GroupResource::parse(resource),
            namespace: namespace.to_string(),
            selector: make_selector(),
            metric_name: metric.to_string(),
        },
        ["namespaces", namespace, resource, name, metric] => MetricQuery::NamespacedByName {
            group_resource: GroupResource::parse(resource),
            namespace: namespace.to_string(),
            name: name.to_string(),
            metric_name: metric.to_string(),
        },
        [resource, "*", metric] => MetricQuery::RootBySelector {
            group_resource: GroupResource::parse(resource),
            selector: make_selector(),
            metric_name: metric.to_string(),
        },
        [resource, name, metric] => MetricQuery::RootByName {
            group_resource: GroupResource::parse(resource),
            name: name.to_string(),
            metric_name: metric.to_string(),
        },
        _ => return None,
    };

    Some(query)
}

/// Kubernetes `Status` object returned on failures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    kind: &'static str,
    api_version: &'static str,
    status: &'static str,
    message: String,
    reason: &'static str,
    code: u16,
}

fn status_response(code: StatusCode, reason: &'static str, message: String) -> Response {
    let status = Status {
        kind: "Status",
        api_version: "v1",
        status: "Failure",
        message,
        reason,
        code: code.as_u16(),
    };
    (code, Json(status)).into_response()
}

fn provider_error_status(err: &ProviderError) -> (StatusCode, &'static str) {
    if err.is_not_found() {
        (StatusCode::NOT_FOUND, "NotFound")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResource {
    name: String,
    singular_name: &'static str,
    namespaced: bool,
    kind: &'static str,
    verbs: [&'static str; 1],
}

impl From<&MetricInfo> for ApiResource {
    fn from(info: &MetricInfo) -> Self {
        Self {
            name: format!("{}/{}", info.group_resource, info.metric),
            singular_name: "",
            namespaced: info.namespaced,
            kind: "MetricValueList",
            verbs: ["get"],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiResourceList {
    kind: &'static str,
    api_version: &'static str,
    group_version: &'static str,
    resources: Vec<ApiResource>,
}

/// Discovery document listing every advertised metric
async fn discovery(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.provider.list_all_metrics();
    if let Some(metrics) = &state.metrics {
        metrics.set_catalog_size(catalog.len());
    }
    state.record_request("discovery", StatusCode::OK);

    Json(ApiResourceList {
        kind: "APIResourceList",
        api_version: "v1",
        group_version: CUSTOM_METRICS_GROUP_VERSION,
        resources: catalog.iter().map(ApiResource::from).collect(),
    })
}

/// Resolve one metric query
async fn metric(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(query) = parse_metric_path(&path, params.get("labelSelector").map(String::as_str))
    else {
        state.record_request("metric", StatusCode::NOT_FOUND);
        return status_response(
            StatusCode::NOT_FOUND,
            "NotFound",
            format!("the server could not find the requested resource {:?}", path),
        );
    };

    let started = Instant::now();
    let result = state.provider.resolve(&query).await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    };
    if let Some(metrics) = &state.metrics {
        metrics.observe_query(query.variant(), outcome, started.elapsed().as_secs_f64());
    }

    match result {
        Ok(list) => {
            if let (Some(metrics), Some(item)) = (&state.metrics, list.items.last()) {
                metrics.set_last_value(item.value.milli_value());
            }
            state.record_request("metric", StatusCode::OK);
            (StatusCode::OK, Json(list)).into_response()
        }
        Err(err) => {
            let (code, reason) = provider_error_status(&err);
            state.record_request("metric", code);
            status_response(code, reason, err.to_string())
        }
    }
}

/// Liveness - 200 unless the adapter failed
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health();

    let status_code = if health.state.is_live() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// Readiness - 200 only while serving
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint; 404 while self metrics are disabled
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let Some(metrics) = &state.metrics else {
        return status_response(
            StatusCode::NOT_FOUND,
            "NotFound",
            "self metrics are disabled".to_string(),
        );
    };

    match metrics.encode_text() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn fallback() -> Response {
    status_response(
        StatusCode::NOT_FOUND,
        "NotFound",
        "the server could not find the requested resource".to_string(),
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route(API_ROOT, get(discovery))
        .route(&format!("{}/*path", API_ROOT), get(metric))
        .fallback(fallback)
        .with_state(state)
}
