//! Tests for the provider contract and the reference provider

#[cfg(test)]
mod sample_provider_tests {
    use crate::error::ProviderError;
    use crate::models::{GroupResource, MetricQuery, Selector};
    use crate::observability::StructuredLogger;
    use crate::provider::{
        CustomMetricsProvider, SampleMetricsProvider, SAMPLE_METRIC, SAMPLE_NAMESPACE,
        SAMPLE_OBJECT,
    };
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    fn provider() -> SampleMetricsProvider {
        SampleMetricsProvider::new(StructuredLogger::new("test-adapter"))
    }

    fn pods() -> GroupResource {
        GroupResource::core("pods")
    }

    #[test]
    fn test_catalog_is_stable() {
        let provider = provider();

        let first = provider.list_all_metrics();
        let second = provider.list_all_metrics();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].metric, "http_requests_custom_metric");
        assert_eq!(first[1].metric, "this-is-my-custom-metric");
        assert!(first.iter().all(|m| m.namespaced && m.group_resource == pods()));
    }

    #[tokio::test]
    async fn test_exact_match_resolves_increasing_values() {
        let provider = provider();

        let first = provider
            .get_namespaced_metric_by_name(&pods(), SAMPLE_NAMESPACE, SAMPLE_OBJECT, SAMPLE_METRIC)
            .await
            .unwrap();
        assert_eq!(first.value.milli_value(), 1000);
        assert_eq!(first.metric_name, SAMPLE_METRIC);
        assert_eq!(first.described_object.name, SAMPLE_OBJECT);
        assert_eq!(first.described_object.namespace.as_deref(), Some("default"));
        assert_eq!(first.described_object.api_version, "/__internal");

        let second = provider
            .get_namespaced_metric_by_name(&pods(), SAMPLE_NAMESPACE, SAMPLE_OBJECT, SAMPLE_METRIC)
            .await
            .unwrap();
        assert_eq!(second.value.milli_value(), 2000);
    }

    #[tokio::test]
    async fn test_described_object_uses_resource_group() {
        let provider = provider();

        let value = provider
            .get_namespaced_metric_by_name(
                &GroupResource::new("apps", "deployments"),
                SAMPLE_NAMESPACE,
                SAMPLE_OBJECT,
                SAMPLE_METRIC,
            )
            .await
            .unwrap();

        assert_eq!(value.described_object.api_version, "apps/__internal");
    }

    #[tokio::test]
    async fn test_value_wraps_to_zero() {
        let provider = provider();

        for _ in 0..30 {
            provider
                .get_namespaced_metric_by_name(&pods(), "default", SAMPLE_OBJECT, SAMPLE_METRIC)
                .await
                .unwrap();
        }

        let wrapped = provider
            .get_namespaced_metric_by_name(&pods(), "default", SAMPLE_OBJECT, SAMPLE_METRIC)
            .await
            .unwrap();
        assert_eq!(wrapped.value.milli_value(), 0);
        assert_eq!(wrapped.value.to_string(), "0");
    }

    #[tokio::test]
    async fn test_near_misses_are_not_found() {
        let provider = provider();

        let cases = [
            ("Default", SAMPLE_OBJECT, SAMPLE_METRIC),
            ("kube-system", SAMPLE_OBJECT, SAMPLE_METRIC),
            ("default", "sample-metrics-app-2", SAMPLE_METRIC),
            ("default", "Sample-Metrics-App", SAMPLE_METRIC),
            ("default", SAMPLE_OBJECT, "this-is-my-custom-metric"),
            ("default", SAMPLE_OBJECT, "HTTP_REQUESTS_CUSTOM_METRIC"),
        ];

        for (namespace, name, metric) in cases {
            let err = provider
                .get_namespaced_metric_by_name(&pods(), namespace, name, metric)
                .await
                .unwrap_err();
            match err {
                ProviderError::NotFound { metric: m } => assert_eq!(m, metric),
                other => panic!("expected NotFound, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_misses_do_not_advance_generator() {
        let provider = provider();

        let _ = provider
            .get_namespaced_metric_by_name(&pods(), "Default", SAMPLE_OBJECT, SAMPLE_METRIC)
            .await;
        assert_eq!(provider.backend().generator().current().await, 0);

        let value = provider
            .get_namespaced_metric_by_name(&pods(), "default", SAMPLE_OBJECT, SAMPLE_METRIC)
            .await
            .unwrap();
        assert_eq!(value.value.milli_value(), 1000);
    }

    #[tokio::test]
    async fn test_unimplemented_paths_never_succeed() {
        let provider = provider();
        let selector = Selector::new("app=sample-metrics-app");

        let err = provider
            .get_root_scoped_metric_by_name(&pods(), SAMPLE_OBJECT, SAMPLE_METRIC)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));

        let err = provider
            .get_root_scoped_metric_by_selector(&pods(), &selector, SAMPLE_METRIC)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { .. }));

        let err = provider
            .get_namespaced_metric_by_selector(&pods(), "default", &Selector::everything(), SAMPLE_METRIC)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { .. }));
        assert!(err.is_not_found());

        // None of the rejected paths touched the counter
        assert_eq!(provider.backend().generator().current().await, 0);
    }

    #[tokio::test]
    async fn test_resolve_dispatches_by_query_shape() {
        let provider = provider();

        let query = MetricQuery::NamespacedByName {
            group_resource: pods(),
            namespace: "default".to_string(),
            name: SAMPLE_OBJECT.to_string(),
            metric_name: SAMPLE_METRIC.to_string(),
        };
        let list = provider.resolve(&query).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.items[0].value.milli_value(), 1000);
        assert_eq!(
            list.metadata.self_link,
            "/apis/custom.metrics.k8s.io/v1beta1/namespaces/default/pods/sample-metrics-app/http_requests_custom_metric"
        );

        let query = MetricQuery::RootBySelector {
            group_resource: pods(),
            selector: Selector::everything(),
            metric_name: SAMPLE_METRIC.to_string(),
        };
        assert!(provider.resolve(&query).await.unwrap_err().is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolution_has_no_lost_updates() {
        let provider = Arc::new(provider());
        let n = 20;

        let handles: Vec<_> = (0..n)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move {
                    provider
                        .get_namespaced_metric_by_name(
                            &GroupResource::core("pods"),
                            "default",
                            SAMPLE_OBJECT,
                            SAMPLE_METRIC,
                        )
                        .await
                        .unwrap()
                        .value
                        .milli_value()
                })
            })
            .collect();

        let mut values = HashSet::new();
        for handle in handles {
            assert!(values.insert(handle.await.unwrap()), "duplicate value");
        }

        let expected: HashSet<i64> = (1..=n).map(|i| i * 1000).collect();
        assert_eq!(values, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolution_wraps_without_lost_updates() {
        let provider = Arc::new(provider());
        // Two full periods of 0..=30
        let n = 62;

        let handles: Vec<_> = (0..n)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move {
                    provider
                        .get_namespaced_metric_by_name(
                            &pods(),
                            SAMPLE_NAMESPACE,
                            SAMPLE_OBJECT,
                            SAMPLE_METRIC,
                        )
                        .await
                        .unwrap()
                        .value
                        .milli_value()
                })
            })
            .collect();

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for handle in handles {
            *counts.entry(handle.await.unwrap()).or_default() += 1;
        }

        assert_eq!(counts.len(), 31);
        for value in 0..=30 {
            assert_eq!(counts.get(&(value * 1000)), Some(&2), "value {value}");
        }
    }
}

#[cfg(test)]
mod backend_tests {
    use crate::error::{ProviderError, ProviderResult};
    use crate::models::GroupResource;
    use crate::observability::StructuredLogger;
    use crate::provider::{
        async_trait, CustomMetricsProvider, MetricBackend, ObjectIdentity, SampleMetricsProvider,
    };

    /// Backend reporting a fixed value for any object in one namespace
    struct FixedBackend {
        namespace: &'static str,
        value: i64,
    }

    #[async_trait]
    impl MetricBackend for FixedBackend {
        async fn counter(&self, object: &ObjectIdentity<'_>) -> ProviderResult<Option<i64>> {
            Ok((object.namespace == Some(self.namespace)).then_some(self.value))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl MetricBackend for FailingBackend {
        async fn counter(&self, _object: &ObjectIdentity<'_>) -> ProviderResult<Option<i64>> {
            Err(ProviderError::Backend("telemetry store unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_custom_backend_is_pluggable() {
        let provider = SampleMetricsProvider::with_backend(
            FixedBackend {
                namespace: "prod",
                value: 7,
            },
            StructuredLogger::new("test-adapter"),
        );

        let value = provider
            .get_namespaced_metric_by_name(&GroupResource::core("pods"), "prod", "web-0", "qps")
            .await
            .unwrap();
        assert_eq!(value.value.milli_value(), 7000);
        assert_eq!(value.value.to_string(), "7");

        let err = provider
            .get_namespaced_metric_by_name(&GroupResource::core("pods"), "dev", "web-0", "qps")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_backend_errors_are_returned() {
        let provider =
            SampleMetricsProvider::with_backend(FailingBackend, StructuredLogger::new("test-adapter"));

        let err = provider
            .get_namespaced_metric_by_name(&GroupResource::core("pods"), "default", "web-0", "qps")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Backend(_)));
        assert!(!err.is_not_found());
    }
}
