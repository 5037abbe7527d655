//! Server runtime for the custom metrics API
//!
//! This module provides:
//! - The runtime configuration derived from adapter options
//! - A bound server handle serving a provider until stopped
//! - The one-shot stop signal used for graceful shutdown

mod routes;
mod signal;

pub use routes::{create_router, parse_metric_path, AppState, API_ROOT};
pub use signal::StopSignal;

use crate::error::AdapterError;
use crate::health::HealthRegistry;
use crate::observability::AdapterMetrics;
use crate::options::{
    AuthenticationOptions, AuthorizationOptions, FeatureOptions, SecureServingOptions,
};
use crate::provider::CustomMetricsProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Configuration of the server runtime.
///
/// Serving, authentication, authorization and feature settings are carried
/// as supplied; the adapter itself only toggles `enable_metrics`.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    name: String,
    listen: SocketAddr,
    /// Expose the runtime's own Prometheus metrics on `/metrics`
    pub enable_metrics: bool,
    secure_serving: SecureServingOptions,
    authentication: AuthenticationOptions,
    authorization: AuthorizationOptions,
    features: FeatureOptions,
}

impl ServerRuntimeConfig {
    pub fn new(name: impl Into<String>, listen: SocketAddr) -> Self {
        Self {
            name: name.into(),
            listen,
            enable_metrics: false,
            secure_serving: SecureServingOptions::default(),
            authentication: AuthenticationOptions::default(),
            authorization: AuthorizationOptions::default(),
            features: FeatureOptions::default(),
        }
    }

    pub fn with_secure_serving(mut self, options: SecureServingOptions) -> Self {
        self.secure_serving = options;
        self
    }

    pub fn with_authentication(mut self, options: AuthenticationOptions) -> Self {
        self.authentication = options;
        self
    }

    pub fn with_authorization(mut self, options: AuthorizationOptions) -> Self {
        self.authorization = options;
        self
    }

    pub fn with_features(mut self, options: FeatureOptions) -> Self {
        self.features = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listen(&self) -> SocketAddr {
        self.listen
    }

    pub fn features(&self) -> &FeatureOptions {
        &self.features
    }

    /// Bind the listener and build a server for `provider`
    pub async fn new_server(
        self,
        provider: Arc<dyn CustomMetricsProvider>,
        health_registry: HealthRegistry,
    ) -> Result<AdapterServer, AdapterError> {
        if self.secure_serving.tls_cert_file.is_some() {
            warn!(
                cert_dir = %self.secure_serving.cert_dir.display(),
                "TLS material configured; TLS is terminated in front of this runtime"
            );
        }
        if self.authentication.kubeconfig.is_some() || self.authorization.kubeconfig.is_some() {
            warn!("Delegated authn/authz configured; requests are not authenticated by this runtime");
        }

        let listener = TcpListener::bind(self.listen)
            .await
            .map_err(|source| AdapterError::RuntimeStart {
                addr: self.listen,
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| AdapterError::RuntimeStart {
                addr: self.listen,
                source,
            })?;

        let metrics = self.enable_metrics.then(AdapterMetrics::new);
        let state = Arc::new(AppState::new(provider, health_registry, metrics));

        Ok(AdapterServer {
            name: self.name,
            listener,
            local_addr,
            router: create_router(state),
        })
    }
}

/// A bound server, ready to run
pub struct AdapterServer {
    name: String,
    listener: TcpListener,
    local_addr: SocketAddr,
    router: axum::Router,
}

impl AdapterServer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `stop` fires, then drain in-flight requests
    pub async fn run(self, stop: StopSignal) -> Result<(), AdapterError> {
        self.run_until(async move { stop.wait().await }).await
    }

    /// Serve until `shutdown` resolves.
    ///
    /// New connections are refused once `shutdown` completes; requests
    /// already in flight finish before this returns.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), AdapterError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(name = %self.name, addr = %self.local_addr, "Starting custom metrics API server");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(AdapterError::Serve)?;

        info!(name = %self.name, "Custom metrics API server stopped");
        Ok(())
    }
}
