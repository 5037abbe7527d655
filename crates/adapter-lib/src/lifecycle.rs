//! Adapter server lifecycle
//!
//! Drives `Created -> Configuring -> Running -> Stopped`. Any error on the
//! way is fatal: the state moves to `Failed` and the error is returned to
//! the caller, which is expected to exit.

use crate::error::AdapterError;
use crate::health::{HealthRegistry, LifecycleState};
use crate::observability::StructuredLogger;
use crate::options::{AdapterOptions, DEFAULT_NAME};
use crate::provider::{CustomMetricsProvider, SampleMetricsProvider};
use crate::server::StopSignal;
use std::sync::Arc;
use tracing::{error, info};

const ADAPTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the provider once options are known
pub type ProviderFactory =
    Box<dyn FnOnce(StructuredLogger) -> Arc<dyn CustomMetricsProvider> + Send>;

/// Where the adapter takes its options from
enum OptionsSource {
    Supplied(AdapterOptions),
    /// Read once the lifecycle enters `Configuring`
    Environment(config::Environment),
}

impl OptionsSource {
    fn resolve(self) -> Result<AdapterOptions, AdapterError> {
        match self {
            OptionsSource::Supplied(options) => Ok(options),
            OptionsSource::Environment(environment) => AdapterOptions::load_from(environment),
        }
    }
}

/// The adapter: options, provider construction and server lifecycle
pub struct CustomMetricsAdapter {
    options: OptionsSource,
    health_registry: HealthRegistry,
    provider_factory: ProviderFactory,
}

impl CustomMetricsAdapter {
    /// Adapter serving the reference provider
    pub fn new(options: AdapterOptions) -> Self {
        Self::with_options_source(OptionsSource::Supplied(options))
    }

    /// Adapter reading its options from the process environment
    pub fn from_env() -> Self {
        Self::from_environment(AdapterOptions::environment())
    }

    /// Adapter reading its options from `environment` during `Configuring`.
    ///
    /// Malformed values fail the lifecycle like any other configuration
    /// error.
    pub fn from_environment(environment: config::Environment) -> Self {
        Self::with_options_source(OptionsSource::Environment(environment))
    }

    fn with_options_source(options: OptionsSource) -> Self {
        Self {
            options,
            health_registry: HealthRegistry::new(),
            provider_factory: Box::new(
                |logger: StructuredLogger| -> Arc<dyn CustomMetricsProvider> {
                    Arc::new(SampleMetricsProvider::new(logger))
                },
            ),
        }
    }

    /// Replace the provider the adapter serves
    pub fn with_provider_factory<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(StructuredLogger) -> Arc<dyn CustomMetricsProvider> + Send + 'static,
    {
        self.provider_factory = Box::new(factory);
        self
    }

    /// Options supplied up front; `None` until an environment source is read
    pub fn options(&self) -> Option<&AdapterOptions> {
        match &self.options {
            OptionsSource::Supplied(options) => Some(options),
            OptionsSource::Environment(_) => None,
        }
    }

    /// Handle on the lifecycle state, usable while `run` is in progress
    pub fn health_registry(&self) -> HealthRegistry {
        self.health_registry.clone()
    }

    /// Configure, serve until `stop` fires, then shut down gracefully
    pub async fn run(self, stop: StopSignal) -> Result<(), AdapterError> {
        let health_registry = self.health_registry.clone();

        let result = self.run_inner(stop).await;
        if let Err(err) = &result {
            error!(error = %err, "Custom metrics adapter failed");
            health_registry.fail(err.to_string());
        }
        result
    }

    async fn run_inner(self, stop: StopSignal) -> Result<(), AdapterError> {
        let Self {
            options,
            health_registry,
            provider_factory,
        } = self;

        let name = match &options {
            OptionsSource::Supplied(options) => options.name.as_str(),
            OptionsSource::Environment(_) => DEFAULT_NAME,
        };
        enter(
            &health_registry,
            &StructuredLogger::new(name),
            LifecycleState::Configuring,
        );
        let mut options = options.resolve()?;
        info!(
            name = %options.name,
            bind_address = %options.secure_serving.bind_address,
            port = options.secure_serving.port,
            "Adapter configured"
        );
        options.complete();
        options.validate()?;

        let logger = StructuredLogger::new(&options.name);
        let mut config = options.config()?;
        config.enable_metrics = true;
        let enable_metrics = config.enable_metrics;

        let provider = provider_factory(logger.clone());
        let server = config.new_server(provider, health_registry.clone()).await?;

        enter(&health_registry, &logger, LifecycleState::Running);
        logger.log_startup(
            ADAPTER_VERSION,
            &server.local_addr().to_string(),
            enable_metrics,
        );

        let shutdown = {
            let health_registry = health_registry.clone();
            let logger = logger.clone();
            async move {
                stop.wait().await;
                logger.log_shutdown("stop signal received");
                enter(&health_registry, &logger, LifecycleState::Stopped);
            }
        };

        server.run_until(shutdown).await
    }
}

fn enter(health_registry: &HealthRegistry, logger: &StructuredLogger, next: LifecycleState) {
    if let Some(previous) = health_registry.transition(next) {
        logger.log_transition(previous.as_str(), next.as_str());
    }
}
