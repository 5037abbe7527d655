//! Custom metrics adapter library
//!
//! This crate provides:
//! - The metric identity and query model of the custom metrics API
//! - A provider contract with a pluggable backend and a synthetic reference backend
//! - Options, server runtime and the adapter lifecycle with graceful shutdown
//! - Health checks and observability

pub mod error;
pub mod generator;
pub mod health;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod options;
pub mod provider;
pub mod server;

pub use error::{AdapterError, ProviderError, ProviderResult};
pub use generator::SyntheticGenerator;
pub use health::{HealthRegistry, HealthResponse, LifecycleState, ReadinessResponse};
pub use lifecycle::CustomMetricsAdapter;
pub use models::*;
pub use observability::{AdapterMetrics, StructuredLogger};
pub use options::AdapterOptions;
pub use provider::{CustomMetricsProvider, MetricBackend, SampleMetricsProvider, SyntheticBackend};
pub use server::{AdapterServer, ServerRuntimeConfig, StopSignal};
