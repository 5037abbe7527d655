//! Adapter options
//!
//! Options are read from the environment (`ADAPTER_` prefix, `__` between
//! nested sections, e.g. `ADAPTER_SECURE_SERVING__PORT=6443`), completed with
//! defaults and validated before the server configuration is derived from
//! them.

use crate::error::AdapterError;
use crate::server::ServerRuntimeConfig;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub(crate) const DEFAULT_NAME: &str = "custom-metrics-adapter";

/// Options for the serving endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SecureServingOptions {
    pub bind_address: String,
    pub port: u16,
    /// Directory holding generated serving certificates
    pub cert_dir: PathBuf,
    pub tls_cert_file: Option<PathBuf>,
    pub tls_private_key_file: Option<PathBuf>,
}

impl Default for SecureServingOptions {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: 6443,
            cert_dir: default_cert_dir(),
            tls_cert_file: None,
            tls_private_key_file: None,
        }
    }
}

/// Delegated authentication options, passed through to the runtime
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthenticationOptions {
    pub kubeconfig: Option<PathBuf>,
    pub skip_in_cluster_lookup: bool,
}

/// Delegated authorization options, passed through to the runtime
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthorizationOptions {
    pub kubeconfig: Option<PathBuf>,
    /// Paths served without an authorization check
    pub always_allow_paths: Vec<String>,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            always_allow_paths: default_always_allow_paths(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeatureOptions {
    pub enable_profiling: bool,
    pub enable_contention_profiling: bool,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            enable_profiling: true,
            enable_contention_profiling: false,
        }
    }
}

/// All options accepted by the adapter
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Name the server identifies itself with
    pub name: String,
    pub secure_serving: SecureServingOptions,
    pub authentication: AuthenticationOptions,
    pub authorization: AuthorizationOptions,
    pub features: FeatureOptions,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            secure_serving: SecureServingOptions::default(),
            authentication: AuthenticationOptions::default(),
            authorization: AuthorizationOptions::default(),
            features: FeatureOptions::default(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_cert_dir() -> PathBuf {
    PathBuf::from("apiserver.local.config/certificates")
}

fn default_always_allow_paths() -> Vec<String> {
    vec!["/healthz".to_string(), "/readyz".to_string()]
}

impl AdapterOptions {
    /// Environment source the options are read from
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix("ADAPTER")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("authorization.always_allow_paths")
    }

    /// Load options from the process environment
    pub fn load() -> Result<Self, AdapterError> {
        Self::load_from(Self::environment())
    }

    pub fn load_from(environment: config::Environment) -> Result<Self, AdapterError> {
        let config = config::Config::builder().add_source(environment).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Fill in defaults for options left empty
    pub fn complete(&mut self) {
        if self.name.trim().is_empty() {
            self.name = DEFAULT_NAME.to_string();
        }
        if self.secure_serving.bind_address.trim().is_empty() {
            self.secure_serving.bind_address = default_bind_address();
        }
        if self.secure_serving.cert_dir.as_os_str().is_empty() {
            self.secure_serving.cert_dir = default_cert_dir();
        }
        if self.authorization.always_allow_paths.is_empty() {
            self.authorization.always_allow_paths = default_always_allow_paths();
        }
    }

    /// Check option consistency, reporting every problem found
    pub fn validate(&self) -> Result<(), AdapterError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("name must not be empty".to_string());
        }

        if self.secure_serving.bind_address.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "secure_serving.bind_address {:?} is not a valid IP address",
                self.secure_serving.bind_address
            ));
        }

        match (
            &self.secure_serving.tls_cert_file,
            &self.secure_serving.tls_private_key_file,
        ) {
            (Some(_), None) => {
                errors.push("secure_serving.tls_cert_file requires tls_private_key_file".to_string())
            }
            (None, Some(_)) => {
                errors.push("secure_serving.tls_private_key_file requires tls_cert_file".to_string())
            }
            _ => {}
        }

        if self.features.enable_contention_profiling && !self.features.enable_profiling {
            errors.push("contention profiling requires profiling to be enabled".to_string());
        }

        if let Some(path) = self
            .authorization
            .always_allow_paths
            .iter()
            .find(|p| !p.starts_with('/'))
        {
            errors.push(format!(
                "authorization.always_allow_paths entry {:?} must start with '/'",
                path
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AdapterError::Configuration(errors.join("; ")))
        }
    }

    /// Derive the server runtime configuration
    pub fn config(&self) -> Result<ServerRuntimeConfig, AdapterError> {
        let ip: IpAddr = self.secure_serving.bind_address.parse().map_err(|_| {
            AdapterError::Configuration(format!(
                "secure_serving.bind_address {:?} is not a valid IP address",
                self.secure_serving.bind_address
            ))
        })?;

        Ok(ServerRuntimeConfig::new(
            self.name.clone(),
            SocketAddr::new(ip, self.secure_serving.port),
        )
        .with_secure_serving(self.secure_serving.clone())
        .with_authentication(self.authentication.clone())
        .with_authorization(self.authorization.clone())
        .with_features(self.features.clone()))
    }
}
