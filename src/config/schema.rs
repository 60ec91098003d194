//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address and port).
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route definitions mapping request paths to backends.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0").
    pub address: String,

    /// Bind port.
    pub port: u16,
}

impl ServerConfig {
    /// The joined `address:port` the listener binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// One route: the request surface it matches and the backend it
/// forwards to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    pub frontend: FrontendConfig,
    pub backend: BackendConfig,
}

/// The request surface of a route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrontendConfig {
    /// HTTP methods this route answers (e.g., ["GET", "POST"]).
    pub methods: Vec<String>,

    /// Route pattern; may contain `:name` and `*name` wildcards.
    pub path: String,
}

/// The upstream side of a route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Absolute URL of the backend, e.g. "http://127.0.0.1:3000/api".
    pub url: String,
}

impl BackendConfig {
    /// The backend URL, parsed.
    pub fn url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.url)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
