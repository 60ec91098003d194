//! Configuration validation logic.

use crate::config::schema::GatewayConfig;

const KNOWN_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
];

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.0)
    }
}

/// Validate a GatewayConfig for semantic correctness.
///
/// Syntactic problems are serde's job; this pass checks the things a
/// well-formed document can still get wrong. Route pattern conflicts
/// are left to router construction, which reports them precisely.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (i, route) in config.routes.iter().enumerate() {
        let frontend = &route.frontend;

        if frontend.methods.is_empty() {
            errors.push(ValidationError(format!(
                "route #{i} ('{}') declares no methods",
                frontend.path
            )));
        }

        for method in &frontend.methods {
            if !KNOWN_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
                errors.push(ValidationError(format!(
                    "route #{i} ('{}') uses unknown method '{method}'",
                    frontend.path
                )));
            }
        }

        if !frontend.path.starts_with('/') {
            errors.push(ValidationError(format!(
                "route #{i} path '{}' must start with '/'",
                frontend.path
            )));
        }

        match route.backend.url() {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    errors.push(ValidationError(format!(
                        "route #{i} backend url '{}' must use http or https",
                        route.backend.url
                    )));
                } else if url.host_str().is_none() {
                    errors.push(ValidationError(format!(
                        "route #{i} backend url '{}' has no host",
                        route.backend.url
                    )));
                }
            }
            Err(e) => {
                errors.push(ValidationError(format!(
                    "route #{i} backend url '{}' is invalid: {e}",
                    route.backend.url
                )));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
