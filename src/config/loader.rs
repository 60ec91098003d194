//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [server]
            address = "127.0.0.1"
            port = 9000

            [observability]
            log_level = "debug"
            metrics_enabled = false

            [[routes]]
            frontend = { methods = ["GET"], path = "/users/:id" }
            backend = { url = "http://127.0.0.1:3000/users" }
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen_address(), "127.0.0.1:9000");
        assert_eq!(config.observability.log_level, "debug");
        assert!(!config.observability.metrics_enabled);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].frontend.path, "/users/:id");
        assert_eq!(
            config.routes[0].backend.url().unwrap().as_str(),
            "http://127.0.0.1:3000/users"
        );
    }

    #[test]
    fn all_sections_are_optional() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen_address(), "0.0.0.0:8080");
        assert!(config.routes.is_empty());
    }
}
