//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `token.secret`.
pub const SECRET_ENV: &str = "GATE_JWT_SECRET";

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
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse, apply environment overrides, and validate a TOML document.
pub fn parse_config(content: &str) -> Result<GateConfig, ConfigError> {
    let mut config: GateConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply overrides that must not live in config files.
pub fn apply_env_overrides(config: &mut GateConfig) {
    if let Ok(secret) = std::env::var(SECRET_ENV) {
        if !secret.trim().is_empty() {
            config.token.secret = secret;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::AuditMode;

    #[test]
    fn test_minimal_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.gate.login_path, "/login");
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.audit.mode, AuditMode::Await);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = parse_config(
            r#"
            [gate]
            public_paths = ["/login", "/pricing"]

            [rate_limit]
            max_requests = 5
            window_secs = 10

            [audit]
            mode = "detached"
            "#,
        )
        .unwrap();

        assert_eq!(config.gate.public_paths, vec!["/login", "/pricing"]);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 10);
        assert_eq!(config.audit.mode, AuditMode::Detached);
    }

    #[test]
    fn test_parse_and_validation_errors() {
        assert!(matches!(parse_config("[gate"), Err(ConfigError::Parse(_))));

        let err = parse_config("[rate_limit]\nwindow_secs = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors[0].field, "rate_limit.window_secs");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
