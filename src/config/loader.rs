//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::DynconfConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `store.database_url`.
pub const DATABASE_URL_ENV: &str = "DYNCONF_DATABASE_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DynconfConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content, std::env::var(DATABASE_URL_ENV).ok())
}

/// Parse and validate TOML text, applying a database URL override if given.
pub fn parse_config(
    content: &str,
    database_url: Option<String>,
) -> Result<DynconfConfig, ConfigError> {
    let mut config: DynconfConfig = toml::from_str(content)?;
    apply_overrides(&mut config, database_url);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment-sourced settings on top of a parsed config.
pub fn apply_overrides(config: &mut DynconfConfig, database_url: Option<String>) {
    if let Some(url) = database_url.filter(|url| !url.is_empty()) {
        config.store.database_url = url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    #[test]
    fn test_env_override_satisfies_postgres_backend() {
        let toml = "[store]\nbackend = \"postgres\"\n";
        assert!(matches!(
            parse_config(toml, None),
            Err(ConfigError::Validation(_))
        ));

        let config = parse_config(toml, Some("postgres://db/dynconf".to_string())).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.database_url, "postgres://db/dynconf");
    }

    #[test]
    fn test_parse_error_reported() {
        let err = parse_config("[cache]\nrefresh_interval_ms = \"soon\"", None).unwrap_err();
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = parse_config("[cache]\nrefresh_interval_ms = 0\nrefresh_timeout_ms = 0", None)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("cache.refresh_interval_ms"));
        assert!(message.contains("cache.refresh_timeout_ms"));
    }

    #[test]
    fn test_sample_config_parses() {
        let config = parse_config(include_str!("../../dynconf.example.toml"), None).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.cache.refresh_interval_ms, 1000);
        assert!(config.admin.api_key.is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/dynconf.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
