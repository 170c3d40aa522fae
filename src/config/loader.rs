//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.dispatch.breaker_threshold, 5);
        assert!(config.handlers.health);
        assert!(config.handlers.hosts.is_none());
    }

    #[test]
    fn parses_handler_sections() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [handlers]
            reload_interval_ms = 0

            [[handlers.redirects]]
            name = "links"
            file = "redirects.yml"

            [[handlers.redirects]]
            name = "team"
            file = "team.yml"
            timeout_ms = 3000

            [handlers.hosts]
            file = "hosts.yml"
            "#,
        )
        .unwrap();

        assert_eq!(config.handlers.reload_interval_ms, 0);
        assert_eq!(config.handlers.redirects.len(), 2);
        assert_eq!(config.handlers.redirects[1].timeout_ms, Some(3000));
        assert_eq!(config.handlers.redirects[0].connect_timeout_ms, 2000);
        let hosts = config.handlers.hosts.unwrap();
        assert_eq!(hosts.name, "hosts");
        assert_eq!(hosts.timeout_ms, 5000);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = parse_config("[dispatch]\nbreaker_threshold = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("dispatch.breaker_threshold"));
    }

    #[test]
    fn reports_missing_file() {
        let err = load_config(Path::new("/nonexistent/router.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn reports_syntax_errors() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));
    }
}
