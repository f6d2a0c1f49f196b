//! Configuration loading from disk.

use std::path::Path;
use std::fs;
use crate::config::schema::ProxyConfig;
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
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(parse_config("").unwrap(), ProxyConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [listener]
            port = 8080

            [headers]
            user_agent = "probe/1.0"

            [timeouts]
            connect_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.listener.bind_host, "0.0.0.0");
        assert_eq!(config.headers.user_agent, "probe/1.0");
        assert_eq!(config.headers.connection, "close");
        assert_eq!(config.timeouts.connect_secs, Some(3));
        assert_eq!(config.timeouts.idle_secs, None);
        assert_eq!(config.limits.max_line_bytes, 8_192);
    }

    #[test]
    fn syntax_and_semantic_errors_are_distinguished() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            parse_config("[listener]\nport = 0"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/forward-proxy.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
