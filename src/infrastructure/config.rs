//! Application configuration management.
//!
//! Configuration is read once at startup from environment variables (after
//! `.env` has been loaded). Parsing goes through a lookup function so the
//! same code can be driven from a map in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = AppConfig::from_env()?;
//! let address = config.server.socket_address()?;
//! ```

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use super::credentials::StaticTokenVerifier;
use super::factory::RepositoryConfig;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 5000;
/// Default provider model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
/// Default provider endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default per-call provider timeout in milliseconds.
pub const DEFAULT_AI_TIMEOUT_MS: u64 = 10_000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid storage mode value.
    #[error("Invalid storage mode: '{0}'. Expected 'in_memory' or 'postgres'")]
    InvalidStorageMode(String),

    /// Missing `DATABASE_URL` when storage mode is Postgres.
    #[error("DATABASE_URL environment variable is required when STORAGE_MODE=postgres")]
    MissingDatabaseUrl,

    /// An `AUTH_TOKENS` entry is not of the form `token=owner`.
    #[error("Invalid AUTH_TOKENS entry '{0}': expected token=owner")]
    InvalidAuthToken(String),

    /// A variable has a value that cannot be used.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The name of the environment variable.
        key: String,
        /// Description of why the value is invalid.
        message: String,
    },
}

// =============================================================================
// Lookup Helpers
// =============================================================================

/// Reads a variable, treating empty or whitespace-only values as unset.
pub(crate) fn optional_value(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Reads and parses a variable, falling back to `default` when unset.
fn parsed_value<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_value(lookup, key).map_or(Ok(default), |value| {
        value.parse().map_err(|error: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{value}': {error}"),
        })
    })
}

// =============================================================================
// Server Configuration
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Resolves host and port into a socket address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `HOST` is not an IP address.
    pub fn socket_address(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|error: std::net::AddrParseError| ConfigError::InvalidValue {
                key: "HOST".to_string(),
                message: format!("'{}': {error}", self.host),
            })
    }
}

// =============================================================================
// AI Configuration
// =============================================================================

/// Settings for the generative-text provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AiConfig {
    /// Provider API key. `None` disables the provider entirely.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_AI_TIMEOUT_MS),
        }
    }
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Everything the server needs to start.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub repository: RepositoryConfig,
    pub credentials: StaticTokenVerifier,
    pub ai: AiConfig,
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HOST`, `PORT`: listener (default `0.0.0.0:5000`)
    /// - `STORAGE_MODE`, `DATABASE_URL`: see [`RepositoryConfig`]
    /// - `AUTH_TOKENS`: `token=owner` pairs, comma separated
    /// - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`, `AI_TIMEOUT_MS`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: optional_value(&lookup, "HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parsed_value(&lookup, "PORT", DEFAULT_PORT)?,
        };

        let repository = RepositoryConfig::from_lookup(&lookup)?;

        let credentials = optional_value(&lookup, "AUTH_TOKENS")
            .map(|value| StaticTokenVerifier::parse(&value))
            .transpose()?
            .unwrap_or_default();

        let timeout_ms = parsed_value(&lookup, "AI_TIMEOUT_MS", DEFAULT_AI_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AI_TIMEOUT_MS".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        let ai = AiConfig {
            api_key: optional_value(&lookup, "GEMINI_API_KEY"),
            model: optional_value(&lookup, "GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: optional_value(&lookup, "GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_millis(timeout_ms),
        };

        Ok(Self {
            server,
            repository,
            credentials,
            ai,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::factory::StorageMode;
    use crate::infrastructure::CredentialVerifier;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[rstest]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.repository.storage_mode, StorageMode::InMemory);
        assert!(config.credentials.is_empty());
        assert_eq!(config.ai, AiConfig::default());
        assert_eq!(config.ai.model, "gemini-1.5-flash");
        assert_eq!(config.ai.timeout, Duration::from_secs(10));
    }

    #[rstest]
    fn test_full_configuration() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("AUTH_TOKENS", "abc=u1, def=u2"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("GEMINI_BASE_URL", "http://localhost:9999"),
            ("AI_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();

        assert_eq!(
            config.server.socket_address().unwrap(),
            "127.0.0.1:8080".parse().unwrap()
        );
        assert_eq!(config.credentials.len(), 2);
        assert_eq!(
            config.credentials.verify("def").map(|owner| owner.to_string()),
            Some("u2".to_string())
        );
        assert_eq!(config.ai.api_key.as_deref(), Some("secret"));
        assert_eq!(config.ai.model, "gemini-2.0-flash");
        assert_eq!(config.ai.base_url, "http://localhost:9999");
        assert_eq!(config.ai.timeout, Duration::from_millis(2500));
    }

    #[rstest]
    #[case("PORT", "abc")]
    #[case("PORT", "70000")]
    #[case("AI_TIMEOUT_MS", "soon")]
    #[case("AI_TIMEOUT_MS", "0")]
    fn test_invalid_numeric_values(#[case] key: &str, #[case] value: &str) {
        let error = AppConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
        match error {
            ConfigError::InvalidValue { key: reported, .. } => assert_eq!(reported, key),
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[rstest]
    fn test_invalid_storage_mode_aborts() {
        let error = AppConfig::from_lookup(lookup(&[("STORAGE_MODE", "mysql")])).unwrap_err();
        assert_eq!(error, ConfigError::InvalidStorageMode("mysql".to_string()));
    }

    #[rstest]
    fn test_malformed_auth_tokens_abort() {
        let error = AppConfig::from_lookup(lookup(&[("AUTH_TOKENS", "abc")])).unwrap_err();
        assert_eq!(error, ConfigError::InvalidAuthToken("abc".to_string()));
    }

    #[rstest]
    fn test_blank_api_key_is_treated_as_missing() {
        let config = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap();
        assert!(config.ai.api_key.is_none());
    }

    #[rstest]
    fn test_invalid_host_is_reported_on_resolution() {
        let server = ServerConfig {
            host: "not a host".to_string(),
            port: 5000,
        };
        assert!(matches!(
            server.socket_address(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[rstest]
    fn test_ai_config_debug_redacts_key() {
        let config = AiConfig {
            api_key: Some("super-secret".to_string()),
            ..AiConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
