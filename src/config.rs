//! Configuration for coindash
//!
//! Settings are read from a TOML file (by default
//! `~/.config/coindash/config.toml` on Linux). Every field has a default, so a
//! missing file or a partial file is fine.
//!
//! ```toml
//! [api]
//! api_key = "CG-..."
//!
//! [rate_limit]
//! capacity = 30
//! refill_interval_ms = 60000
//!
//! [cache]
//! default_ttl_ms = 60000
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::{DEFAULT_TTL, RESPONSE_TTL};
use crate::fetch::COINGECKO_BASE_URL;

/// Name of the config file inside the config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Market-data API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API root URL
    pub base_url: String,
    /// Demo-tier API key sent with every request
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 20,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Request budget enforced by the token bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Requests allowed per refill interval (burst size)
    pub capacity: u32,
    /// Length of the refill interval in milliseconds
    pub refill_interval_ms: u64,
    /// Give up waiting for a token after this many milliseconds
    pub acquire_timeout_ms: Option<u64>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            capacity: 30,
            refill_interval_ms: 60_000,
            acquire_timeout_ms: None,
        }
    }
}

impl RateLimitSettings {
    pub fn refill_interval(&self) -> Duration {
        Duration::from_millis(self.refill_interval_ms)
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// TTL for generic endpoint caching in milliseconds
    pub default_ttl_ms: u64,
    /// TTL for long-lived full-response caching in milliseconds
    pub response_ttl_ms: u64,
    /// Upper bound on cached responses (unbounded when absent)
    pub max_entries: Option<usize>,
    /// Share one network call between concurrent misses for the same request
    pub dedupe_in_flight: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_ms: DEFAULT_TTL.as_millis() as u64,
            response_ttl_ms: RESPONSE_TTL.as_millis() as u64,
            max_entries: None,
            dedupe_in_flight: false,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn response_ttl(&self) -> Duration {
        Duration::from_millis(self.response_ttl_ms)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub rate_limit: RateLimitSettings,
    pub cache: CacheSettings,
}

impl Config {
    /// Default config file location, if a home directory can be determined
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "coindash")?;
        Some(project_dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads configuration
    ///
    /// # Arguments
    /// * `path` - Explicit config file; it must exist. When `None`, the
    ///   default location is used and a missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file without validating it
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Rejects settings the limiter or HTTP client cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.capacity == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.capacity must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.refill_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.refill_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache.max_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Replaces the API key when one is given (e.g. from the command line)
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if api_key.is_some() {
            self.api.api_key = api_key;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_api_budget() {
        let config = Config::default();

        assert_eq!(config.rate_limit.capacity, 30);
        assert_eq!(config.rate_limit.refill_interval(), Duration::from_secs(60));
        assert!(config.rate_limit.acquire_timeout().is_none());
        assert_eq!(config.cache.default_ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.response_ttl(), Duration::from_secs(20 * 60));
        assert_eq!(config.api.base_url, COINGECKO_BASE_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [rate_limit]
            capacity = 10
            acquire_timeout_ms = 5000
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.capacity, 10);
        assert_eq!(config.rate_limit.refill_interval_ms, 60_000);
        assert_eq!(config.rate_limit.acquire_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.cache, CacheSettings::default());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = Config::from_toml("[rate_limit]\ncapacity = \"lots\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = Config::default();
        config.rate_limit.capacity = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.rate_limit.refill_interval_ms = 0;

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_reads_explicit_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[api]\napi_key = \"CG-test\"\n\n[cache]\ndedupe_in_flight = true\nmax_entries = 100\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.api.api_key.as_deref(), Some("CG-test"));
        assert!(config.cache.dedupe_in_flight);
        assert_eq!(config.cache.max_entries, Some(100));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("absent.toml");

        let result = Config::load(Some(&path));

        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_validates_file_contents() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[rate_limit]\ncapacity = 0\n").unwrap();

        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_with_api_key_overrides_only_when_given() {
        let mut config = Config::default();
        config.api.api_key = Some("from-file".to_string());

        let kept = config.clone().with_api_key(None);
        let replaced = config.with_api_key(Some("from-cli".to_string()));

        assert_eq!(kept.api.api_key.as_deref(), Some("from-file"));
        assert_eq!(replaced.api.api_key.as_deref(), Some("from-cli"));
    }

    #[test]
    fn test_default_path_is_named_after_project() {
        if let Some(path) = Config::default_path() {
            let path_str = path.to_string_lossy();
            assert!(path_str.contains("coindash"));
            assert!(path_str.ends_with(CONFIG_FILE_NAME));
        }
        // Test passes if no home directory is available (e.g., in CI)
    }
}
