//! Configuration management for apigraph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `apigraph.toml` file
//! 3. User config `~/.config/apigraph/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Disk cache for fetched documents.
    pub cache: CacheConfig,

    /// Remote document fetching.
    pub http: HttpConfig,

    /// Log output (consumed by the CLI).
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./apigraph.toml` (project local)
    /// 2. `~/.config/apigraph/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides apply in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(LOCAL_CONFIG_FILE).exists() {
            return Self::from_file(LOCAL_CONFIG_FILE);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = std::env::var("APIGRAPH_CACHE_DIR") {
            self.cache.dir = dir;
        }
        if let Ok(expire) = std::env::var("APIGRAPH_CACHE_EXPIRE") {
            let secs = expire.parse().map_err(|_| {
                ConfigError::Invalid(format!("APIGRAPH_CACHE_EXPIRE must be seconds, got {expire:?}"))
            })?;
            self.cache.expire_secs = Some(secs);
        }
        if let Ok(enabled) = std::env::var("APIGRAPH_CACHE_ENABLED") {
            self.cache.enabled = matches!(enabled.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(timeout) = std::env::var("APIGRAPH_HTTP_TIMEOUT") {
            self.http.timeout_secs = timeout.parse().map_err(|_| {
                ConfigError::Invalid(format!("APIGRAPH_HTTP_TIMEOUT must be seconds, got {timeout:?}"))
            })?;
        }
        if let Ok(level) = std::env::var("APIGRAPH_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Disk cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache remote documents on disk.
    pub enabled: bool,

    /// Cache directory.
    pub dir: String,

    /// Seconds after which a cached document is refetched. Unset means never.
    pub expire_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_CACHE_ENABLED,
            dir: DEFAULT_CACHE_DIR.to_string(),
            expire_secs: None,
        }
    }
}

impl CacheConfig {
    /// Cache directory as a path.
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }

    pub fn expiry(&self) -> Option<Duration> {
        self.expire_secs.map(Duration::from_secs)
    }
}

/// HTTP fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User agent header value.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "apigraph_core=debug").
    pub level: String,

    /// Emit JSON lines instead of human readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.dir, DEFAULT_CACHE_DIR);
        assert_eq!(config.cache.expire_secs, None);
        assert_eq!(config.http.timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert_eq!(config.logging.level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = Config::default_config_string();
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[http]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: Config = toml::from_str("[cache]\nexpire_secs = 60\n").unwrap();
        assert_eq!(config.cache.expiry(), Some(Duration::from_secs(60)));
        assert_eq!(config.cache.dir, DEFAULT_CACHE_DIR);
        assert_eq!(config.http.user_agent, DEFAULT_USER_AGENT);
    }
}
