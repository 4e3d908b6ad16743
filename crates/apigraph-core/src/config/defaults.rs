//! Default values for apigraph configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Cache Defaults
// ============================================================================

/// Whether fetched remote documents are cached on disk.
pub const DEFAULT_CACHE_ENABLED: bool = true;

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".apigraph";

// ============================================================================
// HTTP Defaults
// ============================================================================

/// Default timeout for fetching remote documents (seconds).
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default user agent sent when fetching remote documents.
pub const DEFAULT_USER_AGENT: &str = concat!("apigraph/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Logging Defaults
// ============================================================================

/// Default log level used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ============================================================================
// Config File Locations
// ============================================================================

/// Project-local config file name.
pub const LOCAL_CONFIG_FILE: &str = "apigraph.toml";

/// Subdirectory of the user config dir holding `config.toml`.
pub const USER_CONFIG_DIR: &str = "apigraph";

/// User config file name.
pub const USER_CONFIG_FILE: &str = "config.toml";
