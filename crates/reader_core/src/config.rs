//! Runtime configuration for the reader core.
//!
//! # Responsibility
//! - Parse the TOML configuration file into typed sections.
//! - Provide defaults for every field so an empty file is valid.
//!
//! # Invariants
//! - Listing limits are strictly positive after validation.
//! - Unknown keys are rejected.

use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_LIST_LIMIT: u32 = 10;
const DEFAULT_DOCUMENT_LIMIT: u32 = 100_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub listing: ListingConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file; in-memory database when absent.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `trace`..`error`; build-profile default when absent.
    pub level: Option<String>,
    /// Log directory; file logging stays off when absent.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Page size used when a request carries no valid `limit`.
    pub default_limit: u32,
    /// Page size used when notes are filtered by document.
    pub document_limit: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIST_LIMIT,
            document_limit: DEFAULT_DOCUMENT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ReaderConfig {
    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ReaderConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listing.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "listing.default_limit",
                reason: "must be > 0".to_string(),
            });
        }
        if self.listing.document_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "listing.document_limit",
                reason: "must be > 0".to_string(),
            });
        }
        if let Some(level) = self.logging.level.as_deref() {
            if crate::logging::parse_level(level).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "logging.level",
                    reason: format!("unsupported level `{level}`"),
                });
            }
        }
        Ok(())
    }
}
