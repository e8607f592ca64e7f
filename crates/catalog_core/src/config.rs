//! Runtime configuration for embedding the catalog.
//!
//! # Responsibility
//! - Describe where the store lives and how logging is set up.
//! - Load settings from JSON with per-field defaults.
//!
//! # Invariants
//! - A config returned by `from_json_str`/`from_file` has passed `validate`.

use crate::db::{self, DbResult};
use crate::logging::{self, default_log_level, normalize_level};
use crate::repo::product_repo::DEFAULT_LIST_LIMIT;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Catalog settings. Missing JSON keys take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite file; `None` opens a private in-memory store.
    pub database_path: Option<PathBuf>,
    /// How long a write waits for another connection's lock.
    pub busy_timeout_ms: u64,
    pub log_level: String,
    /// Absolute directory for rolling logs; `None` leaves logging off.
    pub log_dir: Option<PathBuf>,
    /// Page size for list calls that do not set one.
    pub default_page_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
            default_page_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "malformed catalog config: {err}"),
            Self::Invalid(message) => write!(f, "invalid catalog config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl CatalogConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if self.default_page_limit == 0 {
            return Err(ConfigError::Invalid(
                "default_page_limit must be positive".to_string(),
            ));
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Opens and migrates the configured store.
    pub fn open_store(&self) -> DbResult<Connection> {
        match &self.database_path {
            Some(path) => db::open_db_with_busy_timeout(path, self.busy_timeout()),
            None => db::open_db_in_memory(),
        }
    }

    /// Starts file logging when `log_dir` is set.
    ///
    /// Returns `Ok(false)` when logging is not configured.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(dir) = &self.log_dir else {
            return Ok(false);
        };
        let dir = dir
            .to_str()
            .ok_or_else(|| format!("log_dir is not valid UTF-8: `{}`", dir.display()))?;
        logging::init_logging(&self.log_level, dir)?;
        Ok(true)
    }
}
