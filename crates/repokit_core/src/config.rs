//! Process-level configuration for core bootstrap.
//!
//! # Responsibility
//! - Collect database/logging settings from the environment.
//! - Keep parsing rules in one place so CLI and embedders agree.
//!
//! # Invariants
//! - Missing variables fall back to defaults; malformed values are errors.
//! - An empty `REPOKIT_DATABASE_PATH` means "in-memory database".

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATABASE_PATH: &str = "REPOKIT_DATABASE_PATH";
pub const ENV_LOG_LEVEL: &str = "REPOKIT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "REPOKIT_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "REPOKIT_BUSY_TIMEOUT_MS";

/// Core bootstrap settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file path. `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    /// Log level passed to `init_logging`.
    pub log_level: String,
    /// Absolute log directory. `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// Connection busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Used by `from_env` and by tests that must not touch process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                config.database_path = Some(PathBuf::from(trimmed));
            }
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            let trimmed = level.trim();
            if !trimmed.is_empty() {
                config.log_level = trimmed.to_ascii_lowercase();
            }
        }

        if let Some(dir) = lookup(ENV_LOG_DIR) {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                config.log_dir = Some(PathBuf::from(trimmed));
            }
        }

        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            let trimmed = raw.trim();
            config.busy_timeout_ms = trimmed.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                value: trimmed.to_string(),
            })?;
        }

        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Configuration parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {}
