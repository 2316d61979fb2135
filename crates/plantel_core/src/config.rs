//! Runtime configuration for binaries embedding the core.
//!
//! Values come from environment variables with build-mode defaults:
//! - `PLANTEL_DB_PATH`: SQLite file, default `plantel.sqlite3` in the working
//!   directory.
//! - `PLANTEL_LOG_LEVEL`: `trace|debug|info|warn|error`, default per build
//!   mode.
//! - `PLANTEL_LOG_DIR`: absolute directory, default `<cwd>/logs`.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "PLANTEL_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "PLANTEL_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "PLANTEL_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "plantel.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "logs";

/// Errors from configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// A variable holds a value that cannot be used.
    InvalidValue { key: &'static str, message: String },
    /// Working directory is needed for a default but cannot be read.
    WorkingDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, message } => write!(f, "invalid {key}: {message}"),
            Self::WorkingDir(err) => write!(f, "cannot read working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidValue { .. } => None,
            Self::WorkingDir(err) => Some(err),
        }
    }
}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    pub log_dir: PathBuf,
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        Self::from_lookup(cwd, |key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset. Relative defaults resolve against `cwd`.
    pub fn from_lookup<F>(cwd: PathBuf, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = read(DB_PATH_VAR)
            .map(|value| PathBuf::from(value.trim()))
            .unwrap_or_else(|| cwd.join(DEFAULT_DB_FILE_NAME));

        let log_level = match read(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value).map_err(|message| ConfigError::InvalidValue {
                key: LOG_LEVEL_VAR,
                message,
            })?,
            None => default_log_level(),
        };

        let log_dir = match read(LOG_DIR_VAR) {
            Some(value) => normalize_log_dir(&value).map_err(|message| {
                ConfigError::InvalidValue {
                    key: LOG_DIR_VAR,
                    message,
                }
            })?,
            None => cwd.join(DEFAULT_LOG_DIR_NAME),
        };

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}
