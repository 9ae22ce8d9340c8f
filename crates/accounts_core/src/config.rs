//! Runtime configuration loaded from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `ACCOUNTS_DB_PATH` | `accounts.sqlite3` (`:memory:` for in-memory) |
//! | `ACCOUNTS_LOG_LEVEL` | [`default_log_level`] |
//! | `ACCOUNTS_LOG_DIR` | unset, logs go to stderr |
//! | `ACCOUNTS_DB_BUSY_TIMEOUT_MS` | `5000` |
//! | `ACCOUNTS_REQUEST_TIMEOUT_MS` | unset, no deadline |

use crate::context::RequestContext;
use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::{default_log_level, normalize_level};
use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DB_PATH_VAR: &str = "ACCOUNTS_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "ACCOUNTS_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "ACCOUNTS_LOG_DIR";
pub const BUSY_TIMEOUT_VAR: &str = "ACCOUNTS_DB_BUSY_TIMEOUT_MS";
pub const REQUEST_TIMEOUT_VAR: &str = "ACCOUNTS_REQUEST_TIMEOUT_MS";

const DEFAULT_DB_FILE_NAME: &str = "accounts.sqlite3";
const IN_MEMORY_DB: &str = ":memory:";

/// Where the account store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid value `{value}` for {var}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db: DbLocation,
    pub log_level: &'static str,
    /// Absolute directory for rolling log files; stderr when `None`.
    pub log_dir: Option<String>,
    /// Per-statement lock wait before a store call times out.
    pub busy_timeout: Duration,
    /// Optional deadline applied to each request context.
    pub request_timeout: Option<Duration>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db: DbLocation::File(PathBuf::from(DEFAULT_DB_FILE_NAME)),
            log_level: default_log_level(),
            log_dir: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            request_timeout: None,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through `lookup`, one call per variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db = match read(DB_PATH_VAR) {
            Some(value) if value == IN_MEMORY_DB => DbLocation::Memory,
            Some(value) => DbLocation::File(PathBuf::from(value)),
            None => defaults.db,
        };

        let log_level = match read(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value).map_err(|reason| ConfigError::InvalidValue {
                var: LOG_LEVEL_VAR,
                value,
                reason,
            })?,
            None => defaults.log_level,
        };

        let busy_timeout = match read(BUSY_TIMEOUT_VAR) {
            Some(value) => parse_millis(BUSY_TIMEOUT_VAR, value)?,
            None => defaults.busy_timeout,
        };

        let request_timeout = read(REQUEST_TIMEOUT_VAR)
            .map(|value| parse_millis(REQUEST_TIMEOUT_VAR, value))
            .transpose()?;

        Ok(Self {
            db,
            log_level,
            log_dir: read(LOG_DIR_VAR),
            busy_timeout,
            request_timeout,
        })
    }

    /// Builds a fresh request context honoring `request_timeout`.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_optional_timeout(self.request_timeout)
    }
}

fn parse_millis(var: &'static str, value: String) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|err| ConfigError::InvalidValue {
            var,
            value,
            reason: err.to_string(),
        })
}
