//! Client configuration read from the environment.
//!
//! # Design
//! `TODO_API_URL` overrides the base URL and `TODO_API_TIMEOUT_MS` the
//! per-call timeout. Unset variables fall back to the defaults below. Lookup
//! goes through a closure so tests never touch the process environment.

use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://todo-app-server-eosin.vercel.app/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Where the API lives and how long a call may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidTimeout(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout(raw) => {
                write!(f, "TODO_API_TIMEOUT_MS must be a number of milliseconds, got {raw:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Read `TODO_API_URL` and `TODO_API_TIMEOUT_MS`, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("TODO_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = match lookup("TODO_API_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => DEFAULT_TIMEOUT,
        };
        Ok(Self { base_url, timeout })
    }
}
