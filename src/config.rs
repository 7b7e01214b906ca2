//! Runtime configuration.
//!
//! Values come from defaults, then the environment (a `.env` file is read
//! first by the binary), then command-line flags applied by the caller.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::api::http::DEFAULT_BASE_URL;

pub const ENV_API_URL: &str = "POSTBOARD_API_URL";
pub const ENV_SESSION_FILE: &str = "POSTBOARD_SESSION_FILE";
pub const ENV_OFFLINE: &str = "POSTBOARD_OFFLINE";
pub const ENV_STALE_SECS: &str = "POSTBOARD_STALE_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid URL '{value}': {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidSeconds { var: &'static str, value: String },
}

/// Where posts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Http,
    /// Seeded in-process data; nothing leaves the machine.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: Url,
    pub session_file: PathBuf,
    pub backend: Backend,
    /// `None` keeps query results until a mutation invalidates them.
    pub stale_after: Option<Duration>,
}

impl Config {
    /// Reads `POSTBOARD_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_base_url = parse_url(&value)?;
        }
        if let Some(value) = lookup(ENV_SESSION_FILE).filter(|v| !v.trim().is_empty()) {
            config.session_file = PathBuf::from(value);
        }
        if lookup(ENV_OFFLINE).is_some_and(|v| is_truthy(&v)) {
            config.backend = Backend::Memory;
        }
        if let Some(value) = lookup(ENV_STALE_SECS) {
            config.stale_after = Some(parse_seconds(ENV_STALE_SECS, &value)?);
        }

        Ok(config)
    }

    pub fn with_api_url(mut self, value: &str) -> Result<Self, ConfigError> {
        self.api_base_url = parse_url(value)?;
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            session_file: default_session_file(),
            backend: Backend::Http,
            stale_after: None,
        }
    }
}

/// `<config dir>/postboard/session.json`, or `./postboard-session.json`
/// when the platform has no config directory.
pub fn default_session_file() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("postboard").join("session.json"),
        None => PathBuf::from("postboard-session.json"),
    }
}

pub fn parse_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl {
        value: value.to_string(),
        source,
    })
}

fn parse_seconds(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidSeconds {
            var,
            value: value.to_string(),
        })
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
