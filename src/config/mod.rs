//! Configuration management.
//!
//! Settings are read from `~/.anki-study/config.yaml` when it exists and
//! then overridden by environment variables. Every key has a default, so
//! a missing file is not an error.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::anki::DEFAULT_ANKI_CONNECT_URL;

/// Overrides the AnkiConnect endpoint.
pub const ENV_ANKI_CONNECT_URL: &str = "ANKI_CONNECT_URL";
/// Overrides the connect timeout in seconds.
pub const ENV_CONNECT_TIMEOUT: &str = "ANKI_STUDY_CONNECT_TIMEOUT";
/// Overrides the request timeout in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "ANKI_STUDY_REQUEST_TIMEOUT";
/// Overrides the default number of cards per study session.
pub const ENV_MAX_CARDS: &str = "ANKI_STUDY_MAX_CARDS";
/// Overrides the log file path.
pub const ENV_LOG_FILE: &str = "ANKI_STUDY_LOG_FILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AnkiConnect endpoint
    pub anki_connect_url: String,

    /// Outbound call timeouts
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,

    /// Cards per study session when the caller does not say
    pub default_max_cards: usize,

    /// Idle minutes before a study session is dropped
    pub session_ttl_minutes: i64,

    /// Live study sessions kept before the least recently used is dropped
    pub max_sessions: usize,

    /// Write logs here instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anki_connect_url: DEFAULT_ANKI_CONNECT_URL.to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
            default_max_cards: 20,
            session_ttl_minutes: 60,
            max_sessions: 64,
            log_file: None,
        }
    }
}

impl Config {
    /// Loads the configuration from the default path and the environment.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            bail!("Timeouts must be at least 1 second");
        }
        if self.default_max_cards == 0 {
            bail!("default_max_cards must be at least 1");
        }
        if self.max_sessions == 0 {
            bail!("max_sessions must be at least 1");
        }
        if self.session_ttl_minutes <= 0 || self.session_ttl().is_none() {
            bail!(
                "session_ttl_minutes must be a positive number of minutes, got {}",
                self.session_ttl_minutes
            );
        }
        Ok(())
    }

    /// Idle time before a study session expires, if representable.
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_minutes(self.session_ttl_minutes)
    }

    /// Loads the configuration file at `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_saphyr::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Applies overrides from a variable lookup such as `std::env::var`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_ANKI_CONNECT_URL) {
            self.anki_connect_url = url;
        }
        if let Some(secs) = lookup(ENV_CONNECT_TIMEOUT) {
            self.connect_timeout_secs = parse_var(ENV_CONNECT_TIMEOUT, &secs)?;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = parse_var(ENV_REQUEST_TIMEOUT, &secs)?;
        }
        if let Some(cards) = lookup(ENV_MAX_CARDS) {
            self.default_max_cards = parse_var(ENV_MAX_CARDS, &cards)?;
        }
        if let Some(path) = lookup(ENV_LOG_FILE) {
            self.log_file = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
            .join(".anki-study");

        Ok(config_dir.join("config.yaml"))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value for {key}: '{value}'"))
}
