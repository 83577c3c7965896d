//! Runtime configuration
//!
//! Layered: built-in defaults, then an optional YAML file, then environment
//! variables. The binary applies command-line flags last.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_DB: &str = "DIALECTIC_DB";
pub const ENV_BIND: &str = "DIALECTIC_BIND";
pub const ENV_COACH_URL: &str = "DIALECTIC_COACH_URL";
pub const ENV_COACH_MODEL: &str = "DIALECTIC_COACH_MODEL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Connection settings for the coach
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    pub model: String,
    /// Coach is disabled when absent
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl CoachConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database: PathBuf,
    /// HTTP listen address
    pub bind: String,
    pub coach: CoachConfig,
    /// Events buffered per debate before slow subscribers lag
    pub broadcast_capacity: usize,
    /// Writes queued per session
    pub session_queue: usize,
    /// Prior messages shown to the coach when mining a new one
    pub history_window: usize,
    /// Recent messages shown to the coach when suggesting rebuttals
    pub suggestion_context: usize,
    /// Topics created when the catalogue is empty
    pub debates: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            bind: "127.0.0.1:8000".to_string(),
            coach: CoachConfig::default(),
            broadcast_capacity: 256,
            session_queue: 64,
            history_window: 10,
            suggestion_context: 5,
            debates: Vec::new(),
        }
    }
}

/// `<data_dir>/dialectic/dialectic.db`
pub fn default_database_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("dialectic").join("dialectic.db")
}

impl Config {
    /// Defaults, overlaid with `path` if given, then with the environment
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document means "all defaults"
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Override fields from environment variables looked up with `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(db) = var(ENV_DB) {
            self.database = PathBuf::from(db);
        }
        if let Some(bind) = var(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(url) = var(ENV_COACH_URL) {
            self.coach.endpoint = url;
        }
        if let Some(model) = var(ENV_COACH_MODEL) {
            self.coach.model = model;
        }
        if let Some(key) = var(ENV_API_KEY) {
            self.coach.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.bind_addr()?;
        for (name, value) in [
            ("broadcast_capacity", self.broadcast_capacity),
            ("session_queue", self.session_queue),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }
        if self.coach.timeout_secs == 0 {
            return Err(ConfigError::Invalid("coach.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bind address '{}': {}", self.bind, e)))
    }
}
