use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::conversation::DEFAULT_GREETING;
use crate::markdown::MarkdownOptions;
use crate::transport::DEFAULT_ENDPOINT;

/// Environment variable that overrides the configured endpoint
pub const ENDPOINT_ENV: &str = "CHATBOX_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub greeting: String,
    /// Give up on a reply after this many seconds; unset waits forever
    pub request_timeout_secs: Option<u64>,
    pub markdown: MarkdownOptions,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            request_timeout_secs: None,
            markdown: MarkdownOptions::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load the user config, falling back to defaults if it can't be read.
    /// Environment overrides apply in both cases; the load error is handed
    /// back so it can be logged once logging is up.
    pub fn load_or_default() -> (Self, Option<anyhow::Error>) {
        let loaded = Self::get_config_path().and_then(|path| Self::load_from(&path));
        Self::resolve(loaded, std::env::var(ENDPOINT_ENV).ok())
    }

    fn resolve(loaded: Result<Self>, endpoint: Option<String>) -> (Self, Option<anyhow::Error>) {
        let (mut config, error) = match loaded {
            Ok(config) => (config, None),
            Err(err) => (Self::default(), Some(err)),
        };
        config.apply_env(endpoint);
        (config, error)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    fn apply_env(&mut self, endpoint: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint;
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Where log output goes, defaulting to the user cache directory
    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log_file {
            return Ok(path.clone());
        }

        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?;

        Ok(cache_dir.join("chatbox").join("chatbox.log"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbox").join("config.json"))
    }
}
