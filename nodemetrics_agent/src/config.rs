//! Agent settings, read once at startup from a JSON file.

use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/node-metrics-exporter/config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to open config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Seconds between reports.
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
    /// Seconds between samples inside a window.
    #[serde(default = "default_collect_interval")]
    pub collect_interval: u64,
    /// Window length in seconds; 0 means no samples.
    #[serde(default = "default_collect_duration")]
    pub collect_duration: u64,
}

fn default_report_interval() -> u64 {
    300
}

fn default_collect_interval() -> u64 {
    1
}

fn default_collect_duration() -> u64 {
    5
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.fill_zero_intervals();
        config.validate()?;
        Ok(config)
    }

    /// Zero periods in the file mean "use the default". `collect_duration`
    /// is left alone: an explicit 0 there is an empty window.
    fn fill_zero_intervals(&mut self) {
        if self.report_interval == 0 {
            self.report_interval = default_report_interval();
        }
        if self.collect_interval == 0 {
            self.collect_interval = default_collect_interval();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(self.url.trim())
            .map_err(|e| ConfigError::Invalid(format!("URL {:?}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "URL {:?}: scheme must be http or https",
                self.url
            )));
        }
        if self.collect_interval == 0 {
            return Err(ConfigError::Invalid("collect_interval must be > 0".into()));
        }
        if self.report_interval == 0 {
            return Err(ConfigError::Invalid("report_interval must be > 0".into()));
        }
        Ok(())
    }

    /// The token to send, if any; an empty string means none.
    pub fn auth_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn report_every(&self) -> Duration {
        Duration::from_secs(self.report_interval)
    }
}
