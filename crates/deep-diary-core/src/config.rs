use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{DiaryError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8031";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const API_URL_ENV: &str = "DEEP_DIARY_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        serde_json::from_str(&config_content)
            .map_err(|e| DiaryError::Config(format!("{}: {}", config_path.display(), e)))
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)
            .map_err(|e| DiaryError::Config(e.to_string()))?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DiaryError::Config("could not determine config directory".to_string()))?;

        Ok(config_dir.join("deep-diary").join("config.json"))
    }

    /// Pick the backend URL: CLI flag, then environment, then file, then default.
    pub fn resolve_api_url(&self, cli: Option<&str>, env: Option<&str>) -> Result<String> {
        let raw = cli
            .or(env)
            .or(self.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL);
        validate_api_url(raw)
    }

    /// `None` means no timeout (configured as 0).
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

pub fn validate_api_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| DiaryError::Config(format!("invalid api url {:?}: {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(trimmed.trim_end_matches('/').to_string()),
        other => Err(DiaryError::Config(format!(
            "api url must use http or https, got {:?}",
            other
        ))),
    }
}
