use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_seed_url")]
    pub seed_url: String,

    /// Per-article fetch timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound on concurrent article fetches.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Deadline for one whole scrape run.
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hn-brief");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("articles.db").to_string_lossy().to_string()
}

fn default_seed_url() -> String {
    "https://news.ycombinator.com/".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_fetch_concurrency() -> usize {
    5
}

fn default_scrape_timeout() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            seed_url: default_seed_url(),
            request_timeout_secs: default_request_timeout(),
            fetch_concurrency: default_fetch_concurrency(),
            scrape_timeout_secs: default_scrape_timeout(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hn-brief")
            .join("config.toml")
    }
}
