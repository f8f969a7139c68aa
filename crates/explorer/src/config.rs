use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};

pub const EXPLORER_CONFIG_FILENAME: &str = "explorer.json";

const DEFAULT_API_BASE_URL: &str = "https://www.ebi.ac.uk/metagenomics/api/v1";
const DEFAULT_PAGE_SIZE: u32 = 25;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = concat!("explorer/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Base URL of the REST data API; resource paths are appended to it.
    pub api_base_url: String,
    pub default_page_size: u32,
    pub page_size_options: Vec<u32>,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_options: vec![10, 25, 50, 100],
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ExplorerConfig {
    /// Reads `EXPLORER_*` environment variables over the defaults.
    ///
    /// Missing or unparsable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_base_url = env::var("EXPLORER_API_BASE_URL")
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.api_base_url);
        let default_page_size = env::var("EXPLORER_PAGE_SIZE")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(defaults.default_page_size);
        let search_debounce_ms = env::var("EXPLORER_SEARCH_DEBOUNCE_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(defaults.search_debounce_ms);
        let request_timeout_secs = env::var("EXPLORER_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.request_timeout_secs);

        Self {
            api_base_url,
            default_page_size,
            search_debounce_ms,
            request_timeout_secs,
            ..defaults
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Joins a resource path (`samples`, `/studies`) onto the API base URL.
    pub fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }

    fn validate(&self) -> Result<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ExplorerError::Config(format!(
                "api_base_url must start with http:// or https://, got {}",
                self.api_base_url
            )));
        }
        if self.default_page_size == 0 {
            return Err(ExplorerError::Config(
                "default_page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads `explorer.json` from `dir`, writing the defaults if it does not exist.
pub fn load_or_create_config(dir: &Path) -> Result<ExplorerConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        ExplorerError::Config(format!(
            "failed to create config directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = dir.join(EXPLORER_CONFIG_FILENAME);
    if !path.exists() {
        let config = ExplorerConfig::default();
        let data = serde_json::to_string_pretty(&config)?;
        std::fs::write(&path, data)?;
        return Ok(config);
    }

    let data = std::fs::read_to_string(&path)?;
    let config: ExplorerConfig = serde_json::from_str(&data).map_err(|error| {
        ExplorerError::Config(format!(
            "failed to parse explorer config {}: {error}",
            path.display()
        ))
    })?;
    config.validate()?;
    Ok(config)
}
