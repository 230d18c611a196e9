//! Configuration loading and resolution
//!
//! Settings come from four places, highest priority first:
//! 1. Command-line arguments ([`Overrides`])
//! 2. Environment variables (`IMP_API_BASE_URL`, `IMP_API_TOKEN`,
//!    `IMP_DB_URL`, `IMP_DB_SERVICE_KEY`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error: defaults are used and a warning is
//! logged. A file that exists but does not parse is reported.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::campaign::StageOrder;
use crate::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://investor-match-api-23715448976.us-east1.run.app/v1";

/// Points at an explicit config file
pub const ENV_CONFIG_PATH: &str = "IMP_CONFIG";
pub const ENV_API_BASE_URL: &str = "IMP_API_BASE_URL";
pub const ENV_API_TOKEN: &str = "IMP_API_TOKEN";
pub const ENV_DB_URL: &str = "IMP_DB_URL";
pub const ENV_DB_SERVICE_KEY: &str = "IMP_DB_SERVICE_KEY";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub campaign: CampaignSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// REST API client settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient failures
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Bearer token injected into every request (optional)
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            token: None,
        }
    }
}

/// Hosted database (prompt store) settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSection {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub service_key: Option<String>,
}

/// Campaign manager view settings
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignSection {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Upper bound on candidates fetched for the matches view
    #[serde(default = "default_matches_limit")]
    pub matches_limit: usize,

    /// Seconds a cached query result stays fresh
    #[serde(default = "default_stale_secs")]
    pub stale_secs: u64,

    /// Stage names, highest priority first; empty means built-in order
    #[serde(default)]
    pub stage_priority: Vec<String>,
}

impl Default for CampaignSection {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            matches_limit: default_matches_limit(),
            stale_secs: default_stale_secs(),
            stage_priority: Vec::new(),
        }
    }
}

impl CampaignSection {
    pub fn stage_order(&self) -> Result<StageOrder> {
        if self.stage_priority.is_empty() {
            return Ok(StageOrder::default());
        }
        StageOrder::from_names(&self.stage_priority)
            .map_err(|e| Error::Config(format!("campaign.stage_priority: {e}")))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retries() -> u32 {
    1
}

fn default_page_size() -> usize {
    10
}

fn default_matches_limit() -> usize {
    25
}

fn default_stale_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command-line values; `None` leaves lower tiers in effect
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub db_url: Option<String>,
    pub db_service_key: Option<String>,
    pub log_level: Option<String>,
    pub page_size: Option<usize>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` if given and present, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply environment variables on top of file values
    pub fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(ENV_API_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(token) = non_empty_env(ENV_API_TOKEN) {
            self.api.token = Some(token);
        }
        if let Some(url) = non_empty_env(ENV_DB_URL) {
            self.database.url = Some(url);
        }
        if let Some(key) = non_empty_env(ENV_DB_SERVICE_KEY) {
            self.database.service_key = Some(key);
        }
    }

    /// Apply command-line values on top of everything else
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.api_base_url {
            self.api.base_url = url.clone();
        }
        if let Some(token) = &overrides.api_token {
            self.api.token = Some(token.clone());
        }
        if let Some(url) = &overrides.db_url {
            self.database.url = Some(url.clone());
        }
        if let Some(key) = &overrides.db_service_key {
            self.database.service_key = Some(key.clone());
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(size) = overrides.page_size {
            self.campaign.page_size = size;
        }
    }

    /// Reject values that would make the clients or views misbehave
    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api.base_url must be an http(s) URL, got {:?}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Config("api.timeout_secs must be positive".to_string()));
        }
        if self.campaign.page_size == 0 {
            return Err(Error::Config("campaign.page_size must be positive".to_string()));
        }
        self.campaign.stage_order()?;
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Locate the config file: explicit path, `IMP_CONFIG`, then platform paths.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = non_empty_env(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("imp").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/imp/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the effective configuration across all four tiers
pub fn resolve_config(overrides: &Overrides) -> Result<TomlConfig> {
    let path = locate_config_file(overrides.config_path.as_deref());
    let mut config = TomlConfig::load_or_default(path.as_deref())?;
    config.apply_env();
    config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}
