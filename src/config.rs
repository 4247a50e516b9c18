//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/vtscan/vtscan.toml`
//! 3. Environment variables: `VTSCAN_*` prefix
//!
//! The API key is not a setting. It is only accepted through `--apikey`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::application::ApplicationError;
use crate::domain::expand_env_vars;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.virustotal.com/vtapi/v2";

/// Raw settings for intermediate parsing (all fields optional to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub log_level: Option<String>,
}

/// Unified configuration for vtscan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// API base URL (default: VirusTotal public API v2)
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Log level for stderr diagnostics (error, warn, info, debug, trace, off)
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
            user_agent: format!("vtscan/{}", env!("CARGO_PKG_VERSION")),
            log_level: "warn".to_string(),
        }
    }
}

/// Get the XDG config directory for vtscan.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "vtscan").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("vtscan.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Load settings with layered precedence from the global config location.
    pub fn load() -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref())
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional TOML file; a missing file is skipped
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. `config_file`
    /// 3. Environment variables: `VTSCAN_*` prefix
    pub fn load_from(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(path) = config_file {
            if path.exists() {
                let raw = load_raw_settings(path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            base_url: overlay
                .base_url
                .clone()
                .unwrap_or_else(|| self.base_url.clone()),
            timeout_secs: overlay.timeout_secs.unwrap_or(self.timeout_secs),
            user_agent: overlay
                .user_agent
                .clone()
                .unwrap_or_else(|| self.user_agent.clone()),
            log_level: overlay
                .log_level
                .clone()
                .unwrap_or_else(|| self.log_level.clone()),
        }
    }

    /// Apply VTSCAN_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("VTSCAN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("base_url") {
            settings.base_url = val;
        }
        if let Ok(val) = config.get_string("timeout_secs") {
            settings.timeout_secs = val.trim().parse().map_err(|e| ApplicationError::Config {
                message: format!("VTSCAN_TIMEOUT_SECS={}: {}", val, e),
            })?;
        }
        if let Ok(val) = config.get_string("user_agent") {
            settings.user_agent = val;
        }
        if let Ok(val) = config.get_string("log_level") {
            settings.log_level = val;
        }

        Ok(settings)
    }

    /// Expand shell variables in the base URL (e.g. `$VT_HOST/vtapi/v2`).
    fn expand_paths(&mut self) {
        self.base_url = expand_env_vars(&self.base_url);
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.timeout_secs == 0 {
            return Err(ApplicationError::Config {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApplicationError::Config {
                message: format!("base_url must be an http(s) URL: {}", self.base_url),
            });
        }
        Ok(())
    }

    /// Log level filter, `None` for an unknown level name.
    pub fn level_filter(&self) -> Option<LevelFilter> {
        LevelFilter::from_str(self.log_level.trim()).ok()
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
