//! Galleon Configuration Module
//!
//! Config is stored in `~/.config/galleon/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`GALLEON_LOG_LEVEL`, `GALLEON_BASE_URL`)
//! 2. Config file
//! 3. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::binding::{TemplateDisposal, DEFAULT_PREFIX};
use crate::error::{GalleonError, Result};
use crate::logging::LogLevel;

pub const BASE_URL_ENV: &str = "GALLEON_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GalleonConfig {
    /// Prefix of every directive attribute (`data-gl`)
    pub attribute_prefix: String,

    /// Verbosity when neither the CLI nor the environment sets one
    pub log_level: Option<LogLevel>,

    /// Base URL that relative endpoints are joined onto
    pub base_url: Option<String>,

    /// Request timeout; none when unset
    pub timeout_secs: Option<u64>,

    pub template_disposal: TemplateDisposal,
}

impl Default for GalleonConfig {
    fn default() -> Self {
        Self {
            attribute_prefix: DEFAULT_PREFIX.to_string(),
            log_level: None,
            base_url: None,
            timeout_secs: None,
            template_disposal: TemplateDisposal::default(),
        }
    }
}

impl GalleonConfig {
    /// Returns `~/.config/galleon/` on Unix, `%APPDATA%/galleon/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("galleon")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default location; defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| GalleonError::ConfigError {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| GalleonError::ConfigError {
            reason: format!("Failed to parse config file: {}", e),
        })?;
        if config.attribute_prefix.trim().is_empty() {
            return Err(GalleonError::ConfigError {
                reason: "attribute_prefix must not be empty".into(),
            });
        }
        Ok(config)
    }

    /// Merge with environment variables
    ///
    /// Empty variables are ignored; an unknown log level is an error.
    pub fn with_env(mut self) -> Result<Self> {
        if let Some(level) = LogLevel::from_env()? {
            self.log_level = Some(level);
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = Some(url.trim().to_string());
            }
        }
        Ok(self)
    }
}
