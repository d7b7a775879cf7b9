//! User configuration from ~/.config/cdnsync/config.toml

use crate::provider::Endpoints;
use cdnsync_store::CacheSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// User configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Cache behaviour.
    pub cache: CacheConfig,
    /// Host overrides, e.g. for mirrors.
    pub endpoints: EndpointsConfig,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Metadata lifetime in hours.
    pub ttl_hours: u64,
    /// Cache root, defaults to the platform cache directory.
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: 24,
            dir: None,
        }
    }
}

impl CacheConfig {
    pub fn to_settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.enabled,
            ttl: Duration::from_secs(self.ttl_hours.saturating_mul(60 * 60)),
            root: self.dir.clone(),
        }
    }
}

/// `[endpoints]` section. Unset hosts keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub unpkg: Option<String>,
    pub npm_registry: Option<String>,
    pub cdnjs_api: Option<String>,
    pub cdnjs_cdn: Option<String>,
    pub jsdelivr_data: Option<String>,
    pub jsdelivr_cdn: Option<String>,
}

impl EndpointsConfig {
    pub fn to_endpoints(&self) -> Endpoints {
        let defaults = Endpoints::default();
        let pick = |value: &Option<String>, default: String| {
            value
                .as_ref()
                .filter(|s| !s.trim().is_empty())
                .cloned()
                .unwrap_or(default)
        };

        Endpoints {
            unpkg: pick(&self.unpkg, defaults.unpkg),
            npm_registry: pick(&self.npm_registry, defaults.npm_registry),
            cdnjs_api: pick(&self.cdnjs_api, defaults.cdnjs_api),
            cdnjs_cdn: pick(&self.cdnjs_cdn, defaults.cdnjs_cdn),
            jsdelivr_data: pick(&self.jsdelivr_data, defaults.jsdelivr_data),
            jsdelivr_cdn: pick(&self.jsdelivr_cdn, defaults.jsdelivr_cdn),
        }
    }
}

/// Errors reading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl UserConfig {
    /// Load user config from default path (~/.config/cdnsync/config.toml).
    ///
    /// A missing file gives the defaults; an unreadable one is logged and
    /// also gives the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring user config");
                Self::default()
            }
        }
    }

    /// Load user config from a specific path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Get the default config path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cdnsync").join("config.toml"))
    }
}
