//! Configuration management for AutoBug.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/autobug/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Scope rule compilation settings
    pub scope: ScopeConfig,
    /// Asset change detection settings
    pub diff: DiffConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `AUTOBUG_LOG_LEVEL`: Override the log level
    /// - `AUTOBUG_FORCE_RESCAN`: Override forced rescans of unchanged assets (true/false)
    /// - `AUTOBUG_NORMALIZE_SCOPE`: Override scope item normalization (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `AUTOBUG_*` environment overrides onto this configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AUTOBUG_LOG_LEVEL") {
            tracing::debug!("Override general.log_level from env: {}", val);
            self.general.log_level = val;
        }

        if let Ok(val) = std::env::var("AUTOBUG_FORCE_RESCAN") {
            if let Ok(force) = val.parse() {
                self.diff.force_rescan = force;
                tracing::debug!("Override diff.force_rescan from env: {}", force);
            }
        }

        if let Ok(val) = std::env::var("AUTOBUG_NORMALIZE_SCOPE") {
            if let Ok(normalize) = val.parse() {
                self.scope.normalize_items = normalize;
                tracing::debug!("Override scope.normalize_items from env: {}", normalize);
            }
        }
    }

    /// Check values that serde alone cannot constrain.
    pub fn validate(&self) -> ConfigResult<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.general.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_string(),
                reason: format!(
                    "expected one of {}, got '{}'",
                    LEVELS.join(", "),
                    self.general.log_level
                ),
            });
        }

        if let Some(tld) = self
            .scope
            .extra_tlds
            .iter()
            .find(|tld| tld.is_empty() || !tld.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(ConfigError::InvalidValue {
                field: "scope.extra_tlds".to_string(),
                reason: format!("'{tld}' is not a bare alphanumeric suffix"),
            });
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/autobug/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "autobug", "autobug").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: `trace`, `debug`, `info`, `warn` or `error`
    pub log_level: String,
    /// Deployment environment: `development`, `staging` or `production`
    pub environment: String,
}

impl GeneralConfig {
    /// Whether this is a development deployment.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Scope rule compilation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Suffixes the app-id heuristic should also treat as real TLDs
    pub extra_tlds: Vec<String>,
    /// Strip schemes and trailing slashes and lowercase items read from platforms
    pub normalize_items: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            extra_tlds: Vec::new(),
            normalize_items: true,
        }
    }
}

/// Asset change detection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Rescan unchanged assets with every template instead of skipping them
    pub force_rescan: bool,
}
