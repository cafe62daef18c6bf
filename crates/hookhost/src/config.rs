//! Configuration management for the plugin host.
//!
//! This module handles loading, validation, and conversion of host
//! configuration from TOML files.

use hook_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default tick interval for serde deserialization
fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_stats_interval() -> u64 {
    60
}

fn default_strict_dependencies() -> bool {
    true
}

fn default_config_dir() -> String {
    "config/plugins".to_string()
}

/// Host configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Runtime settings
    #[serde(default)]
    pub runtime: RuntimeSettings,
    /// Plugin selection
    #[serde(default)]
    pub plugins: PluginSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Settings passed through to the plugin runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Host tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Worker pool size (0 means one thread per CPU)
    #[serde(default)]
    pub worker_threads: usize,
    /// Directory holding per-plugin JSON config files
    #[serde(default = "default_config_dir")]
    pub config_dir: String,
    /// Treat outdated optional references as resolution failures
    #[serde(default = "default_strict_dependencies")]
    pub strict_dependencies: bool,
    /// Seconds between health reports (0 to disable)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            worker_threads: 0,
            config_dir: default_config_dir(),
            strict_dependencies: default_strict_dependencies(),
            stats_interval_secs: default_stats_interval(),
        }
    }
}

/// Plugin selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PluginSettings {
    /// If non-empty, only these plugins are registered
    #[serde(default)]
    pub enabled: Vec<String>,
}

impl PluginSettings {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.is_empty() || self.enabled.iter().any(|n| n == name)
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Level for the `hook_runtime` crate; inherits `level` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_level: Option<String>,
    /// Level for bundled plugin crates; inherits `level` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_level: Option<String>,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            runtime_level: None,
            plugin_level: None,
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the host configuration into the runtime's own settings.
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            worker_threads: self.runtime.worker_threads,
            config_dir: PathBuf::from(&self.runtime.config_dir),
            strict_dependencies: self.runtime.strict_dependencies,
        }
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.runtime.tick_interval_ms == 0 {
            return Err("runtime.tick_interval_ms must be greater than 0".to_string());
        }

        if self.runtime.config_dir.trim().is_empty() {
            return Err("Plugin config directory cannot be empty".to_string());
        }

        if let Some(blank) = self.plugins.enabled.iter().position(|n| n.trim().is_empty()) {
            return Err(format!("plugins.enabled[{blank}] is empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let levels = [
            Some(&self.logging.level),
            self.logging.runtime_level.as_ref(),
            self.logging.plugin_level.as_ref(),
        ];
        for level in levels.into_iter().flatten() {
            if !valid_levels.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid log level: {level}. Must be one of: {valid_levels:?}"
                ));
            }
        }

        Ok(())
    }
}
