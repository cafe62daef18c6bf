//! Per-plugin configuration files
//!
//! Each plugin owns `<dir>/<name>.json`. The store only knows the mapping and
//! the JSON encoding; what the values mean is up to the plugin's member table.

use crate::error::ConfigError;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stable config path for a plugin
    pub fn path_for(&self, plugin: &str) -> PathBuf {
        self.dir.join(format!("{}.json", plugin))
    }

    pub fn exists(&self, plugin: &str) -> bool {
        self.path_for(plugin).is_file()
    }

    /// Reads a plugin's config, writing `default` first if there is no file
    ///
    /// Returns `None` when there is neither a file nor a default.
    pub fn load_or_create(
        &self,
        plugin: &str,
        default: Option<&Value>,
    ) -> Result<Option<Value>, ConfigError> {
        let path = self.path_for(plugin);

        if !path.exists() {
            let Some(default) = default else {
                return Ok(None);
            };
            info!(plugin, "📝 Creating default config at {}", path.display());
            self.save(plugin, default)?;
            return Ok(Some(default.clone()));
        }

        let content = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&content)?;
        debug!(plugin, "Loaded config from {}", path.display());
        Ok(Some(value))
    }

    /// Writes a plugin's config as pretty-printed JSON
    pub fn save(&self, plugin: &str, value: &Value) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(value)?;
        fs::write(self.path_for(plugin), content)?;
        Ok(())
    }
}
