//! Tool configuration.
//!
//! Loaded from `~/.hours/config.toml`. Every field has a default, so a
//! missing file is fine.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Tool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Where the versioned store lives. Defaults to `~/.hours/store`.
    pub store_root: Option<PathBuf>,

    /// How often the publisher polls an in-flight build, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: None,
            poll_interval_ms: 2000,
        }
    }
}

impl Config {
    /// Load config from `~/.hours/config.toml`, falling back to defaults
    /// when the file is missing.
    pub fn load() -> Result<Self, String> {
        let Some(path) = Self::path() else {
            return Ok(Self::default());
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.hours/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".hours").join("config.toml"))
    }

    /// The store root: explicit from config, or `~/.hours/store`.
    pub fn store_root(&self) -> Option<PathBuf> {
        if let Some(root) = &self.store_root {
            return Some(root.clone());
        }
        dirs::home_dir().map(|h| h.join(".hours").join("store"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
