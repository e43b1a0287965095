use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "envdeck.toml";
const CONFIG_DIR_NAME: &str = "envdeck";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub default_runtime_version: String,
    pub runtime_versions: Vec<String>,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            default_runtime_version: "3.9".into(),
            runtime_versions: ["3.8", "3.9", "3.10", "3.11", "3.12"]
                .into_iter()
                .map(String::from)
                .collect(),
            connect_timeout_secs: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Settings>(raw).map(Settings::normalized)
    }

    /// Overlays `ENVDECK_API_URL` and the `APP__*` variables read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ENVDECK_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("APP__API_BASE_URL") {
            self.api_base_url = v;
        }

        if let Some(v) = lookup("APP__DEFAULT_RUNTIME_VERSION") {
            self.default_runtime_version = v;
        }

        if let Some(v) = lookup("APP__CONNECT_TIMEOUT_SECS") {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.connect_timeout_secs = Some(parsed);
            }
        }
    }

    /// Trims the url and makes sure the default version is one of the offered ones.
    pub fn normalized(mut self) -> Self {
        self.api_base_url = self.api_base_url.trim().to_string();
        if self.runtime_versions.is_empty() {
            self.runtime_versions = Settings::default().runtime_versions;
        }
        let default_version = self.default_runtime_version.trim().to_string();
        if default_version.is_empty() {
            self.default_runtime_version = Settings::default().default_runtime_version;
        } else {
            self.default_runtime_version = default_version;
        }
        if !self.runtime_versions.contains(&self.default_runtime_version) {
            self.runtime_versions.push(self.default_runtime_version.clone());
        }
        self
    }
}

/// Files consulted in order; the first one that exists wins.
pub fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    candidates
}

fn read_settings_file(path: &Path) -> Result<Settings, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Settings::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Defaults, then a config file, then environment variables.
///
/// An explicit path must exist; the implicit locations are skipped when absent.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match explicit {
        Some(path) => read_settings_file(path)?,
        None => match config_file_candidates().into_iter().find(|path| path.is_file()) {
            Some(path) => read_settings_file(&path)?,
            None => Settings::default(),
        },
    };

    settings.apply_env_overrides(|key| std::env::var(key).ok());
    let settings = settings.normalized();
    debug!(api_base_url = %settings.api_base_url, "settings loaded");
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
