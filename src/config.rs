use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::draft::DEFAULT_NEW_TAB_URLS;
use crate::error::ConfigError;
use crate::sync::cache::SNAPSHOT_KEY;
use crate::sync::trello::DEFAULT_API_URL;

fn default_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("pincard")
}

fn default_new_tab_urls() -> Vec<String> {
    DEFAULT_NEW_TAB_URLS.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PincardConfig {
    pub api_base_url: String,
    /// Application key; the member token lives in the keyring.
    pub api_key: String,
    pub cache_dir: PathBuf,
    pub snapshot_key: String,
    pub done_indicator_ms: u64,
    pub new_tab_urls: Vec<String>,
    pub debug_logging: bool,
}

impl Default for PincardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            cache_dir: default_cache_dir(),
            snapshot_key: SNAPSHOT_KEY.to_string(),
            done_indicator_ms: 300,
            new_tab_urls: default_new_tab_urls(),
            debug_logging: false,
        }
    }
}

impl PincardConfig {
    /// `~/.config/pincard/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pincard")
            .join("config.json")
    }

    /// Read the config, falling back to defaults when it is missing or broken.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn done_delay(&self) -> Duration {
        Duration::from_millis(self.done_indicator_ms)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.json", self.snapshot_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: PincardConfig = serde_json::from_str(r#"{"api_key":"abc"}"#).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.api_base_url, "https://api.trello.com/1");
        assert_eq!(config.snapshot_key, "pincard-cache-persist");
        assert_eq!(config.done_delay(), Duration::from_millis(300));
        assert!(config.new_tab_urls.contains(&"chrome://newtab/".to_string()));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");
        let config = PincardConfig {
            api_key: "key".into(),
            debug_logging: true,
            ..PincardConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PincardConfig::load(&path), config);
    }

    #[test]
    fn broken_or_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(PincardConfig::load(&path), PincardConfig::default());

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(PincardConfig::load(&path), PincardConfig::default());
    }
}
