//! Persisted settings and their live, externally-mutable store.
//!
//! Two values matter to the pipeline: the enable flag and the API key. Both
//! can change at any time (relay messages, config edits) and consumers must
//! observe changes without a restart, so the store sits on a watch channel.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    pub api_key: Option<String>,
    /// Override for the solving service base URL.
    pub service_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    tx: Arc<watch::Sender<Settings>>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        let (tx, _) = watch::channel(settings);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every settings change.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.tx.send_modify(|s| s.enabled = enabled);
    }

    pub fn set_api_key(&self, api_key: impl Into<String>) {
        let api_key = api_key.into();
        self.tx.send_modify(|s| s.api_key = Some(api_key));
    }

    /// Load from default locations:
    /// 1. ./capsolv.yaml
    /// 2. ~/.capsolv/config.yaml
    /// 3. Default settings
    pub async fn load_default() -> Result<Self, ConfigError> {
        let local_config = PathBuf::from("./capsolv.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".capsolv").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(Self::new(Settings::default()))
    }

    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(Self::new(settings))
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(&self.current())?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
