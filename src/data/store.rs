//! Settings Store
//!
//! Persisted key-value settings with change notification. Every write is
//! validated and saved before subscribers see it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

use super::config::{AppConfig, TimeoutOption};
use super::position::PositionStore;
use crate::error::{Error, Result};
use crate::motion::constants::MAX_OPACITY;

/// Settings store shared by the settings commands and the running overlay
#[derive(Clone)]
pub struct SettingsStore {
    config_path: PathBuf,
    tx: Arc<watch::Sender<AppConfig>>,
}

impl SettingsStore {
    /// Open the store, creating a default config file if none exists
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = AppConfig::load_or_default(config_path)?;
        tracing::info!("Settings loaded from {:?}", config_path);
        let (tx, _rx) = watch::channel(config);
        Ok(Self {
            config_path: config_path.to_path_buf(),
            tx: Arc::new(tx),
        })
    }

    /// Snapshot of the current settings
    pub fn current(&self) -> AppConfig {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every accepted change
    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.tx.subscribe()
    }

    /// Store for the icon position, kept beside the config file
    pub fn position_store(&self) -> PositionStore {
        PositionStore::new(AppConfig::position_path(&self.config_path))
    }

    /// Apply an edit, validate it, persist it, then notify subscribers.
    /// A rejected edit leaves both the file and the in-memory state untouched.
    pub fn update<F>(&self, edit: F) -> Result<AppConfig>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut next = self.current();
        edit(&mut next);
        next.validate()?;
        next.save(&self.config_path)?;
        self.tx.send_replace(next.clone());
        Ok(next)
    }

    pub fn set_opacity(&self, opacity: u8) -> Result<AppConfig> {
        if opacity > MAX_OPACITY {
            return Err(Error::InvalidOpacity(opacity));
        }
        tracing::info!("Opacity set to {}%", opacity);
        self.update(|c| c.overlay.opacity = opacity)
    }

    pub fn set_timeout(&self, timeout: TimeoutOption) -> Result<AppConfig> {
        tracing::info!("Auto-timeout set to {}", timeout);
        self.update(|c| c.overlay.timeout = timeout)
    }

    pub fn set_stop_on_screen_off(&self, enabled: bool) -> Result<AppConfig> {
        tracing::info!("Stop on screen off: {}", enabled);
        self.update(|c| c.overlay.stop_on_screen_off = enabled)
    }

    pub fn set_custom_icon(&self, icon: Option<PathBuf>) -> Result<AppConfig> {
        match &icon {
            Some(path) => tracing::info!("Custom icon set to {:?}", path),
            None => tracing::info!("Custom icon cleared"),
        }
        self.update(|c| c.overlay.custom_icon = icon)
    }
}
