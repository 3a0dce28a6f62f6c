//! Configuration port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Port for configuration storage
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the stored configuration; a missing file yields an empty config.
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Write a file holding the defaults. Fails if one already exists.
    async fn init(&self) -> Result<(), ConfigError>;

    /// Defaults, overlaid by the stored file, overlaid by `overrides`
    async fn load_merged(&self, overrides: AppConfig) -> Result<AppConfig, ConfigError> {
        let stored = self.load().await?;
        Ok(AppConfig::defaults().merge(stored).merge(overrides))
    }
}
