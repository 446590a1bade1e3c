// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use drivefs::{CacheConfig, DriveFs, MemoryProxy};
use serde::Deserialize;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "GDFS_CONFIG";

/// Contents of the YAML config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveConfig {
    /// JSON proxy fixture, relative to the config file
    pub fixture: PathBuf,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl DriveConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml_ng::from_str(text).context("invalid config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_yaml(&text)?;
        if config.fixture.is_relative() {
            if let Some(dir) = path.parent() {
                config.fixture = dir.join(&config.fixture);
            }
        }
        Ok(config)
    }
}

/// Get the config path with an optional override, falling back to the GDFS_CONFIG environment variable
pub fn get_config_path_with_override(override_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path);
    }

    env::var(CONFIG_ENV)
        .map_err(|_| anyhow!("{CONFIG_ENV} environment variable not set"))
        .map(PathBuf::from)
}

/// Everything a command needs to reach the mount's metadata
pub struct DriveContext {
    config_path: Option<PathBuf>,
}

impl DriveContext {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub fn config(&self) -> Result<DriveConfig> {
        let path = get_config_path_with_override(self.config_path.clone())?;
        DriveConfig::load(&path)
    }

    pub fn proxy(&self, config: &DriveConfig) -> Result<MemoryProxy> {
        let json = std::fs::read_to_string(&config.fixture)
            .with_context(|| format!("Failed to read fixture {}", config.fixture.display()))?;
        Ok(MemoryProxy::from_json(&json)?)
    }

    /// Cold start followed by a sync to the end of the change feed.
    pub async fn open(&self) -> Result<DriveFs> {
        let config = self.config()?;
        let proxy = self.proxy(&config)?;
        let fs = DriveFs::new(config.cache);

        let snapshot = fs.cold_start(&proxy).await?;
        let sync = fs.sync(&proxy).await?;
        diagnostics::log_info!(
            "Opened drive with {entries} entries, {batches} batches applied",
            entries: snapshot.entries,
            batches: sync.applied()
        );
        Ok(fs)
    }
}
