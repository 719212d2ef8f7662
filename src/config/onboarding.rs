// ABOUTME: Record of a finished setup run, persisted next to the config
// Holds the completion time and chosen light; never any credential

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::AppConfig;
use crate::models::Device;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupRecord {
    /// Whether the wizard has been completed at least once
    #[serde(default)]
    pub completed: bool,

    /// When the wizard was last completed (RFC 3339 timestamp)
    #[serde(default)]
    pub completed_at: Option<String>,

    /// Light chosen on the last completed run
    #[serde(default)]
    pub device_id: Option<String>,

    #[serde(default)]
    pub device_name: Option<String>,
}

impl SetupRecord {
    pub fn record_path() -> Result<PathBuf> {
        Ok(AppConfig::base_dir()?.join("setup.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::record_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read setup record from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse setup record from {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::record_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content =
            toml::to_string_pretty(self).context("Failed to serialize setup record")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write setup record to {}", path.display()))?;
        Ok(())
    }

    /// Mark the wizard as completed with the chosen device
    pub fn mark_completed(&mut self, device: Option<&Device>) {
        self.completed = true;
        self.completed_at = Some(Utc::now().to_rfc3339());
        self.device_id = device.map(|d| d.id.clone());
        self.device_name = device.map(|d| d.display_name().to_string());
    }
}
