// ABOUTME: Configuration management for iotalert
// Handles the gateway endpoint, HTTP timeout and the alert values the wizard starts from

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub mod onboarding;

pub use onboarding::SetupRecord;

/// Environment variable that overrides `gateway.api_url`
pub const API_URL_ENV: &str = "IOTALERT_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Alert backend connection
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Initial alert form values, also restored by a full restart
    #[serde(default)]
    pub alert_defaults: AlertDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the alert backend
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_sec: default_timeout_sec(),
        }
    }
}

impl GatewayConfig {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDefaults {
    #[serde(default = "default_color_hex")]
    pub color_hex: String,

    #[serde(default = "default_color_hex_2")]
    pub color_hex_2: String,

    #[serde(default = "default_duration_sec")]
    pub duration_sec: f64,

    #[serde(default = "default_blink_interval_sec")]
    pub blink_interval_sec: f64,
}

impl Default for AlertDefaults {
    fn default() -> Self {
        Self {
            color_hex: default_color_hex(),
            color_hex_2: default_color_hex_2(),
            duration_sec: default_duration_sec(),
            blink_interval_sec: default_blink_interval_sec(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

const fn default_timeout_sec() -> u64 {
    5
}

fn default_color_hex() -> String {
    "#FF0000".to_string()
}

fn default_color_hex_2() -> String {
    "#E30306".to_string()
}

const fn default_duration_sec() -> f64 {
    10.0
}

const fn default_blink_interval_sec() -> f64 {
    0.5
}

impl AppConfig {
    /// Base directory for config, logs and the setup record
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".iotalert"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Load from the default location, then apply the environment override
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.apply_api_url(Some(url))?;
        }
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Override the gateway URL (CLI flag or environment); `None` keeps the current one
    pub fn apply_api_url(&mut self, url: Option<String>) -> Result<()> {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.gateway.api_url = url.trim().to_string();
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.gateway.api_url)
            .with_context(|| format!("Invalid gateway URL: {}", self.gateway.api_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Gateway URL must use http or https: {}", self.gateway.api_url);
        }
        if self.gateway.timeout_sec == 0 {
            anyhow::bail!("gateway.timeout_sec must be greater than zero");
        }
        Ok(())
    }
}
