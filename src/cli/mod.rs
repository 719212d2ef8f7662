// ABOUTME: CLI argument parsing and command routing for iotalert
//
// Provides command-line interface for:
// - Listing eligible lights (devices)
// - Saving and checking tokens (verify)
// - Firing a test alert (alert)
// - Launching the setup wizard (tui, default)

pub mod alert;
pub mod devices;
pub mod verify;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::HttpGateway;
use crate::wizard::WizardController;

/// Flash a smart light when something needs your attention
#[derive(Parser)]
#[command(name = "iotalert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Alert backend URL (overrides IOTALERT_API_URL and the config file)
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

/// Output format for commands
#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Launch the setup wizard (default if no command given)
    Tui,

    /// List lights that can be used for alerts
    Devices(DevicesArgs),

    /// Save tokens and check them against each service
    Verify(VerifyArgs),

    /// Fire a test alert
    Alert(AlertArgs),
}

/// Arguments for the devices command
#[derive(clap::Args)]
pub struct DevicesArgs {
    /// Only show lights whose name or id contains this text
    #[arg(long, short)]
    pub search: Option<String>,
}

/// Arguments for the verify command
#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Yandex IoT OAuth token
    #[arg(long, env = "IOT_TOKEN", hide_env_values = true)]
    pub yandex_token: String,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: String,

    /// ngrok authtoken
    #[arg(long, env = "NGROK_AUTHTOKEN", hide_env_values = true)]
    pub ngrok_token: String,
}

/// Arguments for the alert command
#[derive(clap::Args)]
pub struct AlertArgs {
    /// Alert color (#RRGGBB or #RGB); defaults to the configured color
    #[arg(long)]
    pub color: Option<String>,

    /// Second color for rainbow mode
    #[arg(long)]
    pub color2: Option<String>,

    /// Alert duration in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Alternate between both colors
    #[arg(long)]
    pub rainbow: bool,
}

/// Resolve the configuration for a command, applying the `--api-url` override
pub fn load_config(api_url: Option<String>) -> Result<AppConfig> {
    let mut config = AppConfig::load()?;
    config.apply_api_url(api_url)?;
    Ok(config)
}

/// Wizard engine wired to the HTTP gateway described by `config`
pub fn connect(config: &AppConfig) -> Result<WizardController> {
    let gateway = HttpGateway::new(&config.gateway.api_url, config.gateway.timeout())?;
    Ok(WizardController::new(
        Arc::new(gateway),
        config.alert_defaults.clone(),
    ))
}
