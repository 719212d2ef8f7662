// ABOUTME: Contract of the alert backend the wizard talks to
// Credential storage and verification, device listing and selection, alert settings and triggers

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AlertSettings, Credentials, Device, VerificationResult};
use crate::wizard::color::HexColor;

pub use http::HttpGateway;

/// Transport-level failure of a gateway call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced a response (connection refused, timeout, ...)
    #[error("{0}")]
    Network(String),
    /// Non-success status; `message` is the best human-readable text the reply offered
    #[error("{message}")]
    Status { status: u16, message: String },
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Backend operations used by the wizard managers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), GatewayError>;

    async fn verify_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<VerificationResult, GatewayError>;

    async fn list_devices(&self) -> Result<Vec<Device>, GatewayError>;

    async fn save_selected_device(&self, device_id: &str) -> Result<(), GatewayError>;

    async fn save_alert_settings(&self, settings: &AlertSettings) -> Result<(), GatewayError>;

    async fn trigger_single_alert(
        &self,
        color: &HexColor,
        duration_sec: u32,
    ) -> Result<(), GatewayError>;

    async fn trigger_rainbow_alert(
        &self,
        color: &HexColor,
        color2: &HexColor,
        duration_sec: u32,
    ) -> Result<(), GatewayError>;
}
