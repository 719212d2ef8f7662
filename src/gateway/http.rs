// ABOUTME: reqwest-based gateway client speaking the alert backend's JSON routes
// Error replies are mined for `detail`/`message`; unreadable bodies count as empty payloads

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Gateway, GatewayError};
use crate::models::{AlertSettings, Credentials, Device, VerificationResult};
use crate::wizard::color::HexColor;

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("iotalert/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Option<Value>, GatewayError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let payload = parse_payload(&text);

        if !status.is_success() {
            let message = error_message(status.as_u16(), payload.as_ref(), &text);
            warn!("Gateway request failed: {} - {}", status, message);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(payload)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Option<Value>, GatewayError> {
        debug!("POST {}", path);
        self.send(self.client.post(self.url(path)).json(body)).await
    }
}

/// JSON body of a reply, or `None` when it is empty or not JSON
fn parse_payload(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

/// Human-readable message for a failed reply: the embedded `detail` or
/// `message` field, then the raw body, then the bare status code.
pub fn error_message(status: u16, payload: Option<&Value>, raw: &str) -> String {
    let embedded = payload.and_then(|value| {
        ["detail", "message"].iter().find_map(|key| match value.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    });

    embedded
        .or_else(|| (!raw.trim().is_empty()).then(|| raw.trim().to_string()))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

/// Devices from a `{devices: [...]}` payload; malformed entries are skipped
fn devices_from_payload(payload: Option<Value>) -> Vec<Device> {
    let Some(Value::Array(items)) = payload.and_then(|mut v| v.get_mut("devices").map(Value::take))
    else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Device>(item) {
            Ok(device) => Some(device),
            Err(e) => {
                warn!("Skipping malformed device entry: {}", e);
                None
            }
        })
        .collect()
}

fn to_value<T: serde::Serialize>(body: &T) -> Value {
    serde_json::to_value(body).unwrap_or(Value::Null)
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn save_credentials(&self, credentials: &Credentials) -> Result<(), GatewayError> {
        info!("Saving credentials {:?}", credentials);
        self.post("/setup/credentials", &to_value(credentials)).await?;
        Ok(())
    }

    async fn verify_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<VerificationResult, GatewayError> {
        info!("Verifying credentials {:?}", credentials);
        let payload = self.post("/setup/verify", &to_value(credentials)).await?;
        Ok(payload
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, GatewayError> {
        debug!("GET /setup/devices");
        let payload = self.send(self.client.get(self.url("/setup/devices"))).await?;
        let devices = devices_from_payload(payload);
        info!("Gateway listed {} device(s)", devices.len());
        Ok(devices)
    }

    async fn save_selected_device(&self, device_id: &str) -> Result<(), GatewayError> {
        info!("Saving selected device {}", device_id);
        self.post("/setup/device", &json!({ "device_id": device_id }))
            .await?;
        Ok(())
    }

    async fn save_alert_settings(&self, settings: &AlertSettings) -> Result<(), GatewayError> {
        info!("Saving alert settings {:?}", settings);
        self.post("/setup/alert-settings", &to_value(settings)).await?;
        Ok(())
    }

    async fn trigger_single_alert(
        &self,
        color: &HexColor,
        duration_sec: u32,
    ) -> Result<(), GatewayError> {
        info!("Triggering single alert {} for {}s", color, duration_sec);
        self.post(
            "/startAlert",
            &json!({ "color_hex": color, "duration_sec": duration_sec }),
        )
        .await?;
        Ok(())
    }

    async fn trigger_rainbow_alert(
        &self,
        color: &HexColor,
        color2: &HexColor,
        duration_sec: u32,
    ) -> Result<(), GatewayError> {
        info!(
            "Triggering rainbow alert {}/{} for {}s",
            color, color2, duration_sec
        );
        self.post(
            "/startAlertRainbow",
            &json!({
                "color_hex": color,
                "color_hex_2": color2,
                "duration_sec": duration_sec,
            }),
        )
        .await?;
        Ok(())
    }
}
