// ABOUTME: Visual alert configuration edited on the last wizard step
// `AlertConfig` holds raw operator input; `AlertSettings` is the normalized form sent to the gateway

use serde::Serialize;

use crate::config::AlertDefaults;
use crate::wizard::color::HexColor;

/// Blink interval transmitted when the alert is not in rainbow mode
pub const SINGLE_MODE_BLINK_INTERVAL_SEC: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMode {
    #[default]
    Single,
    Rainbow,
}

impl AlertMode {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Single => "Single color",
            Self::Rainbow => "Rainbow (two-color blink)",
        }
    }

    pub const fn toggled(&self) -> Self {
        match self {
            Self::Single => Self::Rainbow,
            Self::Rainbow => Self::Single,
        }
    }
}

/// Operator input, possibly invalid
#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    pub mode: AlertMode,
    pub color1: String,
    pub color2: String,
    pub duration_sec: f64,
    pub blink_interval_sec: f64,
}

impl From<&AlertDefaults> for AlertConfig {
    fn from(defaults: &AlertDefaults) -> Self {
        Self {
            mode: AlertMode::Single,
            color1: defaults.color_hex.clone(),
            color2: defaults.color_hex_2.clone(),
            duration_sec: defaults.duration_sec,
            blink_interval_sec: defaults.blink_interval_sec,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self::from(&AlertDefaults::default())
    }
}

/// Validated, normalized configuration as persisted by the gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSettings {
    #[serde(skip)]
    pub mode: AlertMode,
    #[serde(rename = "color_hex")]
    pub color: HexColor,
    #[serde(rename = "color_hex_2")]
    pub color2: HexColor,
    pub duration_sec: u32,
    pub blink_interval_sec: f64,
}

/// Whole seconds for the wire, rounded up so a positive duration never becomes zero
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn whole_seconds(duration_sec: f64) -> u32 {
    duration_sec.ceil().clamp(0.0, f64::from(u32::MAX)) as u32
}
