// ABOUTME: Step 3 of the wizard: alert mode, colors and timing, settings save and test trigger
// Values are normalized before they leave the process; the gateway never sees raw input

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::color::{self, HexColor};
use super::error::WizardError;
use super::op_state::{lock, OpState};
use crate::config::AlertDefaults;
use crate::gateway::Gateway;
use crate::models::alert::{whole_seconds, SINGLE_MODE_BLINK_INTERVAL_SEC};
use crate::models::{AlertConfig, AlertMode, AlertSettings};

pub const TEST_STARTED: &str = "started...";
pub const TEST_DONE: &str = "done";

/// Editable fields of the alert form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertField {
    Color1,
    Color2,
    Duration,
    BlinkInterval,
}

pub type AlertErrors = BTreeMap<AlertField, &'static str>;

#[derive(Debug)]
struct AlertState {
    config: AlertConfig,
    save: OpState,
    test: OpState,
    test_log: Vec<String>,
}

pub struct AlertConfigManager {
    gateway: Arc<dyn Gateway>,
    defaults: AlertDefaults,
    state: Mutex<AlertState>,
}

impl AlertConfigManager {
    pub fn new(gateway: Arc<dyn Gateway>, defaults: AlertDefaults) -> Self {
        let config = AlertConfig::from(&defaults);
        Self {
            gateway,
            defaults,
            state: Mutex::new(AlertState {
                config,
                save: OpState::Idle,
                test: OpState::Idle,
                test_log: Vec::new(),
            }),
        }
    }

    pub fn config(&self) -> AlertConfig {
        lock(&self.state).config.clone()
    }

    fn edit(&self, apply: impl FnOnce(&mut AlertConfig)) {
        let mut state = lock(&self.state);
        apply(&mut state.config);
        if !state.save.is_pending() {
            state.save = OpState::Idle;
        }
    }

    pub fn set_mode(&self, mode: AlertMode) {
        self.edit(|config| config.mode = mode);
        debug!("Alert mode set to {:?}", mode);
    }

    pub fn toggle_mode(&self) -> AlertMode {
        let mode = self.config().mode.toggled();
        self.set_mode(mode);
        mode
    }

    pub fn set_color1(&self, value: impl Into<String>) {
        let value = value.into();
        self.edit(|config| config.color1 = value);
    }

    pub fn set_color2(&self, value: impl Into<String>) {
        let value = value.into();
        self.edit(|config| config.color2 = value);
    }

    pub fn set_duration(&self, seconds: f64) {
        self.edit(|config| config.duration_sec = seconds);
    }

    pub fn set_blink_interval(&self, seconds: f64) {
        self.edit(|config| config.blink_interval_sec = seconds);
    }

    /// Back to the configured defaults (restart with alert reset)
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.config = AlertConfig::from(&self.defaults);
        if !state.save.is_pending() {
            state.save = OpState::Idle;
        }
        if !state.test.is_pending() {
            state.test = OpState::Idle;
            state.test_log.clear();
        }
    }

    pub fn save_state(&self) -> OpState {
        lock(&self.state).save.clone()
    }

    pub fn test_state(&self) -> OpState {
        lock(&self.state).test.clone()
    }

    /// Lines of the most recent test run
    pub fn test_log(&self) -> Vec<String> {
        lock(&self.state).test_log.clone()
    }

    pub fn validate(&self) -> AlertErrors {
        validate(&lock(&self.state).config)
    }

    /// Everything on this step is valid and a device has been chosen upstream
    pub fn can_finish(&self, device_selected: bool) -> bool {
        device_selected && self.validate().is_empty()
    }

    /// Normalized settings, or the first validation error
    pub fn settings(&self) -> Result<AlertSettings, WizardError> {
        normalized(&lock(&self.state).config)
    }

    /// Persist the normalized configuration
    pub async fn save_settings(&self) -> Result<(), WizardError> {
        let settings = {
            let mut state = lock(&self.state);
            let settings = normalized(&state.config)?;
            if !state.save.try_begin() {
                debug!("Alert settings save coalesced: already in flight");
                return Err(WizardError::InFlight);
            }
            settings
        };

        let result = self.gateway.save_alert_settings(&settings).await;
        lock(&self.state).save.settle(&result);
        match &result {
            Ok(()) => info!("Alert settings saved"),
            Err(e) => warn!("Saving alert settings failed: {}", e),
        }
        result.map_err(WizardError::from)
    }

    /// Fire a test alert with the current configuration.
    ///
    /// The log restarts with `"started..."` and ends with `"done"` or
    /// `"error: <message>"`. Exactly one trigger call is made, chosen by mode.
    pub async fn run_test(&self) -> Result<(), WizardError> {
        let settings = {
            let mut state = lock(&self.state);
            let settings = match normalized(&state.config) {
                Ok(settings) => settings,
                Err(e) => {
                    if !state.test.is_pending() {
                        state.test_log.clear();
                    }
                    return Err(e);
                }
            };
            if !state.test.try_begin() {
                debug!("Test alert coalesced: already in flight");
                return Err(WizardError::InFlight);
            }
            state.test_log = vec![TEST_STARTED.to_string()];
            settings
        };

        let result = match settings.mode {
            AlertMode::Single => {
                self.gateway
                    .trigger_single_alert(&settings.color, settings.duration_sec)
                    .await
            }
            AlertMode::Rainbow => {
                self.gateway
                    .trigger_rainbow_alert(&settings.color, &settings.color2, settings.duration_sec)
                    .await
            }
        };

        let mut state = lock(&self.state);
        state.test.settle(&result);
        match &result {
            Ok(()) => state.test_log.push(TEST_DONE.to_string()),
            Err(e) => {
                warn!("Test alert failed: {}", e);
                state.test_log.push(format!("error: {e}"));
            }
        }
        result.map_err(WizardError::from)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn validate(config: &AlertConfig) -> AlertErrors {
    let mut errors = AlertErrors::new();
    if !color::is_valid(&config.color1) {
        errors.insert(AlertField::Color1, "Enter a color like #FF0000 or f00");
    }
    if !is_positive(config.duration_sec) {
        errors.insert(AlertField::Duration, "Duration must be a positive number of seconds");
    }
    if config.mode == AlertMode::Rainbow {
        if !color::is_valid(&config.color2) {
            errors.insert(AlertField::Color2, "Enter a second color like #00FF00");
        }
        if !is_positive(config.blink_interval_sec) {
            errors.insert(AlertField::BlinkInterval, "Blink interval must be a positive number");
        }
    }
    errors
}

/// Settings safe to transmit: the second color falls back to the first one
/// and the blink interval is fixed outside rainbow mode
fn normalized(config: &AlertConfig) -> Result<AlertSettings, WizardError> {
    if let Some(message) = validate(config).into_values().next() {
        return Err(WizardError::Validation(message.to_string()));
    }

    let color: HexColor = color::normalize(&config.color1)
        .ok_or_else(|| WizardError::Validation("Invalid first color".to_string()))?;
    let color2 = color::normalize(&config.color2).unwrap_or_else(|| color.clone());
    let blink_interval_sec = match config.mode {
        AlertMode::Rainbow => config.blink_interval_sec,
        AlertMode::Single => SINGLE_MODE_BLINK_INTERVAL_SEC,
    };

    Ok(AlertSettings {
        mode: config.mode,
        color,
        color2,
        duration_sec: whole_seconds(config.duration_sec),
        blink_interval_sec,
    })
}
