// ABOUTME: TUI application state: the shared wizard engine plus per-screen view state
// Background gateway calls report back through a notice channel drained on every tick

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, SetupRecord};
use crate::gateway::Gateway;
use crate::models::{AlertMode, Device, TokenKind, VerificationResult};
use crate::wizard::{
    AlertField, TransitionOutcome, WizardController, WizardError, WizardStep,
};

/// Input focus on the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Token(TokenKind),
    Search,
    Alert(AlertField),
}

impl Focus {
    /// First focusable field of `step`
    pub const fn first(step: WizardStep) -> Self {
        match step {
            WizardStep::Credentials => Self::Token(TokenKind::Yandex),
            WizardStep::Device => Self::Search,
            WizardStep::Alert => Self::Alert(AlertField::Color1),
        }
    }

    /// Focus ring of `step`; rainbow-only fields are skipped in single mode
    pub fn ring(step: WizardStep, mode: AlertMode) -> Vec<Self> {
        match step {
            WizardStep::Credentials => TokenKind::all().iter().map(|k| Self::Token(*k)).collect(),
            WizardStep::Device => vec![Self::Search],
            WizardStep::Alert => {
                let mut fields = vec![Self::Alert(AlertField::Color1)];
                if mode == AlertMode::Rainbow {
                    fields.push(Self::Alert(AlertField::Color2));
                }
                fields.push(Self::Alert(AlertField::Duration));
                if mode == AlertMode::Rainbow {
                    fields.push(Self::Alert(AlertField::BlinkInterval));
                }
                fields
            }
        }
    }
}

/// Result of a background gateway call, sent back to the UI thread
#[derive(Debug)]
pub enum Notice {
    Transition(TransitionOutcome),
    Verified(Result<VerificationResult, WizardError>),
    DevicesFetched(Result<usize, WizardError>),
    SettingsSaved(Result<(), WizardError>),
    TestFinished(Result<(), WizardError>),
    Finished {
        outcome: TransitionOutcome,
        device: Option<Device>,
    },
}

/// Status bar line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

pub struct App {
    pub wizard: Arc<WizardController>,
    pub focus: Focus,
    /// Show tokens in clear text instead of masked
    pub reveal_tokens: bool,
    /// Raw text of the numeric alert fields; parsed into the engine on every edit
    pub duration_input: String,
    pub blink_input: String,
    pub status: Option<StatusMessage>,
    pub setup: SetupRecord,
    setup_path: Option<PathBuf>,
    pub should_quit: bool,
    last_step: WizardStep,
    notice_tx: mpsc::UnboundedSender<Notice>,
    notice_rx: mpsc::UnboundedReceiver<Notice>,
}

impl App {
    pub fn new(gateway: Arc<dyn Gateway>, config: &AppConfig) -> Self {
        let wizard = Arc::new(WizardController::new(
            gateway,
            config.alert_defaults.clone(),
        ));
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let mut app = Self {
            wizard,
            focus: Focus::first(WizardStep::Credentials),
            reveal_tokens: false,
            duration_input: String::new(),
            blink_input: String::new(),
            status: None,
            setup: SetupRecord::default(),
            setup_path: None,
            should_quit: false,
            last_step: WizardStep::Credentials,
            notice_tx,
            notice_rx,
        };
        app.sync_numeric_inputs();
        app
    }

    /// Persist the setup record at `path` when the wizard completes
    pub fn with_setup_record(mut self, record: SetupRecord, path: PathBuf) -> Self {
        self.setup = record;
        self.setup_path = Some(path);
        self
    }

    pub fn step(&self) -> WizardStep {
        self.wizard.step()
    }

    pub(crate) fn notifier(&self) -> mpsc::UnboundedSender<Notice> {
        self.notice_tx.clone()
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Move focus within the current step's ring
    pub fn cycle_focus(&mut self, forward: bool) {
        let ring = Focus::ring(self.step(), self.wizard.alert().config().mode);
        if ring.is_empty() {
            return;
        }
        let idx = ring.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (idx + 1) % ring.len()
        } else {
            (idx + ring.len() - 1) % ring.len()
        };
        self.focus = ring[next];
    }

    /// Keep focus on a field that is still shown
    pub fn clamp_focus(&mut self) {
        let ring = Focus::ring(self.step(), self.wizard.alert().config().mode);
        if !ring.contains(&self.focus) {
            self.focus = ring.first().copied().unwrap_or(Focus::first(self.step()));
        }
    }

    /// Reload the numeric field buffers from the engine
    pub fn sync_numeric_inputs(&mut self) {
        let config = self.wizard.alert().config();
        self.duration_input = format_seconds(config.duration_sec);
        self.blink_input = format_seconds(config.blink_interval_sec);
    }

    /// Move the device selection by `delta` within the filtered list
    pub fn move_selection(&mut self, delta: isize) {
        let visible = self.wizard.devices().visible();
        if visible.is_empty() {
            return;
        }
        let current = self
            .wizard
            .devices()
            .selected_id()
            .and_then(|id| visible.iter().position(|d| d.id == id));
        let next = match current {
            Some(idx) => {
                let len = visible.len() as isize;
                (idx as isize + delta).rem_euclid(len) as usize
            }
            None => 0,
        };
        self.wizard.devices().select(&visible[next].id);
    }

    /// Apply finished background work; called once per UI tick
    pub fn tick(&mut self) {
        while let Ok(notice) = self.notice_rx.try_recv() {
            self.apply_notice(notice);
        }

        let step = self.step();
        if step != self.last_step {
            debug!("View follows step change {:?} -> {:?}", self.last_step, step);
            self.last_step = step;
            self.focus = Focus::first(step);
            if step == WizardStep::Alert {
                self.sync_numeric_inputs();
            }
        }
    }

    pub fn apply_notice(&mut self, notice: Notice) {
        match notice {
            Notice::Transition(outcome) => match outcome {
                TransitionOutcome::Moved { .. } => {
                    self.status = match self.wizard.devices().fetch_state().error() {
                        Some(e) if self.step() == WizardStep::Device => {
                            Some(StatusMessage::error(format!("Could not load devices: {e}")))
                        }
                        _ => None,
                    };
                }
                TransitionOutcome::Blocked => {
                    self.status = Some(StatusMessage::error(blocked_message(self.step())));
                }
                TransitionOutcome::Aborted(message) => {
                    self.status = Some(StatusMessage::error(message));
                }
                TransitionOutcome::NotAllowed | TransitionOutcome::Busy => {}
            },
            Notice::Verified(result) => {
                self.status = match result {
                    Ok(verification) if verification.all_ok() => {
                        Some(StatusMessage::info("All three services verified"))
                    }
                    Ok(_) => Some(StatusMessage::error("Some services rejected their token")),
                    Err(e) => error_status("Verification failed", &e),
                };
            }
            Notice::DevicesFetched(result) => {
                self.status = match result {
                    Ok(0) => Some(StatusMessage::info("No eligible lights found")),
                    Ok(count) => Some(StatusMessage::info(format!("Loaded {count} light(s)"))),
                    Err(e) => error_status("Could not load devices", &e),
                };
            }
            Notice::SettingsSaved(result) => {
                self.status = match result {
                    Ok(()) => Some(StatusMessage::info("Settings saved")),
                    Err(e) => error_status("Saving settings failed", &e),
                };
            }
            Notice::TestFinished(result) => {
                self.status = match result {
                    Ok(()) => Some(StatusMessage::info("Test alert sent")),
                    Err(e) => error_status("Test alert failed", &e),
                };
            }
            Notice::Finished { outcome, device } => match outcome {
                TransitionOutcome::Moved { .. } => {
                    self.record_completion(device.as_ref());
                    self.sync_numeric_inputs();
                    self.status = Some(StatusMessage::info(
                        "Setup complete. Alerts will use the saved configuration",
                    ));
                }
                TransitionOutcome::Blocked => {
                    self.status = Some(StatusMessage::error(blocked_message(WizardStep::Alert)));
                }
                TransitionOutcome::Aborted(message) => {
                    self.status = Some(StatusMessage::error(message));
                }
                TransitionOutcome::NotAllowed | TransitionOutcome::Busy => {}
            },
        }
    }

    fn record_completion(&mut self, device: Option<&Device>) {
        self.setup.mark_completed(device);
        info!("Setup completed with device {:?}", self.setup.device_id);
        if let Some(path) = &self.setup_path {
            if let Err(e) = self.setup.save_to(path) {
                warn!("Failed to save setup record: {:#}", e);
            }
        }
    }
}

fn blocked_message(step: WizardStep) -> &'static str {
    match step {
        WizardStep::Credentials => "Fill in all three tokens to continue",
        WizardStep::Device => "Select a device to continue",
        WizardStep::Alert => "Fix the highlighted fields first",
    }
}

/// Coalesced and superseded calls are silent; everything else is shown
fn error_status(context: &str, error: &WizardError) -> Option<StatusMessage> {
    match error {
        WizardError::InFlight | WizardError::Superseded => None,
        other => Some(StatusMessage::error(format!("{context}: {other}"))),
    }
}

/// Seconds without a trailing `.0` for whole values
pub fn format_seconds(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Parse a seconds field; unparseable text becomes NaN so validation rejects it
pub fn parse_seconds(input: &str) -> f64 {
    input.trim().replace(',', ".").parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use pretty_assertions::assert_eq;

    fn app() -> App {
        App::new(Arc::new(MockGateway::new()), &AppConfig::default())
    }

    #[test]
    fn test_initial_view() {
        let app = app();
        assert_eq!(app.step(), WizardStep::Credentials);
        assert_eq!(app.focus, Focus::Token(TokenKind::Yandex));
        assert_eq!(app.duration_input, "10");
        assert_eq!(app.blink_input, "0.5");
        assert!(!app.reveal_tokens);
    }

    #[test]
    fn test_focus_ring_wraps() {
        let mut app = app();
        app.cycle_focus(false);
        assert_eq!(app.focus, Focus::Token(TokenKind::Ngrok));
        app.cycle_focus(true);
        assert_eq!(app.focus, Focus::Token(TokenKind::Yandex));
    }

    #[test]
    fn test_alert_ring_depends_on_mode() {
        let single = Focus::ring(WizardStep::Alert, AlertMode::Single);
        assert_eq!(
            single,
            vec![
                Focus::Alert(AlertField::Color1),
                Focus::Alert(AlertField::Duration)
            ]
        );
        assert_eq!(Focus::ring(WizardStep::Alert, AlertMode::Rainbow).len(), 4);
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds(" 12 "), 12.0);
        assert_eq!(parse_seconds("0,25"), 0.25);
        assert!(parse_seconds("abc").is_nan());
        assert!(parse_seconds("").is_nan());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(10.0), "10");
        assert_eq!(format_seconds(0.5), "0.5");
    }

    #[test]
    fn test_coalesced_errors_are_silent() {
        let mut app = app();
        app.apply_notice(Notice::Verified(Err(WizardError::InFlight)));
        assert_eq!(app.status, None);

        app.apply_notice(Notice::SettingsSaved(Err(WizardError::Validation(
            "bad".to_string(),
        ))));
        assert_eq!(
            app.status,
            Some(StatusMessage::error("Saving settings failed: bad"))
        );
    }

    #[test]
    fn test_blocked_transition_explains_guard() {
        let mut app = app();
        app.apply_notice(Notice::Transition(TransitionOutcome::Blocked));
        assert_eq!(
            app.status,
            Some(StatusMessage::error("Fill in all three tokens to continue"))
        );
    }
}
