// ABOUTME: Wizard step state machine: transition table, guards and side effects
// Sequences manager calls; never talks to the gateway itself

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::alert::AlertConfigManager;
use super::credentials::CredentialManager;
use super::devices::DeviceDirectory;
use super::error::WizardError;
use super::op_state::{lock, OpState};
use crate::config::AlertDefaults;
use crate::gateway::Gateway;

/// Steps in the wizard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WizardStep {
    #[default]
    Credentials,
    Device,
    Alert,
}

impl WizardStep {
    /// Get all steps in order
    pub const fn all() -> &'static [Self] {
        &[Self::Credentials, Self::Device, Self::Alert]
    }

    /// Get the step number (1-indexed for display)
    pub const fn number(&self) -> usize {
        match self {
            Self::Credentials => 1,
            Self::Device => 2,
            Self::Alert => 3,
        }
    }

    pub const fn title(&self) -> &'static str {
        match self {
            Self::Credentials => "Credentials",
            Self::Device => "Device",
            Self::Alert => "Alert",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::Credentials => "Connect Yandex IoT, Telegram and ngrok",
            Self::Device => "Pick the light that will flash",
            Self::Alert => "Choose colors and timing",
        }
    }
}

/// Which parts of the session a restart wipes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartScope {
    pub reset_credentials: bool,
    pub reset_device: bool,
    pub reset_alert_config: bool,
}

impl Default for RestartScope {
    /// Device list and selection only; tokens and alert settings survive
    fn default() -> Self {
        Self {
            reset_credentials: false,
            reset_device: true,
            reset_alert_config: false,
        }
    }
}

impl RestartScope {
    pub const fn everything() -> Self {
        Self {
            reset_credentials: true,
            reset_device: true,
            reset_alert_config: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Next,
    Back,
    Restart(RestartScope),
}

/// Condition checked before a transition fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    CredentialsComplete,
    DeviceSelected,
    AlertComplete,
}

/// Side effect of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    PersistCredentials,
    FetchDevicesIfEmpty,
    PersistSelection,
    Reset(RestartScope),
}

/// One row of the transition table. `before` effects must all succeed for
/// the step to change; `after` effects run on the new step and cannot undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub guard: Guard,
    pub before: Vec<Effect>,
    pub next: WizardStep,
    pub after: Vec<Effect>,
}

/// The wizard transition table
pub fn transition(step: WizardStep, action: WizardAction) -> Option<Transition> {
    use WizardStep::{Alert, Credentials, Device};

    match (step, action) {
        (Credentials, WizardAction::Next) => Some(Transition {
            guard: Guard::CredentialsComplete,
            before: vec![Effect::PersistCredentials],
            next: Device,
            after: vec![Effect::FetchDevicesIfEmpty],
        }),
        (Device, WizardAction::Next) => Some(Transition {
            guard: Guard::DeviceSelected,
            before: vec![Effect::PersistSelection],
            next: Alert,
            after: vec![],
        }),
        (Device, WizardAction::Back) => Some(Transition {
            guard: Guard::Always,
            before: vec![],
            next: Credentials,
            after: vec![],
        }),
        (Alert, WizardAction::Back) => Some(Transition {
            guard: Guard::Always,
            before: vec![],
            next: Device,
            after: vec![],
        }),
        (Alert, WizardAction::Restart(scope)) => Some(Transition {
            guard: Guard::AlertComplete,
            before: vec![],
            next: Credentials,
            after: vec![Effect::Reset(scope)],
        }),
        _ => None,
    }
}

/// What happened to a dispatched action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Moved { from: WizardStep, to: WizardStep },
    /// No table entry for this action on the current step
    NotAllowed,
    /// The guard rejected the transition
    Blocked,
    /// Another transition or a conflicting manager call is pending
    Busy,
    /// A side effect failed; the step is unchanged
    Aborted(String),
}

impl TransitionOutcome {
    pub const fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

pub struct WizardController {
    step: Mutex<WizardStep>,
    transition: Mutex<OpState>,
    credentials: CredentialManager,
    devices: DeviceDirectory,
    alert: AlertConfigManager,
}

impl WizardController {
    pub fn new(gateway: Arc<dyn Gateway>, defaults: AlertDefaults) -> Self {
        let credentials = CredentialManager::new(Arc::clone(&gateway));
        let devices = DeviceDirectory::new(Arc::clone(&gateway), credentials.subscribe());
        let alert = AlertConfigManager::new(gateway, defaults);
        Self {
            step: Mutex::new(WizardStep::Credentials),
            transition: Mutex::new(OpState::Idle),
            credentials,
            devices,
            alert,
        }
    }

    pub fn step(&self) -> WizardStep {
        *lock(&self.step)
    }

    pub const fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    pub const fn devices(&self) -> &DeviceDirectory {
        &self.devices
    }

    pub const fn alert(&self) -> &AlertConfigManager {
        &self.alert
    }

    /// A transition is running the effects that gate its step change
    pub fn is_transitioning(&self) -> bool {
        lock(&self.transition).is_pending()
    }

    /// Last transition failure, if the previous transition aborted
    pub fn transition_error(&self) -> Option<String> {
        lock(&self.transition).error().map(str::to_string)
    }

    pub fn guard_allows(&self, guard: Guard) -> bool {
        match guard {
            Guard::Always => true,
            Guard::CredentialsComplete => self.credentials.can_advance(),
            Guard::DeviceSelected => self.devices.has_selection(),
            Guard::AlertComplete => self.alert.can_finish(self.devices.has_selection()),
        }
    }

    /// Whether `action` would pass its guard from the current step
    pub fn can(&self, action: WizardAction) -> bool {
        transition(self.step(), action).is_some_and(|t| self.guard_allows(t.guard))
    }

    pub fn can_advance(&self) -> bool {
        self.can(WizardAction::Next)
    }

    pub fn can_finish(&self) -> bool {
        self.step() == WizardStep::Alert && self.can(WizardAction::Restart(RestartScope::default()))
    }

    pub async fn next(&self) -> TransitionOutcome {
        self.dispatch(WizardAction::Next).await
    }

    pub async fn back(&self) -> TransitionOutcome {
        self.dispatch(WizardAction::Back).await
    }

    pub async fn finish(&self, scope: RestartScope) -> TransitionOutcome {
        self.dispatch(WizardAction::Restart(scope)).await
    }

    /// Evaluate `action` against the transition table and run it
    pub async fn dispatch(&self, action: WizardAction) -> TransitionOutcome {
        let from = self.step();
        let Some(row) = transition(from, action) else {
            debug!("No transition for {:?} on {:?}", action, from);
            return TransitionOutcome::NotAllowed;
        };

        if from == WizardStep::Credentials && self.credentials.is_busy() {
            debug!("Credentials call pending; ignoring {:?}", action);
            return TransitionOutcome::Busy;
        }

        if row.guard == Guard::CredentialsComplete {
            self.credentials.touch();
        }
        if !self.guard_allows(row.guard) {
            debug!("Guard {:?} blocked {:?} on {:?}", row.guard, action, from);
            return TransitionOutcome::Blocked;
        }

        if !lock(&self.transition).try_begin() {
            return TransitionOutcome::Busy;
        }

        for effect in &row.before {
            if let Err(e) = self.apply(*effect).await {
                if e.is_coalesced() {
                    *lock(&self.transition) = OpState::Idle;
                    return TransitionOutcome::Busy;
                }
                warn!("Transition {:?} -> {:?} aborted: {}", from, row.next, e);
                *lock(&self.transition) = OpState::Failed(e.to_string());
                return TransitionOutcome::Aborted(e.to_string());
            }
        }

        *lock(&self.step) = row.next;
        *lock(&self.transition) = OpState::Succeeded;
        info!("Wizard step {:?} -> {:?}", from, row.next);

        // The step change is final; follow-up effects settle in their own managers
        for effect in &row.after {
            // Failures here are reported by the manager that owns the effect
            if let Err(e) = self.apply(*effect).await {
                debug!("Post-transition effect {:?} did not complete: {}", effect, e);
            }
        }

        TransitionOutcome::Moved { from, to: row.next }
    }

    async fn apply(&self, effect: Effect) -> Result<(), WizardError> {
        match effect {
            Effect::PersistCredentials => self.credentials.persist().await,
            Effect::FetchDevicesIfEmpty => {
                if self.devices.is_empty() {
                    self.devices.fetch().await.map(|_| ())
                } else {
                    debug!("Device list already loaded; skipping fetch");
                    Ok(())
                }
            }
            Effect::PersistSelection => {
                let id = self
                    .devices
                    .selected_id()
                    .ok_or_else(|| WizardError::Validation("Select a device first".to_string()))?;
                self.devices.persist_selection(&id).await
            }
            Effect::Reset(scope) => {
                if scope.reset_credentials {
                    self.credentials.clear();
                }
                if scope.reset_device {
                    self.devices.clear();
                }
                if scope.reset_alert_config {
                    self.alert.reset();
                }
                Ok(())
            }
        }
    }
}
