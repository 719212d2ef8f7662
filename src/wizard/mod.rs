// ABOUTME: Wizard orchestration engine: step state machine and the three step managers
// Managers own their gateway calls; the controller only sequences them

pub mod alert;
pub mod color;
pub mod controller;
pub mod credentials;
pub mod devices;
pub mod error;
pub mod op_state;

pub use alert::{AlertConfigManager, AlertErrors, AlertField};
pub use color::HexColor;
pub use controller::{
    transition, Effect, Guard, RestartScope, Transition, TransitionOutcome, WizardAction,
    WizardController, WizardStep,
};
pub use credentials::{CredentialErrors, CredentialManager};
pub use devices::{search, DeviceDirectory};
pub use error::WizardError;
pub use op_state::OpState;
