// ABOUTME: Error type returned by wizard managers and the controller

use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// Another call of the same operation is still pending; this one was coalesced
    #[error("operation already in progress")]
    InFlight,
    /// Local validation failed; nothing was sent to the gateway
    #[error("{0}")]
    Validation(String),
    /// Credentials changed while the call was pending, so its result was dropped
    #[error("credentials changed while the request was pending")]
    Superseded,
    #[error(transparent)]
    Transport(#[from] GatewayError),
}

impl WizardError {
    /// Coalesced calls are no-ops, not failures
    pub const fn is_coalesced(&self) -> bool {
        matches!(self, Self::InFlight)
    }
}
