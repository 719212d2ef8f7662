// ABOUTME: Step 1 of the wizard: token fields, validation, persistence and verification
// Every edit resets verification and bumps the credential revision watched by the device directory

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::WizardError;
use super::op_state::{lock, OpState};
use crate::gateway::Gateway;
use crate::models::{Credentials, TokenKind, VerificationResult};

/// Field → inline error. A field without an entry is valid.
pub type CredentialErrors = BTreeMap<TokenKind, &'static str>;

#[derive(Debug, Default)]
struct CredentialState {
    credentials: Credentials,
    verification: VerificationResult,
    save: OpState,
    verify: OpState,
    /// Set by the first advance or verify attempt; gates inline error display
    touched: bool,
}

pub struct CredentialManager {
    gateway: Arc<dyn Gateway>,
    state: Mutex<CredentialState>,
    revision: watch::Sender<u64>,
}

impl CredentialManager {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            gateway,
            state: Mutex::new(CredentialState::default()),
            revision,
        }
    }

    /// Invalidate-downstream signal: the value changes on every credential edit
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn set_token(&self, kind: TokenKind, value: impl Into<String>) {
        {
            let mut state = lock(&self.state);
            state.credentials.set(kind, value.into());
            state.verification = VerificationResult::default();
            if !state.verify.is_pending() {
                state.verify = OpState::Idle;
            }
        }
        self.invalidate_downstream();
        debug!("Credential {} edited", kind.service());
    }

    /// Forget all three tokens (restart with credential reset)
    pub fn clear(&self) {
        {
            let mut state = lock(&self.state);
            let save = std::mem::take(&mut state.save);
            let verify = std::mem::take(&mut state.verify);
            *state = CredentialState::default();
            // Pending calls settle into these slots when they return
            if save.is_pending() {
                state.save = save;
            }
            if verify.is_pending() {
                state.verify = verify;
            }
        }
        self.invalidate_downstream();
        info!("Credentials cleared");
    }

    fn invalidate_downstream(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    pub fn credentials(&self) -> Credentials {
        lock(&self.state).credentials.clone()
    }

    pub fn token(&self, kind: TokenKind) -> String {
        lock(&self.state).credentials.get(kind).to_string()
    }

    pub fn masked(&self, kind: TokenKind) -> String {
        lock(&self.state).credentials.masked(kind)
    }

    pub fn verification(&self) -> VerificationResult {
        lock(&self.state).verification.clone()
    }

    pub fn save_state(&self) -> OpState {
        lock(&self.state).save.clone()
    }

    pub fn verify_state(&self) -> OpState {
        lock(&self.state).verify.clone()
    }

    pub fn is_touched(&self) -> bool {
        lock(&self.state).touched
    }

    pub fn touch(&self) {
        lock(&self.state).touched = true;
    }

    /// A save or verify call is pending
    pub fn is_busy(&self) -> bool {
        let state = lock(&self.state);
        state.save.is_pending() || state.verify.is_pending()
    }

    pub fn validate(&self) -> CredentialErrors {
        validate(&lock(&self.state).credentials)
    }

    pub fn can_advance(&self) -> bool {
        self.validate().is_empty()
    }

    /// Save the current tokens to the gateway
    pub async fn persist(&self) -> Result<(), WizardError> {
        let credentials = {
            let mut state = lock(&self.state);
            state.touched = true;
            if state.verify.is_pending() || !state.save.try_begin() {
                debug!("Credential save coalesced: operation in flight");
                return Err(WizardError::InFlight);
            }
            if let Some(message) = first_error(&state.credentials) {
                state.save = OpState::Idle;
                return Err(WizardError::Validation(message.to_string()));
            }
            state.credentials.clone()
        };

        let result = self.gateway.save_credentials(&credentials).await;
        lock(&self.state).save.settle(&result);
        if let Err(e) = &result {
            warn!("Saving credentials failed: {}", e);
        }
        result.map_err(WizardError::from)
    }

    /// Save the current tokens, then ask the gateway to check them.
    ///
    /// On transport failure the verification result goes back to all-unknown
    /// and the message is kept in `verify_state()`.
    pub async fn verify(&self) -> Result<VerificationResult, WizardError> {
        let credentials = {
            let mut state = lock(&self.state);
            state.touched = true;
            if state.save.is_pending() || state.verify.is_pending() {
                debug!("Verify coalesced: operation in flight");
                return Err(WizardError::InFlight);
            }
            if let Some(message) = first_error(&state.credentials) {
                return Err(WizardError::Validation(message.to_string()));
            }
            state.verify = OpState::Pending;
            state.save = OpState::Pending;
            state.credentials.clone()
        };

        let saved = self.gateway.save_credentials(&credentials).await;
        lock(&self.state).save.settle(&saved);

        let outcome = match saved {
            Ok(()) => self.gateway.verify_credentials(&credentials).await,
            Err(e) => Err(e),
        };

        let mut state = lock(&self.state);
        state.verify.settle(&outcome);
        match outcome {
            Ok(result) => {
                if state.credentials == credentials {
                    state.verification = result.clone();
                    info!(
                        "Verification finished: yandex={:?} telegram={:?} ngrok={:?}",
                        result.yandex.ok, result.telegram.ok, result.ngrok.ok
                    );
                    Ok(result)
                } else {
                    // An edit during the call already reset the result
                    state.verify = OpState::Idle;
                    Err(WizardError::Superseded)
                }
            }
            Err(e) => {
                warn!("Verification failed: {}", e);
                state.verification = VerificationResult::default();
                Err(e.into())
            }
        }
    }
}

pub fn validate(credentials: &Credentials) -> CredentialErrors {
    TokenKind::all()
        .iter()
        .filter(|kind| !credentials.is_present(**kind))
        .map(|kind| (*kind, kind.required_message()))
        .collect()
}

fn first_error(credentials: &Credentials) -> Option<&'static str> {
    validate(credentials).into_values().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, MockGateway};
    use crate::models::{CheckOutcome, ServiceCheck};

    fn filled(manager: &CredentialManager) {
        manager.set_token(TokenKind::Yandex, "y0_token");
        manager.set_token(TokenKind::Telegram, "123:bot");
        manager.set_token(TokenKind::Ngrok, "ngrok_tok");
    }

    fn ok_result() -> VerificationResult {
        let ok = ServiceCheck {
            ok: CheckOutcome::Ok,
            message: "fine".to_string(),
        };
        VerificationResult {
            yandex: ok.clone(),
            telegram: ok.clone(),
            ngrok: ok,
        }
    }

    #[test]
    fn test_can_advance_requires_all_three_tokens() {
        let manager = CredentialManager::new(Arc::new(MockGateway::new()));
        assert!(!manager.can_advance());
        assert_eq!(manager.validate().len(), 3);

        filled(&manager);
        assert!(manager.can_advance());

        manager.set_token(TokenKind::Telegram, "   ");
        assert!(!manager.can_advance());
        let errors = manager.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(&TokenKind::Telegram), Some(&"Telegram bot token is required"));
    }

    #[test]
    fn test_edit_bumps_revision() {
        let manager = CredentialManager::new(Arc::new(MockGateway::new()));
        let rx = manager.subscribe();
        let before = *rx.borrow();
        manager.set_token(TokenKind::Yandex, "a");
        assert_ne!(*rx.borrow(), before);
    }

    #[tokio::test]
    async fn test_verify_saves_then_verifies() {
        let mut gateway = MockGateway::new();
        let mut seq = mockall::Sequence::new();
        gateway
            .expect_save_credentials()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|c| c.yandex == "y0_token")
            .returning(|_| Ok(()));
        gateway
            .expect_verify_credentials()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ok_result()));

        let manager = CredentialManager::new(Arc::new(gateway));
        filled(&manager);

        let result = manager.verify().await.unwrap();
        assert!(result.all_ok());
        assert!(manager.verification().all_ok());
        assert!(manager.verify_state().is_succeeded());
        assert!(manager.save_state().is_succeeded());
    }

    #[tokio::test]
    async fn test_verify_failure_resets_to_unknown() {
        let mut gateway = MockGateway::new();
        gateway.expect_save_credentials().returning(|_| Ok(()));
        let mut calls = 0;
        gateway.expect_verify_credentials().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(ok_result())
            } else {
                Err(GatewayError::Network("connection refused".to_string()))
            }
        });

        let manager = CredentialManager::new(Arc::new(gateway));
        filled(&manager);
        manager.verify().await.unwrap();
        assert!(manager.verification().all_ok());

        let err = manager.verify().await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert!(manager.verification().is_unknown());
        assert_eq!(manager.verify_state().error(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_save_failure_skips_verify_call() {
        let mut gateway = MockGateway::new();
        gateway.expect_save_credentials().returning(|_| {
            Err(GatewayError::Status {
                status: 500,
                message: "disk full".to_string(),
            })
        });
        gateway.expect_verify_credentials().never();

        let manager = CredentialManager::new(Arc::new(gateway));
        filled(&manager);
        let err = manager.verify().await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(manager.verification().is_unknown());
        assert_eq!(manager.save_state().error(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_verify_with_missing_token_sends_nothing() {
        let mut gateway = MockGateway::new();
        gateway.expect_save_credentials().never();
        gateway.expect_verify_credentials().never();

        let manager = CredentialManager::new(Arc::new(gateway));
        manager.set_token(TokenKind::Yandex, "only-one");
        assert!(matches!(
            manager.verify().await,
            Err(WizardError::Validation(_))
        ));
        assert!(manager.is_touched());
    }

    #[tokio::test]
    async fn test_edit_after_verify_resets_result() {
        let mut gateway = MockGateway::new();
        gateway.expect_save_credentials().returning(|_| Ok(()));
        gateway
            .expect_verify_credentials()
            .returning(|_| Ok(ok_result()));

        let manager = CredentialManager::new(Arc::new(gateway));
        filled(&manager);
        manager.verify().await.unwrap();

        manager.set_token(TokenKind::Ngrok, "other");
        assert!(manager.verification().is_unknown());
        assert_eq!(manager.verify_state(), OpState::Idle);
    }

    #[tokio::test]
    async fn test_clear_forgets_tokens() {
        let manager = CredentialManager::new(Arc::new(MockGateway::new()));
        filled(&manager);
        manager.clear();
        assert_eq!(manager.credentials(), Credentials::default());
        assert!(!manager.can_advance());
        assert_eq!(manager.masked(TokenKind::Yandex), "");
    }
}
