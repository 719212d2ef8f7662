// ABOUTME: Per-service outcome of a credential verification round-trip
// `Unknown` means "not checked yet" and is the reset value after any edit or failure

use serde::{Deserialize, Serialize};

use super::credentials::TokenKind;

const NOT_CHECKED: &str = "not checked";

/// Tri-state result of checking one service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckOutcome {
    Ok,
    Failed,
    #[default]
    Unknown,
}

impl CheckOutcome {
    pub const fn icon(&self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Failed => "✗",
            Self::Unknown => "?",
        }
    }
}

impl From<Option<bool>> for CheckOutcome {
    fn from(ok: Option<bool>) -> Self {
        match ok {
            Some(true) => Self::Ok,
            Some(false) => Self::Failed,
            None => Self::Unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireCheck {
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

/// Outcome plus the human-readable message the gateway attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireCheck")]
pub struct ServiceCheck {
    pub ok: CheckOutcome,
    pub message: String,
}

impl From<WireCheck> for ServiceCheck {
    fn from(wire: WireCheck) -> Self {
        Self {
            ok: wire.ok.into(),
            message: wire.message.unwrap_or_default(),
        }
    }
}

impl Default for ServiceCheck {
    fn default() -> Self {
        Self {
            ok: CheckOutcome::Unknown,
            message: NOT_CHECKED.to_string(),
        }
    }
}

/// Verification outcome for all three services. Entries missing from a
/// gateway reply stay `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(default)]
    pub yandex: ServiceCheck,
    #[serde(default)]
    pub telegram: ServiceCheck,
    #[serde(default)]
    pub ngrok: ServiceCheck,
}

impl VerificationResult {
    pub const fn get(&self, kind: TokenKind) -> &ServiceCheck {
        match kind {
            TokenKind::Yandex => &self.yandex,
            TokenKind::Telegram => &self.telegram,
            TokenKind::Ngrok => &self.ngrok,
        }
    }

    /// True when nothing has been checked since the last reset
    pub fn is_unknown(&self) -> bool {
        TokenKind::all()
            .iter()
            .all(|kind| self.get(*kind).ok == CheckOutcome::Unknown)
    }

    /// True when every service reported success
    pub fn all_ok(&self) -> bool {
        TokenKind::all()
            .iter()
            .all(|kind| self.get(*kind).ok == CheckOutcome::Ok)
    }
}
