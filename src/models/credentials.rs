// ABOUTME: Third-party credentials collected on the first wizard step
// Tokens are opaque secrets; only the masked form is ever displayed or logged

use serde::Serialize;
use std::fmt;

const MASK_PREFIX: &str = "••••••";
const MASK_VISIBLE_CHARS: usize = 4;

/// Which of the three tokens a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    Yandex,
    Telegram,
    Ngrok,
}

impl TokenKind {
    /// All token kinds in form order
    pub const fn all() -> &'static [Self] {
        &[Self::Yandex, Self::Telegram, Self::Ngrok]
    }

    /// Service name used by the verify endpoint
    pub const fn service(&self) -> &'static str {
        match self {
            Self::Yandex => "yandex",
            Self::Telegram => "telegram",
            Self::Ngrok => "ngrok",
        }
    }

    /// Field label shown in the form
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Yandex => "Yandex IoT OAuth token",
            Self::Telegram => "Telegram bot token",
            Self::Ngrok => "ngrok authtoken",
        }
    }

    /// Inline error shown when the field is empty
    pub const fn required_message(&self) -> &'static str {
        match self {
            Self::Yandex => "Yandex IoT OAuth token is required",
            Self::Telegram => "Telegram bot token is required",
            Self::Ngrok => "ngrok token is required",
        }
    }
}

/// The three secrets, serialized with the field names the gateway expects
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct Credentials {
    #[serde(rename = "yandex_token")]
    pub yandex: String,
    #[serde(rename = "telegram_bot_token")]
    pub telegram: String,
    #[serde(rename = "ngrok_authtoken")]
    pub ngrok: String,
}

impl Credentials {
    pub fn new(
        yandex: impl Into<String>,
        telegram: impl Into<String>,
        ngrok: impl Into<String>,
    ) -> Self {
        Self {
            yandex: yandex.into(),
            telegram: telegram.into(),
            ngrok: ngrok.into(),
        }
    }

    pub fn get(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Yandex => &self.yandex,
            TokenKind::Telegram => &self.telegram,
            TokenKind::Ngrok => &self.ngrok,
        }
    }

    pub fn set(&mut self, kind: TokenKind, value: String) {
        match kind {
            TokenKind::Yandex => self.yandex = value,
            TokenKind::Telegram => self.telegram = value,
            TokenKind::Ngrok => self.ngrok = value,
        }
    }

    /// A token is present when its trimmed value is non-empty
    pub fn is_present(&self, kind: TokenKind) -> bool {
        !self.get(kind).trim().is_empty()
    }

    /// Masked display form of one token
    pub fn masked(&self, kind: TokenKind) -> String {
        mask_token(self.get(kind))
    }
}

// Secrets must never reach the log files through `{:?}`
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("yandex", &mask_token(&self.yandex))
            .field("telegram", &mask_token(&self.telegram))
            .field("ngrok", &mask_token(&self.ngrok))
            .finish()
    }
}

/// `"••••••"` followed by the last four characters of the trimmed token.
/// An empty token masks to an empty string.
pub fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(MASK_VISIBLE_CHARS)..]
        .iter()
        .collect();
    format!("{MASK_PREFIX}{tail}")
}
