// ABOUTME: CLI verify command - save tokens and check them with each service

use anyhow::{bail, Result};
use serde::Serialize;

use super::{OutputFormat, VerifyArgs};
use crate::models::{CheckOutcome, TokenKind, VerificationResult};
use crate::wizard::WizardController;

#[derive(Debug, Clone, Serialize)]
pub struct CheckInfo {
    pub service: &'static str,
    pub token: String,
    pub ok: CheckOutcome,
    pub message: String,
}

/// Execute the verify command; fails when any service rejected its token
pub async fn execute(args: VerifyArgs, format: OutputFormat, wizard: &WizardController) -> Result<()> {
    let checks = verify(&args, wizard).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&checks)?),
        OutputFormat::Text => {
            for check in &checks {
                println!(
                    "{} {:<10} {:<14} {}",
                    check.ok.icon(),
                    check.service,
                    check.token,
                    check.message
                );
            }
        }
    }

    if checks.iter().any(|c| c.ok == CheckOutcome::Failed) {
        bail!("One or more tokens were rejected");
    }
    Ok(())
}

pub async fn verify(args: &VerifyArgs, wizard: &WizardController) -> Result<Vec<CheckInfo>> {
    let credentials = wizard.credentials();
    credentials.set_token(TokenKind::Yandex, args.yandex_token.as_str());
    credentials.set_token(TokenKind::Telegram, args.telegram_token.as_str());
    credentials.set_token(TokenKind::Ngrok, args.ngrok_token.as_str());

    let result = credentials.verify().await?;
    Ok(checks(&result, |kind| credentials.masked(kind)))
}

fn checks(result: &VerificationResult, masked: impl Fn(TokenKind) -> String) -> Vec<CheckInfo> {
    TokenKind::all()
        .iter()
        .map(|kind| {
            let check = result.get(*kind);
            CheckInfo {
                service: kind.service(),
                token: masked(*kind),
                ok: check.ok,
                message: check.message.clone(),
            }
        })
        .collect()
}
