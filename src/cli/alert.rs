// ABOUTME: CLI alert command - fire a test alert with the configured or given settings

use anyhow::Result;

use super::{AlertArgs, OutputFormat};
use crate::models::AlertMode;
use crate::wizard::WizardController;

/// Execute the alert command
pub async fn execute(args: AlertArgs, format: OutputFormat, wizard: &WizardController) -> Result<()> {
    let outcome = run(&args, wizard).await;
    let log = wizard.alert().test_log();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&log)?),
        OutputFormat::Text => {
            for line in &log {
                println!("{line}");
            }
        }
    }
    outcome
}

/// Apply the arguments on top of the configured defaults and run the test
pub async fn run(args: &AlertArgs, wizard: &WizardController) -> Result<()> {
    let alert = wizard.alert();
    if args.rainbow {
        alert.set_mode(AlertMode::Rainbow);
    }
    if let Some(color) = &args.color {
        alert.set_color1(color.as_str());
    }
    if let Some(color2) = &args.color2 {
        alert.set_color2(color2.as_str());
    }
    if let Some(duration) = args.duration {
        alert.set_duration(duration);
    }

    alert.run_test().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertDefaults;
    use crate::gateway::MockGateway;
    use crate::wizard::alert::{TEST_DONE, TEST_STARTED};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_rainbow_alert_uses_normalized_values() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_trigger_rainbow_alert()
            .withf(|c1, c2, d| c1.as_str() == "#00FF00" && c2.as_str() == "#E30306" && *d == 3)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let wizard = WizardController::new(Arc::new(gateway), AlertDefaults::default());

        let args = AlertArgs {
            color: Some("0f0".to_string()),
            color2: None,
            duration: Some(2.5),
            rainbow: true,
        };
        run(&args, &wizard).await.unwrap();
        assert_eq!(wizard.alert().test_log(), vec![TEST_STARTED, TEST_DONE]);
    }

    #[tokio::test]
    async fn test_single_alert_with_defaults() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_trigger_single_alert()
            .withf(|c, d| c.as_str() == "#FF0000" && *d == 10)
            .times(1)
            .returning(|_, _| Ok(()));
        let wizard = WizardController::new(Arc::new(gateway), AlertDefaults::default());

        let args = AlertArgs {
            color: None,
            color2: None,
            duration: None,
            rainbow: false,
        };
        run(&args, &wizard).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_color_never_reaches_gateway() {
        let wizard = WizardController::new(Arc::new(MockGateway::new()), AlertDefaults::default());
        let args = AlertArgs {
            color: Some("red".to_string()),
            color2: None,
            duration: None,
            rainbow: false,
        };
        assert!(run(&args, &wizard).await.is_err());
        assert!(wizard.alert().test_log().is_empty());
    }
}
