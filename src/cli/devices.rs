// ABOUTME: CLI devices command - list lights eligible for alerts
//
// Fetches through the device directory, so the same eligibility filter and
// search semantics apply as in the wizard

use anyhow::Result;
use serde::Serialize;

use super::{DevicesArgs, OutputFormat};
use crate::models::Device;
use crate::wizard::WizardController;

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub state: String,
}

impl From<&Device> for DeviceInfo {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            name: device.display_name().to_string(),
            state: device.state.label().to_string(),
        }
    }
}

/// Execute the devices command
pub async fn execute(args: DevicesArgs, format: OutputFormat, wizard: &WizardController) -> Result<()> {
    let devices = list_devices(&args, wizard).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&devices)?),
        OutputFormat::Text => output_text(&devices),
    }
    Ok(())
}

/// Fetch and filter the device list
pub async fn list_devices(args: &DevicesArgs, wizard: &WizardController) -> Result<Vec<DeviceInfo>> {
    let directory = wizard.devices();
    directory.fetch().await?;
    if let Some(query) = &args.search {
        directory.set_query(query.as_str());
    }
    Ok(directory.visible().iter().map(DeviceInfo::from).collect())
}

fn output_text(devices: &[DeviceInfo]) {
    if devices.is_empty() {
        println!("No eligible lights found.");
        return;
    }

    println!("{:<36} {:<30} STATE", "ID", "NAME");
    println!("{}", "-".repeat(76));
    for device in devices {
        println!("{:<36} {:<30} {}", device.id, device.name, device.state);
    }
}
