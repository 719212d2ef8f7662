// ABOUTME: Smart-home device as reported by the gateway device listing
// Only healthy light fixtures are eligible for alerts

use serde::{Deserialize, Serialize};

/// Type prefix shared by every light fixture in the Yandex IoT catalogue
pub const LIGHT_TYPE_PREFIX: &str = "devices.types.light";

/// Status value of a device that answered its last health probe
pub const HEALTHY_STATUS: &str = "ok";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Online,
    #[default]
    #[serde(other)]
    Offline,
}

impl DeviceState {
    pub const fn indicator(&self) -> &'static str {
        match self {
            Self::Online => "●",
            Self::Offline => "○",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub state: DeviceState,
    // The gateway only lists devices that passed its own health probe and
    // leaves the field out, so a missing status reads as healthy.
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    HEALTHY_STATUS.to_string()
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type: device_type.into(),
            state: DeviceState::Online,
            status: default_status(),
        }
    }

    /// Light fixture with a healthy status
    pub fn is_eligible(&self) -> bool {
        self.device_type.starts_with(LIGHT_TYPE_PREFIX) && self.status == HEALTHY_STATUS
    }

    /// Name for display, falling back to the id for unnamed devices
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_with_ok_status_is_eligible() {
        let device = Device::new("d1", "Desk lamp", "devices.types.light");
        assert!(device.is_eligible());

        let ceiling = Device::new("d2", "Ceiling", "devices.types.light.ceiling");
        assert!(ceiling.is_eligible());
    }

    #[test]
    fn test_non_light_or_unhealthy_is_not_eligible() {
        let socket = Device::new("d1", "Socket", "devices.types.socket");
        assert!(!socket.is_eligible());

        let mut broken = Device::new("d2", "Lamp", "devices.types.light");
        broken.status = "offline".to_string();
        assert!(!broken.is_eligible());
    }

    #[test]
    fn test_deserialize_gateway_shape() {
        let json = r#"{"id":"abc","name":"Lamp","state":"online","type":"devices.types.light"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.id, "abc");
        assert_eq!(device.state, DeviceState::Online);
        assert_eq!(device.status, "ok");
        assert!(device.is_eligible());
    }

    #[test]
    fn test_unknown_state_reads_as_offline() {
        let json = r#"{"id":"abc","state":"unknown","type":"devices.types.light"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.state, DeviceState::Offline);
        assert_eq!(device.display_name(), "abc");
    }
}
