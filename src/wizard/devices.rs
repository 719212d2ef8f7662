// ABOUTME: Step 2 of the wizard: eligible light list, search and the selected device
// Selection is always empty or the id of a device in the current list

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::error::WizardError;
use super::op_state::{lock, OpState};
use crate::gateway::Gateway;
use crate::models::Device;

#[derive(Debug, Default)]
struct DirectoryState {
    devices: Vec<Device>,
    selected: Option<String>,
    query: String,
    fetch: OpState,
    save: OpState,
    /// Credential revision the cached list belongs to
    revision: u64,
}

impl DirectoryState {
    fn clear_list(&mut self) {
        self.devices.clear();
        self.selected = None;
        self.query.clear();
        if !self.fetch.is_pending() {
            self.fetch = OpState::Idle;
        }
        if !self.save.is_pending() {
            self.save = OpState::Idle;
        }
    }

    fn replace_list(&mut self, devices: Vec<Device>) {
        self.devices = devices;
        let still_present = self
            .selected
            .as_ref()
            .is_some_and(|id| self.devices.iter().any(|d| &d.id == id));
        if !still_present {
            self.selected = self.devices.first().map(|d| d.id.clone());
        }
    }
}

pub struct DeviceDirectory {
    gateway: Arc<dyn Gateway>,
    state: Mutex<DirectoryState>,
    credential_revision: watch::Receiver<u64>,
}

impl DeviceDirectory {
    pub fn new(gateway: Arc<dyn Gateway>, credential_revision: watch::Receiver<u64>) -> Self {
        let revision = *credential_revision.borrow();
        Self {
            gateway,
            state: Mutex::new(DirectoryState {
                revision,
                ..DirectoryState::default()
            }),
            credential_revision,
        }
    }

    fn current_revision(&self) -> u64 {
        *self.credential_revision.borrow()
    }

    /// Lock the state, dropping the cached list first if credentials changed
    fn synced(&self) -> std::sync::MutexGuard<'_, DirectoryState> {
        let revision = self.current_revision();
        let mut state = lock(&self.state);
        if state.revision != revision {
            if !state.devices.is_empty() {
                debug!("Credentials changed; dropping {} cached device(s)", state.devices.len());
            }
            state.clear_list();
            state.revision = revision;
        }
        state
    }

    pub fn devices(&self) -> Vec<Device> {
        self.synced().devices.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.synced().devices.is_empty()
    }

    pub fn selected_id(&self) -> Option<String> {
        self.synced().selected.clone()
    }

    pub fn selected_device(&self) -> Option<Device> {
        let state = self.synced();
        let id = state.selected.as_ref()?;
        state.devices.iter().find(|d| &d.id == id).cloned()
    }

    pub fn has_selection(&self) -> bool {
        self.synced().selected.is_some()
    }

    pub fn fetch_state(&self) -> OpState {
        self.synced().fetch.clone()
    }

    pub fn save_state(&self) -> OpState {
        self.synced().save.clone()
    }

    pub fn query(&self) -> String {
        self.synced().query.clone()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.synced().query = query.into();
    }

    /// Devices matching the current search query, in list order
    pub fn visible(&self) -> Vec<Device> {
        let state = self.synced();
        search(&state.query, &state.devices)
    }

    /// Select a device. Ids not in the current list are ignored.
    pub fn select(&self, id: &str) -> bool {
        let mut state = self.synced();
        if state.devices.iter().any(|d| d.id == id) {
            state.selected = Some(id.to_string());
            state.save = OpState::Idle;
            true
        } else {
            debug!("Ignoring selection of unknown device {}", id);
            false
        }
    }

    /// Drop the list, selection and query (restart)
    pub fn clear(&self) {
        self.synced().clear_list();
    }

    /// Load the device list from the gateway.
    ///
    /// Ineligible devices are dropped even if the gateway returned them, and
    /// the selection is moved to the first device when it no longer exists.
    pub async fn fetch(&self) -> Result<Vec<Device>, WizardError> {
        let started_at = {
            let mut state = self.synced();
            if !state.fetch.try_begin() {
                debug!("Device fetch coalesced: already in flight");
                return Err(WizardError::InFlight);
            }
            state.revision
        };

        let result = self.gateway.list_devices().await;

        let mut state = self.synced();
        if state.revision != started_at {
            // The list belongs to credentials that no longer exist
            state.fetch = OpState::Idle;
            return Err(WizardError::Superseded);
        }
        state.fetch.settle(&result);

        let fetched = match result {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Fetching devices failed: {}", e);
                return Err(e.into());
            }
        };

        let total = fetched.len();
        let eligible: Vec<Device> = fetched.into_iter().filter(Device::is_eligible).collect();
        if eligible.len() != total {
            warn!(
                "Gateway returned {} ineligible device(s); hiding them",
                total - eligible.len()
            );
        }

        state.replace_list(eligible.clone());
        info!(
            "Loaded {} light(s); selected {:?}",
            eligible.len(),
            state.selected
        );
        Ok(eligible)
    }

    /// Save `id` as the alerting device
    pub async fn persist_selection(&self, id: &str) -> Result<(), WizardError> {
        if id.trim().is_empty() {
            return Err(WizardError::Validation("Select a device first".to_string()));
        }
        {
            let mut state = self.synced();
            if !state.save.try_begin() {
                debug!("Device save coalesced: already in flight");
                return Err(WizardError::InFlight);
            }
        }

        let result = self.gateway.save_selected_device(id).await;
        self.synced().save.settle(&result);
        match &result {
            Ok(()) => info!("Saved selected device {}", id),
            Err(e) => warn!("Saving selected device failed: {}", e),
        }
        result.map_err(WizardError::from)
    }
}

/// Case-insensitive substring match on name or id, preserving order.
/// An empty query matches everything.
pub fn search(query: &str, devices: &[Device]) -> Vec<Device> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return devices.to_vec();
    }
    devices
        .iter()
        .filter(|d| {
            d.name.to_lowercase().contains(&needle) || d.id.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, MockGateway};
    use pretty_assertions::assert_eq;

    fn lamp(id: &str, name: &str) -> Device {
        Device::new(id, name, "devices.types.light")
    }

    fn directory(gateway: MockGateway) -> (DeviceDirectory, watch::Sender<u64>) {
        let (tx, rx) = watch::channel(0);
        (DeviceDirectory::new(Arc::new(gateway), rx), tx)
    }

    fn ids(devices: &[Device]) -> Vec<&str> {
        devices.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_search_matches_name_or_id_case_insensitive() {
        let list = vec![lamp("kitchen-1", "Kitchen"), lamp("hall-2", "Hallway"), lamp("x", "KITCHEN island")];
        assert_eq!(ids(&search("kitchen", &list)), vec!["kitchen-1", "x"]);
        assert_eq!(ids(&search("HALL-2", &list)), vec!["hall-2"]);
        assert_eq!(search("", &list), list);
        assert_eq!(search("   ", &list), list);
        assert!(search("garage", &list).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_filters_ineligible_devices() {
        let mut gateway = MockGateway::new();
        gateway.expect_list_devices().returning(|| {
            let mut broken = lamp("broken", "Broken");
            broken.status = "error".to_string();
            Ok(vec![
                lamp("a", "Desk"),
                Device::new("s", "Socket", "devices.types.socket"),
                broken,
                lamp("b", "Bed"),
            ])
        });
        let (dir, _tx) = directory(gateway);

        let devices = dir.fetch().await.unwrap();
        assert_eq!(ids(&devices), vec!["a", "b"]);
        assert_eq!(dir.selected_id().as_deref(), Some("a"));
        assert!(dir.fetch_state().is_succeeded());
    }

    #[tokio::test]
    async fn test_refetch_keeps_surviving_selection() {
        let mut gateway = MockGateway::new();
        let mut round = 0;
        gateway.expect_list_devices().times(3).returning(move || {
            round += 1;
            Ok(match round {
                1 => vec![lamp("a", "A"), lamp("b", "B")],
                2 => vec![lamp("c", "C"), lamp("b", "B")],
                _ => vec![],
            })
        });
        let (dir, _tx) = directory(gateway);

        dir.fetch().await.unwrap();
        assert!(dir.select("b"));

        dir.fetch().await.unwrap();
        assert_eq!(dir.selected_id().as_deref(), Some("b"));

        dir.fetch().await.unwrap();
        assert_eq!(dir.selected_id(), None);
    }

    #[tokio::test]
    async fn test_refetch_drops_vanished_selection_to_first() {
        let mut gateway = MockGateway::new();
        let mut round = 0;
        gateway.expect_list_devices().returning(move || {
            round += 1;
            Ok(if round == 1 {
                vec![lamp("a", "A"), lamp("b", "B")]
            } else {
                vec![lamp("c", "C"), lamp("d", "D")]
            })
        });
        let (dir, _tx) = directory(gateway);

        dir.fetch().await.unwrap();
        dir.select("b");
        dir.fetch().await.unwrap();
        assert_eq!(dir.selected_id().as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_select_unknown_id_is_noop() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list_devices()
            .returning(|| Ok(vec![lamp("a", "A")]));
        let (dir, _tx) = directory(gateway);

        assert!(!dir.select("a"));
        dir.fetch().await.unwrap();
        assert!(!dir.select("ghost"));
        assert_eq!(dir.selected_id().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_list() {
        let mut gateway = MockGateway::new();
        let mut round = 0;
        gateway.expect_list_devices().returning(move || {
            round += 1;
            if round == 1 {
                Ok(vec![lamp("a", "A")])
            } else {
                Err(GatewayError::Network("timed out".to_string()))
            }
        });
        let (dir, _tx) = directory(gateway);

        dir.fetch().await.unwrap();
        let err = dir.fetch().await.unwrap_err();
        assert_eq!(err.to_string(), "timed out");
        assert_eq!(dir.fetch_state().error(), Some("timed out"));
        assert_eq!(ids(&dir.devices()), vec!["a"]);
        assert_eq!(dir.selected_id().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_credential_change_drops_cached_list() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list_devices()
            .returning(|| Ok(vec![lamp("a", "A")]));
        let (dir, tx) = directory(gateway);

        dir.fetch().await.unwrap();
        dir.set_query("a");
        assert!(!dir.is_empty());

        tx.send_modify(|r| *r += 1);
        assert!(dir.is_empty());
        assert_eq!(dir.selected_id(), None);
        assert_eq!(dir.query(), "");
        assert_eq!(dir.fetch_state(), OpState::Idle);
    }

    #[tokio::test]
    async fn test_persist_selection_failure_keeps_selection() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_list_devices()
            .returning(|| Ok(vec![lamp("a", "A")]));
        gateway
            .expect_save_selected_device()
            .withf(|id| id == "a")
            .times(1)
            .returning(|_| {
                Err(GatewayError::Status {
                    status: 400,
                    message: "device_id is required".to_string(),
                })
            });
        let (dir, _tx) = directory(gateway);

        dir.fetch().await.unwrap();
        let err = dir.persist_selection("a").await.unwrap_err();
        assert_eq!(err.to_string(), "device_id is required");
        assert_eq!(dir.selected_id().as_deref(), Some("a"));
        assert_eq!(dir.save_state().error(), Some("device_id is required"));
    }

    #[tokio::test]
    async fn test_persist_empty_id_is_validation_error() {
        let mut gateway = MockGateway::new();
        gateway.expect_save_selected_device().never();
        let (dir, _tx) = directory(gateway);
        assert!(matches!(
            dir.persist_selection("").await,
            Err(WizardError::Validation(_))
        ));
    }
}
