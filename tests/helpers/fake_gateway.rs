// ABOUTME: In-memory gateway for integration tests with per-route call counters
// A gated fake parks every call until the test opens the gate, to observe in-flight state

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

use iotalert::gateway::{Gateway, GatewayError};
use iotalert::models::{
    AlertSettings, CheckOutcome, Credentials, Device, ServiceCheck, VerificationResult,
};
use iotalert::wizard::HexColor;

#[derive(Debug, Default)]
pub struct CallCounts {
    pub save_credentials: AtomicUsize,
    pub verify_credentials: AtomicUsize,
    pub list_devices: AtomicUsize,
    pub save_selected_device: AtomicUsize,
    pub save_alert_settings: AtomicUsize,
    pub trigger_single_alert: AtomicUsize,
    pub trigger_rainbow_alert: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeGateway {
    pub calls: CallCounts,
    pub devices: Mutex<Vec<Device>>,
    pub verification: Mutex<VerificationResult>,
    pub failure: Mutex<Option<GatewayError>>,
    pub saved_device: Mutex<Option<String>>,
    pub saved_settings: Mutex<Option<AlertSettings>>,
    /// Signalled each time a call reaches the gateway
    pub entered: Notify,
    gate: Option<Semaphore>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            calls: CallCounts::default(),
            devices: Mutex::new(Vec::new()),
            verification: Mutex::new(all_ok()),
            failure: Mutex::new(None),
            saved_device: Mutex::new(None),
            saved_settings: Mutex::new(None),
            entered: Notify::new(),
            gate: None,
        }
    }

    /// Every call waits for `open()` before answering
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn with_devices(devices: Vec<Device>) -> Self {
        let fake = Self::new();
        *fake.devices.lock().unwrap() = devices;
        fake
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        *self.devices.lock().unwrap() = devices;
    }

    /// Make every following call fail with `error`
    pub fn fail_with(&self, error: GatewayError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    /// Let all parked and future calls through
    pub fn open(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1_000);
        }
    }

    /// Let exactly one parked or future call through
    pub fn release_one(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    async fn enter(&self, counter: &AtomicUsize) -> Result<(), GatewayError> {
        counter.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

pub fn all_ok() -> VerificationResult {
    let ok = |message: &str| ServiceCheck {
        ok: CheckOutcome::Ok,
        message: message.to_string(),
    };
    VerificationResult {
        yandex: ok("token accepted"),
        telegram: ok("bot @alerts_bot"),
        ngrok: ok("tunnel ready"),
    }
}

pub fn light(id: &str, name: &str) -> Device {
    Device::new(id, name, "devices.types.light")
}

pub fn shared(fake: FakeGateway) -> Arc<FakeGateway> {
    Arc::new(fake)
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn save_credentials(&self, _credentials: &Credentials) -> Result<(), GatewayError> {
        self.enter(&self.calls.save_credentials).await
    }

    async fn verify_credentials(
        &self,
        _credentials: &Credentials,
    ) -> Result<VerificationResult, GatewayError> {
        self.enter(&self.calls.verify_credentials).await?;
        Ok(self.verification.lock().unwrap().clone())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, GatewayError> {
        self.enter(&self.calls.list_devices).await?;
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn save_selected_device(&self, device_id: &str) -> Result<(), GatewayError> {
        self.enter(&self.calls.save_selected_device).await?;
        *self.saved_device.lock().unwrap() = Some(device_id.to_string());
        Ok(())
    }

    async fn save_alert_settings(&self, settings: &AlertSettings) -> Result<(), GatewayError> {
        self.enter(&self.calls.save_alert_settings).await?;
        *self.saved_settings.lock().unwrap() = Some(settings.clone());
        Ok(())
    }

    async fn trigger_single_alert(
        &self,
        _color: &HexColor,
        _duration_sec: u32,
    ) -> Result<(), GatewayError> {
        self.enter(&self.calls.trigger_single_alert).await
    }

    async fn trigger_rainbow_alert(
        &self,
        _color: &HexColor,
        _color2: &HexColor,
        _duration_sec: u32,
    ) -> Result<(), GatewayError> {
        self.enter(&self.calls.trigger_rainbow_alert).await
    }
}
