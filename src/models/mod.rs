// ABOUTME: Core data models for the setup wizard: credentials, devices, verification and alert settings

pub mod alert;
pub mod credentials;
pub mod device;
pub mod verification;

pub use alert::{AlertConfig, AlertMode, AlertSettings};
pub use credentials::{Credentials, TokenKind};
pub use device::{Device, DeviceState};
pub use verification::{CheckOutcome, ServiceCheck, VerificationResult};
