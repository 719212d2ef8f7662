// ABOUTME: Setup wizard screen for first-time configuration
// Guides users through tokens, device choice and alert settings

pub mod component;

pub use component::WizardComponent;
