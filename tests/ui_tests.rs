// ABOUTME: UI testing for the setup wizard using headless rendering
// Drives the app through key events and inspects the rendered buffer

#[path = "helpers/fake_gateway.rs"]
mod fake_gateway;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fake_gateway::{light, shared, FakeGateway};
use ratatui::{backend::TestBackend, Terminal};
use std::sync::Arc;
use std::time::Duration;

use iotalert::app::{App, EventHandler};
use iotalert::components::WizardComponent;
use iotalert::config::AppConfig;
use iotalert::models::TokenKind;
use iotalert::wizard::WizardStep;

pub struct UITestFramework {
    app: App,
    terminal: Terminal<TestBackend>,
    component: WizardComponent,
}

impl UITestFramework {
    pub fn new(fake: Arc<FakeGateway>) -> Self {
        let backend = TestBackend::new(120, 40);
        let terminal = Terminal::new(backend).unwrap();
        let app = App::new(fake, &AppConfig::default());
        Self {
            app,
            terminal,
            component: WizardComponent::new(),
        }
    }

    pub fn press(&mut self, key: KeyEvent) {
        if let Some(event) = EventHandler::handle_key_event(key, &self.app) {
            EventHandler::process_event(event, &mut self.app);
        }
    }

    pub fn press_key(&mut self, code: KeyCode) {
        self.press(KeyEvent::new(code, KeyModifiers::NONE));
    }

    pub fn press_ctrl(&mut self, c: char) {
        self.press(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    pub fn type_string(&mut self, text: &str) {
        for c in text.chars() {
            self.press_key(KeyCode::Char(c));
        }
    }

    /// Tick until `done` holds or a second passes, letting spawned calls finish
    pub async fn settle(&mut self, done: impl Fn(&App) -> bool) {
        for _ in 0..100 {
            self.app.tick();
            if done(&self.app) {
                // Pick up a step change that landed after the drain above
                self.app.tick();
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("app did not settle");
    }

    /// Render the current state and return the buffer for inspection
    pub fn render(&mut self) -> String {
        let component = &self.component;
        let app = &self.app;
        self.terminal
            .draw(|frame| {
                let area = frame.size();
                component.render(frame, area, app);
            })
            .unwrap();
        let buffer = self.terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect::<String>()
    }

    pub fn fill_tokens(&mut self) {
        self.type_string("y0_AgAAAAyandex");
        self.press_key(KeyCode::Tab);
        self.type_string("123456:telegram");
        self.press_key(KeyCode::Tab);
        self.type_string("ngrok_token_42");
    }
}

#[tokio::test]
async fn test_credentials_step_renders_form() {
    let mut ui = UITestFramework::new(shared(FakeGateway::new()));
    let screen = ui.render();

    assert!(screen.contains("IoT Alert Setup"));
    assert!(screen.contains("1. Credentials"));
    assert!(screen.contains("Yandex IoT OAuth token"));
    assert!(screen.contains("Telegram bot token"));
    assert!(screen.contains("ngrok authtoken"));
    // Errors stay hidden until the first advance attempt
    assert!(!screen.contains("is required"));
}

#[tokio::test]
async fn test_advance_with_empty_form_shows_errors() {
    let mut ui = UITestFramework::new(shared(FakeGateway::new()));
    ui.press_key(KeyCode::Enter);
    ui.settle(|app| app.status.is_some()).await;

    let screen = ui.render();
    assert!(screen.contains("Yandex IoT OAuth token is required"));
    assert!(screen.contains("ngrok token is required"));
    assert!(screen.contains("Fill in all three tokens to continue"));
    assert_eq!(ui.app.step(), WizardStep::Credentials);
}

#[tokio::test]
async fn test_tokens_are_masked_until_revealed() {
    let mut ui = UITestFramework::new(shared(FakeGateway::new()));
    ui.fill_tokens();

    let screen = ui.render();
    assert!(!screen.contains("y0_AgAAAAyandex"));
    assert!(screen.contains("••••••ndex"));

    ui.press_ctrl('e');
    let screen = ui.render();
    assert!(screen.contains("y0_AgAAAAyandex"));
    assert_eq!(
        ui.app.wizard.credentials().token(TokenKind::Ngrok),
        "ngrok_token_42"
    );
}

#[tokio::test]
async fn test_verify_shows_per_service_messages() {
    let mut ui = UITestFramework::new(shared(FakeGateway::new()));
    ui.fill_tokens();
    ui.press_ctrl('v');
    ui.settle(|app| app.status.is_some()).await;

    let screen = ui.render();
    assert!(screen.contains("token accepted"));
    assert!(screen.contains("bot @alerts_bot"));
    assert!(screen.contains("All three services verified"));
}

#[tokio::test]
async fn test_device_step_lists_lights_and_moves_selection() {
    let fake = shared(FakeGateway::with_devices(vec![
        light("lamp-1", "Kitchen lamp"),
        light("lamp-2", "Hall strip"),
    ]));
    let mut ui = UITestFramework::new(fake);
    ui.fill_tokens();
    ui.press_key(KeyCode::Enter);
    ui.settle(|app| app.step() == WizardStep::Device && !app.wizard.devices().is_empty())
        .await;

    let screen = ui.render();
    assert!(screen.contains("2. Device"));
    assert!(screen.contains("Kitchen lamp"));
    assert!(screen.contains("Hall strip"));
    assert!(screen.contains("▶ ●"));

    ui.press_key(KeyCode::Down);
    assert_eq!(
        ui.app.wizard.devices().selected_id().as_deref(),
        Some("lamp-2")
    );

    ui.type_string("kitchen");
    let screen = ui.render();
    assert!(screen.contains("Kitchen lamp"));
    assert!(!screen.contains("Hall strip"));
}

#[tokio::test]
async fn test_alert_step_rainbow_fields_and_test_log() {
    let fake = shared(FakeGateway::with_devices(vec![light("lamp-1", "Kitchen lamp")]));
    let mut ui = UITestFramework::new(fake.clone());
    ui.fill_tokens();
    ui.press_key(KeyCode::Enter);
    ui.settle(|app| app.step() == WizardStep::Device && app.wizard.devices().has_selection())
        .await;
    ui.press_key(KeyCode::Enter);
    ui.settle(|app| app.step() == WizardStep::Alert).await;

    let screen = ui.render();
    assert!(screen.contains("3. Alert"));
    assert!(screen.contains("Duration, s"));
    assert!(!screen.contains("Second color"));

    ui.press_ctrl('o');
    let screen = ui.render();
    assert!(screen.contains("Second color"));
    assert!(screen.contains("Blink interval, s"));

    ui.press_ctrl('t');
    ui.settle(|app| app.status.is_some()).await;
    let screen = ui.render();
    assert!(screen.contains("started..."));
    assert!(screen.contains("done"));
    assert_eq!(
        fake_gateway::CallCounts::get(&fake.calls.trigger_rainbow_alert),
        1
    );
}

#[tokio::test]
async fn test_invalid_duration_blocks_finish() {
    let fake = shared(FakeGateway::with_devices(vec![light("lamp-1", "Kitchen lamp")]));
    let mut ui = UITestFramework::new(fake);
    ui.fill_tokens();
    ui.press_key(KeyCode::Enter);
    ui.settle(|app| app.wizard.devices().has_selection()).await;
    ui.press_key(KeyCode::Enter);
    ui.settle(|app| app.step() == WizardStep::Alert).await;

    // Focus the duration field and wipe it
    ui.press_key(KeyCode::Tab);
    ui.press_ctrl('u');
    assert!(!ui.app.wizard.can_finish());

    let screen = ui.render();
    assert!(screen.contains("Duration must be a positive number of seconds"));

    ui.type_string("15");
    assert!(ui.app.wizard.can_finish());
    ui.press_key(KeyCode::Enter);
    ui.settle(|app| app.setup.completed).await;
    assert_eq!(ui.app.step(), WizardStep::Credentials);
    assert_eq!(ui.app.setup.device_id.as_deref(), Some("lamp-1"));
}
