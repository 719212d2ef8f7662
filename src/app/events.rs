// ABOUTME: Event handling for keyboard input and wizard actions
// Gateway-bound actions run on tokio tasks; their results come back as notices

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tracing::debug;

use super::state::{parse_seconds, App, Focus, Notice};
use crate::wizard::{AlertField, RestartScope, WizardController, WizardStep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Quit,
    FocusNext,
    FocusPrevious,
    InputChar(char),
    Backspace,
    ClearField,
    // Navigation
    Next,
    Back,
    Finish,
    // Step 1
    Verify,
    ToggleReveal,
    // Step 2
    RefreshDevices,
    SelectNext,
    SelectPrevious,
    // Step 3
    ToggleMode,
    SaveSettings,
    TestAlert,
}

pub struct EventHandler;

impl EventHandler {
    pub fn handle_key_event(key_event: KeyEvent, app: &App) -> Option<AppEvent> {
        let step = app.step();

        if key_event.modifiers.contains(KeyModifiers::CONTROL) {
            return match key_event.code {
                KeyCode::Char('c') | KeyCode::Char('q') => Some(AppEvent::Quit),
                KeyCode::Char('u') => Some(AppEvent::ClearField),
                KeyCode::Char('v') if step == WizardStep::Credentials => Some(AppEvent::Verify),
                KeyCode::Char('e') if step == WizardStep::Credentials => {
                    Some(AppEvent::ToggleReveal)
                }
                KeyCode::Char('r') if step == WizardStep::Device => Some(AppEvent::RefreshDevices),
                KeyCode::Char('o') if step == WizardStep::Alert => Some(AppEvent::ToggleMode),
                KeyCode::Char('s') if step == WizardStep::Alert => Some(AppEvent::SaveSettings),
                KeyCode::Char('t') if step == WizardStep::Alert => Some(AppEvent::TestAlert),
                KeyCode::Char('f') if step == WizardStep::Alert => Some(AppEvent::Finish),
                _ => None,
            };
        }

        match key_event.code {
            KeyCode::Tab => Some(AppEvent::FocusNext),
            KeyCode::BackTab => Some(AppEvent::FocusPrevious),
            KeyCode::Enter if step == WizardStep::Alert => Some(AppEvent::Finish),
            KeyCode::Enter => Some(AppEvent::Next),
            KeyCode::Esc if step == WizardStep::Credentials => Some(AppEvent::Quit),
            KeyCode::Esc => Some(AppEvent::Back),
            KeyCode::Down if step == WizardStep::Device => Some(AppEvent::SelectNext),
            KeyCode::Up if step == WizardStep::Device => Some(AppEvent::SelectPrevious),
            KeyCode::Down => Some(AppEvent::FocusNext),
            KeyCode::Up => Some(AppEvent::FocusPrevious),
            KeyCode::Backspace => Some(AppEvent::Backspace),
            KeyCode::Char(c) => Some(AppEvent::InputChar(c)),
            _ => None,
        }
    }

    pub fn process_event(event: AppEvent, app: &mut App) {
        debug!("Processing {:?} on {:?}", event, app.step());
        match event {
            AppEvent::Quit => app.quit(),
            AppEvent::FocusNext => app.cycle_focus(true),
            AppEvent::FocusPrevious => app.cycle_focus(false),
            AppEvent::InputChar(c) => Self::edit_focused(app, |text| text.push(c)),
            AppEvent::Backspace => Self::edit_focused(app, |text| {
                text.pop();
            }),
            AppEvent::ClearField => Self::edit_focused(app, String::clear),
            AppEvent::ToggleReveal => app.reveal_tokens = !app.reveal_tokens,
            AppEvent::SelectNext => app.move_selection(1),
            AppEvent::SelectPrevious => app.move_selection(-1),
            AppEvent::ToggleMode => {
                app.wizard.alert().toggle_mode();
                app.clamp_focus();
            }
            AppEvent::Next => spawn(app, |wizard| async move {
                Notice::Transition(wizard.next().await)
            }),
            AppEvent::Back => spawn(app, |wizard| async move {
                Notice::Transition(wizard.back().await)
            }),
            AppEvent::Finish => {
                let device = app.wizard.devices().selected_device();
                spawn(app, move |wizard| async move {
                    let outcome = wizard.finish(RestartScope::default()).await;
                    Notice::Finished { outcome, device }
                });
            }
            AppEvent::Verify => spawn(app, |wizard| async move {
                Notice::Verified(wizard.credentials().verify().await)
            }),
            AppEvent::RefreshDevices => spawn(app, |wizard| async move {
                Notice::DevicesFetched(wizard.devices().fetch().await.map(|d| d.len()))
            }),
            AppEvent::SaveSettings => spawn(app, |wizard| async move {
                Notice::SettingsSaved(wizard.alert().save_settings().await)
            }),
            AppEvent::TestAlert => spawn(app, |wizard| async move {
                Notice::TestFinished(wizard.alert().run_test().await)
            }),
        }
    }

    /// Apply a text edit to whatever field has focus and push it into the engine
    fn edit_focused(app: &mut App, edit: impl FnOnce(&mut String)) {
        match app.focus {
            Focus::Token(kind) => {
                let mut value = app.wizard.credentials().token(kind);
                edit(&mut value);
                app.wizard.credentials().set_token(kind, value);
            }
            Focus::Search => {
                let mut query = app.wizard.devices().query();
                edit(&mut query);
                app.wizard.devices().set_query(query);
            }
            Focus::Alert(AlertField::Color1) => {
                let mut value = app.wizard.alert().config().color1;
                edit(&mut value);
                app.wizard.alert().set_color1(value);
            }
            Focus::Alert(AlertField::Color2) => {
                let mut value = app.wizard.alert().config().color2;
                edit(&mut value);
                app.wizard.alert().set_color2(value);
            }
            Focus::Alert(AlertField::Duration) => {
                edit(&mut app.duration_input);
                app.wizard.alert().set_duration(parse_seconds(&app.duration_input));
            }
            Focus::Alert(AlertField::BlinkInterval) => {
                edit(&mut app.blink_input);
                app.wizard
                    .alert()
                    .set_blink_interval(parse_seconds(&app.blink_input));
            }
        }
    }
}

/// Run a wizard call in the background and forward its result to the app
fn spawn<F, Fut>(app: &App, call: F)
where
    F: FnOnce(Arc<WizardController>) -> Fut,
    Fut: std::future::Future<Output = Notice> + Send + 'static,
{
    let wizard = Arc::clone(&app.wizard);
    let notices = app.notifier();
    let task = call(wizard);
    tokio::spawn(async move {
        // The receiver is gone only when the app is shutting down
        let _ = notices.send(task.await);
    });
}
