// ABOUTME: Setup wizard screen: header progress, one panel per step and a key-hint footer
// Reads everything from the wizard engine on each frame; holds no state of its own

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus};
use crate::models::{AlertMode, CheckOutcome, TokenKind};
use crate::wizard::{color, AlertField, OpState, WizardStep};

// Color palette from TUI style guide
const CORNFLOWER_BLUE: Color = Color::Rgb(100, 149, 237);
const GOLD: Color = Color::Rgb(255, 215, 0);
const SELECTION_GREEN: Color = Color::Rgb(100, 200, 100);
const DARK_BG: Color = Color::Rgb(25, 25, 35);
const PANEL_BG: Color = Color::Rgb(30, 30, 40);
const SOFT_WHITE: Color = Color::Rgb(220, 220, 230);
const MUTED_GRAY: Color = Color::Rgb(120, 120, 140);
const SUBDUED_BORDER: Color = Color::Rgb(60, 60, 80);
const ERROR_RED: Color = Color::Rgb(220, 80, 80);
const WARNING_YELLOW: Color = Color::Rgb(220, 180, 80);

pub struct WizardComponent;

impl WizardComponent {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, app: &App) {
        frame.render_widget(Clear, area);
        frame.render_widget(Block::default().style(Style::default().bg(DARK_BG)), area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // Header with progress
                Constraint::Min(10),   // Step panel
                Constraint::Length(1), // Status line
                Constraint::Length(3), // Navigation footer
            ])
            .split(area);

        self.render_header(frame, layout[0], app);
        match app.step() {
            WizardStep::Credentials => self.render_credentials(frame, layout[1], app),
            WizardStep::Device => self.render_devices(frame, layout[1], app),
            WizardStep::Alert => self.render_alert(frame, layout[1], app),
        }
        self.render_status(frame, layout[2], app);
        self.render_navigation(frame, layout[3], app);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, app: &App) {
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(CORNFLOWER_BLUE))
            .style(Style::default().bg(PANEL_BG));

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let completed = if app.setup.completed {
            " (configured)"
        } else {
            ""
        };
        let title = Paragraph::new(Line::from(vec![
            Span::styled("💡 ", Style::default()),
            Span::styled(
                "IoT Alert Setup",
                Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
            ),
            Span::styled(completed, Style::default().fg(SELECTION_GREEN)),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(title, rows[0]);

        self.render_progress(frame, rows[1], app.step());
    }

    /// Step progress dots
    fn render_progress(&self, frame: &mut Frame, area: Rect, current: WizardStep) {
        let steps = WizardStep::all();
        let current_idx = current.number() - 1;

        let mut spans = vec![Span::raw("  ")];
        for (idx, step) in steps.iter().enumerate() {
            let (icon, style) = if idx < current_idx {
                ("●", Style::default().fg(SELECTION_GREEN))
            } else if idx == current_idx {
                ("◉", Style::default().fg(GOLD).add_modifier(Modifier::BOLD))
            } else {
                ("○", Style::default().fg(MUTED_GRAY))
            };
            spans.push(Span::styled(icon, style));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                format!("{}. {}", step.number(), step.title()),
                if idx == current_idx {
                    Style::default().fg(SOFT_WHITE)
                } else {
                    Style::default().fg(MUTED_GRAY)
                },
            ));
            if idx < steps.len() - 1 {
                spans.push(Span::styled(" → ", Style::default().fg(SUBDUED_BORDER)));
            }
        }

        frame.render_widget(
            Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
            area,
        );
    }

    fn panel(step: WizardStep) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(CORNFLOWER_BLUE))
            .style(Style::default().bg(PANEL_BG))
            .title(format!(" {} ", step.description()))
            .title_style(Style::default().fg(GOLD).add_modifier(Modifier::BOLD))
    }

    fn input_box(label: &str, value: String, focused: bool, invalid: bool) -> Paragraph<'static> {
        let border = if invalid {
            ERROR_RED
        } else if focused {
            GOLD
        } else {
            SUBDUED_BORDER
        };
        let text = if focused { format!("{value}│") } else { value };
        Paragraph::new(text)
            .style(Style::default().fg(SOFT_WHITE))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(border))
                    .style(Style::default().bg(DARK_BG))
                    .title(format!(" {label} "))
                    .title_style(Style::default().fg(if focused { GOLD } else { MUTED_GRAY })),
            )
    }

    fn render_credentials(&self, frame: &mut Frame, area: Rect, app: &App) {
        let block = Self::panel(WizardStep::Credentials);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let credentials = app.wizard.credentials();
        let errors = if credentials.is_touched() {
            credentials.validate()
        } else {
            Default::default()
        };
        let verification = credentials.verification();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(inner);

        for (idx, kind) in TokenKind::all().iter().enumerate() {
            let value = if app.reveal_tokens {
                credentials.token(*kind)
            } else {
                credentials.masked(*kind)
            };
            let focused = app.focus == Focus::Token(*kind);
            let error = errors.get(kind).copied();
            frame.render_widget(
                Self::input_box(kind.label(), value, focused, error.is_some()),
                rows[idx * 2],
            );

            let check = verification.get(*kind);
            let note = match error {
                Some(message) => Line::from(Span::styled(
                    format!("  {message}"),
                    Style::default().fg(ERROR_RED),
                )),
                None => Line::from(vec![
                    Span::styled(format!("  {} ", check.ok.icon()), outcome_style(check.ok)),
                    Span::styled(check.message.clone(), Style::default().fg(MUTED_GRAY)),
                ]),
            };
            frame.render_widget(Paragraph::new(note), rows[idx * 2 + 1]);
        }

        let activity = match (credentials.verify_state(), credentials.save_state()) {
            (OpState::Pending, _) => Some(("🔄 Verifying tokens...", GOLD)),
            (_, OpState::Pending) => Some(("🔄 Saving tokens...", GOLD)),
            _ => None,
        };
        if let Some((text, fg)) = activity {
            frame.render_widget(
                Paragraph::new(Span::styled(text, Style::default().fg(fg)))
                    .alignment(Alignment::Center),
                rows[6],
            );
        }
    }

    fn render_devices(&self, frame: &mut Frame, area: Rect, app: &App) {
        let block = Self::panel(WizardStep::Device);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let devices = app.wizard.devices();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(inner);

        frame.render_widget(
            Self::input_box("Search", devices.query(), app.focus == Focus::Search, false),
            rows[0],
        );

        let fetch = devices.fetch_state();
        if fetch.is_pending() {
            let loading = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled("🔄 Loading lights...", Style::default().fg(GOLD))),
            ])
            .alignment(Alignment::Center);
            frame.render_widget(loading, rows[1]);
            return;
        }

        let visible = devices.visible();
        if visible.is_empty() {
            let message = match fetch.error() {
                Some(e) => Line::from(Span::styled(
                    format!("❌ {e}"),
                    Style::default().fg(ERROR_RED),
                )),
                None if devices.is_empty() => Line::from(Span::styled(
                    "No lights found. Press Ctrl+R to refresh",
                    Style::default().fg(MUTED_GRAY),
                )),
                None => Line::from(Span::styled(
                    "Nothing matches the search",
                    Style::default().fg(MUTED_GRAY),
                )),
            };
            frame.render_widget(
                Paragraph::new(vec![Line::from(""), message]).alignment(Alignment::Center),
                rows[1],
            );
            return;
        }

        let selected = devices.selected_id();
        let items: Vec<ListItem> = visible
            .iter()
            .map(|device| {
                let is_selected = selected.as_deref() == Some(device.id.as_str());
                let marker = if is_selected { "▶ " } else { "  " };
                let state_color = if device.state == crate::models::DeviceState::Online {
                    SELECTION_GREEN
                } else {
                    MUTED_GRAY
                };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, Style::default().fg(GOLD)),
                    Span::styled(device.state.indicator(), Style::default().fg(state_color)),
                    Span::raw(" "),
                    Span::styled(
                        device.display_name().to_string(),
                        if is_selected {
                            Style::default().fg(SOFT_WHITE).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(SOFT_WHITE)
                        },
                    ),
                    Span::styled(format!("  ({})", device.id), Style::default().fg(MUTED_GRAY)),
                ]))
            })
            .collect();

        frame.render_widget(
            List::new(items).style(Style::default().bg(PANEL_BG)),
            rows[1],
        );
    }

    fn render_alert(&self, frame: &mut Frame, area: Rect, app: &App) {
        let block = Self::panel(WizardStep::Alert);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let alert = app.wizard.alert();
        let config = alert.config();
        let errors = alert.validate();
        let rainbow = config.mode == AlertMode::Rainbow;

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .margin(1)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(inner);

        let form = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Mode
                Constraint::Length(3), // Color 1
                Constraint::Length(3), // Color 2
                Constraint::Length(3), // Duration
                Constraint::Length(3), // Blink interval
                Constraint::Min(1),    // Errors
            ])
            .split(columns[0]);

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Mode: ", Style::default().fg(MUTED_GRAY)),
                Span::styled(
                    config.mode.label(),
                    Style::default().fg(GOLD).add_modifier(Modifier::BOLD),
                ),
            ])),
            form[0],
        );

        let mut fields = vec![
            (AlertField::Color1, "Color", config.color1.clone(), form[1]),
            (AlertField::Duration, "Duration, s", app.duration_input.clone(), form[3]),
        ];
        if rainbow {
            fields.push((AlertField::Color2, "Second color", config.color2.clone(), form[2]));
            fields.push((
                AlertField::BlinkInterval,
                "Blink interval, s",
                app.blink_input.clone(),
                form[4],
            ));
        }

        for (field, label, value, rect) in fields {
            let focused = app.focus == Focus::Alert(field);
            let invalid = errors.contains_key(&field);
            let field_area = if matches!(field, AlertField::Color1 | AlertField::Color2) {
                let split = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Min(10), Constraint::Length(6)])
                    .split(rect);
                render_swatch(frame, split[1], &value);
                split[0]
            } else {
                rect
            };
            frame.render_widget(Self::input_box(label, value, focused, invalid), field_area);
        }

        let error_lines: Vec<Line> = errors
            .values()
            .map(|message| {
                Line::from(Span::styled(
                    format!("• {message}"),
                    Style::default().fg(ERROR_RED),
                ))
            })
            .collect();
        frame.render_widget(Paragraph::new(error_lines).wrap(Wrap { trim: true }), form[5]);

        self.render_alert_summary(frame, columns[1], app);
    }

    /// Chosen device, save state and the test log
    fn render_alert_summary(&self, frame: &mut Frame, area: Rect, app: &App) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(SUBDUED_BORDER))
            .title(" Summary ")
            .title_style(Style::default().fg(MUTED_GRAY));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let device = app
            .wizard
            .devices()
            .selected_device()
            .map(|d| d.display_name().to_string())
            .unwrap_or_else(|| "none".to_string());

        let config = app.wizard.alert().config();
        let label = |text: &str| Span::styled(format!("{text}: "), Style::default().fg(MUTED_GRAY));
        let value = |text: String| Span::styled(text, Style::default().fg(SOFT_WHITE));

        let mut lines: Vec<Line> = TokenKind::all()
            .iter()
            .map(|kind| {
                Line::from(vec![
                    label(kind.service()),
                    value(app.wizard.credentials().masked(*kind)),
                ])
            })
            .collect();
        lines.push(Line::from(vec![label("Device"), value(device)]));
        let colors = match config.mode {
            AlertMode::Single => color::display(&config.color1),
            AlertMode::Rainbow => format!(
                "{} / {}",
                color::display(&config.color1),
                color::display(&config.color2)
            ),
        };
        lines.push(Line::from(vec![label("Colors"), value(colors)]));
        lines.push(Line::from(vec![
            label("Duration"),
            value(format!("{} s", app.duration_input)),
        ]));
        if config.mode == AlertMode::Rainbow {
            lines.push(Line::from(vec![
                label("Blink"),
                value(format!("{} s", app.blink_input)),
            ]));
        }

        let saved = match app.wizard.alert().save_state() {
            OpState::Idle => Span::styled("not saved", Style::default().fg(MUTED_GRAY)),
            OpState::Pending => Span::styled("saving...", Style::default().fg(GOLD)),
            OpState::Succeeded => Span::styled("saved", Style::default().fg(SELECTION_GREEN)),
            OpState::Failed(e) => Span::styled(format!("failed: {e}"), Style::default().fg(ERROR_RED)),
        };
        lines.push(Line::from(vec![
            Span::styled("Settings: ", Style::default().fg(MUTED_GRAY)),
            saved,
        ]));

        let log = app.wizard.alert().test_log();
        if !log.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Test run:",
                Style::default().fg(MUTED_GRAY),
            )));
            for entry in log {
                let fg = if entry.starts_with("error") {
                    ERROR_RED
                } else {
                    SOFT_WHITE
                };
                lines.push(Line::from(Span::styled(
                    format!("  {entry}"),
                    Style::default().fg(fg),
                )));
            }
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, app: &App) {
        let Some(status) = &app.status else {
            return;
        };
        let (icon, fg) = if status.is_error {
            ("⚠ ", WARNING_YELLOW)
        } else {
            ("✓ ", SELECTION_GREEN)
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(icon, Style::default().fg(fg)),
                Span::styled(status.text.clone(), Style::default().fg(fg)),
            ]))
            .alignment(Alignment::Center),
            area,
        );
    }

    fn render_navigation(&self, frame: &mut Frame, area: Rect, app: &App) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(SUBDUED_BORDER))
            .style(Style::default().bg(DARK_BG));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let step = app.step();
        let mut hints: Vec<(&str, &str, bool)> = Vec::new();
        match step {
            WizardStep::Credentials => {
                hints.push(("Tab", "Field", true));
                hints.push(("^V", "Verify", true));
                hints.push(("^E", if app.reveal_tokens { "Hide" } else { "Show" }, true));
                hints.push(("Enter", "Next", app.wizard.can_advance()));
                hints.push(("Esc", "Quit", true));
            }
            WizardStep::Device => {
                hints.push(("↑/↓", "Select", true));
                hints.push(("^R", "Refresh", true));
                hints.push(("Enter", "Next", app.wizard.can_advance()));
                hints.push(("Esc", "Back", true));
            }
            WizardStep::Alert => {
                hints.push(("Tab", "Field", true));
                hints.push(("^O", "Mode", true));
                hints.push(("^S", "Save", true));
                hints.push(("^T", "Test", true));
                hints.push(("Enter", "Finish", app.wizard.can_finish()));
                hints.push(("Esc", "Back", true));
            }
        }

        let mut spans = vec![Span::raw("  ")];
        for (idx, (key, label, enabled)) in hints.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::styled("  |  ", Style::default().fg(SUBDUED_BORDER)));
            }
            spans.push(Span::styled("[", Style::default().fg(SUBDUED_BORDER)));
            spans.push(Span::styled(
                *key,
                Style::default().fg(if *enabled { GOLD } else { MUTED_GRAY }),
            ));
            spans.push(Span::styled("]", Style::default().fg(SUBDUED_BORDER)));
            spans.push(Span::styled(
                format!(" {label}"),
                Style::default().fg(if *enabled { SOFT_WHITE } else { MUTED_GRAY }),
            ));
        }

        frame.render_widget(
            Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
            inner,
        );
    }
}

impl Default for WizardComponent {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome_style(outcome: CheckOutcome) -> Style {
    Style::default().fg(match outcome {
        CheckOutcome::Ok => SELECTION_GREEN,
        CheckOutcome::Failed => ERROR_RED,
        CheckOutcome::Unknown => MUTED_GRAY,
    })
}

/// Block filled with the entered color, or empty while the input is invalid
fn render_swatch(frame: &mut Frame, area: Rect, input: &str) {
    let Some(hex) = color::normalize(input) else {
        return;
    };
    let (r, g, b) = hex.rgb();
    let swatch = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(SUBDUED_BORDER))
        .style(Style::default().bg(Color::Rgb(r, g, b)));
    frame.render_widget(swatch, area);
}
