// ABOUTME: Main entry point for iotalert with TUI and CLI support
//
// Binary: iotalert
// Usage: iotalert [COMMAND]
// - No command: launches the setup wizard
// - devices: list eligible lights
// - verify: save and check tokens
// - alert: fire a test alert

#![allow(missing_docs)]

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, prelude::*};
use std::{
    io::{self, IsTerminal},
    sync::Arc,
    time::{Duration, Instant},
};

use iotalert::app::{App, EventHandler};
use iotalert::cli::{self, Commands};
use iotalert::components::WizardComponent;
use iotalert::config::{AppConfig, SetupRecord};
use iotalert::gateway::HttpGateway;

/// Terminal cleanup utility to ensure proper restoration
fn cleanup_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Unified terminal cleanup that works with a terminal instance
fn cleanup_terminal_with_instance<B: Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    setup_panic_handler();

    let args = cli::Cli::parse();
    let config = cli::load_config(args.api_url)?;
    tracing::info!("Using gateway at {}", config.gateway.api_url);

    let result = match args.command {
        Some(Commands::Devices(devices_args)) => {
            let wizard = cli::connect(&config)?;
            cli::devices::execute(devices_args, args.format, &wizard).await
        }
        Some(Commands::Verify(verify_args)) => {
            let wizard = cli::connect(&config)?;
            cli::verify::execute(verify_args, args.format, &wizard).await
        }
        Some(Commands::Alert(alert_args)) => {
            let wizard = cli::connect(&config)?;
            cli::alert::execute(alert_args, args.format, &wizard).await
        }

        // TUI mode (explicit or default)
        Some(Commands::Tui) | None => {
            let mut app = build_app(&config)?;

            // Flush pending terminal events so stray keypresses do not land in the first field
            while event::poll(Duration::from_millis(10)).unwrap_or(false) {
                let _ = event::read();
            }

            run_tui(&mut app).await
        }
    };

    if result.is_err() {
        cleanup_terminal();
    }

    result
}

fn build_app(config: &AppConfig) -> Result<App> {
    let gateway = HttpGateway::new(&config.gateway.api_url, config.gateway.timeout())?;
    let app = App::new(Arc::new(gateway), config);

    let path = SetupRecord::record_path()?;
    let record = SetupRecord::load_from(&path).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable setup record: {:#}", e);
        SetupRecord::default()
    });
    if record.completed {
        tracing::info!("Setup was completed before; starting the wizard again");
    }
    Ok(app.with_setup_record(record, path))
}

async fn run_tui(app: &mut App) -> Result<()> {
    if !IsTerminal::is_terminal(&io::stdout()) {
        return Err(anyhow::anyhow!(
            "No TTY detected. This application requires a terminal.\n\
             Use the devices, verify or alert commands for scripted use."
        ));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Ensure terminal cleanup happens even if there's an error
    let result = run_tui_loop(app, &mut terminal).await;

    if let Err(e) = cleanup_terminal_with_instance(&mut terminal) {
        tracing::error!("Failed to cleanup terminal: {}", e);
        cleanup_terminal();
    }

    result
}

async fn run_tui_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let component = WizardComponent::new();

    loop {
        terminal.draw(|frame| {
            let area = frame.size();
            component.render(frame, area, app);
        })?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    if let Some(app_event) = EventHandler::handle_key_event(key_event, app) {
                        EventHandler::process_event(app_event, app);
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }

        // Let spawned gateway calls make progress between frames
        tokio::task::yield_now().await;
    }

    Ok(())
}

fn setup_logging() {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    let log_dir = AppConfig::base_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| std::path::PathBuf::from(".iotalert/logs"));

    let _ = std::fs::create_dir_all(&log_dir);

    // JSONL log file with timestamp
    let log_file = log_dir.join(format!(
        "iotalert-{}.jsonl",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "iotalert=info".into());

    // Logging must never keep the wizard from starting
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_file) else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::sink))
            .with(filter)
            .init();
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_writer(file)
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn setup_panic_handler() {
    use tracing::error;

    std::panic::set_hook(Box::new(|panic_info| {
        // Ensure terminal is restored before logging the panic
        cleanup_terminal();

        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs in ~/.iotalert/logs for more details.");
    }));
}
