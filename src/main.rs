//! # tunnelsim
//!
//! A simulated VPN client: a terminal dashboard that fakes connecting to a
//! catalog of VPN servers, backed by a small HTTP JSON API over SQLite.
//!
//! ## Modules
//! - [`app`]: Dashboard state and key handling.
//! - [`controller`]: Connection state machine and simulated metrics.
//! - [`worker`]: Background API calls.
//! - [`client`]: HTTP client for the API.
//! - [`server`]: Axum API server.
//! - [`store`]: SQLite persistence.
//! - [`ui`]: TUI rendering and widget definitions.

mod app;
mod cli;
mod client;
mod config;
mod constants;
mod controller;
mod event;
mod logging;
mod model;
mod server;
mod store;
mod theme;
mod ui;
mod utils;
mod worker;

use std::sync::Arc;

use app::App;
use clap::Parser;
use cli::args::Args;
use color_eyre::Result;
use config::Config;
use event::{Event, EventHandler};

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_overrides(args.api_url.as_deref(), args.user.as_deref());

    if let Some(command) = &args.command {
        return cli::commands::handle_command(command, &config);
    }

    let log_path = utils::get_app_config_dir()?.join(constants::LOG_FILE_NAME);
    logging::init_dashboard(&log_path)?;
    tracing::info!(api = %config.api_url, user = %config.username, "dashboard starting");

    let api = Arc::new(client::HttpApi::new(&config.api_url, &config.username)?);

    let terminal = ratatui::init();
    let result = run_tui(terminal, App::new(api, &config));
    ratatui::restore();

    result
}

/// Runs the main TUI event loop.
fn run_tui(mut terminal: ratatui::DefaultTerminal, mut app: App) -> Result<()> {
    let events = EventHandler::new(constants::DEFAULT_TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        match events.next()? {
            Event::Key(key_event) => app.handle_key(key_event),
            Event::Tick => app.on_tick(),
            Event::Resize(width, height) => app.on_resize(width, height),
        }
    }

    app.shutdown(constants::SHUTDOWN_GRACE);

    Ok(())
}
