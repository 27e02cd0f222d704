//! Core application state and logic.
//!
//! This module contains the main [`App`] struct that owns the dashboard's
//! state: the connection controller, the server catalog and connection
//! history fetched from the API, and UI state such as focus, toasts and the
//! event log.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::widgets::TableState;
use tracing::{info, warn};

use crate::client::VpnApi;
use crate::config::Config;
use crate::controller::{Controller, DisconnectPlan, Notice, Severity, Status};
use crate::model::{ConnectionHistory, Server, ServerStatus};
use crate::worker::{JobOutcome, Worker};

/// Currently focused UI panel for keyboard navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FocusedPanel {
    /// Server list.
    #[default]
    Servers,
    /// Connection history table.
    History,
    /// Event log panel.
    Logs,
}

/// Which servers the list shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ServerView {
    /// The best-scoring available servers.
    #[default]
    Recommended,
    /// The whole catalog.
    All,
}

/// Toast notification for temporary messages.
#[derive(Clone, Debug)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    /// When the toast should disappear.
    pub expires: Instant,
}

/// Main application state.
pub struct App {
    /// Flag indicating the application should exit.
    pub should_quit: bool,

    // === Connection ===
    pub controller: Controller,
    /// Identity sent to the API.
    pub username: String,
    pub api_url: String,

    // === API Data ===
    pub servers: Vec<Server>,
    pub history: Vec<ConnectionHistory>,
    /// Whether the catalog has been fetched at least once.
    pub catalog_loaded: bool,
    /// Whether history has been fetched at least once.
    pub history_loaded: bool,

    // === Event Log ===
    pub logs: Vec<String>,
    pub logs_scroll: u16,
    pub logs_auto_scroll: bool,

    // === UI State ===
    pub focused_panel: FocusedPanel,
    pub server_view: ServerView,
    pub server_list_state: TableState,
    pub history_state: TableState,
    pub show_help: bool,
    pub toast: Option<Toast>,
    pub terminal_size: (u16, u16),

    worker: Worker,
}

impl App {
    /// Creates the dashboard and starts loading the catalog and history.
    pub fn new(api: Arc<dyn VpnApi>, config: &Config) -> Self {
        let controller = Controller::new(config.controller_settings());
        Self::with_controller(api, controller, config)
    }

    /// Creates the dashboard around an existing controller.
    pub fn with_controller(api: Arc<dyn VpnApi>, controller: Controller, config: &Config) -> Self {
        let mut app = Self {
            should_quit: false,

            controller,
            username: config.username.clone(),
            api_url: config.api_url.clone(),

            servers: Vec::new(),
            history: Vec::new(),
            catalog_loaded: false,
            history_loaded: false,

            logs: Vec::new(),
            logs_scroll: 0,
            logs_auto_scroll: true,

            focused_panel: FocusedPanel::Servers,
            server_view: ServerView::Recommended,
            server_list_state: TableState::default(),
            history_state: TableState::default(),
            show_help: false,
            toast: None,
            terminal_size: (80, 24),

            worker: Worker::new(api),
        };

        app.log(&format!(
            "INIT: {} v{} starting as '{}'",
            crate::constants::APP_NAME,
            crate::constants::APP_VERSION,
            app.username
        ));
        app.log(crate::constants::MSG_BACKEND_INIT);
        app.worker.refresh_servers();
        app.worker.refresh_history();

        app
    }

    /// Add a log message with timestamp
    pub fn log(&mut self, message: &str) {
        let timestamp = crate::utils::format_local_time();
        self.logs.push(format!("{timestamp} {message}"));

        if self.logs.len() > crate::constants::MAX_LOG_LINES {
            self.logs.remove(0);
        }

        if self.logs_auto_scroll {
            #[allow(clippy::cast_possible_truncation)]
            let scroll = self.logs.len().saturating_sub(1) as u16;
            self.logs_scroll = scroll;
        }
    }

    /// Servers shown in the list for the current view.
    pub fn visible_servers(&self) -> Vec<&Server> {
        match self.server_view {
            ServerView::Recommended => {
                crate::model::recommended(&self.servers, crate::constants::RECOMMENDED_COUNT)
            }
            ServerView::All => self.servers.iter().collect(),
        }
    }

    /// Server under the list cursor.
    pub fn highlighted_server(&self) -> Option<&Server> {
        let idx = self.server_list_state.selected()?;
        self.visible_servers().get(idx).copied()
    }

    /// Looks a catalog entry up by id.
    pub fn server_by_id(&self, id: i64) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Any key closes the help overlay
        if self.show_help {
            self.show_help = false;
            return;
        }

        if key.code == KeyCode::Char('q')
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.should_quit = true;
            return;
        }

        match key.code {
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab => self.next_panel(),
            KeyCode::BackTab => self.previous_panel(),
            KeyCode::Char('c') => self.connect(),
            KeyCode::Char('d') => self.disconnect(),
            KeyCode::Char(' ') => self.toggle_connection(),
            KeyCode::Char('a') => self.toggle_server_view(),
            KeyCode::Char('r') => self.refresh(),
            _ => self.handle_panel_keys(key),
        }
    }

    fn handle_panel_keys(&mut self, key: KeyEvent) {
        match self.focused_panel {
            FocusedPanel::Servers => match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.server_previous(),
                KeyCode::Down | KeyCode::Char('j') => self.server_next(),
                KeyCode::Enter | KeyCode::Char('s') => self.select_highlighted(),
                _ => {}
            },
            FocusedPanel::History => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    step_table(&mut self.history_state, self.history.len(), false);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    step_table(&mut self.history_state, self.history.len(), true);
                }
                _ => {}
            },
            FocusedPanel::Logs => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.logs_auto_scroll = false;
                    self.logs_scroll = self.logs_scroll.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.logs_scroll = self.logs_scroll.saturating_add(1);
                    #[allow(clippy::cast_possible_truncation)]
                    let max_scroll = self.logs.len().saturating_sub(1) as u16;
                    if self.logs_scroll >= max_scroll {
                        self.logs_scroll = max_scroll;
                        self.logs_auto_scroll = true;
                    }
                }
                _ => {}
            },
        }
    }

    fn next_panel(&mut self) {
        self.focused_panel = match self.focused_panel {
            FocusedPanel::Servers => FocusedPanel::History,
            FocusedPanel::History => FocusedPanel::Logs,
            FocusedPanel::Logs => FocusedPanel::Servers,
        };
    }

    fn previous_panel(&mut self) {
        self.focused_panel = match self.focused_panel {
            FocusedPanel::Servers => FocusedPanel::Logs,
            FocusedPanel::History => FocusedPanel::Servers,
            FocusedPanel::Logs => FocusedPanel::History,
        };
    }

    fn server_next(&mut self) {
        let len = self.visible_servers().len();
        step_table(&mut self.server_list_state, len, true);
    }

    fn server_previous(&mut self) {
        let len = self.visible_servers().len();
        step_table(&mut self.server_list_state, len, false);
    }

    fn toggle_server_view(&mut self) {
        self.server_view = match self.server_view {
            ServerView::Recommended => ServerView::All,
            ServerView::All => ServerView::Recommended,
        };
        self.sync_list_cursor();
    }

    /// Points the list cursor at the selected server, or the first row.
    fn sync_list_cursor(&mut self) {
        let selected_id = self.controller.selected_server().map(|s| s.id);
        let visible = self.visible_servers();
        let idx = selected_id
            .and_then(|id| visible.iter().position(|s| s.id == id))
            .or(if visible.is_empty() { None } else { Some(0) });
        self.server_list_state.select(idx);
    }

    /// Makes the highlighted row the selected server.
    pub fn select_highlighted(&mut self) {
        let Some(server) = self.highlighted_server().cloned() else {
            return;
        };
        let maintenance = server.status == ServerStatus::Maintenance;
        let label = server.label();

        match self.controller.select_server(server) {
            Ok(notice) => {
                self.notify(&notice);
                if maintenance {
                    warn!(server = %label, "selected server is under maintenance");
                    self.log(&format!("WARN: {label} is under maintenance"));
                }
            }
            Err(e) => self.notify(&e.notice()),
        }
    }

    /// Starts connecting to the selected server.
    pub fn connect(&mut self) {
        let selected = self
            .controller
            .selected_server()
            .map(|s| (s.id, s.label(), s.status));
        let server_id = selected.as_ref().map_or(0, |(id, _, _)| *id);

        match self.controller.begin_connect(server_id, Instant::now()) {
            Ok(plan) => {
                if let Some((_, label, status)) = selected {
                    if status == ServerStatus::Maintenance {
                        warn!(server = %label, "connecting to a server under maintenance");
                        self.log(&format!("WARN: {label} is under maintenance"));
                    }
                    self.log(&format!(
                        "STATUS: Connecting to {label} as {}...",
                        plan.ip_address
                    ));
                }
                self.worker.spawn_connect(plan);
            }
            Err(e) => self.notify(&e.notice()),
        }
    }

    /// Starts disconnecting the open session.
    pub fn disconnect(&mut self) {
        match self.controller.begin_disconnect() {
            Ok(plan) => {
                self.log(&format!(
                    "STATUS: Disconnecting (session #{})...",
                    plan.connection_id
                ));
                self.worker.spawn_disconnect(plan);
            }
            Err(e) => self.notify(&e.notice()),
        }
    }

    /// Connect when idle, disconnect when connected; ignored mid-transition.
    fn toggle_connection(&mut self) {
        match self.controller.status() {
            Status::Disconnected => self.connect(),
            Status::Connected => self.disconnect(),
            Status::Connecting | Status::Disconnecting => {}
        }
    }

    /// Re-fetches the catalog and history.
    pub fn refresh(&mut self) {
        self.log("IO: Refreshing servers and history...");
        self.worker.refresh_servers();
        self.worker.refresh_history();
    }

    /// Shows a notice as a toast and records it in the event log.
    fn notify(&mut self, notice: &Notice) {
        let prefix = match notice.severity {
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
        };
        self.log(&format!("{prefix}: {notice}"));
        self.toast = Some(Toast {
            title: notice.title.clone(),
            message: notice.description.clone(),
            severity: notice.severity,
            expires: Instant::now() + crate::constants::TOAST_DURATION,
        });
    }

    /// Called on each UI tick.
    pub fn on_tick(&mut self) {
        self.on_tick_at(Instant::now());
    }

    fn on_tick_at(&mut self, now: Instant) {
        while let Some(outcome) = self.worker.try_recv() {
            self.handle_outcome(outcome, now);
        }

        self.controller.poll(now);

        if let Some(ref toast) = self.toast {
            if now > toast.expires {
                self.toast = None;
            }
        }
    }

    fn handle_outcome(&mut self, outcome: JobOutcome, now: Instant) {
        match outcome {
            JobOutcome::Connected(result) => {
                let succeeded = result.is_ok();
                if let Some(notice) = self.controller.complete_connect(result, now) {
                    self.notify(&notice);
                    if succeeded {
                        self.worker.refresh_history();
                    }
                }
            }
            JobOutcome::Disconnected(result) => {
                let succeeded = result.is_ok();
                if let Some(notice) = self.controller.complete_disconnect(result, now) {
                    self.notify(&notice);
                    if succeeded {
                        self.worker.refresh_history();
                    }
                }
            }
            JobOutcome::Servers(Ok(servers)) => {
                info!(count = servers.len(), "server catalog loaded");
                let first_load = !self.catalog_loaded;
                self.servers = servers;
                self.catalog_loaded = true;
                self.controller.on_servers_loaded(&self.servers);
                self.sync_list_cursor();
                self.log(&format!("IO: Loaded {} servers", self.servers.len()));
                if first_load {
                    self.log(crate::constants::MSG_READY);
                }
            }
            JobOutcome::History(Ok(rows)) => {
                self.history = rows;
                if self.history.is_empty() {
                    self.history_state.select(None);
                } else if self.history_state.selected().is_none() {
                    self.history_state.select(Some(0));
                }
                if !self.history_loaded {
                    self.history_loaded = true;
                    self.resume_open_session(now);
                }
            }
            JobOutcome::Servers(Err(e)) => {
                warn!("failed to load servers: {e}");
                self.notify(&Notice {
                    title: "Failed to load servers".to_string(),
                    description: e.to_string(),
                    severity: Severity::Error,
                });
            }
            JobOutcome::History(Err(e)) => {
                warn!("failed to load history: {e}");
                self.log(&format!("ERROR: Failed to load history: {e}"));
            }
        }
    }

    /// Picks up a session a previous run left open, so it can be
    /// disconnected instead of blocking every new connect.
    fn resume_open_session(&mut self, now: Instant) {
        let Some(row) = self.history.iter().find(|h| h.is_open()).cloned() else {
            return;
        };
        let server = self.server_by_id(row.server_id).cloned();
        match self.controller.resume(&row, server, now) {
            Some(notice) => {
                self.log(&format!(
                    "STATUS: Resumed open session #{} from {}",
                    row.id, row.ip_address
                ));
                self.notify(&notice);
                self.sync_list_cursor();
            }
            None => {
                warn!(connection_id = row.id, "open session not resumed");
            }
        }
    }

    /// Closes the open session before exit, waiting for in-flight jobs.
    ///
    /// Best effort: gives up after one disconnect attempt or `grace`.
    pub fn shutdown(&mut self, grace: Duration) {
        let deadline = Instant::now() + grace;
        let mut attempted = false;

        loop {
            match self.controller.status() {
                Status::Disconnected => return,
                Status::Connected if attempted => {
                    warn!("session left open on exit");
                    return;
                }
                Status::Connected => {
                    let Ok(plan) = self.controller.begin_disconnect() else {
                        return;
                    };
                    info!(connection_id = plan.connection_id, "closing session on exit");
                    self.worker.spawn_disconnect(DisconnectPlan {
                        delay: Duration::ZERO,
                        ..plan
                    });
                    attempted = true;
                }
                Status::Connecting | Status::Disconnecting => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(outcome) = self.worker.recv_timeout(remaining) else {
                warn!(status = %self.controller.status(), "gave up closing session on exit");
                return;
            };
            self.handle_outcome(outcome, Instant::now());
        }
    }

    /// Called when terminal is resized
    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
    }
}

/// Moves a table cursor one row, wrapping at both ends.
fn step_table(state: &mut TableState, len: usize, forward: bool) {
    if len == 0 {
        state.select(None);
        return;
    }
    let next = match state.selected() {
        Some(i) if forward => (i + 1) % len,
        Some(i) => i.checked_sub(1).unwrap_or(len - 1).min(len - 1),
        None => 0,
    };
    state.select(Some(next));
}
