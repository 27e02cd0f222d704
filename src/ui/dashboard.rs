use std::time::Duration;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Map, MapResolution},
        Block, Borders, Cell, Paragraph, Row, Table,
    },
    Frame,
};

use super::widgets;
use crate::app::{App, FocusedPanel, ServerView};
use crate::controller::Status;
use crate::model::ServerStatus;
use crate::theme;

/// Render the dashboard view
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // 1. Header (1 row)
    // 2. Main Content (Flexible)
    // 3. Command Footer (1 row)
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(area);

    render_header(frame, app, chunks[0]);
    widgets::footer::render_dashboard(frame, app, chunks[2]);

    // Main Content: Left (Servers + Stats) | Right (Map + History/Logs)
    let main_layout = Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    let sidebar_layout = Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_layout[0]);

    render_server_list(frame, app, sidebar_layout[0]);
    render_connection_stats(frame, app, sidebar_layout[1]);

    let workspace_chunks =
        Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_layout[1]);

    render_world_map(frame, app, workspace_chunks[0]);

    let dash_chunks = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(workspace_chunks[1]);

    render_history(frame, app, dash_chunks[0]);
    render_activity_log(frame, app, dash_chunks[1]);
}

fn status_badge(status: Status) -> (&'static str, Color) {
    match status {
        Status::Disconnected => ("○ DISCONNECTED", theme::ERROR),
        Status::Connecting => ("◐ CONNECTING", theme::WARNING),
        Status::Connected => ("● CONNECTED", theme::SUCCESS),
        Status::Disconnecting => ("◑ DISCONNECTING", theme::WARNING),
    }
}

fn panel_border(app: &App, panel: FocusedPanel) -> Style {
    if app.focused_panel == panel {
        Style::default().fg(theme::BORDER_FOCUSED)
    } else {
        Style::default().fg(theme::BORDER_DEFAULT)
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let controller = &app.controller;
    let (status_text, color) = status_badge(controller.status());

    let server = controller
        .active_server_id()
        .and_then(|id| app.server_by_id(id))
        .or_else(|| controller.selected_server())
        .map_or_else(|| "None".to_string(), crate::model::Server::label);

    let ip = controller
        .ip_address()
        .map_or_else(|| crate::constants::MSG_NO_DATA.to_string(), |ip| ip.to_string());

    let uptime = crate::utils::format_duration(Duration::from_secs(controller.elapsed_secs()));
    let separator = || Span::styled(" │ ", Style::default().fg(theme::NORD_POLAR_NIGHT_4));

    let line = Line::from(vec![
        Span::styled(
            format!(" TUNNELSIM v{} ", crate::constants::APP_VERSION),
            Style::default()
                .fg(theme::ACCENT_SECONDARY)
                .add_modifier(Modifier::BOLD),
        ),
        separator(),
        Span::raw("Status: "),
        Span::styled(
            status_text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" ({server})")),
        separator(),
        Span::raw("IP: "),
        Span::styled(ip, Style::default().fg(theme::TEXT_PRIMARY)),
        separator(),
        Span::raw("User: "),
        Span::styled(&app.username, Style::default().fg(theme::NORD_GREEN)),
        separator(),
        Span::raw("Uptime: "),
        Span::styled(uptime, Style::default().fg(theme::ACCENT_SECONDARY)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

fn render_server_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = match app.server_view {
        ServerView::Recommended => " Servers: Recommended [a] ",
        ServerView::All => " Servers: All [a] ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(panel_border(app, FocusedPanel::Servers))
        .title(title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if !app.catalog_loaded {
        frame.render_widget(
            Paragraph::new(crate::constants::MSG_FETCHING)
                .alignment(Alignment::Center)
                .style(Style::default().fg(theme::INACTIVE)),
            inner,
        );
        return;
    }

    let visible = app.visible_servers();
    if visible.is_empty() {
        frame.render_widget(
            Paragraph::new("No servers available").alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let active_id = app.controller.active_server_id();
    let selected_id = app.controller.selected_server().map(|s| s.id);
    let cursor = app.server_list_state.selected();

    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let is_active = active_id == Some(s.id);
            let is_selected = selected_id == Some(s.id);
            let in_maintenance = s.status == ServerStatus::Maintenance;

            let marker = if is_active {
                Span::styled("●", Style::default().fg(theme::SUCCESS))
            } else if is_selected {
                Span::styled("▸", Style::default().fg(theme::ACCENT_PRIMARY))
            } else {
                Span::raw(" ")
            };

            let status_style = if in_maintenance {
                Style::default().fg(theme::MAINTENANCE)
            } else {
                Style::default().fg(theme::SUCCESS)
            };

            let style = if cursor == Some(i) {
                Style::default()
                    .bg(theme::ROW_SELECTED_BG)
                    .fg(theme::ROW_SELECTED_FG)
                    .add_modifier(Modifier::BOLD)
            } else if is_active {
                Style::default().fg(theme::SUCCESS)
            } else if in_maintenance {
                Style::default().fg(theme::INACTIVE)
            } else {
                Style::default().fg(theme::TEXT_SECONDARY)
            };

            Row::new(vec![
                Cell::from(marker),
                Cell::from(crate::utils::truncate(&s.name, 14)),
                Cell::from(s.country_code.to_uppercase()),
                Cell::from(format!("{}ms", s.ping)),
                Cell::from(format!("{}%", s.load)),
                Cell::from(Span::styled(s.status.as_str(), status_style)),
            ])
            .style(style)
        })
        .collect();

    let header = Row::new(vec!["", "Name", "CC", "Ping", "Load", "Status"])
        .style(Style::default().fg(theme::NORD_POLAR_NIGHT_4));

    let table = Table::new(
        rows,
        [
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(11),
        ],
    )
    .header(header);

    frame.render_stateful_widget(table, inner, &mut app.server_list_state);
}

fn render_connection_stats(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_DEFAULT))
        .title(" Connection ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let controller = &app.controller;
    let status = controller.status();
    let (status_text, color) = status_badge(status);
    let label_style = Style::default().fg(theme::TEXT_SECONDARY);
    let value_style = Style::default().fg(theme::TEXT_PRIMARY);
    let no_data = crate::constants::MSG_NO_DATA;

    let selected = controller
        .selected_server()
        .map_or_else(|| "None".to_string(), crate::model::Server::label);

    let time = if status == Status::Connected {
        crate::utils::format_connection_time(controller.elapsed_secs())
    } else {
        crate::constants::MSG_NOT_CONNECTED.to_string()
    };

    let (down, up) = controller.speeds().map_or_else(
        || (no_data.to_string(), no_data.to_string()),
        |s| {
            (
                format!("{} Mbps", s.download_mbps),
                format!("{} Mbps", s.upload_mbps),
            )
        },
    );

    let ip = controller
        .ip_address()
        .map_or_else(|| no_data.to_string(), |ip| ip.to_string());

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!(" {status_text} "),
                Style::default()
                    .bg(color)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {time}"), value_style),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Server  : ", label_style),
            Span::styled(selected, value_style),
        ]),
        Line::from(vec![
            Span::styled("  IP      : ", label_style),
            Span::styled(
                ip,
                Style::default()
                    .fg(theme::ACCENT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("  ▼ Down  : ", Style::default().fg(theme::NORD_FROST_2)),
            Span::styled(down, value_style),
        ]),
        Line::from(vec![
            Span::styled("  ▲ Up    : ", Style::default().fg(theme::NORD_GREEN)),
            Span::styled(up, value_style),
        ]),
        Line::from(vec![
            Span::styled("  Data    : ", label_style),
            Span::styled(
                crate::utils::format_data_used(controller.data_used()),
                value_style,
            ),
        ]),
    ];

    if controller
        .selected_server()
        .is_some_and(|s| s.status == ServerStatus::Maintenance)
    {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  Selected server is under maintenance",
            Style::default().fg(theme::WARNING),
        )));
    } else if status == Status::Disconnected {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                "  TIP: ",
                Style::default()
                    .fg(theme::ACCENT_SECONDARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "Select a server & press [c].",
                Style::default().fg(theme::INACTIVE),
            ),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_world_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_DEFAULT))
        .title(" Server Map ");

    let active_id = app.controller.active_server_id();
    let selected_id = app.controller.selected_server().map(|s| s.id);

    let canvas = Canvas::default()
        .block(block)
        .x_bounds([-180.0, 180.0])
        .y_bounds([-90.0, 90.0])
        .paint(|ctx| {
            ctx.draw(&Map {
                color: theme::NORD_POLAR_NIGHT_4,
                resolution: MapResolution::High,
            });
            ctx.layer();

            for server in &app.servers {
                let color = if active_id == Some(server.id) {
                    theme::SUCCESS
                } else if server.status == ServerStatus::Maintenance {
                    theme::ERROR
                } else {
                    theme::ACCENT_PRIMARY
                };
                ctx.print(
                    server.longitude,
                    server.latitude,
                    Span::styled("●", Style::default().fg(color)),
                );
                if selected_id == Some(server.id) {
                    ctx.print(
                        server.longitude + 4.0,
                        server.latitude,
                        Span::styled(
                            server.city.clone(),
                            Style::default()
                                .fg(theme::TEXT_PRIMARY)
                                .add_modifier(Modifier::BOLD),
                        ),
                    );
                }
            }
        });

    frame.render_widget(canvas, area);
}

fn render_history(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(panel_border(app, FocusedPanel::History))
        .title(" Connection History ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.history.is_empty() {
        frame.render_widget(
            Paragraph::new("No connections yet")
                .alignment(Alignment::Center)
                .style(Style::default().fg(theme::INACTIVE)),
            inner,
        );
        return;
    }

    let cursor = app.history_state.selected();
    let rows: Vec<Row> = app
        .history
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let server = app
                .server_by_id(h.server_id)
                .map_or_else(|| format!("#{}", h.server_id), |s| s.name.clone());
            let style = if cursor == Some(i) && app.focused_panel == FocusedPanel::History {
                Style::default()
                    .bg(theme::ROW_SELECTED_BG)
                    .fg(theme::ROW_SELECTED_FG)
            } else if h.is_open() {
                Style::default().fg(theme::SUCCESS)
            } else {
                Style::default().fg(theme::TEXT_SECONDARY)
            };

            Row::new(vec![
                Cell::from(crate::utils::truncate(&server, 12)),
                Cell::from(h.ip_address.clone()),
                Cell::from(crate::utils::format_timestamp(h.connected_at)),
                Cell::from(crate::utils::format_history_duration(h.duration)),
                Cell::from(crate::utils::format_history_data(h.data_used)),
            ])
            .style(style)
        })
        .collect();

    let header = Row::new(vec!["Server", "IP", "Connected", "Duration", "Data"])
        .style(Style::default().fg(theme::NORD_POLAR_NIGHT_4));

    let table = Table::new(
        rows,
        [
            Constraint::Min(8),
            Constraint::Length(15),
            Constraint::Length(22),
            Constraint::Length(8),
            Constraint::Length(9),
        ],
    )
    .header(header);

    frame.render_stateful_widget(table, inner, &mut app.history_state);
}

fn render_activity_log(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(panel_border(app, FocusedPanel::Logs))
        .title(" Event Log ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.logs.is_empty() {
        frame.render_widget(
            Paragraph::new("No activity yet").alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let logs: Vec<Line> = app
        .logs
        .iter()
        .map(|msg| {
            let (timestamp, content) = msg.split_once(' ').unwrap_or(("", msg.as_str()));

            let style = if content.starts_with("ERROR") {
                Style::default().fg(theme::ERROR)
            } else if content.starts_with("WARN") {
                Style::default().fg(theme::WARNING)
            } else if content.contains("Connected") || content.starts_with("SUCCESS") {
                Style::default().fg(theme::SUCCESS)
            } else if content.starts_with("STATUS") {
                Style::default().fg(theme::ACCENT_SECONDARY)
            } else {
                Style::default().fg(theme::INACTIVE)
            };

            Line::from(vec![
                Span::styled(
                    format!("[{timestamp}] "),
                    Style::default().fg(theme::TEXT_SECONDARY),
                ),
                Span::styled(content, style),
            ])
        })
        .collect();

    #[allow(clippy::cast_possible_truncation)]
    let scroll_offset = if app.logs_auto_scroll {
        logs.len().saturating_sub(inner.height as usize) as u16
    } else {
        app.logs_scroll
    };

    frame.render_widget(
        Paragraph::new(logs)
            .wrap(ratatui::widgets::Wrap { trim: true })
            .scroll((scroll_offset, 0)),
        inner,
    );
}
