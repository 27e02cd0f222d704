//! Help overlay

use crate::app::App;
use crate::theme;
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Keybindings grouped by section.
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "GLOBAL CONTROLS",
        &[
            ("Tab", "Switch focus (Servers/History/Logs)"),
            ("?", "Toggle help"),
            ("r", "Refresh servers and history"),
            ("q", "Quit"),
        ],
    ),
    (
        "SERVERS",
        &[
            ("j/k", "Navigate list"),
            ("Enter/s", "Select server"),
            ("a", "Recommended / all servers"),
        ],
    ),
    (
        "CONNECTION",
        &[
            ("c", "Connect to selected server"),
            ("d", "Disconnect"),
            ("Space", "Toggle connection"),
        ],
    ),
    ("HISTORY & LOG", &[("j/k", "Scroll focused panel")]),
];

/// Render help overlay
pub fn render(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 70, frame.area());

    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::ACCENT_PRIMARY))
        .title(" tunnelsim Help ");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let key_style = Style::default()
        .fg(theme::ACCENT_PRIMARY)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(theme::TEXT_PRIMARY);
    let header_style = Style::default()
        .fg(theme::WARNING)
        .add_modifier(Modifier::BOLD);
    let subtle_style = Style::default().fg(theme::INACTIVE);

    let mut lines = vec![
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                "TUNNELSIM",
                Style::default()
                    .fg(theme::ACCENT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" - Simulated VPN Dashboard "),
            Span::styled(format!("v{}", crate::constants::APP_VERSION), subtle_style),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("API: ", subtle_style),
            Span::styled(app.api_url.as_str(), desc_style),
            Span::styled("  User: ", subtle_style),
            Span::styled(app.username.as_str(), desc_style),
        ]),
    ];

    for (section, bindings) in SECTIONS {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(*section, header_style),
        ]));
        for (key, desc) in *bindings {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("{key:<10}"), key_style),
                Span::styled(*desc, desc_style),
            ]));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Press any key to close",
        subtle_style,
    )));

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);

    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
