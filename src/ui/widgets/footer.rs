//! Footer widget with keybinding hints

use crate::app::App;
use crate::controller::Status;
use crate::theme;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Key hints for the current connection status.
fn hints_for(status: Status) -> Vec<(&'static str, &'static str)> {
    let mut hints = match status {
        Status::Disconnected => vec![("Enter", "Select"), ("c", "Connect")],
        Status::Connected => vec![("d", "Disconnect")],
        Status::Connecting | Status::Disconnecting => vec![],
    };
    hints.extend([
        ("a", "All/Recommended"),
        ("r", "Refresh"),
        ("Tab", "Switch Panel"),
        ("?", "Help"),
        ("q", "Quit"),
    ]);
    hints
}

/// Render dashboard footer
pub fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let hints = hints_for(app.controller.status());
    render_hints(frame, area, &hints);
}

fn render_hints(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let mut spans = vec![Span::raw(" ")];

    for (i, (key, action)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled("[", Style::default().fg(theme::NORD_POLAR_NIGHT_4)));
        spans.push(Span::styled(
            *key,
            Style::default()
                .fg(theme::ACCENT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled("]", Style::default().fg(theme::NORD_POLAR_NIGHT_4)));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(*action, Style::default().fg(theme::INACTIVE)));
    }

    let line = Line::from(spans);
    let area_width = area.width as usize;
    let line_width = line.width();

    frame.render_widget(Paragraph::new(line), area);

    let version = format!("v{} ", crate::constants::APP_VERSION);
    if area_width > line_width + version.len() + 2 {
        #[allow(clippy::cast_possible_truncation)]
        let version_area = Rect::new(
            area.x + area.width - version.len() as u16,
            area.y,
            version.len() as u16,
            1,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                version,
                Style::default().fg(theme::NORD_POLAR_NIGHT_4),
            )),
            version_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_follow_status() {
        let keys = |s| hints_for(s).into_iter().map(|(k, _)| k).collect::<Vec<_>>();
        assert!(keys(Status::Disconnected).contains(&"c"));
        assert!(!keys(Status::Disconnected).contains(&"d"));
        assert!(keys(Status::Connected).contains(&"d"));
        assert!(!keys(Status::Connecting).contains(&"c"));
        assert!(keys(Status::Disconnecting).contains(&"q"));
    }
}
