//! Toast notification overlay

use crate::app::App;
use crate::controller::Severity;
use crate::theme;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Render toast notification
pub fn render(frame: &mut Frame, app: &App) {
    if let Some(ref toast) = app.toast {
        let area = frame.area();
        let width = (area.width / 3).clamp(30, 60).min(area.width);

        // Height follows the wrapped message length
        let inner_width = width.saturating_sub(4) as usize;
        let text_len = toast.message.chars().count();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let text_lines = if inner_width > 0 {
            ((text_len as f64 / inner_width as f64).ceil() as u16).max(1)
        } else {
            1
        };

        let height = (text_lines + 4).max(7).min(area.height);

        // Bottom right, clear of the footer
        let toast_area = Rect {
            x: area.width.saturating_sub(width + 1),
            y: area.height.saturating_sub(height + 1),
            width,
            height,
        };

        frame.render_widget(Clear, toast_area);

        let accent = match toast.severity {
            Severity::Info => theme::ACCENT_PRIMARY,
            Severity::Error => theme::ERROR,
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .title(Span::styled(
                format!(" {} ", toast.title),
                Style::default()
                    .fg(Color::Black)
                    .bg(accent)
                    .add_modifier(Modifier::BOLD),
            ));

        let inner_area = block.inner(toast_area);
        frame.render_widget(block, toast_area);

        let vertical_chunks = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(text_lines),
            Constraint::Fill(1),
        ])
        .split(inner_area);

        let paragraph = Paragraph::new(toast.message.as_str())
            .style(Style::default().fg(theme::TEXT_PRIMARY))
            .wrap(ratatui::widgets::Wrap { trim: true })
            .alignment(Alignment::Center);

        frame.render_widget(paragraph, vertical_chunks[1]);
    }
}
