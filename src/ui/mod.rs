//! UI rendering module

mod dashboard;
mod overlays;
mod widgets;

use crate::app::App;
use ratatui::Frame;

/// Main render function - dispatches to appropriate view
pub fn render(frame: &mut Frame, app: &mut App) {
    dashboard::render(frame, app);

    if app.show_help {
        overlays::help::render(frame, app);
    }

    if app.toast.is_some() {
        overlays::toast::render(frame, app);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::worker::tests::FakeApi;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;
    use std::time::Duration;

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    fn loaded_app() -> App {
        let mut app = App::new(Arc::new(FakeApi::default()), &Config::default());
        for _ in 0..500 {
            app.on_tick();
            if app.catalog_loaded {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(app.catalog_loaded);
        app
    }

    #[test]
    fn test_dashboard_renders_panels() {
        let mut app = loaded_app();
        let screen = draw(&mut app, 160, 48);
        for title in ["TUNNELSIM", "Servers: Recommended", "Server Map", "Connection History", "Event Log"] {
            assert!(screen.contains(title), "missing {title}");
        }
        assert!(screen.contains("Not connected"));
        assert!(screen.contains("Node 2"));
    }

    #[test]
    fn test_help_overlay_renders() {
        let mut app = loaded_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE));
        let screen = draw(&mut app, 160, 48);
        assert!(screen.contains("tunnelsim Help"));
    }

    #[test]
    fn test_tiny_terminal_does_not_panic() {
        let mut app = loaded_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::NONE));
        draw(&mut app, 20, 6);
    }
}
