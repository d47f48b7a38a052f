//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme::Palette;
use crate::app::{App, Overlay, Screen};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let (dot_color, status_text) = match &app.user {
        Some(user) => (
            palette.success,
            user.email.clone().unwrap_or_else(|| user.uid.to_string()),
        ),
        None => (palette.fg_dim, "Signed out".to_string()),
    };

    let status_line = Line::from(vec![
        Span::styled(concat!("TaskDeck v", env!("CARGO_PKG_VERSION")), palette.bold()),
        Span::raw(" | "),
        Span::styled("\u{25cf}", palette.bold().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(" | "),
        Span::styled(app.screen.title(), palette.highlighted()),
        Span::raw(" | "),
        Span::styled(help_text(app), palette.dimmed()),
    ]);

    let paragraph = Paragraph::new(status_line).style(palette.status_bar_bg());
    frame.render_widget(paragraph, area);
}

/// Key help for whatever currently has focus.
#[must_use]
pub const fn help_text(app: &App) -> &'static str {
    match (&app.overlay, app.screen) {
        (Some(Overlay::Editor(_)), _) => "Enter: save | Tab: next | Ctrl+P: priority | Esc: cancel",
        (Some(Overlay::Detail { .. }), _) => "a: add | Space: toggle | x: delete | Esc: close",
        (Some(Overlay::ConfirmDelete(_)), _) => "y: delete | n: cancel",
        (None, Screen::Login | Screen::Register | Screen::ForgotPassword) => {
            "Enter: submit | Tab: next field | Esc: back/quit"
        }
        (None, Screen::Dashboard) if app.searching => "type to search | Enter/Esc: done",
        (None, Screen::Dashboard) => {
            concat!(
                "n: new | e: edit | Space: done | d: delete | Enter: subtasks | ",
                "/: search | c/p: filter | 2: analytics | 3: settings | q: quit",
            )
        }
        (None, Screen::Analytics) => "1: dashboard | 3: settings | Esc: back | q: quit",
        (None, Screen::Settings) => "t: theme | o: sign out | 1: dashboard | Esc: back | q: quit",
    }
}
