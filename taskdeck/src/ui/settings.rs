//! Settings screen.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme::Palette;
use crate::app::App;

/// Render the settings screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let account = app
        .user
        .as_ref()
        .map_or("signed out", |u| u.email.as_deref().unwrap_or(u.uid.as_str()));

    let lines = vec![
        Line::styled("Account", palette.highlighted()),
        Line::from(vec![
            Span::styled("Signed in as  ", palette.dimmed()),
            Span::styled(account, palette.bold()),
        ]),
        Line::styled("o: sign out", palette.dimmed()),
        Line::default(),
        Line::styled("Appearance", palette.highlighted()),
        Line::from(vec![
            Span::styled("Theme         ", palette.dimmed()),
            Span::styled(app.theme.as_str(), palette.bold()),
        ]),
        Line::styled("t: switch between light and dark", palette.dimmed()),
        Line::default(),
        Line::styled("Display", palette.highlighted()),
        Line::from(vec![
            Span::styled("Date format   ", palette.dimmed()),
            Span::styled(app.date_format.as_str(), palette.bold()),
        ]),
    ];

    let block = Block::default()
        .title(Span::styled(" Settings ", palette.panel_title(palette.highlight)))
        .borders(Borders::ALL)
        .border_style(palette.highlighted());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
