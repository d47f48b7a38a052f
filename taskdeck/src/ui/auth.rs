//! Sign-in, registration and password reset forms.

use ratatui::{
    Frame,
    layout::{Position, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::theme::Palette;
use super::{centered_rect, column, field_text};
use crate::app::{App, Screen};

/// Render the auth form for the current screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let field_count = u16::try_from(app.form.iter().count()).unwrap_or(3);
    // Two rows per field plus the intro, error and link lines.
    let height = field_count * 2 + 9;
    let rect = centered_rect(56, height, area);

    let block = Block::default()
        .title(Span::styled(
            format!(" TaskDeck \u{00b7} {} ", app.screen.title()),
            palette.highlighted(),
        ))
        .borders(Borders::ALL)
        .border_style(palette.highlighted())
        .style(palette.normal());
    let inner = block.inner(rect);

    let mut lines = vec![
        Line::styled(intro(app.screen), palette.dimmed()),
        Line::default(),
    ];
    let label_width = app.form.iter().map(|(l, _)| l.len()).max().unwrap_or(0) + 2;
    let mut cursor = None;
    for (index, (label, field)) in app.form.iter().enumerate() {
        let focused = index == app.form.focus();
        let label_style = if focused {
            palette.highlighted()
        } else {
            palette.dimmed()
        };
        let text = field_text(field.value(), app.form.is_secret(index));
        lines.push(Line::from(vec![
            Span::styled(format!("{:<label_width$}", format!("{label}:")), label_style),
            Span::styled(text, palette.normal()),
        ]));
        lines.push(Line::default());
        if focused {
            let row = u16::try_from(lines.len()).unwrap_or(u16::MAX) - 2;
            cursor = Some(Position::new(
                inner.x + column(label_width + field.cursor()),
                inner.y + row,
            ));
        }
    }

    match &app.form_error {
        Some(err) => lines.push(Line::styled(err.as_str(), palette.panel_title(palette.error))),
        None => lines.push(Line::default()),
    }
    lines.push(Line::default());
    for link in links(app.screen) {
        lines.push(Line::styled(*link, palette.dimmed()));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, rect);

    if let Some(position) = cursor
        && inner.contains(position)
    {
        frame.set_cursor_position(position);
    }
}

const fn intro(screen: Screen) -> &'static str {
    match screen {
        Screen::Register => "Create an account to start tracking tasks.",
        Screen::ForgotPassword => "We'll email you a link to reset your password.",
        _ => "Sign in to your task list.",
    }
}

const fn links(screen: Screen) -> &'static [&'static str] {
    match screen {
        Screen::Register => &["Ctrl+G: continue with Google", "Esc/Ctrl+L: back to sign in"],
        Screen::ForgotPassword => &["Esc/Ctrl+L: back to sign in"],
        _ => &[
            "Ctrl+G: continue with Google",
            "Ctrl+R: create an account | Ctrl+F: forgot password",
        ],
    }
}
