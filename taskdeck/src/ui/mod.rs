//! Terminal UI rendering.

pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod settings;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Flex, Layout, Rect},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::{App, Screen};
use theme::Palette;

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let palette = Palette::for_mode(app.theme);
    frame.render_widget(Block::default().style(palette.normal()), frame.area());

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let content_area = main_chunks[0];
    let status_area = main_chunks[1];

    match app.screen {
        Screen::Login | Screen::Register | Screen::ForgotPassword => {
            auth::render(frame, content_area, app, palette);
        }
        Screen::Dashboard => dashboard::render(frame, content_area, app, palette),
        Screen::Analytics => analytics::render(frame, content_area, app, palette),
        Screen::Settings => settings::render(frame, content_area, app, palette),
    }

    render_notices(frame, content_area, app, palette);
    status_bar::render(frame, status_area, app, palette);
}

/// Stacks the visible notices in the top-right corner.
fn render_notices(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let width = area.width.min(48);
    let mut y = area.y;
    for notice in app.notices.iter() {
        if y + 3 > area.bottom() {
            break;
        }
        let rect = Rect::new(area.right().saturating_sub(width), y, width, 3);
        let color = palette.notice(notice.level);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(palette.panel_title(color))
            .style(palette.normal());
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(Line::styled(notice.message.as_str(), palette.bold())).block(block),
            rect,
        );
        y += 3;
    }
}

/// A `width` x `height` rectangle centered in `area`, clipped to fit.
#[must_use]
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    rect
}

/// Text of a one-line input, masked when `secret`.
#[must_use]
pub fn field_text(value: &str, secret: bool) -> String {
    if secret {
        "\u{2022}".repeat(value.chars().count())
    } else {
        value.to_string()
    }
}

/// Clamps a character offset to a terminal column offset.
#[must_use]
pub fn column(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}
