//! Colors and styles for the light and dark themes.

use ratatui::style::{Color, Modifier, Style};

use taskdeck_model::task::Priority;

use crate::notice::NoticeLevel;
use crate::theme::ThemeMode;

/// The colors one theme draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Primary foreground color.
    pub fg: Color,
    /// Secondary foreground color (dimmed text).
    pub fg_dim: Color,
    /// Background color.
    pub bg: Color,
    /// Highlight color for focused elements.
    pub highlight: Color,
    /// Foreground on top of the highlight color.
    pub on_highlight: Color,
    /// Status bar and panel chrome background.
    pub surface: Color,
    /// Success indicator color.
    pub success: Color,
    /// Warning indicator color.
    pub warning: Color,
    /// Error indicator color.
    pub error: Color,
}

/// Light theme.
pub const LIGHT: Palette = Palette {
    fg: Color::Black,
    fg_dim: Color::DarkGray,
    bg: Color::White,
    highlight: Color::Blue,
    on_highlight: Color::White,
    surface: Color::Rgb(225, 228, 235),
    success: Color::Rgb(0, 128, 0),
    warning: Color::Rgb(180, 110, 0),
    error: Color::Rgb(190, 0, 0),
};

/// Dark theme.
pub const DARK: Palette = Palette {
    fg: Color::White,
    fg_dim: Color::Gray,
    bg: Color::Black,
    highlight: Color::Cyan,
    on_highlight: Color::Black,
    surface: Color::Rgb(30, 30, 50),
    success: Color::Green,
    warning: Color::Yellow,
    error: Color::Red,
};

impl Palette {
    /// The palette for `mode`.
    #[must_use]
    pub const fn for_mode(mode: ThemeMode) -> &'static Self {
        match mode {
            ThemeMode::Light => &LIGHT,
            ThemeMode::Dark => &DARK,
        }
    }

    /// Normal text style.
    #[must_use]
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Dimmed text style (metadata, hints).
    #[must_use]
    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    /// Bold text style.
    #[must_use]
    pub fn bold(&self) -> Style {
        Style::default().fg(self.fg).add_modifier(Modifier::BOLD)
    }

    /// Highlighted text style (focused borders, headings).
    #[must_use]
    pub fn highlighted(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    /// Selected item style (in lists).
    #[must_use]
    pub fn selected(&self) -> Style {
        Style::default()
            .fg(self.on_highlight)
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    /// Completed task style.
    #[must_use]
    pub fn done(&self) -> Style {
        self.dimmed().add_modifier(Modifier::CROSSED_OUT)
    }

    /// Status bar background.
    #[must_use]
    pub fn status_bar_bg(&self) -> Style {
        Style::default().fg(self.fg).bg(self.surface)
    }

    /// Panel title in a given color (bold).
    #[must_use]
    pub fn panel_title(&self, color: Color) -> Style {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    /// Color for a priority badge.
    #[must_use]
    pub const fn priority(&self, priority: Priority) -> Color {
        match priority {
            Priority::High => self.error,
            Priority::Medium => self.warning,
            Priority::Low => self.success,
        }
    }

    /// Color for a notice.
    #[must_use]
    pub const fn notice(&self, level: NoticeLevel) -> Color {
        match level {
            NoticeLevel::Success => self.success,
            NoticeLevel::Error => self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palettes_follow_mode() {
        assert_eq!(Palette::for_mode(ThemeMode::Dark).bg, Color::Black);
        assert_eq!(Palette::for_mode(ThemeMode::Light).bg, Color::White);
        assert_ne!(
            LIGHT.priority(Priority::High),
            LIGHT.priority(Priority::Low)
        );
    }
}
