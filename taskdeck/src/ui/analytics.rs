//! Analytics screen: status and priority charts.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, Paragraph},
};

use super::theme::Palette;
use crate::analytics::Analytics;
use crate::app::App;
use crate::filter::percent;

/// Render the analytics screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let block = Block::default()
        .title(Span::styled(" Analytics ", palette.panel_title(palette.highlight)))
        .borders(Borders::ALL)
        .border_style(palette.highlighted());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let stats = Analytics::from_tasks(&app.snapshot.tasks);
    if stats.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::styled(
                "No tasks to analyze yet. Add a few on the dashboard.",
                palette.dimmed(),
            )),
            inner,
        );
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)])
        .split(inner);

    let total = stats.status.completed + stats.status.active;
    let done = percent(stats.status.completed, total);
    let gauge = Gauge::default()
        .block(Block::default().title("Completion").borders(Borders::ALL))
        .gauge_style(palette.panel_title(palette.success))
        .percent(done)
        .label(format!("{}/{total} tasks ({done}%)", stats.status.completed));
    frame.render_widget(gauge, rows[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    render_status_chart(frame, charts[0], &stats, palette);
    render_priority_chart(frame, charts[1], &stats, palette);
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn render_status_chart(frame: &mut Frame, area: Rect, stats: &Analytics, palette: &Palette) {
    let bars = [
        Bar::default()
            .value(count(stats.status.completed))
            .label(Line::from("Completed"))
            .style(palette.panel_title(palette.success)),
        Bar::default()
            .value(count(stats.status.active))
            .label(Line::from("Active"))
            .style(palette.panel_title(palette.warning)),
    ];
    let chart = BarChart::default()
        .block(Block::default().title("By status").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(9)
        .bar_gap(2)
        .value_style(palette.selected());
    frame.render_widget(chart, area);
}

fn render_priority_chart(frame: &mut Frame, area: Rect, stats: &Analytics, palette: &Palette) {
    let mut chart = BarChart::default()
        .block(
            Block::default()
                .title(Line::from(vec![
                    Span::raw("By priority "),
                    Span::styled("\u{25a0} active ", palette.panel_title(palette.warning)),
                    Span::styled("\u{25a0} completed", palette.panel_title(palette.success)),
                ]))
                .borders(Borders::ALL),
        )
        .bar_width(5)
        .bar_gap(1)
        .group_gap(3)
        .value_style(palette.selected());
    for counts in &stats.by_priority {
        let bars = [
            Bar::default()
                .value(count(counts.active))
                .style(palette.panel_title(palette.warning)),
            Bar::default()
                .value(count(counts.completed))
                .style(palette.panel_title(palette.success)),
        ];
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(counts.priority.label()))
                .bars(&bars),
        );
    }
    frame.render_widget(chart, area);
}
