//! Dashboard rendering: task cards, filters, summary sidebar and the modal
//! overlays.

use chrono::{Local, NaiveDate};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};

use taskdeck_model::task::{Priority, Task};

use super::theme::Palette;
use super::{centered_rect, column};
use crate::analytics::{SubtaskProgress, format_due_date, is_overdue};
use crate::app::form::{EditorMode, TaskEditor, TextField};
use crate::app::{App, Overlay};
use crate::filter::{DashboardSummary, StatusTab, categories};

/// Width of the subtask progress bar in cells.
const PROGRESS_WIDTH: usize = 10;

/// Render the dashboard and any open overlay.
pub fn render(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    render_tasks(frame, columns[0], app, palette);
    render_sidebar(frame, columns[1], app, palette);

    match &app.overlay {
        Some(Overlay::Editor(editor)) => render_editor(frame, area, editor, palette),
        Some(Overlay::Detail {
            task,
            selected,
            input,
        }) => {
            if let Some(task) = app.task(task) {
                render_detail(frame, area, app, task, *selected, input.as_ref(), palette);
            }
        }
        Some(Overlay::ConfirmDelete(id)) => {
            let title = app.task(id).map_or("this task", |t| t.title.as_str());
            render_confirm(frame, area, title, palette);
        }
        None => {}
    }
}

fn render_tasks(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let block = Block::default()
        .title(Span::styled(" Tasks ", palette.panel_title(palette.highlight)))
        .borders(Borders::ALL)
        .border_style(palette.highlighted());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tabs
            Constraint::Length(1), // Filters
            Constraint::Min(1),    // Cards
        ])
        .split(inner);

    let summary = DashboardSummary::from_tasks(&app.snapshot.tasks);
    let tabs = Tabs::new(vec![
        format!("Active ({})", summary.active),
        format!("Completed ({})", summary.completed),
    ])
    .select(match app.tab {
        StatusTab::Active => 0,
        StatusTab::Completed => 1,
    })
    .style(palette.dimmed())
    .highlight_style(palette.selected());
    frame.render_widget(tabs, rows[0]);

    render_filter_line(frame, rows[1], app, palette);

    if app.snapshot.loading {
        frame.render_widget(
            Paragraph::new(Line::styled("Loading tasks...", palette.dimmed())),
            rows[2],
        );
        return;
    }
    if let Some(err) = &app.snapshot.error {
        frame.render_widget(
            Paragraph::new(Line::styled(err.as_str(), palette.panel_title(palette.error))),
            rows[2],
        );
        return;
    }

    let visible = app.visible_tasks();
    if visible.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::styled(
                app.filter.empty_message(app.tab),
                palette.dimmed(),
            ))
            .wrap(Wrap { trim: true }),
            rows[2],
        );
        return;
    }

    let today = Local::now().date_naive();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|task| task_card(task, app, today, palette))
        .collect();
    let list = List::new(items).highlight_style(palette.selected());
    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, rows[2], &mut state);
}

fn render_filter_line(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let search_style = if app.searching {
        palette.highlighted()
    } else {
        palette.dimmed()
    };
    let mut spans = vec![
        Span::styled("/ ", search_style),
        Span::styled(
            if app.search.value().is_empty() && !app.searching {
                "search".to_string()
            } else {
                app.search.value().to_string()
            },
            search_style,
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "category: {}",
                app.filter.category.as_deref().unwrap_or("all")
            ),
            palette.dimmed(),
        ),
        Span::raw("  "),
        Span::styled(
            format!(
                "priority: {}",
                app.filter.priority.map_or("all", Priority::label)
            ),
            palette.dimmed(),
        ),
    ];
    let active = app.filter.active_count();
    if active > 0 {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("[{active} active \u{00b7} r: reset]"),
            palette.highlighted(),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    if app.searching {
        frame.set_cursor_position(Position::new(
            area.x + 2 + column(app.search.cursor()),
            area.y,
        ));
    }
}

fn task_card<'a>(
    task: &'a Task,
    app: &App,
    today: NaiveDate,
    palette: &Palette,
) -> ListItem<'a> {
    let title_style = if task.completed {
        palette.done()
    } else {
        palette.bold()
    };
    let checkbox = if task.completed { "[\u{2713}]" } else { "[ ]" };

    let mut head = vec![
        Span::styled(checkbox, title_style),
        Span::raw(" "),
        Span::styled(task.title.as_str(), title_style),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", task.priority.label()),
            palette.panel_title(palette.priority(task.priority)),
        ),
    ];
    if let Some(due) = task.due_date {
        let overdue = is_overdue(task, today);
        let style = if overdue {
            palette.panel_title(palette.error)
        } else {
            palette.dimmed()
        };
        head.push(Span::raw("  "));
        head.push(Span::styled(
            format!(
                "due {}{}",
                format_due_date(due, &app.date_format),
                if overdue { " (overdue)" } else { "" }
            ),
            style,
        ));
    }

    let mut lines = vec![Line::from(head)];
    if let Some(description) = &task.description {
        lines.push(Line::styled(format!("    {description}"), palette.dimmed()));
    }

    let mut meta: Vec<Span> = Vec::new();
    if let Some(category) = &task.category {
        meta.push(Span::styled(
            format!("    {category}"),
            palette.panel_title(palette.highlight),
        ));
    }
    if !task.tags.is_empty() {
        let tags = task
            .tags
            .iter()
            .map(|t| format!("#{t}"))
            .collect::<Vec<_>>()
            .join(" ");
        meta.push(Span::styled(format!("    {tags}"), palette.dimmed()));
    }
    if !meta.is_empty() {
        lines.push(Line::from(meta));
    }

    let progress = SubtaskProgress::of(task);
    if progress.total > 0 {
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(progress_bar(progress.percent()), palette.highlighted()),
            Span::styled(
                format!(
                    " {}/{} subtasks ({}%)",
                    progress.completed,
                    progress.total,
                    progress.percent()
                ),
                palette.dimmed(),
            ),
        ]));
    }
    lines.push(Line::default());
    ListItem::new(lines)
}

/// A fixed-width text progress bar for a percentage.
#[must_use]
pub fn progress_bar(percent: u16) -> String {
    let filled = (usize::from(percent.min(100)) * PROGRESS_WIDTH + 50) / 100;
    format!(
        "{}{}",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(PROGRESS_WIDTH - filled)
    )
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let summary = DashboardSummary::from_tasks(&app.snapshot.tasks);
    let mut lines = vec![
        Line::styled("Summary", palette.highlighted()),
        Line::from(vec![
            Span::styled("Total       ", palette.dimmed()),
            Span::styled(summary.total.to_string(), palette.bold()),
        ]),
        Line::from(vec![
            Span::styled("Active      ", palette.dimmed()),
            Span::styled(
                format!("{} ({}%)", summary.active, summary.active_percent()),
                palette.bold(),
            ),
        ]),
        Line::from(vec![
            Span::styled("Completed   ", palette.dimmed()),
            Span::styled(
                format!("{} ({}%)", summary.completed, summary.completed_percent()),
                palette.bold(),
            ),
        ]),
        Line::from(vec![
            Span::styled("High active ", palette.dimmed()),
            Span::styled(
                format!(
                    "{} ({}%)",
                    summary.active_high,
                    summary.high_priority_percent()
                ),
                palette.panel_title(palette.error),
            ),
        ]),
        Line::default(),
        Line::styled("Categories", palette.highlighted()),
    ];

    let all = categories(&app.snapshot.tasks);
    if all.is_empty() {
        lines.push(Line::styled("none yet", palette.dimmed()));
    }
    for category in all {
        let count = app
            .snapshot
            .tasks
            .iter()
            .filter(|t| !t.completed && t.category.as_deref() == Some(category.as_str()))
            .count();
        let style = if app.filter.category.as_deref() == Some(category.as_str()) {
            palette.selected()
        } else {
            palette.normal()
        };
        lines.push(Line::styled(format!("{category} ({count})"), style));
    }

    let block = Block::default()
        .title(Span::styled(" Overview ", palette.panel_title(palette.highlight)))
        .borders(Borders::ALL)
        .border_style(palette.dimmed());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_editor(frame: &mut Frame, area: Rect, editor: &TaskEditor, palette: &Palette) {
    let rect = centered_rect(64, 16, area);
    let title = match editor.mode {
        EditorMode::Create => " New task ",
        EditorMode::Edit(_) => " Edit task ",
    };
    let block = Block::default()
        .title(Span::styled(title, palette.highlighted()))
        .borders(Borders::ALL)
        .border_style(palette.highlighted())
        .style(palette.normal());
    let inner = block.inner(rect);

    let label_width = editor.fields.iter().map(|(l, _)| l.len()).max().unwrap_or(0) + 2;
    let mut lines = Vec::new();
    let mut cursor = None;
    for (index, (label, field)) in editor.fields.iter().enumerate() {
        let focused = index == editor.fields.focus();
        let style = if focused {
            palette.highlighted()
        } else {
            palette.dimmed()
        };
        if focused {
            cursor = Some(Position::new(
                inner.x + column(label_width + field.cursor()),
                inner.y + column(lines.len()),
            ));
        }
        lines.push(Line::from(vec![
            Span::styled(format!("{:<label_width$}", format!("{label}:")), style),
            Span::styled(field.value(), palette.normal()),
        ]));
        lines.push(Line::default());
    }
    lines.push(Line::from(vec![
        Span::styled(format!("{:<label_width$}", "Priority:"), palette.dimmed()),
        Span::styled(
            editor.priority.label(),
            palette.panel_title(palette.priority(editor.priority)),
        ),
        Span::styled("  (Ctrl+P to change)", palette.dimmed()),
    ]));
    lines.push(Line::default());
    match &editor.error {
        Some(err) => lines.push(Line::styled(err.as_str(), palette.panel_title(palette.error))),
        None => lines.push(Line::styled(
            "Enter: save | Tab: next field | Esc: cancel",
            palette.dimmed(),
        )),
    }

    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).block(block), rect);
    if let Some(position) = cursor
        && inner.contains(position)
    {
        frame.set_cursor_position(position);
    }
}

fn render_detail(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    task: &Task,
    selected: usize,
    input: Option<&TextField>,
    palette: &Palette,
) {
    let rect = centered_rect(64, 18, area);
    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", task.title),
            palette.highlighted(),
        ))
        .borders(Borders::ALL)
        .border_style(palette.highlighted())
        .style(palette.normal());
    let inner = block.inner(rect);
    frame.render_widget(Clear, rect);
    frame.render_widget(block, rect);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Details
            Constraint::Min(1),    // Subtasks
            Constraint::Length(1), // Input or help
        ])
        .split(inner);

    let progress = SubtaskProgress::of(task);
    let mut details = vec![Line::from(vec![
        Span::styled(
            format!("[{}]", task.priority.label()),
            palette.panel_title(palette.priority(task.priority)),
        ),
        Span::styled(
            task.due_date
                .map(|d| format!("  due {}", format_due_date(d, &app.date_format)))
                .unwrap_or_default(),
            palette.dimmed(),
        ),
        Span::styled(
            format!(
                "  {} {}/{} ({}%)",
                progress_bar(progress.percent()),
                progress.completed,
                progress.total,
                progress.percent()
            ),
            palette.dimmed(),
        ),
    ])];
    if let Some(description) = &task.description {
        details.push(Line::styled(description.as_str(), palette.normal()));
    }
    frame.render_widget(
        Paragraph::new(details).wrap(Wrap { trim: true }),
        rows[0],
    );

    if task.subtasks.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::styled("No subtasks yet", palette.dimmed())),
            rows[1],
        );
    } else {
        let items: Vec<ListItem> = task
            .subtasks
            .iter()
            .map(|s| {
                let style = if s.completed {
                    palette.done()
                } else {
                    palette.normal()
                };
                let checkbox = if s.completed { "[\u{2713}] " } else { "[ ] " };
                ListItem::new(Line::from(vec![
                    Span::styled(checkbox, style),
                    Span::styled(s.title.as_str(), style),
                ]))
            })
            .collect();
        let mut state = ListState::default().with_selected(Some(selected));
        frame.render_stateful_widget(
            List::new(items).highlight_style(palette.selected()),
            rows[1],
            &mut state,
        );
    }

    if let Some(field) = input {
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("New subtask: ", palette.highlighted()),
                Span::styled(field.value(), palette.normal()),
            ])),
            rows[2],
        );
        frame.set_cursor_position(Position::new(
            rows[2].x + 13 + column(field.cursor()),
            rows[2].y,
        ));
    } else {
        frame.render_widget(
            Paragraph::new(Line::styled(
                "a: add | Space: toggle | x: delete | c: complete task | Esc: close",
                palette.dimmed(),
            )),
            rows[2],
        );
    }
}

fn render_confirm(frame: &mut Frame, area: Rect, title: &str, palette: &Palette) {
    let rect = centered_rect(50, 5, area);
    let block = Block::default()
        .title(Span::styled(" Delete task ", palette.panel_title(palette.error)))
        .borders(Borders::ALL)
        .border_style(palette.panel_title(palette.error))
        .style(palette.normal());
    let lines = vec![
        Line::styled(format!("Delete \"{title}\"?"), palette.bold()),
        Line::styled("y: delete | n: cancel", palette.dimmed()),
    ];
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        rect,
    );
}
