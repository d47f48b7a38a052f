//! Aggregate counts for the analytics view and per-task derivations for
//! task cards.

use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};

use taskdeck_model::task::{Priority, Task};

use crate::filter::percent;

/// Default display format for due dates, e.g. `1 Jun, 2024`.
pub const DEFAULT_DATE_FORMAT: &str = "%-d %b, %Y";

/// Completed vs. active task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusBreakdown {
    /// Completed tasks.
    pub completed: usize,
    /// Incomplete tasks.
    pub active: usize,
}

/// Active and completed counts for one priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityCounts {
    /// The priority these counts are for.
    pub priority: Priority,
    /// Incomplete tasks with this priority.
    pub active: usize,
    /// Completed tasks with this priority.
    pub completed: usize,
}

/// Everything the analytics view charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analytics {
    /// Status breakdown.
    pub status: StatusBreakdown,
    /// One entry per priority, high to low.
    pub by_priority: [PriorityCounts; 3],
}

impl Analytics {
    /// Derives the counts from a task list.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut status = StatusBreakdown::default();
        let mut by_priority = Priority::ALL.map(|priority| PriorityCounts {
            priority,
            active: 0,
            completed: 0,
        });
        for task in tasks {
            let slot = by_priority
                .iter_mut()
                .find(|c| c.priority == task.priority);
            if task.completed {
                status.completed += 1;
                if let Some(slot) = slot {
                    slot.completed += 1;
                }
            } else {
                status.active += 1;
                if let Some(slot) = slot {
                    slot.active += 1;
                }
            }
        }
        Self {
            status,
            by_priority,
        }
    }

    /// Whether there is nothing to chart.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.completed == 0 && self.status.active == 0
    }
}

/// Subtask completion for one task card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtaskProgress {
    /// Completed subtasks.
    pub completed: usize,
    /// All subtasks.
    pub total: usize,
}

impl SubtaskProgress {
    /// Counts a task's subtasks.
    #[must_use]
    pub fn of(task: &Task) -> Self {
        Self {
            completed: task.completed_subtasks(),
            total: task.subtasks.len(),
        }
    }

    /// Rounded completion percentage; 0 when there are no subtasks.
    #[must_use]
    pub fn percent(&self) -> u16 {
        percent(self.completed, self.total)
    }
}

/// Formats a due date with a `chrono` format string. An invalid format
/// falls back to [`DEFAULT_DATE_FORMAT`].
#[must_use]
pub fn format_due_date(date: NaiveDate, format: &str) -> String {
    let valid = StrftimeItems::new(format).all(|item| !matches!(item, Item::Error));
    let format = if valid { format } else { DEFAULT_DATE_FORMAT };
    date.format(format).to_string()
}

/// Whether an incomplete task's due date is before `today`.
#[must_use]
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.completed && task.due_date.is_some_and(|d| d < today)
}
