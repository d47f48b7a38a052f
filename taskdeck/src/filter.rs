//! Dashboard filtering and summary counts.
//!
//! Everything here is a pure function of the published task list and is
//! recomputed on every render.

use taskdeck_model::task::{Priority, Task};

/// Which half of the task list the dashboard shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusTab {
    /// Incomplete tasks.
    #[default]
    Active,
    /// Completed tasks.
    Completed,
}

impl StatusTab {
    /// The other tab.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Completed,
            Self::Completed => Self::Active,
        }
    }

    const fn wants_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// User-selected dashboard filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardFilter {
    /// Case-insensitive substring matched against titles.
    pub search: String,
    /// Exact category match.
    pub category: Option<String>,
    /// Exact priority match.
    pub priority: Option<Priority>,
}

impl DashboardFilter {
    /// Whether `task` passes every active filter and belongs on `tab`.
    #[must_use]
    pub fn matches(&self, task: &Task, tab: StatusTab) -> bool {
        if task.completed != tab.wants_completed() {
            return false;
        }
        if !self.search.is_empty()
            && !task
                .title
                .to_lowercase()
                .contains(&self.search.to_lowercase())
        {
            return false;
        }
        if self
            .category
            .as_ref()
            .is_some_and(|c| task.category.as_ref() != Some(c))
        {
            return false;
        }
        self.priority.is_none_or(|p| task.priority == p)
    }

    /// The tasks on `tab` that pass the filters, in list order.
    #[must_use]
    pub fn apply<'a>(&self, tasks: &'a [Task], tab: StatusTab) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t, tab)).collect()
    }

    /// Number of filters currently set.
    #[must_use]
    pub fn active_count(&self) -> usize {
        usize::from(!self.search.is_empty())
            + usize::from(self.category.is_some())
            + usize::from(self.priority.is_some())
    }

    /// Whether any filter is set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }

    /// Clears every filter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Text shown when `tab` has no matching tasks.
    #[must_use]
    pub fn empty_message(&self, tab: StatusTab) -> &'static str {
        match (self.is_active(), tab) {
            (true, _) => "No tasks match your filters",
            (false, StatusTab::Active) => "No active tasks. Create a new task to get started!",
            (false, StatusTab::Completed) => "No completed tasks yet",
        }
    }
}

/// Distinct categories in first-seen order.
#[must_use]
pub fn categories(tasks: &[Task]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for category in tasks.iter().filter_map(|t| t.category.as_deref()) {
        if !category.is_empty() && !out.iter().any(|c| c == category) {
            out.push(category.to_string());
        }
    }
    out
}

/// Sidebar counts over the whole (unfiltered) task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardSummary {
    /// All tasks.
    pub total: usize,
    /// Incomplete tasks.
    pub active: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Incomplete high-priority tasks.
    pub active_high: usize,
}

impl DashboardSummary {
    /// Counts `tasks`.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut summary = Self {
            total: tasks.len(),
            ..Self::default()
        };
        for task in tasks {
            if task.completed {
                summary.completed += 1;
            } else {
                summary.active += 1;
                if task.priority == Priority::High {
                    summary.active_high += 1;
                }
            }
        }
        summary
    }

    /// Active share of all tasks, as a percentage.
    #[must_use]
    pub fn active_percent(&self) -> u16 {
        percent(self.active, self.total)
    }

    /// Completed share of all tasks, as a percentage.
    #[must_use]
    pub fn completed_percent(&self) -> u16 {
        percent(self.completed, self.total)
    }

    /// High-priority share of active tasks, as a percentage.
    #[must_use]
    pub fn high_priority_percent(&self) -> u16 {
        percent(self.active_high, self.active)
    }
}

/// `part / whole` as a rounded percentage, 0 when `whole` is 0.
#[must_use]
pub fn percent(part: usize, whole: usize) -> u16 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part.min(whole) * 100 + whole / 2) / whole;
    u16::try_from(rounded).unwrap_or(100)
}
