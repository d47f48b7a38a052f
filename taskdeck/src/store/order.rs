//! Display order for a freshly loaded task list.

use std::cmp::Ordering;

use taskdeck_model::task::Task;

/// Compares two tasks for list display.
///
/// Keys, in order: incomplete before complete; dated before undated, earlier
/// dates first; then priority high, medium, low.
#[must_use]
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.priority.cmp(&b.priority))
}

/// Sorts tasks in place with [`compare_tasks`]. The sort is stable.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}
