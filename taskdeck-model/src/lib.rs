//! Shared data model for `TaskDeck`: tasks, subtasks and their stored
//! document form.

pub mod document;
pub mod task;
