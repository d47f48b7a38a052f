//! Editable form state: single-line text fields, the auth forms and the
//! task editor.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};

use taskdeck_model::task::{NewTask, Priority, Task, TaskId, TaskPatch, normalize_text};

use crate::auth::{LoginForm, RegisterForm, ResetForm};

/// Date format accepted by the due date field.
pub const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

/// A single-line text input with a cursor measured in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    value: String,
    cursor: usize,
}

impl TextField {
    /// A field pre-filled with `value`, cursor at the end.
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    /// Current contents.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Cursor position in characters.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Clears the field.
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map_or(self.value.len(), |(i, _)| i)
    }

    /// Inserts a character at the cursor.
    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Deletes the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.value.remove(at);
            self.cursor -= 1;
        }
    }

    /// Applies an editing key. Returns `false` if the key is not an edit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.value.chars().count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.chars().count(),
            _ => return false,
        }
        true
    }
}

/// A vertical list of labelled text fields with one focused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    labels: &'static [&'static str],
    fields: Vec<TextField>,
    focus: usize,
}

impl FieldSet {
    /// Empty fields with the given labels.
    #[must_use]
    pub fn new(labels: &'static [&'static str]) -> Self {
        Self {
            labels,
            fields: vec![TextField::default(); labels.len()],
            focus: 0,
        }
    }

    /// Labels with their fields, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TextField)> {
        self.labels.iter().copied().zip(self.fields.iter())
    }

    /// Index of the focused field.
    #[must_use]
    pub const fn focus(&self) -> usize {
        self.focus
    }

    /// Moves focus to the next field, wrapping.
    pub fn next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len().max(1);
    }

    /// Moves focus to the previous field, wrapping.
    pub fn prev(&mut self) {
        let len = self.fields.len().max(1);
        self.focus = (self.focus + len - 1) % len;
    }

    /// Value of field `index`, or `""` if out of range.
    #[must_use]
    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", TextField::value)
    }

    /// Replaces field `index`.
    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            *field = TextField::with_value(value);
        }
    }

    /// Sends an editing key to the focused field.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.fields
            .get_mut(self.focus)
            .is_some_and(|f| f.handle_key(key))
    }

    /// Whether field `index` holds a secret.
    #[must_use]
    pub fn is_secret(&self, index: usize) -> bool {
        self.labels
            .get(index)
            .is_some_and(|l| l.to_lowercase().contains("password"))
    }
}

/// Sign-in form fields.
pub const LOGIN_FIELDS: &[&str] = &["Email", "Password"];
/// Registration form fields.
pub const REGISTER_FIELDS: &[&str] = &["Email", "Password", "Confirm password"];
/// Password reset form fields.
pub const RESET_FIELDS: &[&str] = &["Email"];

/// Reads a [`LoginForm`] out of a login field set.
#[must_use]
pub fn login_form(fields: &FieldSet) -> LoginForm {
    LoginForm {
        email: fields.value(0).to_string(),
        password: fields.value(1).to_string(),
    }
}

/// Reads a [`RegisterForm`] out of a registration field set.
#[must_use]
pub fn register_form(fields: &FieldSet) -> RegisterForm {
    RegisterForm {
        email: fields.value(0).to_string(),
        password: fields.value(1).to_string(),
        confirm_password: fields.value(2).to_string(),
    }
}

/// Reads a [`ResetForm`] out of a reset field set.
#[must_use]
pub fn reset_form(fields: &FieldSet) -> ResetForm {
    ResetForm {
        email: fields.value(0).to_string(),
    }
}

/// Task editor fields, in display order.
pub const TASK_FIELDS: &[&str] = &["Title", "Description", "Due (YYYY-MM-DD)", "Category", "Tags"];

const TITLE: usize = 0;
const DESCRIPTION: usize = 1;
const DUE: usize = 2;
const CATEGORY: usize = 3;
const TAGS: usize = 4;

/// Whether the editor creates a task or edits one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    /// Creating a new task.
    Create,
    /// Editing an existing task.
    Edit(TaskId),
}

/// What a submitted editor asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutput {
    /// Create this task.
    Create(NewTask),
    /// Apply this patch to a task.
    Update(TaskId, TaskPatch),
}

/// Task create/edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEditor {
    /// Create or edit.
    pub mode: EditorMode,
    /// Text fields.
    pub fields: FieldSet,
    /// Selected priority (cycled with a key, not typed).
    pub priority: Priority,
    /// Validation message from the last submit attempt.
    pub error: Option<String>,
}

impl TaskEditor {
    /// A blank editor for a new task.
    #[must_use]
    pub fn create() -> Self {
        Self {
            mode: EditorMode::Create,
            fields: FieldSet::new(TASK_FIELDS),
            priority: Priority::default(),
            error: None,
        }
    }

    /// An editor pre-filled from `task`.
    #[must_use]
    pub fn edit(task: &Task) -> Self {
        let mut fields = FieldSet::new(TASK_FIELDS);
        fields.set(TITLE, task.title.clone());
        fields.set(DESCRIPTION, task.description.clone().unwrap_or_default());
        fields.set(
            DUE,
            task.due_date
                .map(|d| d.format(DATE_INPUT_FORMAT).to_string())
                .unwrap_or_default(),
        );
        fields.set(CATEGORY, task.category.clone().unwrap_or_default());
        fields.set(TAGS, task.tags.join(", "));
        Self {
            mode: EditorMode::Edit(task.id.clone()),
            fields,
            priority: task.priority,
            error: None,
        }
    }

    /// Steps the priority high -> medium -> low -> high.
    pub fn cycle_priority(&mut self) {
        self.priority = match self.priority {
            Priority::High => Priority::Medium,
            Priority::Medium => Priority::Low,
            Priority::Low => Priority::High,
        };
    }

    /// Builds the create/update request, or records why it cannot.
    ///
    /// Only checks what the store cannot: the title must be present and the
    /// due date must parse. Everything else is normalized by the store.
    pub fn submit(&mut self) -> Option<EditorOutput> {
        if self.fields.value(TITLE).trim().is_empty() {
            self.error = Some("Title is required".to_string());
            return None;
        }
        let due_date = match parse_due_date(self.fields.value(DUE)) {
            Ok(d) => d,
            Err(msg) => {
                self.error = Some(msg);
                return None;
            }
        };
        self.error = None;

        let title = self.fields.value(TITLE).to_string();
        let description = normalize_text(Some(self.fields.value(DESCRIPTION).to_string()));
        let category = normalize_text(Some(self.fields.value(CATEGORY).to_string()));
        let tags = split_tags(self.fields.value(TAGS));

        Some(match &self.mode {
            EditorMode::Create => EditorOutput::Create(NewTask {
                title,
                description,
                priority: self.priority,
                due_date,
                category,
                tags,
                ..NewTask::default()
            }),
            EditorMode::Edit(id) => EditorOutput::Update(
                id.clone(),
                TaskPatch {
                    title: Some(title),
                    description: Some(description),
                    priority: Some(self.priority),
                    due_date: Some(due_date),
                    category: Some(category),
                    tags: Some(tags),
                    ..TaskPatch::default()
                },
            ),
        })
    }
}

/// Parses the due date field; blank means no date.
///
/// # Errors
///
/// Returns a user-facing message if the text is not a `YYYY-MM-DD` date.
pub fn parse_due_date(input: &str) -> Result<Option<NaiveDate>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, DATE_INPUT_FORMAT)
        .map(Some)
        .map_err(|_| format!("Invalid due date `{input}` (expected YYYY-MM-DD)"))
}

/// Splits comma-separated tags.
#[must_use]
pub fn split_tags(input: &str) -> Vec<String> {
    input.split(',').map(str::to_string).collect()
}
