//! Task and subtask model for `TaskDeck`.
//!
//! A [`Task`] is owned by exactly one user and embeds its [`Subtask`]s;
//! subtasks have no storage of their own. Creation input ([`NewTask`],
//! [`NewSubtask`]) and partial updates ([`TaskPatch`], [`SubtaskPatch`]) are
//! separate types so that identity, owner and creation time can only be
//! stamped by the task store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Maximum allowed task title length in characters.
pub const MAX_TASK_TITLE_LENGTH: usize = 256;

/// Errors raised when task or subtask input fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Task title is empty after trimming.
    #[error("task title is required")]
    TitleEmpty,
    /// Task title exceeds the configured maximum.
    #[error("task title too long (max {max} characters)")]
    TitleTooLong {
        /// Maximum allowed length in characters.
        max: usize,
    },
    /// Subtask title is empty after trimming.
    #[error("subtask title is required")]
    SubtaskTitleEmpty,
}

/// Identifier of an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(String);

impl UserId {
    /// Wraps a provider-issued user id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string form of this id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque task identifier assigned by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a store-assigned document id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string form of this id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subtask identifier, unique within its parent task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtaskId(String);

impl SubtaskId {
    /// Generates a fresh identifier. Identifiers are time-ordered UUIDs and
    /// are never reused, even after the subtask they named is deleted.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Wraps an existing identifier (e.g. one read back from a document).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string form of this id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority.
///
/// The derived ordering is the display order: `High < Medium < Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Most urgent.
    High,
    /// Default priority for new tasks.
    #[default]
    Medium,
    /// Least urgent.
    Low,
}

impl Priority {
    /// All priorities in display order.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Stored representation (`"high"`, `"medium"`, `"low"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown priority string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority: {0}")]
pub struct ParsePriorityError(pub String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(ParsePriorityError(other.to_string())),
        }
    }
}

/// A sub-item embedded in a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtask {
    /// Identifier, unique within the parent task.
    pub id: SubtaskId,
    /// Subtask title.
    pub title: String,
    /// Whether the subtask is done.
    pub completed: bool,
    /// Optional priority.
    pub priority: Option<Priority>,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
}

/// A top-level to-do item owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Non-empty title.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Whether the task is done.
    pub completed: bool,
    /// Priority level.
    pub priority: Priority,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Optional category label.
    pub category: Option<String>,
    /// Ordered, duplicate-free tags.
    pub tags: Vec<String>,
    /// Embedded subtasks in display order.
    pub subtasks: Vec<Subtask>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// Owning user.
    pub user_id: UserId,
}

impl Task {
    /// Number of completed subtasks.
    #[must_use]
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }

    /// Looks up an embedded subtask by id.
    #[must_use]
    pub fn subtask(&self, id: &SubtaskId) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == *id)
    }

    /// Merges a partial update into this task. Unset patch fields leave the
    /// corresponding task fields untouched.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(category) = &patch.category {
            self.category.clone_from(category);
        }
        if let Some(tags) = &patch.tags {
            self.tags.clone_from(tags);
        }
        if let Some(subtasks) = &patch.subtasks {
            self.subtasks.clone_from(subtasks);
        }
    }
}

/// Fields supplied by the user when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Title (required).
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Initial completion flag.
    pub completed: bool,
    /// Priority level.
    pub priority: Priority,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Optional category.
    pub category: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Initial subtasks.
    pub subtasks: Vec<Subtask>,
}

impl NewTask {
    /// Starts a new task with the given title and default fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Validates and normalizes the input.
    ///
    /// The title is trimmed and must be non-empty and at most `max_title_len`
    /// characters. Tags are trimmed and de-duplicated; blank category and
    /// description become `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`] or
    /// [`ValidationError::TitleTooLong`].
    pub fn validate(mut self, max_title_len: usize) -> Result<Self, ValidationError> {
        self.title = validate_title(&self.title, max_title_len)?;
        self.description = normalize_text(self.description);
        self.category = normalize_text(self.category);
        self.tags = normalize_tags(self.tags);
        Ok(self)
    }

    /// Turns the input into a stored task with its assigned id, owner and
    /// creation time.
    #[must_use]
    pub fn into_task(self, id: TaskId, owner: UserId, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            priority: self.priority,
            due_date: self.due_date,
            category: self.category,
            tags: self.tags,
            subtasks: self.subtasks,
            created_at,
            user_id: owner,
        }
    }
}

/// Fields supplied by the user when adding a subtask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSubtask {
    /// Title (required).
    pub title: String,
    /// Initial completion flag.
    pub completed: bool,
    /// Optional priority.
    pub priority: Option<Priority>,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
}

impl NewSubtask {
    /// Starts a new, incomplete subtask with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Validates the title and attaches a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SubtaskTitleEmpty`] if the title is blank.
    pub fn into_subtask(self) -> Result<Subtask, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::SubtaskTitleEmpty);
        }
        Ok(Subtask {
            id: SubtaskId::generate(),
            title: title.to_string(),
            completed: self.completed,
            priority: self.priority,
            due_date: self.due_date,
        })
    }
}

/// Partial update of a task (merge semantics).
///
/// `None` means "leave untouched". For clearable fields the inner `Option`
/// carries the new value, so `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear.
    pub description: Option<Option<String>>,
    /// New completion flag.
    pub completed: Option<bool>,
    /// New priority.
    pub priority: Option<Priority>,
    /// New due date, or `Some(None)` to clear.
    pub due_date: Option<Option<NaiveDate>>,
    /// New category, or `Some(None)` to clear.
    pub category: Option<Option<String>>,
    /// Replacement tag list.
    pub tags: Option<Vec<String>>,
    /// Replacement subtask sequence.
    pub subtasks: Option<Vec<Subtask>>,
}

impl TaskPatch {
    /// Patch that only sets the completion flag.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Patch that replaces the whole subtask sequence.
    #[must_use]
    pub fn subtasks(subtasks: Vec<Subtask>) -> Self {
        Self {
            subtasks: Some(subtasks),
            ..Self::default()
        }
    }

    /// Whether this patch sets no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validates and normalizes the fields this patch sets, with the same
    /// rules as [`NewTask::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`] or
    /// [`ValidationError::TitleTooLong`] if a title is set and invalid.
    pub fn validate(mut self, max_title_len: usize) -> Result<Self, ValidationError> {
        if let Some(title) = &self.title {
            self.title = Some(validate_title(title, max_title_len)?);
        }
        self.description = self.description.map(normalize_text);
        self.category = self.category.map(normalize_text);
        self.tags = self.tags.map(normalize_tags);
        Ok(self)
    }
}

/// Partial update of a subtask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtaskPatch {
    /// New title.
    pub title: Option<String>,
    /// New completion flag.
    pub completed: Option<bool>,
    /// New priority, or `Some(None)` to clear.
    pub priority: Option<Option<Priority>>,
    /// New due date, or `Some(None)` to clear.
    pub due_date: Option<Option<NaiveDate>>,
}

impl SubtaskPatch {
    /// Patch that only sets the completion flag.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Trims a new title, rejecting blank ones.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SubtaskTitleEmpty`] if a title is set and
    /// blank.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        if let Some(title) = &self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ValidationError::SubtaskTitleEmpty);
            }
            self.title = Some(title.to_string());
        }
        Ok(self)
    }

    /// Merges this patch into a subtask.
    pub fn apply_to(&self, subtask: &mut Subtask) {
        if let Some(title) = &self.title {
            subtask.title.clone_from(title);
        }
        if let Some(completed) = self.completed {
            subtask.completed = completed;
        }
        if let Some(priority) = self.priority {
            subtask.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            subtask.due_date = due_date;
        }
    }
}

/// Trims a title and checks it against the length limit.
fn validate_title(title: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::TitleTooLong { max: max_len });
    }
    Ok(trimmed.to_string())
}

/// Trims optional text, mapping blank input to `None`.
#[must_use]
pub fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Trims tags, drops blanks and removes duplicates, keeping first occurrence
/// order.
#[must_use]
pub fn normalize_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
