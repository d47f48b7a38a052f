//! Document representation of tasks.
//!
//! The document store speaks in field maps ([`Document`]) of loosely typed
//! [`FieldValue`]s. This module converts tasks to and from that shape:
//! temporal fields are stored as store-native timestamps and turned back
//! into dates on read, and a missing subtask sequence reads as empty.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{NewTask, Priority, Subtask, SubtaskId, Task, TaskId, TaskPatch, UserId};

/// Field names used in task documents.
pub mod fields {
    /// Task title.
    pub const TITLE: &str = "title";
    /// Task description.
    pub const DESCRIPTION: &str = "description";
    /// Completion flag.
    pub const COMPLETED: &str = "completed";
    /// Priority string.
    pub const PRIORITY: &str = "priority";
    /// Due date timestamp.
    pub const DUE_DATE: &str = "dueDate";
    /// Category label.
    pub const CATEGORY: &str = "category";
    /// Tag list.
    pub const TAGS: &str = "tags";
    /// Embedded subtask sequence.
    pub const SUBTASKS: &str = "subtasks";
    /// Creation timestamp.
    pub const CREATED_AT: &str = "createdAt";
    /// Owner user id.
    pub const USER_ID: &str = "userId";
    /// Subtask id (inside subtask maps).
    pub const ID: &str = "id";
}

/// A stored document: field name to value.
pub type Document = BTreeMap<String, FieldValue>;

/// A single stored field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Explicit null (used to clear a field on update).
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// UTF-8 string.
    String(String),
    /// Store-native timestamp.
    Timestamp(DateTime<Utc>),
    /// Ordered list.
    Array(Vec<FieldValue>),
    /// Nested map.
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Short type name, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<&UserId> for FieldValue {
    fn from(id: &UserId) -> Self {
        Self::String(id.as_str().to_string())
    }
}

/// Identifier of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
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

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&TaskId> for DocumentId {
    fn from(id: &TaskId) -> Self {
        Self(id.as_str().to_string())
    }
}

impl From<DocumentId> for TaskId {
    fn from(id: DocumentId) -> Self {
        Self::new(id.0)
    }
}

/// Errors raised when a stored document cannot be read as a task.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A field holds a value of the wrong type.
    #[error("field `{field}` has type {found}, expected {expected}")]
    WrongType {
        /// Field name.
        field: &'static str,
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        found: &'static str,
    },
    /// The priority string is not a known priority.
    #[error("invalid priority `{0}`")]
    InvalidPriority(String),
}

/// Builds the document for a newly created task.
#[must_use]
pub fn encode_new_task(task: &NewTask, owner: &UserId, created_at: DateTime<Utc>) -> Document {
    let mut doc = Document::new();
    doc.insert(fields::TITLE.into(), FieldValue::String(task.title.clone()));
    doc.insert(fields::DESCRIPTION.into(), opt_string(task.description.as_ref()));
    doc.insert(fields::COMPLETED.into(), FieldValue::Bool(task.completed));
    doc.insert(fields::PRIORITY.into(), task.priority.as_str().into());
    doc.insert(fields::DUE_DATE.into(), opt_date(task.due_date));
    doc.insert(fields::CATEGORY.into(), opt_string(task.category.as_ref()));
    doc.insert(fields::TAGS.into(), encode_tags(&task.tags));
    doc.insert(fields::SUBTASKS.into(), encode_subtasks(&task.subtasks));
    doc.insert(fields::CREATED_AT.into(), FieldValue::Timestamp(created_at));
    doc.insert(fields::USER_ID.into(), owner.into());
    doc
}

/// Builds the partial field set for an update. Only fields set in the patch
/// appear; cleared fields are written as [`FieldValue::Null`].
#[must_use]
pub fn encode_patch(patch: &TaskPatch) -> Document {
    let mut doc = Document::new();
    if let Some(title) = &patch.title {
        doc.insert(fields::TITLE.into(), FieldValue::String(title.clone()));
    }
    if let Some(description) = &patch.description {
        doc.insert(fields::DESCRIPTION.into(), opt_string(description.as_ref()));
    }
    if let Some(completed) = patch.completed {
        doc.insert(fields::COMPLETED.into(), FieldValue::Bool(completed));
    }
    if let Some(priority) = patch.priority {
        doc.insert(fields::PRIORITY.into(), priority.as_str().into());
    }
    if let Some(due_date) = patch.due_date {
        doc.insert(fields::DUE_DATE.into(), opt_date(due_date));
    }
    if let Some(category) = &patch.category {
        doc.insert(fields::CATEGORY.into(), opt_string(category.as_ref()));
    }
    if let Some(tags) = &patch.tags {
        doc.insert(fields::TAGS.into(), encode_tags(tags));
    }
    if let Some(subtasks) = &patch.subtasks {
        doc.insert(fields::SUBTASKS.into(), encode_subtasks(subtasks));
    }
    doc
}

/// Reads a stored document back as a [`Task`].
///
/// Missing `completed` reads as `false`, missing `priority` as the default,
/// missing `subtasks`/`tags` as empty and missing `createdAt` as now.
///
/// # Errors
///
/// Returns [`DocumentError`] if the title or owner is missing or a field
/// has the wrong type.
pub fn decode_task(id: &DocumentId, doc: &Document) -> Result<Task, DocumentError> {
    let title = req_string(doc, fields::TITLE)?;
    let user_id = UserId::new(req_string(doc, fields::USER_ID)?);
    let priority = match opt_str_field(doc, fields::PRIORITY)? {
        Some(p) => p
            .parse::<Priority>()
            .map_err(|_| DocumentError::InvalidPriority(p))?,
        None => Priority::default(),
    };
    let created_at = match doc.get(fields::CREATED_AT) {
        Some(FieldValue::Timestamp(ts)) => *ts,
        None | Some(FieldValue::Null) => Utc::now(),
        Some(other) => return Err(wrong_type(fields::CREATED_AT, "timestamp", other)),
    };

    Ok(Task {
        id: id.clone().into(),
        title,
        description: opt_str_field(doc, fields::DESCRIPTION)?,
        completed: opt_bool(doc, fields::COMPLETED)?.unwrap_or(false),
        priority,
        due_date: opt_date_field(doc, fields::DUE_DATE)?,
        category: opt_str_field(doc, fields::CATEGORY)?,
        tags: decode_tags(doc.get(fields::TAGS))?,
        subtasks: decode_subtasks(doc.get(fields::SUBTASKS))?,
        created_at,
        user_id,
    })
}

fn encode_tags(tags: &[String]) -> FieldValue {
    FieldValue::Array(tags.iter().map(|t| FieldValue::String(t.clone())).collect())
}

fn encode_subtasks(subtasks: &[Subtask]) -> FieldValue {
    FieldValue::Array(subtasks.iter().map(encode_subtask).collect())
}

fn encode_subtask(subtask: &Subtask) -> FieldValue {
    let mut map = BTreeMap::new();
    map.insert(fields::ID.into(), subtask.id.as_str().into());
    map.insert(fields::TITLE.into(), FieldValue::String(subtask.title.clone()));
    map.insert(fields::COMPLETED.into(), FieldValue::Bool(subtask.completed));
    if let Some(priority) = subtask.priority {
        map.insert(fields::PRIORITY.into(), priority.as_str().into());
    }
    if let Some(due) = subtask.due_date {
        map.insert(fields::DUE_DATE.into(), opt_date(Some(due)));
    }
    FieldValue::Map(map)
}

fn decode_tags(value: Option<&FieldValue>) -> Result<Vec<String>, DocumentError> {
    match value {
        None | Some(FieldValue::Null) => Ok(Vec::new()),
        Some(FieldValue::Array(items)) => items
            .iter()
            .map(|item| match item {
                FieldValue::String(s) => Ok(s.clone()),
                other => Err(wrong_type(fields::TAGS, "string", other)),
            })
            .collect(),
        Some(other) => Err(wrong_type(fields::TAGS, "array", other)),
    }
}

fn decode_subtasks(value: Option<&FieldValue>) -> Result<Vec<Subtask>, DocumentError> {
    match value {
        None | Some(FieldValue::Null) => Ok(Vec::new()),
        Some(FieldValue::Array(items)) => items
            .iter()
            .map(|item| match item {
                FieldValue::Map(map) => decode_subtask(map),
                other => Err(wrong_type(fields::SUBTASKS, "map", other)),
            })
            .collect(),
        Some(other) => Err(wrong_type(fields::SUBTASKS, "array", other)),
    }
}

fn decode_subtask(map: &BTreeMap<String, FieldValue>) -> Result<Subtask, DocumentError> {
    let priority = match opt_str_field(map, fields::PRIORITY)? {
        Some(p) => Some(
            p.parse::<Priority>()
                .map_err(|_| DocumentError::InvalidPriority(p))?,
        ),
        None => None,
    };
    Ok(Subtask {
        id: SubtaskId::new(req_string(map, fields::ID)?),
        title: req_string(map, fields::TITLE)?,
        completed: opt_bool(map, fields::COMPLETED)?.unwrap_or(false),
        priority,
        due_date: opt_date_field(map, fields::DUE_DATE)?,
    })
}

fn opt_string(value: Option<&String>) -> FieldValue {
    value.map_or(FieldValue::Null, |s| FieldValue::String(s.clone()))
}

fn opt_date(date: Option<NaiveDate>) -> FieldValue {
    date.map_or(FieldValue::Null, |d| {
        FieldValue::Timestamp(d.and_time(NaiveTime::MIN).and_utc())
    })
}

fn req_string(
    map: &BTreeMap<String, FieldValue>,
    field: &'static str,
) -> Result<String, DocumentError> {
    opt_str_field(map, field)?.ok_or(DocumentError::MissingField(field))
}

fn opt_str_field(
    map: &BTreeMap<String, FieldValue>,
    field: &'static str,
) -> Result<Option<String>, DocumentError> {
    match map.get(field) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(wrong_type(field, "string", other)),
    }
}

fn opt_bool(
    map: &BTreeMap<String, FieldValue>,
    field: &'static str,
) -> Result<Option<bool>, DocumentError> {
    match map.get(field) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(wrong_type(field, "bool", other)),
    }
}

fn opt_date_field(
    map: &BTreeMap<String, FieldValue>,
    field: &'static str,
) -> Result<Option<NaiveDate>, DocumentError> {
    match map.get(field) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::Timestamp(ts)) => Ok(Some(ts.date_naive())),
        Some(other) => Err(wrong_type(field, "timestamp", other)),
    }
}

const fn wrong_type(
    field: &'static str,
    expected: &'static str,
    found: &FieldValue,
) -> DocumentError {
    DocumentError::WrongType {
        field,
        expected,
        found: found.type_name(),
    }
}
