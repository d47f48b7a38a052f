//! The task store: the in-memory mirror of the signed-in user's tasks.
//!
//! [`TaskStore`] mediates every read and write against a [`DocumentStore`].
//! Mutations write through to the backend first and only touch memory once
//! the write has succeeded, so a failed write never leaves a partial change
//! behind. Failures are logged, surfaced as [`Notice`]s and returned to the
//! caller; they never panic.
//!
//! The store publishes a revision counter on a [`watch`] channel so that
//! views know when to re-read a [`TaskSnapshot`].
//!
//! [`Notice`]: crate::notice::Notice

pub mod order;

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};

use taskdeck_model::document::{
    DocumentId, FieldValue, decode_task, encode_new_task, encode_patch, fields,
};
use taskdeck_model::task::{
    MAX_TASK_TITLE_LENGTH, NewSubtask, NewTask, Subtask, SubtaskId, SubtaskPatch, Task, TaskId,
    TaskPatch, UserId, ValidationError,
};

use crate::backend::{DocumentStore, StoreError};
use crate::notice::{Notice, NoticeSender};
use crate::session::{SessionChange, SessionTracker};

/// Default collection holding task documents.
pub const TASKS_COLLECTION: &str = "tasks";

/// Message recorded in [`TaskSnapshot::error`] when a load fails.
pub const LOAD_FAILED: &str = "Failed to load tasks";

/// Tunables for a [`TaskStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Collection holding task documents.
    pub collection: String,
    /// Maximum task title length in characters.
    pub max_title_len: usize,
    /// Capacity of the notice channel.
    pub notice_buffer: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            collection: TASKS_COLLECTION.to_string(),
            max_title_len: MAX_TASK_TITLE_LENGTH,
            notice_buffer: 32,
        }
    }
}

/// Errors returned by [`TaskStore`] operations.
///
/// By the time a caller sees one of these it has already been logged and
/// reported as a notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskStoreError {
    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,
    /// No task with this id is loaded.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The task has no subtask with this id.
    #[error("subtask not found: {0}")]
    SubtaskNotFound(SubtaskId),
    /// The input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The document store rejected the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Point-in-time copy of the store's published state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSnapshot {
    /// User whose tasks are loaded.
    pub user: Option<UserId>,
    /// Tasks in display order.
    pub tasks: Vec<Task>,
    /// Whether a load is in progress.
    pub loading: bool,
    /// Message from the last failed load, cleared by the next success.
    pub error: Option<String>,
}

/// Owns the in-memory task collection for the current user.
pub struct TaskStore<D: DocumentStore> {
    backend: D,
    options: StoreOptions,
    state: RwLock<TaskSnapshot>,
    notices: NoticeSender,
    revision: watch::Sender<u64>,
}

impl<D: DocumentStore> TaskStore<D> {
    /// Creates a store over `backend`.
    ///
    /// Returns the store and a receiver for the [`Notice`]s it raises. The
    /// store starts in the loading state with no user.
    #[must_use]
    pub fn new(backend: D, options: StoreOptions) -> (Self, mpsc::Receiver<Notice>) {
        let (notices, rx) = NoticeSender::channel(options.notice_buffer);
        let (revision, _) = watch::channel(0);
        let store = Self {
            backend,
            options,
            state: RwLock::new(TaskSnapshot {
                loading: true,
                ..TaskSnapshot::default()
            }),
            notices,
            revision,
        };
        (store, rx)
    }

    /// The underlying document store.
    pub const fn backend(&self) -> &D {
        &self.backend
    }

    /// Subscribes to the revision counter, bumped on every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        self.state.read().clone()
    }

    /// Copy of the current task list.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.state.read().tasks.clone()
    }

    /// Looks up a loaded task.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.state.read().tasks.iter().find(|t| t.id == *id).cloned()
    }

    /// User whose tasks are loaded.
    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.state.read().user.clone()
    }

    /// Whether a load is in progress.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    /// Message from the last failed load, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    fn publish(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Logs a failed operation, raises an error notice and hands the error
    /// back for returning.
    fn fail(&self, err: impl Into<TaskStoreError>, message: &str) -> TaskStoreError {
        let err = err.into();
        tracing::warn!(error = %err, "{message}");
        let text = match &err {
            TaskStoreError::Validation(v) => format!("{message}: {v}"),
            _ => message.to_string(),
        };
        self.notices.error(text);
        err
    }

    /// Replaces the collection with `user`'s tasks.
    ///
    /// `None` clears the collection and ends the loading state. For a user,
    /// every document owned by them is read, malformed documents are skipped
    /// and the result is sorted with [`order::sort_tasks`]. A result is only
    /// applied if the store still belongs to the same user when it arrives.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Store`] if the query fails. The previous
    /// collection is kept and [`TaskSnapshot::error`] is set.
    pub async fn load_for_user(&self, user: Option<&UserId>) -> Result<(), TaskStoreError> {
        let Some(user) = user else {
            {
                let mut state = self.state.write();
                state.user = None;
                state.tasks.clear();
                state.loading = false;
                state.error = None;
            }
            tracing::debug!("cleared tasks after sign-out");
            self.publish();
            return Ok(());
        };

        {
            let mut state = self.state.write();
            if state.user.as_ref() != Some(user) {
                state.tasks.clear();
                state.user = Some(user.clone());
            }
            state.loading = true;
        }
        self.publish();

        let result = self
            .backend
            .query(
                &self.options.collection,
                fields::USER_ID,
                &FieldValue::from(user),
            )
            .await;

        if self.current_user().as_ref() != Some(user) {
            tracing::debug!(user = %user, "discarding stale task load");
            return Ok(());
        }

        match result {
            Ok(documents) => {
                let mut tasks: Vec<Task> = documents
                    .iter()
                    .filter_map(|(id, doc)| match decode_task(id, doc) {
                        Ok(task) => Some(task),
                        Err(err) => {
                            tracing::warn!(
                                doc_id = %id,
                                error = %err,
                                "skipping malformed task document"
                            );
                            None
                        }
                    })
                    .collect();
                order::sort_tasks(&mut tasks);
                tracing::info!(user = %user, count = tasks.len(), "loaded tasks");
                {
                    let mut state = self.state.write();
                    state.tasks = tasks;
                    state.loading = false;
                    state.error = None;
                }
                self.publish();
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = self.state.write();
                    state.loading = false;
                    state.error = Some(LOAD_FAILED.to_string());
                }
                self.publish();
                Err(self.fail(err, LOAD_FAILED))
            }
        }
    }

    /// Creates a task owned by the current user and appends it to the end of
    /// the collection. The list is not re-sorted until the next load.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotAuthenticated`] with no user,
    /// [`TaskStoreError::Validation`] for bad input, or
    /// [`TaskStoreError::Store`] if the insert fails.
    pub async fn add_task(&self, input: NewTask) -> Result<TaskId, TaskStoreError> {
        let Some(owner) = self.current_user() else {
            return Err(self.fail(
                TaskStoreError::NotAuthenticated,
                "You must be signed in to add tasks",
            ));
        };
        let input = input
            .validate(self.options.max_title_len)
            .map_err(|e| self.fail(e, "Failed to add task"))?;

        let created_at = Utc::now();
        let record = encode_new_task(&input, &owner, created_at);
        let doc_id = self
            .backend
            .insert(&self.options.collection, record)
            .await
            .map_err(|e| self.fail(e, "Failed to add task"))?;

        let id = TaskId::from(doc_id);
        let task = input.into_task(id.clone(), owner.clone(), created_at);
        {
            let mut state = self.state.write();
            if state.user.as_ref() == Some(&owner) {
                state.tasks.push(task);
            }
        }
        tracing::info!(task_id = %id, "task added");
        self.publish();
        self.notices.success("Task added");
        Ok(id)
    }

    /// Merges `patch` into the stored task, then into the loaded copy.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] if the task is not loaded,
    /// [`TaskStoreError::Validation`] for bad input or
    /// [`TaskStoreError::Store`] if the write fails.
    pub async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<(), TaskStoreError> {
        const FAILED: &str = "Failed to update task";
        self.loaded_task(id, FAILED)?;
        let patch = patch
            .validate(self.options.max_title_len)
            .map_err(|e| self.fail(e, FAILED))?;
        if patch.is_empty() {
            return Ok(());
        }

        self.backend
            .update(
                &self.options.collection,
                &DocumentId::from(id),
                encode_patch(&patch),
            )
            .await
            .map_err(|e| self.fail(e, FAILED))?;

        self.mutate_task(id, |task| task.apply_patch(&patch));
        tracing::debug!(task_id = %id, "task updated");
        self.notices.success("Task updated");
        Ok(())
    }

    /// Deletes a task and, with it, all of its subtasks.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] if the task is not loaded or
    /// [`TaskStoreError::Store`] if the delete fails.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), TaskStoreError> {
        const FAILED: &str = "Failed to delete task";
        self.loaded_task(id, FAILED)?;
        self.backend
            .delete(&self.options.collection, &DocumentId::from(id))
            .await
            .map_err(|e| self.fail(e, FAILED))?;

        self.state.write().tasks.retain(|t| t.id != *id);
        tracing::info!(task_id = %id, "task deleted");
        self.publish();
        self.notices.success("Task deleted");
        Ok(())
    }

    /// Appends a new subtask to a loaded task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] if the task is not loaded,
    /// [`TaskStoreError::Validation`] for a blank title, or
    /// [`TaskStoreError::Store`] if the write fails.
    pub async fn add_subtask(
        &self,
        task_id: &TaskId,
        input: NewSubtask,
    ) -> Result<SubtaskId, TaskStoreError> {
        const FAILED: &str = "Failed to add subtask";
        let task = self.loaded_task(task_id, FAILED)?;
        let subtask = input.into_subtask().map_err(|e| self.fail(e, FAILED))?;
        let subtask_id = subtask.id.clone();

        let mut subtasks = task.subtasks;
        subtasks.push(subtask);
        self.write_subtasks(task_id, subtasks)
            .await
            .map_err(|e| self.fail(e, FAILED))?;

        tracing::debug!(task_id = %task_id, subtask_id = %subtask_id, "subtask added");
        self.notices.success("Subtask added");
        Ok(subtask_id)
    }

    /// Merges `patch` into one subtask of a loaded task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] or
    /// [`TaskStoreError::SubtaskNotFound`] if either is missing,
    /// [`TaskStoreError::Validation`] for a blank title, or
    /// [`TaskStoreError::Store`] if the write fails.
    pub async fn update_subtask(
        &self,
        task_id: &TaskId,
        subtask_id: &SubtaskId,
        patch: SubtaskPatch,
    ) -> Result<(), TaskStoreError> {
        const FAILED: &str = "Failed to update subtask";
        let patch = patch.validate().map_err(|e| self.fail(e, FAILED))?;
        let mut subtasks = self.loaded_subtasks(task_id, subtask_id, FAILED)?;
        if let Some(subtask) = subtasks.iter_mut().find(|s| s.id == *subtask_id) {
            patch.apply_to(subtask);
        }
        self.write_subtasks(task_id, subtasks)
            .await
            .map_err(|e| self.fail(e, FAILED))?;

        tracing::debug!(task_id = %task_id, subtask_id = %subtask_id, "subtask updated");
        Ok(())
    }

    /// Removes one subtask from a loaded task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] or
    /// [`TaskStoreError::SubtaskNotFound`] if either is missing, or
    /// [`TaskStoreError::Store`] if the write fails.
    pub async fn delete_subtask(
        &self,
        task_id: &TaskId,
        subtask_id: &SubtaskId,
    ) -> Result<(), TaskStoreError> {
        const FAILED: &str = "Failed to delete subtask";
        let mut subtasks = self.loaded_subtasks(task_id, subtask_id, FAILED)?;
        subtasks.retain(|s| s.id != *subtask_id);
        self.write_subtasks(task_id, subtasks)
            .await
            .map_err(|e| self.fail(e, FAILED))?;

        tracing::debug!(task_id = %task_id, subtask_id = %subtask_id, "subtask deleted");
        self.notices.success("Subtask deleted");
        Ok(())
    }

    /// Flips a task's completion flag.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] if the task is not loaded,
    /// otherwise whatever [`update_task`](Self::update_task) returns.
    pub async fn toggle_task_complete(&self, id: &TaskId) -> Result<(), TaskStoreError> {
        let completed = self.loaded_task(id, "Failed to update task")?.completed;
        self.update_task(id, TaskPatch::completed(!completed)).await
    }

    /// Flips a subtask's completion flag.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::TaskNotFound`] or
    /// [`TaskStoreError::SubtaskNotFound`] if either is missing, otherwise
    /// whatever [`update_subtask`](Self::update_subtask) returns.
    pub async fn toggle_subtask_complete(
        &self,
        task_id: &TaskId,
        subtask_id: &SubtaskId,
    ) -> Result<(), TaskStoreError> {
        const FAILED: &str = "Failed to update subtask";
        let subtasks = self.loaded_subtasks(task_id, subtask_id, FAILED)?;
        let completed = subtasks
            .iter()
            .find(|s| s.id == *subtask_id)
            .is_some_and(|s| s.completed);
        self.update_subtask(task_id, subtask_id, SubtaskPatch::completed(!completed))
            .await
    }

    /// Returns a copy of a task in the current user's collection. Ids outside
    /// it are reported as not found and never reach the backend.
    fn loaded_task(&self, id: &TaskId, failed: &str) -> Result<Task, TaskStoreError> {
        self.task(id)
            .ok_or_else(|| self.fail(TaskStoreError::TaskNotFound(id.clone()), failed))
    }

    /// Returns a copy of a loaded task's subtasks, checking that both the
    /// task and the named subtask exist.
    fn loaded_subtasks(
        &self,
        task_id: &TaskId,
        subtask_id: &SubtaskId,
        failed: &str,
    ) -> Result<Vec<Subtask>, TaskStoreError> {
        let task = self.loaded_task(task_id, failed)?;
        if task.subtask(subtask_id).is_none() {
            return Err(self.fail(TaskStoreError::SubtaskNotFound(subtask_id.clone()), failed));
        }
        Ok(task.subtasks)
    }

    /// Writes the whole subtask sequence as one field, then mirrors it into
    /// memory.
    async fn write_subtasks(
        &self,
        task_id: &TaskId,
        subtasks: Vec<Subtask>,
    ) -> Result<(), StoreError> {
        let patch = TaskPatch::subtasks(subtasks);
        self.backend
            .update(
                &self.options.collection,
                &DocumentId::from(task_id),
                encode_patch(&patch),
            )
            .await?;
        self.mutate_task(task_id, |task| task.apply_patch(&patch));
        Ok(())
    }

    /// Applies `f` to the loaded task with this id, if any, and publishes.
    fn mutate_task(&self, id: &TaskId, f: impl FnOnce(&mut Task)) {
        {
            let mut state = self.state.write();
            if let Some(task) = state.tasks.iter_mut().find(|t| t.id == *id) {
                f(task);
            }
        }
        self.publish();
    }
}

impl<D: DocumentStore + 'static> TaskStore<D> {
    /// Spawns a task that reloads the collection on every session change.
    ///
    /// The current session value is loaded first. The task ends when the
    /// identity provider goes away or the returned handle is aborted.
    pub fn spawn_session_follower(
        self: &Arc<Self>,
        mut session: SessionTracker,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let initial = session.mark_seen();
            // Failures are already logged and reported by the store.
            let _ = store.load_for_user(initial.as_ref()).await;
            while let Some(change) = session.changed().await {
                let user = match change {
                    SessionChange::SignedIn(user) => Some(user.uid),
                    SessionChange::SignedOut => None,
                };
                let _ = store.load_for_user(user.as_ref()).await;
            }
            tracing::debug!("session follower stopped");
        })
    }
}
