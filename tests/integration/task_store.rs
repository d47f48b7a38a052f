//! Integration tests for the task store over the in-memory and file-backed
//! document stores.
//!
//! Covers create/load round-trips, subtask flows, sign-out clearing, write
//! failures and persistence across store instances.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc;

use taskdeck::analytics::SubtaskProgress;
use taskdeck::backend::DocumentStore;
use taskdeck::backend::file::{DOCUMENTS_FILE, FileDocumentStore};
use taskdeck::backend::memory::InMemoryDocumentStore;
use taskdeck::filter::{DashboardFilter, StatusTab};
use taskdeck::notice::{Notice, NoticeLevel};
use taskdeck::store::{StoreOptions, TaskStore, TaskStoreError};
use taskdeck_model::task::{NewSubtask, NewTask, Priority, TaskPatch, UserId};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// A store over `backend` already loaded for `user`.
async fn loaded<D: DocumentStore>(
    backend: D,
    user: &str,
) -> (TaskStore<D>, mpsc::Receiver<Notice>) {
    let (store, rx) = TaskStore::new(backend, StoreOptions::default());
    store
        .load_for_user(Some(&UserId::new(user)))
        .await
        .unwrap();
    (store, rx)
}

fn drain(rx: &mut mpsc::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}

fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!(
        "taskdeck-it-{}",
        uuid::Uuid::now_v7().simple()
    ))
}

fn report() -> NewTask {
    NewTask::new("Write report")
        .with_priority(Priority::High)
        .with_due_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_task_shows_on_active_tab_only() {
    let (store, mut rx) = loaded(InMemoryDocumentStore::new(), "alice").await;
    store.add_task(report()).await.unwrap();

    let tasks = store.tasks();
    assert_eq!(tasks.len(), 1);
    let filter = DashboardFilter::default();
    assert_eq!(filter.apply(&tasks, StatusTab::Active).len(), 1);
    assert!(filter.apply(&tasks, StatusTab::Completed).is_empty());

    let notices = drain(&mut rx);
    assert_eq!(notices, vec![Notice::success("Task added")]);
}

#[tokio::test]
async fn subtask_toggle_reaches_full_progress() {
    let (store, _rx) = loaded(InMemoryDocumentStore::new(), "alice").await;
    let task = store.add_task(report()).await.unwrap();
    let sub = store
        .add_subtask(&task, NewSubtask::new("Draft outline"))
        .await
        .unwrap();
    assert_eq!(store.task(&task).unwrap().subtasks.len(), 1);

    store.toggle_subtask_complete(&task, &sub).await.unwrap();
    let current = store.task(&task).unwrap();
    assert_eq!(current.completed_subtasks(), 1);
    assert_eq!(SubtaskProgress::of(&current).percent(), 100);
}

#[tokio::test]
async fn added_task_survives_reload() {
    let backend = Arc::new(InMemoryDocumentStore::new());
    let (store, _rx) = loaded(Arc::clone(&backend), "alice").await;
    let input = report()
        .with_description("quarterly numbers")
        .with_category("Work")
        .with_tags(["finance", "q2"]);
    let id = store.add_task(input).await.unwrap();
    let before = store.task(&id).unwrap();

    let (fresh, _rx) = loaded(backend, "alice").await;
    assert_eq!(fresh.tasks(), vec![before]);
}

#[tokio::test]
async fn readded_subtask_gets_new_id() {
    let (store, _rx) = loaded(InMemoryDocumentStore::new(), "alice").await;
    let task = store.add_task(report()).await.unwrap();
    let first = store
        .add_subtask(&task, NewSubtask::new("Draft outline"))
        .await
        .unwrap();
    store.delete_subtask(&task, &first).await.unwrap();
    let second = store
        .add_subtask(&task, NewSubtask::new("Draft outline"))
        .await
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(store.task(&task).unwrap().subtasks.len(), 1);
}

#[tokio::test]
async fn load_none_clears_previous_user() {
    let (store, _rx) = loaded(InMemoryDocumentStore::new(), "alice").await;
    store.add_task(report()).await.unwrap();

    store.load_for_user(None).await.unwrap();
    let snapshot = store.snapshot();
    assert!(snapshot.tasks.is_empty());
    assert!(!snapshot.loading);
    assert!(snapshot.user.is_none());
}

#[tokio::test]
async fn users_only_see_their_own_tasks() {
    let backend = Arc::new(InMemoryDocumentStore::new());
    let (alice, _rx) = loaded(Arc::clone(&backend), "alice").await;
    alice.add_task(report()).await.unwrap();

    let (bob, _rx) = loaded(backend, "bob").await;
    assert!(bob.tasks().is_empty());

    alice.load_for_user(Some(&UserId::new("bob"))).await.unwrap();
    assert!(alice.tasks().is_empty());
}

#[tokio::test]
async fn other_users_tasks_cannot_be_changed_or_deleted() {
    let backend = Arc::new(InMemoryDocumentStore::new());
    let (bob, _rx) = loaded(Arc::clone(&backend), "bob").await;
    let bobs = bob.add_task(report()).await.unwrap();

    let (alice, mut rx) = loaded(Arc::clone(&backend), "alice").await;
    let err = alice
        .update_task(&bobs, TaskPatch::completed(true))
        .await
        .unwrap_err();
    assert_eq!(err, TaskStoreError::TaskNotFound(bobs.clone()));
    let err = alice.delete_task(&bobs).await.unwrap_err();
    assert_eq!(err, TaskStoreError::TaskNotFound(bobs.clone()));

    let notices = drain(&mut rx);
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.level == NoticeLevel::Error));

    let (bob, _rx) = loaded(backend, "bob").await;
    let task = bob.task(&bobs).unwrap();
    assert!(!task.completed);
    assert_eq!(task.title, "Write report");
}

#[tokio::test]
async fn validation_failure_is_reported_and_nothing_is_written() {
    let backend = Arc::new(InMemoryDocumentStore::new());
    let (store, mut rx) = loaded(Arc::clone(&backend), "alice").await;
    let err = store.add_task(NewTask::new("   ")).await.unwrap_err();
    assert!(matches!(err, TaskStoreError::Validation(_)));
    assert!(store.tasks().is_empty());
    assert_eq!(backend.len("tasks").await, 0);

    let notices = drain(&mut rx);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

#[tokio::test]
async fn update_merges_only_given_fields() {
    let (store, _rx) = loaded(InMemoryDocumentStore::new(), "alice").await;
    let id = store
        .add_task(report().with_category("Work"))
        .await
        .unwrap();
    store
        .update_task(
            &id,
            TaskPatch {
                title: Some("Write final report".into()),
                category: Some(None),
                ..TaskPatch::default()
            },
        )
        .await
        .unwrap();
    let task = store.task(&id).unwrap();
    assert_eq!(task.title, "Write final report");
    assert_eq!(task.category, None);
    assert_eq!(task.priority, Priority::High);
}

// ---------------------------------------------------------------------------
// File-backed persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_store_keeps_tasks_across_instances() {
    let dir = temp_data_dir();
    let path = dir.join(DOCUMENTS_FILE);

    let id = {
        let (store, _rx) = loaded(FileDocumentStore::open(&path).await.unwrap(), "alice").await;
        let id = store.add_task(report()).await.unwrap();
        let sub = store
            .add_subtask(&id, NewSubtask::new("Draft outline"))
            .await
            .unwrap();
        store.toggle_subtask_complete(&id, &sub).await.unwrap();
        id
    };

    let (store, _rx) = loaded(FileDocumentStore::open(&path).await.unwrap(), "alice").await;
    let task = store.task(&id).unwrap();
    assert_eq!(task.title, "Write report");
    assert_eq!(task.completed_subtasks(), 1);

    store.delete_task(&id).await.unwrap();
    let (store, _rx) = loaded(FileDocumentStore::open(&path).await.unwrap(), "alice").await;
    assert!(store.tasks().is_empty());

    let _ = std::fs::remove_dir_all(dir);
}
