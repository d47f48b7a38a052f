//! Integration tests for the dashboard and analytics derivations over a
//! loaded task store, and for the key-driven app state on top of them.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use taskdeck::analytics::Analytics;
use taskdeck::app::{App, Screen};
use taskdeck::backend::AuthUser;
use taskdeck::backend::memory::InMemoryDocumentStore;
use taskdeck::command::AppCommand;
use taskdeck::filter::{DashboardFilter, DashboardSummary, StatusTab, categories};
use taskdeck::store::{StoreOptions, TaskStore};
use taskdeck_model::task::{NewTask, Priority, UserId};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Five tasks, two of them in "Work" (one of those completed).
async fn seeded_store() -> TaskStore<InMemoryDocumentStore> {
    let (store, _rx) = TaskStore::new(InMemoryDocumentStore::new(), StoreOptions::default());
    store
        .load_for_user(Some(&UserId::new("alice")))
        .await
        .unwrap();

    let inputs = [
        NewTask::new("Write report")
            .with_priority(Priority::High)
            .with_category("Work"),
        NewTask::new("Review budget").with_category("Work"),
        NewTask::new("Buy milk")
            .with_priority(Priority::Low)
            .with_category("Home"),
        NewTask::new("Call mom").with_priority(Priority::High),
        NewTask::new("Book dentist")
            .with_due_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
    ];
    for input in inputs {
        store.add_task(input).await.unwrap();
    }
    let review = store
        .tasks()
        .into_iter()
        .find(|t| t.title == "Review budget")
        .unwrap();
    store.toggle_task_complete(&review.id).await.unwrap();
    store
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

// ---------------------------------------------------------------------------
// Filters and summary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn category_filter_counts_incomplete_work_tasks() {
    let store = seeded_store().await;
    let tasks = store.tasks();
    let filter = DashboardFilter {
        category: Some("Work".into()),
        ..DashboardFilter::default()
    };

    let expected = tasks
        .iter()
        .filter(|t| !t.completed && t.category.as_deref() == Some("Work"))
        .count();
    assert_eq!(filter.apply(&tasks, StatusTab::Active).len(), expected);
    assert_eq!(expected, 1);
    assert_eq!(filter.apply(&tasks, StatusTab::Completed).len(), 1);
    assert_eq!(filter.active_count(), 1);
}

#[tokio::test]
async fn summary_and_categories() {
    let store = seeded_store().await;
    let tasks = store.tasks();

    let summary = DashboardSummary::from_tasks(&tasks);
    assert_eq!(summary.total, 5);
    assert_eq!(summary.active, 4);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.active_high, 2);
    assert_eq!(summary.completed_percent(), 20);
    assert_eq!(summary.high_priority_percent(), 50);

    let mut found = categories(&tasks);
    found.sort();
    assert_eq!(found, vec!["Home".to_string(), "Work".to_string()]);
}

#[tokio::test]
async fn loaded_order_puts_dated_first_and_completed_last() {
    let store = seeded_store().await;
    store
        .load_for_user(Some(&UserId::new("alice")))
        .await
        .unwrap();
    let titles: Vec<String> = store.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles.first().map(String::as_str), Some("Book dentist"));
    assert_eq!(titles.last().map(String::as_str), Some("Review budget"));
    let high = &titles[1..3];
    assert!(high.contains(&"Write report".to_string()));
    assert!(high.contains(&"Call mom".to_string()));
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analytics_breakdowns() {
    let store = seeded_store().await;
    let stats = Analytics::from_tasks(&store.tasks());
    assert!(!stats.is_empty());
    assert_eq!(stats.status.completed, 1);
    assert_eq!(stats.status.active, 4);

    let [high, medium, low] = stats.by_priority;
    assert_eq!((high.priority, high.active, high.completed), (Priority::High, 2, 0));
    assert_eq!((medium.active, medium.completed), (1, 1));
    assert_eq!((low.active, low.completed), (1, 0));

    assert!(Analytics::from_tasks(&[]).is_empty());
}

// ---------------------------------------------------------------------------
// App state over a snapshot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn app_filters_follow_keys() {
    let store = seeded_store().await;
    let mut app = App::default();
    app.set_user(Some(AuthUser {
        uid: UserId::new("alice"),
        email: Some("alice@example.com".into()),
    }));
    app.set_snapshot(store.snapshot());
    assert_eq!(app.screen, Screen::Dashboard);
    assert_eq!(app.visible_tasks().len(), 4);

    // First category in first-seen order is "Work".
    app.handle_key_event(key(KeyCode::Char('c')));
    assert_eq!(app.filter.category.as_deref(), Some("Work"));
    assert_eq!(app.visible_tasks().len(), 1);

    let command = app.handle_key_event(key(KeyCode::Char(' ')));
    let selected = app.selected_task().unwrap().id.clone();
    assert_eq!(command, Some(AppCommand::ToggleTask(selected)));

    app.handle_key_event(key(KeyCode::Char('r')));
    app.handle_key_event(key(KeyCode::Tab));
    assert_eq!(app.visible_tasks().len(), 1);
    assert_eq!(app.visible_tasks()[0].title, "Review budget");

    app.set_user(None);
    assert_eq!(app.screen, Screen::Login);
}
