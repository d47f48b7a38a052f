//! Property tests for the task store's ordering and toggles.
//!
//! Uses proptest to verify:
//! 1. A loaded collection is ordered: incomplete before complete, dated
//!    (ascending) before undated, then high < medium < low priority.
//! 2. Toggling a task's completion twice restores the original flag, both in
//!    memory and in the stored document.
//! 3. Sorting is stable: tasks with equal keys keep their relative order.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;

use taskdeck::backend::memory::InMemoryDocumentStore;
use taskdeck::store::order::{compare_tasks, sort_tasks};
use taskdeck::store::{StoreOptions, TaskStore};
use taskdeck_model::document::{DocumentId, decode_task};
use taskdeck_model::task::{NewTask, Priority, Task, TaskId, UserId};

// --- Strategies ---

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low)
    ]
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2030, 1u32..=12, 1u32..=28)
        .prop_filter_map("valid date", |(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
}

/// Task inputs with a title and the three ordering keys.
fn arb_new_task() -> impl Strategy<Value = NewTask> {
    (
        "[a-z]{1,12}",
        any::<bool>(),
        arb_priority(),
        proptest::option::of(arb_date()),
    )
        .prop_map(|(title, completed, priority, due_date)| NewTask {
            title,
            completed,
            priority,
            due_date,
            ..NewTask::default()
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn assert_display_order(tasks: &[Task]) {
    for pair in tasks.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            !(a.completed && !b.completed),
            "completed task {} before incomplete {}",
            a.title,
            b.title
        );
        if a.completed == b.completed {
            match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => {
                    assert!(x <= y, "dates out of order");
                    if x == y {
                        assert!(a.priority <= b.priority, "priority out of order");
                    }
                }
                (None, Some(_)) => panic!("undated task before dated task"),
                (None, None) => assert!(a.priority <= b.priority, "priority out of order"),
                (Some(_), None) => {}
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn loaded_collection_is_ordered(inputs in prop::collection::vec(arb_new_task(), 0..16)) {
        runtime().block_on(async {
            let (store, _rx) =
                TaskStore::new(InMemoryDocumentStore::new(), StoreOptions::default());
            let user = UserId::new("alice");
            store.load_for_user(Some(&user)).await.unwrap();
            for input in inputs.clone() {
                store.add_task(input).await.unwrap();
            }
            store.load_for_user(Some(&user)).await.unwrap();

            let tasks = store.tasks();
            assert_eq!(tasks.len(), inputs.len());
            assert_display_order(&tasks);
        });
    }

    #[test]
    fn toggle_task_complete_is_an_involution(input in arb_new_task()) {
        runtime().block_on(async {
            let backend = Arc::new(InMemoryDocumentStore::new());
            let (store, _rx) = TaskStore::new(Arc::clone(&backend), StoreOptions::default());
            store.load_for_user(Some(&UserId::new("alice"))).await.unwrap();
            let original = input.completed;
            let id = store.add_task(input).await.unwrap();

            store.toggle_task_complete(&id).await.unwrap();
            assert_eq!(store.task(&id).unwrap().completed, !original);
            store.toggle_task_complete(&id).await.unwrap();
            assert_eq!(store.task(&id).unwrap().completed, original);

            let doc_id = DocumentId::from(&id);
            let doc = backend.get("tasks", &doc_id).await.unwrap();
            assert_eq!(decode_task(&doc_id, &doc).unwrap().completed, original);
        });
    }

    #[test]
    fn sort_is_stable(keys in prop::collection::vec((any::<bool>(), arb_priority()), 0..24)) {
        let mut tasks: Vec<Task> = keys
            .iter()
            .enumerate()
            .map(|(i, (completed, priority))| {
                let mut input = NewTask::new(format!("t{i}")).with_priority(*priority);
                input.completed = *completed;
                input.into_task(TaskId::new(format!("{i:03}")), UserId::new("u1"), Utc::now())
            })
            .collect();
        sort_tasks(&mut tasks);
        for pair in tasks.windows(2) {
            if compare_tasks(&pair[0], &pair[1]) == Ordering::Equal {
                prop_assert!(pair[0].id.as_str() < pair[1].id.as_str());
            }
        }
    }
}
