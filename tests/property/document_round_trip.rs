//! Property tests for the task document encoding.
//!
//! Uses proptest to verify:
//! 1. Any valid `NewTask` read back from its document keeps its field values.
//! 2. Applying a `TaskPatch` in memory agrees with writing its encoded fields
//!    into the stored document and reading the result back.

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use taskdeck_model::document::{DocumentId, decode_task, encode_new_task, encode_patch};
use taskdeck_model::task::{NewSubtask, NewTask, Priority, Subtask, TaskPatch, UserId};

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low)
    ]
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
        .prop_filter_map("valid date", |(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
}

fn arb_subtask() -> impl Strategy<Value = Subtask> {
    (
        "[a-zA-Z][a-zA-Z ]{0,20}",
        any::<bool>(),
        proptest::option::of(arb_priority()),
        proptest::option::of(arb_date()),
    )
        .prop_filter_map("valid subtask", |(title, completed, priority, due_date)| {
            let mut sub = NewSubtask::new(title).into_subtask().ok()?;
            sub.completed = completed;
            sub.priority = priority;
            sub.due_date = due_date;
            Some(sub)
        })
}

fn arb_new_task() -> impl Strategy<Value = NewTask> {
    (
        "[a-zA-Z][a-zA-Z0-9 ]{0,40}",
        proptest::option::of("[a-z ]{1,30}"),
        any::<bool>(),
        arb_priority(),
        proptest::option::of(arb_date()),
        proptest::option::of("[A-Z][a-z]{0,10}"),
        prop::collection::vec("[a-z]{1,8}", 0..4),
        prop::collection::vec(arb_subtask(), 0..4),
    )
        .prop_map(
            |(title, description, completed, priority, due_date, category, tags, subtasks)| {
                NewTask {
                    title,
                    description,
                    completed,
                    priority,
                    due_date,
                    category,
                    tags,
                    subtasks,
                }
            },
        )
}

proptest! {
    /// Every field of a validated task survives the document round trip.
    #[test]
    fn new_task_document_round_trip(input in arb_new_task()) {
        let task = input.validate(256).expect("generated titles are valid");
        let owner = UserId::new("owner-1");
        let created_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().expect("valid ts");
        let doc = encode_new_task(&task, &owner, created_at);
        let decoded = decode_task(&DocumentId::new("doc-1"), &doc).expect("decode");

        prop_assert_eq!(&decoded.title, &task.title);
        prop_assert_eq!(&decoded.description, &task.description);
        prop_assert_eq!(decoded.completed, task.completed);
        prop_assert_eq!(decoded.priority, task.priority);
        prop_assert_eq!(decoded.due_date, task.due_date);
        prop_assert_eq!(&decoded.category, &task.category);
        prop_assert_eq!(&decoded.tags, &task.tags);
        prop_assert_eq!(&decoded.subtasks, &task.subtasks);
        prop_assert_eq!(decoded.created_at, created_at);
        prop_assert_eq!(&decoded.user_id, &owner);
    }

    /// Merging encoded patch fields into a stored document matches merging
    /// the patch into the decoded task.
    #[test]
    fn patch_merge_matches_in_memory_merge(
        input in arb_new_task(),
        completed in proptest::option::of(any::<bool>()),
        priority in proptest::option::of(arb_priority()),
        due in proptest::option::of(proptest::option::of(arb_date())),
    ) {
        let task = input.validate(256).expect("generated titles are valid");
        let id = DocumentId::new("doc-1");
        let mut doc = encode_new_task(&task, &UserId::new("owner-1"), Utc::now());
        let mut in_memory = decode_task(&id, &doc).expect("decode");

        let patch = TaskPatch { completed, priority, due_date: due, ..TaskPatch::default() };
        doc.extend(encode_patch(&patch));
        in_memory.apply_patch(&patch);

        let stored = decode_task(&id, &doc).expect("decode patched");
        prop_assert_eq!(stored.completed, in_memory.completed);
        prop_assert_eq!(stored.priority, in_memory.priority);
        prop_assert_eq!(stored.due_date, in_memory.due_date);
    }
}
