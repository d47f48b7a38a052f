//! Integration tests for sign-in, sign-out and the session-driven reload of
//! the task store.
//!
//! Wires the in-memory identity provider and document store the way the
//! binary does and drives them through the command handler.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use taskdeck::auth::{AuthFailure, Authenticator, FormError, LoginForm, RegisterForm, ResetForm};
use taskdeck::backend::memory::{InMemoryDocumentStore, InMemoryIdentityProvider};
use taskdeck::backend::{AuthError, IdentityProvider, OAuthProvider};
use taskdeck::command::{AppCommand, Services, spawn_commands};
use taskdeck::notice::{Notice, NoticeSender};
use taskdeck::session::SessionTracker;
use taskdeck::store::{StoreOptions, TaskStore};
use taskdeck::theme::{MemoryPreferenceStore, ThemeController};
use taskdeck_model::task::NewTask;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

type Idp = Arc<InMemoryIdentityProvider>;
type Docs = Arc<InMemoryDocumentStore>;

struct Harness {
    idp: Idp,
    docs: Docs,
    store: Arc<TaskStore<Docs>>,
    revisions: watch::Receiver<u64>,
    follower: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn new() -> Self {
        Self::over(Arc::new(InMemoryDocumentStore::new()))
    }

    fn over(docs: Docs) -> Self {
        let idp = Arc::new(
            InMemoryIdentityProvider::new().with_popup_identity("grace@example.com"),
        );
        let (store, _rx) = TaskStore::new(Arc::clone(&docs), StoreOptions::default());
        let store = Arc::new(store);
        let revisions = store.subscribe();
        let follower = store.spawn_session_follower(SessionTracker::start(&idp));
        Self {
            idp,
            docs,
            store,
            revisions,
            follower,
        }
    }

    /// Waits until the store publishes a state matching `done`.
    async fn wait_for(&mut self, done: impl Fn(&TaskStore<Docs>) -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !done(&self.store) {
                self.revisions.changed().await.unwrap();
            }
        })
        .await
        .expect("store never reached the expected state");
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.follower.abort();
    }
}

fn register(email: &str) -> RegisterForm {
    RegisterForm {
        email: email.into(),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
    }
}

fn drain(rx: &mut mpsc::Receiver<Notice>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice.message);
    }
    out
}

// ---------------------------------------------------------------------------
// Session follower
// ---------------------------------------------------------------------------

#[tokio::test]
async fn starts_signed_out_and_not_loading() {
    let mut h = Harness::new();
    h.wait_for(|s| !s.is_loading()).await;
    assert!(h.store.current_user().is_none());
    assert!(h.store.tasks().is_empty());
}

#[tokio::test]
async fn sign_in_loads_and_sign_out_clears() {
    let mut h = Harness::new();
    let user = h.idp.sign_up("ada@example.com", "secret1").await.unwrap();
    h.wait_for(|s| s.current_user().as_ref() == Some(&user.uid) && !s.is_loading())
        .await;

    h.store.add_task(NewTask::new("Write report")).await.unwrap();
    assert_eq!(h.store.tasks().len(), 1);

    h.idp.sign_out().await.unwrap();
    h.wait_for(|s| s.current_user().is_none()).await;
    let snapshot = h.store.snapshot();
    assert!(snapshot.tasks.is_empty());
    assert!(!snapshot.loading);

    h.idp.sign_in("ada@example.com", "secret1").await.unwrap();
    h.wait_for(|s| s.tasks().len() == 1).await;
    assert_eq!(h.store.tasks()[0].title, "Write report");
}

#[tokio::test]
async fn tasks_follow_the_account_not_the_process() {
    let docs = Arc::new(InMemoryDocumentStore::new());
    {
        let mut h = Harness::over(Arc::clone(&docs));
        h.idp.sign_up("ada@example.com", "secret1").await.unwrap();
        h.wait_for(|s| s.current_user().is_some() && !s.is_loading())
            .await;
        h.store.add_task(NewTask::new("Write report")).await.unwrap();
    }

    // A fresh provider derives the same user id from the same email.
    let mut h = Harness::over(docs);
    h.idp.sign_up("ada@example.com", "secret1").await.unwrap();
    h.wait_for(|s| s.tasks().len() == 1).await;
    assert_eq!(h.docs.len("tasks").await, 1);
}

#[tokio::test]
async fn switching_users_never_shows_the_previous_users_tasks() {
    let mut h = Harness::new();
    h.idp.sign_up("ada@example.com", "secret1").await.unwrap();
    h.wait_for(|s| s.current_user().is_some() && !s.is_loading())
        .await;
    h.store.add_task(NewTask::new("Ada's task")).await.unwrap();

    let grace = h
        .idp
        .sign_in_with_popup(OAuthProvider::Google)
        .await
        .unwrap();
    h.wait_for(|s| s.current_user().as_ref() == Some(&grace.uid) && !s.is_loading())
        .await;
    assert!(h.store.tasks().is_empty());
}

// ---------------------------------------------------------------------------
// Auth flows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn auth_outcomes_are_reported_as_notices() {
    let idp = Arc::new(InMemoryIdentityProvider::new());
    let (notices, mut rx) = NoticeSender::channel(16);
    let auth = Authenticator::new(Arc::clone(&idp), notices);

    auth.sign_up(&register("ada@example.com")).await.unwrap();
    auth.sign_out().await.unwrap();

    let wrong = LoginForm {
        email: "ada@example.com".into(),
        password: "wrong-password".into(),
    };
    let err = auth.sign_in(&wrong).await.unwrap_err();
    assert_eq!(err, AuthFailure::Provider(AuthError::InvalidCredential));

    let dup = auth.sign_up(&register("ada@example.com")).await.unwrap_err();
    assert_eq!(dup, AuthFailure::Provider(AuthError::EmailAlreadyInUse));

    let messages = drain(&mut rx);
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2], "Invalid email or password");
}

#[tokio::test]
async fn repeated_bad_passwords_are_throttled() {
    let idp = Arc::new(InMemoryIdentityProvider::new());
    let (notices, mut rx) = NoticeSender::channel(16);
    let auth = Authenticator::new(Arc::clone(&idp), notices);
    auth.sign_up(&register("ada@example.com")).await.unwrap();
    auth.sign_out().await.unwrap();
    drain(&mut rx);

    let wrong = LoginForm {
        email: "ada@example.com".into(),
        password: "wrong-password".into(),
    };
    let mut last = None;
    for _ in 0..6 {
        last = auth.sign_in(&wrong).await.err();
    }
    assert_eq!(last, Some(AuthFailure::Provider(AuthError::TooManyRequests)));
    assert_eq!(
        drain(&mut rx).last().map(String::as_str),
        Some("Too many sign-in attempts. Try again later.")
    );
}

#[tokio::test]
async fn invalid_forms_never_reach_the_provider() {
    let idp = Arc::new(InMemoryIdentityProvider::new());
    let (notices, mut rx) = NoticeSender::channel(16);
    let auth = Authenticator::new(Arc::clone(&idp), notices);

    let err = auth
        .send_password_reset(&ResetForm {
            email: "not-an-email".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err, AuthFailure::Form(FormError::InvalidEmail));
    assert!(idp.password_resets().is_empty());
    assert!(drain(&mut rx).is_empty());
}

// ---------------------------------------------------------------------------
// Command handler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn commands_drive_a_full_session() {
    let idp = Arc::new(InMemoryIdentityProvider::new());
    let docs = Arc::new(InMemoryDocumentStore::new());
    let (store, mut store_rx) = TaskStore::new(Arc::clone(&docs), StoreOptions::default());
    let store = Arc::new(store);
    let mut revisions = store.subscribe();
    let follower = store.spawn_session_follower(SessionTracker::start(&idp));

    let (notices, mut auth_rx) = NoticeSender::channel(16);
    let services = Arc::new(Services {
        auth: Authenticator::new(Arc::clone(&idp), notices),
        store: Arc::clone(&store),
        theme: ThemeController::new(MemoryPreferenceStore::default()),
    });
    let (tx, handle) = spawn_commands(services, 16);

    tx.send(AppCommand::SignUp(register("ada@example.com")))
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        while store.current_user().is_none() || store.is_loading() {
            revisions.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    tx.send(AppCommand::AddTask(NewTask::new("Write report")))
        .await
        .unwrap();
    tx.send(AppCommand::SignOut).await.unwrap();
    tx.send(AppCommand::Shutdown).await.unwrap();
    handle.await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while store.current_user().is_some() {
            revisions.changed().await.unwrap();
        }
    })
    .await
    .unwrap();
    assert!(store.tasks().is_empty());
    assert_eq!(docs.len("tasks").await, 1);

    assert_eq!(drain(&mut auth_rx).len(), 2);
    assert_eq!(drain(&mut store_rx), vec!["Task added".to_string()]);
    follower.abort();
}
