//! Session tracking.
//!
//! [`SessionTracker`] follows the identity provider's auth-state channel and
//! exposes the current user. Consumers either read the current value or await
//! [`SessionTracker::changed`] for the next transition.

use tokio::sync::watch;

use taskdeck_model::task::UserId;

use crate::backend::{AuthUser, IdentityProvider};

/// A transition observed on the auth-state channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// A user signed in (or the signed-in user changed).
    SignedIn(AuthUser),
    /// The previous user signed out; dependent state must be cleared.
    SignedOut,
}

/// Follows auth-state changes from an [`IdentityProvider`].
#[derive(Debug, Clone)]
pub struct SessionTracker {
    rx: watch::Receiver<Option<AuthUser>>,
}

impl SessionTracker {
    /// Registers with the provider's auth-state channel.
    #[must_use]
    pub fn start<P: IdentityProvider>(provider: &P) -> Self {
        Self::from_receiver(provider.subscribe())
    }

    /// Wraps an existing auth-state receiver.
    #[must_use]
    pub const fn from_receiver(rx: watch::Receiver<Option<AuthUser>>) -> Self {
        Self { rx }
    }

    /// The currently signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.rx.borrow().clone()
    }

    /// Id of the currently signed-in user, if any.
    #[must_use]
    pub fn current_user_id(&self) -> Option<UserId> {
        self.rx.borrow().as_ref().map(|u| u.uid.clone())
    }

    /// Whether someone is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Waits for the next auth-state change.
    ///
    /// Returns `None` once the provider has gone away; no further changes
    /// will arrive after that.
    pub async fn changed(&mut self) -> Option<SessionChange> {
        self.rx.changed().await.ok()?;
        let change = match self.rx.borrow_and_update().clone() {
            Some(user) => SessionChange::SignedIn(user),
            None => SessionChange::SignedOut,
        };
        tracing::debug!(?change, "session changed");
        Some(change)
    }

    /// Returns the pending auth-state change without waiting, if any.
    ///
    /// Intended for poll-based loops that cannot await.
    pub fn poll_change(&mut self) -> Option<SessionChange> {
        if !self.rx.has_changed().unwrap_or(false) {
            return None;
        }
        Some(match self.rx.borrow_and_update().clone() {
            Some(user) => SessionChange::SignedIn(user),
            None => SessionChange::SignedOut,
        })
    }

    /// Marks the current value as seen so [`changed`](Self::changed) only
    /// reports later transitions.
    pub fn mark_seen(&mut self) -> Option<UserId> {
        self.rx.borrow_and_update().as_ref().map(|u| u.uid.clone())
    }
}
