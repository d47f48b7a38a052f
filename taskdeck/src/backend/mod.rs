//! Managed backend contracts for `TaskDeck`.
//!
//! Defines the two external collaborators the application sits on:
//! - [`IdentityProvider`]: issues sessions and broadcasts auth-state changes
//! - [`DocumentStore`]: persists task records as field maps
//!
//! Concrete implementations include:
//! - [`memory::InMemoryIdentityProvider`] and [`memory::InMemoryDocumentStore`]:
//!   in-process backends for tests and local use
//! - [`file::FileDocumentStore`]: JSON-file-backed document store

pub mod file;
pub mod memory;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use taskdeck_model::document::{Document, DocumentId, FieldValue};
use taskdeck_model::task::UserId;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Loose email shape check: `local@domain.tld`, no whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !domain.ends_with('.')
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Provider-issued user id.
    pub uid: UserId,
    /// Email address, if the account has one.
    pub email: Option<String>,
}

/// Federated sign-in providers usable through a popup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    /// Google account sign-in.
    Google,
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => write!(f, "google.com"),
        }
    }
}

/// Errors reported by the identity provider.
///
/// Each variant corresponds to a provider error code (see [`AuthError::code`]);
/// user-facing wording lives in [`crate::auth`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Email/password pair does not match an account.
    #[error("invalid credential")]
    InvalidCredential,
    /// No account exists for the email.
    #[error("user not found")]
    UserNotFound,
    /// Password is wrong for an existing account.
    #[error("wrong password")]
    WrongPassword,
    /// Too many failed attempts; the account is temporarily locked.
    #[error("too many requests")]
    TooManyRequests,
    /// Sign-up email is already registered.
    #[error("email already in use")]
    EmailAlreadyInUse,
    /// Email address is malformed.
    #[error("invalid email")]
    InvalidEmail,
    /// Password does not meet the provider's strength rules.
    #[error("weak password")]
    WeakPassword,
    /// The user closed the federated sign-in popup.
    #[error("popup closed by user")]
    PopupClosed,
    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),
    /// Any other provider error code.
    #[error("auth error: {0}")]
    Other(String),
}

impl AuthError {
    /// Provider error code, e.g. `auth/invalid-credential`.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidCredential => "auth/invalid-credential",
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::InvalidEmail => "auth/invalid-email",
            Self::WeakPassword => "auth/weak-password",
            Self::PopupClosed => "auth/popup-closed-by-user",
            Self::Network(_) => "auth/network-request-failed",
            Self::Other(code) => code,
        }
    }

    /// Maps a provider error code back to a variant.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "auth/invalid-credential" => Self::InvalidCredential,
            "auth/user-not-found" => Self::UserNotFound,
            "auth/wrong-password" => Self::WrongPassword,
            "auth/too-many-requests" => Self::TooManyRequests,
            "auth/email-already-in-use" => Self::EmailAlreadyInUse,
            "auth/invalid-email" => Self::InvalidEmail,
            "auth/weak-password" => Self::WeakPassword,
            "auth/popup-closed-by-user" => Self::PopupClosed,
            "auth/network-request-failed" => Self::Network(String::new()),
            other => Self::Other(other.to_string()),
        }
    }
}

/// Errors that can occur during document store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store is unreachable or refused the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write operation failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// A read operation failed.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// The requested document was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Async identity provider.
///
/// Sign-in operations that succeed also publish the new user on the
/// auth-state channel; [`sign_out`](IdentityProvider::sign_out) publishes
/// `None`.
pub trait IdentityProvider: Send + Sync {
    /// Registers a new email/password account and signs it in.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthUser, AuthError>> + Send;

    /// Signs in with email and password.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthUser, AuthError>> + Send;

    /// Signs in through a federated provider's popup flow.
    fn sign_in_with_popup(
        &self,
        provider: OAuthProvider,
    ) -> impl Future<Output = Result<AuthUser, AuthError>> + Send;

    /// Ends the current session.
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Sends a password reset email.
    fn send_password_reset(&self, email: &str)
    -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Registers for auth-state changes.
    ///
    /// The receiver holds the current user immediately and is updated on
    /// every change. Dropping it unsubscribes.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Async document store addressed by collection and document id.
///
/// There are no transactions: each call is atomic for the single document it
/// touches, and concurrent writers are last-write-wins.
pub trait DocumentStore: Send + Sync {
    /// Returns every document in `collection` whose `field` equals `value`.
    fn query(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> impl Future<Output = Result<Vec<(DocumentId, Document)>, StoreError>> + Send;

    /// Inserts a new document and returns its store-assigned id.
    fn insert(
        &self,
        collection: &str,
        record: Document,
    ) -> impl Future<Output = Result<DocumentId, StoreError>> + Send;

    /// Merges `fields` into an existing document. Fields not present in
    /// `fields` are left untouched.
    fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Document,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes a document. Deleting a missing document is not an error.
    fn delete(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<T: DocumentStore> DocumentStore for Arc<T> {
    fn query(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> impl Future<Output = Result<Vec<(DocumentId, Document)>, StoreError>> + Send {
        (**self).query(collection, field, value)
    }

    fn insert(
        &self,
        collection: &str,
        record: Document,
    ) -> impl Future<Output = Result<DocumentId, StoreError>> + Send {
        (**self).insert(collection, record)
    }

    fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Document,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).update(collection, id, fields)
    }

    fn delete(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).delete(collection, id)
    }
}

impl<T: IdentityProvider> IdentityProvider for Arc<T> {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthUser, AuthError>> + Send {
        (**self).sign_up(email, password)
    }

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthUser, AuthError>> + Send {
        (**self).sign_in(email, password)
    }

    fn sign_in_with_popup(
        &self,
        provider: OAuthProvider,
    ) -> impl Future<Output = Result<AuthUser, AuthError>> + Send {
        (**self).sign_in_with_popup(provider)
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send {
        (**self).sign_out()
    }

    fn send_password_reset(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<(), AuthError>> + Send {
        (**self).send_password_reset(email)
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        (**self).subscribe()
    }
}
