//! In-process backends.
//!
//! [`InMemoryDocumentStore`] keeps collections in a `HashMap` behind an async
//! mutex; [`InMemoryIdentityProvider`] keeps email/password accounts and
//! publishes auth-state changes on a [`watch`] channel. Nothing here is
//! persistent: all data is lost when the process exits.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use taskdeck_model::document::{Document, DocumentId, FieldValue};
use taskdeck_model::task::UserId;

use super::{
    AuthError, AuthUser, DocumentStore, IdentityProvider, MIN_PASSWORD_LENGTH, OAuthProvider,
    StoreError, is_valid_email,
};

/// Consecutive bad passwords after which sign-in is refused.
pub const MAX_FAILED_SIGN_INS: u32 = 5;

/// How long an account stays locked after too many bad passwords.
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(60);

/// Documents of one collection, ordered by id.
pub(crate) type Collection = BTreeMap<DocumentId, Document>;

/// Allocates a fresh store-assigned document id.
pub(crate) fn new_document_id() -> DocumentId {
    DocumentId::new(Uuid::now_v7().simple().to_string())
}

/// Returns the documents of `collection` whose `field` equals `value`.
pub(crate) fn query_collection(
    collection: Option<&Collection>,
    field: &str,
    value: &FieldValue,
) -> Vec<(DocumentId, Document)> {
    collection
        .map(|docs| {
            docs.iter()
                .filter(|(_, doc)| doc.get(field) == Some(value))
                .map(|(id, doc)| (id.clone(), doc.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Merges `fields` into the document `id`, or reports it missing.
pub(crate) fn merge_into(
    collection: Option<&mut Collection>,
    name: &str,
    id: &DocumentId,
    fields: Document,
) -> Result<(), StoreError> {
    match collection.and_then(|docs| docs.get_mut(id)) {
        Some(doc) => {
            doc.extend(fields);
            Ok(())
        }
        None => Err(StoreError::NotFound(format!("{name}/{id}"))),
    }
}

/// In-memory implementation of [`DocumentStore`].
pub struct InMemoryDocumentStore {
    /// Collection name -> documents.
    collections: Mutex<HashMap<String, Collection>>,
}

impl InMemoryDocumentStore {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a single document, if present.
    pub async fn get(&self, collection: &str, id: &DocumentId) -> Option<Document> {
        self.collections
            .lock()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Number of documents in a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Store a document under a caller-chosen id, replacing any existing one.
    ///
    /// Useful for seeding records the application did not write itself.
    pub async fn put(&self, collection: &str, id: DocumentId, record: Document) {
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id, record);
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<(DocumentId, Document)>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(query_collection(collections.get(collection), field, value))
    }

    async fn insert(&self, collection: &str, record: Document) -> Result<DocumentId, StoreError> {
        let id = new_document_id();
        self.collections
            .lock()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        merge_into(collections.get_mut(collection), collection, id, fields)
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        if let Some(docs) = self.collections.lock().await.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

/// A registered account.
#[derive(Debug, Clone)]
struct Account {
    uid: UserId,
    /// `None` for accounts created through a federated provider.
    password: Option<String>,
}

/// Bad-password streak for one account.
#[derive(Debug, Clone, Copy)]
struct FailedSignIns {
    count: u32,
    last: Instant,
}

/// Normalizes an email for use as an account key.
fn account_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Derives a stable user id from an email address.
fn derive_uid(key: &str) -> UserId {
    UserId::new(
        Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("mailto:{key}").as_bytes())
            .simple()
            .to_string(),
    )
}

/// In-memory implementation of [`IdentityProvider`].
///
/// User ids are derived from the account email, so re-registering the same
/// email in a fresh provider yields the same id.
pub struct InMemoryIdentityProvider {
    /// Email key -> account.
    accounts: SyncMutex<HashMap<String, Account>>,
    /// Email key -> consecutive failed sign-ins.
    failed_sign_ins: SyncMutex<HashMap<String, FailedSignIns>>,
    /// Lock duration once [`MAX_FAILED_SIGN_INS`] is reached.
    lockout: Duration,
    /// Email the popup flow signs in as; `None` simulates a closed popup.
    popup_identity: SyncMutex<Option<String>>,
    /// Emails a password reset was sent to, in order.
    password_resets: SyncMutex<Vec<String>>,
    /// Current auth state.
    state: watch::Sender<Option<AuthUser>>,
}

impl InMemoryIdentityProvider {
    /// Create a provider with no accounts and nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            accounts: SyncMutex::new(HashMap::new()),
            failed_sign_ins: SyncMutex::new(HashMap::new()),
            lockout: DEFAULT_LOCKOUT,
            popup_identity: SyncMutex::new(None),
            password_resets: SyncMutex::new(Vec::new()),
            state,
        }
    }

    /// Sets the account the popup flow signs in as.
    #[must_use]
    pub fn with_popup_identity(self, email: impl Into<String>) -> Self {
        *self.popup_identity.lock() = Some(email.into());
        self
    }

    /// Sets how long an account stays locked after too many bad passwords.
    #[must_use]
    pub const fn with_lockout(mut self, lockout: Duration) -> Self {
        self.lockout = lockout;
        self
    }

    /// The currently signed-in user.
    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    /// Emails that password resets were sent to.
    #[must_use]
    pub fn password_resets(&self) -> Vec<String> {
        self.password_resets.lock().clone()
    }

    fn publish(&self, user: Option<AuthUser>) {
        tracing::debug!(uid = ?user.as_ref().map(|u| u.uid.to_string()), "auth state changed");
        self.state.send_replace(user);
    }

    fn signed_in(&self, key: &str, account: &Account) -> AuthUser {
        let user = AuthUser {
            uid: account.uid.clone(),
            email: Some(key.to_string()),
        };
        self.publish(Some(user.clone()));
        user
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }
        let key = account_key(email);
        let account = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(&key) {
                return Err(AuthError::EmailAlreadyInUse);
            }
            let account = Account {
                uid: derive_uid(&key),
                password: Some(password.to_string()),
            };
            accounts.insert(key.clone(), account.clone());
            account
        };
        tracing::info!(uid = %account.uid, "account registered");
        Ok(self.signed_in(&key, &account))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        let key = account_key(email);
        let account = self
            .accounts
            .lock()
            .get(&key)
            .cloned()
            .ok_or(AuthError::InvalidCredential)?;

        {
            let mut failures = self.failed_sign_ins.lock();
            if let Some(streak) = failures.get(&key).copied()
                && streak.count >= MAX_FAILED_SIGN_INS
            {
                if streak.last.elapsed() < self.lockout {
                    return Err(AuthError::TooManyRequests);
                }
                tracing::debug!(uid = %account.uid, "sign-in lockout expired");
                failures.remove(&key);
            }
            if account.password.as_deref() != Some(password) {
                let streak = failures.entry(key).or_insert(FailedSignIns {
                    count: 0,
                    last: Instant::now(),
                });
                streak.count += 1;
                streak.last = Instant::now();
                return Err(AuthError::InvalidCredential);
            }
            failures.remove(&key);
        }

        Ok(self.signed_in(&key, &account))
    }

    async fn sign_in_with_popup(&self, provider: OAuthProvider) -> Result<AuthUser, AuthError> {
        let email = self
            .popup_identity
            .lock()
            .clone()
            .ok_or(AuthError::PopupClosed)?;
        let key = account_key(&email);
        let account = self
            .accounts
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Account {
                uid: derive_uid(&key),
                password: None,
            })
            .clone();
        tracing::info!(uid = %account.uid, %provider, "federated sign-in");
        Ok(self.signed_in(&key, &account))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.publish(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        let key = account_key(email);
        if !self.accounts.lock().contains_key(&key) {
            return Err(AuthError::UserNotFound);
        }
        self.password_resets.lock().push(key);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(owner: &str, title: &str) -> Document {
        let mut d = Document::new();
        d.insert("userId".to_string(), FieldValue::from(owner));
        d.insert("title".to_string(), FieldValue::from(title));
        d
    }

    #[tokio::test]
    async fn insert_assigns_unique_ids() {
        let store = InMemoryDocumentStore::new();
        let a = store.insert("tasks", doc("u1", "a")).await.unwrap();
        let b = store.insert("tasks", doc("u1", "b")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len("tasks").await, 2);
    }

    #[tokio::test]
    async fn query_filters_by_field() {
        let store = InMemoryDocumentStore::new();
        store.insert("tasks", doc("u1", "mine")).await.unwrap();
        store.insert("tasks", doc("u2", "theirs")).await.unwrap();

        let found = store
            .query("tasks", "userId", &FieldValue::from("u1"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.get("title"), Some(&FieldValue::from("mine")));
    }

    #[tokio::test]
    async fn query_unknown_collection_is_empty() {
        let store = InMemoryDocumentStore::new();
        let found = store
            .query("nothing", "userId", &FieldValue::from("u1"))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = InMemoryDocumentStore::new();
        let id = store.insert("tasks", doc("u1", "a")).await.unwrap();

        let mut patch = Document::new();
        patch.insert("completed".to_string(), FieldValue::Bool(true));
        store.update("tasks", &id, patch).await.unwrap();

        let stored = store.get("tasks", &id).await.unwrap();
        assert_eq!(stored.get("completed"), Some(&FieldValue::Bool(true)));
        assert_eq!(stored.get("title"), Some(&FieldValue::from("a")));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let result = store
            .update("tasks", &DocumentId::new("ghost"), Document::new())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryDocumentStore::new();
        let id = store.insert("tasks", doc("u1", "a")).await.unwrap();
        store.delete("tasks", &id).await.unwrap();
        store.delete("tasks", &id).await.unwrap();
        assert_eq!(store.len("tasks").await, 0);
    }

    #[tokio::test]
    async fn sign_up_publishes_user() {
        let idp = InMemoryIdentityProvider::new();
        let rx = idp.subscribe();
        let user = idp.sign_up("ada@example.com", "secret1").await.unwrap();
        assert_eq!(rx.borrow().as_ref(), Some(&user));
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn sign_up_rejects_bad_input() {
        let idp = InMemoryIdentityProvider::new();
        assert_eq!(
            idp.sign_up("nope", "secret1").await,
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            idp.sign_up("ada@example.com", "123").await,
            Err(AuthError::WeakPassword)
        );
        idp.sign_up("ada@example.com", "secret1").await.unwrap();
        assert_eq!(
            idp.sign_up("ADA@example.com", "secret2").await,
            Err(AuthError::EmailAlreadyInUse)
        );
    }

    #[tokio::test]
    async fn uid_is_stable_per_email() {
        let first = InMemoryIdentityProvider::new()
            .sign_up("ada@example.com", "secret1")
            .await
            .unwrap();
        let second = InMemoryIdentityProvider::new()
            .sign_up("ada@example.com", "other-pw")
            .await
            .unwrap();
        assert_eq!(first.uid, second.uid);
    }

    #[tokio::test]
    async fn sign_in_and_out() {
        let idp = InMemoryIdentityProvider::new();
        let registered = idp.sign_up("ada@example.com", "secret1").await.unwrap();
        idp.sign_out().await.unwrap();
        assert!(idp.current_user().is_none());

        let user = idp.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(user.uid, registered.uid);
        assert_eq!(idp.current_user(), Some(user));
    }

    #[tokio::test]
    async fn unknown_account_is_invalid_credential() {
        let idp = InMemoryIdentityProvider::new();
        assert_eq!(
            idp.sign_in("ghost@example.com", "whatever").await,
            Err(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn repeated_bad_passwords_lock_the_account() {
        let idp = InMemoryIdentityProvider::new();
        idp.sign_up("ada@example.com", "secret1").await.unwrap();
        idp.sign_out().await.unwrap();

        for _ in 0..MAX_FAILED_SIGN_INS {
            assert_eq!(
                idp.sign_in("ada@example.com", "wrong").await,
                Err(AuthError::InvalidCredential)
            );
        }
        assert_eq!(
            idp.sign_in("ada@example.com", "secret1").await,
            Err(AuthError::TooManyRequests)
        );
        assert!(idp.current_user().is_none());
    }

    #[tokio::test]
    async fn lockout_lifts_after_cooldown() {
        let idp = InMemoryIdentityProvider::new().with_lockout(Duration::ZERO);
        idp.sign_up("ada@example.com", "secret1").await.unwrap();
        idp.sign_out().await.unwrap();

        for _ in 0..MAX_FAILED_SIGN_INS {
            let _ = idp.sign_in("ada@example.com", "wrong").await;
        }
        let user = idp.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(idp.current_user(), Some(user));

        // The streak starts over after the lock lifts.
        for _ in 0..MAX_FAILED_SIGN_INS - 1 {
            assert_eq!(
                idp.sign_in("ada@example.com", "wrong").await,
                Err(AuthError::InvalidCredential)
            );
        }
        assert!(idp.sign_in("ada@example.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn successful_sign_in_resets_failures() {
        let idp = InMemoryIdentityProvider::new();
        idp.sign_up("ada@example.com", "secret1").await.unwrap();
        for _ in 0..MAX_FAILED_SIGN_INS - 1 {
            let _ = idp.sign_in("ada@example.com", "wrong").await;
        }
        idp.sign_in("ada@example.com", "secret1").await.unwrap();
        for _ in 0..MAX_FAILED_SIGN_INS - 1 {
            let _ = idp.sign_in("ada@example.com", "wrong").await;
        }
        assert!(idp.sign_in("ada@example.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn popup_without_identity_is_closed() {
        let idp = InMemoryIdentityProvider::new();
        assert_eq!(
            idp.sign_in_with_popup(OAuthProvider::Google).await,
            Err(AuthError::PopupClosed)
        );
    }

    #[tokio::test]
    async fn popup_creates_account_once() {
        let idp = InMemoryIdentityProvider::new().with_popup_identity("g@example.com");
        let first = idp.sign_in_with_popup(OAuthProvider::Google).await.unwrap();
        let second = idp.sign_in_with_popup(OAuthProvider::Google).await.unwrap();
        assert_eq!(first.uid, second.uid);
        assert_eq!(
            idp.sign_up("g@example.com", "secret1").await,
            Err(AuthError::EmailAlreadyInUse)
        );
    }

    #[tokio::test]
    async fn password_reset_requires_account() {
        let idp = InMemoryIdentityProvider::new();
        assert_eq!(
            idp.send_password_reset("ghost@example.com").await,
            Err(AuthError::UserNotFound)
        );
        idp.sign_up("ada@example.com", "secret1").await.unwrap();
        idp.send_password_reset("ada@example.com").await.unwrap();
        assert_eq!(idp.password_resets(), vec!["ada@example.com".to_string()]);
    }
}
