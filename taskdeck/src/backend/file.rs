//! JSON-file-backed [`DocumentStore`].
//!
//! The whole store is one JSON object of `collection -> id -> document`,
//! rewritten after every mutation. Each mutation is applied to a copy of the
//! current state and only swapped in once the file write succeeds, so a
//! failed write leaves both the file and memory untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use taskdeck_model::document::{Document, DocumentId, FieldValue};

use super::memory::{Collection, merge_into, new_document_id, query_collection};
use super::{DocumentStore, StoreError};

/// Default file name inside the data directory.
pub const DOCUMENTS_FILE: &str = "documents.json";

/// On-disk layout.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Snapshot {
    collections: HashMap<String, Collection>,
}

/// Document store persisted to a single JSON file.
pub struct FileDocumentStore {
    path: PathBuf,
    state: Mutex<Snapshot>,
}

impl FileDocumentStore {
    /// Opens the store at `path`, creating an empty one if the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadFailed`] if the file exists but cannot be
    /// read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StoreError::ReadFailed(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => {
                return Err(StoreError::ReadFailed(format!("{}: {e}", path.display())));
            }
        };
        tracing::debug!(path = %path.display(), "opened document store");
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", parent.display())))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", self.path.display())))
    }

    /// Applies `mutate` to a copy of the state, persists it, then commits.
    async fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut Snapshot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let out = mutate(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(out)
    }
}

impl DocumentStore for FileDocumentStore {
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &FieldValue,
    ) -> Result<Vec<(DocumentId, Document)>, StoreError> {
        let state = self.state.lock().await;
        Ok(query_collection(
            state.collections.get(collection),
            field,
            value,
        ))
    }

    async fn insert(&self, collection: &str, record: Document) -> Result<DocumentId, StoreError> {
        let id = new_document_id();
        let key = id.clone();
        self.mutate(move |s| {
            s.collections
                .entry(collection.to_string())
                .or_default()
                .insert(key, record);
            Ok(())
        })
        .await?;
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError> {
        self.mutate(|s| merge_into(s.collections.get_mut(collection), collection, id, fields))
            .await
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        self.mutate(|s| {
            if let Some(docs) = s.collections.get_mut(collection) {
                docs.remove(id);
            }
            Ok(())
        })
        .await
    }
}
