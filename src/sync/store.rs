use std::path::PathBuf;

use crate::io::lock::LockError;
use crate::model::{Group, ListId, RawDocument};

/// Error type for document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("list not found: {0}")]
    NotFound(ListId),
    #[error("invalid list id: {0:?}")]
    InvalidId(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize list: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// The shared, multi-client store holding list documents.
///
/// The store is last-writer-wins: `commit` replaces the whole children tree
/// of a document. Implementations use interior mutability so several
/// clients can hold handles to the same store.
pub trait DocumentStore {
    /// Read a document. `Ok(None)` means it has not been created yet.
    fn fetch(&self, id: &str) -> Result<Option<RawDocument>, StoreError>;

    /// Create a document for the widget instance `instance_key`. Creating
    /// again for the same instance returns the existing document's id.
    fn create(&self, instance_key: &str, title: &str, groups: &[Group]) -> Result<ListId, StoreError>;

    /// Replace the document's groups.
    fn commit(&self, id: &str, groups: &[Group]) -> Result<(), StoreError>;

    fn rename(&self, id: &str, title: &str) -> Result<(), StoreError>;

    /// Ids of every stored document.
    fn list_ids(&self) -> Result<Vec<ListId>, StoreError>;
}
