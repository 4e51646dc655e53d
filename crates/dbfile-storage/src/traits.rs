//! Storage collaborator trait
//!
//! Every attachment backend implements `AttachmentStorage`. The attachment control
//! depends only on this trait, so image and document storage (and the in-memory
//! backend used in tests) are interchangeable.

use async_trait::async_trait;
use dbfile_core::models::{
    AttachedFile, AttachmentId, AttachmentKind, AttachmentMetadata, AttachmentRecord,
    NewAttachment,
};
use dbfile_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Save failed: {0}")]
    SaveFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(AttachmentId),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => AppError::NotFound(format!("File {} not found", id)),
            StorageError::InvalidRecord(msg) => AppError::InvalidInput(msg),
            StorageError::SaveFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::BackendError(msg) => AppError::Storage(msg),
        }
    }
}

/// Persistence for attachment records of a single kind.
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    /// Kind of record this backend stores.
    fn kind(&self) -> AttachmentKind;

    /// Persist a new file and return the id of its record.
    async fn save(&self, file: NewAttachment, modified_by: &str) -> StorageResult<AttachmentId>;

    /// Remove a record and its link to `linked_item_id`.
    ///
    /// A linked item id of 0 means the owning record is unknown; only the
    /// attachment itself is removed.
    async fn delete(&self, id: AttachmentId, linked_item_id: i64) -> StorageResult<()>;

    /// Record details without the file bytes.
    async fn fetch_metadata(&self, id: AttachmentId) -> StorageResult<AttachmentMetadata>;

    /// Record details including the file bytes.
    async fn fetch_full(&self, id: AttachmentId) -> StorageResult<AttachmentRecord>;

    /// Attachments currently linked to an item, in id order.
    async fn list_linked(&self, linked_item_id: i64) -> StorageResult<Vec<AttachedFile>>;

    /// Replace the set of attachments linked to an item.
    async fn link(&self, linked_item_id: i64, ids: &[AttachmentId]) -> StorageResult<()>;
}
