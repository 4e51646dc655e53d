//! dbfile Storage Library
//!
//! The storage collaborator interface used by the attachment control, plus an
//! in-process backend. A backend instance is bound to one attachment kind and only
//! ever returns records of that kind.

#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

pub use dbfile_core::models::AttachmentKind;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryAttachmentStorage;
pub use traits::{AttachmentStorage, StorageError, StorageResult};
