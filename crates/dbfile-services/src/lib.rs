//! dbfile Services Layer
//!
//! Hosts the attachment control: the slot state of one form session, the attach
//! and detach commands that mutate it, and the render pass that turns it into
//! display descriptors. The API crate depends on this crate as its single facade
//! over storage and validation.

pub mod control;

pub use control::{
    parse_remove_action, resolve_linked_item, AttachOutcome, AttachRequest, AttachmentControl,
    AttachmentFieldConfig, DetachOutcome,
};
pub use dbfile_processing::{ValidationError, ValidationGate, ValidationReport};
pub use dbfile_storage::{AttachmentStorage, StorageError, StorageResult};
#[cfg(feature = "storage-memory")]
pub use dbfile_storage::MemoryAttachmentStorage;
