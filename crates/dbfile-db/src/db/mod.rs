//! Database repositories for attachment records.

pub mod attachment;

pub use attachment::PgAttachmentStorage;
