//! dbfile Database Library
//!
//! PostgreSQL-backed attachment storage. File bytes are kept in `BYTEA` columns of
//! the `file_attachments` table; `attachment_links` records which item owns which
//! attachments. The schema lives in the workspace `migrations/` directory.

pub mod db;

pub use db::PgAttachmentStorage;
