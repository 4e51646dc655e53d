//! Storage setup and initialization

use anyhow::Result;
use dbfile_core::models::AttachmentKind;
use dbfile_core::{Config, StorageBackend};
use dbfile_db::PgAttachmentStorage;
use dbfile_services::MemoryAttachmentStorage;
use sqlx::PgPool;
use std::sync::Arc;

use crate::state::AttachmentBackends;

/// Create the image and document backends for the configured storage backend.
///
/// The postgres backend needs the pool created by `setup_database`.
pub fn setup_storage(config: &Config, pool: Option<&PgPool>) -> Result<AttachmentBackends> {
    let backend = config.storage_backend();
    tracing::info!(backend = %backend, "Initializing attachment storage...");

    let backends = match backend {
        StorageBackend::Postgres => {
            let pool = pool.ok_or_else(|| {
                anyhow::anyhow!("A database pool is required for the postgres storage backend")
            })?;
            AttachmentBackends {
                images: Arc::new(PgAttachmentStorage::new(pool.clone(), AttachmentKind::Image)),
                documents: Arc::new(PgAttachmentStorage::new(
                    pool.clone(),
                    AttachmentKind::Document,
                )),
            }
        }
        StorageBackend::Memory => memory_backends(),
    };

    tracing::info!(backend = %backend, "Attachment storage initialized successfully");
    Ok(backends)
}

/// In-process backends for both kinds.
pub fn memory_backends() -> AttachmentBackends {
    AttachmentBackends {
        images: Arc::new(MemoryAttachmentStorage::new(AttachmentKind::Image)),
        documents: Arc::new(MemoryAttachmentStorage::new(AttachmentKind::Document)),
    }
}
