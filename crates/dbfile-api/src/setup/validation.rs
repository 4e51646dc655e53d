//! Configuration validation
//!
//! Checks run at startup on top of `Config::validate`, to fail fast on deployments
//! that would start but misbehave.

use anyhow::Result;
use dbfile_core::models::AttachmentKind;
use dbfile_core::{Config, StorageBackend};

/// Validate critical configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let is_production = config.is_production();

    if is_production && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production - \
            set specific allowed origins via CORS_ORIGINS"
        ));
    }

    match config.storage_backend() {
        StorageBackend::Postgres => {
            if config.db_max_connections() == 0 {
                return Err(anyhow::anyhow!("Database max connections cannot be 0"));
            }
            if config.db_timeout_seconds() == 0 {
                return Err(anyhow::anyhow!("Database timeout cannot be 0"));
            }
        }
        StorageBackend::Memory if is_production => {
            return Err(anyhow::anyhow!(
                "The memory storage backend loses every file on restart and cannot be used in production"
            ));
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory attachment storage; files are lost on restart");
        }
    }

    let control = config.control();
    if control.max_files == 0 {
        tracing::warn!("MAX_FILES is 0 - attachment fields will not accept any file");
    }
    if control.max_upload_size_bytes == 0 {
        tracing::warn!("MAX_UPLOAD_SIZE_BYTES is 0 - upload size is not limited");
    }
    for kind in [AttachmentKind::Image, AttachmentKind::Document] {
        if control.allowed_formats(kind).is_empty() {
            tracing::warn!(kind = %kind, "No allowed formats configured - every upload will be rejected");
        }
        if config.settings().handler_url_template(kind).is_none() {
            tracing::warn!(kind = %kind, "No handler URL template configured - attachments render without links");
        }
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}
