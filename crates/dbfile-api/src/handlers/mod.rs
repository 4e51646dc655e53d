pub mod attachment_form;
pub mod file_download;

use dbfile_core::models::AttachmentKind;
use dbfile_core::AppError;

/// Attachment kind named by a `{kind}` path segment.
pub(crate) fn parse_kind(raw: &str) -> Result<AttachmentKind, AppError> {
    raw.parse::<AttachmentKind>()
        .map_err(|_| AppError::NotFound(format!("No attachment field of kind '{}'", raw)))
}
