//! Multipart parsing for the attach form.
//!
//! The body is read field by field with its own byte limits. A file over the upload
//! limit is still counted, up to the request cap, but its bytes are dropped, so the
//! size check can report it with the form state intact.

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use dbfile_core::config::FORM_FIELDS_ALLOWANCE_BYTES;
use dbfile_core::models::NewAttachment;
use dbfile_core::{AppError, ControlOptions};
use dbfile_processing::resolve_content_type;
use validator::Validate;

const MAX_FILENAME_LENGTH: usize = 255;

/// Text fields of the attach form.
#[derive(Debug, Default, Validate)]
pub struct AttachFormFields {
    #[validate(length(min = 1, message = "Form state is required"))]
    pub state: String,
    #[validate(length(
        max = 255,
        message = "File description must be at most 255 characters"
    ))]
    pub description: Option<String>,
}

/// A parsed attach form: text fields plus the posted file, if any.
#[derive(Debug)]
pub struct AttachForm {
    pub fields: AttachFormFields,
    pub file: Option<NewAttachment>,
    /// Bytes received for the file when they were not all kept.
    pub received_size: Option<usize>,
}

/// Byte limits applied while reading an attach form.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// File bytes kept; 0 keeps everything up to `read_cap`.
    pub max_upload_size: usize,
    /// File bytes read before the rest of the request is abandoned.
    pub read_cap: usize,
}

impl UploadLimits {
    pub fn from_options(options: &ControlOptions) -> Self {
        Self {
            max_upload_size: options.max_upload_size_bytes,
            read_cap: options.request_body_limit(),
        }
    }

    fn keeps(&self, received: usize) -> bool {
        self.max_upload_size == 0 || received <= self.max_upload_size
    }
}

/// The file part as read from the body.
struct FilePart {
    original_name: String,
    declared_type: Option<String>,
    data: Vec<u8>,
    received: usize,
    cut_off: bool,
}

/// Extract the `state`, `file` and `description` fields from an attach form.
///
/// Only one field named "file" is accepted. A file part with no name and no bytes
/// is what browsers send when nothing was chosen; it counts as no file. Reading stops
/// once the file passes `read_cap`; fields after it are not seen.
pub async fn extract_attach_form(
    mut multipart: Multipart,
    limits: UploadLimits,
) -> Result<AttachForm, AppError> {
    let mut fields = AttachFormFields::default();
    let mut file: Option<FilePart> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" => {
                if file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                let part = read_file_part(field, limits).await?;
                let cut_off = part.cut_off;
                file = Some(part);
                if cut_off {
                    break;
                }
            }
            "state" | "description" => {
                let value = read_text_field(field, &field_name).await?;
                if field_name == "state" {
                    fields.state = value;
                } else {
                    fields.description = Some(value).filter(|d| !d.trim().is_empty());
                }
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
                read_text_field(field, other).await?;
            }
        }
    }

    fields
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let (file, received_size) = match file {
        Some(part) if part.original_name.is_empty() && part.received == 0 => (None, None),
        Some(part) if part.original_name.is_empty() => {
            return Err(AppError::InvalidInput(
                "Uploaded file has no file name".to_string(),
            ))
        }
        Some(part) => {
            let received_size = (part.received > part.data.len()).then_some(part.received);
            let content_type =
                resolve_content_type(&part.original_name, part.declared_type.as_deref());
            let attachment = NewAttachment {
                data: part.data,
                original_name: part.original_name,
                content_type,
                description: fields.description.clone(),
            };
            (Some(attachment), received_size)
        }
        None => (None, None),
    };

    Ok(AttachForm {
        fields,
        file,
        received_size,
    })
}

async fn read_file_part(
    mut field: Field<'_>,
    limits: UploadLimits,
) -> Result<FilePart, AppError> {
    let original_name = field.file_name().map(client_file_name).unwrap_or_default();
    let declared_type = field.content_type().map(|s: &str| s.to_string());
    let mut data = Vec::new();
    let mut received = 0usize;
    let mut cut_off = false;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?
    {
        received = received.saturating_add(chunk.len());
        if limits.keeps(received) {
            data.extend_from_slice(&chunk);
        } else if !data.is_empty() {
            data = Vec::new();
        }
        if received > limits.read_cap {
            cut_off = true;
            break;
        }
    }

    if !limits.keeps(received) {
        tracing::debug!(
            file_name = %original_name,
            received_bytes = received,
            max_upload_size = limits.max_upload_size,
            cut_off = cut_off,
            "Oversize upload discarded"
        );
    }

    Ok(FilePart {
        original_name,
        declared_type,
        data,
        received,
        cut_off,
    })
}

/// Read a text field of at most `FORM_FIELDS_ALLOWANCE_BYTES`.
async fn read_text_field(mut field: Field<'_>, name: &str) -> Result<String, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| {
        AppError::InvalidInput(format!("Failed to read field '{}': {}", name, e))
    })? {
        if bytes.len() + chunk.len() > FORM_FIELDS_ALLOWANCE_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "Field '{}' exceeds {} bytes",
                name, FORM_FIELDS_ALLOWANCE_BYTES
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes)
        .map_err(|_| AppError::InvalidInput(format!("Field '{}' is not valid UTF-8", name)))
}

/// The bare file name a client posted, without any directory part.
///
/// Some browsers send the full local path; only the last segment is kept.
pub fn client_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim()
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_file_name_strips_directories() {
        assert_eq!(client_file_name(r"C:\Users\jdoe\Minutes.PDF"), "Minutes.PDF");
        assert_eq!(client_file_name("/tmp/photo.png"), "photo.png");
        assert_eq!(client_file_name("plain.txt"), "plain.txt");
        assert_eq!(client_file_name(""), "");
    }

    #[test]
    fn client_file_name_is_bounded() {
        let long = format!("{}.pdf", "a".repeat(400));
        assert_eq!(client_file_name(&long).chars().count(), MAX_FILENAME_LENGTH);
    }

    #[test]
    fn upload_limits_keep_bytes_up_to_the_upload_size() {
        let limited = UploadLimits {
            max_upload_size: 1024,
            read_cap: 4096,
        };
        assert!(limited.keeps(1024));
        assert!(!limited.keeps(1025));

        let unlimited = UploadLimits {
            max_upload_size: 0,
            read_cap: 4096,
        };
        assert!(unlimited.keeps(4097));
    }

    #[test]
    fn upload_limits_follow_control_options() {
        let options = ControlOptions {
            max_upload_size_bytes: 1024,
            max_request_body_bytes: 128 * 1024,
            ..ControlOptions::default()
        };
        let limits = UploadLimits::from_options(&options);
        assert_eq!(limits.max_upload_size, 1024);
        assert_eq!(limits.read_cap, 128 * 1024);
    }

    #[test]
    fn form_fields_validation() {
        let missing_state = AttachFormFields::default();
        assert!(missing_state.validate().is_err());

        let long_description = AttachFormFields {
            state: "token".to_string(),
            description: Some("d".repeat(256)),
        };
        assert!(long_description.validate().is_err());

        let ok = AttachFormFields {
            state: "token".to_string(),
            description: Some("Signed agenda".to_string()),
        };
        assert!(ok.validate().is_ok());
    }
}
