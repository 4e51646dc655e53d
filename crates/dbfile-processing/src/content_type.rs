//! Content type resolution for uploaded attachments.

use dbfile_core::models::file_extension;

const OCTET_STREAM: &str = "application/octet-stream";

/// Conventional content type for a lowercase file extension.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let content_type = match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "rtf" => "application/rtf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(content_type)
}

/// Content type to store for an upload.
///
/// A declared type is kept unless it is missing or generic, in which case the type is
/// derived from the file extension.
pub fn resolve_content_type(file_name: &str, declared: Option<&str>) -> String {
    let declared = declared
        .map(|ct| ct.trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && ct != OCTET_STREAM);
    if let Some(ct) = declared {
        return ct;
    }

    match file_extension(file_name)
        .as_deref()
        .and_then(content_type_for_extension)
    {
        Some(ct) => ct.to_string(),
        None => {
            tracing::debug!(
                file_name = %file_name,
                "Unknown extension, storing upload as application/octet-stream"
            );
            OCTET_STREAM.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_kept() {
        assert_eq!(
            resolve_content_type("a.pdf", Some("Application/PDF")),
            "application/pdf"
        );
    }

    #[test]
    fn test_generic_type_replaced_from_extension() {
        assert_eq!(
            resolve_content_type("Minutes.DOCX", Some("application/octet-stream")),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(resolve_content_type("photo.jpeg", None), "image/jpeg");
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(resolve_content_type("data.bin", None), OCTET_STREAM);
        assert_eq!(resolve_content_type("noext", Some("")), OCTET_STREAM);
    }
}
