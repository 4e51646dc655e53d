use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Longest description accepted alongside an uploaded file.
pub const FILE_DESCRIPTION_MAX_LENGTH: usize = 255;

/// Attachment kind (matches database enum)
///
/// A control instance and its storage backend are bound to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "attachment_kind", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Document => "document",
        }
    }

    /// Noun used in user-facing messages when no reference is configured.
    pub fn default_reference(&self) -> &'static str {
        self.as_str()
    }
}

impl Display for AttachmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttachmentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" | "images" => Ok(AttachmentKind::Image),
            "document" | "documents" | "file" | "files" => Ok(AttachmentKind::Document),
            _ => Err(anyhow::anyhow!("Invalid attachment kind: {}", s)),
        }
    }
}

/// Identifier of a stored attachment record. Only positive ids refer to a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct AttachmentId(pub i64);

impl AttachmentId {
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl Display for AttachmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AttachmentId {
    fn from(id: i64) -> Self {
        AttachmentId(id)
    }
}

/// The `(id, name)` pair a slot holds for an attached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttachedFile {
    pub id: AttachmentId,
    pub name: String,
}

impl AttachedFile {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: AttachmentId(id),
            name: name.into(),
        }
    }
}

/// A file submitted for storage.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub data: Vec<u8>,
    pub original_name: String,
    pub content_type: String,
    pub description: Option<String>,
}

impl NewAttachment {
    pub fn file_size(&self) -> usize {
        self.data.len()
    }

    pub fn extension(&self) -> Option<String> {
        file_extension(&self.original_name)
    }
}

/// Stored record without its bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttachmentMetadata {
    pub id: AttachmentId,
    pub kind: AttachmentKind,
    pub original_name: String,
    pub content_type: String,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub modified_by: String,
    pub modified_at: DateTime<Utc>,
}

impl AttachmentMetadata {
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.original_name)
    }

    /// Extension as shown next to the file link, e.g. `.PDF`.
    pub fn display_extension(&self) -> Option<String> {
        display_extension(&self.original_name)
    }
}

/// Stored record including the file bytes.
#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    pub metadata: AttachmentMetadata,
    pub data: Vec<u8>,
}

/// Lowercased extension of `name` without the leading dot.
pub fn file_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.contains(['/', '\\']) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Extension of `name` with its leading dot and original case.
pub fn display_extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.contains(['/', '\\']) {
        return None;
    }
    Some(format!(".{}", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("Image".parse::<AttachmentKind>().unwrap(), AttachmentKind::Image);
        assert_eq!(
            "documents".parse::<AttachmentKind>().unwrap(),
            AttachmentKind::Document
        );
        assert!("video".parse::<AttachmentKind>().is_err());
    }

    #[test]
    fn test_attachment_id_validity() {
        assert!(AttachmentId(1).is_valid());
        assert!(!AttachmentId(0).is_valid());
        assert!(!AttachmentId(-5).is_valid());
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("Report.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension(".htaccess"), Some("htaccess".to_string()));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("trailing."), None);
        assert_eq!(file_extension("dir.d/file"), None);
    }

    #[test]
    fn test_display_extension_keeps_dot_and_case() {
        assert_eq!(display_extension("Report.PDF"), Some(".PDF".to_string()));
        assert_eq!(display_extension("archive.tar.gz"), Some(".gz".to_string()));
        assert_eq!(display_extension("README"), None);
        assert_eq!(display_extension("trailing."), None);
        assert_eq!(display_extension("dir.d/file"), None);
    }

    #[test]
    fn test_attachment_id_serializes_as_number() {
        let json = serde_json::to_string(&AttachedFile::new(7, "a.png")).unwrap();
        assert_eq!(json, r#"{"id":7,"name":"a.png"}"#);
    }
}
