//! Attachment repository: CRUD for file_attachments and attachment_links.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dbfile_core::models::{
    AttachedFile, AttachmentId, AttachmentKind, AttachmentMetadata, AttachmentRecord,
    NewAttachment, FILE_DESCRIPTION_MAX_LENGTH,
};
use dbfile_storage::{AttachmentStorage, StorageError, StorageResult};
use sqlx::{PgPool, Postgres};
use std::time::Instant;

/// Row type for file_attachments without the data column.
#[derive(Debug, sqlx::FromRow)]
pub struct AttachmentMetadataRow {
    pub id: i64,
    pub kind: AttachmentKind,
    pub original_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub description: Option<String>,
    pub modified_by: String,
    pub modified_at: DateTime<Utc>,
}

impl AttachmentMetadataRow {
    pub fn into_metadata(self) -> AttachmentMetadata {
        AttachmentMetadata {
            id: AttachmentId(self.id),
            kind: self.kind,
            original_name: self.original_name,
            content_type: self.content_type,
            file_size: self.file_size,
            description: self.description,
            modified_by: self.modified_by,
            modified_at: self.modified_at,
        }
    }
}

/// Row type for file_attachments including the data column.
#[derive(Debug, sqlx::FromRow)]
pub struct AttachmentRecordRow {
    #[sqlx(flatten)]
    pub metadata: AttachmentMetadataRow,
    pub data: Vec<u8>,
}

#[derive(Debug, sqlx::FromRow)]
struct AttachedFileRow {
    id: i64,
    original_name: String,
}

const METADATA_COLUMNS: &str =
    "id, kind, original_name, content_type, file_size, description, modified_by, modified_at";

fn backend_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StorageError {
    move |e| {
        tracing::error!(error = %e, operation = operation, "Attachment query failed");
        StorageError::BackendError(format!("{} failed: {}", operation, e))
    }
}

/// Attachment storage for one kind, backed by PostgreSQL.
#[derive(Clone)]
pub struct PgAttachmentStorage {
    pool: PgPool,
    kind: AttachmentKind,
}

impl PgAttachmentStorage {
    pub fn new(pool: PgPool, kind: AttachmentKind) -> Self {
        Self { pool, kind }
    }
}

#[async_trait]
impl AttachmentStorage for PgAttachmentStorage {
    fn kind(&self) -> AttachmentKind {
        self.kind
    }

    #[tracing::instrument(skip(self, file), fields(db.table = "file_attachments", kind = %self.kind, size_bytes = file.data.len()))]
    async fn save(&self, file: NewAttachment, modified_by: &str) -> StorageResult<AttachmentId> {
        let start = Instant::now();
        if file.original_name.is_empty() {
            return Err(StorageError::InvalidRecord(
                "Original file name is required".to_string(),
            ));
        }
        let description: Option<String> = file
            .description
            .map(|d| d.chars().take(FILE_DESCRIPTION_MAX_LENGTH).collect())
            .filter(|d: &String| !d.is_empty());
        let file_size = file.data.len() as i64;

        let id: i64 = sqlx::query_scalar::<Postgres, i64>(
            r#"
            INSERT INTO file_attachments
                (kind, original_name, content_type, file_size, data, description, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(self.kind)
        .bind(&file.original_name)
        .bind(&file.content_type)
        .bind(file_size)
        .bind(&file.data)
        .bind(&description)
        .bind(modified_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::SaveFailed(e.to_string()))?;

        tracing::info!(
            file_id = id,
            size_bytes = file_size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Attachment saved"
        );

        Ok(AttachmentId(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_attachments", db.record_id = %id))]
    async fn delete(&self, id: AttachmentId, linked_item_id: i64) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        if linked_item_id > 0 {
            sqlx::query(
                "DELETE FROM attachment_links WHERE linked_item_id = $1 AND attachment_id = $2",
            )
            .bind(linked_item_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;
        }

        // Remaining links go with the record through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM file_attachments WHERE id = $1 AND kind = $2")
            .bind(id)
            .bind(self.kind)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        tracing::info!(
            linked_item_id = linked_item_id,
            rows_affected = result.rows_affected(),
            "Attachment deleted"
        );

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_attachments", db.record_id = %id))]
    async fn fetch_metadata(&self, id: AttachmentId) -> StorageResult<AttachmentMetadata> {
        let row: Option<AttachmentMetadataRow> =
            sqlx::query_as::<Postgres, AttachmentMetadataRow>(&format!(
                "SELECT {} FROM file_attachments WHERE id = $1 AND kind = $2",
                METADATA_COLUMNS
            ))
            .bind(id)
            .bind(self.kind)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error("fetch_metadata"))?;

        row.map(AttachmentMetadataRow::into_metadata)
            .ok_or(StorageError::NotFound(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_attachments", db.record_id = %id))]
    async fn fetch_full(&self, id: AttachmentId) -> StorageResult<AttachmentRecord> {
        let row: Option<AttachmentRecordRow> =
            sqlx::query_as::<Postgres, AttachmentRecordRow>(&format!(
                "SELECT {}, data FROM file_attachments WHERE id = $1 AND kind = $2",
                METADATA_COLUMNS
            ))
            .bind(id)
            .bind(self.kind)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_error("fetch_full"))?;

        row.map(|r| AttachmentRecord {
            metadata: r.metadata.into_metadata(),
            data: r.data,
        })
        .ok_or(StorageError::NotFound(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "attachment_links"))]
    async fn list_linked(&self, linked_item_id: i64) -> StorageResult<Vec<AttachedFile>> {
        let rows: Vec<AttachedFileRow> = sqlx::query_as::<Postgres, AttachedFileRow>(
            r#"
            SELECT a.id, a.original_name
            FROM attachment_links l
            JOIN file_attachments a ON a.id = l.attachment_id
            WHERE l.linked_item_id = $1 AND a.kind = $2
            ORDER BY a.id
            "#,
        )
        .bind(linked_item_id)
        .bind(self.kind)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error("list_linked"))?;

        Ok(rows
            .into_iter()
            .map(|r| AttachedFile {
                id: AttachmentId(r.id),
                name: r.original_name,
            })
            .collect())
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "attachment_links", count = ids.len()))]
    async fn link(&self, linked_item_id: i64, ids: &[AttachmentId]) -> StorageResult<()> {
        let raw_ids: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let mut tx = self.pool.begin().await.map_err(backend_error("link"))?;

        let known: Vec<i64> = sqlx::query_scalar::<Postgres, i64>(
            "SELECT id FROM file_attachments WHERE id = ANY($1) AND kind = $2",
        )
        .bind(&raw_ids)
        .bind(self.kind)
        .fetch_all(&mut *tx)
        .await
        .map_err(backend_error("link"))?;
        if let Some(missing) = raw_ids.iter().find(|id| !known.contains(id)) {
            return Err(StorageError::NotFound(AttachmentId(*missing)));
        }

        // Only this kind's links are replaced; the item may also own attachments of the other kind.
        sqlx::query(
            r#"
            DELETE FROM attachment_links l
            USING file_attachments a
            WHERE l.attachment_id = a.id AND l.linked_item_id = $1 AND a.kind = $2
            "#,
        )
        .bind(linked_item_id)
        .bind(self.kind)
        .execute(&mut *tx)
        .await
        .map_err(backend_error("link"))?;

        sqlx::query(
            r#"
            INSERT INTO attachment_links (linked_item_id, attachment_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(linked_item_id)
        .bind(&raw_ids)
        .execute(&mut *tx)
        .await
        .map_err(backend_error("link"))?;

        tx.commit().await.map_err(backend_error("link"))?;
        Ok(())
    }
}
