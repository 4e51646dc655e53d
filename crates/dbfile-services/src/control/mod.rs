//! The attachment control for a single form field.
//!
//! An `AttachmentControl` owns the `SlotStore` of one form session. Commands
//! (`handle_attach`, `handle_detach`) mutate it; `materialize` reads it once per
//! render. The store itself is carried between requests by the caller.

mod attach;
mod detach;
mod render;

use std::sync::Arc;

use dbfile_core::models::{AttachmentKind, SlotStore};
use dbfile_core::{AppError, Config};
use dbfile_processing::{file_count_message, ValidationGate};
use dbfile_storage::AttachmentStorage;

pub use attach::{AttachOutcome, AttachRequest};
pub use detach::{parse_remove_action, resolve_linked_item, DetachOutcome};

/// Everything that stays fixed for a field across sessions.
#[derive(Debug, Clone)]
pub struct AttachmentFieldConfig {
    pub kind: AttachmentKind,
    pub project_name: String,
    pub max_files: usize,
    /// 0 disables the size check.
    pub max_upload_size: usize,
    pub allowed_formats: Vec<String>,
    /// Noun used in messages ("image", "document", "photo" ...).
    pub attachment_reference: String,
    pub count_message_template: Option<String>,
    pub handler_url_template: Option<String>,
    /// Label shown next to the upload box.
    pub field_label: Option<String>,
}

impl AttachmentFieldConfig {
    pub fn from_config(config: &Config, kind: AttachmentKind) -> Self {
        let options = config.control();
        let settings = config.settings();
        Self {
            kind,
            project_name: options.project_name.clone(),
            max_files: options.max_files,
            max_upload_size: options.max_upload_size_bytes,
            allowed_formats: options.allowed_formats(kind).to_vec(),
            attachment_reference: options.attachment_reference(kind).to_string(),
            count_message_template: settings.upload_count_message_template().map(String::from),
            handler_url_template: settings.handler_url_template(kind).map(String::from),
            field_label: settings.file_edit_prompt().map(String::from),
        }
    }

    pub fn validation_gate(&self) -> ValidationGate {
        let message = file_count_message(
            self.count_message_template.as_deref(),
            self.max_files,
            &self.attachment_reference,
        );
        ValidationGate::new(self.max_upload_size, &self.allowed_formats, message)
    }
}

pub struct AttachmentControl {
    field: Arc<AttachmentFieldConfig>,
    storage: Arc<dyn AttachmentStorage>,
    gate: ValidationGate,
    slots: SlotStore,
}

impl AttachmentControl {
    /// Start a session with every slot empty.
    pub fn new(
        field: Arc<AttachmentFieldConfig>,
        storage: Arc<dyn AttachmentStorage>,
    ) -> Result<Self, AppError> {
        let slots = SlotStore::new(field.max_files);
        Self::with_slots(field, storage, slots)
    }

    /// Resume a session from slots carried over from the previous request.
    pub fn with_slots(
        field: Arc<AttachmentFieldConfig>,
        storage: Arc<dyn AttachmentStorage>,
        slots: SlotStore,
    ) -> Result<Self, AppError> {
        if storage.kind() != field.kind {
            return Err(AppError::Internal(format!(
                "{} field wired to {} storage",
                field.kind,
                storage.kind()
            )));
        }
        if slots.capacity() != field.max_files {
            return Err(AppError::InvalidFormState(format!(
                "expected {} slot(s), found {}",
                field.max_files,
                slots.capacity()
            )));
        }
        let gate = field.validation_gate();
        Ok(Self {
            field,
            storage,
            gate,
            slots,
        })
    }

    pub fn kind(&self) -> AttachmentKind {
        self.field.kind
    }

    pub fn field(&self) -> &AttachmentFieldConfig {
        &self.field
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn into_slots(self) -> SlotStore {
        self.slots
    }

    pub fn gate(&self) -> &ValidationGate {
        &self.gate
    }

    /// Fill a fresh session with the attachments already linked to an item.
    ///
    /// Ids of 0 or less mean no item yet; the session stays empty.
    #[tracing::instrument(skip(self), fields(kind = %self.field.kind))]
    pub async fn load_linked(&mut self, linked_item_id: i64) -> Result<(), AppError> {
        if linked_item_id <= 0 {
            return Ok(());
        }
        let existing = self.storage.list_linked(linked_item_id).await?;
        let available = existing.len();
        self.slots.populate_from(existing);

        if available > self.slots.occupied_count() {
            tracing::warn!(
                linked_item_id = linked_item_id,
                available = available,
                max_files = self.field.max_files,
                "Linked item has more attachments than the field can show"
            );
        }
        Ok(())
    }

    /// Link the files in the occupied slots to an item, replacing any earlier set.
    #[tracing::instrument(skip(self), fields(kind = %self.field.kind))]
    pub async fn commit(&self, linked_item_id: i64) -> Result<(), AppError> {
        if linked_item_id <= 0 {
            return Err(AppError::BadRequest(format!(
                "Linked item id must be positive, got {}",
                linked_item_id
            )));
        }
        let ids = self.slots.file_ids();
        self.storage.link(linked_item_id, &ids).await?;
        tracing::info!(
            linked_item_id = linked_item_id,
            file_count = ids.len(),
            "Attachments linked to item"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use dbfile_core::models::{
        AttachedFile, AttachmentId, AttachmentMetadata, AttachmentRecord, NewAttachment,
    };
    use dbfile_storage::{MemoryAttachmentStorage, StorageError, StorageResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub fn field(kind: AttachmentKind, max_files: usize) -> Arc<AttachmentFieldConfig> {
        Arc::new(AttachmentFieldConfig {
            kind,
            project_name: "events".to_string(),
            max_files,
            max_upload_size: 1024,
            allowed_formats: vec!["pdf".to_string(), "png".to_string()],
            attachment_reference: kind.default_reference().to_string(),
            count_message_template: Some("No more than {0} {1}".to_string()),
            handler_url_template: Some("/{0}/file.ashx?file={1}".to_string()),
            field_label: Some("Attach a file".to_string()),
        })
    }

    /// Memory storage whose calls can be made to fail, counting each call.
    pub struct FlakyStorage {
        pub inner: MemoryAttachmentStorage,
        pub fail_save: bool,
        pub fail_delete: bool,
        pub fail_fetch: bool,
        pub saved_id_override: Option<AttachmentId>,
        pub calls: AtomicUsize,
    }

    impl FlakyStorage {
        pub fn new(kind: AttachmentKind) -> Self {
            Self {
                inner: MemoryAttachmentStorage::new(kind),
                fail_save: false,
                fail_delete: false,
                fail_fetch: false,
                saved_id_override: None,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn tick(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AttachmentStorage for FlakyStorage {
        fn kind(&self) -> AttachmentKind {
            self.inner.kind()
        }

        async fn save(&self, file: NewAttachment, modified_by: &str) -> StorageResult<AttachmentId> {
            self.tick();
            if self.fail_save {
                return Err(StorageError::SaveFailed("disk full".to_string()));
            }
            let id = self.inner.save(file, modified_by).await?;
            Ok(self.saved_id_override.unwrap_or(id))
        }

        async fn delete(&self, id: AttachmentId, linked_item_id: i64) -> StorageResult<()> {
            self.tick();
            if self.fail_delete {
                return Err(StorageError::DeleteFailed("locked".to_string()));
            }
            self.inner.delete(id, linked_item_id).await
        }

        async fn fetch_metadata(&self, id: AttachmentId) -> StorageResult<AttachmentMetadata> {
            self.tick();
            if self.fail_fetch {
                return Err(StorageError::BackendError("timeout".to_string()));
            }
            self.inner.fetch_metadata(id).await
        }

        async fn fetch_full(&self, id: AttachmentId) -> StorageResult<AttachmentRecord> {
            self.tick();
            self.inner.fetch_full(id).await
        }

        async fn list_linked(&self, linked_item_id: i64) -> StorageResult<Vec<AttachedFile>> {
            self.tick();
            self.inner.list_linked(linked_item_id).await
        }

        async fn link(&self, linked_item_id: i64, ids: &[AttachmentId]) -> StorageResult<()> {
            self.tick();
            self.inner.link(linked_item_id, ids).await
        }
    }

    pub fn pdf(name: &str, len: usize) -> NewAttachment {
        NewAttachment {
            data: vec![b'%'; len],
            original_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            description: None,
        }
    }
}
