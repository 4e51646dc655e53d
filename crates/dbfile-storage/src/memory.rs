use crate::traits::{AttachmentStorage, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use dbfile_core::models::{
    AttachedFile, AttachmentId, AttachmentKind, AttachmentMetadata, AttachmentRecord,
    NewAttachment, FILE_DESCRIPTION_MAX_LENGTH,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    records: BTreeMap<AttachmentId, AttachmentRecord>,
    links: HashMap<i64, BTreeSet<AttachmentId>>,
}

/// In-process attachment storage
///
/// Records live for the lifetime of the process. Clones share the same state.
#[derive(Clone)]
pub struct MemoryAttachmentStorage {
    kind: AttachmentKind,
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryAttachmentStorage {
    pub fn new(kind: AttachmentKind) -> Self {
        Self {
            kind,
            state: Arc::new(RwLock::new(MemoryState::default())),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AttachmentStorage for MemoryAttachmentStorage {
    fn kind(&self) -> AttachmentKind {
        self.kind
    }

    async fn save(&self, file: NewAttachment, modified_by: &str) -> StorageResult<AttachmentId> {
        let start = Instant::now();

        if file.original_name.is_empty() {
            return Err(StorageError::InvalidRecord(
                "Original file name is required".to_string(),
            ));
        }
        let description = file
            .description
            .map(|d| d.chars().take(FILE_DESCRIPTION_MAX_LENGTH).collect::<String>())
            .filter(|d| !d.is_empty());

        let size = file.data.len();
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = AttachmentId(state.next_id);

        let metadata = AttachmentMetadata {
            id,
            kind: self.kind,
            original_name: file.original_name,
            content_type: file.content_type,
            file_size: size as i64,
            description,
            modified_by: modified_by.to_string(),
            modified_at: Utc::now(),
        };
        state.records.insert(
            id,
            AttachmentRecord {
                metadata,
                data: file.data,
            },
        );

        tracing::info!(
            file_id = %id,
            kind = %self.kind,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Memory storage save successful"
        );

        Ok(id)
    }

    async fn delete(&self, id: AttachmentId, linked_item_id: i64) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let removed = state.records.remove(&id).is_some();

        // A deleted record must not stay linked anywhere, whichever item was named.
        for linked in state.links.values_mut() {
            linked.remove(&id);
        }

        tracing::info!(
            file_id = %id,
            linked_item_id = linked_item_id,
            removed = removed,
            "Memory storage delete"
        );

        Ok(())
    }

    async fn fetch_metadata(&self, id: AttachmentId) -> StorageResult<AttachmentMetadata> {
        let state = self.state.read().await;
        state
            .records
            .get(&id)
            .map(|record| record.metadata.clone())
            .ok_or(StorageError::NotFound(id))
    }

    async fn fetch_full(&self, id: AttachmentId) -> StorageResult<AttachmentRecord> {
        let state = self.state.read().await;
        state
            .records
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound(id))
    }

    async fn list_linked(&self, linked_item_id: i64) -> StorageResult<Vec<AttachedFile>> {
        let state = self.state.read().await;
        let Some(linked) = state.links.get(&linked_item_id) else {
            return Ok(Vec::new());
        };
        Ok(linked
            .iter()
            .filter_map(|id| state.records.get(id))
            .map(|record| AttachedFile {
                id: record.metadata.id,
                name: record.metadata.original_name.clone(),
            })
            .collect())
    }

    async fn link(&self, linked_item_id: i64, ids: &[AttachmentId]) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if let Some(missing) = ids.iter().find(|id| !state.records.contains_key(id)) {
            return Err(StorageError::NotFound(*missing));
        }
        state
            .links
            .insert(linked_item_id, ids.iter().copied().collect());

        tracing::debug!(
            linked_item_id = linked_item_id,
            file_count = ids.len(),
            "Memory storage link updated"
        );

        Ok(())
    }
}
