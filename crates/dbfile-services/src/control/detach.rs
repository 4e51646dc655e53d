use std::collections::HashMap;

use dbfile_core::models::{AttachmentId, REMOVE_ACTION_PREFIX};
use dbfile_core::AppError;

use super::AttachmentControl;

/// What a detach did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetachOutcome {
    pub slot: usize,
    pub file_id: AttachmentId,
}

/// Slot index named by a remove action: `removeFile_<n>` or a bare `<n>`.
pub fn parse_remove_action(action: &str) -> Result<i64, AppError> {
    let raw = action.strip_prefix(REMOVE_ACTION_PREFIX).unwrap_or(action);
    raw.trim().parse::<i64>().map_err(|_| {
        AppError::BadRequest(format!(
            "Could not identify the file to remove from action '{}'",
            action
        ))
    })
}

/// Linked item id from request parameters; missing or unparsable values give 0.
pub fn resolve_linked_item(params: &HashMap<String, String>, name: &str) -> i64 {
    params
        .get(name)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

impl AttachmentControl {
    /// Delete the file shown in slot `index` and clear it from the session.
    ///
    /// The slot is cleared even when storage reports a failed delete; that failure
    /// is logged, not returned.
    #[tracing::instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn handle_detach(
        &mut self,
        index: i64,
        linked_item_id: i64,
    ) -> Result<DetachOutcome, AppError> {
        let max_files = self.slots.capacity();
        let slot = usize::try_from(index)
            .ok()
            .filter(|i| *i < max_files)
            .ok_or(AppError::InvalidSlotIndex { index, max_files })?;

        let file_id = self
            .slots
            .file_at(slot)
            .map(|file| file.id)
            .ok_or_else(|| AppError::BadRequest(format!("Slot {} holds no file", slot)))?;

        if let Err(e) = self.storage.delete(file_id, linked_item_id).await {
            tracing::warn!(
                error = %e,
                file_id = %file_id,
                slot_index = slot,
                "Storage delete failed, clearing slot anyway"
            );
        }
        self.slots.remove_by_id(file_id);

        tracing::info!(
            file_id = %file_id,
            slot_index = slot,
            linked_item_id = linked_item_id,
            "File detached"
        );

        Ok(DetachOutcome { slot, file_id })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use dbfile_core::models::{AttachmentKind, SlotStore};
    use dbfile_storage::AttachmentStorage;
    use std::sync::Arc;

    #[test]
    fn test_parse_remove_action() {
        assert_eq!(parse_remove_action("removeFile_2").unwrap(), 2);
        assert_eq!(parse_remove_action("0").unwrap(), 0);
        assert_eq!(parse_remove_action("removeFile_-1").unwrap(), -1);
        assert!(matches!(
            parse_remove_action("removeFile_x"),
            Err(AppError::BadRequest(_))
        ));
        assert!(parse_remove_action("addFile").is_err());
    }

    #[test]
    fn test_resolve_linked_item_is_best_effort() {
        let mut params = HashMap::new();
        assert_eq!(resolve_linked_item(&params, "item"), 0);
        params.insert("item".to_string(), "abc".to_string());
        assert_eq!(resolve_linked_item(&params, "item"), 0);
        params.insert("item".to_string(), " 314 ".to_string());
        assert_eq!(resolve_linked_item(&params, "item"), 314);
    }

    async fn control_with_file(
        storage: Arc<FlakyStorage>,
    ) -> (AttachmentControl, AttachmentId) {
        let id = storage.inner.save(pdf("a.pdf", 3), "u").await.unwrap();
        let mut slots = SlotStore::new(3);
        slots.add(AttachmentId(900), "other.pdf");
        slots.add(id, "a.pdf");
        let control =
            AttachmentControl::with_slots(field(AttachmentKind::Document, 3), storage, slots)
                .unwrap();
        (control, id)
    }

    #[tokio::test]
    async fn test_detach_deletes_and_clears_slot() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let (mut control, id) = control_with_file(storage.clone()).await;

        let outcome = control.handle_detach(1, 12).await.unwrap();
        assert_eq!(outcome, DetachOutcome { slot: 1, file_id: id });
        assert!(!control.slots().contains(id));
        assert_eq!(control.slots().occupied_count(), 1);
        assert!(storage.inner.fetch_metadata(id).await.is_err());
    }

    #[tokio::test]
    async fn test_detach_clears_slot_when_delete_fails() {
        let mut flaky = FlakyStorage::new(AttachmentKind::Document);
        flaky.fail_delete = true;
        let storage = Arc::new(flaky);
        let (mut control, id) = control_with_file(storage.clone()).await;

        control.handle_detach(1, 0).await.unwrap();
        assert!(!control.slots().contains(id));
        // The record itself survives the failed delete.
        assert!(storage.inner.fetch_metadata(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_fatal() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let (mut control, _) = control_with_file(storage.clone()).await;
        let calls_before = storage.calls();

        for index in [-1, 3, 99] {
            let err = control.handle_detach(index, 0).await.unwrap_err();
            assert!(matches!(
                err,
                AppError::InvalidSlotIndex { max_files: 3, .. }
            ));
        }
        assert_eq!(storage.calls(), calls_before);
        assert_eq!(control.slots().occupied_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_slot_is_rejected() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let (mut control, _) = control_with_file(storage).await;
        assert!(matches!(
            control.handle_detach(2, 0).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
