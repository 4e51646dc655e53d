use dbfile_core::models::{AttachmentId, NewAttachment};
use dbfile_core::AppError;
use dbfile_processing::{UploadCandidate, ValidationReport};

use super::AttachmentControl;

/// A submitted "add" action.
#[derive(Debug, Clone)]
pub struct AttachRequest {
    /// The posted file, if the browser sent one.
    pub file: Option<NewAttachment>,
    /// Bytes received for the file when its data was dropped while reading.
    pub received_size: Option<usize>,
    /// User to record as the last modifier.
    pub modified_by: String,
}

/// What an attach did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The file was stored and placed in `slot`.
    Attached { slot: usize, file_id: AttachmentId },
    /// At least one check failed; nothing was stored.
    Rejected(ValidationReport),
    /// Every slot was already occupied.
    NoFreeSlot,
    /// The request passed validation but carried no file bytes.
    NoFile,
    /// Storage returned a non-positive id.
    NotStored,
}

impl AttachmentControl {
    /// Validate, store and record an uploaded file.
    ///
    /// Storage failures are returned as errors and leave the slots untouched.
    #[tracing::instrument(skip(self, request), fields(kind = %self.kind()))]
    pub async fn handle_attach(&mut self, request: AttachRequest) -> Result<AttachOutcome, AppError> {
        if !self.slots.free_slot_exists() {
            tracing::debug!(
                capacity = self.slots.capacity(),
                "Attach ignored, no free slot"
            );
            return Ok(AttachOutcome::NoFreeSlot);
        }

        let received_size = request.received_size;
        let candidate = request.file.as_ref().map(|file| UploadCandidate {
            file_name: &file.original_name,
            size: received_size.map_or(file.file_size(), |n| n.max(file.file_size())),
        });
        let report = self.gate.evaluate(candidate.as_ref(), &self.slots);
        if !report.is_valid() {
            return Ok(AttachOutcome::Rejected(report));
        }

        if let (Some(file), Some(received)) = (request.file.as_ref(), received_size) {
            if received > file.file_size() {
                return Err(AppError::PayloadTooLarge(format!(
                    "Only {} of {} bytes of '{}' were kept",
                    file.file_size(),
                    received,
                    file.original_name
                )));
            }
        }

        let Some(file) = request.file.filter(|f| !f.data.is_empty()) else {
            return Ok(AttachOutcome::NoFile);
        };

        let original_name = file.original_name.clone();
        let size_bytes = file.file_size();
        let file_id = self.storage.save(file, &request.modified_by).await?;
        if !file_id.is_valid() {
            tracing::warn!(file_id = %file_id, "Storage returned no usable id");
            return Ok(AttachOutcome::NotStored);
        }

        match self.slots.add(file_id, original_name) {
            Some(slot) => {
                tracing::info!(
                    file_id = %file_id,
                    slot_index = slot,
                    size_bytes = size_bytes,
                    modified_by = %request.modified_by,
                    "File attached"
                );
                Ok(AttachOutcome::Attached { slot, file_id })
            }
            // A fresh id can only collide with a slot restored from stale state.
            None => Ok(AttachOutcome::NotStored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use dbfile_core::models::{AttachmentKind, SlotStore};
    use dbfile_processing::ValidationError;
    use dbfile_storage::AttachmentStorage;
    use std::sync::Arc;

    fn request(file: Option<NewAttachment>) -> AttachRequest {
        AttachRequest {
            file,
            received_size: None,
            modified_by: "jdoe".to_string(),
        }
    }

    #[tokio::test]
    async fn test_attach_stores_and_fills_first_slot() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let mut control =
            AttachmentControl::new(field(AttachmentKind::Document, 2), storage.clone()).unwrap();

        let outcome = control
            .handle_attach(request(Some(pdf("minutes.pdf", 10))))
            .await
            .unwrap();

        let AttachOutcome::Attached { slot, file_id } = outcome else {
            panic!("expected attach, got {outcome:?}");
        };
        assert_eq!(slot, 0);
        assert_eq!(control.slots().file_at(0).unwrap().name, "minutes.pdf");
        let meta = storage.fetch_metadata(file_id).await.unwrap();
        assert_eq!(meta.modified_by, "jdoe");
    }

    #[tokio::test]
    async fn test_rejected_upload_never_reaches_storage() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let mut control =
            AttachmentControl::new(field(AttachmentKind::Document, 2), storage.clone()).unwrap();

        let outcome = control
            .handle_attach(request(Some(pdf("virus.exe", 4096))))
            .await
            .unwrap();

        let AttachOutcome::Rejected(report) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert!(matches!(
            report.errors(),
            [
                ValidationError::FileTooLarge { .. },
                ValidationError::InvalidExtension { .. }
            ]
        ));
        assert_eq!(storage.calls(), 0);
        assert_eq!(control.slots().occupied_count(), 0);
    }

    #[tokio::test]
    async fn test_full_store_is_silent_noop() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let mut slots = SlotStore::new(1);
        slots.add(AttachmentId(77), "old.pdf");
        let mut control = AttachmentControl::with_slots(
            field(AttachmentKind::Document, 1),
            storage.clone(),
            slots,
        )
        .unwrap();

        let outcome = control
            .handle_attach(request(Some(pdf("new.pdf", 5))))
            .await
            .unwrap();
        assert_eq!(outcome, AttachOutcome::NoFreeSlot);
        assert_eq!(storage.calls(), 0);
        assert_eq!(control.slots().file_ids(), vec![AttachmentId(77)]);
    }

    #[tokio::test]
    async fn test_empty_upload_is_not_stored() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let mut control =
            AttachmentControl::new(field(AttachmentKind::Document, 2), storage.clone()).unwrap();

        assert_eq!(
            control.handle_attach(request(None)).await.unwrap(),
            AttachOutcome::NoFile
        );
        assert_eq!(
            control
                .handle_attach(request(Some(pdf("empty.pdf", 0))))
                .await
                .unwrap(),
            AttachOutcome::NoFile
        );
        assert_eq!(storage.calls(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates_without_mutation() {
        let mut flaky = FlakyStorage::new(AttachmentKind::Document);
        flaky.fail_save = true;
        let mut control =
            AttachmentControl::new(field(AttachmentKind::Document, 2), Arc::new(flaky)).unwrap();

        let err = control
            .handle_attach(request(Some(pdf("a.pdf", 3))))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(control.slots().occupied_count(), 0);
    }

    #[tokio::test]
    async fn test_discarded_upload_is_checked_at_received_size() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let mut control =
            AttachmentControl::new(field(AttachmentKind::Document, 2), storage.clone()).unwrap();

        let mut upload = request(Some(pdf("scan.pdf", 0)));
        upload.received_size = Some(200 * 1024);
        let outcome = control.handle_attach(upload).await.unwrap();

        let AttachOutcome::Rejected(report) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert_eq!(
            report.errors(),
            [ValidationError::FileTooLarge {
                size: 200 * 1024,
                max: 1024
            }]
        );
        assert_eq!(storage.calls(), 0);
    }

    #[tokio::test]
    async fn test_partial_upload_within_limit_is_not_stored() {
        let storage = Arc::new(FlakyStorage::new(AttachmentKind::Document));
        let mut field_config = (*field(AttachmentKind::Document, 2)).clone();
        field_config.max_upload_size = 0;
        let mut control =
            AttachmentControl::new(Arc::new(field_config), storage.clone()).unwrap();

        let mut upload = request(Some(pdf("scan.pdf", 10)));
        upload.received_size = Some(4096);
        let err = control.handle_attach(upload).await.unwrap_err();

        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert_eq!(storage.calls(), 0);
        assert_eq!(control.slots().occupied_count(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_id_leaves_slots_alone() {
        let mut flaky = FlakyStorage::new(AttachmentKind::Document);
        flaky.saved_id_override = Some(AttachmentId(0));
        let mut control =
            AttachmentControl::new(field(AttachmentKind::Document, 2), Arc::new(flaky)).unwrap();

        assert_eq!(
            control
                .handle_attach(request(Some(pdf("a.pdf", 3))))
                .await
                .unwrap(),
            AttachOutcome::NotStored
        );
        assert_eq!(control.slots().occupied_count(), 0);
    }
}
