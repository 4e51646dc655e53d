use dbfile_core::models::{file_extension, SlotStore};

/// Reasons an upload is refused before it reaches storage
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed})")]
    InvalidExtension { extension: String, allowed: String },

    #[error("File has no extension: {0}")]
    MissingExtension(String),

    /// Carries the configured, already formatted count message.
    #[error("{0}")]
    TooManyFiles(String),
}

/// The part of a posted file the gate inspects.
#[derive(Debug, Clone, Copy)]
pub struct UploadCandidate<'a> {
    pub file_name: &'a str,
    pub size: usize,
}

/// Outcome of running every check of the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// User-facing messages in check order (size, format, count).
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    fn record(&mut self, result: Result<(), ValidationError>) {
        if let Err(err) = result {
            self.errors.push(err);
        }
    }
}

/// Size, format and count checks that guard the attach operation.
#[derive(Debug, Clone)]
pub struct ValidationGate {
    max_upload_size: usize,
    allowed_formats: Vec<String>,
    count_message: String,
}

impl ValidationGate {
    /// `max_upload_size` of 0 disables the size check. Formats are matched
    /// case-insensitively and may be given with or without a leading dot.
    pub fn new(max_upload_size: usize, allowed_formats: &[String], count_message: String) -> Self {
        Self {
            max_upload_size,
            allowed_formats: allowed_formats
                .iter()
                .map(|f| f.trim().trim_start_matches('.').to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
            count_message,
        }
    }

    pub fn count_message(&self) -> &str {
        &self.count_message
    }

    /// Passes when no file was posted.
    pub fn validate_size(&self, upload: Option<&UploadCandidate<'_>>) -> Result<(), ValidationError> {
        match upload {
            Some(file) if self.max_upload_size > 0 && file.size > self.max_upload_size => {
                Err(ValidationError::FileTooLarge {
                    size: file.size,
                    max: self.max_upload_size,
                })
            }
            _ => Ok(()),
        }
    }

    /// Passes when no file was posted. An empty allow-list accepts any extension.
    pub fn validate_format(
        &self,
        upload: Option<&UploadCandidate<'_>>,
    ) -> Result<(), ValidationError> {
        let Some(file) = upload else {
            return Ok(());
        };
        if self.allowed_formats.is_empty() {
            return Ok(());
        }
        let extension = file_extension(file.file_name)
            .ok_or_else(|| ValidationError::MissingExtension(file.file_name.to_string()))?;

        if !self.allowed_formats.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_formats.join(", "),
            });
        }

        Ok(())
    }

    /// Fails when every slot is occupied, including the zero-capacity case.
    pub fn validate_count(&self, slots: &SlotStore) -> Result<(), ValidationError> {
        if slots.free_slot_exists() {
            Ok(())
        } else {
            Err(ValidationError::TooManyFiles(self.count_message.clone()))
        }
    }

    /// Run all three checks without short-circuiting.
    pub fn evaluate(
        &self,
        upload: Option<&UploadCandidate<'_>>,
        slots: &SlotStore,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();
        report.record(self.validate_size(upload));
        report.record(self.validate_format(upload));
        report.record(self.validate_count(slots));

        if !report.is_valid() {
            tracing::debug!(
                failures = report.errors.len(),
                occupied = slots.occupied_count(),
                capacity = slots.capacity(),
                "Upload rejected by validation"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbfile_core::models::AttachmentId;

    fn test_gate() -> ValidationGate {
        ValidationGate::new(
            1024 * 1024,
            &["jpg".to_string(), ".PNG".to_string()],
            "You can only attach one image".to_string(),
        )
    }

    fn upload(name: &str, size: usize) -> UploadCandidate<'_> {
        UploadCandidate {
            file_name: name,
            size,
        }
    }

    #[test]
    fn test_validate_size_ok() {
        let gate = test_gate();
        assert!(gate.validate_size(Some(&upload("a.jpg", 512 * 1024))).is_ok());
        assert!(gate.validate_size(Some(&upload("a.jpg", 1024 * 1024))).is_ok());
    }

    #[test]
    fn test_validate_size_too_large() {
        let gate = test_gate();
        assert_eq!(
            gate.validate_size(Some(&upload("a.jpg", 1024 * 1024 + 1))),
            Err(ValidationError::FileTooLarge {
                size: 1024 * 1024 + 1,
                max: 1024 * 1024
            })
        );
    }

    #[test]
    fn test_zero_max_size_is_unlimited() {
        let gate = ValidationGate::new(0, &[], String::new());
        assert!(gate.validate_size(Some(&upload("a", usize::MAX))).is_ok());
    }

    #[test]
    fn test_validate_format_case_insensitive() {
        let gate = test_gate();
        assert!(gate.validate_format(Some(&upload("photo.JPG", 1))).is_ok());
        assert!(gate.validate_format(Some(&upload("photo.png", 1))).is_ok());
    }

    #[test]
    fn test_validate_format_invalid() {
        let gate = test_gate();
        assert!(matches!(
            gate.validate_format(Some(&upload("photo.gif", 1))),
            Err(ValidationError::InvalidExtension { .. })
        ));
        assert!(matches!(
            gate.validate_format(Some(&upload("photo", 1))),
            Err(ValidationError::MissingExtension(_))
        ));
    }

    #[test]
    fn test_missing_file_passes_size_and_format() {
        let gate = test_gate();
        assert!(gate.validate_size(None).is_ok());
        assert!(gate.validate_format(None).is_ok());
    }

    #[test]
    fn test_count_fails_when_full() {
        let gate = test_gate();
        let mut slots = SlotStore::new(1);
        assert!(gate.validate_count(&slots).is_ok());

        slots.add(AttachmentId(4), "a.jpg");
        assert_eq!(
            gate.validate_count(&slots),
            Err(ValidationError::TooManyFiles(
                "You can only attach one image".to_string()
            ))
        );
        // The store refuses the add anyway.
        assert_eq!(slots.add(AttachmentId(5), "b.jpg"), None);
    }

    #[test]
    fn test_count_fails_with_zero_capacity() {
        let gate = test_gate();
        assert!(gate.validate_count(&SlotStore::new(0)).is_err());
    }

    #[test]
    fn test_evaluate_collects_every_failure() {
        let gate = test_gate();
        let mut slots = SlotStore::new(1);
        slots.add(AttachmentId(1), "x.jpg");

        let report = gate.evaluate(Some(&upload("huge.gif", 5 * 1024 * 1024)), &slots);
        assert!(!report.is_valid());
        assert_eq!(report.errors().len(), 3);
        let messages = report.messages();
        assert!(messages[0].starts_with("File too large"));
        assert!(messages[1].starts_with("Invalid file extension: gif"));
        assert_eq!(messages[2], "You can only attach one image");
    }

    #[test]
    fn test_evaluate_valid_upload() {
        let gate = test_gate();
        let report = gate.evaluate(Some(&upload("ok.jpg", 10)), &SlotStore::new(2));
        assert!(report.is_valid());
        assert!(report.messages().is_empty());
    }
}
