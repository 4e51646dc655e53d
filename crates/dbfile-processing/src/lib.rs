//! dbfile Processing Library
//!
//! Upload checks run before an attachment is stored: size, format and remaining
//! slot capacity, plus content type resolution for uploaded files.

pub mod content_type;
pub mod count_message;
pub mod validator;

pub use content_type::{content_type_for_extension, resolve_content_type};
pub use count_message::{file_count_message, max_files_in_words};
pub use validator::{UploadCandidate, ValidationError, ValidationGate, ValidationReport};
