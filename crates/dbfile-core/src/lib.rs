//! dbfile Core Library
//!
//! Domain models, error types, configuration and URL helpers shared by every
//! dbfile component.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod template;
pub mod urls;

pub use config::{AttachmentServiceConfig, AttachmentSettings, BaseConfig, Config, ControlOptions};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use urls::{handler_url, RequestOrigin};
