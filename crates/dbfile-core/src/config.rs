//! Configuration module
//!
//! Server, database, storage and attachment-control settings, loaded once per process
//! from the environment (with `.env` support) and shared read-only afterwards.

use std::collections::HashMap;
use std::env;

use crate::models::AttachmentKind;
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILES: usize = 6;
const MAX_UPLOAD_SIZE_BYTES: usize = 10 * 1024 * 1024;
const MIN_FORM_STATE_SECRET_LEN: usize = 32;
const MIN_REQUEST_BODY_BYTES: usize = 32 * 1024 * 1024;
const UNLIMITED_UPLOAD_BODY_BYTES: usize = 1024 * 1024 * 1024;

/// Room in a request body for the form fields around the file.
pub const FORM_FIELDS_ALLOWANCE_BYTES: usize = 64 * 1024;

const DEFAULT_IMAGE_FORMATS: &str = "jpg,jpeg,gif,png";
const DEFAULT_DOCUMENT_FORMATS: &str = "pdf,doc,docx,rtf,txt,xls,xlsx,ppt,pptx";

/// Recognized attachment setting keys.
pub const FILE_EDIT_PROMPT: &str = "FileEditPrompt";
pub const ERROR_UPLOAD_FILE_ATTACHMENT_COUNT: &str = "ErrorUploadFileAttachmentCount";
pub const FILE_ATTACHMENT_HANDLER_URL: &str = "FileAttachmentHandlerUrl";
pub const IMAGE_HANDLER_URL: &str = "ImageHandlerUrl";

/// Environment variable backing each recognized setting key.
const SETTING_ENV_VARS: [(&str, &str); 4] = [
    (FILE_EDIT_PROMPT, "FILE_EDIT_PROMPT"),
    (
        ERROR_UPLOAD_FILE_ATTACHMENT_COUNT,
        "ERROR_UPLOAD_FILE_ATTACHMENT_COUNT",
    ),
    (FILE_ATTACHMENT_HANDLER_URL, "FILE_ATTACHMENT_HANDLER_URL"),
    (IMAGE_HANDLER_URL, "IMAGE_HANDLER_URL"),
];

/// Base configuration for the HTTP service
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Static key/value settings for messages, labels and handler URL templates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttachmentSettings {
    values: HashMap<String, String>,
}

impl AttachmentSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Retrieval URL template for the given kind.
    pub fn handler_url_template(&self, kind: AttachmentKind) -> Option<&str> {
        match kind {
            AttachmentKind::Image => self.get(IMAGE_HANDLER_URL),
            AttachmentKind::Document => self.get(FILE_ATTACHMENT_HANDLER_URL),
        }
    }

    pub fn file_edit_prompt(&self) -> Option<&str> {
        self.get(FILE_EDIT_PROMPT)
    }

    pub fn upload_count_message_template(&self) -> Option<&str> {
        self.get(ERROR_UPLOAD_FILE_ATTACHMENT_COUNT)
    }

    fn from_env() -> Self {
        let values = SETTING_ENV_VARS
            .iter()
            .filter_map(|(key, var)| env::var(var).ok().map(|v| (key.to_string(), v)))
            .collect();
        Self { values }
    }
}

/// Per-field options for the attachment control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlOptions {
    pub project_name: String,
    pub max_files: usize,
    /// Largest accepted upload in bytes; 0 disables the check.
    pub max_upload_size_bytes: usize,
    pub image_allowed_formats: Vec<String>,
    pub document_allowed_formats: Vec<String>,
    /// Query parameter carrying the file id on image downloads.
    pub image_file_id_param: String,
    /// Query parameter carrying the file id on document downloads.
    pub document_file_id_param: String,
    /// Query parameter carrying the id of the record the attachments belong to.
    pub linked_item_param: String,
    /// Request header naming the user for "modified by" attribution.
    pub modified_by_header: String,
    /// Absolute cap on a request body; 0 derives it from the upload limit.
    pub max_request_body_bytes: usize,
    /// Noun used in image field messages ("photo", "picture" ...).
    pub image_attachment_reference: String,
    /// Noun used in document field messages ("paper", "attachment" ...).
    pub document_attachment_reference: String,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            max_files: MAX_FILES,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_BYTES,
            image_allowed_formats: parse_format_list(DEFAULT_IMAGE_FORMATS),
            document_allowed_formats: parse_format_list(DEFAULT_DOCUMENT_FORMATS),
            image_file_id_param: "image".to_string(),
            document_file_id_param: "file".to_string(),
            linked_item_param: "item".to_string(),
            modified_by_header: "x-remote-user".to_string(),
            max_request_body_bytes: 0,
            image_attachment_reference: AttachmentKind::Image.default_reference().to_string(),
            document_attachment_reference: AttachmentKind::Document
                .default_reference()
                .to_string(),
        }
    }
}

impl ControlOptions {
    pub fn allowed_formats(&self, kind: AttachmentKind) -> &[String] {
        match kind {
            AttachmentKind::Image => &self.image_allowed_formats,
            AttachmentKind::Document => &self.document_allowed_formats,
        }
    }

    pub fn file_id_param(&self, kind: AttachmentKind) -> &str {
        match kind {
            AttachmentKind::Image => &self.image_file_id_param,
            AttachmentKind::Document => &self.document_file_id_param,
        }
    }

    /// Noun for the count message; a blank setting falls back to the kind's name.
    pub fn attachment_reference(&self, kind: AttachmentKind) -> &str {
        let configured = match kind {
            AttachmentKind::Image => self.image_attachment_reference.trim(),
            AttachmentKind::Document => self.document_attachment_reference.trim(),
        };
        if configured.is_empty() {
            kind.default_reference()
        } else {
            configured
        }
    }

    /// Largest request body read before the connection's input is cut off.
    ///
    /// Uploads over `max_upload_size_bytes` are still read up to this cap so the
    /// size check can report them.
    pub fn request_body_limit(&self) -> usize {
        match (self.max_request_body_bytes, self.max_upload_size_bytes) {
            (0, 0) => UNLIMITED_UPLOAD_BODY_BYTES,
            (0, max) => max.saturating_mul(4).max(MIN_REQUEST_BODY_BYTES),
            (cap, _) => cap,
        }
    }
}

/// Attachment service configuration
#[derive(Clone, Debug)]
pub struct AttachmentServiceConfig {
    pub base: BaseConfig,
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub settings: AttachmentSettings,
    pub control: ControlOptions,
    pub form_state_secret: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AttachmentServiceConfig>);

impl Config {
    fn inner(&self) -> &AttachmentServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AttachmentServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn settings(&self) -> &AttachmentSettings {
        &self.inner().settings
    }

    pub fn control(&self) -> &ControlOptions {
        &self.inner().control
    }

    pub fn form_state_secret(&self) -> &[u8] {
        self.inner().form_state_secret.as_bytes()
    }
}

impl AttachmentServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Postgres,
        };

        let defaults = ControlOptions::default();
        let control = ControlOptions {
            project_name: env::var("PROJECT_NAME").unwrap_or_default(),
            max_files: env::var("MAX_FILES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_files),
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_upload_size_bytes),
            image_allowed_formats: env::var("IMAGE_ALLOWED_FORMATS")
                .map(|s| parse_format_list(&s))
                .unwrap_or(defaults.image_allowed_formats),
            document_allowed_formats: env::var("DOCUMENT_ALLOWED_FORMATS")
                .map(|s| parse_format_list(&s))
                .unwrap_or(defaults.document_allowed_formats),
            image_file_id_param: env::var("IMAGE_FILE_ID_PARAM")
                .unwrap_or(defaults.image_file_id_param),
            document_file_id_param: env::var("DOCUMENT_FILE_ID_PARAM")
                .unwrap_or(defaults.document_file_id_param),
            linked_item_param: env::var("LINKED_ITEM_PARAM")
                .unwrap_or(defaults.linked_item_param),
            modified_by_header: env::var("MODIFIED_BY_HEADER")
                .map(|s| s.to_lowercase())
                .unwrap_or(defaults.modified_by_header),
            max_request_body_bytes: env::var("MAX_REQUEST_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_request_body_bytes),
            image_attachment_reference: env::var("IMAGE_ATTACHMENT_REFERENCE")
                .unwrap_or(defaults.image_attachment_reference),
            document_attachment_reference: env::var("DOCUMENT_ATTACHMENT_REFERENCE")
                .unwrap_or(defaults.document_attachment_reference),
        };

        let config = AttachmentServiceConfig {
            base,
            database_url: env::var("DATABASE_URL").ok(),
            storage_backend,
            settings: AttachmentSettings::from_env(),
            control,
            form_state_secret: env::var("FORM_STATE_SECRET")
                .map_err(|_| anyhow::anyhow!("FORM_STATE_SECRET must be set to sign form state"))?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.form_state_secret.len() < MIN_FORM_STATE_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "FORM_STATE_SECRET must be at least {} characters long",
                MIN_FORM_STATE_SECRET_LEN
            ));
        }

        if self.storage_backend == StorageBackend::Postgres {
            match self.database_url.as_deref() {
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when using the postgres storage backend"
                    ))
                }
                Some(url)
                    if !(url.starts_with("postgresql://") || url.starts_with("postgres://")) =>
                {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                Some(_) => {}
            }
        }

        for (name, param) in [
            ("IMAGE_FILE_ID_PARAM", &self.control.image_file_id_param),
            ("DOCUMENT_FILE_ID_PARAM", &self.control.document_file_id_param),
            ("LINKED_ITEM_PARAM", &self.control.linked_item_param),
            ("MODIFIED_BY_HEADER", &self.control.modified_by_header),
        ] {
            if param.trim().is_empty() {
                return Err(anyhow::anyhow!("{} must not be empty", name));
            }
        }

        let control = &self.control;
        if control.max_request_body_bytes > 0
            && control.max_upload_size_bytes > 0
            && control.max_request_body_bytes
                <= control
                    .max_upload_size_bytes
                    .saturating_add(FORM_FIELDS_ALLOWANCE_BYTES)
        {
            return Err(anyhow::anyhow!(
                "MAX_REQUEST_BODY_BYTES must exceed MAX_UPLOAD_SIZE_BYTES by more than {} bytes",
                FORM_FIELDS_ALLOWANCE_BYTES
            ));
        }

        Ok(())
    }
}

/// Split a comma-separated extension list, lowercasing entries and dropping leading dots.
pub fn parse_format_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
