//! Test helpers for dbfile-api integration tests.
//!
//! Every test gets its own app on in-memory storage, so tests never share records.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use dbfile_api::setup::routes::setup_routes;
use dbfile_api::setup::storage::memory_backends;
use dbfile_api::state::AppState;
use dbfile_core::config::{
    ERROR_UPLOAD_FILE_ATTACHMENT_COUNT, FILE_ATTACHMENT_HANDLER_URL, FILE_EDIT_PROMPT,
    IMAGE_HANDLER_URL,
};
use dbfile_core::{
    AttachmentServiceConfig, AttachmentSettings, BaseConfig, Config, ControlOptions,
    StorageBackend,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const TEST_FORM_STATE_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const TEST_MAX_FILES: usize = 3;
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024;
pub const FORWARDED_HOST: &str = "intranet.example";
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

/// Config for a council-minutes style form: three slots, 1 KiB uploads.
pub fn test_config() -> Config {
    let settings = AttachmentSettings::new()
        .with(FILE_EDIT_PROMPT, "Attach a file")
        .with(
            ERROR_UPLOAD_FILE_ATTACHMENT_COUNT,
            "You can attach at most {0} {1}.",
        )
        .with(FILE_ATTACHMENT_HANDLER_URL, "/{0}/file.ashx?file={1}")
        .with(IMAGE_HANDLER_URL, "https://cdn.example/{0}/image.ashx?image={1}");

    let control = ControlOptions {
        project_name: "council".to_string(),
        max_files: TEST_MAX_FILES,
        max_upload_size_bytes: TEST_MAX_UPLOAD_BYTES,
        image_allowed_formats: vec!["png".to_string(), "jpg".to_string()],
        document_allowed_formats: vec!["pdf".to_string(), "txt".to_string()],
        ..ControlOptions::default()
    };

    Config(Box::new(AttachmentServiceConfig {
        base: BaseConfig {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 5,
            db_timeout_seconds: 30,
            environment: "development".to_string(),
        },
        database_url: None,
        storage_backend: StorageBackend::Memory,
        settings,
        control,
        form_state_secret: TEST_FORM_STATE_SECRET.to_string(),
    }))
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config())
}

pub fn setup_test_app_with(config: Config) -> TestApp {
    let state = Arc::new(AppState::new(config.clone(), memory_backends(), None));
    let router = setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to create test server");
    TestApp { server, state }
}

impl TestApp {
    /// Open a form session, optionally pre-filled from a linked item.
    pub async fn open_session(&self, kind: &str, item: Option<i64>) -> Value {
        let mut request = self
            .server
            .post(&format!("/attachments/{}/session", kind))
            .add_header("x-forwarded-host", FORWARDED_HOST)
            .add_header("x-forwarded-proto", "https");
        if let Some(item) = item {
            request = request.add_query_param("item", item);
        }
        let response = request.await;
        response.assert_status_ok();
        response.json::<Value>()
    }

    /// Post one file to the attach endpoint.
    pub async fn attach(
        &self,
        kind: &str,
        state: &str,
        file_name: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> TestResponse {
        let form = MultipartForm::new().add_text("state", state).add_part(
            "file",
            Part::bytes(data).file_name(file_name).mime_type(mime_type),
        );
        self.server
            .post(&format!("/attachments/{}/attach", kind))
            .add_header("x-forwarded-host", FORWARDED_HOST)
            .add_header("x-forwarded-proto", "https")
            .add_header(REMOTE_USER_HEADER, "jdoe")
            .multipart(form)
            .await
    }

    /// Attach a PDF document and return the body of the successful response.
    pub async fn attach_pdf(&self, state: &str, file_name: &str) -> Value {
        let response = self
            .attach(
                "document",
                state,
                file_name,
                "application/pdf",
                fixtures::create_test_pdf(),
            )
            .await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["valid"], true, "attach rejected: {body}");
        body
    }

    pub async fn detach(&self, kind: &str, action: &str, state: &str) -> TestResponse {
        self.server
            .post(&format!("/attachments/{}/detach/{}", kind, action))
            .add_header("x-forwarded-host", FORWARDED_HOST)
            .add_header("x-forwarded-proto", "https")
            .json(&json!({ "state": state }))
            .await
    }

    pub async fn commit(&self, kind: &str, state: &str, item: i64) -> TestResponse {
        self.server
            .post(&format!("/attachments/{}/commit", kind))
            .add_query_param("item", item)
            .json(&json!({ "state": state }))
            .await
    }
}

/// The `state` token of a form response.
pub fn state_of(body: &Value) -> String {
    body["state"]
        .as_str()
        .expect("response carries a state token")
        .to_string()
}

/// Slots of a form response that show a file.
pub fn visible_slots(body: &Value) -> Vec<Value> {
    body["slots"]
        .as_array()
        .expect("response carries slots")
        .iter()
        .filter(|slot| slot["visible"] == true)
        .cloned()
        .collect()
}
