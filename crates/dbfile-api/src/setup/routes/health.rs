//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use dbfile_core::models::{AttachmentId, AttachmentKind};
use dbfile_storage::StorageError;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns status string "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub storage_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub images: String,
    pub documents: String,
}

/// Liveness check - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Metadata lookup of an id that cannot exist; a NotFound answer means the backend responded.
async fn check_storage(state: &AppState, kind: AttachmentKind) -> String {
    let storage = state.field(kind).storage.clone();
    run_check(
        TIMEOUT,
        async move {
            match storage.fetch_metadata(AttachmentId(0)).await {
                Ok(_) | Err(StorageError::NotFound(_)) => Ok(()),
                Err(e) => Err(e),
            }
        },
        "unhealthy",
    )
    .await
}

/// Health check covering the database (when used) and both storage backends.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match &state.pool {
        Some(pool) => {
            let pool = pool.clone();
            Some(
                run_check(
                    TIMEOUT,
                    async move { sqlx::query("SELECT 1").execute(&pool).await.map(drop) },
                    "unhealthy",
                )
                .await,
            )
        }
        None => None,
    };

    let images = check_storage(&state, AttachmentKind::Image).await;
    let documents = check_storage(&state, AttachmentKind::Document).await;

    let healthy = database.as_deref().map_or(true, |d| d == "healthy")
        && images == "healthy"
        && documents == "healthy";

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        storage_backend: state.config.storage_backend().to_string(),
        database,
        images,
        documents,
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
