use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_kind;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use dbfile_core::models::AttachmentId;
use dbfile_core::AppError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashMap;
use std::sync::Arc;

/// Characters left unescaped in an RFC 5987 `filename*` value.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

#[utoipa::path(
    get,
    path = "/files/{kind}",
    tag = "files",
    params(
        ("kind" = String, Path, description = "Attachment kind: image or document"),
        ("file" = Option<i64>, Query, description = "File id; the parameter name is configured per kind (IMAGE_FILE_ID_PARAM / DOCUMENT_FILE_ID_PARAM)")
    ),
    responses(
        (status = 200, description = "Stored file, or an empty body when no usable id was given", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(kind = %kind, operation = "download_file"))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response<Body>, HttpAppError> {
    let kind = parse_kind(&kind)?;
    let param = state.config.control().file_id_param(kind);

    let Some(id) = requested_file_id(&params, param) else {
        tracing::debug!(param = %param, "No usable file id, sending empty response");
        return Ok(StatusCode::OK.into_response());
    };

    let record = state.field(kind).storage.fetch_full(id).await?;

    tracing::debug!(
        file_id = %id,
        size_bytes = record.data.len(),
        content_type = %record.metadata.content_type,
        "Sending stored file"
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.metadata.content_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&record.metadata.original_name),
        )
        .header(header::CACHE_CONTROL, "private, no-cache")
        .body(Body::from(record.data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Positive file id from the query string; absent or unparsable values give `None`.
fn requested_file_id(params: &HashMap<String, String>, param: &str) -> Option<AttachmentId> {
    params
        .get(param)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .map(AttachmentId)
        .filter(AttachmentId::is_valid)
}

/// `attachment` disposition carrying the original file name.
///
/// `filename` holds an ASCII fallback; `filename*` the exact UTF-8 name.
fn content_disposition(original_name: &str) -> String {
    let fallback: String = original_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(original_name, ATTR_CHAR);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
