//! Form endpoints for an attachment field.
//!
//! Every response carries the session's slots as a signed `state` token; the client
//! posts it back with the next action. Nothing about the session is kept server-side.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::parse_kind;
use crate::state::AppState;
use crate::utils::request_context::{modified_by, request_origin};
use crate::utils::upload::{extract_attach_form, UploadLimits};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    Json,
};
use dbfile_core::models::{AttachmentId, AttachmentKind, SlotView};
use dbfile_core::{AppError, RequestOrigin};
use dbfile_services::{
    parse_remove_action, resolve_linked_item, AttachOutcome, AttachRequest, AttachmentControl,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Rendered state of an attachment field after an action.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentFormResponse {
    pub kind: AttachmentKind,
    /// Signed token to post back with the next action.
    pub state: String,
    /// Label for the upload box (`FileEditPrompt`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_label: Option<String>,
    pub max_files: usize,
    pub free_slot_exists: bool,
    /// One entry per slot, in index order.
    pub slots: Vec<SlotView>,
    /// False when the upload failed a check.
    pub valid: bool,
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_file_id: Option<AttachmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_file_id: Option<AttachmentId>,
}

/// Body of detach and commit requests.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FormStateRequest {
    #[validate(length(min = 1, message = "Form state is required"))]
    pub state: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommitResponse {
    pub linked_item_id: i64,
    pub file_ids: Vec<AttachmentId>,
}

/// Multipart fields accepted by the attach endpoint.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct AttachFormSchema {
    /// Form state token from the previous response.
    pub state: String,
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<Vec<u8>>,
    /// Optional description, at most 255 characters.
    pub description: Option<String>,
}

/// Builds the response for a control once its action has run.
struct FormRender {
    valid: bool,
    messages: Vec<String>,
    attached_file_id: Option<AttachmentId>,
    removed_file_id: Option<AttachmentId>,
}

impl FormRender {
    fn quiet() -> Self {
        Self {
            valid: true,
            messages: Vec::new(),
            attached_file_id: None,
            removed_file_id: None,
        }
    }

    async fn render(
        self,
        state: &AppState,
        control: &AttachmentControl,
        origin: &RequestOrigin,
    ) -> Result<AttachmentFormResponse, AppError> {
        let slots = control.materialize(origin).await?;
        let token = state.seal(control.kind(), control.slots())?;
        let field = control.field();

        Ok(AttachmentFormResponse {
            kind: control.kind(),
            state: token,
            field_label: field.field_label.clone(),
            max_files: field.max_files,
            free_slot_exists: control.slots().free_slot_exists(),
            slots,
            valid: self.valid,
            messages: self.messages,
            attached_file_id: self.attached_file_id,
            removed_file_id: self.removed_file_id,
        })
    }
}

fn validate_body(body: &FormStateRequest) -> Result<(), AppError> {
    body.validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/attachments/{kind}/session",
    tag = "attachments",
    params(
        ("kind" = String, Path, description = "Attachment kind: image or document"),
        ("item" = Option<i64>, Query, description = "Linked item whose attachments pre-fill the field; the parameter name is configured by LINKED_ITEM_PARAM")
    ),
    responses(
        (status = 200, description = "New form session", body = AttachmentFormResponse),
        (status = 404, description = "Unknown attachment kind", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params, headers), fields(kind = %kind, operation = "open_session"))]
pub async fn open_session(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<AttachmentFormResponse>, HttpAppError> {
    let kind = parse_kind(&kind)?;
    let linked_item_id = resolve_linked_item(&params, &state.config.control().linked_item_param);

    let mut control = state.new_control(kind)?;
    control.load_linked(linked_item_id).await?;

    tracing::debug!(
        linked_item_id = linked_item_id,
        occupied = control.slots().occupied_count(),
        "Form session opened"
    );

    let response = FormRender::quiet()
        .render(&state, &control, &request_origin(&headers))
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/attachments/{kind}/attach",
    tag = "attachments",
    params(
        ("kind" = String, Path, description = "Attachment kind: image or document")
    ),
    request_body(content = AttachFormSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Field after the attach; check `valid` and `messages`", body = AttachmentFormResponse),
        (status = 400, description = "Invalid form state or request", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, multipart), fields(kind = %kind, operation = "attach_file"))]
pub async fn attach_file(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<AttachmentFormResponse>, HttpAppError> {
    let kind = parse_kind(&kind)?;
    let limits = UploadLimits::from_options(state.config.control());
    let form = extract_attach_form(multipart, limits).await?;
    let mut control = state.resume_control(kind, &form.fields.state)?;

    let request = AttachRequest {
        file: form.file,
        received_size: form.received_size,
        modified_by: modified_by(&headers, &state.config.control().modified_by_header),
    };

    let mut render = FormRender::quiet();
    match control.handle_attach(request).await? {
        AttachOutcome::Attached { file_id, .. } => render.attached_file_id = Some(file_id),
        AttachOutcome::Rejected(report) => {
            render.valid = false;
            render.messages = report.messages();
        }
        AttachOutcome::NoFreeSlot => {
            render.valid = false;
            render.messages = vec![control.gate().count_message().to_string()];
        }
        AttachOutcome::NoFile | AttachOutcome::NotStored => {}
    }

    let response = render
        .render(&state, &control, &request_origin(&headers))
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/attachments/{kind}/detach/{action}",
    tag = "attachments",
    params(
        ("kind" = String, Path, description = "Attachment kind: image or document"),
        ("action" = String, Path, description = "Remove action of the slot, e.g. removeFile_0"),
        ("item" = Option<i64>, Query, description = "Linked item the file belongs to; the parameter name is configured by LINKED_ITEM_PARAM")
    ),
    request_body = FormStateRequest,
    responses(
        (status = 200, description = "Field after the detach", body = AttachmentFormResponse),
        (status = 400, description = "Malformed action, slot out of range, empty slot or invalid state", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params, headers, body), fields(kind = %kind, action = %action, operation = "detach_file"))]
pub async fn detach_file(
    State(state): State<Arc<AppState>>,
    Path((kind, action)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    ValidatedJson(body): ValidatedJson<FormStateRequest>,
) -> Result<Json<AttachmentFormResponse>, HttpAppError> {
    let kind = parse_kind(&kind)?;
    validate_body(&body)?;

    let index = parse_remove_action(&action)?;
    let linked_item_id = resolve_linked_item(&params, &state.config.control().linked_item_param);

    let mut control = state.resume_control(kind, &body.state)?;
    let outcome = control.handle_detach(index, linked_item_id).await?;

    let mut render = FormRender::quiet();
    render.removed_file_id = Some(outcome.file_id);
    let response = render
        .render(&state, &control, &request_origin(&headers))
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/attachments/{kind}/commit",
    tag = "attachments",
    params(
        ("kind" = String, Path, description = "Attachment kind: image or document"),
        ("item" = i64, Query, description = "Linked item receiving the attachments; the parameter name is configured by LINKED_ITEM_PARAM")
    ),
    request_body = FormStateRequest,
    responses(
        (status = 200, description = "Attachments linked to the item", body = CommitResponse),
        (status = 400, description = "Missing linked item or invalid state", body = ErrorResponse),
        (status = 404, description = "A file in the state no longer exists", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params, body), fields(kind = %kind, operation = "commit_attachments"))]
pub async fn commit_attachments(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    ValidatedJson(body): ValidatedJson<FormStateRequest>,
) -> Result<Json<CommitResponse>, HttpAppError> {
    let kind = parse_kind(&kind)?;
    validate_body(&body)?;

    let linked_item_id = resolve_linked_item(&params, &state.config.control().linked_item_param);
    let control = state.resume_control(kind, &body.state)?;
    control.commit(linked_item_id).await?;

    Ok(Json(CommitResponse {
        linked_item_id,
        file_ids: control.slots().file_ids(),
    }))
}
