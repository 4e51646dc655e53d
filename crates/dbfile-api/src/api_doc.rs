//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use dbfile_core::models;

/// Returns the OpenAPI spec served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "dbfile API",
        version = "0.1.0",
        description = "Multi-file attachment fields backed by database storage. A form session holds a fixed number of slots, carried between requests as a signed state token; files are attached, detached and finally linked to the item that owns them. Stored files are served by the download handler."
    ),
    paths(
        handlers::file_download::download_file,
        handlers::attachment_form::open_session,
        handlers::attachment_form::attach_file,
        handlers::attachment_form::detach_file,
        handlers::attachment_form::commit_attachments,
    ),
    components(
        schemas(
            models::AttachmentKind,
            models::AttachmentId,
            models::AttachedFile,
            models::DisplayDescriptor,
            models::SlotView,
            handlers::attachment_form::AttachmentFormResponse,
            handlers::attachment_form::FormStateRequest,
            handlers::attachment_form::CommitResponse,
            handlers::attachment_form::AttachFormSchema,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "attachments", description = "Attachment form sessions: open, attach, detach and commit"),
        (name = "files", description = "Download of stored files")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/files/{kind}",
            "/attachments/{kind}/session",
            "/attachments/{kind}/attach",
            "/attachments/{kind}/detach/{action}",
            "/attachments/{kind}/commit",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
