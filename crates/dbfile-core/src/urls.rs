//! Handler URL construction for stored attachments.

use url::Url;

use crate::models::AttachmentId;
use crate::template::format_positional;

/// Scheme and host of the request being served, used to make relative handler URLs absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl Default for RequestOrigin {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
        }
    }
}

impl RequestOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }
}

/// Build the retrieval URL for `id` from a handler template.
///
/// `{0}` is the project name, `{1}` the file id. Returns `None` for non-positive ids,
/// when no template is configured, or when the result does not parse as a URL.
pub fn handler_url(
    template: Option<&str>,
    project_name: &str,
    id: AttachmentId,
    origin: &RequestOrigin,
) -> Option<Url> {
    if !id.is_valid() {
        return None;
    }
    let template = template.filter(|t| !t.trim().is_empty())?;
    let formatted = format_positional(template, &[&project_name, &id.0]);

    let lower = formatted.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Url::parse(&formatted).ok();
    }

    let separator = if formatted.starts_with('/') { "" } else { "/" };
    let absolute = format!(
        "{}://{}{}{}",
        origin.scheme, origin.host, separator, formatted
    );
    match Url::parse(&absolute) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(error = %e, url = %absolute, "Handler URL template produced an invalid URL");
            None
        }
    }
}
