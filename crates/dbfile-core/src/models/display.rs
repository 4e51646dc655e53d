use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::attachment::AttachmentId;

/// Render-time projection of an occupied slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DisplayDescriptor {
    pub file_id: AttachmentId,
    /// Link text; the name the file was uploaded with.
    pub file_name: String,
    /// Retrieval URL, absent when no handler template is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Extension with its dot and original case, e.g. `.PDF`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub file_size: i64,
}

/// What the rendering layer needs for one slot position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SlotView {
    pub index: usize,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<DisplayDescriptor>,
    /// Identifier to post back to remove the file in this slot.
    pub remove_action: String,
}

impl SlotView {
    pub fn hidden(index: usize) -> Self {
        Self {
            index,
            visible: false,
            descriptor: None,
            remove_action: super::slot::remove_action_id(index),
        }
    }

    pub fn shown(index: usize, descriptor: DisplayDescriptor) -> Self {
        Self {
            index,
            visible: true,
            descriptor: Some(descriptor),
            remove_action: super::slot::remove_action_id(index),
        }
    }
}
