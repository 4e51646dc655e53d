//! Application state shared by every handler.

use std::sync::Arc;

use dbfile_core::models::{AttachmentKind, SlotStore};
use dbfile_core::{AppError, Config};
use dbfile_services::{AttachmentControl, AttachmentFieldConfig, AttachmentStorage};
use sqlx::PgPool;

use crate::utils::form_state::FormStateSigner;

/// Field configuration and storage backend for one attachment kind.
#[derive(Clone)]
pub struct AttachmentField {
    pub config: Arc<AttachmentFieldConfig>,
    pub storage: Arc<dyn AttachmentStorage>,
}

/// Storage backends for both attachment kinds.
#[derive(Clone)]
pub struct AttachmentBackends {
    pub images: Arc<dyn AttachmentStorage>,
    pub documents: Arc<dyn AttachmentStorage>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Present with the postgres backend; used by health checks.
    pub pool: Option<PgPool>,
    pub images: AttachmentField,
    pub documents: AttachmentField,
    pub form_state: FormStateSigner,
}

impl AppState {
    pub fn new(config: Config, backends: AttachmentBackends, pool: Option<PgPool>) -> Self {
        let field = |kind: AttachmentKind, storage: Arc<dyn AttachmentStorage>| AttachmentField {
            config: Arc::new(AttachmentFieldConfig::from_config(&config, kind)),
            storage,
        };
        let images = field(AttachmentKind::Image, backends.images);
        let documents = field(AttachmentKind::Document, backends.documents);
        let form_state = FormStateSigner::new(config.form_state_secret());

        Self {
            config,
            pool,
            images,
            documents,
            form_state,
        }
    }

    pub fn field(&self, kind: AttachmentKind) -> &AttachmentField {
        match kind {
            AttachmentKind::Image => &self.images,
            AttachmentKind::Document => &self.documents,
        }
    }

    /// A control for a brand-new session of `kind`.
    pub fn new_control(&self, kind: AttachmentKind) -> Result<AttachmentControl, AppError> {
        let field = self.field(kind);
        AttachmentControl::new(field.config.clone(), field.storage.clone())
    }

    /// A control resuming the session carried by a form-state token.
    pub fn resume_control(
        &self,
        kind: AttachmentKind,
        token: &str,
    ) -> Result<AttachmentControl, AppError> {
        let slots = self.form_state.open(kind, token)?;
        let field = self.field(kind);
        AttachmentControl::with_slots(field.config.clone(), field.storage.clone(), slots)
    }

    /// Seal a control's slots into the token the client posts back next time.
    pub fn seal(&self, kind: AttachmentKind, slots: &SlotStore) -> Result<String, AppError> {
        self.form_state.seal(kind, slots)
    }
}
