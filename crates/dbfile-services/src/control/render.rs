use dbfile_core::models::{DisplayDescriptor, SlotView};
use dbfile_core::{handler_url, AppError, RequestOrigin};

use super::AttachmentControl;

impl AttachmentControl {
    /// One view per slot, in index order.
    ///
    /// Occupied slots get a descriptor built from stored metadata; empty slots are
    /// hidden without touching storage. A failed metadata fetch fails the whole pass.
    #[tracing::instrument(skip(self, origin), fields(kind = %self.kind()))]
    pub async fn materialize(&self, origin: &RequestOrigin) -> Result<Vec<SlotView>, AppError> {
        let template = self.field.handler_url_template.as_deref();
        let mut views = Vec::with_capacity(self.slots.capacity());

        for (index, slot) in self.slots.slots().iter().enumerate() {
            let Some(file) = slot else {
                views.push(SlotView::hidden(index));
                continue;
            };

            let metadata = self.storage.fetch_metadata(file.id).await?;
            let url = handler_url(template, &self.field.project_name, file.id, origin);
            views.push(SlotView::shown(
                index,
                DisplayDescriptor {
                    file_id: file.id,
                    file_name: file.name.clone(),
                    url: url.map(String::from),
                    extension: metadata.display_extension(),
                    file_size: metadata.file_size,
                },
            ));
        }

        Ok(views)
    }
}
