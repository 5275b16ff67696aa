use quire_store::{Page, PageCriteria, PageMedia};

use super::PageTree;
use crate::context::ExecutionContext;
use crate::error::PageError;

impl PageTree {
    /// Attach a media to a page, after the existing attachments.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageNotFound`] for an unknown page.
    pub fn attach_media(
        &self,
        _ctx: &ExecutionContext,
        id: &str,
        hash: &str,
        filename: &str,
    ) -> Result<Page, PageError> {
        let reference = self.load(id)?.reference;
        self.in_scope(&reference, || {
            let mut page = self.load(id)?;
            let order = page.attached_media.iter().map(|m| m.order).max().unwrap_or(0) + 1;
            page.attached_media.push(PageMedia {
                hash: hash.to_owned(),
                filename: filename.to_owned(),
                order,
            });
            page.updated_at = self.clock.now();
            let page = self.repository.update(page)?;
            tracing::debug!(page_id = %page.id, hash, order, "Media attached");
            Ok(page)
        })
    }

    /// True if any page attaches the media or mentions its hash in its
    /// content.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the repository fails.
    pub fn is_media_used(&self, hash: &str) -> Result<bool, PageError> {
        let used = self.repository.search(&PageCriteria::new())?.iter().any(|page| {
            page.attached_media.iter().any(|m| m.hash == hash)
                || page.content.as_deref().is_some_and(|c| c.contains(hash))
        });
        Ok(used)
    }
}
