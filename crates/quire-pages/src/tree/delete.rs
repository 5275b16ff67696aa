use quire_store::{PageCriteria, PageType};

use super::PageTree;
use crate::cascade;
use crate::context::ExecutionContext;
use crate::error::PageError;
use crate::ordering;

impl PageTree {
    /// Delete a page together with the links targeting it and the
    /// translations of both. Revisions are kept.
    ///
    /// Returns the number of pages removed.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageNotFound`] for an unknown page,
    /// [`PageError::PageFolderAction`] for a folder that still has children,
    /// and the guard errors of [`PublicationGuard::check_delete`].
    ///
    /// [`PublicationGuard::check_delete`]: crate::guard::PublicationGuard::check_delete
    pub fn delete(&self, ctx: &ExecutionContext, id: &str) -> Result<usize, PageError> {
        let reference = self.load(id)?.reference;
        self.in_scope(&reference, || self.delete_in_scope(ctx, id))
    }

    pub(super) fn delete_in_scope(&self, ctx: &ExecutionContext, id: &str) -> Result<usize, PageError> {
        let repository = self.repository.as_ref();
        let page = self.load(id)?;

        if matches!(page.page_type, PageType::Folder | PageType::SystemFolder) {
            let children = repository.search(&PageCriteria::new().children_of(Some(id)))?;
            if children.iter().any(|c| c.page_type != PageType::Translation) {
                return Err(PageError::folder("be deleted because it is not empty"));
            }
        }
        self.guard().check_delete(ctx, &page)?;

        repository.delete(&page.id)?;
        let mut removed = 1;
        if page.page_type.shifts_siblings() {
            let siblings =
                ordering::siblings(repository, &page.reference, page.parent_id.as_deref())?;
            ordering::apply(repository, &siblings, &ordering::plan_remove(&siblings))?;
        }

        let mut dependents = Vec::new();
        for link in cascade::links_to(repository, &page.id)? {
            dependents.extend(cascade::translations_of(repository, &link.id)?);
            dependents.push(link);
        }
        dependents.extend(cascade::translations_of(repository, &page.id)?);
        for dependent in dependents {
            repository.delete(&dependent.id)?;
            removed += 1;
        }

        tracing::info!(page_id = %page.id, removed, "Page deleted");
        Ok(removed)
    }
}
