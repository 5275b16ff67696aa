use quire_store::{Page, PageCriteria, PageType, Reference, deterministic_page_id};

use super::PageTree;
use crate::context::ExecutionContext;
use crate::error::PageError;
use crate::input::NewPage;

/// System folders of an environment's portal, in display order.
const PORTAL_FOLDERS: [&str; 3] = ["Header", "TopFooter", "Footer"];

const ASIDE_FOLDER: &str = "Aside";

impl PageTree {
    /// Create the portal system folders of the context's environment.
    ///
    /// Folders that already exist are returned as they are.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the repository fails.
    pub fn initialize_portal(&self, ctx: &ExecutionContext) -> Result<Vec<Page>, PageError> {
        let reference = ctx.portal_reference();
        self.in_scope(&reference, || {
            let mut folders = Vec::with_capacity(PORTAL_FOLDERS.len());
            for (order, name) in (1..).zip(PORTAL_FOLDERS) {
                folders.push(self.system_folder_in_scope(ctx, &reference, name, order)?);
            }
            tracing::info!(environment = %ctx.environment_id, "Portal system folders initialized");
            Ok(folders)
        })
    }

    /// Create the ASIDE system folder of an API, placed first.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the repository fails.
    pub fn create_aside_folder(
        &self,
        ctx: &ExecutionContext,
        api_id: &str,
    ) -> Result<Page, PageError> {
        let reference = Reference::api(api_id);
        self.in_scope(&reference, || {
            self.system_folder_in_scope(ctx, &reference, ASIDE_FOLDER, 1)
        })
    }

    fn system_folder_in_scope(
        &self,
        ctx: &ExecutionContext,
        reference: &Reference,
        name: &str,
        order: u32,
    ) -> Result<Page, PageError> {
        let criteria = PageCriteria::new()
            .reference(reference.clone())
            .children_of(None)
            .page_type(PageType::SystemFolder)
            .name(name);
        if let Some(existing) = self.repository.search(&criteria)?.into_iter().next() {
            return Ok(existing);
        }
        let folder = NewPage::new(PageType::SystemFolder, name)
            .with_id(deterministic_page_id(&reference.id, None, name))
            .with_order(order)
            .with_published(true);
        self.create_in_scope(ctx, reference, folder)
    }
}
