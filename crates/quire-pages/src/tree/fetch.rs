use quire_store::{Page, PageSource, PageType};

use super::PageTree;
use super::import::parse_descriptor;
use crate::context::ExecutionContext;
use crate::error::PageError;
use crate::fetch::{FetchError, FetchedResource};
use crate::input::PagePatch;

impl PageTree {
    /// Refetch the source of a page now.
    ///
    /// Returns the updated page, or `None` when the source reports the
    /// resource as gone and the page was deleted. A ROOT page re-imports its
    /// descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::NoFetcherDefined`] when the page has no source
    /// and [`PageError::Technical`] when the fetch fails.
    pub fn fetch(
        &self,
        ctx: &ExecutionContext,
        id: &str,
        contributor: Option<&str>,
    ) -> Result<Option<Page>, PageError> {
        let reference = self.load(id)?.reference;
        self.in_scope(&reference, || {
            let page = self.load(id)?;
            let Some(source) = page.source.as_ref() else {
                return Err(PageError::NoFetcherDefined(page.id.clone()));
            };
            let fetched = self.fetch_source(source);
            self.apply_fetched_in_scope(ctx, &page, fetched, contributor)
        })
    }

    /// Store the outcome of a fetch made outside the scope lock.
    ///
    /// Returns `None` if the page no longer exists or was deleted because its
    /// source reported the resource as gone.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] for a failed fetch and any error of
    /// the update path.
    pub fn apply_fetched(
        &self,
        ctx: &ExecutionContext,
        page_id: &str,
        fetched: Result<FetchedResource, FetchError>,
        contributor: Option<&str>,
    ) -> Result<Option<Page>, PageError> {
        let Some(page) = self.repository.find_by_id(page_id)? else {
            return Ok(None);
        };
        self.in_scope(&page.reference, || {
            match self.repository.find_by_id(page_id)? {
                Some(page) => self.apply_fetched_in_scope(ctx, &page, fetched, contributor),
                None => Ok(None),
            }
        })
    }

    /// Fetch a source through the registry, with its deadline.
    pub(crate) fn fetch_source(&self, source: &PageSource) -> Result<FetchedResource, FetchError> {
        tracing::debug!(kind = %source.kind, "Fetching page source");
        self.fetchers.fetch(source)
    }

    fn apply_fetched_in_scope(
        &self,
        ctx: &ExecutionContext,
        page: &Page,
        fetched: Result<FetchedResource, FetchError>,
        contributor: Option<&str>,
    ) -> Result<Option<Page>, PageError> {
        let resource = match fetched {
            Ok(resource) => resource,
            Err(FetchError::NotFound(resource)) => {
                tracing::info!(page_id = %page.id, resource = %resource, "Source resource is gone, deleting page");
                self.delete_in_scope(ctx, &page.id)?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let descriptor = if page.page_type == PageType::Root {
            Some(parse_descriptor(&resource.content)?)
        } else {
            None
        };

        let mut patch = PagePatch::new().content(resource.content);
        patch.last_contributor = contributor.map(str::to_owned);
        let updated = self.update_in_scope(ctx, &page.id, patch)?;

        if let Some(descriptor) = descriptor {
            self.import_descriptor(ctx, &updated, &descriptor)?;
        }
        Ok(Some(updated))
    }
}
