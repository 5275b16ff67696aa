use std::collections::HashMap;

use quire_store::{
    Page, PageCriteria, PageSource, PageType, Reference, config_keys, deterministic_page_id,
};

use super::PageTree;
use crate::context::ExecutionContext;
use crate::descriptor::Descriptor;
use crate::error::PageError;
use crate::input::{NewPage, PagePatch};

const ROOT_NAME: &str = "Root";

/// Tree import request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSource {
    /// Source of the descriptor. Imported pages fetch their files from the
    /// same source with `filepath` set to their `src`.
    pub source: PageSource,
    /// Publication state of the root and of every imported page.
    pub published: bool,
    pub contributor: Option<String>,
}

impl ImportSource {
    #[must_use]
    pub fn new(source: PageSource) -> Self {
        Self {
            source,
            published: false,
            contributor: None,
        }
    }

    #[must_use]
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    #[must_use]
    pub fn with_contributor(mut self, contributor: impl Into<String>) -> Self {
        self.contributor = Some(contributor.into());
        self
    }
}

/// Source of an imported page: the root source, pointed at `src`, without
/// its own schedule.
fn child_source(root: &PageSource, src: &str) -> PageSource {
    let mut source = root.clone();
    source.auto_fetch = false;
    source.fetch_cron = None;
    source
        .config
        .insert(config_keys::SOURCE_FILEPATH.to_owned(), src.to_owned());
    source
}

pub(super) fn parse_descriptor(text: &str) -> Result<Descriptor, PageError> {
    Descriptor::parse(text)
        .map_err(|e| PageError::technical_with("Unable to read the import descriptor", e))
}

impl PageTree {
    /// Upsert the ROOT page of `reference` and import its descriptor.
    ///
    /// Pages listed in the descriptor are created when missing and updated
    /// otherwise; local pages absent from it are left alone. Returns the root
    /// followed by the imported folders and pages.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::UrlForbidden`] or [`PageError::Technical`] for a
    /// rejected source, [`PageError::Technical`] when the descriptor cannot be
    /// fetched or parsed, and any error of the page creations and updates.
    pub fn import(
        &self,
        ctx: &ExecutionContext,
        reference: &Reference,
        request: ImportSource,
    ) -> Result<Vec<Page>, PageError> {
        self.in_scope(reference, || self.import_in_scope(ctx, reference, request))
    }

    fn import_in_scope(
        &self,
        ctx: &ExecutionContext,
        reference: &Reference,
        request: ImportSource,
    ) -> Result<Vec<Page>, PageError> {
        self.check_source(&request.source)?;
        let descriptor = self.fetch_source(&request.source)?.content;
        let parsed = parse_descriptor(&descriptor)?;

        let root = match self.find_root(reference)? {
            Some(root) => {
                let mut patch = PagePatch::new()
                    .content(descriptor)
                    .source(Some(request.source))
                    .published(request.published);
                patch.last_contributor = request.contributor;
                self.update_in_scope(ctx, &root.id, patch)?
            }
            None => {
                let mut root = NewPage::new(PageType::Root, ROOT_NAME)
                    .with_id(deterministic_page_id(&reference.id, None, ROOT_NAME))
                    .with_content(descriptor)
                    .with_source(request.source)
                    .with_published(request.published);
                root.last_contributor = request.contributor;
                self.create_in_scope(ctx, reference, root)?
            }
        };

        let mut pages = self.import_descriptor(ctx, &root, &parsed)?;
        pages.insert(0, root);
        Ok(pages)
    }

    fn find_root(&self, reference: &Reference) -> Result<Option<Page>, PageError> {
        let criteria = PageCriteria::new()
            .reference(reference.clone())
            .page_type(PageType::Root);
        Ok(self.repository.search(&criteria)?.into_iter().next())
    }

    /// Apply `descriptor` below `root`.
    pub(super) fn import_descriptor(
        &self,
        ctx: &ExecutionContext,
        root: &Page,
        descriptor: &Descriptor,
    ) -> Result<Vec<Page>, PageError> {
        let Some(root_source) = root.source.as_ref() else {
            return Err(PageError::NoFetcherDefined(root.id.clone()));
        };

        let mut folders: HashMap<String, String> = HashMap::new();
        let mut imported = Vec::new();
        for entry in descriptor.pages() {
            let Some(page_type) = entry.page_type() else {
                tracing::warn!(src = %entry.src, "Unsupported file in import descriptor, skipping");
                continue;
            };

            let mut parent_id: Option<String> = None;
            let mut path = String::new();
            for folder_name in entry.folders() {
                path.push('/');
                path.push_str(folder_name);
                if let Some(id) = folders.get(&path) {
                    parent_id = Some(id.clone());
                    continue;
                }
                let folder = self.upsert_folder(ctx, root, parent_id.as_deref(), folder_name)?;
                folders.insert(path.clone(), folder.id.clone());
                parent_id = Some(folder.id.clone());
                imported.push(folder);
            }

            let name = entry.display_name();
            let source = child_source(root_source, &entry.src);
            let existing = self.find_child(&root.reference, parent_id.as_deref(), &name, page_type)?;
            let page = match existing {
                Some(existing) => {
                    let mut patch = PagePatch::new()
                        .source(Some(source))
                        .published(root.published)
                        .homepage(entry.homepage);
                    patch.last_contributor.clone_from(&root.last_contributor);
                    self.update_in_scope(ctx, &existing.id, patch)?
                }
                None => {
                    let mut page = NewPage::new(page_type, name.as_str())
                        .with_id(deterministic_page_id(
                            &root.reference.id,
                            parent_id.as_deref(),
                            &name,
                        ))
                        .with_source(source)
                        .with_published(root.published)
                        .with_homepage(entry.homepage);
                    page.parent_id = parent_id;
                    page.last_contributor.clone_from(&root.last_contributor);
                    self.create_in_scope(ctx, &root.reference, page)?
                }
            };
            imported.push(page);
        }

        tracing::info!(
            root_id = %root.id,
            reference = %root.reference,
            imported = imported.len(),
            "Descriptor imported"
        );
        Ok(imported)
    }

    fn upsert_folder(
        &self,
        ctx: &ExecutionContext,
        root: &Page,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<Page, PageError> {
        if let Some(folder) = self.find_child(&root.reference, parent_id, name, PageType::Folder)? {
            return Ok(folder);
        }
        let mut folder = NewPage::new(PageType::Folder, name)
            .with_id(deterministic_page_id(&root.reference.id, parent_id, name))
            .with_published(root.published);
        folder.parent_id = parent_id.map(str::to_owned);
        folder.last_contributor.clone_from(&root.last_contributor);
        self.create_in_scope(ctx, &root.reference, folder)
    }

    fn find_child(
        &self,
        reference: &Reference,
        parent_id: Option<&str>,
        name: &str,
        page_type: PageType,
    ) -> Result<Option<Page>, PageError> {
        let criteria = PageCriteria::new()
            .reference(reference.clone())
            .children_of(parent_id)
            .name(name)
            .page_type(page_type);
        Ok(self.repository.search(&criteria)?.into_iter().next())
    }
}
