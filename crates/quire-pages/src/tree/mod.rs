//! Page tree orchestrator.
//!
//! [`PageTree`] owns the tree invariants. Every mutation validates in full
//! (placement, link and translation rules, source policy, content safety)
//! before its first write, then persists the page and runs the follow-ups:
//! sibling order shifts, the single-homepage rule, revisions and the
//! publication cascade.
//!
//! Mutations of one reference scope are serialized by an in-process lock.
//! Public methods take the lock and delegate to `*_in_scope` variants, which
//! call each other freely.

mod create;
mod delete;
mod fetch;
mod import;
mod media;
mod portal;
mod update;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use quire_content::{ContentSafetyPipeline, TemplateMode};
use quire_store::{
    LinkTarget, Page, PageCriteria, PageRepository, PageSource, PageType, Reference,
    RevisionStore,
};

pub use import::ImportSource;

use crate::collaborators::{
    CategoryQuery, Clock, EmptyTemplateContext, NoCategories, NoPlans, PlanQuery, SystemClock,
    TemplateContextProvider,
};
use crate::context::ExecutionContext;
use crate::error::PageError;
use crate::fetch::FetcherRegistry;
use crate::guard::PublicationGuard;
use crate::placement::ParentPlacement;
use crate::source_policy::{self, ImportSettings};

/// Documentation page tree.
pub struct PageTree {
    repository: Arc<dyn PageRepository>,
    revisions: Arc<dyn RevisionStore>,
    pipeline: ContentSafetyPipeline,
    template_mode: TemplateMode,
    fetchers: FetcherRegistry,
    plans: Arc<dyn PlanQuery>,
    categories: Arc<dyn CategoryQuery>,
    templates: Arc<dyn TemplateContextProvider>,
    clock: Arc<dyn Clock>,
    import: ImportSettings,
    locks: Mutex<HashMap<Reference, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for PageTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTree")
            .field("pipeline", &self.pipeline)
            .field("template_mode", &self.template_mode)
            .field("fetchers", &self.fetchers)
            .field("import", &self.import)
            .finish_non_exhaustive()
    }
}

impl PageTree {
    /// Tree over the given backends, with null collaborators, strict
    /// templates and no fetchers.
    #[must_use]
    pub fn new(repository: Arc<dyn PageRepository>, revisions: Arc<dyn RevisionStore>) -> Self {
        Self {
            repository,
            revisions,
            pipeline: ContentSafetyPipeline::default(),
            template_mode: TemplateMode::Strict,
            fetchers: FetcherRegistry::new(),
            plans: Arc::new(NoPlans),
            categories: Arc::new(NoCategories),
            templates: Arc::new(EmptyTemplateContext),
            clock: Arc::new(SystemClock),
            import: ImportSettings::default(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: ContentSafetyPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Template mode applied on create and update.
    #[must_use]
    pub fn with_template_mode(mut self, mode: TemplateMode) -> Self {
        self.template_mode = mode;
        self
    }

    #[must_use]
    pub fn with_fetchers(mut self, fetchers: FetcherRegistry) -> Self {
        self.fetchers = fetchers;
        self
    }

    #[must_use]
    pub fn with_plans(mut self, plans: Arc<dyn PlanQuery>) -> Self {
        self.plans = plans;
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: Arc<dyn CategoryQuery>) -> Self {
        self.categories = categories;
        self
    }

    #[must_use]
    pub fn with_template_context(mut self, templates: Arc<dyn TemplateContextProvider>) -> Self {
        self.templates = templates;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_import_settings(mut self, import: ImportSettings) -> Self {
        self.import = import;
        self
    }

    /// Page by id.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the repository fails.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Page>, PageError> {
        Ok(self.repository.find_by_id(id)?)
    }

    /// Pages matching `criteria`, sorted by order then id.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the repository fails.
    pub fn search(&self, criteria: &PageCriteria) -> Result<Vec<Page>, PageError> {
        Ok(self.repository.search(criteria)?)
    }

    /// True if any direct child of the folder is published.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the repository fails.
    pub fn folder_has_published_children(&self, folder_id: &str) -> Result<bool, PageError> {
        let criteria = PageCriteria::new()
            .children_of(Some(folder_id))
            .published(true);
        Ok(!self.repository.search(&criteria)?.is_empty())
    }

    /// Content of a page with template expressions resolved leniently.
    ///
    /// Only MARKDOWN and MARKDOWN_TEMPLATE pages (and their translations) are
    /// templated; other content is returned as stored.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PageNotFound`] for an unknown page.
    pub fn render(&self, ctx: &ExecutionContext, id: &str) -> Result<Option<String>, PageError> {
        let page = self.load(id)?;
        let Some(content) = page.content.as_deref() else {
            return Ok(None);
        };
        let parent = match page.parent_id.as_deref() {
            Some(parent_id) => self.repository.find_by_id(parent_id)?,
            None => None,
        };
        if !is_templated(&page, parent.as_ref()) {
            return Ok(Some(content.to_owned()));
        }
        let context = self.templates.context(ctx, &page.reference)?;
        Ok(Some(self.pipeline.render(content, &context)))
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Lock guarding mutations of one reference scope.
    fn scope_lock(&self, reference: &Reference) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(reference.clone()).or_default())
    }

    /// Run `f` while holding the lock of `reference`.
    fn in_scope<T>(&self, reference: &Reference, f: impl FnOnce() -> T) -> T {
        let lock = self.scope_lock(reference);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn load(&self, id: &str) -> Result<Page, PageError> {
        self.repository
            .find_by_id(id)?
            .ok_or_else(|| PageError::PageNotFound(id.to_owned()))
    }

    fn guard(&self) -> PublicationGuard<'_> {
        PublicationGuard::new(
            self.repository.as_ref(),
            self.plans.as_ref(),
            self.categories.as_ref(),
        )
    }

    /// Parent of a `page_type` page in `reference`.
    fn load_parent(
        &self,
        page_type: PageType,
        reference: &Reference,
        parent_id: Option<&str>,
    ) -> Result<Option<Page>, PageError> {
        let Some(parent_id) = parent_id else {
            return Ok(None);
        };
        let parent = self.load(parent_id)?;
        if parent.reference != *reference {
            return Err(PageError::action(
                page_type,
                "be placed under a page of another reference",
            ));
        }
        Ok(Some(parent))
    }

    fn placement_under(&self, parent: Option<&Page>) -> Result<ParentPlacement, PageError> {
        let grandparent = match parent.and_then(|p| p.parent_id.as_deref()) {
            Some(id) => self.repository.find_by_id(id)?,
            None => None,
        };
        Ok(ParentPlacement::of(parent, grandparent.as_ref()))
    }

    /// Fail if `parent` is `page` or one of its descendants.
    fn check_cycle(&self, page: &Page, parent: Option<&Page>) -> Result<(), PageError> {
        let mut seen = HashSet::new();
        let mut current = parent.cloned();
        while let Some(ancestor) = current {
            if ancestor.id == page.id {
                return Err(PageError::action(
                    page.page_type,
                    "be moved under itself or one of its descendants",
                ));
            }
            if !seen.insert(ancestor.id.clone()) {
                break;
            }
            current = match ancestor.parent_id.as_deref() {
                Some(id) => self.repository.find_by_id(id)?,
                None => None,
            };
        }
        Ok(())
    }

    /// Resolve a LINK's target and copy its state.
    ///
    /// Root, external and category links are always published.
    fn resolve_link(&self, page: &mut Page) -> Result<(), PageError> {
        let target_id = match page.link_target() {
            None => return Err(PageError::action(PageType::Link, "have an empty content")),
            Some(LinkTarget::Page(id)) => Some(id.to_owned()),
            Some(LinkTarget::Root | LinkTarget::External(_) | LinkTarget::Category(_)) => None,
        };
        let Some(target_id) = target_id else {
            page.published = true;
            return Ok(());
        };

        let target = self.load(&target_id)?;
        let rejected = match target.page_type {
            PageType::Link | PageType::SystemFolder => true,
            PageType::Folder => {
                self.placement_of(&target)? == ParentPlacement::SystemFolder
            }
            _ => false,
        };
        if rejected {
            return Err(PageError::action(
                PageType::Link,
                format!("target a {} page", target.page_type),
            ));
        }
        page.published = target.published;
        page.visibility = target.visibility;
        Ok(())
    }

    /// Placement of `page` under its current parent.
    fn placement_of(&self, page: &Page) -> Result<ParentPlacement, PageError> {
        let parent = match page.parent_id.as_deref() {
            Some(id) => self.repository.find_by_id(id)?,
            None => None,
        };
        self.placement_under(parent.as_ref())
    }

    /// Translation rules: a `lang`, and no other translation of the parent in
    /// that language.
    fn check_translation(&self, page: &Page) -> Result<(), PageError> {
        let Some(lang) = page.lang() else {
            return Err(PageError::action(
                PageType::Translation,
                "be saved without a `lang` configuration",
            ));
        };
        let Some(parent_id) = page.parent_id.as_deref() else {
            return Err(PageError::action(PageType::Translation, "have no parent"));
        };
        let duplicate = crate::cascade::translations_of(self.repository.as_ref(), parent_id)?
            .iter()
            .any(|t| t.id != page.id && t.lang() == Some(lang));
        if duplicate {
            return Err(PageError::action(
                PageType::Translation,
                format!("be saved because a translation already exists for lang [{lang}]"),
            ));
        }
        Ok(())
    }

    fn check_source(&self, source: &PageSource) -> Result<(), PageError> {
        source_policy::check_source_urls(source, &self.import)?;
        source_policy::check_fetch_cron(source)
    }

    /// Run templated content through the safety pipeline.
    fn check_content(
        &self,
        ctx: &ExecutionContext,
        page: &Page,
        parent: Option<&Page>,
    ) -> Result<(), PageError> {
        if !is_templated(page, parent) {
            return Ok(());
        }
        let Some(content) = page.content.as_deref().filter(|c| !c.is_empty()) else {
            return Ok(());
        };
        let context = self.templates.context(ctx, &page.reference)?;
        self.pipeline.process(content, &context, self.template_mode)?;
        Ok(())
    }

    /// Clear `homepage` on every other page of the scope.
    fn clear_other_homepages(&self, page: &Page) -> Result<usize, PageError> {
        let criteria = PageCriteria::new()
            .reference(page.reference.clone())
            .homepage(true);
        let mut cleared = 0;
        for mut other in self.repository.search(&criteria)? {
            if other.id == page.id {
                continue;
            }
            other.homepage = false;
            self.repository.update(other)?;
            cleared += 1;
        }
        Ok(cleared)
    }
}

fn check_folder(page: &Page) -> Result<(), PageError> {
    if !matches!(page.page_type, PageType::Folder | PageType::SystemFolder) {
        return Ok(());
    }
    if page.content.as_deref().is_some_and(|c| !c.is_empty()) {
        return Err(PageError::folder("have a content"));
    }
    if page.source.is_some() {
        return Err(PageError::folder("have a source"));
    }
    if page.homepage {
        return Err(PageError::folder("be the homepage"));
    }
    Ok(())
}

fn is_templated(page: &Page, parent: Option<&Page>) -> bool {
    match page.page_type {
        PageType::Translation => parent.is_some_and(|p| p.page_type.is_templated()),
        other => other.is_templated(),
    }
}
