//! Test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{TimeZone, Utc};
use quire_content::TemplateMode;
use quire_store::{
    MemoryRepository, MemoryRevisionStore, Page, PageRepository, PageSource, Reference,
    config_keys,
};
use serde_json::Value;

use crate::collaborators::{
    CategoryQuery, CategorySummary, ManualClock, PlanQuery, PlanStatus, PlanSummary,
    TemplateContextProvider,
};
use crate::context::ExecutionContext;
use crate::error::PageError;
use crate::fetch::{FetchError, FetchRequest, FetchedResource, Fetcher, FetcherRegistry};
use crate::input::NewPage;
use crate::tree::PageTree;

pub(crate) fn ctx() -> ExecutionContext {
    ExecutionContext::new("DEFAULT", "DEFAULT")
}

/// HTTP source without schedule.
pub(crate) fn http_source(url: &str) -> PageSource {
    let mut source = PageSource {
        kind: "http".to_owned(),
        ..PageSource::default()
    };
    source.config.insert("url".to_owned(), url.to_owned());
    source
}

#[derive(Debug, Default)]
pub(crate) struct FakePlans {
    plans: RwLock<HashMap<String, Vec<PlanSummary>>>,
}

impl FakePlans {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_plan(self, page_id: &str, name: &str, status: PlanStatus) -> Self {
        self.add_plan(page_id, name, status);
        self
    }

    pub(crate) fn add_plan(&self, page_id: &str, name: &str, status: PlanStatus) {
        let mut plans = self.plans.write().unwrap();
        let entry = plans.entry(page_id.to_owned()).or_default();
        entry.push(PlanSummary {
            id: format!("plan-{}", entry.len() + 1),
            name: name.to_owned(),
            status,
        });
    }
}

impl PlanQuery for FakePlans {
    fn find_by_general_conditions(
        &self,
        _ctx: &ExecutionContext,
        page_id: &str,
    ) -> Result<Vec<PlanSummary>, PageError> {
        Ok(self
            .plans
            .read()
            .unwrap()
            .get(page_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeCategories {
    categories: RwLock<HashMap<String, Vec<CategorySummary>>>,
}

impl FakeCategories {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_category(self, page_id: &str, name: &str) -> Self {
        self.add_category(page_id, name);
        self
    }

    pub(crate) fn add_category(&self, page_id: &str, name: &str) {
        self.categories
            .write()
            .unwrap()
            .entry(page_id.to_owned())
            .or_default()
            .push(CategorySummary {
                id: format!("cat-{name}"),
                key: name.to_lowercase(),
                name: name.to_owned(),
            });
    }
}

impl CategoryQuery for FakeCategories {
    fn find_by_page(
        &self,
        _ctx: &ExecutionContext,
        page_id: &str,
    ) -> Result<Vec<CategorySummary>, PageError> {
        Ok(self
            .categories
            .read()
            .unwrap()
            .get(page_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Clone, Debug)]
enum Response {
    Content(String),
    Gone,
    Fail,
}

/// Fetcher answering from a table keyed by `url` joined with `filepath`.
#[derive(Debug, Default)]
pub(crate) struct FakeFetcher {
    responses: RwLock<HashMap<String, Response>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn respond(&self, url: &str, content: &str) {
        self.set(url, Response::Content(content.to_owned()));
    }

    pub(crate) fn gone(&self, url: &str) {
        self.set(url, Response::Gone);
    }

    pub(crate) fn fail(&self, url: &str) {
        self.set(url, Response::Fail);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set(&self, url: &str, response: Response) {
        self.responses.write().unwrap().insert(url.to_owned(), response);
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedResource, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.require("url")?;
        let key = match request.get(config_keys::SOURCE_FILEPATH) {
            Some(path) => format!("{}/{}", url.trim_end_matches('/'), path.trim_start_matches('/')),
            None => url.to_owned(),
        };
        match self.responses.read().unwrap().get(&key).cloned() {
            Some(Response::Content(content)) => Ok(FetchedResource { content }),
            Some(Response::Gone) => Err(FetchError::NotFound(key)),
            Some(Response::Fail) => Err(FetchError::Http { status: 500 }),
            None => Err(FetchError::Transport(format!("no response for {key}").into())),
        }
    }
}

/// Template context returning a fixed value.
#[derive(Debug)]
pub(crate) struct StaticContext(pub(crate) Value);

impl TemplateContextProvider for StaticContext {
    fn context(&self, _ctx: &ExecutionContext, _reference: &Reference) -> Result<Value, PageError> {
        Ok(self.0.clone())
    }
}

/// Page tree over in-memory backends and fakes, with the clock at
/// 2024-05-01 12:00 UTC.
pub(crate) struct Fixture {
    pub(crate) tree: Arc<PageTree>,
    pub(crate) repository: Arc<MemoryRepository>,
    pub(crate) revisions: Arc<MemoryRevisionStore>,
    pub(crate) fetcher: Arc<FakeFetcher>,
    pub(crate) clock: Arc<ManualClock>,
    pub(crate) plans: Arc<FakePlans>,
    pub(crate) categories: Arc<FakeCategories>,
    context: Option<Value>,
    template_mode: TemplateMode,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let mut fixture = Self {
            tree: Arc::new(PageTree::new(
                Arc::new(MemoryRepository::new()),
                Arc::new(MemoryRevisionStore::new()),
            )),
            repository: Arc::new(MemoryRepository::new()),
            revisions: Arc::new(MemoryRevisionStore::new()),
            fetcher: Arc::new(FakeFetcher::default()),
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            )),
            plans: Arc::new(FakePlans::new()),
            categories: Arc::new(FakeCategories::new()),
            context: None,
            template_mode: TemplateMode::Strict,
        };
        fixture.rebuild();
        fixture
    }

    /// Replace the template context. Call before creating any page.
    pub(crate) fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self.rebuild();
        self
    }

    /// Replace the template mode. Call before creating any page.
    pub(crate) fn with_template_mode(mut self, mode: TemplateMode) -> Self {
        self.template_mode = mode;
        self.rebuild();
        self
    }

    fn rebuild(&mut self) {
        let fetchers = FetcherRegistry::new()
            .with_fetcher("http", Arc::clone(&self.fetcher) as Arc<dyn Fetcher>);
        let mut tree = PageTree::new(
            Arc::clone(&self.repository) as _,
            Arc::clone(&self.revisions) as _,
        )
        .with_fetchers(fetchers)
        .with_template_mode(self.template_mode)
        .with_clock(Arc::clone(&self.clock) as _)
        .with_plans(Arc::clone(&self.plans) as _)
        .with_categories(Arc::clone(&self.categories) as _);
        if let Some(context) = &self.context {
            tree = tree.with_template_context(Arc::new(StaticContext(context.clone())));
        }
        self.tree = Arc::new(tree);
    }

    /// Create a page in the `api-1` scope.
    pub(crate) fn create(&self, page: NewPage) -> Result<Page, PageError> {
        self.tree.create(&ctx(), &Reference::api("api-1"), page)
    }

    pub(crate) fn page(&self, id: &str) -> Page {
        self.repository.find_by_id(id).unwrap().unwrap()
    }

    pub(crate) fn order_of(&self, id: &str) -> u32 {
        self.page(id).order
    }
}
