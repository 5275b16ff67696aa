//! Inputs of page tree mutations.

use std::collections::BTreeMap;

use quire_store::{PageSource, PageType, Visibility};

/// Page to create.
///
/// ```ignore
/// let page = NewPage::new(PageType::Markdown, "Getting started")
///     .with_parent("folder-1")
///     .with_content("# Hello ${api.name}");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPage {
    /// Explicit id. A random id is generated when absent.
    pub id: Option<String>,
    pub page_type: PageType,
    pub name: String,
    pub parent_id: Option<String>,
    pub content: Option<String>,
    /// Requested position among siblings. Absent means last.
    pub order: Option<u32>,
    pub published: bool,
    pub visibility: Visibility,
    pub homepage: bool,
    pub configuration: BTreeMap<String, String>,
    pub source: Option<PageSource>,
    pub last_contributor: Option<String>,
}

impl NewPage {
    #[must_use]
    pub fn new(page_type: PageType, name: impl Into<String>) -> Self {
        Self {
            id: None,
            page_type,
            name: name.into(),
            parent_id: None,
            content: None,
            order: None,
            published: false,
            visibility: Visibility::Public,
            homepage: false,
            configuration: BTreeMap::new(),
            source: None,
            last_contributor: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_homepage(mut self, homepage: bool) -> Self {
        self.homepage = homepage;
        self
    }

    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: PageSource) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_contributor(mut self, contributor: impl Into<String>) -> Self {
        self.last_contributor = Some(contributor.into());
        self
    }
}

/// Partial update of a page. `None` fields keep their current value.
///
/// `parent_id` and `source` are doubly optional: `Some(None)` clears them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PagePatch {
    pub name: Option<String>,
    pub content: Option<String>,
    pub parent_id: Option<Option<String>>,
    pub order: Option<u32>,
    pub published: Option<bool>,
    pub visibility: Option<Visibility>,
    pub homepage: Option<bool>,
    /// Replaces the whole configuration map.
    pub configuration: Option<BTreeMap<String, String>>,
    pub source: Option<Option<PageSource>>,
    pub last_contributor: Option<String>,
}

impl PagePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Move under `parent_id`, or to top level for `None`.
    #[must_use]
    pub fn parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    #[must_use]
    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    #[must_use]
    pub fn homepage(mut self, homepage: bool) -> Self {
        self.homepage = Some(homepage);
        self
    }

    #[must_use]
    pub fn configuration(mut self, configuration: BTreeMap<String, String>) -> Self {
        self.configuration = Some(configuration);
        self
    }

    #[must_use]
    pub fn source(mut self, source: Option<PageSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn contributor(mut self, contributor: impl Into<String>) -> Self {
        self.last_contributor = Some(contributor.into());
        self
    }
}
