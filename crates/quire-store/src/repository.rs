//! Repository traits and error types.
//!
//! Provides the [`PageRepository`] and [`RevisionStore`] traits abstracting page
//! persistence, along with [`RepositoryError`] for unified error handling across
//! backends.
//!
//! # Consistency
//!
//! Each call is an independent write. Backends are not required to offer
//! transactions; callers that need multi-row updates serialize them themselves.

use crate::model::{Page, PageType, Reference, Revision};

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RepositoryErrorKind {
    /// Page does not exist.
    NotFound,
    /// Page already exists (for create operations).
    AlreadyExists,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Operation timed out.
    Timeout,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance.
#[derive(Debug, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry (not found, conflict).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (service unavailable).
    Persistent,
}

/// Repository error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct RepositoryError {
    /// Semantic error category.
    pub kind: RepositoryErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Page id context (if applicable).
    pub id: Option<String>,
    /// Backend identifier (e.g., "Memory").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RepositoryError {
    /// Create a new repository error.
    #[must_use]
    pub fn new(kind: RepositoryErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            id: None,
            backend: None,
            source: None,
        }
    }

    /// Attach page id context.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Create a not found error for a page id.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::new(RepositoryErrorKind::NotFound).with_id(id)
    }

    /// Create an already-exists error for a page id.
    #[must_use]
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::new(RepositoryErrorKind::AlreadyExists).with_id(id)
    }

    /// True if the caller may retry the operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.status != ErrorStatus::Permanent
    }
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (id: page-1)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            RepositoryErrorKind::NotFound => "Not found",
            RepositoryErrorKind::AlreadyExists => "Already exists",
            RepositoryErrorKind::Unavailable => "Unavailable",
            RepositoryErrorKind::Timeout => "Timeout",
            RepositoryErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(id) = &self.id {
            write!(f, " (id: {id})")?;
        }

        Ok(())
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Parent constraint of a [`PageCriteria`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ParentFilter {
    /// Any parent, including none.
    #[default]
    Any,
    /// Only pages without a parent.
    TopLevel,
    /// Only direct children of the given page.
    Id(String),
}

/// Page search filter.
///
/// Unset fields match everything. Built with chained setters:
///
/// ```ignore
/// let criteria = PageCriteria::new()
///     .reference(Reference::api("api-1"))
///     .page_type(PageType::Translation)
///     .parent(ParentFilter::Id("page-1".to_owned()));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageCriteria {
    pub reference: Option<Reference>,
    pub page_type: Option<PageType>,
    pub parent: ParentFilter,
    pub name: Option<String>,
    pub homepage: Option<bool>,
    pub published: Option<bool>,
    pub auto_fetch: Option<bool>,
}

impl PageCriteria {
    /// Criteria matching every page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    #[must_use]
    pub fn page_type(mut self, page_type: PageType) -> Self {
        self.page_type = Some(page_type);
        self
    }

    #[must_use]
    pub fn parent(mut self, parent: ParentFilter) -> Self {
        self.parent = parent;
        self
    }

    /// Restrict to direct children of `parent_id`, or to top level for `None`.
    #[must_use]
    pub fn children_of(self, parent_id: Option<&str>) -> Self {
        match parent_id {
            Some(id) => self.parent(ParentFilter::Id(id.to_owned())),
            None => self.parent(ParentFilter::TopLevel),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn homepage(mut self, homepage: bool) -> Self {
        self.homepage = Some(homepage);
        self
    }

    #[must_use]
    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    /// Restrict to pages whose source has auto fetch enabled.
    #[must_use]
    pub fn auto_fetch(mut self, auto_fetch: bool) -> Self {
        self.auto_fetch = Some(auto_fetch);
        self
    }

    /// Check a page against every set field.
    #[must_use]
    pub fn matches(&self, page: &Page) -> bool {
        if self.reference.as_ref().is_some_and(|r| *r != page.reference) {
            return false;
        }
        if self.page_type.is_some_and(|t| t != page.page_type) {
            return false;
        }
        let parent_ok = match &self.parent {
            ParentFilter::Any => true,
            ParentFilter::TopLevel => page.parent_id.is_none(),
            ParentFilter::Id(id) => page.parent_id.as_deref() == Some(id.as_str()),
        };
        if !parent_ok {
            return false;
        }
        if self.name.as_ref().is_some_and(|n| *n != page.name) {
            return false;
        }
        if self.homepage.is_some_and(|h| h != page.homepage) {
            return false;
        }
        if self.published.is_some_and(|p| p != page.published) {
            return false;
        }
        if self
            .auto_fetch
            .is_some_and(|a| a != page.has_auto_fetch_source())
        {
            return false;
        }
        true
    }
}

/// Page persistence abstraction.
///
/// Pages live in a flat table keyed by id. Implementations do not enforce tree
/// invariants; the page tree engine does.
pub trait PageRepository: Send + Sync {
    /// Find a page by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend cannot be read.
    fn find_by_id(&self, id: &str) -> Result<Option<Page>, RepositoryError>;

    /// Return every page matching the criteria, sorted by order then id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend cannot be read.
    fn search(&self, criteria: &PageCriteria) -> Result<Vec<Page>, RepositoryError>;

    /// Insert a new page.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] with kind `AlreadyExists` if the id is taken.
    fn create(&self, page: Page) -> Result<Page, RepositoryError>;

    /// Replace an existing page.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] with kind `NotFound` if the page does not exist.
    fn update(&self, page: Page) -> Result<Page, RepositoryError>;

    /// Delete a page by id. Deleting a missing page is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend cannot be written.
    fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}

/// Append-only revision log.
pub trait RevisionStore: Send + Sync {
    /// Append a revision.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend cannot be written.
    fn create(&self, revision: Revision) -> Result<Revision, RepositoryError>;

    /// All revisions of a page, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the backend cannot be read.
    fn find_by_page(&self, page_id: &str) -> Result<Vec<Revision>, RepositoryError>;
}
