//! In-memory repository backends.
//!
//! Provides [`MemoryRepository`] and [`MemoryRevisionStore`] for tests and for
//! the CLI, which loads a [`Snapshot`] from disk, mutates it in memory and
//! writes it back.

use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::model::{Page, Revision};
use crate::repository::{
    PageCriteria, PageRepository, RepositoryError, RepositoryErrorKind, RevisionStore,
};

const BACKEND: &str = "Memory";

/// In-memory page table.
///
/// # Example
///
/// ```ignore
/// use quire_store::{MemoryRepository, Page, PageRepository};
///
/// let repository = MemoryRepository::new().with_page(page);
/// let found = repository.find_by_id("page-1").unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MemoryRepository {
    pages: RwLock<BTreeMap<String, Page>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding the given pages.
    #[must_use]
    pub fn from_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        let pages = pages.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            pages: RwLock::new(pages),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Add a page.
    #[must_use]
    pub fn with_page(self, page: Page) -> Self {
        self.pages.write().unwrap_or_else(PoisonError::into_inner).insert(page.id.clone(), page);
        self
    }

    /// All pages, sorted by id.
    #[must_use]
    pub fn pages(&self) -> Vec<Page> {
        self.pages.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
    }

    /// Make every subsequent `update` of the page fail with `Unavailable`.
    #[cfg(feature = "mock")]
    #[must_use]
    pub fn fail_updates_for(self, id: impl Into<String>) -> Self {
        self.failing.write().unwrap_or_else(PoisonError::into_inner).insert(id.into());
        self
    }

    fn check_failure(&self, id: &str) -> Result<(), RepositoryError> {
        if self.failing.read().unwrap_or_else(PoisonError::into_inner).contains(id) {
            return Err(RepositoryError::new(RepositoryErrorKind::Unavailable)
                .with_backend(BACKEND)
                .with_id(id));
        }
        Ok(())
    }
}

impl PageRepository for MemoryRepository {
    fn find_by_id(&self, id: &str) -> Result<Option<Page>, RepositoryError> {
        Ok(self.pages.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned())
    }

    fn search(&self, criteria: &PageCriteria) -> Result<Vec<Page>, RepositoryError> {
        let mut found: Vec<Page> = self
            .pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|p| criteria.matches(p))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    fn create(&self, page: Page) -> Result<Page, RepositoryError> {
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        if pages.contains_key(&page.id) {
            return Err(RepositoryError::already_exists(&page.id).with_backend(BACKEND));
        }
        pages.insert(page.id.clone(), page.clone());
        Ok(page)
    }

    fn update(&self, page: Page) -> Result<Page, RepositoryError> {
        self.check_failure(&page.id)?;
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        match pages.get_mut(&page.id) {
            Some(slot) => {
                *slot = page.clone();
                Ok(page)
            }
            None => Err(RepositoryError::not_found(&page.id).with_backend(BACKEND)),
        }
    }

    fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.pages.write().unwrap_or_else(PoisonError::into_inner).remove(id);
        Ok(())
    }
}

/// In-memory revision log.
#[derive(Debug, Default)]
pub struct MemoryRevisionStore {
    revisions: RwLock<Vec<Revision>>,
}

impl MemoryRevisionStore {
    /// Create an empty revision log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log holding the given revisions.
    #[must_use]
    pub fn from_revisions(revisions: Vec<Revision>) -> Self {
        Self {
            revisions: RwLock::new(revisions),
        }
    }

    /// All revisions in insertion order.
    #[must_use]
    pub fn revisions(&self) -> Vec<Revision> {
        self.revisions.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Total number of revisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.revisions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if no revision was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn create(&self, revision: Revision) -> Result<Revision, RepositoryError> {
        self.revisions.write().unwrap_or_else(PoisonError::into_inner).push(revision.clone());
        Ok(revision)
    }

    fn find_by_page(&self, page_id: &str) -> Result<Vec<Revision>, RepositoryError> {
        Ok(self
            .revisions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.page_id == page_id)
            .cloned()
            .collect())
    }
}

/// Serializable dump of both in-memory backends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub revisions: Vec<Revision>,
}

impl Snapshot {
    /// Parse a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the document is not a valid snapshot.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Capture the current state of both backends.
    #[must_use]
    pub fn capture(repository: &MemoryRepository, revisions: &MemoryRevisionStore) -> Self {
        Self {
            pages: repository.pages(),
            revisions: revisions.revisions(),
        }
    }

    /// Build backends holding this snapshot's data.
    #[must_use]
    pub fn into_backends(self) -> (MemoryRepository, MemoryRevisionStore) {
        (
            MemoryRepository::from_pages(self.pages),
            MemoryRevisionStore::from_revisions(self.revisions),
        )
    }
}
