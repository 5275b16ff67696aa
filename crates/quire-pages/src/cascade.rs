//! Publication cascade.
//!
//! A page's dependents are the LINK pages targeting it (in any reference
//! scope), the translations of those links, and the page's own translations.
//! When the page's `published` flag or visibility changes, dependents follow.

use chrono::{DateTime, Utc};
use quire_store::{Page, PageCriteria, PageRepository, PageType, Visibility};

use crate::error::PageError;

/// State to propagate. `None` fields are left untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CascadeChange {
    pub published: Option<bool>,
    pub visibility: Option<Visibility>,
}

impl CascadeChange {
    /// Change between two versions of the same page.
    #[must_use]
    pub fn between(old: &Page, new: &Page) -> Self {
        Self {
            published: (old.published != new.published).then_some(new.published),
            visibility: (old.visibility != new.visibility).then_some(new.visibility),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.published.is_none() && self.visibility.is_none()
    }

    /// Apply to `page`, returning true if anything changed.
    fn apply_to(self, page: &mut Page) -> bool {
        let mut changed = false;
        if let Some(published) = self.published.filter(|p| *p != page.published) {
            page.published = published;
            changed = true;
        }
        if let Some(visibility) = self.visibility.filter(|v| *v != page.visibility) {
            page.visibility = visibility;
            changed = true;
        }
        changed
    }
}

/// LINK pages targeting `page_id`, across every reference scope.
pub(crate) fn links_to(
    repository: &dyn PageRepository,
    page_id: &str,
) -> Result<Vec<Page>, PageError> {
    let criteria = PageCriteria::new().page_type(PageType::Link);
    Ok(repository
        .search(&criteria)?
        .into_iter()
        .filter(|link| link.links_to(page_id))
        .collect())
}

/// Translations whose parent is `page_id`.
pub(crate) fn translations_of(
    repository: &dyn PageRepository,
    page_id: &str,
) -> Result<Vec<Page>, PageError> {
    let criteria = PageCriteria::new()
        .page_type(PageType::Translation)
        .children_of(Some(page_id));
    Ok(repository.search(&criteria)?)
}

/// Propagate `change` from `page` to its dependents.
///
/// Only dependents whose state differs are written; those get `updated_at`
/// set to `now`. Returns the number of pages written.
pub fn cascade(
    repository: &dyn PageRepository,
    page: &Page,
    change: CascadeChange,
    now: DateTime<Utc>,
) -> Result<usize, PageError> {
    if change.is_empty() {
        return Ok(0);
    }

    let mut dependents = Vec::new();
    for link in links_to(repository, &page.id)? {
        dependents.extend(translations_of(repository, &link.id)?);
        dependents.push(link);
    }
    dependents.extend(translations_of(repository, &page.id)?);

    let mut written = 0;
    for mut dependent in dependents {
        if change.apply_to(&mut dependent) {
            dependent.updated_at = now;
            repository.update(dependent)?;
            written += 1;
        }
    }

    tracing::debug!(page_id = %page.id, written, "Publication cascaded");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quire_store::{MemoryRepository, Reference, config_keys};

    use super::*;

    fn page(id: &str, page_type: PageType, parent: Option<&str>) -> Page {
        let mut page = Page::new(id, Reference::api("api"), page_type, id, Utc::now());
        page.parent_id = parent.map(str::to_owned);
        page.published = true;
        page
    }

    fn link(id: &str, reference: Reference, target: &str) -> Page {
        let mut link = page(id, PageType::Link, None);
        link.reference = reference;
        link.content = Some(target.to_owned());
        link
    }

    #[test]
    fn test_unpublish_reaches_links_and_their_translations() {
        let mut external = link("ext", Reference::api("api"), "https://example.com");
        external
            .configuration
            .insert(config_keys::LINK_RESOURCE_TYPE.to_owned(), "EXTERNAL".to_owned());
        let repo = MemoryRepository::new()
            .with_page(page("p", PageType::Markdown, None))
            .with_page(link("l1", Reference::api("api"), "p"))
            .with_page(link("l2", Reference::environment("env"), "p"))
            .with_page(page("t1", PageType::Translation, Some("l1")))
            .with_page(page("tp", PageType::Translation, Some("p")))
            .with_page(external)
            .with_page(page("other", PageType::Markdown, None));

        let mut unpublished = repo.find_by_id("p").unwrap().unwrap();
        unpublished.published = false;
        let change = CascadeChange {
            published: Some(false),
            visibility: None,
        };

        let written = cascade(&repo, &unpublished, change, Utc::now()).unwrap();

        assert_eq!(written, 4);
        for id in ["l1", "l2", "t1", "tp"] {
            assert!(!repo.find_by_id(id).unwrap().unwrap().published, "{id}");
        }
        assert!(repo.find_by_id("ext").unwrap().unwrap().published);
        assert!(repo.find_by_id("other").unwrap().unwrap().published);
    }

    #[test]
    fn test_cascade_skips_unchanged_dependents() {
        let mut already = link("l1", Reference::api("api"), "p");
        already.published = false;
        let before = already.updated_at;
        let repo = MemoryRepository::new()
            .with_page(page("p", PageType::Markdown, None))
            .with_page(already);

        let change = CascadeChange {
            published: Some(false),
            visibility: None,
        };
        let written =
            cascade(&repo, &page("p", PageType::Markdown, None), change, Utc::now()).unwrap();

        assert_eq!(written, 0);
        assert_eq!(repo.find_by_id("l1").unwrap().unwrap().updated_at, before);
    }

    #[test]
    fn test_visibility_cascade() {
        let repo = MemoryRepository::new()
            .with_page(page("p", PageType::Markdown, None))
            .with_page(page("tp", PageType::Translation, Some("p")));
        let old = page("p", PageType::Markdown, None);
        let mut new = old.clone();
        new.visibility = Visibility::Private;

        let change = CascadeChange::between(&old, &new);
        cascade(&repo, &new, change, Utc::now()).unwrap();

        assert_eq!(change.published, None);
        assert_eq!(
            repo.find_by_id("tp").unwrap().unwrap().visibility,
            Visibility::Private
        );
    }
}
