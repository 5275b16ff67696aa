//! Revision policy.
//!
//! Document pages (and translations of documents) keep an append-only log of
//! name/content snapshots. A new snapshot is written only when the name or the
//! content actually changed.

use chrono::{DateTime, Utc};
use quire_store::{Page, PageType, Revision, RevisionStore, config_keys};

use crate::error::PageError;

/// True if pages of `page_type` under a parent of `parent_type` are revisioned.
#[must_use]
pub fn is_eligible(page_type: PageType, parent_type: Option<PageType>) -> bool {
    match page_type {
        PageType::Translation => parent_type.is_some_and(PageType::is_document),
        other => other.is_document(),
    }
}

/// Decide whether an update warrants a new revision.
#[must_use]
pub fn should_revise(
    page_type: PageType,
    parent_type: Option<PageType>,
    old_name: &str,
    new_name: &str,
    old_content: Option<&str>,
    new_content: Option<&str>,
) -> bool {
    is_eligible(page_type, parent_type) && (old_name != new_name || old_content != new_content)
}

fn inherits_content(page: &Page) -> bool {
    page.page_type == PageType::Translation
        && page.config(config_keys::TRANSLATION_INHERIT_CONTENT) == Some("true")
}

/// Append a snapshot of `page` to its revision log.
///
/// Translations inheriting their parent's content snapshot the parent content.
pub(crate) fn record(
    store: &dyn RevisionStore,
    page: &Page,
    parent: Option<&Page>,
    now: DateTime<Utc>,
) -> Result<Revision, PageError> {
    let next = store
        .find_by_page(&page.id)?
        .iter()
        .map(|r| r.revision)
        .max()
        .unwrap_or(0)
        + 1;

    let content = if inherits_content(page) {
        parent.and_then(|p| p.content.clone())
    } else {
        page.content.clone()
    };

    let revision = store.create(Revision {
        page_id: page.id.clone(),
        revision: next,
        name: page.name.clone(),
        content,
        contributor: page.last_contributor.clone(),
        created_at: now,
    })?;
    tracing::debug!(page_id = %page.id, revision = revision.revision, "Revision recorded");
    Ok(revision)
}
