//! Sibling order allocation.
//!
//! Pages sharing a reference scope and a parent form an ordering scope. LINK
//! and TRANSLATION pages are outside it. Within a scope, orders are the
//! contiguous integers `1..=N`.
//!
//! The `plan_*` functions are pure: they take the current siblings and return
//! the new order of every page whose order changes. [`apply`] persists such a
//! plan one page at a time.

use std::collections::BTreeMap;

use quire_store::{Page, PageCriteria, PageRepository, Reference};

use crate::error::PageError;

/// New order per page id.
pub type Assignments = BTreeMap<String, u32>;

fn ranked(siblings: &[Page]) -> Vec<&Page> {
    let mut ranked: Vec<&Page> = siblings.iter().collect();
    ranked.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    ranked
}

fn clamp(order: u32, max: usize) -> usize {
    let max = max.max(1);
    usize::try_from(order).unwrap_or(max).clamp(1, max)
}

/// Renumber `ids` as `1..=N` and keep the entries that differ from `current`.
fn renumber<'a>(ids: impl Iterator<Item = &'a str>, current: &BTreeMap<&str, u32>) -> Assignments {
    let mut assignments = Assignments::new();
    for (index, id) in ids.enumerate() {
        let order = u32::try_from(index + 1).unwrap_or(u32::MAX);
        if current.get(id) != Some(&order) {
            assignments.insert(id.to_owned(), order);
        }
    }
    assignments
}

/// Move `page_id` to `desired` within its siblings.
///
/// `siblings` includes the moved page. `desired` is clamped to `[1, N]`. The
/// moved page is always part of the result.
#[must_use]
pub fn plan_move(siblings: &[Page], page_id: &str, desired: u32) -> Assignments {
    let ranked = ranked(siblings);
    let current: BTreeMap<&str, u32> = ranked.iter().map(|p| (p.id.as_str(), p.order)).collect();
    let mut ids: Vec<&str> = ranked
        .iter()
        .map(|p| p.id.as_str())
        .filter(|id| *id != page_id)
        .collect();

    let position = clamp(desired, ids.len() + 1) - 1;
    ids.insert(position, page_id);

    let mut assignments = renumber(ids.into_iter(), &current);
    let assigned = u32::try_from(position + 1).unwrap_or(u32::MAX);
    assignments.insert(page_id.to_owned(), assigned);
    assignments
}

/// Insert `page_id` among `siblings` (which exclude it).
///
/// `desired` is clamped to `[1, N+1]`; `None` appends. Returns the order of
/// the inserted page and the shifts of the others.
#[must_use]
pub fn plan_insert(siblings: &[Page], page_id: &str, desired: Option<u32>) -> (u32, Assignments) {
    let ranked = ranked(siblings);
    let current: BTreeMap<&str, u32> = ranked.iter().map(|p| (p.id.as_str(), p.order)).collect();
    let mut ids: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();

    let slots = ids.len() + 1;
    let position = desired.map_or(slots, |d| clamp(d, slots)) - 1;
    ids.insert(position, page_id);

    let mut assignments = renumber(ids.into_iter(), &current);
    let order = assignments
        .remove(page_id)
        .unwrap_or_else(|| u32::try_from(position + 1).unwrap_or(u32::MAX));
    (order, assignments)
}

/// Close the gap left by a page removed from `siblings` (which exclude it).
#[must_use]
pub fn plan_remove(siblings: &[Page]) -> Assignments {
    let ranked = ranked(siblings);
    let current: BTreeMap<&str, u32> = ranked.iter().map(|p| (p.id.as_str(), p.order)).collect();
    renumber(ranked.iter().map(|p| p.id.as_str()), &current)
}

/// Pages of the ordering scope under `parent_id`.
pub(crate) fn siblings(
    repository: &dyn PageRepository,
    reference: &Reference,
    parent_id: Option<&str>,
) -> Result<Vec<Page>, PageError> {
    let criteria = PageCriteria::new()
        .reference(reference.clone())
        .children_of(parent_id);
    Ok(repository
        .search(&criteria)?
        .into_iter()
        .filter(|p| p.page_type.shifts_siblings())
        .collect())
}

/// Persist a plan, one write per changed page. Ids absent from `siblings` are
/// skipped. `updated_at` is left alone. Returns the number of pages written.
pub fn apply(
    repository: &dyn PageRepository,
    siblings: &[Page],
    assignments: &Assignments,
) -> Result<usize, PageError> {
    let mut written = 0;
    for sibling in siblings {
        let Some(&order) = assignments.get(&sibling.id) else {
            continue;
        };
        if order == sibling.order {
            continue;
        }
        let mut page = sibling.clone();
        page.order = order;
        repository.update(page)?;
        written += 1;
    }
    if written > 0 {
        tracing::debug!(written, "Sibling orders shifted");
    }
    Ok(written)
}
