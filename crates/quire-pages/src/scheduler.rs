//! Cron-driven refresh of sourced pages.
//!
//! [`FetchScheduler::run_once`] is meant to be called from a single timer or
//! an ops script. Each call lists the auto-fetch pages of a scope, fetches the
//! due ones in parallel on a bounded pool, then stores the results one by one
//! through the regular update path. A failure for one page is logged and the
//! page is skipped.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use quire_store::{Page, PageCriteria, Reference};
use rayon::prelude::*;

use crate::context::ExecutionContext;
use crate::error::PageError;
use crate::fetch::{FetchError, FetchedResource};
use crate::tree::PageTree;

const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Next fire time of a 6-field cron expression strictly after `after`.
///
/// Returns `None` for a schedule that never fires again.
///
/// # Errors
///
/// Returns [`PageError::Technical`] for an invalid expression.
pub fn next_fire_time(
    expression: &str,
    after: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, PageError> {
    let schedule = cron::Schedule::from_str(expression).map_err(|e| {
        PageError::technical_with(format!("Invalid fetch cron [{expression}]"), e)
    })?;
    Ok(schedule.after(&after).next())
}

/// True if the page has an auto-fetch source whose cron fired since the page
/// was last updated.
///
/// Pages without a cron, or with an invalid one, are never due.
#[must_use]
pub fn is_due(page: &Page, now: DateTime<Utc>) -> bool {
    if !page.has_auto_fetch_source() {
        return false;
    }
    let Some(expression) = page
        .source
        .as_ref()
        .and_then(|s| s.fetch_cron.as_deref())
        .filter(|c| !c.trim().is_empty())
    else {
        return false;
    };
    match next_fire_time(expression, page.updated_at) {
        Ok(Some(next)) => now >= next,
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(page_id = %page.id, error = %e, "Skipping page with invalid cron");
            false
        }
    }
}

/// Pages a scheduler run looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FetchScope {
    /// Every reference scope.
    #[default]
    All,
    /// Only the listed reference scopes.
    References(Vec<Reference>),
}

/// Periodic fetcher of auto-fetch pages.
#[derive(Debug)]
pub struct FetchScheduler {
    tree: Arc<PageTree>,
    max_concurrency: usize,
}

impl FetchScheduler {
    #[must_use]
    pub fn new(tree: Arc<PageTree>) -> Self {
        Self {
            tree,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Bound the number of concurrent fetches. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Fetch every due page of `scope` and store the results.
    ///
    /// Returns the number of pages updated. Pages whose source reports the
    /// resource as gone are deleted and not counted.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Technical`] if the candidate pages cannot be
    /// listed or the fetch pool cannot be created. Per-page failures are
    /// logged, not returned.
    pub fn run_once(&self, ctx: &ExecutionContext, scope: &FetchScope) -> Result<usize, PageError> {
        let now = self.tree.now();
        let due: Vec<Page> = self
            .candidates(scope)?
            .into_iter()
            .filter(|page| is_due(page, now))
            .collect();
        if due.is_empty() {
            tracing::debug!("No page due for fetch");
            return Ok(0);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_concurrency)
            .build()
            .map_err(|e| PageError::technical_with("Failed to create fetch pool", e))?;
        let fetched: Vec<(Page, Result<FetchedResource, FetchError>)> = pool.install(|| {
            due.into_par_iter()
                .map(|page| {
                    let result = match page.source.as_ref() {
                        Some(source) => self.tree.fetch_source(source),
                        None => Err(FetchError::InvalidConfig("missing source".to_owned())),
                    };
                    (page, result)
                })
                .collect()
        });

        let total = fetched.len();
        let mut updated = 0;
        let mut failed = 0;
        for (page, result) in fetched {
            match self.tree.apply_fetched(ctx, &page.id, result, None) {
                Ok(Some(_)) => updated += 1,
                Ok(None) => tracing::debug!(page_id = %page.id, "Page gone after fetch"),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(page_id = %page.id, error = %e, "Scheduled fetch failed, skipping page");
                }
            }
        }

        tracing::info!(due = total, updated, failed, "Scheduled fetch completed");
        Ok(updated)
    }

    fn candidates(&self, scope: &FetchScope) -> Result<Vec<Page>, PageError> {
        let criteria = PageCriteria::new().auto_fetch(true);
        match scope {
            FetchScope::All => self.tree.search(&criteria),
            FetchScope::References(references) => {
                let mut seen = HashSet::new();
                let mut pages = Vec::new();
                for reference in references {
                    if !seen.insert(reference) {
                        continue;
                    }
                    pages.extend(self.tree.search(&criteria.clone().reference(reference.clone()))?);
                }
                Ok(pages)
            }
        }
    }
}
