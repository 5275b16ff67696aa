//! Page tree engine for API and portal documentation.
//!
//! [`PageTree`] is the single entry point for page mutations. It keeps the
//! tree invariants over any [`quire_store::PageRepository`]:
//!
//! - placement rules per page type, including system folders;
//! - contiguous 1-based sibling order through [`ordering`];
//! - link and translation consistency, with the publication cascade;
//! - content safety through [`quire_content::ContentSafetyPipeline`];
//! - revisions of document pages.
//!
//! [`FetchScheduler`] refreshes pages with an auto-fetch source on their cron
//! schedule. [`audit::check`] verifies a set of pages offline.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use quire_pages::{ExecutionContext, NewPage, PageTree};
//! use quire_store::{MemoryRepository, MemoryRevisionStore, PageType, Reference};
//!
//! let tree = PageTree::new(
//!     Arc::new(MemoryRepository::new()),
//!     Arc::new(MemoryRevisionStore::new()),
//! );
//! let ctx = ExecutionContext::new("DEFAULT", "DEFAULT");
//! let page = tree.create(
//!     &ctx,
//!     &Reference::api("payments"),
//!     NewPage::new(PageType::Markdown, "Getting started").with_content("# Hello"),
//! )?;
//! ```

pub mod audit;
pub mod cascade;
pub mod collaborators;
mod context;
pub mod descriptor;
mod error;
pub mod fetch;
pub mod guard;
mod input;
pub mod ordering;
pub mod placement;
pub mod revision;
pub mod scheduler;
pub mod source_policy;
mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use collaborators::{
    CategoryQuery, CategorySummary, Clock, EmptyTemplateContext, ManualClock, NoCategories,
    NoPlans, PlanQuery, PlanStatus, PlanSummary, SystemClock, TemplateContextProvider,
};
pub use context::ExecutionContext;
pub use error::{ErrorClass, PageError};
pub use fetch::{FetchError, FetchRequest, FetchedResource, Fetcher, FetcherRegistry};
pub use input::{NewPage, PagePatch};
pub use scheduler::{FetchScheduler, FetchScope};
pub use source_policy::ImportSettings;
pub use tree::{ImportSource, PageTree};
