//! Page model and repository abstraction for the Quire page tree engine.
//!
//! This crate provides the [`PageRepository`] and [`RevisionStore`] traits that
//! decouple the page tree engine from the persistence backend. This enables:
//!
//! - **Unit testing** against an in-memory store
//! - **Backend flexibility** (row store, key-value store, document database)
//! - **Clean separation** between tree invariants and I/O
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Page`], [`Revision`] and the closed [`PageType`] enum
//! - [`PageRepository`] trait with `find_by_id()`, `search()`, `create()`, `update()`, `delete()`
//! - [`PageCriteria`] filter builder consumed by `search()`
//! - [`MemoryRepository`] / [`MemoryRevisionStore`] in-memory backends
//!
//! Pages live in a flat table keyed by id. `parent_id` and link targets are
//! weak references resolved at read time, never embedded child pointers.
//!
//! # Example
//!
//! ```ignore
//! use quire_store::{MemoryRepository, PageCriteria, PageRepository, PageType};
//!
//! let repository = MemoryRepository::new();
//! let folders = repository.search(&PageCriteria::new().page_type(PageType::Folder))?;
//! for folder in folders {
//!     println!("{}: {}", folder.id, folder.name);
//! }
//! ```

mod memory;
mod model;
mod repository;

pub use memory::{MemoryRepository, MemoryRevisionStore, Snapshot};
pub use model::{
    LinkResourceType, LinkTarget, Page, PageMedia, PageSource, PageType, Reference,
    ReferenceType, Revision, Visibility, config_keys, deterministic_page_id, random_page_id,
};
pub use repository::{
    ErrorStatus, PageCriteria, PageRepository, ParentFilter, RepositoryError,
    RepositoryErrorKind, RevisionStore,
};
