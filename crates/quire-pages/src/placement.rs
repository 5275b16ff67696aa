//! Parent/child type compatibility.
//!
//! A page's [`ParentPlacement`] describes where it sits: top level, or under a
//! parent of some kind. [`check_placement`] is the full compatibility matrix.

use quire_store::{Page, PageType};

use crate::error::PageError;

/// Kind of location a page is placed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentPlacement {
    /// No parent.
    TopLevel,
    /// Directly under a SYSTEM_FOLDER.
    SystemFolder,
    /// Under a FOLDER that sits directly in a SYSTEM_FOLDER.
    FolderInSystemFolder,
    /// Under any other FOLDER.
    Folder,
    /// Under a MARKDOWN, MARKDOWN_TEMPLATE, SWAGGER or ASCIIDOC page.
    Document,
    Link,
    Root,
    Translation,
}

impl ParentPlacement {
    /// Placement under `parent`, whose own parent is `grandparent`.
    #[must_use]
    pub fn of(parent: Option<&Page>, grandparent: Option<&Page>) -> Self {
        let Some(parent) = parent else {
            return Self::TopLevel;
        };
        match parent.page_type {
            PageType::SystemFolder => Self::SystemFolder,
            PageType::Folder
                if grandparent.is_some_and(|g| g.page_type == PageType::SystemFolder) =>
            {
                Self::FolderInSystemFolder
            }
            PageType::Folder => Self::Folder,
            PageType::Markdown
            | PageType::MarkdownTemplate
            | PageType::Swagger
            | PageType::Asciidoc => Self::Document,
            PageType::Link => Self::Link,
            PageType::Root => Self::Root,
            PageType::Translation => Self::Translation,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::TopLevel => "top level",
            Self::SystemFolder => "a system folder",
            Self::FolderInSystemFolder => "a folder of a system folder",
            Self::Folder => "a folder",
            Self::Document => "a document",
            Self::Link => "a link",
            Self::Root => "a root page",
            Self::Translation => "a translation",
        }
    }
}

/// Check that a page of `page_type` may live at `placement`.
///
/// # Errors
///
/// Returns [`PageError::PageFolderAction`] for a folder nested in a folder of a
/// system folder and [`PageError::PageAction`] for every other violation.
pub fn check_placement(page_type: PageType, placement: ParentPlacement) -> Result<(), PageError> {
    use ParentPlacement as P;

    match (page_type, placement) {
        (PageType::Root | PageType::SystemFolder, P::TopLevel)
        | (PageType::Folder, P::TopLevel | P::Folder | P::SystemFolder)
        | (
            PageType::Markdown
            | PageType::MarkdownTemplate
            | PageType::Swagger
            | PageType::Asciidoc
            | PageType::Link,
            P::TopLevel | P::Folder,
        )
        | (
            PageType::Translation,
            P::Folder | P::FolderInSystemFolder | P::Document | P::Link,
        ) => Ok(()),

        (PageType::Root, _) => Err(PageError::action(page_type, "have a parent")),
        (PageType::SystemFolder, _) => Err(PageError::action(
            page_type,
            "be placed anywhere other than at top level",
        )),

        (PageType::Folder, P::FolderInSystemFolder) => Err(PageError::folder(
            "be created in a folder of a system folder",
        )),
        (PageType::Folder, P::Document | P::Link | P::Root | P::Translation) => Err(
            PageError::action(page_type, format!("be placed under {}", placement.describe())),
        ),

        (
            PageType::Markdown
            | PageType::MarkdownTemplate
            | PageType::Swagger
            | PageType::Asciidoc
            | PageType::Link,
            P::SystemFolder | P::FolderInSystemFolder,
        ) => Err(PageError::action(
            page_type,
            "be placed in a system folder or in a folder of a system folder",
        )),
        (
            PageType::Markdown
            | PageType::MarkdownTemplate
            | PageType::Swagger
            | PageType::Asciidoc
            | PageType::Link,
            P::Document | P::Link | P::Root | P::Translation,
        ) => Err(PageError::action(
            page_type,
            format!("be placed under {}", placement.describe()),
        )),

        (PageType::Translation, P::TopLevel) => {
            Err(PageError::action(page_type, "have no parent"))
        }
        (PageType::Translation, P::Root | P::SystemFolder | P::Translation) => {
            Err(PageError::action(
                page_type,
                format!(
                    "have {} as parent. Parent must be a FOLDER, LINK, MARKDOWN, SWAGGER or ASCIIDOC page",
                    placement.describe()
                ),
            ))
        }
    }
}

/// Extra rule for moving a folder between system and regular folders.
///
/// A folder living in a system folder may only move to another system folder,
/// and other folders may not move into one.
///
/// # Errors
///
/// Returns [`PageError::PageAction`] when the move crosses that boundary.
pub fn check_folder_move(current: ParentPlacement, target: ParentPlacement) -> Result<(), PageError> {
    let in_system = current == ParentPlacement::SystemFolder;
    let to_system = target == ParentPlacement::SystemFolder;
    match (in_system, to_system) {
        (true, false) => Err(PageError::action(
            PageType::Folder,
            "be moved anywhere other than in a system folder",
        )),
        (false, true) => Err(PageError::action(
            PageType::Folder,
            "be moved in a system folder",
        )),
        _ => Ok(()),
    }
}
