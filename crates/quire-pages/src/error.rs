//! Page engine error types.

use quire_content::{ContentError, TemplateError};
use quire_store::{PageType, RepositoryError};

use crate::fetch::FetchError;

/// Error category, used by callers to map errors to responses and retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected request. Never retried.
    Validation,
    /// Content failed the HTML policy.
    Safety,
    /// Template expression failed.
    Templating,
    /// Page is referenced by a plan or a category.
    Conflict,
    /// Page or fetcher missing.
    NotFound,
    /// Source URL rejected.
    Forbidden,
    /// Storage or fetch failure. Retryable by the caller.
    Technical,
}

/// Error from page tree operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PageError {
    /// Page does not exist.
    #[error("Page [{0}] can not be found")]
    PageNotFound(String),

    /// Operation not allowed for this page type.
    #[error("A {page_type} page can not {reason}")]
    PageAction {
        page_type: PageType,
        reason: String,
    },

    /// Operation not allowed on a folder.
    #[error("A folder can not {0}")]
    PageFolderAction(String),

    /// Content rejected by the HTML policy.
    #[error("Page content is unsafe: {0}")]
    ContentUnsafe(String),

    /// Template expression could not be evaluated.
    #[error("Template processing failed")]
    TemplateProcessing(#[source] TemplateError),

    /// Source URL is not allowed.
    #[error("URL [{0}] is forbidden")]
    UrlForbidden(String),

    /// Page is the general conditions of a plan.
    #[error("Page [{page_name}] can not be {action} because it is used as general conditions of plan [{plan_name}]")]
    UsedAsGeneralConditions {
        page_id: String,
        page_name: String,
        action: &'static str,
        plan_name: String,
    },

    /// Page is referenced by categories.
    #[error("Page [{page_name}] can not be {action} because it is used by categories [{}]", .categories.join(", "))]
    UsedByCategory {
        page_id: String,
        page_name: String,
        action: &'static str,
        categories: Vec<String>,
    },

    /// Page has no source to fetch.
    #[error("No fetcher defined for page [{0}]")]
    NoFetcherDefined(String),

    /// Storage, fetch or configuration failure.
    #[error("{message}")]
    Technical {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PageError {
    pub(crate) fn action(page_type: PageType, reason: impl Into<String>) -> Self {
        Self::PageAction {
            page_type,
            reason: reason.into(),
        }
    }

    pub(crate) fn folder(reason: impl Into<String>) -> Self {
        Self::PageFolderAction(reason.into())
    }

    /// Technical error without an underlying source.
    pub fn technical(message: impl Into<String>) -> Self {
        Self::Technical {
            message: message.into(),
            source: None,
        }
    }

    /// Technical error wrapping an underlying source.
    pub fn technical_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Technical {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Error category.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PageAction { .. } | Self::PageFolderAction(_) => ErrorClass::Validation,
            Self::ContentUnsafe(_) => ErrorClass::Safety,
            Self::TemplateProcessing(_) => ErrorClass::Templating,
            Self::UsedAsGeneralConditions { .. } | Self::UsedByCategory { .. } => {
                ErrorClass::Conflict
            }
            Self::PageNotFound(_) | Self::NoFetcherDefined(_) => ErrorClass::NotFound,
            Self::UrlForbidden(_) => ErrorClass::Forbidden,
            Self::Technical { .. } => ErrorClass::Technical,
        }
    }
}

impl From<RepositoryError> for PageError {
    fn from(err: RepositoryError) -> Self {
        Self::technical_with(format!("Repository operation failed: {err}"), err)
    }
}

impl From<ContentError> for PageError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Template(e) => Self::TemplateProcessing(e),
            ContentError::Unsafe { reason } => Self::ContentUnsafe(reason),
        }
    }
}

impl From<FetchError> for PageError {
    fn from(err: FetchError) -> Self {
        Self::technical_with(format!("Unable to fetch page source: {err}"), err)
    }
}
