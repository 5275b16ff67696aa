//! Built-in page source fetchers.
//!
//! - [`FileFetcher`] serves `type = "file"` sources from a local directory.
//! - [`HttpFetcher`] serves `type = "http"` sources with a GET request.
//!
//! [`default_registry`] registers both under their source types.

mod file;
mod http;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quire_pages::FetcherRegistry;

pub use file::FileFetcher;
pub use http::HttpFetcher;

/// Source type served by [`FileFetcher`].
pub const FILE_SOURCE: &str = "file";
/// Source type served by [`HttpFetcher`].
pub const HTTP_SOURCE: &str = "http";

/// Registry with the file and HTTP fetchers.
#[must_use]
pub fn default_registry(files_root: impl Into<PathBuf>, timeout: Duration) -> FetcherRegistry {
    FetcherRegistry::new()
        .with_fetcher(FILE_SOURCE, Arc::new(FileFetcher::new(files_root)))
        .with_fetcher(HTTP_SOURCE, Arc::new(HttpFetcher::new(timeout)))
        .with_timeout(timeout)
}

/// Join a base location and a relative file path with a single `/`.
pub(crate) fn join_path(base: &str, filepath: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        filepath.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("https://x.io/docs/", "/a.md"), "https://x.io/docs/a.md");
        assert_eq!(join_path("https://x.io/docs", "a.md"), "https://x.io/docs/a.md");
    }

    #[test]
    fn test_default_registry() {
        let registry = default_registry(".", Duration::from_secs(3));

        assert!(registry.supports(FILE_SOURCE));
        assert!(registry.supports(HTTP_SOURCE));
        assert_eq!(registry.timeout(), Duration::from_secs(3));
    }
}
