//! File system fetcher.

use std::io::ErrorKind;
use std::path::PathBuf;

use quire_pages::{FetchError, FetchRequest, FetchedResource, Fetcher};

/// Reads page sources below a base directory.
///
/// Configuration keys:
/// - `root`: directory below the base (optional);
/// - `filepath`: file below `root`.
///
/// Paths escaping the base directory are rejected.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base: PathBuf,
}

impl FileFetcher {
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, request: &FetchRequest) -> Result<PathBuf, FetchError> {
        let filepath = request.require("filepath")?;
        let mut path = self.base.clone();
        if let Some(root) = request.get("root").filter(|r| !r.is_empty()) {
            path.push(root.trim_start_matches('/'));
        }
        path.push(filepath.trim_start_matches('/'));

        let base = self.base.canonicalize()?;
        let resolved = match path.canonicalize() {
            Ok(resolved) => resolved,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FetchError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !resolved.starts_with(&base) {
            return Err(FetchError::InvalidConfig(format!(
                "`{filepath}` is outside of {}",
                self.base.display()
            )));
        }
        Ok(resolved)
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedResource, FetchError> {
        let path = self.resolve(request)?;
        tracing::debug!(path = %path.display(), "Reading page source");
        let content = std::fs::read_to_string(&path)?;
        Ok(FetchedResource { content })
    }
}
