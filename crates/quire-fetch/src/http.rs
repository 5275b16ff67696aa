//! HTTP fetcher.

use std::time::Duration;

use quire_pages::{FetchError, FetchRequest, FetchedResource, Fetcher};
use ureq::Agent;

use crate::join_path;

/// GETs page sources over HTTP.
///
/// Configuration keys:
/// - `url`: location of the resource, or of the base directory when
///   `filepath` is set;
/// - `filepath`: path appended to `url` (optional).
///
/// `404` and `410` responses map to [`FetchError::NotFound`].
#[derive(Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl HttpFetcher {
    /// Fetcher whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

fn target_url(request: &FetchRequest) -> Result<String, FetchError> {
    let url = request.require("url")?;
    Ok(match request.get("filepath").filter(|p| !p.is_empty()) {
        Some(filepath) => join_path(url, filepath),
        None => url.to_owned(),
    })
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedResource, FetchError> {
        let url = target_url(request)?;
        tracing::debug!(url = %url, "Fetching page source");

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| FetchError::Transport(Box::new(e)))?;

        let status = response.status().as_u16();
        match status {
            404 | 410 => return Err(FetchError::NotFound(url)),
            s if s >= 400 => return Err(FetchError::Http { status }),
            _ => {}
        }

        let content = response
            .into_body()
            .read_to_string()
            .map_err(|e| FetchError::Transport(Box::new(e)))?;
        Ok(FetchedResource { content })
    }
}
