//! Fetcher capability and registry.
//!
//! A [`Fetcher`] retrieves the remote content of a page source. Fetchers are
//! registered in a [`FetcherRegistry`] under the source type they serve
//! (`source.type`, e.g. "http" or "file").
//!
//! Every call made through the registry runs on a helper thread and is
//! abandoned once its deadline passes, so a stalled fetcher cannot block the
//! caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use quire_store::PageSource;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetch request handed to a fetcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Fetcher-specific source configuration.
    pub config: BTreeMap<String, String>,
    /// Deadline of the call.
    pub timeout: Duration,
}

impl FetchRequest {
    /// Configuration value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Required configuration value.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidConfig`] if the key is missing or empty.
    pub fn require(&self, key: &str) -> Result<&str, FetchError> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FetchError::InvalidConfig(format!("missing `{key}`")))
    }
}

/// Content returned by a fetcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResource {
    pub content: String,
}

/// Fetch failure.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    /// Source reports the resource as gone.
    #[error("Resource not found: {0}")]
    NotFound(String),
    /// Call did not complete before its deadline.
    #[error("Fetch timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// Source configuration is incomplete or malformed.
    #[error("Invalid source configuration: {0}")]
    InvalidConfig(String),
    /// No fetcher is registered for the source type.
    #[error("No fetcher registered for source type `{0}`")]
    Unsupported(String),
    /// Remote returned an error status.
    #[error("HTTP error: {status}")]
    Http { status: u16 },
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Transport failure (connection, TLS, protocol).
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Retrieves the remote content of a page source.
pub trait Fetcher: Send + Sync {
    /// Fetch the resource described by the request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the resource cannot be retrieved.
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedResource, FetchError>;
}

/// Fetchers indexed by source type.
#[derive(Clone)]
pub struct FetcherRegistry {
    fetchers: HashMap<String, Arc<dyn Fetcher>>,
    timeout: Duration,
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self {
            fetchers: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for FetcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&String> = self.fetchers.keys().collect();
        kinds.sort();
        f.debug_struct("FetcherRegistry")
            .field("kinds", &kinds)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FetcherRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fetcher for a source type.
    #[must_use]
    pub fn with_fetcher(mut self, kind: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetchers.insert(kind.into(), fetcher);
        self
    }

    /// Set the per-call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-call deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True if a fetcher serves the source type.
    #[must_use]
    pub fn supports(&self, kind: &str) -> bool {
        self.fetchers.contains_key(kind)
    }

    /// Fetch a page source with the registry deadline.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Unsupported`] for unknown source types,
    /// [`FetchError::Timeout`] when the deadline passes, and any error the
    /// fetcher reports.
    pub fn fetch(&self, source: &PageSource) -> Result<FetchedResource, FetchError> {
        let fetcher = self
            .fetchers
            .get(&source.kind)
            .ok_or_else(|| FetchError::Unsupported(source.kind.clone()))?;
        let request = FetchRequest {
            config: source.config.clone(),
            timeout: self.timeout,
        };
        call_with_deadline(Arc::clone(fetcher), request)
    }
}

/// Run a fetch on a helper thread and wait at most `request.timeout`.
///
/// A call that misses its deadline keeps running detached; its result is
/// dropped.
fn call_with_deadline(
    fetcher: Arc<dyn Fetcher>,
    request: FetchRequest,
) -> Result<FetchedResource, FetchError> {
    let timeout = request.timeout;
    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("quire-fetch".to_owned())
        .spawn(move || {
            // Receiver is gone when the deadline passed.
            let _ = tx.send(fetcher.fetch(&request));
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(FetchError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(FetchError::Transport(
            "fetcher thread exited without a result".into(),
        )),
    }
}
