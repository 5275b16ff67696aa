//! Configuration management for Quire.
//!
//! Parses `quire.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `import.whitelist` entries
//! - `fetch.files_root`
//! - `storage.snapshot`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override snapshot file path.
    pub snapshot: Option<PathBuf>,
    /// Override base directory of the file fetcher.
    pub files_root: Option<PathBuf>,
    /// Override fetch pool size.
    pub max_concurrency: Option<usize>,
    /// Override private address acceptance for sources.
    pub allow_private: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "quire.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_SNAPSHOT: &str = "pages.json";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content safety configuration.
    pub content: ContentConfig,
    /// Source and import safety configuration.
    pub import: ImportConfig,
    /// Fetch configuration (paths are relative strings from TOML).
    fetch: FetchConfigRaw,
    /// Storage configuration (paths are relative strings from TOML).
    storage: StorageConfigRaw,

    /// Resolved fetch configuration (set after loading).
    #[serde(skip)]
    pub fetch_resolved: FetchConfig,
    /// Resolved storage configuration (set after loading).
    #[serde(skip)]
    pub storage_resolved: StorageConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    #[allow(clippy::derivable_impls)]
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Template evaluation mode applied on page writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMode {
    /// Template errors abort the write.
    #[default]
    Strict,
    /// Template errors resolve to an empty string.
    Lenient,
}

/// Content safety configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Whether HTML sanitization runs on page writes.
    pub sanitize: bool,
    /// Template evaluation mode for page writes.
    pub template_mode: TemplateMode,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            sanitize: true,
            template_mode: TemplateMode::Strict,
        }
    }
}

/// Source URL safety configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Accept private, loopback and link-local hosts in sources.
    pub allow_private: bool,
    /// URL prefixes accepted in sources. Empty means "any public host".
    pub whitelist: Vec<String>,
}

/// Raw fetch configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FetchConfigRaw {
    timeout_secs: Option<u64>,
    max_concurrency: Option<usize>,
    files_root: Option<String>,
}

/// Resolved fetch configuration with absolute paths.
#[derive(Debug)]
pub struct FetchConfig {
    /// Deadline of a single fetch call.
    pub timeout: Duration,
    /// Number of fetches running at once.
    pub max_concurrency: usize,
    /// Base directory of the file fetcher.
    pub files_root: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            files_root: PathBuf::from("."),
        }
    }
}

/// Raw storage configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StorageConfigRaw {
    snapshot: Option<String>,
}

/// Resolved storage configuration with absolute paths.
#[derive(Debug)]
pub struct StorageConfig {
    /// JSON snapshot holding pages and revisions.
    pub snapshot: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from(DEFAULT_SNAPSHOT),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`storage.snapshot`").
        field: String,
        /// Error message (e.g., "${`QUIRE_SNAPSHOT`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `quire.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(snapshot) = &settings.snapshot {
            self.storage_resolved.snapshot.clone_from(snapshot);
        }
        if let Some(files_root) = &settings.files_root {
            self.fetch_resolved.files_root.clone_from(files_root);
        }
        if let Some(max_concurrency) = settings.max_concurrency {
            self.fetch_resolved.max_concurrency = max_concurrency;
        }
        if let Some(allow_private) = settings.allow_private {
            self.import.allow_private = allow_private;
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            content: ContentConfig::default(),
            import: ImportConfig::default(),
            fetch: FetchConfigRaw::default(),
            storage: StorageConfigRaw::default(),
            fetch_resolved: FetchConfig {
                files_root: base.to_path_buf(),
                ..FetchConfig::default()
            },
            storage_resolved: StorageConfig {
                snapshot: base.join(DEFAULT_SNAPSHOT),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_import()?;
        self.validate_fetch()?;
        Ok(())
    }

    fn validate_import(&self) -> Result<(), ConfigError> {
        for entry in &self.import.whitelist {
            require_non_empty(entry, "import.whitelist")?;
            require_http_url(entry, "import.whitelist")?;
        }
        Ok(())
    }

    fn validate_fetch(&self) -> Result<(), ConfigError> {
        const MAX_TIMEOUT: Duration = Duration::from_secs(3600);

        let fetch = &self.fetch_resolved;
        if fetch.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if fetch.timeout > MAX_TIMEOUT {
            return Err(ConfigError::Validation(format!(
                "fetch.timeout_secs cannot exceed {}",
                MAX_TIMEOUT.as_secs()
            )));
        }
        if fetch.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "fetch.max_concurrency must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.import.whitelist = self
            .import
            .whitelist
            .iter()
            .map(|entry| expand::expand_env(entry, "import.whitelist"))
            .collect::<Result<_, _>>()?;

        if let Some(ref root) = self.fetch.files_root {
            self.fetch.files_root = Some(expand::expand_env(root, "fetch.files_root")?);
        }
        if let Some(ref snapshot) = self.storage.snapshot {
            self.storage.snapshot = Some(expand::expand_env(snapshot, "storage.snapshot")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.fetch_resolved = FetchConfig {
            timeout: Duration::from_secs(self.fetch.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            max_concurrency: self
                .fetch
                .max_concurrency
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            files_root: config_dir.join(self.fetch.files_root.as_deref().unwrap_or(".")),
        };
        self.storage_resolved = StorageConfig {
            snapshot: config_dir.join(self.storage.snapshot.as_deref().unwrap_or(DEFAULT_SNAPSHOT)),
        };
    }
}
