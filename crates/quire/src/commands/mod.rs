//! CLI command implementations.
//!
//! Every command works on a JSON snapshot of the page and revision stores,
//! loaded into the in-memory backends and written back after mutations.

pub(crate) mod autofetch;
pub(crate) mod check;
pub(crate) mod fetch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use quire_config::{CliSettings, Config};
use quire_content::{ContentSafetyPipeline, TemplateMode};
use quire_pages::{ExecutionContext, ImportSettings, PageTree};
use quire_store::{MemoryRepository, MemoryRevisionStore, Page, Snapshot};

use crate::error::CliError;

pub(crate) use autofetch::AutofetchArgs;
pub(crate) use check::CheckArgs;
pub(crate) use fetch::FetchArgs;

/// Arguments shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover quire.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file holding pages and revisions (overrides config).
    #[arg(short, long, env = "QUIRE_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Organization the command runs in.
    #[arg(long, default_value = "DEFAULT")]
    organization: String,

    /// Environment providing the portal scope and the template context.
    #[arg(short, long, default_value = "DEFAULT")]
    environment: String,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Page tree over a loaded snapshot.
pub(crate) struct Workspace {
    pub(crate) tree: Arc<PageTree>,
    pub(crate) config: Config,
    pub(crate) ctx: ExecutionContext,
    repository: Arc<MemoryRepository>,
    revisions: Arc<MemoryRevisionStore>,
}

impl Workspace {
    /// Load configuration and snapshot.
    pub(crate) fn open(common: &CommonArgs, settings: CliSettings) -> Result<Self, CliError> {
        let settings = CliSettings {
            snapshot: settings.snapshot.or_else(|| common.snapshot.clone()),
            ..settings
        };
        let config = Config::load(common.config.as_deref(), Some(&settings))?;
        let snapshot = read_snapshot(&config.storage_resolved.snapshot)?;
        let (repository, revisions) = snapshot.into_backends();
        let repository = Arc::new(repository);
        let revisions = Arc::new(revisions);
        let tree = Arc::new(build_tree(&config, &repository, &revisions));

        Ok(Self {
            tree,
            config,
            ctx: ExecutionContext::new(&common.organization, &common.environment),
            repository,
            revisions,
        })
    }

    pub(crate) fn pages(&self) -> Vec<Page> {
        self.repository.pages()
    }

    /// Write the stores back to the snapshot file.
    pub(crate) fn save(&self) -> Result<(), CliError> {
        let path = &self.config.storage_resolved.snapshot;
        let json = Snapshot::capture(&self.repository, &self.revisions).to_json()?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), "Snapshot saved");
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot, CliError> {
    if !path.exists() {
        return Err(CliError::Validation(format!(
            "snapshot not found: {}",
            path.display()
        )));
    }
    let json = std::fs::read_to_string(path)?;
    Ok(Snapshot::from_json(&json)?)
}

fn build_tree(
    config: &Config,
    repository: &Arc<MemoryRepository>,
    revisions: &Arc<MemoryRevisionStore>,
) -> PageTree {
    let fetch = &config.fetch_resolved;
    PageTree::new(Arc::clone(repository) as _, Arc::clone(revisions) as _)
        .with_pipeline(ContentSafetyPipeline::default().with_sanitize(config.content.sanitize))
        .with_template_mode(template_mode(config.content.template_mode))
        .with_fetchers(quire_fetch::default_registry(fetch.files_root.clone(), fetch.timeout))
        .with_import_settings(ImportSettings {
            allow_private: config.import.allow_private,
            whitelist: config.import.whitelist.clone(),
        })
}

fn template_mode(mode: quire_config::TemplateMode) -> TemplateMode {
    match mode {
        quire_config::TemplateMode::Strict => TemplateMode::Strict,
        quire_config::TemplateMode::Lenient => TemplateMode::Lenient,
    }
}
