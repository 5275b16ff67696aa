//! `quire autofetch` command implementation.
//!
//! Without `--api` every auto-fetch page of the snapshot is considered,
//! whatever its environment. `--environment` does not filter pages: it only
//! names the portal scope added by `--portal` and the context that resolves
//! templates of every fetched page.

use std::sync::Arc;

use clap::Args;
use quire_config::CliSettings;
use quire_pages::{FetchScheduler, FetchScope};
use quire_store::Reference;

use super::{CommonArgs, Workspace};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the autofetch command.
#[derive(Args)]
pub(crate) struct AutofetchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only fetch pages of this API (repeatable). Without it, pages of every
    /// API and environment are fetched.
    #[arg(long = "api")]
    apis: Vec<String>,

    /// Also fetch the environment's portal pages when `--api` is given.
    #[arg(long)]
    portal: bool,

    /// Number of fetches running at once (overrides config).
    #[arg(long)]
    max_concurrency: Option<usize>,
}

impl AutofetchArgs {
    /// Execute the autofetch command.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded or saved.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let settings = CliSettings {
            max_concurrency: self.max_concurrency,
            ..CliSettings::default()
        };
        let workspace = Workspace::open(&self.common, settings)?;

        let scope = self.scope(&workspace);
        let scheduler = FetchScheduler::new(Arc::clone(&workspace.tree))
            .with_max_concurrency(workspace.config.fetch_resolved.max_concurrency);
        let updated = scheduler.run_once(&workspace.ctx, &scope)?;
        workspace.save()?;

        if updated == 0 {
            output.info("No page was due for fetch.");
        } else {
            output.success(&format!("Updated {updated} page(s)."));
        }
        Ok(())
    }

    fn scope(&self, workspace: &Workspace) -> FetchScope {
        if self.apis.is_empty() {
            return FetchScope::All;
        }
        let mut references: Vec<Reference> = self.apis.iter().map(Reference::api).collect();
        if self.portal {
            references.push(workspace.ctx.portal_reference());
        }
        FetchScope::References(references)
    }
}
