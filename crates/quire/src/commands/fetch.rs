//! `quire fetch` command implementation.

use clap::Args;
use quire_config::CliSettings;

use super::{CommonArgs, Workspace};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the fetch command.
#[derive(Args)]
pub(crate) struct FetchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Id of the page to refetch.
    page_id: String,

    /// Contributor recorded on the updated page.
    #[arg(long)]
    contributor: Option<String>,
}

impl FetchArgs {
    /// Execute the fetch command.
    ///
    /// # Errors
    ///
    /// Returns an error if the page has no source, the fetch fails, or the
    /// snapshot cannot be loaded or saved.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let workspace = Workspace::open(&self.common, CliSettings::default())?;

        let fetched = workspace
            .tree
            .fetch(&workspace.ctx, &self.page_id, self.contributor.as_deref())?;
        workspace.save()?;

        match fetched {
            Some(page) => output.page("Fetched", &page),
            None => output.warning(&format!(
                "Page [{}] was deleted: its source no longer exists.",
                self.page_id
            )),
        }
        Ok(())
    }
}
