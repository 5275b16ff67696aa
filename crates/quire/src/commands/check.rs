//! `quire check` command implementation.

use clap::Args;
use quire_config::CliSettings;
use quire_pages::audit;

use super::{CommonArgs, Workspace};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Validation`] if the snapshot breaks any invariant.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let workspace = Workspace::open(&self.common, CliSettings::default())?;
        let pages = workspace.pages();

        let violations = audit::check(&pages);
        if violations.is_empty() {
            output.success(&format!("{} page(s) checked, no violation found.", pages.len()));
            return Ok(());
        }

        for violation in &violations {
            output.violation(violation);
        }
        Err(CliError::Validation(format!(
            "{} violation(s) found in {} page(s)",
            violations.len(),
            pages.len()
        )))
    }
}
