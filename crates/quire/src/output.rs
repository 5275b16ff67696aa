//! Colored terminal output for quire commands.
//!
//! Everything goes to stderr; stdout stays free for scripting.

use console::{Style, Term};
use quire_pages::audit::Violation;
use quire_store::Page;

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print `verb` followed by the page label, then its reference scope dimmed.
    pub(crate) fn page(&self, verb: &str, page: &Page) {
        let line = format!(
            "{} {}",
            self.green.apply_to(format!("{verb} {}", page_label(page))),
            self.dim.apply_to(format!("({})", page.reference))
        );
        let _ = self.term.write_line(&line);
    }

    /// Print one audit violation as a list item.
    pub(crate) fn violation(&self, violation: &Violation) {
        let _ = self
            .term
            .write_line(&format!("  {} {violation}", self.yellow.apply_to("-")));
    }
}

/// `TYPE "name" [id]` label of a page.
pub(crate) fn page_label(page: &Page) -> String {
    format!("{} \"{}\" [{}]", page.page_type, page.name, page.id)
}
