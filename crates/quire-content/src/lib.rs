//! Content safety for Quire pages.
//!
//! Page content may embed `${...}` expressions resolved against a JSON
//! context (for example API metadata) and raw HTML. Before a page is stored,
//! [`ContentSafetyPipeline::process`] resolves the expressions and checks the
//! result against an allow-list [`HtmlSanitizer`].
//!
//! # Example
//!
//! ```ignore
//! use quire_content::{ContentSafetyPipeline, TemplateMode};
//! use serde_json::json;
//!
//! let pipeline = ContentSafetyPipeline::default();
//! let context = json!({"api": {"name": "Payments"}});
//! assert_eq!(
//!     pipeline.process("# ${api.name}", &context, TemplateMode::Strict)?,
//!     "# Payments"
//! );
//! ```

mod pipeline;
mod sanitize;
mod template;

pub use pipeline::{ContentError, ContentSafetyPipeline};
pub use sanitize::{AllowListSanitizer, HtmlSanitizer, SafetyVerdict};
pub use template::{PathResolver, TemplateError, TemplateMode, TemplateResolver, evaluate};
