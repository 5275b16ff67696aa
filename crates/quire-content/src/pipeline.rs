//! Content safety pipeline: template resolution, then HTML inspection.

use std::sync::Arc;

use serde_json::Value;

use crate::sanitize::{AllowListSanitizer, HtmlSanitizer, SafetyVerdict};
use crate::template::{self, PathResolver, TemplateError, TemplateMode, TemplateResolver};

/// Content rejected by the pipeline.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// Template expression could not be evaluated.
    #[error("Template processing failed: {0}")]
    Template(#[from] TemplateError),
    /// Resolved content failed the HTML policy.
    #[error("Content is unsafe: {reason}")]
    Unsafe { reason: String },
}

/// Resolves templates, then checks the result against the HTML policy.
///
/// # Example
///
/// ```ignore
/// use quire_content::{ContentSafetyPipeline, TemplateMode};
///
/// let pipeline = ContentSafetyPipeline::default();
/// let html = pipeline.process("Owner: ${api.owner}", &context, TemplateMode::Strict)?;
/// ```
#[derive(Clone)]
pub struct ContentSafetyPipeline {
    resolver: Arc<dyn TemplateResolver>,
    sanitizer: Arc<dyn HtmlSanitizer>,
    sanitize: bool,
}

impl Default for ContentSafetyPipeline {
    fn default() -> Self {
        Self::new(Arc::new(PathResolver), Arc::new(AllowListSanitizer::new()))
    }
}

impl std::fmt::Debug for ContentSafetyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSafetyPipeline")
            .field("sanitize", &self.sanitize)
            .finish_non_exhaustive()
    }
}

impl ContentSafetyPipeline {
    /// Create a pipeline with sanitization enabled.
    #[must_use]
    pub fn new(resolver: Arc<dyn TemplateResolver>, sanitizer: Arc<dyn HtmlSanitizer>) -> Self {
        Self {
            resolver,
            sanitizer,
            sanitize: true,
        }
    }

    /// Toggle the HTML inspection step.
    #[must_use]
    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Resolve templates in `content` and inspect the result.
    ///
    /// Returns the resolved content. An unsafe verdict is fatal in every mode.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Template`] on template failures in strict mode
    /// and [`ContentError::Unsafe`] when the HTML policy rejects the result.
    pub fn process(
        &self,
        content: &str,
        context: &Value,
        mode: TemplateMode,
    ) -> Result<String, ContentError> {
        let resolved = template::evaluate(content, context, self.resolver.as_ref(), mode)?;

        if self.sanitize
            && let SafetyVerdict::Unsafe { reason } = self.sanitizer.inspect(&resolved)
        {
            tracing::debug!(reason = %reason, "Content rejected by HTML policy");
            return Err(ContentError::Unsafe { reason });
        }

        Ok(resolved)
    }

    /// Resolve templates leniently for display. Never fails.
    #[must_use]
    pub fn render(&self, content: &str, context: &Value) -> String {
        template::evaluate(content, context, self.resolver.as_ref(), TemplateMode::Lenient)
            .unwrap_or_else(|_| content.to_owned())
    }
}
