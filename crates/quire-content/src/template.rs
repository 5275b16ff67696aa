//! Inline `${...}` template expressions.
//!
//! Expressions are dotted paths into a JSON context, e.g. `${api.metadata.owner}`
//! against `{"api": {"metadata": {"owner": "payments"}}}`. Array elements are
//! addressed by index (`${api.tags.0}`).

use serde_json::Value;

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Template evaluation mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TemplateMode {
    /// Any expression failure aborts evaluation.
    #[default]
    Strict,
    /// Failing expressions evaluate to an empty string.
    Lenient,
}

/// Template evaluation error.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// Path does not exist in the context.
    #[error("Unknown property `{0}`")]
    UnknownProperty(String),
    /// Expression is empty or not a dotted path.
    #[error("Invalid expression `{0}`")]
    InvalidExpression(String),
    /// `${` without a closing brace.
    #[error("Unterminated expression at offset {0}")]
    Unterminated(usize),
    /// Path resolves to an object or an array.
    #[error("Property `{0}` is not a scalar value")]
    NotScalar(String),
}

/// Resolves a single expression against a context.
pub trait TemplateResolver: Send + Sync {
    /// Resolve the expression found between `${` and `}`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the expression cannot be resolved.
    fn resolve(&self, expression: &str, context: &Value) -> Result<String, TemplateError>;
}

/// Dotted-path resolver over a JSON context.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathResolver;

impl PathResolver {
    fn is_valid_segment(segment: &str) -> bool {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl TemplateResolver for PathResolver {
    fn resolve(&self, expression: &str, context: &Value) -> Result<String, TemplateError> {
        let path = expression.trim();
        if !path.split('.').all(Self::is_valid_segment) {
            return Err(TemplateError::InvalidExpression(expression.to_owned()));
        }

        let mut current = context;
        for segment in path.split('.') {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| TemplateError::UnknownProperty(path.to_owned()))?;
        }

        match current {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            Value::Array(_) | Value::Object(_) => Err(TemplateError::NotScalar(path.to_owned())),
        }
    }
}

/// Evaluate every `${...}` expression of a template.
///
/// In lenient mode this never fails: failing expressions become `""` and an
/// unterminated `${` is kept as literal text.
///
/// # Errors
///
/// Returns the first [`TemplateError`] in strict mode.
pub fn evaluate(
    template: &str,
    context: &Value,
    resolver: &dyn TemplateResolver,
    mode: TemplateMode,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let body_start = start + OPEN.len();
        let Some(len) = rest[body_start..].find(CLOSE) else {
            if mode == TemplateMode::Strict {
                return Err(TemplateError::Unterminated(offset + start));
            }
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let expression = &rest[body_start..body_start + len];
        match resolver.resolve(expression, context) {
            Ok(value) => out.push_str(&value),
            Err(e) if mode == TemplateMode::Strict => return Err(e),
            Err(e) => tracing::debug!(expression, error = %e, "Template expression skipped"),
        }

        let consumed = body_start + len + CLOSE.len_utf8();
        offset += consumed;
        rest = &rest[consumed..];
    }

    out.push_str(rest);
    Ok(out)
}
