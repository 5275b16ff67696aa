//! Allow-list HTML safety inspection.
//!
//! The sanitizer never rewrites content. Content is parsed as CommonMark and
//! only what a renderer would emit verbatim is inspected: raw HTML blocks,
//! inline HTML and link or image destinations. Code spans and code blocks
//! are escaped on render and never looked at.
//!
//! The first construct that would be stripped is reported:
//! - a tag outside the allow-list;
//! - an inline `on*` event handler;
//! - a `javascript:`, `vbscript:` or `data:text/html` URL, after entity
//!   decoding.

use std::collections::HashSet;
use std::sync::LazyLock;

use pulldown_cmark::{Event, Options, Parser, Tag};
use regex::Regex;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<\s*/?\s*([A-Za-z][A-Za-z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("invalid tag regex")
});

static ATTRIBUTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("invalid attribute regex")
});

/// Numeric character reference, with or without the trailing `;`.
static NUMERIC_ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#([xX][0-9a-fA-F]+|[0-9]+);?").expect("invalid entity regex"));

const URL_ATTRIBUTES: &[&str] = &[
    "action", "background", "formaction", "href", "poster", "src", "xlink:href",
];

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "b", "blockquote", "br", "caption", "center", "cite", "code", "col",
    "colgroup", "dd", "del", "details", "div", "dl", "dt", "em", "figcaption", "figure",
    "font", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "ins", "kbd", "li", "mark",
    "ol", "p", "pre", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "summary",
    "sup", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "tt", "u", "ul", "var",
];

/// Result of an HTML inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SafetyVerdict {
    Safe,
    /// Content would be stripped; `reason` names the offending construct.
    Unsafe { reason: String },
}

impl SafetyVerdict {
    #[must_use]
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe)
    }
}

/// HTML safety inspection.
pub trait HtmlSanitizer: Send + Sync {
    /// Inspect a document and report whether it passes the policy unchanged.
    fn inspect(&self, html: &str) -> SafetyVerdict;
}

/// Tag allow-list sanitizer.
#[derive(Debug, Clone)]
pub struct AllowListSanitizer {
    allowed_tags: HashSet<String>,
}

impl Default for AllowListSanitizer {
    fn default() -> Self {
        Self {
            allowed_tags: DEFAULT_ALLOWED_TAGS.iter().map(|t| (*t).to_owned()).collect(),
        }
    }
}

impl AllowListSanitizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow an additional tag.
    #[must_use]
    pub fn allow_tag(mut self, tag: &str) -> Self {
        self.allowed_tags.insert(tag.to_ascii_lowercase());
        self
    }

    fn parser_options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_GFM
    }

    /// Check every tag of the raw HTML emitted by the document.
    fn inspect_raw_html(&self, html: &str) -> SafetyVerdict {
        for tag in TAG_PATTERN.captures_iter(html) {
            let name = tag[1].to_ascii_lowercase();
            if !self.allowed_tags.contains(&name) {
                return SafetyVerdict::Unsafe {
                    reason: format!("tag <{name}> is not allowed"),
                };
            }

            let attributes = tag.get(2).map_or("", |m| m.as_str());
            for attribute in ATTRIBUTE_PATTERN.captures_iter(attributes) {
                let attr = attribute[1].to_ascii_lowercase();
                let Some(value) = attribute
                    .get(2)
                    .or_else(|| attribute.get(3))
                    .or_else(|| attribute.get(4))
                    .map(|m| m.as_str())
                else {
                    continue;
                };

                if attr.len() > 2 && attr.starts_with("on") {
                    return SafetyVerdict::Unsafe {
                        reason: format!("event handler attribute `{attr}` on <{name}> is not allowed"),
                    };
                }
                if URL_ATTRIBUTES.contains(&attr.as_str())
                    && let Some(scheme) = blocked_scheme(value)
                {
                    return SafetyVerdict::Unsafe {
                        reason: format!("`{scheme}` URL in `{attr}` on <{name}> is not allowed"),
                    };
                }
            }
        }
        SafetyVerdict::Safe
    }
}

impl HtmlSanitizer for AllowListSanitizer {
    fn inspect(&self, content: &str) -> SafetyVerdict {
        let mut raw_html = String::new();

        for event in Parser::new_ext(content, Self::parser_options()) {
            match event {
                Event::Html(html) | Event::InlineHtml(html) => raw_html.push_str(&html),
                Event::Start(Tag::Link { dest_url, .. }) => {
                    if let Some(scheme) = blocked_scheme(&dest_url) {
                        return SafetyVerdict::Unsafe {
                            reason: format!("`{scheme}` URL in link destination is not allowed"),
                        };
                    }
                }
                Event::Start(Tag::Image { dest_url, .. }) => {
                    if let Some(scheme) = blocked_scheme(&dest_url) {
                        return SafetyVerdict::Unsafe {
                            reason: format!("`{scheme}` URL in image source is not allowed"),
                        };
                    }
                }
                _ => {}
            }
        }

        self.inspect_raw_html(&raw_html)
    }
}

/// Blocked scheme of a URL, the way a browser reads it.
///
/// Character references are decoded, whitespace and control characters are
/// dropped and the result is lowercased before matching.
fn blocked_scheme(url: &str) -> Option<&'static str> {
    let terminated = NUMERIC_ENTITY_PATTERN.replace_all(url, "&#$1;");
    let decoded = html_escape::decode_html_entities(&terminated);
    let normalized: String = decoded
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    BLOCKED_SCHEMES
        .iter()
        .copied()
        .find(|scheme| normalized.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn inspect(html: &str) -> SafetyVerdict {
        AllowListSanitizer::new().inspect(html)
    }

    fn reason(html: &str) -> String {
        match inspect(html) {
            SafetyVerdict::Unsafe { reason } => reason,
            SafetyVerdict::Safe => panic!("expected unsafe verdict for {html}"),
        }
    }

    #[test]
    fn test_plain_markdown_is_safe() {
        assert!(inspect("# Title\n\nSome *text* with a [link](https://example.com).").is_safe());
    }

    #[test]
    fn test_allowed_tags_are_safe() {
        assert!(
            inspect(r#"<div class="note"><p>Hi <a href="https://example.com" title='x > y'>there</a></p><br/></div>"#)
                .is_safe()
        );
    }

    #[test]
    fn test_script_tag_is_unsafe() {
        assert_eq!(reason("Hello <script>alert(1)</script>"), "tag <script> is not allowed");
        assert_eq!(reason("<IFRAME src=\"x\"></IFRAME>"), "tag <iframe> is not allowed");
    }

    #[test]
    fn test_event_handler_is_unsafe() {
        assert_eq!(
            reason(r#"<img src="a.png" onerror="alert(1)">"#),
            "event handler attribute `onerror` on <img> is not allowed"
        );
    }

    #[test]
    fn test_javascript_url_is_unsafe() {
        assert_eq!(
            reason(r#"<a href=" javascript:alert(1)">x</a>"#),
            "`javascript:` URL in `href` on <a> is not allowed"
        );
    }

    #[test]
    fn test_entity_encoded_scheme_is_unsafe() {
        assert_eq!(
            reason(r#"<a href="jav&#x61;script:alert(1)">x</a>"#),
            "`javascript:` URL in `href` on <a> is not allowed"
        );
        assert_eq!(
            reason(r#"<img src="&#106avascript&#58;alert(1)">"#),
            "`javascript:` URL in `src` on <img> is not allowed"
        );
        assert_eq!(
            reason("<a href='java&#x09;script:alert(1)'>x</a>"),
            "`javascript:` URL in `href` on <a> is not allowed"
        );
    }

    #[test]
    fn test_markdown_link_destinations() {
        assert_eq!(
            reason("[click](javascript:alert(1))"),
            "`javascript:` URL in link destination is not allowed"
        );
        assert_eq!(
            reason("[click](jav&#x61;script:alert(1))"),
            "`javascript:` URL in link destination is not allowed"
        );
        assert_eq!(
            reason("![logo](vbscript:run)"),
            "`vbscript:` URL in image source is not allowed"
        );
    }

    #[test]
    fn test_code_is_skipped() {
        assert!(inspect("Use `<script>` tags carefully.").is_safe());
        assert!(inspect("Example:\n\n```html\n<script>alert(1)</script>\n```\n").is_safe());
        assert!(inspect("    <script>alert(1)</script>\n").is_safe());
    }

    #[test]
    fn test_backticks_inside_html_block_are_not_code() {
        assert_eq!(
            reason("<div>`<script>alert(1)</script>`</div>"),
            "tag <script> is not allowed"
        );
        assert_eq!(
            reason("<div>\n```\n<script>alert(1)</script>\n```\n</div>"),
            "tag <script> is not allowed"
        );
    }

    #[test]
    fn test_allow_tag() {
        let sanitizer = AllowListSanitizer::new().allow_tag("Section");

        assert!(sanitizer.inspect("<section>ok</section>").is_safe());
    }
}
