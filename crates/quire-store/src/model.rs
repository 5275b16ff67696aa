//! Page and revision data types.
//!
//! Provides the [`Page`] entity with its closed [`PageType`] enum and the
//! append-only [`Revision`] snapshot. This module contains only data types and
//! small accessors - tree invariants are enforced by the page tree engine.
//!
//! # Configuration Keys
//!
//! Page `configuration` is a free-form string map whose meaning depends on the
//! page type. The keys understood by the engine live in [`config_keys`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Configuration keys with engine-defined semantics.
pub mod config_keys {
    /// LINK: kind of resource the link points at (`PAGE`, `EXTERNAL`, `CATEGORY`).
    pub const LINK_RESOURCE_TYPE: &str = "resourceType";
    /// TRANSLATION: language tag of the translation.
    pub const TRANSLATION_LANG: &str = "lang";
    /// TRANSLATION: when `"true"`, the translation shows its parent's content.
    pub const TRANSLATION_INHERIT_CONTENT: &str = "inheritContent";
    /// Source config: path of the file inside the fetched source.
    pub const SOURCE_FILEPATH: &str = "filepath";
}

/// Link content value pointing at the documentation root.
const LINK_ROOT: &str = "root";

/// Kind of scope owning a set of pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    /// API documentation.
    Api,
    /// Portal (environment) documentation.
    Environment,
}

/// Reference scope: the API or environment owning a page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    /// Scope kind.
    #[serde(rename = "type")]
    pub kind: ReferenceType,
    /// API id or environment id.
    pub id: String,
}

impl Reference {
    /// Reference to an API's documentation.
    #[must_use]
    pub fn api(id: impl Into<String>) -> Self {
        Self {
            kind: ReferenceType::Api,
            id: id.into(),
        }
    }

    /// Reference to an environment's portal documentation.
    #[must_use]
    pub fn environment(id: impl Into<String>) -> Self {
        Self {
            kind: ReferenceType::Environment,
            id: id.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ReferenceType::Api => write!(f, "api:{}", self.id),
            ReferenceType::Environment => write!(f, "environment:{}", self.id),
        }
    }
}

/// Page type. Immutable after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageType {
    /// Descriptor page driving a tree import.
    Root,
    /// User folder.
    Folder,
    /// Folder managed by the platform (header, footer, aside).
    SystemFolder,
    /// Markdown document.
    Markdown,
    /// Markdown document reused as a template.
    MarkdownTemplate,
    /// `OpenAPI` / Swagger descriptor.
    Swagger,
    /// `AsciiDoc` document.
    Asciidoc,
    /// Link to a page, a category or an external URL.
    Link,
    /// Translation of its parent page.
    Translation,
}

impl PageType {
    /// Upper-case name as stored by backends.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "ROOT",
            Self::Folder => "FOLDER",
            Self::SystemFolder => "SYSTEM_FOLDER",
            Self::Markdown => "MARKDOWN",
            Self::MarkdownTemplate => "MARKDOWN_TEMPLATE",
            Self::Swagger => "SWAGGER",
            Self::Asciidoc => "ASCIIDOC",
            Self::Link => "LINK",
            Self::Translation => "TRANSLATION",
        }
    }

    /// Document types carrying authored content.
    #[must_use]
    pub fn is_document(self) -> bool {
        matches!(
            self,
            Self::Markdown | Self::MarkdownTemplate | Self::Swagger | Self::Asciidoc
        )
    }

    /// Types whose content may embed `${...}` template expressions.
    #[must_use]
    pub fn is_templated(self) -> bool {
        matches!(self, Self::Markdown | Self::MarkdownTemplate)
    }

    /// Types taking part in sibling order shifting.
    ///
    /// Links and translations are assigned their order directly.
    #[must_use]
    pub fn shifts_siblings(self) -> bool {
        !matches!(self, Self::Link | Self::Translation)
    }

    /// Guess a document type from a file extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "adoc" | "asciidoc" => Some(Self::Asciidoc),
            "json" | "yaml" | "yml" => Some(Self::Swagger),
            _ => None,
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page visibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Kind of resource a LINK page targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkResourceType {
    Page,
    External,
    Category,
}

impl LinkResourceType {
    fn from_config(value: Option<&str>) -> Self {
        match value {
            Some("EXTERNAL") => Self::External,
            Some("CATEGORY") => Self::Category,
            _ => Self::Page,
        }
    }
}

/// Resolved target of a LINK page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    /// Documentation root.
    Root,
    /// Another page, by id.
    Page(&'a str),
    /// External URL.
    External(&'a str),
    /// Category, by id.
    Category(&'a str),
}

/// Remote source descriptor of a fetchable page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSource {
    /// Fetcher type used to select the fetcher (e.g., "http", "file").
    #[serde(rename = "type")]
    pub kind: String,
    /// Whether the scheduler refetches this source.
    #[serde(default)]
    pub auto_fetch: bool,
    /// 6-field cron expression (seconds first) driving auto fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_cron: Option<String>,
    /// Fetcher-specific configuration.
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

/// Media attached to a page (weak reference into the media store).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMedia {
    /// Content hash of the media.
    pub hash: String,
    /// Original filename.
    pub filename: String,
    /// Position in the attachment list.
    pub order: u32,
}

/// Documentation page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    /// Owning scope.
    pub reference: Reference,
    /// Parent page id (`None` for top-level pages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "type")]
    pub page_type: PageType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// 1-based position among siblings.
    pub order: u32,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub homepage: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configuration: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PageSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attached_media: Vec<PageMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contributor: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Create a bare page with default flags.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        reference: Reference,
        page_type: PageType,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            reference,
            parent_id: None,
            page_type,
            name: name.into(),
            content: None,
            order: 1,
            published: false,
            visibility: Visibility::Public,
            homepage: false,
            configuration: BTreeMap::new(),
            source: None,
            attached_media: Vec::new(),
            last_contributor: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Configuration value for a key.
    #[must_use]
    pub fn config(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }

    /// Translation language, if this is a translation with a non-empty `lang`.
    #[must_use]
    pub fn lang(&self) -> Option<&str> {
        self.config(config_keys::TRANSLATION_LANG)
            .filter(|lang| !lang.is_empty())
    }

    /// Target of a LINK page.
    ///
    /// Returns `None` for non-link pages and for links without content.
    #[must_use]
    pub fn link_target(&self) -> Option<LinkTarget<'_>> {
        if self.page_type != PageType::Link {
            return None;
        }
        let content = self.content.as_deref().filter(|c| !c.is_empty())?;
        if content == LINK_ROOT {
            return Some(LinkTarget::Root);
        }
        let target = match LinkResourceType::from_config(self.config(config_keys::LINK_RESOURCE_TYPE)) {
            LinkResourceType::Page => LinkTarget::Page(content),
            LinkResourceType::External => LinkTarget::External(content),
            LinkResourceType::Category => LinkTarget::Category(content),
        };
        Some(target)
    }

    /// True if this page is a LINK to the page with the given id.
    #[must_use]
    pub fn links_to(&self, page_id: &str) -> bool {
        self.link_target() == Some(LinkTarget::Page(page_id))
    }

    /// True if the scheduler should consider this page.
    #[must_use]
    pub fn has_auto_fetch_source(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|s| s.auto_fetch && !s.kind.is_empty())
    }
}

/// Immutable snapshot of a page's name and content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub page_id: String,
    /// Per-page sequence number, starting at 1.
    pub revision: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Deterministic page id for idempotent re-imports.
///
/// The same (reference id, parent id, name) always yields the same id.
#[must_use]
pub fn deterministic_page_id(reference_id: &str, parent_id: Option<&str>, name: &str) -> String {
    let key = format!("{reference_id}:{}:{name}", parent_id.unwrap_or_default());
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

/// Random page id for user-created pages.
#[must_use]
pub fn random_page_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(content: &str, resource_type: Option<&str>) -> Page {
        let mut page = Page::new(
            "link",
            Reference::api("api-1"),
            PageType::Link,
            "Link",
            Utc::now(),
        );
        page.content = Some(content.to_owned());
        if let Some(kind) = resource_type {
            page.configuration
                .insert(config_keys::LINK_RESOURCE_TYPE.to_owned(), kind.to_owned());
        }
        page
    }

    #[test]
    fn test_link_target_defaults_to_page() {
        let page = link("page-1", None);

        assert_eq!(page.link_target(), Some(LinkTarget::Page("page-1")));
        assert!(page.links_to("page-1"));
        assert!(!page.links_to("page-2"));
    }

    #[test]
    fn test_link_target_root_and_external() {
        assert_eq!(link("root", Some("PAGE")).link_target(), Some(LinkTarget::Root));
        assert_eq!(
            link("https://example.com", Some("EXTERNAL")).link_target(),
            Some(LinkTarget::External("https://example.com"))
        );
        assert!(!link("page-1", Some("EXTERNAL")).links_to("page-1"));
    }

    #[test]
    fn test_link_target_none_for_other_types() {
        let mut page = link("page-1", None);
        page.page_type = PageType::Markdown;

        assert_eq!(page.link_target(), None);
    }

    #[test]
    fn test_lang_ignores_empty_value() {
        let mut page = Page::new("t", Reference::api("a"), PageType::Translation, "T", Utc::now());
        assert_eq!(page.lang(), None);

        page.configuration
            .insert(config_keys::TRANSLATION_LANG.to_owned(), String::new());
        assert_eq!(page.lang(), None);

        page.configuration
            .insert(config_keys::TRANSLATION_LANG.to_owned(), "fr".to_owned());
        assert_eq!(page.lang(), Some("fr"));
    }

    #[test]
    fn test_type_from_extension() {
        assert_eq!(PageType::from_extension("md"), Some(PageType::Markdown));
        assert_eq!(PageType::from_extension("ADOC"), Some(PageType::Asciidoc));
        assert_eq!(PageType::from_extension("yml"), Some(PageType::Swagger));
        assert_eq!(PageType::from_extension("png"), None);
    }

    #[test]
    fn test_page_type_serialized_upper_snake() {
        let json = serde_json::to_string(&PageType::SystemFolder).unwrap();
        assert_eq!(json, "\"SYSTEM_FOLDER\"");

        let parsed: PageType = serde_json::from_str("\"MARKDOWN_TEMPLATE\"").unwrap();
        assert_eq!(parsed, PageType::MarkdownTemplate);
    }

    #[test]
    fn test_deterministic_page_id_is_stable() {
        let a = deterministic_page_id("api-1", Some("folder"), "guide");
        let b = deterministic_page_id("api-1", Some("folder"), "guide");
        let c = deterministic_page_id("api-1", None, "guide");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(random_page_id(), random_page_id());
    }

    #[test]
    fn test_auto_fetch_source_requires_type() {
        let mut page = Page::new("p", Reference::api("a"), PageType::Markdown, "P", Utc::now());
        assert!(!page.has_auto_fetch_source());

        page.source = Some(PageSource {
            kind: String::new(),
            auto_fetch: true,
            ..PageSource::default()
        });
        assert!(!page.has_auto_fetch_source());

        page.source = Some(PageSource {
            kind: "http".to_owned(),
            auto_fetch: true,
            ..PageSource::default()
        });
        assert!(page.has_auto_fetch_source());
    }
}
