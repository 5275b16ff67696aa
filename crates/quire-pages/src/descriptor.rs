//! Import descriptor format.
//!
//! A ROOT page's content is a YAML (or JSON) manifest listing the files of a
//! documentation sub-tree:
//!
//! ```yaml
//! documentation:
//!   pages:
//!     - src: /docs/index.md
//!       name: Home
//!       homepage: true
//!     - src: /docs/api/payments.yaml
//!       dest: /Reference
//! ```

use std::path::Path;

use quire_store::PageType;
use serde::Deserialize;

/// Descriptor could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("Invalid import descriptor: {0}")]
pub struct DescriptorError(#[from] serde_yaml::Error);

/// Parsed import descriptor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Descriptor {
    pub documentation: Documentation,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Documentation {
    pub pages: Vec<DescriptorPage>,
}

/// One file of the descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DescriptorPage {
    /// Path of the file in the source.
    pub src: String,
    /// Folder path the page is placed in. Defaults to the directory of `src`.
    #[serde(default)]
    pub dest: Option<String>,
    /// Page name. Defaults to the file stem of `src`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub homepage: bool,
}

impl Descriptor {
    /// Parse a descriptor. Blank text is an empty descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] if the text is neither valid YAML nor JSON
    /// of the expected shape.
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    #[must_use]
    pub fn pages(&self) -> &[DescriptorPage] {
        &self.documentation.pages
    }
}

impl DescriptorPage {
    /// Page type guessed from the file extension.
    #[must_use]
    pub fn page_type(&self) -> Option<PageType> {
        Path::new(&self.src)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(PageType::from_extension)
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => Path::new(&self.src)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(self.src.as_str())
                .to_owned(),
        }
    }

    /// Names of the folders enclosing the page, outermost first.
    #[must_use]
    pub fn folders(&self) -> Vec<&str> {
        let path = match self.dest.as_deref() {
            Some(dest) if !dest.trim().is_empty() => dest,
            _ => self.src.rsplit_once('/').map_or("", |(dir, _)| dir),
        };
        path.split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != ".")
            .collect()
    }
}
