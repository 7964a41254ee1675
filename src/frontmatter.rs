//! Declared-identifier extraction from YAML (`---`) or TOML (`+++`) frontmatter.
//!
//! Absent frontmatter, a missing field, and a value that fails strict
//! identifier parsing are all `None`, never errors. Input is never mutated.

use std::path::Path;

use crate::ident::Identifier;

/// Frontmatter field carrying the declared identifier by default.
pub const DEFAULT_ID_FIELD: &str = "uuid";

/// File extensions whose contents may begin with a frontmatter block.
const HEADER_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Check whether a declared path names a format that supports frontmatter.
pub fn supports_frontmatter(declared_path: &str) -> bool {
    Path::new(declared_path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            HEADER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Extractor for identifiers declared in frontmatter.
#[derive(Debug, Clone)]
pub struct FrontmatterExtractor {
    /// Frontmatter key holding the identifier.
    field: String,
}

impl FrontmatterExtractor {
    pub fn new() -> Self {
        Self::with_field(DEFAULT_ID_FIELD)
    }

    pub fn with_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Extract the declared identifier, if any.
    ///
    /// Returns `Some` only for a value that round-trips through
    /// [`Identifier::parse`] exactly.
    pub fn extract(&self, content: &str) -> Option<Identifier> {
        let (fm, is_toml) = Self::detect_frontmatter(content)?;
        let raw = if is_toml {
            Self::toml_field(fm, &self.field)?
        } else {
            Self::yaml_field(fm, &self.field)?
        };
        Identifier::parse(&raw).ok()
    }

    /// Detect and extract the frontmatter block.
    /// Returns `(frontmatter, is_toml)` if found.
    fn detect_frontmatter(content: &str) -> Option<(&str, bool)> {
        let trimmed = content.trim_start();

        // YAML: ---...---
        if trimmed.starts_with("---")
            && let Some(end) = trimmed[3..].find("\n---")
        {
            return Some((trimmed[3..3 + end].trim(), false));
        }

        // TOML: +++...+++
        if trimmed.starts_with("+++")
            && let Some(end) = trimmed[3..].find("\n+++")
        {
            return Some((trimmed[3..3 + end].trim(), true));
        }

        None
    }

    /// Read a field from simple YAML-like frontmatter (key: value).
    fn yaml_field(content: &str, field: &str) -> Option<String> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once(':')
                && key.trim().eq_ignore_ascii_case(field)
            {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                return Some(value.to_string());
            }
        }
        None
    }

    /// Read a field from TOML frontmatter.
    fn toml_field(content: &str, field: &str) -> Option<String> {
        let table: toml::Table = content.parse().ok()?;
        table.get(field)?.as_str().map(str::to_string)
    }
}

impl Default for FrontmatterExtractor {
    fn default() -> Self {
        Self::new()
    }
}
