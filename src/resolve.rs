//! Identity resolution: the ordered strategy pipeline.
//!
//! Four strategies are consulted in priority order; the first success wins.
//! No strategy aborts resolution - a failure (unreadable bytes, malformed
//! frontmatter, no registry entry) is just "no result", and the terminal
//! Generated strategy guarantees a result for every input.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::digest::{self, ContentDigest};
use crate::error::RegistryError;
use crate::frontmatter::{self, FrontmatterExtractor};
use crate::ident::Identifier;
use crate::registry::{RegistryStore, VIRTUAL_SCHEME};

/// How a resource's bytes are obtained.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// Read lazily from the filesystem at resolve/commit time.
    File(PathBuf),
    /// Bytes supplied directly by the caller.
    Inline(Vec<u8>),
    /// Metadata-only entry with no backing content.
    Virtual,
}

/// A reference to a resource entering resolution.
///
/// Carries the declared path and a lazy byte source; the engine never moves
/// or mutates the underlying resource.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    /// A filesystem path, or a `virtual://` sentinel for virtual entries.
    pub declared_path: String,
    pub bytes: ByteSource,
}

impl ResourceRef {
    /// Reference a local file; the declared path is the path itself.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            declared_path: path.display().to_string(),
            bytes: ByteSource::File(path),
        }
    }

    /// Reference caller-supplied bytes under an explicit declared path.
    pub fn inline(declared_path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            declared_path: declared_path.into(),
            bytes: ByteSource::Inline(bytes),
        }
    }

    /// Reference a virtual, metadata-only entry.
    pub fn virtual_entry(name: &str) -> Self {
        Self {
            declared_path: format!("{VIRTUAL_SCHEME}{name}"),
            bytes: ByteSource::Virtual,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.bytes, ByteSource::Virtual)
    }

    /// Read the resource as text (for frontmatter extraction).
    fn read_text(&self) -> Option<String> {
        match &self.bytes {
            ByteSource::File(path) => fs::read_to_string(path).ok(),
            ByteSource::Inline(data) => String::from_utf8(data.clone()).ok(),
            ByteSource::Virtual => None,
        }
    }

    /// Digest the resource's content, streaming files through the digest
    /// cache when `cached` is set. `None` when bytes are absent or
    /// unreadable - resolution treats that as strategy fall-through.
    fn digest(&self, cached: bool) -> Option<ContentDigest> {
        match &self.bytes {
            ByteSource::File(path) => {
                if cached {
                    digest::digest_file(path).ok()
                } else {
                    digest::digest_file_uncached(path).ok()
                }
            }
            ByteSource::Inline(data) => Some(ContentDigest::of_bytes(data)),
            ByteSource::Virtual => None,
        }
    }

    /// Digest for write-path verification: always uncached, and an
    /// unreadable byte source is an error rather than a fall-through.
    pub(crate) fn verified_digest(&self) -> Result<Option<ContentDigest>, RegistryError> {
        match &self.bytes {
            ByteSource::File(path) => digest::digest_file_uncached(path).map(Some),
            ByteSource::Inline(data) => Ok(Some(ContentDigest::of_bytes(data))),
            ByteSource::Virtual => Ok(None),
        }
    }
}

/// Provenance of a resolved identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Declared in the resource's embedded frontmatter.
    Declared,
    /// Retrieved from an existing registry entry for the declared path.
    Registered,
    /// Folded from the content digest.
    ContentDerived,
    /// Drawn from the random source.
    Generated,
}

/// How strongly the identifier is tied to durable resource identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Source {
    /// Confidence level attached to results from this source.
    pub const fn confidence(self) -> Confidence {
        match self {
            Self::Declared | Self::Registered => Confidence::High,
            Self::ContentDerived => Confidence::Medium,
            Self::Generated => Confidence::Low,
        }
    }
}

/// Outcome of identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionResult {
    pub identifier: Identifier,
    pub source: Source,
    pub confidence: Confidence,
}

impl ResolutionResult {
    fn from_source(identifier: Identifier, source: Source) -> Self {
        Self {
            identifier,
            source,
            confidence: source.confidence(),
        }
    }
}

/// One resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Declared,
    Registered,
    ContentDerived,
    Generated,
}

/// Default strategy order.
///
/// Declared frontmatter always wins when present and valid; Generated is
/// total and terminates resolution.
pub const DEFAULT_STRATEGIES: [Strategy; 4] = [
    Strategy::Declared,
    Strategy::Registered,
    Strategy::ContentDerived,
    Strategy::Generated,
];

/// Resolves identifiers for resources against a registry store.
///
/// Resolution is read-only: it never writes to the store and never checks
/// uniqueness - that is the write path's job at commit time.
pub struct IdentityResolver<'a> {
    store: &'a RegistryStore,
    extractor: FrontmatterExtractor,
    cache_digests: bool,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(store: &'a RegistryStore) -> Self {
        Self::with_extractor(store, FrontmatterExtractor::new())
    }

    pub fn with_extractor(store: &'a RegistryStore, extractor: FrontmatterExtractor) -> Self {
        Self {
            store,
            extractor,
            cache_digests: true,
        }
    }

    /// Toggle the digest cache for ContentDerived resolution.
    pub fn cache_digests(mut self, enabled: bool) -> Self {
        self.cache_digests = enabled;
        self
    }

    /// Resolve with the default strategy order. Total: always returns.
    pub fn resolve(&self, resource: &ResourceRef) -> ResolutionResult {
        self.resolve_with(resource, &DEFAULT_STRATEGIES)
    }

    /// Resolve with an explicit strategy order.
    ///
    /// Falls back to a Generated result when no listed strategy produces
    /// one, so resolution stays total regardless of the order passed in.
    pub fn resolve_with(
        &self,
        resource: &ResourceRef,
        strategies: &[Strategy],
    ) -> ResolutionResult {
        for strategy in strategies {
            if let Some(result) = self.try_strategy(*strategy, resource) {
                crate::debug!(
                    "resolve";
                    "{} -> {} via {:?}",
                    resource.declared_path, result.identifier, result.source
                );
                return result;
            }
        }
        ResolutionResult::from_source(Identifier::random(), Source::Generated)
    }

    fn try_strategy(&self, strategy: Strategy, resource: &ResourceRef) -> Option<ResolutionResult> {
        match strategy {
            Strategy::Declared => self.try_declared(resource),
            Strategy::Registered => self.try_registered(resource),
            Strategy::ContentDerived => self.try_content_derived(resource),
            Strategy::Generated => Some(ResolutionResult::from_source(
                Identifier::random(),
                Source::Generated,
            )),
        }
    }

    /// Strategy 1: identifier declared in the resource's frontmatter.
    ///
    /// Virtual resources have no bytes to parse a header from and skip this.
    fn try_declared(&self, resource: &ResourceRef) -> Option<ResolutionResult> {
        if resource.is_virtual() || !frontmatter::supports_frontmatter(&resource.declared_path) {
            return None;
        }
        let text = resource.read_text()?;
        let id = self.extractor.extract(&text)?;
        Some(ResolutionResult::from_source(id, Source::Declared))
    }

    /// Strategy 2: existing record for the exact declared path.
    ///
    /// Does not re-verify content, so a moved file can inherit a stale
    /// entry here; the write path surfaces that as a conflict.
    fn try_registered(&self, resource: &ResourceRef) -> Option<ResolutionResult> {
        let record = self.store.find_by_path(&resource.declared_path)?;
        Some(ResolutionResult::from_source(
            record.identifier,
            Source::Registered,
        ))
    }

    /// Strategy 3: fold the content digest.
    ///
    /// Identical bytes resolve to the identical identifier regardless of
    /// path or filename - this is the deduplication mechanism.
    fn try_content_derived(&self, resource: &ResourceRef) -> Option<ResolutionResult> {
        if resource.is_virtual() {
            return None;
        }
        let digest = resource.digest(self.cache_digests)?;
        Some(ResolutionResult::from_source(
            Identifier::from_digest(&digest),
            Source::ContentDerived,
        ))
    }
}
