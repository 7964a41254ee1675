//! Registry record types.

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::ident::Identifier;

/// Raw JSON object for user-defined fields.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Sentinel scheme used as the declared path of virtual records.
///
/// Virtual records track metadata-only entries with no backing bytes; their
/// declared path is `virtual://<name>`, never a filesystem path.
pub const VIRTUAL_SCHEME: &str = "virtual://";

/// Get current Unix timestamp in seconds
pub(crate) fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Caller-editable record metadata.
///
/// Standard fields plus arbitrary user-defined fields captured as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditableMetadata {
    pub title: Option<String>,
    /// MIME type, auto-filled from the declared path extension on commit
    /// when absent.
    pub mime_type: Option<String>,
    /// Additional user-defined fields (raw JSON).
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl EditableMetadata {
    /// Apply a partial update: `Some` replaces, `None` keeps, extra merges.
    pub fn apply(&mut self, patch: MetadataPatch) {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(mime_type) = patch.mime_type {
            self.mime_type = Some(mime_type);
        }
        for (key, value) in patch.extra {
            self.extra.insert(key, value);
        }
    }
}

/// Partial metadata update.
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub mime_type: Option<String>,
    pub extra: JsonMap,
}

/// One recorded external upload of a resource's content.
///
/// Appended by upload clients after they store content elsewhere; the
/// engine never performs uploads itself. Entries are never edited or
/// removed once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Protocol or service name ("arweave", "atproto", ...).
    pub target: String,
    /// Transaction id, record URI, or equivalent remote handle.
    pub location: String,
    /// Human-visitable link, when the target has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Unix timestamp (seconds) when the upload was recorded.
    pub recorded_at: u64,
}

impl UploadRecord {
    pub fn new(target: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            location: location.into(),
            link: None,
            recorded_at: current_timestamp(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// One tracked resource.
///
/// The identifier is the primary key and never changes after creation. For
/// non-virtual records, `content_digest` holds the digest of the bytes at
/// `declared_path` as of the last verification; a mismatch against the
/// actual bytes marks the record stale (detected at write time, never
/// auto-corrected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub identifier: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_digest: Option<ContentDigest>,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub metadata: EditableMetadata,
    #[serde(default)]
    pub upload_history: Vec<UploadRecord>,
    /// Unix timestamp (seconds) of the last digest verification.
    #[serde(default)]
    pub last_verified_at: u64,
}

impl RegistryRecord {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            declared_path: None,
            content_digest: None,
            is_virtual: false,
            metadata: EditableMetadata::default(),
            upload_history: Vec::new(),
            last_verified_at: 0,
        }
    }

    /// Title, falling back to the declared path, then to the identifier.
    pub fn title(&self) -> String {
        self.metadata
            .title
            .clone()
            .or_else(|| self.declared_path.clone())
            .unwrap_or_else(|| self.identifier.to_string())
    }
}
