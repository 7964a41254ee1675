//! Engine error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::digest::ContentDigest;
use crate::ident::Identifier;

/// Errors surfaced by the registry write path.
///
/// Resolution strategies never propagate these: a failing strategy is
/// equivalent to "no result", and the Generated fallback is total. Only
/// writes risk corrupting shared state, so only writes report failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Identifier text did not match the canonical hyphenated form.
    #[error("malformed identifier `{0}`")]
    Format(String),

    /// Byte source unreadable, or registry file unreadable/unwritable.
    ///
    /// Fatal for the single operation only; other records are unaffected
    /// and the operation is safely retryable.
    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    /// Registry file contents could not be encoded or decoded.
    #[error("registry file encoding error")]
    Decode(#[from] serde_json::Error),

    /// The resource's current bytes no longer match the stored digest.
    ///
    /// The stored record is left untouched. The caller decides whether this
    /// is "content changed, update record" (re-commit with
    /// [`ConsistencyGuard::commit_forced`](crate::guard::ConsistencyGuard::commit_forced))
    /// or "different resource, same identifier by coincidence".
    #[error("stale record for {identifier}: stored digest {stored}, actual {actual}")]
    StaleRecord {
        identifier: Identifier,
        stored: ContentDigest,
        actual: ContentDigest,
    },

    /// Mutation targeted an identifier with no record.
    #[error("no record for identifier {0}")]
    NotFound(Identifier),
}

impl RegistryError {
    /// Check whether the caller can recover by re-resolving or forcing.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::StaleRecord { .. })
    }
}
