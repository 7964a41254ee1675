//! Identifier codec: 128-bit tagged identifiers.
//!
//! Content-derived identifiers fold a blake3 digest into the identifier
//! space as UUIDv8 values; random identifiers are UUIDv4. The version
//! nibble disambiguates the two shapes, so a value can be classified
//! without consulting the registry. The shapes are disjoint by
//! construction; collisions within one shape are the write path's job to
//! detect, not this codec's to prevent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::{Uuid, Version};

use crate::digest::ContentDigest;
use crate::error::RegistryError;

/// A 128-bit resource identifier in canonical hyphenated form.
///
/// Immutable once assigned to a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identifier(Uuid);

/// Structural shape of an identifier, read from its version nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdShape {
    /// Folded from a content digest (UUIDv8).
    ContentDerived,
    /// Drawn from a cryptographically secure random source (UUIDv4).
    Generated,
    /// Valid identifier minted by other tooling generations.
    Foreign,
}

impl Identifier {
    /// Fold a 256-bit digest into the identifier space.
    ///
    /// XORs the two 16-byte halves so every digest bit influences the
    /// result, then stamps UUIDv8 version/variant bits. Idempotent: the
    /// same digest always yields the same identifier.
    pub fn from_digest(digest: &ContentDigest) -> Self {
        let bytes = digest.as_bytes();
        let mut folded = [0u8; 16];
        for (i, slot) in folded.iter_mut().enumerate() {
            *slot = bytes[i] ^ bytes[i + 16];
        }
        Self(Uuid::new_v8(folded))
    }

    /// Draw a fresh random identifier (UUIDv4).
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the canonical hyphenated 8-4-4-4-12 form, strictly.
    ///
    /// Rejects braced, URN, and unhyphenated forms that a permissive UUID
    /// parser would accept.
    pub fn parse(text: &str) -> Result<Self, RegistryError> {
        let canonical = text.len() == 36
            && text.bytes().enumerate().all(|(i, b)| match i {
                8 | 13 | 18 | 23 => b == b'-',
                _ => b.is_ascii_hexdigit(),
            });
        if !canonical {
            return Err(RegistryError::Format(text.to_string()));
        }
        Uuid::try_parse(text)
            .map(Self)
            .map_err(|_| RegistryError::Format(text.to_string()))
    }

    /// Classify this identifier by its version nibble.
    pub fn shape(&self) -> IdShape {
        match self.0.get_version() {
            Some(Version::Custom) => IdShape::ContentDerived,
            Some(Version::Random) => IdShape::Generated,
            _ => IdShape::Foreign,
        }
    }

    /// Access the underlying UUID value.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Identifier {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_digest_deterministic() {
        let digest = ContentDigest::of_bytes(b"hello");
        let a = Identifier::from_digest(&digest);
        let b = Identifier::from_digest(&digest);
        assert_eq!(a, b);

        let other = Identifier::from_digest(&ContentDigest::of_bytes(b"world"));
        assert_ne!(a, other);
    }

    #[test]
    fn test_shapes_disjoint() {
        let derived = Identifier::from_digest(&ContentDigest::of_bytes(b"x"));
        let generated = Identifier::random();

        assert_eq!(derived.shape(), IdShape::ContentDerived);
        assert_eq!(generated.shape(), IdShape::Generated);
        // Different version nibbles guarantee the values differ
        assert_ne!(derived, generated);
    }

    #[test]
    fn test_display_parse_roundtrip() {
        for id in [
            Identifier::from_digest(&ContentDigest::of_bytes(b"roundtrip")),
            Identifier::random(),
        ] {
            let text = id.to_string();
            assert_eq!(Identifier::parse(&text).unwrap(), id);
        }
    }

    #[test]
    fn test_parse_strict() {
        // Canonical form parses
        assert!(Identifier::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        // Uppercase hex digits are still hex
        assert!(Identifier::parse("67E55044-10B1-426F-9247-BB680E5FE0C8").is_ok());

        // Everything else is rejected
        for bad in [
            "",
            "not-a-uuid",
            "67e5504410b1426f9247bb680e5fe0c8",                // no hyphens
            "{67e55044-10b1-426f-9247-bb680e5fe0c8}",          // braced
            "urn:uuid:67e55044-10b1-426f-9247-bb680e5fe0c8",   // urn
            "67e55044-10b1-426f-9247-bb680e5fe0c",             // too short
            "67e55044-10b1-426f-9247-bb680e5fe0c8a",           // too long
            "67e55044x10b1-426f-9247-bb680e5fe0c8",            // bad separator
            "g7e55044-10b1-426f-9247-bb680e5fe0c8",            // non-hex
        ] {
            assert!(Identifier::parse(bad).is_err(), "accepted `{bad}`");
        }
    }

    #[test]
    fn test_foreign_shape() {
        // Version 1 identifier from other tooling: accepted, classified Foreign
        let id = Identifier::parse("c232ab00-9414-11ec-b3c8-9f6bdeced846").unwrap();
        assert_eq!(id.shape(), IdShape::Foreign);
    }

    #[test]
    fn test_serde_as_string() {
        let id = Identifier::random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
