//! Content digesting with blake3.
//!
//! Provides the core logic for computing resource digests and the digest
//! type records carry for staleness detection. Large inputs are streamed
//! through a fixed-size buffer, never buffered whole.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cache::{get_cached_digest, set_cached_digest};
use crate::error::RegistryError;

/// Read buffer size for streaming digests.
const CHUNK_SIZE: usize = 64 * 1024;

/// A 256-bit content digest (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Create a new ContentDigest from raw bytes.
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Digest an in-memory byte slice.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Convert to hex string (persisted form).
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Some(Self(arr))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

// Persisted as the full hex string, matching the registry file format.
impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| D::Error::custom("invalid content digest hex"))
    }
}

/// Stream a reader through blake3.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<ContentDigest> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(ContentDigest::new(*hasher.finalize().as_bytes()))
}

/// Compute blake3 digest of file contents (cached).
///
/// Used by the resolution read path where repeated lookups are common.
/// The write path must use [`digest_file_uncached`] so verification always
/// sees the actual bytes on disk.
pub fn digest_file(path: &Path) -> Result<ContentDigest, RegistryError> {
    if let Some(cached) = get_cached_digest(path) {
        return Ok(cached);
    }

    let digest = digest_file_uncached(path)?;
    set_cached_digest(path, digest);
    Ok(digest)
}

/// Compute blake3 digest of file contents without cache lookup.
pub fn digest_file_uncached(path: &Path) -> Result<ContentDigest, RegistryError> {
    let file = File::open(path).map_err(|e| RegistryError::Io(path.to_path_buf(), e))?;
    let reader = BufReader::with_capacity(CHUNK_SIZE, file);
    digest_reader(reader).map_err(|e| RegistryError::Io(path.to_path_buf(), e))
}

/// Compute a file digest with cooperative cancellation.
///
/// The flag is caller-owned; the surrounding application sets it when the
/// request is being discarded. A cancelled computation returns `Err` - a
/// half-computed digest is never returned as valid.
pub fn digest_file_cancellable(
    path: &Path,
    cancel: &AtomicBool,
) -> Result<ContentDigest, RegistryError> {
    let file = File::open(path).map_err(|e| RegistryError::Io(path.to_path_buf(), e))?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Err(RegistryError::Io(
                path.to_path_buf(),
                io::Error::new(io::ErrorKind::Interrupted, "digest cancelled"),
            ));
        }
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RegistryError::Io(path.to_path_buf(), e)),
        }
    }

    Ok(ContentDigest::new(*hasher.finalize().as_bytes()))
}
