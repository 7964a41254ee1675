//! Content digesting: streaming blake3 hashes with a process-wide cache.

mod cache;
mod hash;

pub use cache::{DigestCache, clear_cache, invalidate_cached_digest};
pub use hash::{
    ContentDigest, digest_file, digest_file_cancellable, digest_file_uncached, digest_reader,
};
