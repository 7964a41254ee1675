//! Registry file persistence: JSON with backup and atomic replace.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::record::{RegistryRecord, current_timestamp};
use super::store::RegistryStore;
use crate::error::RegistryError;

/// On-disk registry layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    records: Vec<RegistryRecord>,
    /// Unix timestamp (seconds) of the last save.
    #[serde(default)]
    saved_at: u64,
}

/// Load records from `path` into a fresh store.
///
/// A missing file is an empty registry, not an error.
pub fn load_store(path: &Path) -> Result<RegistryStore, RegistryError> {
    let store = RegistryStore::new();

    if !path.exists() {
        crate::debug!("registry"; "no registry file at {}, starting empty", path.display());
        return Ok(store);
    }

    let json = fs::read_to_string(path).map_err(|e| RegistryError::Io(path.to_path_buf(), e))?;
    let file: RegistryFile = serde_json::from_str(&json)?;

    let count = file.records.len();
    for record in file.records {
        store.put(record);
    }

    crate::debug!("registry"; "loaded {} records from {}", count, path.display());
    Ok(store)
}

/// Save the store to `path`.
///
/// Writes a sibling temp file, keeps a `.bak` copy of the previous registry,
/// then renames over the original. A failed save never leaves a truncated
/// registry behind.
pub fn save_store(store: &RegistryStore, path: &Path, pretty: bool) -> Result<(), RegistryError> {
    let file = RegistryFile {
        records: store.snapshot(),
        saved_at: current_timestamp(),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&file)?
    } else {
        serde_json::to_string(&file)?
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| RegistryError::Io(parent.to_path_buf(), e))?;
    }

    if path.exists() {
        let backup = sibling(path, "bak");
        fs::copy(path, &backup).map_err(|e| RegistryError::Io(backup.clone(), e))?;
    }

    let tmp = sibling(path, "tmp");
    fs::write(&tmp, json).map_err(|e| RegistryError::Io(tmp.clone(), e))?;
    fs::rename(&tmp, path).map_err(|e| RegistryError::Io(path.to_path_buf(), e))?;

    crate::debug!("registry"; "saved {} records to {}", file.records.len(), path.display());
    Ok(())
}

/// Build a sibling path by appending a suffix (`registry.json.bak`).
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::ContentDigest;
    use crate::ident::Identifier;
    use crate::registry::UploadRecord;
    use tempfile::TempDir;

    fn sample_record() -> RegistryRecord {
        let mut record = RegistryRecord::new(Identifier::random());
        record.declared_path = Some("content/hello.md".to_string());
        record.content_digest = Some(ContentDigest::of_bytes(b"hello"));
        record.metadata.title = Some("Hello".to_string());
        record.upload_history.push(UploadRecord::new("arweave", "tx1"));
        record
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/registry.json");

        let store = RegistryStore::new();
        let record = sample_record();
        let id = record.identifier;
        store.put(record);

        save_store(&store, &path, true).unwrap();

        let loaded = load_store(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let back = loaded.get(&id).unwrap();
        assert_eq!(back.declared_path.as_deref(), Some("content/hello.md"));
        assert_eq!(back.content_digest, Some(ContentDigest::of_bytes(b"hello")));
        assert_eq!(back.upload_history.len(), 1);
        // Path index is rebuilt on load
        assert_eq!(loaded.find_by_path("content/hello.md").unwrap().identifier, id);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = load_store(&dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_store(&path), Err(RegistryError::Decode(_))));
    }

    #[test]
    fn test_save_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");

        let store = RegistryStore::new();
        store.put(sample_record());
        save_store(&store, &path, false).unwrap();

        store.put(sample_record());
        save_store(&store, &path, false).unwrap();

        let backup = dir.path().join("registry.json.bak");
        assert!(backup.exists());

        // Backup holds the previous generation (one record)
        let previous = load_store(&backup).unwrap();
        assert_eq!(previous.len(), 1);
        let current = load_store(&path).unwrap();
        assert_eq!(current.len(), 2);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.json");

        let store = RegistryStore::new();
        store.put(sample_record());
        save_store(&store, &path, true).unwrap();

        assert!(!dir.path().join("registry.json.tmp").exists());
    }
}
