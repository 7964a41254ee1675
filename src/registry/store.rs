//! In-memory registry keyed by identifier, with a declared-path index.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::record::RegistryRecord;
use crate::ident::Identifier;

/// Thread-safe identifier → record store.
///
/// The store exclusively owns all records; access is copy-out, mutate,
/// write-back - no caller holds a reference into the store across calls.
/// `put` is last-writer-wins at this layer; conflict avoidance lives in
/// [`ConsistencyGuard`](crate::guard::ConsistencyGuard).
#[derive(Debug, Default)]
pub struct RegistryStore {
    /// Records keyed by identifier.
    records: RwLock<BTreeMap<Identifier, RegistryRecord>>,
    /// Secondary index: declared path -> identifier, for Registered-strategy
    /// lookups.
    by_path: RwLock<FxHashMap<String, Identifier>>,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record by identifier (copy-out).
    pub fn get(&self, id: &Identifier) -> Option<RegistryRecord> {
        self.records.read().get(id).cloned()
    }

    /// Look up a record by exact declared path.
    ///
    /// Does not validate content; a moved file can still be indexed under
    /// its old path until the next write surfaces the mismatch.
    pub fn find_by_path(&self, path: &str) -> Option<RegistryRecord> {
        let id = *self.by_path.read().get(path)?;
        self.get(&id)
    }

    /// Insert or replace a record, keeping the path index in sync.
    pub fn put(&self, record: RegistryRecord) {
        let mut records = self.records.write();
        let mut by_path = self.by_path.write();

        // Drop the old path mapping if the record moved
        if let Some(old) = records.get(&record.identifier)
            && let Some(old_path) = &old.declared_path
            && old.declared_path != record.declared_path
        {
            by_path.remove(old_path);
        }

        if let Some(path) = &record.declared_path {
            by_path.insert(path.clone(), record.identifier);
        }
        records.insert(record.identifier, record);
    }

    /// Remove a record by identifier.
    pub fn remove(&self, id: &Identifier) -> Option<RegistryRecord> {
        let mut records = self.records.write();
        let mut by_path = self.by_path.write();

        let removed = records.remove(id);
        if let Some(record) = &removed
            && let Some(path) = &record.declared_path
        {
            by_path.remove(path);
        }
        removed
    }

    /// Snapshot all records (sorted by identifier).
    pub fn snapshot(&self) -> Vec<RegistryRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Snapshot all identifiers.
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.records.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub fn clear(&self) {
        self.records.write().clear();
        self.by_path.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(path: Option<&str>) -> RegistryRecord {
        let mut record = RegistryRecord::new(Identifier::random());
        record.declared_path = path.map(str::to_string);
        record
    }

    #[test]
    fn test_put_get_remove() {
        let store = RegistryStore::new();
        let record = make_record(Some("content/a.md"));
        let id = record.identifier;

        store.put(record);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().identifier, id);

        let removed = store.remove(&id).unwrap();
        assert_eq!(removed.identifier, id);
        assert!(store.is_empty());
        assert!(store.find_by_path("content/a.md").is_none());
    }

    #[test]
    fn test_find_by_path() {
        let store = RegistryStore::new();
        let record = make_record(Some("content/post.md"));
        let id = record.identifier;
        store.put(record);

        assert_eq!(store.find_by_path("content/post.md").unwrap().identifier, id);
        assert!(store.find_by_path("content/other.md").is_none());
    }

    #[test]
    fn test_path_index_follows_moves() {
        let store = RegistryStore::new();
        let mut record = make_record(Some("old/path.md"));
        let id = record.identifier;
        store.put(record.clone());

        record.declared_path = Some("new/path.md".to_string());
        store.put(record);

        assert!(store.find_by_path("old/path.md").is_none());
        assert_eq!(store.find_by_path("new/path.md").unwrap().identifier, id);
    }

    #[test]
    fn test_put_last_writer_wins() {
        let store = RegistryStore::new();
        let mut record = make_record(Some("content/a.md"));
        let id = record.identifier;
        store.put(record.clone());

        record.metadata.title = Some("Second".to_string());
        store.put(record);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().metadata.title.as_deref(), Some("Second"));
    }

    #[test]
    fn test_snapshot_sorted() {
        let store = RegistryStore::new();
        for _ in 0..3 {
            store.put(make_record(None));
        }
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.windows(2).all(|w| w[0].identifier < w[1].identifier));
    }
}
