//! The write path: staleness verification and serialized commits.
//!
//! A write attempt moves `Resolving → Verifying → Committing → Done`, with
//! `Conflict` as the failure exit. Resolving happens in
//! [`IdentityResolver`](crate::resolve::IdentityResolver); this module owns
//! the rest. All writes for one identifier are serialized through an
//! exclusive lock held from verification through the store write, so a
//! second writer always re-checks against the first writer's committed
//! record, never against a stale snapshot.
//!
//! When a persist hook is installed, it runs inside the same lock and a
//! failed flush rolls the in-memory store back to the pre-write record, so
//! a storage failure never leaves a record behind that disk has not seen.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::ident::Identifier;
use crate::mime;
use crate::registry::{
    MetadataPatch, RegistryRecord, RegistryStore, UploadRecord, current_timestamp,
};
use crate::resolve::{ResolutionResult, ResourceRef};

type PersistFn = Box<dyn Fn(&RegistryStore) -> Result<(), RegistryError> + Send + Sync>;

/// Serializes registry writes per identifier.
pub struct ConsistencyGuard {
    store: Arc<RegistryStore>,
    /// Exclusive per-identifier write locks.
    locks: DashMap<Identifier, Arc<Mutex<()>>>,
    /// Flush hook run under the identifier lock after each mutation.
    persist: Option<PersistFn>,
}

impl ConsistencyGuard {
    pub fn new(store: Arc<RegistryStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            persist: None,
        }
    }

    /// A guard that flushes through `persist` after every mutation.
    pub fn with_persist(store: Arc<RegistryStore>, persist: PersistFn) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            persist: Some(persist),
        }
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    fn lock_for(&self, id: &Identifier) -> Arc<Mutex<()>> {
        self.locks
            .entry(*id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` holding the identifier's exclusive lock, dropping the lock
    /// table entry afterwards when no other writer is waiting on it.
    fn with_lock<T>(&self, id: &Identifier, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock();
            f()
        };
        // Table reference + our clone = 2 means nobody else holds this lock
        self.locks
            .remove_if(id, |_, entry| Arc::strong_count(entry) <= 2);
        result
    }

    /// Flush through the persist hook; on failure undo the in-memory write.
    ///
    /// Must be called while holding the identifier's lock.
    fn persist_or_rollback(
        &self,
        id: Identifier,
        prior: Option<RegistryRecord>,
    ) -> Result<(), RegistryError> {
        let Some(persist) = &self.persist else {
            return Ok(());
        };
        if let Err(e) = persist(&self.store) {
            match prior {
                Some(record) => self.store.put(record),
                None => {
                    self.store.remove(&id);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Commit a resolution: verify against any existing record, then persist.
    ///
    /// When a record already exists for this identifier and the incoming
    /// resource is non-virtual, its digest is recomputed (never from cache)
    /// and compared to the stored one. A mismatch means the resource is
    /// stale relative to the registry: the write surfaces
    /// [`RegistryError::StaleRecord`] carrying both digests and the stored
    /// record is left unchanged. The caller decides between
    /// [`commit_forced`](Self::commit_forced) and treating the collision as
    /// a different resource.
    pub fn commit(
        &self,
        resource: &ResourceRef,
        resolution: &ResolutionResult,
    ) -> Result<RegistryRecord, RegistryError> {
        self.commit_inner(resource, resolution, false)
    }

    /// Commit with explicit overwrite intent.
    ///
    /// Skips the staleness check and records the resource's current digest
    /// as the new truth. For the caller's "content changed, update record"
    /// branch after a [`RegistryError::StaleRecord`].
    pub fn commit_forced(
        &self,
        resource: &ResourceRef,
        resolution: &ResolutionResult,
    ) -> Result<RegistryRecord, RegistryError> {
        self.commit_inner(resource, resolution, true)
    }

    fn commit_inner(
        &self,
        resource: &ResourceRef,
        resolution: &ResolutionResult,
        forced: bool,
    ) -> Result<RegistryRecord, RegistryError> {
        let id = resolution.identifier;
        self.with_lock(&id, || {
            // Verifying: recompute the digest from actual bytes (never cached)
            let actual = resource.verified_digest()?;
            let existing = self.store.get(&id);

            if !forced
                && let (Some(record), Some(actual_digest)) = (&existing, &actual)
                && let Some(stored) = record.content_digest
                && stored != *actual_digest
            {
                crate::debug!(
                    "guard";
                    "stale record for {}: stored {} vs actual {}",
                    id, stored, actual_digest
                );
                return Err(RegistryError::StaleRecord {
                    identifier: id,
                    stored,
                    actual: *actual_digest,
                });
            }

            // Committing: build the updated record and write it back
            let prior = existing.clone();
            let mut record = existing.unwrap_or_else(|| RegistryRecord::new(id));
            record.declared_path = Some(resource.declared_path.clone());
            record.is_virtual = resource.is_virtual();
            if resource.is_virtual() {
                // Virtual records never carry a real-bytes digest
                record.content_digest = None;
            } else if let Some(digest) = actual {
                record.content_digest = Some(digest);
                record.last_verified_at = current_timestamp();
            }
            if record.metadata.mime_type.is_none() && !resource.is_virtual() {
                record.metadata.mime_type =
                    Some(mime::from_path_str(&resource.declared_path).to_string());
            }

            self.store.put(record.clone());
            self.persist_or_rollback(id, prior)?;
            crate::debug!("guard"; "committed {} ({:?})", id, resolution.source);
            Ok(record)
        })
    }

    /// Append an upload record to an existing resource's history.
    ///
    /// Append-only: history entries are never edited or removed.
    pub fn append_upload(
        &self,
        id: &Identifier,
        upload: UploadRecord,
    ) -> Result<RegistryRecord, RegistryError> {
        self.with_lock(id, || {
            let prior = self.store.get(id).ok_or(RegistryError::NotFound(*id))?;
            let mut record = prior.clone();
            record.upload_history.push(upload);
            self.store.put(record.clone());
            self.persist_or_rollback(*id, Some(prior))?;
            Ok(record)
        })
    }

    /// Apply a metadata patch to an existing record.
    pub fn update_metadata(
        &self,
        id: &Identifier,
        patch: MetadataPatch,
    ) -> Result<RegistryRecord, RegistryError> {
        self.with_lock(id, || {
            let prior = self.store.get(id).ok_or(RegistryError::NotFound(*id))?;
            let mut record = prior.clone();
            record.metadata.apply(patch);
            self.store.put(record.clone());
            self.persist_or_rollback(*id, Some(prior))?;
            Ok(record)
        })
    }

    /// Remove a record under the identifier's write lock.
    ///
    /// `None` when the identifier was unknown. A failed flush puts the
    /// record back.
    pub fn remove(&self, id: &Identifier) -> Result<Option<RegistryRecord>, RegistryError> {
        self.with_lock(id, || {
            let Some(removed) = self.store.remove(id) else {
                return Ok(None);
            };
            if let Some(persist) = &self.persist
                && let Err(e) = persist(&self.store)
            {
                self.store.put(removed);
                return Err(e);
            }
            Ok(Some(removed))
        })
    }
}
