//! The engine facade: resolution, guarded writes, and persistence in one place.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::RegistryError;
use crate::frontmatter::FrontmatterExtractor;
use crate::guard::ConsistencyGuard;
use crate::ident::Identifier;
use crate::registry::{self, MetadataPatch, RegistryRecord, RegistryStore, UploadRecord};
use crate::resolve::{IdentityResolver, ResolutionResult, ResourceRef, Strategy};

/// Identity resolution engine backed by a persistent registry.
///
/// Reads resolve against the in-memory store; every write goes through the
/// consistency guard, which flushes the registry file under the identifier
/// lock and rolls the in-memory state back when the flush fails.
pub struct Engine {
    config: EngineConfig,
    store: Arc<RegistryStore>,
    guard: ConsistencyGuard,
}

impl Engine {
    /// Open an engine, loading the registry file named in the config.
    pub fn open(config: EngineConfig) -> Result<Self, RegistryError> {
        let store = Arc::new(registry::load_store(&config.registry_file)?);
        Ok(Self::with_store(config, store))
    }

    /// An engine over an empty in-memory store. Writes are still flushed to
    /// the config's registry file.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::with_store(config, Arc::new(RegistryStore::new()))
    }

    fn with_store(config: EngineConfig, store: Arc<RegistryStore>) -> Self {
        let registry_file = config.registry_file.clone();
        let pretty = config.pretty;
        let guard = ConsistencyGuard::with_persist(
            Arc::clone(&store),
            Box::new(move |store| registry::save_store(store, &registry_file, pretty)),
        );
        Self { config, store, guard }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    fn resolver(&self) -> IdentityResolver<'_> {
        IdentityResolver::with_extractor(
            &self.store,
            FrontmatterExtractor::with_field(&self.config.id_field),
        )
        .cache_digests(self.config.digest_cache)
    }

    /// Resolve an identifier for a resource. Read-only and total.
    pub fn resolve(&self, resource: &ResourceRef) -> ResolutionResult {
        self.resolver().resolve(resource)
    }

    /// Resolve with an explicit strategy order.
    pub fn resolve_with(&self, resource: &ResourceRef, strategies: &[Strategy]) -> ResolutionResult {
        self.resolver().resolve_with(resource, strategies)
    }

    pub fn get(&self, id: &Identifier) -> Option<RegistryRecord> {
        self.store.get(id)
    }

    /// Commit a resolution and flush the registry to disk.
    pub fn commit(
        &self,
        resource: &ResourceRef,
        resolution: &ResolutionResult,
    ) -> Result<RegistryRecord, RegistryError> {
        self.guard.commit(resource, resolution)
    }

    /// Commit with overwrite intent, skipping the staleness check.
    pub fn commit_forced(
        &self,
        resource: &ResourceRef,
        resolution: &ResolutionResult,
    ) -> Result<RegistryRecord, RegistryError> {
        self.guard.commit_forced(resource, resolution)
    }

    /// Append an upload record to a resource's history and flush.
    pub fn append_upload(
        &self,
        id: &Identifier,
        upload: UploadRecord,
    ) -> Result<RegistryRecord, RegistryError> {
        self.guard.append_upload(id, upload)
    }

    /// Patch a record's editable metadata and flush.
    pub fn update_metadata(
        &self,
        id: &Identifier,
        patch: MetadataPatch,
    ) -> Result<RegistryRecord, RegistryError> {
        self.guard.update_metadata(id, patch)
    }

    /// Remove a record and flush. `None` when the identifier was unknown.
    pub fn remove(&self, id: &Identifier) -> Result<Option<RegistryRecord>, RegistryError> {
        self.guard.remove(id)
    }

    /// Flush the registry to its file.
    pub fn save(&self) -> Result<(), RegistryError> {
        registry::save_store(&self.store, &self.config.registry_file, self.config.pretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Source;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> EngineConfig {
        EngineConfig {
            registry_file: dir.path().join("registry.json"),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_commit_then_reopen_resolves_registered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, "some plain content").unwrap();
        let resource = ResourceRef::file(&path);

        let engine = Engine::in_memory(config_in(&dir));
        let resolution = engine.resolve(&resource);
        assert_eq!(resolution.source, Source::ContentDerived);
        engine.commit(&resource, &resolution).unwrap();

        // A fresh engine over the saved registry finds the path directly
        let reopened = Engine::open(config_in(&dir)).unwrap();
        let again = reopened.resolve(&resource);
        assert_eq!(again.source, Source::Registered);
        assert_eq!(again.identifier, resolution.identifier);
    }

    #[test]
    fn test_upload_history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let resource = ResourceRef::inline("post.md", b"body".to_vec());

        let engine = Engine::in_memory(config_in(&dir));
        let resolution = engine.resolve(&resource);
        engine.commit(&resource, &resolution).unwrap();
        engine
            .append_upload(
                &resolution.identifier,
                UploadRecord::new("arweave", "tx9").with_link("https://www.arweave.net/tx9"),
            )
            .unwrap();

        let reopened = Engine::open(config_in(&dir)).unwrap();
        let record = reopened.get(&resolution.identifier).unwrap();
        assert_eq!(record.upload_history.len(), 1);
        assert_eq!(record.upload_history[0].target, "arweave");
        assert_eq!(
            record.upload_history[0].link.as_deref(),
            Some("https://www.arweave.net/tx9")
        );
    }

    #[test]
    fn test_custom_id_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("post.md");
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        fs::write(&path, format!("---\nstable-id: {id}\n---\nBody\n")).unwrap();

        let config = EngineConfig {
            id_field: "stable-id".to_string(),
            ..config_in(&dir)
        };
        let engine = Engine::in_memory(config);

        let resolution = engine.resolve(&ResourceRef::file(&path));
        assert_eq!(resolution.source, Source::Declared);
        assert_eq!(resolution.identifier.to_string(), id);
    }

    #[test]
    fn test_remove_persists() {
        let dir = TempDir::new().unwrap();
        let resource = ResourceRef::inline("a.txt", b"bytes".to_vec());

        let engine = Engine::in_memory(config_in(&dir));
        let resolution = engine.resolve(&resource);
        engine.commit(&resource, &resolution).unwrap();
        assert!(engine.remove(&resolution.identifier).unwrap().is_some());
        assert!(engine.remove(&resolution.identifier).unwrap().is_none());

        let reopened = Engine::open(config_in(&dir)).unwrap();
        assert!(reopened.store().is_empty());
    }
}
