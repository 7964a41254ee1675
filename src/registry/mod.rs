//! Identifier → record registry: record types, store, and persistence.

mod persist;
mod record;
mod store;

pub use persist::{load_store, save_store};
pub use record::{
    EditableMetadata, JsonMap, MetadataPatch, RegistryRecord, UploadRecord, VIRTUAL_SCHEME,
};
pub use store::RegistryStore;

pub(crate) use record::current_timestamp;
