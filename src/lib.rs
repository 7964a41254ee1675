//! Stable identity for tracked content.
//!
//! Every resource gets a durable 128-bit identifier, resolved through an
//! ordered strategy pipeline: an identifier declared in the resource's own
//! frontmatter wins, then an existing registry entry for the declared path,
//! then an identifier folded from the content digest, and finally a random
//! one. Resolution is total - every input gets an identifier, tagged with
//! its provenance and a confidence level.
//!
//! Writes go through a consistency guard that recomputes content digests
//! before committing and refuses to silently overwrite a record whose
//! stored digest no longer matches the bytes on disk.

pub mod config;
pub mod digest;
mod engine;
pub mod error;
pub mod frontmatter;
pub mod guard;
pub mod ident;
pub mod logger;
pub mod mime;
pub mod registry;
pub mod resolve;

pub use config::EngineConfig;
pub use digest::ContentDigest;
pub use engine::Engine;
pub use error::RegistryError;
pub use guard::ConsistencyGuard;
pub use ident::{IdShape, Identifier};
pub use registry::{
    EditableMetadata, MetadataPatch, RegistryRecord, RegistryStore, UploadRecord,
};
pub use resolve::{
    Confidence, IdentityResolver, ResolutionResult, ResourceRef, Source, Strategy,
};
