//! Mirror - ingestion core of a mirror node importer.
//!
//! Two pieces sit at the bottom of the importer pipeline:
//!
//! - [`stream`]: the addressing grammar for consensus stream files (balance, event and
//!   record streams, their signatures and sidecars). The downloader uses it to interpret,
//!   sequence and request remote files.
//! - [`entity`]: the identity resolution engine. Protobuf account/contract references come
//!   in three encodings (numeric `shard.realm.num`, key alias, 20-byte EVM address) and are
//!   reconciled into one canonical [`EntityId`] through a bounded cache sitting in front of a
//!   [`PersistentEntityStore`].
//!
//! Components are assembled once at process start and shared by reference:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mirror::{EntityIdResolver, ImporterConfig, InMemoryEntityStore};
//!
//! let config = ImporterConfig::default();
//! let store = Arc::new(InMemoryEntityStore::new());
//! let resolver = Arc::new(EntityIdResolver::new(&config, store));
//! ```

pub mod config;
pub mod entity;
pub mod proto;
pub mod stream;

pub use config::{CacheConfig, ImporterConfig, NetworkConfig};
pub use entity::{
    CacheKey, EntityId, EntityIdCache, EntityIdError, EntityIdResolver, EntityType,
    ExternalEntity, InMemoryEntityStore, PersistentEntityStore, RawIdentifier,
    EVM_ADDRESS_LENGTH,
};
pub use stream::{Compressor, FileType, StreamFileError, StreamFilename, StreamType};
