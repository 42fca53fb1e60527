//! Entity identity resolution.
//!
//! # Architecture
//!
//! ```text
//! protobuf AccountID / ContractID
//!          ↓ (crate::proto)
//!    RawIdentifier ──→ EntityIdResolver ──→ EntityId
//!                        ↓          ↑
//!                  EntityIdCache   notify(ExternalEntity)
//!                        ↓
//!               PersistentEntityStore
//! ```

mod cache;
mod id;
mod identifier;
mod resolver;
mod store;

pub use cache::{CacheStatsSnapshot, EntityIdCache};
pub use id::{EntityId, EntityIdError, EntityType, EVM_ADDRESS_LENGTH};
pub use identifier::{CacheKey, CacheKeyValue, RawIdentifier};
pub use resolver::EntityIdResolver;
pub use store::{ExternalEntity, InMemoryEntityStore, PersistentEntityStore};
