//! Entity id resolution.
//!
//! Turns the wire encodings of an account or contract reference into a canonical
//! [`EntityId`]:
//!
//! 1. Numeric ids are constructed directly, without touching the cache or the store.
//! 2. Alias and EVM address forms are served from the [`EntityIdCache`] when warm.
//! 3. EVM addresses that encode a `shard.realm.num` of the local network are decoded
//!    in place.
//! 4. Everything else is looked up in the [`PersistentEntityStore`].
//!
//! Misses are not errors. An identifier that cannot be resolved yet yields `None` and is
//! not negatively cached, so it resolves on the first call after the entity is persisted
//! or announced through [`EntityIdResolver::notify`].

use std::sync::Arc;

use super::cache::EntityIdCache;
use super::id::{EntityId, EntityType, EVM_ADDRESS_LENGTH};
use super::identifier::{CacheKey, RawIdentifier};
use super::store::{ExternalEntity, PersistentEntityStore};
use crate::config::{ImporterConfig, NetworkConfig};

/// Resolves account and contract references to canonical entity ids.
///
/// # Thread Safety
///
/// All methods take `&self`; share one resolver across ingestion workers with `Arc`.
/// A `notify` from one worker is visible to every `resolve_*` call issued afterwards.
pub struct EntityIdResolver {
    cache: EntityIdCache,
    store: Arc<dyn PersistentEntityStore>,
    network: NetworkConfig,
}

impl EntityIdResolver {
    pub fn new(config: &ImporterConfig, store: Arc<dyn PersistentEntityStore>) -> Self {
        Self::with_cache(EntityIdCache::new(config.cache), config.network, store)
    }

    pub fn with_cache(
        cache: EntityIdCache,
        network: NetworkConfig,
        store: Arc<dyn PersistentEntityStore>,
    ) -> Self {
        Self {
            cache,
            store,
            network,
        }
    }

    pub fn cache(&self) -> &EntityIdCache {
        &self.cache
    }

    /// Resolve a single reference.
    ///
    /// Returns `Some(EntityId::EMPTY)` for an absent reference or the numeric default
    /// instance, and `None` for a well-formed reference that does not resolve (yet).
    /// `entity_type` types ids built from numeric or long-zero EVM forms; store hits keep
    /// the type recorded in the store.
    pub async fn resolve_one(
        &self,
        entity_type: EntityType,
        id: Option<&RawIdentifier>,
    ) -> Option<EntityId> {
        let Some(id) = id else {
            return Some(EntityId::EMPTY);
        };

        let Some(key) = id.cache_key() else {
            return Some(match *id {
                RawIdentifier::Numeric { shard, realm, num } if !id.is_default() => {
                    EntityId::new(shard, realm, num, entity_type)
                }
                _ => EntityId::EMPTY,
            });
        };

        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let found = match id {
            RawIdentifier::Alias {
                shard,
                realm,
                alias,
            } => self.store.find_by_alias(*shard, *realm, alias).await,
            RawIdentifier::EvmAddress {
                shard,
                realm,
                address,
            } => {
                if let Some(decoded) = EntityId::from_evm_address(address, entity_type) {
                    return self.resolve_long_zero(id, key, decoded);
                }
                self.store
                    .find_by_evm_address(*shard, *realm, address)
                    .await
            }
            // Keyless, answered above.
            RawIdentifier::Numeric { .. } => Ok(None),
        };
        self.cache_store_result(id, key, found)
    }

    /// Resolve the first reference that yields an entity.
    ///
    /// Candidates are tried strictly in order and evaluation stops at the first one that
    /// resolves to a non-empty id; later candidates are never looked up. Absent entries and
    /// candidates resolving to `EMPTY` are skipped. Returns `EntityId::EMPTY` when nothing
    /// resolves, unlike [`Self::resolve_one`] which reports that as `None`.
    pub async fn resolve_first(
        &self,
        entity_type: EntityType,
        ids: &[Option<RawIdentifier>],
    ) -> EntityId {
        for id in ids.iter().flatten() {
            match self.resolve_one(entity_type, Some(id)).await {
                Some(entity_id) if !entity_id.is_empty() => return entity_id,
                _ => {}
            }
        }

        EntityId::EMPTY
    }

    /// Register an entity created in the current batch, ahead of it being persisted.
    ///
    /// No-op for an absent or deleted entity, or one with neither alias nor EVM address.
    pub fn notify(&self, entity: Option<&ExternalEntity>) {
        let Some(entity) = entity else {
            return;
        };
        if entity.deleted || (entity.alias.is_none() && entity.evm_address.is_none()) {
            return;
        }

        let id = entity.id();

        if let Some(alias) = &entity.alias {
            self.cache
                .put(CacheKey::alias(entity.shard, entity.realm, alias), id);
        }

        if let Some(evm_address) = &entity.evm_address {
            match <[u8; EVM_ADDRESS_LENGTH]>::try_from(evm_address.as_slice()) {
                Ok(address) => self.cache.put(
                    CacheKey::evm_address(entity.shard, entity.realm, address),
                    id,
                ),
                Err(_) => tracing::warn!(
                    target: "mirror::entity::resolver",
                    entity = %id,
                    length = evm_address.len(),
                    "Ignoring malformed EVM address on notified entity"
                ),
            }
        }

        tracing::trace!(
            target: "mirror::entity::resolver",
            entity = %id,
            "Cached notified entity"
        );
    }

    fn resolve_long_zero(
        &self,
        id: &RawIdentifier,
        key: CacheKey,
        decoded: EntityId,
    ) -> Option<EntityId> {
        if decoded.shard() != self.network.shard || decoded.realm() != self.network.realm {
            tracing::debug!(
                target: "mirror::entity::resolver",
                identifier = %id,
                decoded = %decoded,
                shard = self.network.shard,
                realm = self.network.realm,
                "EVM address encodes an entity outside the local shard and realm"
            );
            return None;
        }

        if decoded.num() == 0 {
            return Some(EntityId::EMPTY);
        }

        self.cache.put(key, decoded);
        Some(decoded)
    }

    fn cache_store_result(
        &self,
        id: &RawIdentifier,
        key: CacheKey,
        found: anyhow::Result<Option<ExternalEntity>>,
    ) -> Option<EntityId> {
        match found {
            Ok(Some(entity)) if !entity.deleted => {
                let entity_id = entity.id();
                self.cache.put(key, entity_id);
                tracing::trace!(
                    target: "mirror::entity::resolver",
                    identifier = %id,
                    entity = %entity_id,
                    "Resolved from store"
                );
                Some(entity_id)
            }
            Ok(_) => {
                tracing::debug!(
                    target: "mirror::entity::resolver",
                    identifier = %id,
                    "Entity not found"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    target: "mirror::entity::resolver",
                    identifier = %id,
                    error = %e,
                    "Entity lookup failed"
                );
                None
            }
        }
    }
}
