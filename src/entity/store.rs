//! Persistent entity lookups consumed by the resolver.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use super::id::{EntityId, EntityType};

/// An entity row as seen by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEntity {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
    pub entity_type: EntityType,
    pub alias: Option<Vec<u8>>,
    pub evm_address: Option<Vec<u8>>,
    pub deleted: bool,
}

impl ExternalEntity {
    pub fn new(id: EntityId) -> Self {
        Self {
            shard: id.shard(),
            realm: id.realm(),
            num: id.num(),
            entity_type: id.entity_type(),
            alias: None,
            evm_address: None,
            deleted: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<Vec<u8>>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_evm_address(mut self, evm_address: impl Into<Vec<u8>>) -> Self {
        self.evm_address = Some(evm_address.into());
        self
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    pub fn id(&self) -> EntityId {
        EntityId::new(self.shard, self.realm, self.num, self.entity_type)
    }
}

/// Durable source of truth for entities.
///
/// Implementations must exclude rows marked deleted. Errors are reported to the caller;
/// the resolver treats them as a miss.
#[async_trait]
pub trait PersistentEntityStore: Send + Sync {
    async fn find_by_alias(
        &self,
        shard: u64,
        realm: u64,
        alias: &[u8],
    ) -> Result<Option<ExternalEntity>>;

    async fn find_by_evm_address(
        &self,
        shard: u64,
        realm: u64,
        evm_address: &[u8],
    ) -> Result<Option<ExternalEntity>>;
}

/// In-process entity store keyed by `shard.realm.num`.
///
/// Used by tests and by the `resolve` command of the importer binary.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    entities: DashMap<(u64, u64, u64), ExternalEntity>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity.
    pub fn upsert(&self, entity: ExternalEntity) {
        self.entities
            .insert((entity.shard, entity.realm, entity.num), entity);
    }

    /// Mark an entity deleted. Returns false if it is unknown.
    pub fn mark_deleted(&self, id: EntityId) -> bool {
        match self.entities.get_mut(&(id.shard(), id.realm(), id.num())) {
            Some(mut entity) => {
                entity.deleted = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn find<F>(&self, shard: u64, realm: u64, matches: F) -> Option<ExternalEntity>
    where
        F: Fn(&ExternalEntity) -> bool,
    {
        self.entities
            .iter()
            .find(|entry| {
                let entity = entry.value();
                entity.shard == shard && entity.realm == realm && !entity.deleted && matches(entity)
            })
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl PersistentEntityStore for InMemoryEntityStore {
    async fn find_by_alias(
        &self,
        shard: u64,
        realm: u64,
        alias: &[u8],
    ) -> Result<Option<ExternalEntity>> {
        Ok(self.find(shard, realm, |entity| {
            entity.alias.as_deref() == Some(alias)
        }))
    }

    async fn find_by_evm_address(
        &self,
        shard: u64,
        realm: u64,
        evm_address: &[u8],
    ) -> Result<Option<ExternalEntity>> {
        Ok(self.find(shard, realm, |entity| {
            entity.evm_address.as_deref() == Some(evm_address)
        }))
    }
}
