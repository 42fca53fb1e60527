//! JSON-backed entities and command line entity references.

use std::path::Path;

use anyhow::{bail, Context, Result};
use mirror::{
    EntityId, EntityType, ExternalEntity, InMemoryEntityStore, NetworkConfig, RawIdentifier,
    EVM_ADDRESS_LENGTH,
};
use serde::Deserialize;

const ALIAS_PREFIX: &str = "alias:";

/// One entity of an `--entities` file.
///
/// ```json
/// {"id": "0.0.1001", "type": "account", "alias": "1220...", "deleted": false}
/// ```
#[derive(Debug, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub entity_type: EntityType,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub evm_address: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl EntityRecord {
    pub fn into_entity(self) -> Result<ExternalEntity> {
        let id = EntityId::parse(&self.id, self.entity_type)
            .with_context(|| format!("Invalid entity id '{}'", self.id))?;

        let mut entity = ExternalEntity::new(id).with_deleted(self.deleted);
        if let Some(alias) = &self.alias {
            entity = entity.with_alias(decode_hex(alias)?);
        }
        if let Some(evm_address) = &self.evm_address {
            entity = entity.with_evm_address(decode_hex(evm_address)?);
        }
        Ok(entity)
    }
}

/// Load a JSON array of [`EntityRecord`]s into an in-memory store.
pub fn load_entities(path: &Path) -> Result<InMemoryEntityStore> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read entities file: {}", path.display()))?;
    let records: Vec<EntityRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse entities file: {}", path.display()))?;

    let store = InMemoryEntityStore::new();
    for record in records {
        store.upsert(record.into_entity()?);
    }

    tracing::info!(
        target: "mirror_importer::entities",
        path = %path.display(),
        count = store.len(),
        "Loaded entities"
    );

    Ok(store)
}

/// Parse an entity reference: `shard.realm.num`, a packed numeric id, `0x<40 hex>` or
/// `alias:<hex>`.
///
/// Alias and EVM address references are scoped to the local shard and realm.
pub fn parse_reference(value: &str, network: &NetworkConfig) -> Result<RawIdentifier> {
    if let Some(alias) = value.strip_prefix(ALIAS_PREFIX) {
        let alias = decode_hex(alias)?;
        if alias.is_empty() {
            bail!("Empty alias in '{value}'");
        }
        return Ok(RawIdentifier::alias(network.shard, network.realm, alias));
    }

    if value.starts_with("0x") {
        let bytes = decode_hex(value)?;
        let address: [u8; EVM_ADDRESS_LENGTH] = bytes.as_slice().try_into().with_context(|| {
            format!(
                "EVM address '{value}' must be {EVM_ADDRESS_LENGTH} bytes, got {}",
                bytes.len()
            )
        })?;
        return Ok(RawIdentifier::evm_address(
            network.shard,
            network.realm,
            address,
        ));
    }

    if let Some(encoded) = value.parse::<i64>().ok().filter(|encoded| *encoded >= 0) {
        let id = EntityId::from_encoded_id(encoded, EntityType::Unknown);
        return Ok(RawIdentifier::numeric(id.shard(), id.realm(), id.num()));
    }

    let id = EntityId::parse(value, EntityType::Unknown)
        .with_context(|| format!("Invalid entity reference '{value}'"))?;
    Ok(RawIdentifier::numeric(id.shard(), id.realm(), id.num()))
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).with_context(|| format!("Invalid hex '{value}'"))
}
