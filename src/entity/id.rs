//! Canonical entity identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of an EVM address in bytes.
pub const EVM_ADDRESS_LENGTH: usize = 20;

// Bit widths of the packed `i64` encoding.
const SHARD_BITS: u32 = 10;
const REALM_BITS: u32 = 16;
const NUM_BITS: u32 = 38;

const SHARD_MASK: u64 = (1 << SHARD_BITS) - 1;
const REALM_MASK: u64 = (1 << REALM_BITS) - 1;
const NUM_MASK: u64 = (1 << NUM_BITS) - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityIdError {
    #[error("Invalid entity id: {0}")]
    InvalidFormat(String),
    #[error("Entity id {component} {value} exceeds {bits} bits")]
    OutOfRange {
        component: &'static str,
        value: u64,
        bits: u32,
    },
    #[error("Invalid EVM address length: expected {EVM_ADDRESS_LENGTH} bytes, got {0}")]
    InvalidEvmAddress(usize),
}

pub type Result<T> = std::result::Result<T, EntityIdError>;

/// Kind of network entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    Unknown,
    Account,
    Contract,
    File,
    Topic,
    Token,
    Schedule,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Unknown => "unknown",
            EntityType::Account => "account",
            EntityType::Contract => "contract",
            EntityType::File => "file",
            EntityType::Topic => "topic",
            EntityType::Token => "token",
            EntityType::Schedule => "schedule",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical `(shard, realm, num, type)` identity of a network entity.
///
/// [`EntityId::EMPTY`] means "no entity" and is distinct from an unresolved
/// reference, which callers see as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    shard: u64,
    realm: u64,
    num: u64,
    entity_type: EntityType,
}

impl EntityId {
    pub const EMPTY: EntityId = EntityId::new(0, 0, 0, EntityType::Unknown);

    pub const fn new(shard: u64, realm: u64, num: u64, entity_type: EntityType) -> Self {
        Self {
            shard,
            realm,
            num,
            entity_type,
        }
    }

    /// Parses `shard.realm.num`.
    pub fn parse(value: &str, entity_type: EntityType) -> Result<Self> {
        let invalid = || EntityIdError::InvalidFormat(value.to_string());
        let mut parts = value.split('.');
        let mut next = || -> Result<u64> {
            parts
                .next()
                .and_then(|part| part.parse::<u64>().ok())
                .ok_or_else(invalid)
        };

        let shard = next()?;
        let realm = next()?;
        let num = next()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self::new(shard, realm, num, entity_type))
    }

    pub fn shard(&self) -> u64 {
        self.shard
    }

    pub fn realm(&self) -> u64 {
        self.realm
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// The 20-byte "long-zero" EVM address: 4-byte shard, 8-byte realm, 8-byte num, big-endian.
    pub fn to_evm_address(&self) -> [u8; EVM_ADDRESS_LENGTH] {
        let mut address = [0u8; EVM_ADDRESS_LENGTH];
        address[..4].copy_from_slice(&(self.shard as u32).to_be_bytes());
        address[4..12].copy_from_slice(&self.realm.to_be_bytes());
        address[12..].copy_from_slice(&self.num.to_be_bytes());
        address
    }

    /// Decodes an EVM address that structurally encodes a `shard.realm.num`.
    ///
    /// The address is only accepted when every component fits the packed id encoding
    /// (10-bit shard, 16-bit realm, 38-bit num). Addresses derived from keys essentially
    /// never satisfy this, so `None` means the address must be looked up instead.
    pub fn from_evm_address(
        address: &[u8; EVM_ADDRESS_LENGTH],
        entity_type: EntityType,
    ) -> Option<Self> {
        let mut shard = [0u8; 4];
        let mut realm = [0u8; 8];
        let mut num = [0u8; 8];
        shard.copy_from_slice(&address[..4]);
        realm.copy_from_slice(&address[4..12]);
        num.copy_from_slice(&address[12..]);

        let shard = u64::from(u32::from_be_bytes(shard));
        let realm = u64::from_be_bytes(realm);
        let num = u64::from_be_bytes(num);

        if shard > SHARD_MASK || realm > REALM_MASK || num > NUM_MASK {
            return None;
        }

        Some(Self::new(shard, realm, num, entity_type))
    }

    /// Packs the id into a single `i64`: `shard << 54 | realm << 38 | num`.
    pub fn encoded_id(&self) -> Result<i64> {
        let check = |component: &'static str, value: u64, bits: u32, mask: u64| {
            if value > mask {
                Err(EntityIdError::OutOfRange {
                    component,
                    value,
                    bits,
                })
            } else {
                Ok(())
            }
        };
        check("shard", self.shard, SHARD_BITS, SHARD_MASK)?;
        check("realm", self.realm, REALM_BITS, REALM_MASK)?;
        check("num", self.num, NUM_BITS, NUM_MASK)?;

        let encoded =
            (self.shard << (REALM_BITS + NUM_BITS)) | (self.realm << NUM_BITS) | self.num;
        Ok(encoded as i64)
    }

    pub fn from_encoded_id(encoded: i64, entity_type: EntityType) -> Self {
        let encoded = encoded as u64;
        Self::new(
            (encoded >> (REALM_BITS + NUM_BITS)) & SHARD_MASK,
            (encoded >> NUM_BITS) & REALM_MASK,
            encoded & NUM_MASK,
            entity_type,
        )
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_distinct_from_zero_account() {
        assert!(EntityId::EMPTY.is_empty());
        assert!(!EntityId::new(0, 0, 0, EntityType::Account).is_empty());
        assert_eq!(EntityId::EMPTY.to_string(), "0.0.0");
    }

    #[test]
    fn test_parse() {
        let id = EntityId::parse("1.2.300", EntityType::Account).unwrap();
        assert_eq!((id.shard(), id.realm(), id.num()), (1, 2, 300));
        assert_eq!(id.entity_type(), EntityType::Account);
        assert_eq!(id.to_string(), "1.2.300");

        for bad in ["", "1.2", "1.2.3.4", "a.b.c", "1..3", "-1.0.3"] {
            assert!(
                EntityId::parse(bad, EntityType::Account).is_err(),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_evm_address_layout() {
        let id = EntityId::new(1, 2, 0x0102_0304, EntityType::Contract);
        let address = id.to_evm_address();

        assert_eq!(&address[..4], &[0, 0, 0, 1]);
        assert_eq!(&address[4..12], &[0, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(&address[12..], &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(
            EntityId::from_evm_address(&address, EntityType::Contract),
            Some(id)
        );
    }

    #[test]
    fn test_key_derived_evm_address_is_not_decoded() {
        let address: [u8; 20] = hex::decode("71c7656ec7ab88b098defb751b7401b5f6d8976f")
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(
            EntityId::from_evm_address(&address, EntityType::Account),
            None
        );
    }

    #[test]
    fn test_encoded_id() {
        let id = EntityId::new(1, 2, 3, EntityType::Account);
        let encoded = id.encoded_id().unwrap();
        assert_eq!(encoded, (1i64 << 54) | (2i64 << 38) | 3);
        assert_eq!(EntityId::from_encoded_id(encoded, EntityType::Account), id);

        let too_big = EntityId::new(1 << 10, 0, 0, EntityType::Account);
        assert_eq!(
            too_big.encoded_id(),
            Err(EntityIdError::OutOfRange {
                component: "shard",
                value: 1 << 10,
                bits: 10,
            })
        );
    }
}
