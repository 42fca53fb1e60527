//! Wire identifier encodings and the cache keys derived from them.

use std::fmt;

use super::id::EVM_ADDRESS_LENGTH;

/// One of the three encodings a transaction can use to reference an account or contract.
///
/// Decoded once at the protobuf boundary (see [`crate::proto`]) and matched exhaustively
/// from then on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawIdentifier {
    Numeric {
        shard: u64,
        realm: u64,
        num: u64,
    },
    Alias {
        shard: u64,
        realm: u64,
        alias: Vec<u8>,
    },
    EvmAddress {
        shard: u64,
        realm: u64,
        address: [u8; EVM_ADDRESS_LENGTH],
    },
}

impl RawIdentifier {
    pub fn numeric(shard: u64, realm: u64, num: u64) -> Self {
        RawIdentifier::Numeric { shard, realm, num }
    }

    pub fn alias(shard: u64, realm: u64, alias: impl Into<Vec<u8>>) -> Self {
        RawIdentifier::Alias {
            shard,
            realm,
            alias: alias.into(),
        }
    }

    pub fn evm_address(shard: u64, realm: u64, address: [u8; EVM_ADDRESS_LENGTH]) -> Self {
        RawIdentifier::EvmAddress {
            shard,
            realm,
            address,
        }
    }

    /// The protobuf default instance: numeric with every component unset.
    pub fn is_default(&self) -> bool {
        matches!(
            self,
            RawIdentifier::Numeric {
                shard: 0,
                realm: 0,
                num: 0
            }
        )
    }

    pub fn shard(&self) -> u64 {
        match self {
            RawIdentifier::Numeric { shard, .. }
            | RawIdentifier::Alias { shard, .. }
            | RawIdentifier::EvmAddress { shard, .. } => *shard,
        }
    }

    pub fn realm(&self) -> u64 {
        match self {
            RawIdentifier::Numeric { realm, .. }
            | RawIdentifier::Alias { realm, .. }
            | RawIdentifier::EvmAddress { realm, .. } => *realm,
        }
    }

    /// Cache key for alias and EVM address forms. Numeric identifiers resolve by
    /// construction and never touch the cache.
    pub fn cache_key(&self) -> Option<CacheKey> {
        match self {
            RawIdentifier::Numeric { .. } => None,
            RawIdentifier::Alias {
                shard,
                realm,
                alias,
            } => Some(CacheKey::alias(*shard, *realm, alias)),
            RawIdentifier::EvmAddress {
                shard,
                realm,
                address,
            } => Some(CacheKey::evm_address(*shard, *realm, *address)),
        }
    }
}

impl fmt::Display for RawIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawIdentifier::Numeric { shard, realm, num } => write!(f, "{shard}.{realm}.{num}"),
            RawIdentifier::Alias {
                shard,
                realm,
                alias,
            } => write!(f, "{shard}.{realm}.{}", hex::encode(alias)),
            RawIdentifier::EvmAddress {
                shard,
                realm,
                address,
            } => write!(f, "{shard}.{realm}.0x{}", hex::encode(address)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKeyValue {
    Alias(Vec<u8>),
    EvmAddress([u8; EVM_ADDRESS_LENGTH]),
}

/// Key of the entity id cache.
///
/// Built the same way from a [`RawIdentifier`] being resolved and from an entity being
/// announced through `notify`, so both paths land on the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub shard: u64,
    pub realm: u64,
    pub value: CacheKeyValue,
}

impl CacheKey {
    pub fn alias(shard: u64, realm: u64, alias: &[u8]) -> Self {
        Self {
            shard,
            realm,
            value: CacheKeyValue::Alias(alias.to_vec()),
        }
    }

    pub fn evm_address(shard: u64, realm: u64, address: [u8; EVM_ADDRESS_LENGTH]) -> Self {
        Self {
            shard,
            realm,
            value: CacheKeyValue::EvmAddress(address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_instance() {
        assert!(RawIdentifier::numeric(0, 0, 0).is_default());
        assert!(!RawIdentifier::numeric(0, 0, 1).is_default());
        assert!(!RawIdentifier::numeric(1, 0, 0).is_default());
        assert!(!RawIdentifier::alias(0, 0, vec![]).is_default());
    }

    #[test]
    fn test_numeric_has_no_cache_key() {
        assert_eq!(RawIdentifier::numeric(0, 0, 100).cache_key(), None);
    }

    #[test]
    fn test_cache_key_matches_direct_construction() {
        let alias = vec![0x12, 0x20, 0xab];
        assert_eq!(
            RawIdentifier::alias(0, 1, alias.clone()).cache_key(),
            Some(CacheKey::alias(0, 1, &alias))
        );

        let address = [7u8; 20];
        assert_eq!(
            RawIdentifier::evm_address(0, 1, address).cache_key(),
            Some(CacheKey::evm_address(0, 1, address))
        );
    }

    #[test]
    fn test_alias_and_evm_keys_do_not_collide() {
        let bytes = [9u8; 20];
        assert_ne!(
            CacheKey::alias(0, 0, &bytes),
            CacheKey::evm_address(0, 0, bytes)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(RawIdentifier::numeric(0, 0, 5).to_string(), "0.0.5");
        assert_eq!(
            RawIdentifier::alias(0, 0, vec![0xab, 0xcd]).to_string(),
            "0.0.abcd"
        );
        let mut address = [0u8; 20];
        address[19] = 1;
        assert_eq!(
            RawIdentifier::evm_address(0, 0, address).to_string(),
            "0.0.0x0000000000000000000000000000000000000001"
        );
    }
}
