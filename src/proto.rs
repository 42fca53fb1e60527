//! Protobuf account and contract references.
//!
//! Mirrors the `AccountID` and `ContractID` messages of the network's HAPI protobufs.
//! The `oneof` is resolved into a [`RawIdentifier`] exactly once, here, so the rest of
//! the importer never asks "which field is set".

use crate::entity::{EntityIdError, RawIdentifier, EVM_ADDRESS_LENGTH};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountId {
    #[prost(int64, tag = "1")]
    pub shard_num: i64,
    #[prost(int64, tag = "2")]
    pub realm_num: i64,
    #[prost(oneof = "account_id::Account", tags = "3, 4")]
    pub account: ::core::option::Option<account_id::Account>,
}

pub mod account_id {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Account {
        #[prost(int64, tag = "3")]
        AccountNum(i64),
        /// Key alias, or a 20-byte EVM address.
        #[prost(bytes = "vec", tag = "4")]
        Alias(::prost::alloc::vec::Vec<u8>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContractId {
    #[prost(int64, tag = "1")]
    pub shard_num: i64,
    #[prost(int64, tag = "2")]
    pub realm_num: i64,
    #[prost(oneof = "contract_id::Contract", tags = "3, 4")]
    pub contract: ::core::option::Option<contract_id::Contract>,
}

pub mod contract_id {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Contract {
        #[prost(int64, tag = "3")]
        ContractNum(i64),
        #[prost(bytes = "vec", tag = "4")]
        EvmAddress(::prost::alloc::vec::Vec<u8>),
    }
}

fn unsigned(component: &str, value: i64) -> Result<u64, EntityIdError> {
    u64::try_from(value)
        .map_err(|_| EntityIdError::InvalidFormat(format!("negative {component}: {value}")))
}

impl TryFrom<&AccountId> for RawIdentifier {
    type Error = EntityIdError;

    fn try_from(id: &AccountId) -> Result<Self, Self::Error> {
        let shard = unsigned("shard", id.shard_num)?;
        let realm = unsigned("realm", id.realm_num)?;

        Ok(match &id.account {
            None => RawIdentifier::numeric(shard, realm, 0),
            Some(account_id::Account::AccountNum(num)) => {
                RawIdentifier::numeric(shard, realm, unsigned("num", *num)?)
            }
            Some(account_id::Account::Alias(alias)) => {
                match <[u8; EVM_ADDRESS_LENGTH]>::try_from(alias.as_slice()) {
                    Ok(address) => RawIdentifier::evm_address(shard, realm, address),
                    Err(_) => RawIdentifier::alias(shard, realm, alias.clone()),
                }
            }
        })
    }
}

impl TryFrom<&ContractId> for RawIdentifier {
    type Error = EntityIdError;

    fn try_from(id: &ContractId) -> Result<Self, Self::Error> {
        let shard = unsigned("shard", id.shard_num)?;
        let realm = unsigned("realm", id.realm_num)?;

        Ok(match &id.contract {
            None => RawIdentifier::numeric(shard, realm, 0),
            Some(contract_id::Contract::ContractNum(num)) => {
                RawIdentifier::numeric(shard, realm, unsigned("num", *num)?)
            }
            Some(contract_id::Contract::EvmAddress(address)) => {
                let address = <[u8; EVM_ADDRESS_LENGTH]>::try_from(address.as_slice())
                    .map_err(|_| EntityIdError::InvalidEvmAddress(address.len()))?;
                RawIdentifier::evm_address(shard, realm, address)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_default_account_is_default_identifier() {
        let id = RawIdentifier::try_from(&AccountId::default()).unwrap();
        assert!(id.is_default());
    }

    #[test]
    fn test_account_oneof_variants() {
        let numeric = AccountId {
            shard_num: 0,
            realm_num: 0,
            account: Some(account_id::Account::AccountNum(98)),
        };
        assert_eq!(
            RawIdentifier::try_from(&numeric).unwrap(),
            RawIdentifier::numeric(0, 0, 98)
        );

        let key_alias = vec![0x12, 0x20, 0xaa, 0xbb];
        let alias = AccountId {
            shard_num: 0,
            realm_num: 0,
            account: Some(account_id::Account::Alias(key_alias.clone())),
        };
        assert_eq!(
            RawIdentifier::try_from(&alias).unwrap(),
            RawIdentifier::alias(0, 0, key_alias)
        );

        let evm = AccountId {
            shard_num: 0,
            realm_num: 0,
            account: Some(account_id::Account::Alias(vec![0x11; 20])),
        };
        assert_eq!(
            RawIdentifier::try_from(&evm).unwrap(),
            RawIdentifier::evm_address(0, 0, [0x11; 20])
        );
    }

    #[test]
    fn test_decoded_contract_id() {
        let contract = ContractId {
            shard_num: 0,
            realm_num: 1,
            contract: Some(contract_id::Contract::EvmAddress(vec![0x22; 20])),
        };
        let decoded = ContractId::decode(contract.encode_to_vec().as_slice()).unwrap();

        assert_eq!(
            RawIdentifier::try_from(&decoded).unwrap(),
            RawIdentifier::evm_address(0, 1, [0x22; 20])
        );
    }

    #[test]
    fn test_invalid_contract_ids() {
        let short = ContractId {
            shard_num: 0,
            realm_num: 0,
            contract: Some(contract_id::Contract::EvmAddress(vec![0x22; 19])),
        };
        assert_eq!(
            RawIdentifier::try_from(&short),
            Err(EntityIdError::InvalidEvmAddress(19))
        );

        let negative = ContractId {
            shard_num: -1,
            realm_num: 0,
            contract: Some(contract_id::Contract::ContractNum(5)),
        };
        assert!(RawIdentifier::try_from(&negative).is_err());
    }
}
