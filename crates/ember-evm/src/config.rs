//! Execution configuration
//!
//! Plain serde structs, loaded from TOML by the binary. Word-valued fields
//! are strings holding `0x` hex or decimal; addresses are 40 hex digits.
//! Nothing is validated until [`ExecutionConfig::environment`] or
//! [`ExecutionConfig::seeded_accounts`] parses the fields.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use ember_primitives::{Address, BlockNumber, Gas, H256};
use serde::{Deserialize, Serialize};

use crate::context::{AccessListItem, BlockContext, Environment, Message, TxContext};
use crate::error::{EvmError, EvmResult};
use crate::program::decode_hex;
use crate::word::Word;

/// Full execution configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Chain parameters
    #[serde(default)]
    pub chain: ChainConfig,
    /// Block fields
    #[serde(default)]
    pub block: BlockConfig,
    /// Transaction fields
    #[serde(default)]
    pub transaction: TransactionConfig,
    /// Pre-seeded accounts
    #[serde(default)]
    pub contracts: Vec<ContractConfig>,
    /// Remote state, absent for offline simulation
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

/// Chain parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    1
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
        }
    }
}

/// Block fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Block number
    #[serde(default)]
    pub number: BlockNumber,
    /// Timestamp
    #[serde(default)]
    pub timestamp: u64,
    /// Difficulty / PREVRANDAO
    #[serde(default)]
    pub difficulty: String,
    /// Block gas limit
    #[serde(default = "default_block_gas_limit")]
    pub gas_limit: Gas,
    /// Base fee
    #[serde(default)]
    pub base_fee: String,
    /// Coinbase address
    #[serde(default)]
    pub coinbase: String,
    /// Block number -> hash, for BLOCKHASH
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
}

fn default_block_gas_limit() -> Gas {
    30_000_000
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            difficulty: String::new(),
            gas_limit: default_block_gas_limit(),
            base_fee: String::new(),
            coinbase: String::new(),
            hashes: BTreeMap::new(),
        }
    }
}

/// Transaction fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Sender
    #[serde(default = "default_from")]
    pub from: String,
    /// Contract to execute
    #[serde(default = "default_to")]
    pub to: String,
    /// Calldata hex
    #[serde(default)]
    pub calldata: String,
    /// Value sent
    #[serde(default)]
    pub value: String,
    /// Gas limit
    #[serde(default = "default_tx_gas_limit")]
    pub gas_limit: Gas,
    /// Gas price
    #[serde(default)]
    pub gas_price: String,
    /// Transaction type
    #[serde(default, rename = "type")]
    pub tx_type: u8,
    /// Selector hex, used as calldata when `calldata` is empty
    #[serde(default)]
    pub sig: String,
    /// EIP-2930 access list
    #[serde(default)]
    pub access_list: Vec<AccessListConfig>,
}

fn default_from() -> String {
    "0x0000000000000000000000000000000000001000".to_string()
}

fn default_to() -> String {
    "0x0000000000000000000000000000000000002000".to_string()
}

fn default_tx_gas_limit() -> Gas {
    1_000_000
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            to: default_to(),
            calldata: String::new(),
            value: String::new(),
            gas_limit: default_tx_gas_limit(),
            gas_price: String::new(),
            tx_type: 0,
            sig: String::new(),
            access_list: Vec::new(),
        }
    }
}

/// Access list entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessListConfig {
    /// Account
    pub address: String,
    /// Slots
    #[serde(default)]
    pub storage_keys: Vec<String>,
}

/// Pre-seeded account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Account address
    pub address: String,
    /// Bytecode hex
    #[serde(default)]
    pub bytecode: String,
    /// Balance
    #[serde(default)]
    pub balance: String,
    /// Slot -> value
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
}

/// Remote state source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// JSON-RPC endpoint
    #[serde(default)]
    pub rpc_url: String,
    /// Block to read state at (defaults to `block.number`)
    #[serde(default)]
    pub block_number: Option<BlockNumber>,
}

/// Parsed [`ContractConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededAccount {
    /// Address
    pub address: Address,
    /// Bytecode
    pub code: Bytes,
    /// Balance
    pub balance: Word,
    /// Slots
    pub slots: HashMap<Word, Word>,
}

impl ExecutionConfig {
    /// Parse block, transaction and message fields
    pub fn environment(&self) -> EvmResult<Environment> {
        let b = &self.block;
        let t = &self.transaction;

        let mut hashes = BTreeMap::new();
        for (number, hash) in &b.hashes {
            let n = parse_word("block.hashes", number)?
                .to_u64()
                .ok_or_else(|| invalid("block.hashes", format!("block number {} too large", number)))?;
            let h = H256::from_hex(hash).map_err(|e| invalid("block.hashes", e))?;
            hashes.insert(n, h);
        }

        let block = BlockContext {
            number: b.number,
            timestamp: b.timestamp,
            gas_limit: b.gas_limit,
            coinbase: parse_address_or_zero("block.coinbase", &b.coinbase)?,
            difficulty: parse_word("block.difficulty", &b.difficulty)?,
            chain_id: self.chain.chain_id,
            base_fee: parse_word("block.base_fee", &b.base_fee)?,
            hashes,
        };

        let mut access_list = Vec::with_capacity(t.access_list.len());
        for item in &t.access_list {
            let storage_keys = item
                .storage_keys
                .iter()
                .map(|k| parse_word("transaction.access_list.storage_keys", k))
                .collect::<EvmResult<Vec<_>>>()?;
            access_list.push(AccessListItem {
                address: parse_address("transaction.access_list.address", &item.address)?,
                storage_keys,
            });
        }

        let origin = parse_address("transaction.from", &t.from)?;
        let tx = TxContext {
            origin,
            gas_price: parse_word("transaction.gas_price", &t.gas_price)?,
            tx_type: t.tx_type,
            access_list,
        };

        let message = Message {
            address: parse_address("transaction.to", &t.to)?,
            caller: origin,
            value: parse_word("transaction.value", &t.value)?,
            data: self.calldata()?,
            gas_limit: t.gas_limit,
        };

        Ok(Environment { block, tx, message })
    }

    /// Calldata, falling back to `sig` when `calldata` is empty
    pub fn calldata(&self) -> EvmResult<Bytes> {
        let t = &self.transaction;
        let (field, source) = if t.calldata.trim().is_empty() {
            ("transaction.sig", &t.sig)
        } else {
            ("transaction.calldata", &t.calldata)
        };
        decode_hex(source)
            .map(Bytes::from)
            .map_err(|e| invalid(field, e))
    }

    /// Parse `[[contracts]]`
    pub fn seeded_accounts(&self) -> EvmResult<Vec<SeededAccount>> {
        self.contracts
            .iter()
            .map(|c| {
                let mut slots = HashMap::with_capacity(c.slots.len());
                for (key, value) in &c.slots {
                    slots.insert(
                        parse_word("contracts.slots", key)?,
                        parse_word("contracts.slots", value)?,
                    );
                }
                Ok(SeededAccount {
                    address: parse_address("contracts.address", &c.address)?,
                    code: decode_hex(&c.bytecode)
                        .map(Bytes::from)
                        .map_err(|e| invalid("contracts.bytecode", e))?,
                    balance: parse_word("contracts.balance", &c.balance)?,
                    slots,
                })
            })
            .collect()
    }

    /// Block the provider reads state at
    pub fn state_block(&self) -> BlockNumber {
        self.provider
            .as_ref()
            .and_then(|p| p.block_number)
            .unwrap_or(self.block.number)
    }

    /// Replace the bytecode of the `to` account, seeding it if needed
    pub fn set_code(&mut self, bytecode: &str) {
        let to = self.transaction.to.trim().to_ascii_lowercase();
        let existing = self
            .contracts
            .iter_mut()
            .find(|c| c.address.trim().to_ascii_lowercase() == to);
        match existing {
            Some(contract) => contract.bytecode = bytecode.to_string(),
            None => self.contracts.push(ContractConfig {
                address: self.transaction.to.clone(),
                bytecode: bytecode.to_string(),
                ..Default::default()
            }),
        }
    }
}

fn invalid(field: &str, reason: impl ToString) -> EvmError {
    EvmError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Empty string is zero
fn parse_word(field: &str, s: &str) -> EvmResult<Word> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Word::ZERO);
    }
    s.parse::<Word>().map_err(|e| invalid(field, e))
}

fn parse_address(field: &str, s: &str) -> EvmResult<Address> {
    s.trim().parse::<Address>().map_err(|e| invalid(field, e))
}

fn parse_address_or_zero(field: &str, s: &str) -> EvmResult<Address> {
    if s.trim().is_empty() {
        return Ok(Address::ZERO);
    }
    parse_address(field, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_to(to: &str) -> ExecutionConfig {
        let mut config = ExecutionConfig::default();
        config.transaction.to = to.to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = ExecutionConfig::default();
        let env = config.environment().unwrap();
        assert_eq!(env.block.chain_id, 1);
        assert_eq!(env.block.gas_limit, 30_000_000);
        assert_eq!(env.message.gas_limit, 1_000_000);
        assert_eq!(env.message.caller, env.tx.origin);
        assert!(env.message.data.is_empty());
        assert_eq!(config.state_block(), 0);
    }

    #[test]
    fn test_word_fields_hex_or_decimal() {
        let mut config = ExecutionConfig::default();
        config.transaction.value = "0x10".into();
        config.transaction.gas_price = "20".into();
        let env = config.environment().unwrap();
        assert_eq!(env.message.value, Word::from(16u64));
        assert_eq!(env.tx.gas_price, Word::from(20u64));
    }

    #[test]
    fn test_invalid_field_named() {
        let err = config_with_to("0x1234").environment().unwrap_err();
        match err {
            EvmError::InvalidConfig { field, .. } => assert_eq!(field, "transaction.to"),
            other => panic!("unexpected error: {:?}", other),
        }

        let mut config = ExecutionConfig::default();
        config.block.base_fee = "not a number".into();
        assert!(matches!(
            config.environment(),
            Err(EvmError::InvalidConfig { field, .. }) if field == "block.base_fee"
        ));
    }

    #[test]
    fn test_sig_used_when_calldata_empty() {
        let mut config = ExecutionConfig::default();
        config.transaction.sig = "0xa9059cbb".into();
        assert_eq!(config.calldata().unwrap().as_ref(), &[0xa9, 0x05, 0x9c, 0xbb]);

        config.transaction.calldata = "0x01".into();
        assert_eq!(config.calldata().unwrap().as_ref(), &[0x01]);
    }

    #[test]
    fn test_seeded_accounts() {
        let mut config = ExecutionConfig::default();
        config.contracts.push(ContractConfig {
            address: "0x00000000000000000000000000000000000000aa".into(),
            bytecode: "0x6001".into(),
            balance: "1000".into(),
            slots: BTreeMap::from([("0x01".to_string(), "5".to_string())]),
        });
        let accounts = config.seeded_accounts().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, Address::from_low_u8(0xaa));
        assert_eq!(accounts[0].code.as_ref(), &[0x60, 0x01]);
        assert_eq!(accounts[0].balance, Word::from(1000u64));
        assert_eq!(accounts[0].slots[&Word::ONE], Word::from(5u64));
    }

    #[test]
    fn test_set_code_replaces_or_seeds() {
        let mut config = ExecutionConfig::default();
        config.set_code("0x00");
        assert_eq!(config.contracts.len(), 1);
        config.set_code("0x01");
        assert_eq!(config.contracts.len(), 1);
        assert_eq!(config.contracts[0].bytecode, "0x01");
    }

    #[test]
    fn test_block_hashes_and_state_block() {
        let mut config = ExecutionConfig::default();
        config.block.number = 10;
        config.block.hashes.insert(
            "9".into(),
            format!("0x{}", "11".repeat(32)),
        );
        config.provider = Some(ProviderConfig {
            rpc_url: "http://localhost:8545".into(),
            block_number: Some(7),
        });
        let env = config.environment().unwrap();
        assert_eq!(env.block.hashes.len(), 1);
        assert_eq!(config.state_block(), 7);
    }
}
