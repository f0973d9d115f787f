//! Execution environment: block, transaction and message data

use std::collections::BTreeMap;

use bytes::Bytes;
use ember_primitives::{Address, BlockNumber, Gas, H256};

use crate::word::Word;

/// Number of recent blocks BLOCKHASH can see
pub const BLOCKHASH_WINDOW: u64 = 256;

/// Block-level data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    /// Block number
    pub number: BlockNumber,
    /// Timestamp (seconds)
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: Gas,
    /// Fee recipient
    pub coinbase: Address,
    /// Difficulty / PREVRANDAO value
    pub difficulty: Word,
    /// Chain id
    pub chain_id: u64,
    /// Base fee
    pub base_fee: Word,
    /// Known hashes of previous blocks
    pub hashes: BTreeMap<BlockNumber, H256>,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            gas_limit: 30_000_000,
            coinbase: Address::ZERO,
            difficulty: Word::ZERO,
            chain_id: 1,
            base_fee: Word::ZERO,
            hashes: BTreeMap::new(),
        }
    }
}

impl BlockContext {
    /// Hash of block `number` if it is one of the 256 most recent ancestors
    /// and known, zero otherwise.
    pub fn block_hash(&self, number: Word) -> Word {
        let Some(n) = number.to_u64() else {
            return Word::ZERO;
        };
        let lowest = self.number.saturating_sub(BLOCKHASH_WINDOW);
        if n >= self.number || n < lowest {
            return Word::ZERO;
        }
        self.hashes
            .get(&n)
            .map(|h| Word::from(*h))
            .unwrap_or_default()
    }
}

/// Entry of an EIP-2930 access list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessListItem {
    /// Account
    pub address: Address,
    /// Slots of the account
    pub storage_keys: Vec<Word>,
}

/// Transaction-level data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxContext {
    /// Sender
    pub origin: Address,
    /// Gas price
    pub gas_price: Word,
    /// Transaction type
    pub tx_type: u8,
    /// Pre-declared accesses
    pub access_list: Vec<AccessListItem>,
}

impl TxContext {
    /// Number of addresses and storage keys in the access list
    pub fn access_list_counts(&self) -> (usize, usize) {
        let keys = self.access_list.iter().map(|i| i.storage_keys.len()).sum();
        (self.access_list.len(), keys)
    }
}

/// The call being executed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Executing contract
    pub address: Address,
    /// Caller
    pub caller: Address,
    /// Value sent
    pub value: Word,
    /// Calldata
    pub data: Bytes,
    /// Gas available to the transaction
    pub gas_limit: Gas,
}

/// Everything an execution reads but never writes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Environment {
    /// Block
    pub block: BlockContext,
    /// Transaction
    pub tx: TxContext,
    /// Message
    pub message: Message,
}
