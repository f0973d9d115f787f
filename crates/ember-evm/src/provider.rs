//! External account state
//!
//! [`StateProvider`] is the seam through which [`Storage`](crate::Storage)
//! pulls code, balances and slots it has not seen yet. Calls block; each
//! address and slot is requested at most once per execution.

use std::collections::HashMap;

use bytes::Bytes;
use ember_primitives::{Address, BlockNumber};
use parking_lot::RwLock;
use thiserror::Error;

use crate::word::Word;

/// State provider failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failed (connection, timeout, HTTP status)
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote returned a JSON-RPC error
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Response could not be decoded
    #[error("malformed {method} response: {reason}")]
    InvalidResponse {
        /// Method called
        method: String,
        /// What was wrong
        reason: String,
    },
}

/// Read access to account state at a given block
pub trait StateProvider: Send + Sync {
    /// Contract bytecode (empty for accounts without code)
    fn get_code(&self, address: Address, block: BlockNumber) -> Result<Bytes, ProviderError>;

    /// Balance in wei
    fn get_balance(&self, address: Address, block: BlockNumber) -> Result<Word, ProviderError>;

    /// Storage slot value (zero when unset)
    fn get_storage_at(
        &self,
        address: Address,
        slot: Word,
        block: BlockNumber,
    ) -> Result<Word, ProviderError>;
}

/// Every account is empty. Used for offline simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProvider;

impl StateProvider for EmptyProvider {
    fn get_code(&self, _address: Address, _block: BlockNumber) -> Result<Bytes, ProviderError> {
        Ok(Bytes::new())
    }

    fn get_balance(&self, _address: Address, _block: BlockNumber) -> Result<Word, ProviderError> {
        Ok(Word::ZERO)
    }

    fn get_storage_at(
        &self,
        _address: Address,
        _slot: Word,
        _block: BlockNumber,
    ) -> Result<Word, ProviderError> {
        Ok(Word::ZERO)
    }
}

/// Account held by [`MemoryProvider`]
#[derive(Debug, Clone, Default)]
pub struct MemoryAccount {
    /// Bytecode
    pub code: Bytes,
    /// Balance
    pub balance: Word,
    /// Slots
    pub storage: HashMap<Word, Word>,
}

/// Fixed in-memory world state, ignoring the block number
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    accounts: HashMap<Address, MemoryAccount>,
}

impl MemoryProvider {
    /// Empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an account
    pub fn with_account(mut self, address: Address, code: impl Into<Bytes>, balance: Word) -> Self {
        let account = self.accounts.entry(address).or_default();
        account.code = code.into();
        account.balance = balance;
        self
    }

    /// Set a slot, creating the account if needed
    pub fn with_storage(mut self, address: Address, slot: Word, value: Word) -> Self {
        self.accounts
            .entry(address)
            .or_default()
            .storage
            .insert(slot, value);
        self
    }
}

impl StateProvider for MemoryProvider {
    fn get_code(&self, address: Address, _block: BlockNumber) -> Result<Bytes, ProviderError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|a| a.code.clone())
            .unwrap_or_default())
    }

    fn get_balance(&self, address: Address, _block: BlockNumber) -> Result<Word, ProviderError> {
        Ok(self
            .accounts
            .get(&address)
            .map(|a| a.balance)
            .unwrap_or_default())
    }

    fn get_storage_at(
        &self,
        address: Address,
        slot: Word,
        _block: BlockNumber,
    ) -> Result<Word, ProviderError> {
        Ok(self
            .accounts
            .get(&address)
            .and_then(|a| a.storage.get(&slot).copied())
            .unwrap_or_default())
    }
}

/// Append-only cache in front of another provider.
///
/// Share one instance (behind an `Arc`) across executions that read the same
/// block so each remote value is fetched once overall. Failed fetches are not
/// cached.
pub struct CachedProvider<P> {
    inner: P,
    code: RwLock<HashMap<(Address, BlockNumber), Bytes>>,
    balances: RwLock<HashMap<(Address, BlockNumber), Word>>,
    slots: RwLock<HashMap<(Address, Word, BlockNumber), Word>>,
}

impl<P: StateProvider> CachedProvider<P> {
    /// Wrap `inner`
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            code: RwLock::new(HashMap::new()),
            balances: RwLock::new(HashMap::new()),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached entries (code, balances, slots)
    pub fn cached_entries(&self) -> usize {
        self.code.read().len() + self.balances.read().len() + self.slots.read().len()
    }
}

impl<P: StateProvider> StateProvider for CachedProvider<P> {
    fn get_code(&self, address: Address, block: BlockNumber) -> Result<Bytes, ProviderError> {
        if let Some(code) = self.code.read().get(&(address, block)) {
            return Ok(code.clone());
        }
        let code = self.inner.get_code(address, block)?;
        self.code
            .write()
            .entry((address, block))
            .or_insert_with(|| code.clone());
        Ok(code)
    }

    fn get_balance(&self, address: Address, block: BlockNumber) -> Result<Word, ProviderError> {
        if let Some(balance) = self.balances.read().get(&(address, block)) {
            return Ok(*balance);
        }
        let balance = self.inner.get_balance(address, block)?;
        self.balances.write().entry((address, block)).or_insert(balance);
        Ok(balance)
    }

    fn get_storage_at(
        &self,
        address: Address,
        slot: Word,
        block: BlockNumber,
    ) -> Result<Word, ProviderError> {
        if let Some(value) = self.slots.read().get(&(address, slot, block)) {
            return Ok(*value);
        }
        let value = self.inner.get_storage_at(address, slot, block)?;
        self.slots
            .write()
            .entry((address, slot, block))
            .or_insert(value);
        Ok(value)
    }
}
