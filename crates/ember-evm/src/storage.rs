//! Account state for one execution
//!
//! [`Storage`] owns the per-run view of the world: cached accounts, the
//! original (pre-transaction) value of every slot read or written, the
//! EIP-2929 access set and transient storage. Accounts not seeded up front
//! are pulled from the [`StateProvider`] on first reference and never
//! re-fetched within the run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use ember_primitives::{Address, BlockNumber};
use tracing::{debug, warn};

use crate::error::EvmResult;
use crate::program::padded_slice;
use crate::provider::{EmptyProvider, StateProvider};
use crate::word::Word;

/// Cached account
#[derive(Debug, Clone, Default)]
pub struct Account {
    /// Bytecode
    pub code: Bytes,
    /// Balance
    pub balance: Word,
    slots: HashMap<Word, Word>,
    original: HashMap<Word, Word>,
    remote: bool,
}

impl Account {
    /// No code and zero balance
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.balance.is_zero()
    }
}

/// Slot whose value changed during the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageChange {
    /// Contract
    pub address: Address,
    /// Slot key
    pub key: Word,
    /// Value before the transaction
    pub original: Word,
    /// Value after the run
    pub current: Word,
}

/// Warm addresses and slots (EIP-2929)
#[derive(Debug, Clone, Default)]
pub struct AccessSet {
    addresses: HashSet<Address>,
    slots: HashSet<(Address, Word)>,
}

impl AccessSet {
    /// Mark an address warm. Returns `true` if it was cold.
    pub fn touch_address(&mut self, address: Address) -> bool {
        self.addresses.insert(address)
    }

    /// Mark a slot warm. Returns `true` if it was cold.
    pub fn touch_slot(&mut self, address: Address, key: Word) -> bool {
        self.slots.insert((address, key))
    }

    /// Whether the address is warm
    pub fn is_address_touched(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    /// Whether the slot is warm
    pub fn is_slot_touched(&self, address: &Address, key: &Word) -> bool {
        self.slots.contains(&(*address, *key))
    }
}

/// Per-run account state
pub struct Storage {
    accounts: HashMap<Address, Account>,
    access: AccessSet,
    transient: HashMap<(Address, Word), Word>,
    provider: Arc<dyn StateProvider>,
    block: BlockNumber,
}

impl Storage {
    /// Storage backed by `provider`, reading state as of `block`
    pub fn new(provider: Arc<dyn StateProvider>, block: BlockNumber) -> Self {
        Self {
            accounts: HashMap::new(),
            access: AccessSet::default(),
            transient: HashMap::new(),
            provider,
            block,
        }
    }

    /// Storage where every unseeded account is empty
    pub fn offline() -> Self {
        Self::new(Arc::new(EmptyProvider), 0)
    }

    /// Seed an account. Seeded accounts are authoritative: the provider is
    /// never asked about them, and unset slots read as zero.
    pub fn insert_account(
        &mut self,
        address: Address,
        code: impl Into<Bytes>,
        balance: Word,
        slots: HashMap<Word, Word>,
    ) {
        self.accounts.insert(
            address,
            Account {
                code: code.into(),
                balance,
                original: slots.clone(),
                slots,
                remote: false,
            },
        );
    }

    /// Whether the account is already cached
    pub fn is_cached(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    /// Account, fetching code and balance on first reference.
    pub fn account(&mut self, address: Address) -> EvmResult<&Account> {
        self.ensure_account(address)?;
        Ok(self.accounts.entry(address).or_default())
    }

    fn ensure_account(&mut self, address: Address) -> EvmResult<()> {
        if self.accounts.contains_key(&address) {
            return Ok(());
        }
        debug!(%address, block = self.block, "fetching account");
        let fetched = self
            .provider
            .get_code(address, self.block)
            .and_then(|code| Ok((code, self.provider.get_balance(address, self.block)?)));
        let (code, balance) = fetched.map_err(|e| {
            warn!(%address, error = %e, "account fetch failed");
            e
        })?;
        self.accounts.insert(
            address,
            Account {
                code,
                balance,
                remote: true,
                ..Account::default()
            },
        );
        Ok(())
    }

    fn ensure_slot(&mut self, address: Address, key: Word) -> EvmResult<&mut Account> {
        self.ensure_account(address)?;
        let Self {
            accounts,
            provider,
            block,
            ..
        } = self;
        let account = accounts.entry(address).or_default();
        if account.remote && !account.original.contains_key(&key) {
            debug!(%address, %key, "fetching slot");
            let value = provider.get_storage_at(address, key, *block).map_err(|e| {
                warn!(%address, %key, error = %e, "slot fetch failed");
                e
            })?;
            account.original.insert(key, value);
            account.slots.insert(key, value);
        }
        Ok(account)
    }

    /// Current value of a slot (zero when unset). May fetch the account and slot.
    pub fn load(&mut self, address: Address, key: Word) -> EvmResult<Word> {
        let account = self.ensure_slot(address, key)?;
        Ok(account.slots.get(&key).copied().unwrap_or_default())
    }

    /// Value of a slot at the start of the transaction. May fetch.
    pub fn load_immutable(&mut self, address: Address, key: Word) -> EvmResult<Word> {
        let account = self.ensure_slot(address, key)?;
        Ok(account.original.get(&key).copied().unwrap_or_default())
    }

    /// Write a slot. May fetch its original value first.
    pub fn store(&mut self, address: Address, key: Word, value: Word) -> EvmResult<()> {
        let account = self.ensure_slot(address, key)?;
        account.slots.insert(key, value);
        Ok(())
    }

    /// Bytecode of an account. May fetch.
    pub fn get_code(&mut self, address: Address) -> EvmResult<Bytes> {
        Ok(self.account(address)?.code.clone())
    }

    /// Balance of an account. May fetch.
    pub fn get_balance(&mut self, address: Address) -> EvmResult<Word> {
        Ok(self.account(address)?.balance)
    }

    /// `length` bytes of an account's code from `offset`, zero-padded. May fetch.
    pub fn get_code_slice(&mut self, address: Address, offset: Word, length: usize) -> EvmResult<Vec<u8>> {
        let account = self.account(address)?;
        Ok(padded_slice(&account.code, offset, length))
    }

    /// Access set
    pub fn access(&self) -> &AccessSet {
        &self.access
    }

    /// Mark an address warm. Returns `true` if it was cold.
    pub fn touch_address(&mut self, address: Address) -> bool {
        self.access.touch_address(address)
    }

    /// Mark a slot warm. Returns `true` if it was cold.
    pub fn touch_slot(&mut self, address: Address, key: Word) -> bool {
        self.access.touch_slot(address, key)
    }

    /// Whether the address is warm
    pub fn is_address_touched(&self, address: &Address) -> bool {
        self.access.is_address_touched(address)
    }

    /// Whether the slot is warm
    pub fn is_slot_touched(&self, address: &Address, key: &Word) -> bool {
        self.access.is_slot_touched(address, key)
    }

    /// Transient slot (EIP-1153)
    pub fn tload(&self, address: Address, key: Word) -> Word {
        self.transient.get(&(address, key)).copied().unwrap_or_default()
    }

    /// Write a transient slot
    pub fn tstore(&mut self, address: Address, key: Word, value: Word) {
        self.transient.insert((address, key), value);
    }

    /// Slots whose current value differs from the original, by address then key
    pub fn changes(&self) -> Vec<StorageChange> {
        let mut changes: Vec<StorageChange> = self
            .accounts
            .iter()
            .flat_map(|(address, account)| {
                account.slots.iter().filter_map(move |(key, current)| {
                    let original = account.original.get(key).copied().unwrap_or_default();
                    (original != *current).then_some(StorageChange {
                        address: *address,
                        key: *key,
                        original,
                        current: *current,
                    })
                })
            })
            .collect();
        changes.sort_by(|a, b| (a.address, a.key).cmp(&(b.address, b.key)));
        changes
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("accounts", &self.accounts.len())
            .field("block", &self.block)
            .finish()
    }
}
