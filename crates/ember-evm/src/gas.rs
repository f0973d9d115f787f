//! Gas schedule and metering
//!
//! Static costs come from [`static_gas`]. Opcodes whose price depends on
//! operands or on access state are priced by [`dynamic_gas`] from a
//! [`Dynamic`] description the interpreter builds before mutating anything.

use crate::error::{EvmError, EvmResult};
use crate::opcode::Opcode;
use crate::word::Word;

/// Gas costs for EVM operations
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;
    /// BLOCKHASH
    pub const BLOCKHASH: u64 = 20;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp gas
    pub const EXP: u64 = 10;
    /// Exp gas per exponent byte
    pub const EXP_BYTE: u64 = 50;
    /// SHA3 base gas
    pub const SHA3: u64 = 30;
    /// SHA3 word gas
    pub const SHA3_WORD: u64 = 6;

    /// First access to an account in a transaction (EIP-2929)
    pub const COLD_ACCOUNT_ACCESS: u64 = 2600;
    /// First access to a storage slot in a transaction (EIP-2929)
    pub const COLD_SLOAD: u64 = 2100;
    /// Repeated access to an account or slot
    pub const WARM_STORAGE_READ: u64 = 100;

    /// SSTORE from zero to non-zero
    pub const SSTORE_SET: u64 = 20000;
    /// SSTORE of a clean non-zero slot (5000 minus the cold surcharge)
    pub const SSTORE_RESET: u64 = 2900;
    /// Refund for clearing a slot (EIP-3529)
    pub const SSTORE_CLEAR_REFUND: i64 = 4800;
    /// SSTORE fails unless more than this much gas remains (EIP-2200)
    pub const SSTORE_SENTRY: u64 = 2300;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Quadratic memory divisor
    pub const MEMORY_QUAD_DIVISOR: u64 = 512;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Transaction gas
    pub const TX: u64 = 21000;
    /// Transaction data zero byte
    pub const TX_DATA_ZERO: u64 = 4;
    /// Transaction data non-zero byte
    pub const TX_DATA_NONZERO: u64 = 16;
    /// Access list address gas
    pub const ACCESS_LIST_ADDRESS: u64 = 2400;
    /// Access list storage key gas
    pub const ACCESS_LIST_STORAGE_KEY: u64 = 1900;
}

/// Static part of an opcode's cost
pub fn static_gas(opcode: Opcode) -> u64 {
    match opcode {
        Opcode::STOP | Opcode::RETURN | Opcode::REVERT | Opcode::INVALID => cost::ZERO,

        // priced entirely by access state
        Opcode::BALANCE
        | Opcode::EXTCODESIZE
        | Opcode::EXTCODECOPY
        | Opcode::EXTCODEHASH
        | Opcode::SLOAD
        | Opcode::SSTORE => cost::ZERO,

        Opcode::ADDRESS
        | Opcode::ORIGIN
        | Opcode::CALLER
        | Opcode::CALLVALUE
        | Opcode::CALLDATASIZE
        | Opcode::CODESIZE
        | Opcode::GASPRICE
        | Opcode::COINBASE
        | Opcode::TIMESTAMP
        | Opcode::NUMBER
        | Opcode::PREVRANDAO
        | Opcode::GASLIMIT
        | Opcode::CHAINID
        | Opcode::RETURNDATASIZE
        | Opcode::POP
        | Opcode::PC
        | Opcode::MSIZE
        | Opcode::GAS
        | Opcode::BASEFEE
        | Opcode::PUSH(0) => cost::BASE,

        Opcode::ADD
        | Opcode::SUB
        | Opcode::NOT
        | Opcode::LT
        | Opcode::GT
        | Opcode::SLT
        | Opcode::SGT
        | Opcode::EQ
        | Opcode::ISZERO
        | Opcode::AND
        | Opcode::OR
        | Opcode::XOR
        | Opcode::BYTE
        | Opcode::SHL
        | Opcode::SHR
        | Opcode::SAR
        | Opcode::CALLDATALOAD
        | Opcode::MLOAD
        | Opcode::MSTORE
        | Opcode::MSTORE8
        | Opcode::CALLDATACOPY
        | Opcode::CODECOPY
        | Opcode::RETURNDATACOPY
        | Opcode::MCOPY
        | Opcode::PUSH(_)
        | Opcode::DUP(_)
        | Opcode::SWAP(_) => cost::VERYLOW,

        Opcode::MUL
        | Opcode::DIV
        | Opcode::SDIV
        | Opcode::MOD
        | Opcode::SMOD
        | Opcode::SIGNEXTEND
        | Opcode::SELFBALANCE => cost::LOW,

        Opcode::ADDMOD | Opcode::MULMOD | Opcode::JUMP => cost::MID,
        Opcode::JUMPI => cost::HIGH,
        Opcode::JUMPDEST => cost::JUMPDEST,
        Opcode::BLOCKHASH => cost::BLOCKHASH,

        Opcode::EXP => cost::EXP,
        Opcode::SHA3 => cost::SHA3,
        Opcode::TLOAD | Opcode::TSTORE => cost::WARM_STORAGE_READ,
        Opcode::LOG(n) => cost::LOG + cost::LOG_TOPIC * n as u64,

        // never executed; charged nothing before halting
        Opcode::CREATE
        | Opcode::CALL
        | Opcode::CALLCODE
        | Opcode::DELEGATECALL
        | Opcode::CREATE2
        | Opcode::STATICCALL
        | Opcode::SELFDESTRUCT => cost::ZERO,
    }
}

/// Operand-dependent inputs to an opcode's price
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dynamic {
    /// Static cost only
    None,
    /// Memory expansion only (MLOAD, MSTORE, MSTORE8, RETURN, REVERT)
    Memory {
        /// Expansion gas owed
        expansion: u64,
    },
    /// EXP
    Exp {
        /// The exponent operand
        exponent: Word,
    },
    /// SHA3 over `length` bytes
    Sha3 {
        /// Bytes hashed
        length: u64,
        /// Expansion gas owed
        expansion: u64,
    },
    /// CALLDATACOPY, CODECOPY, RETURNDATACOPY, MCOPY
    Copy {
        /// Bytes copied
        length: u64,
        /// Expansion gas owed
        expansion: u64,
    },
    /// EXTCODECOPY
    ExtCodeCopy {
        /// Whether the account is cold
        cold: bool,
        /// Bytes copied
        length: u64,
        /// Expansion gas owed
        expansion: u64,
    },
    /// BALANCE, EXTCODESIZE, EXTCODEHASH
    Account {
        /// Whether the account is cold
        cold: bool,
    },
    /// SLOAD
    Sload {
        /// Whether the slot is cold
        cold: bool,
    },
    /// SSTORE
    Sstore {
        /// Whether the slot is cold
        cold: bool,
        /// Value at the start of the transaction
        original: Word,
        /// Value before this store
        current: Word,
        /// Value being written
        new: Word,
    },
    /// LOG0..LOG4 over `length` data bytes
    Log {
        /// Data bytes
        length: u64,
        /// Expansion gas owed
        expansion: u64,
    },
}

/// Gas charged and refund earned by one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasCost {
    /// Gas to deduct
    pub gas: u64,
    /// Signed change to the refund counter
    pub refund: i64,
}

impl GasCost {
    /// Cost with no refund
    pub fn gas(gas: u64) -> Self {
        Self { gas, refund: 0 }
    }
}

/// Dynamic part of an opcode's cost
pub fn dynamic_gas(dynamic: &Dynamic) -> GasCost {
    match *dynamic {
        Dynamic::None => GasCost::default(),
        Dynamic::Memory { expansion } => GasCost::gas(expansion),
        Dynamic::Exp { exponent } => GasCost::gas(exp_cost(exponent)),
        Dynamic::Sha3 { length, expansion } => {
            GasCost::gas(sha3_word_cost(length).saturating_add(expansion))
        }
        Dynamic::Copy { length, expansion } => {
            GasCost::gas(copy_cost(length).saturating_add(expansion))
        }
        Dynamic::ExtCodeCopy {
            cold,
            length,
            expansion,
        } => GasCost::gas(
            account_access_cost(cold)
                .saturating_add(copy_cost(length))
                .saturating_add(expansion),
        ),
        Dynamic::Account { cold } => GasCost::gas(account_access_cost(cold)),
        Dynamic::Sload { cold } => GasCost::gas(sload_cost(cold)),
        Dynamic::Sstore {
            cold,
            original,
            current,
            new,
        } => sstore_cost(original, current, new, cold),
        Dynamic::Log { length, expansion } => GasCost::gas(
            cost::LOG_DATA
                .saturating_mul(length)
                .saturating_add(expansion),
        ),
    }
}

/// Total expansion cost of `words` words of memory
pub fn memory_cost(words: u64) -> u64 {
    cost::MEMORY * words + words * words / cost::MEMORY_QUAD_DIVISOR
}

fn words(length: u64) -> u64 {
    length.div_ceil(32)
}

/// Per-word cost of a copy of `length` bytes
pub fn copy_cost(length: u64) -> u64 {
    cost::COPY.saturating_mul(words(length))
}

/// Per-word cost of hashing `length` bytes
pub fn sha3_word_cost(length: u64) -> u64 {
    cost::SHA3_WORD.saturating_mul(words(length))
}

/// Per-byte cost of an EXP exponent
pub fn exp_cost(exponent: Word) -> u64 {
    cost::EXP_BYTE * exponent.byte_len() as u64
}

/// Cold or warm account access
pub fn account_access_cost(cold: bool) -> u64 {
    if cold {
        cost::COLD_ACCOUNT_ACCESS
    } else {
        cost::WARM_STORAGE_READ
    }
}

/// Cold or warm slot read
pub fn sload_cost(cold: bool) -> u64 {
    if cold {
        cost::COLD_SLOAD
    } else {
        cost::WARM_STORAGE_READ
    }
}

/// SSTORE price and refund (EIP-2200 with EIP-2929 and EIP-3529).
///
/// The cold surcharge is added on every branch.
pub fn sstore_cost(original: Word, current: Word, new: Word, cold: bool) -> GasCost {
    let surcharge = if cold { cost::COLD_SLOAD } else { 0 };

    if new == current {
        return GasCost::gas(surcharge + cost::WARM_STORAGE_READ);
    }

    if current == original {
        if original.is_zero() {
            return GasCost::gas(surcharge + cost::SSTORE_SET);
        }
        let refund = if new.is_zero() {
            cost::SSTORE_CLEAR_REFUND
        } else {
            0
        };
        return GasCost {
            gas: surcharge + cost::SSTORE_RESET,
            refund,
        };
    }

    // dirty slot
    let mut refund = 0i64;
    if !original.is_zero() {
        if current.is_zero() {
            refund -= cost::SSTORE_CLEAR_REFUND;
        }
        if new.is_zero() {
            refund += cost::SSTORE_CLEAR_REFUND;
        }
    }
    if new == original {
        let restored = if original.is_zero() {
            cost::SSTORE_SET
        } else {
            cost::SSTORE_RESET
        };
        refund += (restored - cost::WARM_STORAGE_READ) as i64;
    }
    GasCost {
        gas: surcharge + cost::WARM_STORAGE_READ,
        refund,
    }
}

/// Up-front cost of a transaction before any instruction runs
pub fn intrinsic_gas(calldata: &[u8], access_list_addresses: usize, access_list_keys: usize) -> u64 {
    let zeros = calldata.iter().filter(|b| **b == 0).count() as u64;
    let non_zeros = calldata.len() as u64 - zeros;
    cost::TX
        + zeros * cost::TX_DATA_ZERO
        + non_zeros * cost::TX_DATA_NONZERO
        + access_list_addresses as u64 * cost::ACCESS_LIST_ADDRESS
        + access_list_keys as u64 * cost::ACCESS_LIST_STORAGE_KEY
}

/// Gas counter with a raw refund accumulator.
///
/// The remaining gas never goes below zero: a charge that does not fit fails
/// and leaves the counter untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    remaining: u64,
    refund: i64,
}

impl GasMeter {
    /// Meter with `limit` gas available
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            refund: 0,
        }
    }

    /// Initial gas
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Gas left
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Gas consumed so far
    pub fn used(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Accumulated refund, uncapped
    pub fn refund(&self) -> i64 {
        self.refund
    }

    /// Deduct `amount` or fail without deducting anything
    pub fn consume(&mut self, amount: u64) -> EvmResult<()> {
        if amount > self.remaining {
            return Err(EvmError::InsufficientGas {
                required: amount,
                remaining: self.remaining,
            });
        }
        self.remaining -= amount;
        Ok(())
    }

    /// Charge an instruction's full price and record its refund.
    pub fn charge(&mut self, opcode: Opcode, dynamic: &Dynamic) -> EvmResult<GasCost> {
        if let Dynamic::Sstore { .. } = dynamic {
            if self.remaining <= cost::SSTORE_SENTRY {
                return Err(EvmError::InsufficientGas {
                    required: cost::SSTORE_SENTRY + 1,
                    remaining: self.remaining,
                });
            }
        }
        let dynamic_cost = dynamic_gas(dynamic);
        let total = GasCost {
            gas: static_gas(opcode).saturating_add(dynamic_cost.gas),
            refund: dynamic_cost.refund,
        };
        self.consume(total.gas)?;
        self.refund += total.refund;
        Ok(total)
    }
}
