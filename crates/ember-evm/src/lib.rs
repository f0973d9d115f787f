//! # ember-evm
//!
//! EVM bytecode interpreter.
//!
//! This crate provides:
//! - 256-bit word arithmetic with EVM wraparound and signed semantics
//! - Stack, memory and per-run account storage with EIP-2929 access tracking
//! - Bytecode decoding and an opcode table
//! - Gas metering, including the EIP-2200/3529 SSTORE schedule
//! - A step-wise interpreter over a pluggable [`StateProvider`]
//!
//! ```ignore
//! let program = Program::from_hex("6001600101")?;
//! let mut interp = Interpreter::from_parts(env, program, Storage::offline());
//! let result = interp.run();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod context;
mod error;
pub mod gas;
mod interpreter;
mod memory;
mod opcode;
mod program;
mod provider;
mod result;
mod stack;
mod storage;
mod word;

pub use config::{
    AccessListConfig, BlockConfig, ChainConfig, ContractConfig, ExecutionConfig, ProviderConfig,
    SeededAccount, TransactionConfig,
};
pub use context::{AccessListItem, BlockContext, Environment, Message, TxContext, BLOCKHASH_WINDOW};
pub use error::{EvmError, EvmResult, HaltReason};
pub use gas::GasMeter;
pub use interpreter::{Interpreter, PRECOMPILES};
pub use memory::{Memory, MEMORY_LIMIT};
pub use opcode::Opcode;
pub use program::{decode_hex, Instruction, Operand, Program};
pub use provider::{
    CachedProvider, EmptyProvider, MemoryAccount, MemoryProvider, ProviderError, StateProvider,
};
pub use result::{Log, RunResult, StepResult};
pub use stack::{Stack, MAX_PEEK_INDEX, MAX_SWAP_INDEX, STACK_LIMIT};
pub use storage::{AccessSet, Account, Storage, StorageChange};
pub use word::{Word, I256};
