//! Execution outcomes

use bytes::Bytes;
use ember_primitives::{Address, Gas};

use crate::error::HaltReason;
use crate::storage::StorageChange;
use crate::word::Word;

/// Log entry emitted by LOG0..LOG4
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Topics, at most four
    pub topics: Vec<Word>,
    /// Data
    pub data: Bytes,
}

/// Outcome of a single [`step`](crate::Interpreter::step)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Instruction executed; more may follow
    Continue,
    /// Execution is over
    Halted(HaltReason),
}

impl StepResult {
    /// Whether execution is over
    pub fn is_halted(&self) -> bool {
        matches!(self, StepResult::Halted(_))
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Why execution stopped
    pub halt: HaltReason,
    /// Gas available at the start, intrinsic cost included
    pub gas_limit: Gas,
    /// Gas left
    pub gas_remaining: Gas,
    /// Raw accumulated refund, uncapped. Zero unless the run succeeded.
    pub gas_refund: i64,
    /// RETURN or REVERT payload
    pub return_data: Bytes,
    /// Logs, in emission order; empty unless the run succeeded
    pub logs: Vec<Log>,
    /// Changed slots; empty unless the run succeeded
    pub storage_changes: Vec<StorageChange>,
}

impl RunResult {
    /// Gas consumed
    pub fn gas_used(&self) -> Gas {
        self.gas_limit - self.gas_remaining
    }

    /// Halted with STOP or RETURN
    pub fn is_success(&self) -> bool {
        self.halt.is_success()
    }
}
