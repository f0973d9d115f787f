//! EVM error types

use thiserror::Error;

use crate::opcode::Opcode;
use crate::provider::ProviderError;
use crate::word::Word;

/// Errors raised while building or running an execution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// Stack overflow
    #[error("stack overflow (max 1024)")]
    StackOverflow,

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack index outside the legal range for the operation
    #[error("invalid stack index {index} (legal range 1..={max})")]
    InvalidIndex {
        /// Requested 1-based index
        index: usize,
        /// Largest legal index
        max: usize,
    },

    /// Stack index legal but deeper than the current stack
    #[error("stack item {index} not present (depth {depth})")]
    ItemNotPresent {
        /// Requested 1-based index
        index: usize,
        /// Current stack depth
        depth: usize,
    },

    /// Not enough gas left for a charge
    #[error("insufficient gas: required {required}, remaining {remaining}")]
    InsufficientGas {
        /// Amount requested
        required: u64,
        /// Amount available
        remaining: u64,
    },

    /// JUMP/JUMPI target is not a JUMPDEST
    #[error("invalid jump destination {destination} at pc {pc}")]
    InvalidJumpDestination {
        /// Offset of the jump instruction
        pc: usize,
        /// Requested target
        destination: Word,
    },

    /// Program counter does not land on an instruction boundary
    #[error("no instruction starts at offset {0}")]
    InstructionNotFound(usize),

    /// Byte with no assigned opcode
    #[error("unknown opcode 0x{opcode:02x} at pc {pc}")]
    UnknownOpcode {
        /// Raw byte
        opcode: u8,
        /// Offset of the instruction
        pc: usize,
    },

    /// The designated INVALID instruction (0xfe)
    #[error("invalid instruction at pc {0}")]
    InvalidInstruction(usize),

    /// Opcode the interpreter does not execute
    #[error("{opcode} is not implemented (pc {pc})")]
    NotImplemented {
        /// The opcode
        opcode: Opcode,
        /// Offset of the instruction
        pc: usize,
    },

    /// Memory range beyond the addressable limit
    #[error("memory range too large: offset {offset}, length {length}")]
    OffsetTooLarge {
        /// Requested offset
        offset: Word,
        /// Requested length
        length: Word,
    },

    /// Byte buffer length differs from the declared length
    #[error("length mismatch: expected {expected} bytes, got {got}")]
    LengthMismatch {
        /// Declared length
        expected: usize,
        /// Supplied length
        got: usize,
    },

    /// RETURNDATACOPY past the end of the return data buffer
    #[error("return data out of bounds: offset {offset}, length {length}, available {available}")]
    ReturnDataOutOfBounds {
        /// Requested offset
        offset: Word,
        /// Requested length
        length: Word,
        /// Bytes available
        available: usize,
    },

    /// Value does not fit in 256 bits
    #[error("value out of 256-bit range: {0}")]
    OutOfRange(String),

    /// Malformed hex input
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Malformed address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Malformed execution config field
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig {
        /// Field path, e.g. `transaction.to`
        field: String,
        /// What was wrong
        reason: String,
    },

    /// The state provider could not supply account data
    #[error("state unavailable: {0}")]
    StateUnavailable(#[from] ProviderError),
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;

/// Why an execution stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// STOP, or the program counter ran past the last instruction
    Stop,
    /// RETURN
    Return,
    /// REVERT
    Revert,
    /// Exceptional halt
    Error(EvmError),
}

impl HaltReason {
    /// STOP or RETURN
    pub fn is_success(&self) -> bool {
        matches!(self, HaltReason::Stop | HaltReason::Return)
    }

    /// The error, for exceptional halts
    pub fn error(&self) -> Option<&EvmError> {
        match self {
            HaltReason::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::Stop => write!(f, "stop"),
            HaltReason::Return => write!(f, "return"),
            HaltReason::Revert => write!(f, "revert"),
            HaltReason::Error(e) => write!(f, "error: {}", e),
        }
    }
}

impl From<EvmError> for HaltReason {
    fn from(e: EvmError) -> Self {
        HaltReason::Error(e)
    }
}
