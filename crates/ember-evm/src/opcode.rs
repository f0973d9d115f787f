//! EVM opcode definitions

use std::fmt;

/// Decoded opcode. Numbered families carry their index:
/// `PUSH(0..=32)`, `DUP(1..=16)`, `SWAP(1..=16)`, `LOG(0..=4)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Opcode {
    // Stop and Arithmetic
    STOP,
    ADD,
    MUL,
    SUB,
    DIV,
    SDIV,
    MOD,
    SMOD,
    ADDMOD,
    MULMOD,
    EXP,
    SIGNEXTEND,

    // Comparison & Bitwise Logic
    LT,
    GT,
    SLT,
    SGT,
    EQ,
    ISZERO,
    AND,
    OR,
    XOR,
    NOT,
    BYTE,
    SHL,
    SHR,
    SAR,

    SHA3,

    // Environmental Information
    ADDRESS,
    BALANCE,
    ORIGIN,
    CALLER,
    CALLVALUE,
    CALLDATALOAD,
    CALLDATASIZE,
    CALLDATACOPY,
    CODESIZE,
    CODECOPY,
    GASPRICE,
    EXTCODESIZE,
    EXTCODECOPY,
    RETURNDATASIZE,
    RETURNDATACOPY,
    EXTCODEHASH,

    // Block Information
    BLOCKHASH,
    COINBASE,
    TIMESTAMP,
    NUMBER,
    PREVRANDAO,
    GASLIMIT,
    CHAINID,
    SELFBALANCE,
    BASEFEE,

    // Stack, Memory, Storage and Flow
    POP,
    MLOAD,
    MSTORE,
    MSTORE8,
    SLOAD,
    SSTORE,
    JUMP,
    JUMPI,
    PC,
    MSIZE,
    GAS,
    JUMPDEST,
    TLOAD,
    TSTORE,
    MCOPY,

    PUSH(u8),
    DUP(u8),
    SWAP(u8),
    LOG(u8),

    // System
    CREATE,
    CALL,
    CALLCODE,
    RETURN,
    DELEGATECALL,
    CREATE2,
    STATICCALL,
    REVERT,
    INVALID,
    SELFDESTRUCT,
}

impl Opcode {
    /// Decode a byte; `None` for unassigned bytes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let op = match byte {
            0x00 => Self::STOP,
            0x01 => Self::ADD,
            0x02 => Self::MUL,
            0x03 => Self::SUB,
            0x04 => Self::DIV,
            0x05 => Self::SDIV,
            0x06 => Self::MOD,
            0x07 => Self::SMOD,
            0x08 => Self::ADDMOD,
            0x09 => Self::MULMOD,
            0x0a => Self::EXP,
            0x0b => Self::SIGNEXTEND,
            0x10 => Self::LT,
            0x11 => Self::GT,
            0x12 => Self::SLT,
            0x13 => Self::SGT,
            0x14 => Self::EQ,
            0x15 => Self::ISZERO,
            0x16 => Self::AND,
            0x17 => Self::OR,
            0x18 => Self::XOR,
            0x19 => Self::NOT,
            0x1a => Self::BYTE,
            0x1b => Self::SHL,
            0x1c => Self::SHR,
            0x1d => Self::SAR,
            0x20 => Self::SHA3,
            0x30 => Self::ADDRESS,
            0x31 => Self::BALANCE,
            0x32 => Self::ORIGIN,
            0x33 => Self::CALLER,
            0x34 => Self::CALLVALUE,
            0x35 => Self::CALLDATALOAD,
            0x36 => Self::CALLDATASIZE,
            0x37 => Self::CALLDATACOPY,
            0x38 => Self::CODESIZE,
            0x39 => Self::CODECOPY,
            0x3a => Self::GASPRICE,
            0x3b => Self::EXTCODESIZE,
            0x3c => Self::EXTCODECOPY,
            0x3d => Self::RETURNDATASIZE,
            0x3e => Self::RETURNDATACOPY,
            0x3f => Self::EXTCODEHASH,
            0x40 => Self::BLOCKHASH,
            0x41 => Self::COINBASE,
            0x42 => Self::TIMESTAMP,
            0x43 => Self::NUMBER,
            0x44 => Self::PREVRANDAO,
            0x45 => Self::GASLIMIT,
            0x46 => Self::CHAINID,
            0x47 => Self::SELFBALANCE,
            0x48 => Self::BASEFEE,
            0x50 => Self::POP,
            0x51 => Self::MLOAD,
            0x52 => Self::MSTORE,
            0x53 => Self::MSTORE8,
            0x54 => Self::SLOAD,
            0x55 => Self::SSTORE,
            0x56 => Self::JUMP,
            0x57 => Self::JUMPI,
            0x58 => Self::PC,
            0x59 => Self::MSIZE,
            0x5a => Self::GAS,
            0x5b => Self::JUMPDEST,
            0x5c => Self::TLOAD,
            0x5d => Self::TSTORE,
            0x5e => Self::MCOPY,
            0x5f..=0x7f => Self::PUSH(byte - 0x5f),
            0x80..=0x8f => Self::DUP(byte - 0x7f),
            0x90..=0x9f => Self::SWAP(byte - 0x8f),
            0xa0..=0xa4 => Self::LOG(byte - 0xa0),
            0xf0 => Self::CREATE,
            0xf1 => Self::CALL,
            0xf2 => Self::CALLCODE,
            0xf3 => Self::RETURN,
            0xf4 => Self::DELEGATECALL,
            0xf5 => Self::CREATE2,
            0xfa => Self::STATICCALL,
            0xfd => Self::REVERT,
            0xfe => Self::INVALID,
            0xff => Self::SELFDESTRUCT,
            _ => return None,
        };
        Some(op)
    }

    /// Encoded byte
    pub fn to_byte(self) -> u8 {
        match self {
            Self::STOP => 0x00,
            Self::ADD => 0x01,
            Self::MUL => 0x02,
            Self::SUB => 0x03,
            Self::DIV => 0x04,
            Self::SDIV => 0x05,
            Self::MOD => 0x06,
            Self::SMOD => 0x07,
            Self::ADDMOD => 0x08,
            Self::MULMOD => 0x09,
            Self::EXP => 0x0a,
            Self::SIGNEXTEND => 0x0b,
            Self::LT => 0x10,
            Self::GT => 0x11,
            Self::SLT => 0x12,
            Self::SGT => 0x13,
            Self::EQ => 0x14,
            Self::ISZERO => 0x15,
            Self::AND => 0x16,
            Self::OR => 0x17,
            Self::XOR => 0x18,
            Self::NOT => 0x19,
            Self::BYTE => 0x1a,
            Self::SHL => 0x1b,
            Self::SHR => 0x1c,
            Self::SAR => 0x1d,
            Self::SHA3 => 0x20,
            Self::ADDRESS => 0x30,
            Self::BALANCE => 0x31,
            Self::ORIGIN => 0x32,
            Self::CALLER => 0x33,
            Self::CALLVALUE => 0x34,
            Self::CALLDATALOAD => 0x35,
            Self::CALLDATASIZE => 0x36,
            Self::CALLDATACOPY => 0x37,
            Self::CODESIZE => 0x38,
            Self::CODECOPY => 0x39,
            Self::GASPRICE => 0x3a,
            Self::EXTCODESIZE => 0x3b,
            Self::EXTCODECOPY => 0x3c,
            Self::RETURNDATASIZE => 0x3d,
            Self::RETURNDATACOPY => 0x3e,
            Self::EXTCODEHASH => 0x3f,
            Self::BLOCKHASH => 0x40,
            Self::COINBASE => 0x41,
            Self::TIMESTAMP => 0x42,
            Self::NUMBER => 0x43,
            Self::PREVRANDAO => 0x44,
            Self::GASLIMIT => 0x45,
            Self::CHAINID => 0x46,
            Self::SELFBALANCE => 0x47,
            Self::BASEFEE => 0x48,
            Self::POP => 0x50,
            Self::MLOAD => 0x51,
            Self::MSTORE => 0x52,
            Self::MSTORE8 => 0x53,
            Self::SLOAD => 0x54,
            Self::SSTORE => 0x55,
            Self::JUMP => 0x56,
            Self::JUMPI => 0x57,
            Self::PC => 0x58,
            Self::MSIZE => 0x59,
            Self::GAS => 0x5a,
            Self::JUMPDEST => 0x5b,
            Self::TLOAD => 0x5c,
            Self::TSTORE => 0x5d,
            Self::MCOPY => 0x5e,
            Self::PUSH(n) => 0x5f + n,
            Self::DUP(n) => 0x7f + n,
            Self::SWAP(n) => 0x8f + n,
            Self::LOG(n) => 0xa0 + n,
            Self::CREATE => 0xf0,
            Self::CALL => 0xf1,
            Self::CALLCODE => 0xf2,
            Self::RETURN => 0xf3,
            Self::DELEGATECALL => 0xf4,
            Self::CREATE2 => 0xf5,
            Self::STATICCALL => 0xfa,
            Self::REVERT => 0xfd,
            Self::INVALID => 0xfe,
            Self::SELFDESTRUCT => 0xff,
        }
    }

    /// Number of immediate bytes following the opcode
    pub fn immediate_len(self) -> usize {
        match self {
            Self::PUSH(n) => n as usize,
            _ => 0,
        }
    }

    /// `(inputs, outputs)`: words popped and pushed
    pub fn stack_io(self) -> (usize, usize) {
        match self {
            Self::STOP | Self::JUMPDEST | Self::INVALID => (0, 0),

            Self::ADD
            | Self::MUL
            | Self::SUB
            | Self::DIV
            | Self::SDIV
            | Self::MOD
            | Self::SMOD
            | Self::EXP
            | Self::SIGNEXTEND
            | Self::LT
            | Self::GT
            | Self::SLT
            | Self::SGT
            | Self::EQ
            | Self::AND
            | Self::OR
            | Self::XOR
            | Self::BYTE
            | Self::SHL
            | Self::SHR
            | Self::SAR
            | Self::SHA3 => (2, 1),

            Self::ADDMOD | Self::MULMOD => (3, 1),

            Self::ISZERO
            | Self::NOT
            | Self::BALANCE
            | Self::CALLDATALOAD
            | Self::EXTCODESIZE
            | Self::EXTCODEHASH
            | Self::BLOCKHASH
            | Self::MLOAD
            | Self::SLOAD
            | Self::TLOAD => (1, 1),

            Self::ADDRESS
            | Self::ORIGIN
            | Self::CALLER
            | Self::CALLVALUE
            | Self::CALLDATASIZE
            | Self::CODESIZE
            | Self::GASPRICE
            | Self::RETURNDATASIZE
            | Self::COINBASE
            | Self::TIMESTAMP
            | Self::NUMBER
            | Self::PREVRANDAO
            | Self::GASLIMIT
            | Self::CHAINID
            | Self::SELFBALANCE
            | Self::BASEFEE
            | Self::PC
            | Self::MSIZE
            | Self::GAS
            | Self::PUSH(_) => (0, 1),

            Self::CALLDATACOPY | Self::CODECOPY | Self::RETURNDATACOPY | Self::MCOPY => (3, 0),
            Self::EXTCODECOPY => (4, 0),

            Self::POP | Self::JUMP | Self::SELFDESTRUCT => (1, 0),
            Self::MSTORE
            | Self::MSTORE8
            | Self::SSTORE
            | Self::JUMPI
            | Self::TSTORE
            | Self::RETURN
            | Self::REVERT => (2, 0),

            Self::DUP(n) => (n as usize, n as usize + 1),
            Self::SWAP(n) => (n as usize + 1, n as usize + 1),
            Self::LOG(n) => (n as usize + 2, 0),

            Self::CREATE => (3, 1),
            Self::CREATE2 => (4, 1),
            Self::CALL | Self::CALLCODE => (7, 1),
            Self::DELEGATECALL | Self::STATICCALL => (6, 1),
        }
    }

    /// Sub-call, contract creation and self-destruct, which the
    /// interpreter does not execute.
    pub fn is_unsupported(self) -> bool {
        matches!(
            self,
            Self::CREATE
                | Self::CALL
                | Self::CALLCODE
                | Self::DELEGATECALL
                | Self::CREATE2
                | Self::STATICCALL
                | Self::SELFDESTRUCT
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PUSH(n) => write!(f, "PUSH{}", n),
            Self::DUP(n) => write!(f, "DUP{}", n),
            Self::SWAP(n) => write!(f, "SWAP{}", n),
            Self::LOG(n) => write!(f, "LOG{}", n),
            other => write!(f, "{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        for byte in 0u8..=255 {
            if let Some(op) = Opcode::from_byte(byte) {
                assert_eq!(op.to_byte(), byte, "{}", op);
            }
        }
    }

    #[test]
    fn test_assigned_byte_count() {
        let assigned = (0u8..=255).filter(|b| Opcode::from_byte(*b).is_some()).count();
        // 147 opcodes including PUSH0, TLOAD, TSTORE and MCOPY
        assert_eq!(assigned, 147);
    }

    #[test]
    fn test_unassigned_bytes() {
        for byte in [0x0c, 0x0f, 0x1e, 0x21, 0x49, 0xa5, 0xef, 0xf6, 0xfb] {
            assert_eq!(Opcode::from_byte(byte), None, "0x{:02x}", byte);
        }
    }

    #[test]
    fn test_families() {
        assert_eq!(Opcode::from_byte(0x5f), Some(Opcode::PUSH(0)));
        assert_eq!(Opcode::from_byte(0x60), Some(Opcode::PUSH(1)));
        assert_eq!(Opcode::from_byte(0x7f), Some(Opcode::PUSH(32)));
        assert_eq!(Opcode::from_byte(0x80), Some(Opcode::DUP(1)));
        assert_eq!(Opcode::from_byte(0x8f), Some(Opcode::DUP(16)));
        assert_eq!(Opcode::from_byte(0x90), Some(Opcode::SWAP(1)));
        assert_eq!(Opcode::from_byte(0x9f), Some(Opcode::SWAP(16)));
        assert_eq!(Opcode::from_byte(0xa4), Some(Opcode::LOG(4)));
    }

    #[test]
    fn test_immediate_len() {
        assert_eq!(Opcode::PUSH(0).immediate_len(), 0);
        assert_eq!(Opcode::PUSH(1).immediate_len(), 1);
        assert_eq!(Opcode::PUSH(32).immediate_len(), 32);
        assert_eq!(Opcode::ADD.immediate_len(), 0);
    }

    #[test]
    fn test_stack_io() {
        assert_eq!(Opcode::ADD.stack_io(), (2, 1));
        assert_eq!(Opcode::ADDMOD.stack_io(), (3, 1));
        assert_eq!(Opcode::DUP(3).stack_io(), (3, 4));
        assert_eq!(Opcode::SWAP(1).stack_io(), (2, 2));
        assert_eq!(Opcode::LOG(4).stack_io(), (6, 0));
        assert_eq!(Opcode::EXTCODECOPY.stack_io(), (4, 0));
        assert_eq!(Opcode::CALL.stack_io(), (7, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Opcode::ADD.to_string(), "ADD");
        assert_eq!(Opcode::PUSH(2).to_string(), "PUSH2");
        assert_eq!(Opcode::DUP(16).to_string(), "DUP16");
        assert_eq!(Opcode::LOG(0).to_string(), "LOG0");
        assert_eq!(Opcode::SHA3.to_string(), "SHA3");
    }

    #[test]
    fn test_unsupported() {
        assert!(Opcode::CALL.is_unsupported());
        assert!(Opcode::SELFDESTRUCT.is_unsupported());
        assert!(!Opcode::LOG(1).is_unsupported());
        assert!(!Opcode::RETURN.is_unsupported());
    }
}
