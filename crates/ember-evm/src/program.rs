//! Decoded bytecode
//!
//! Decoding never fails: every byte starts an instruction unless it is
//! PUSH immediate data. Unassigned bytes decode to instructions with no
//! opcode and fail only when executed. A PUSH whose immediate runs past the
//! end of the code is right-padded with zeros.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use ember_primitives::strip_hex_prefix;

use crate::error::{EvmError, EvmResult};
use crate::opcode::Opcode;
use crate::word::Word;

/// Instruction operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand
    None,
    /// PUSH immediate, always exactly the declared width
    Immediate(Vec<u8>),
    /// DUP/SWAP index encoded in the opcode
    Index(u8),
}

/// A decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode byte
    pub offset: usize,
    /// Raw opcode byte
    pub byte: u8,
    /// Decoded opcode, `None` for unassigned bytes
    pub opcode: Option<Opcode>,
    /// Operand
    pub operand: Operand,
    /// Bytes consumed, including immediate data actually present
    pub len: usize,
}

impl Instruction {
    /// PUSH immediate as a word (zero for other instructions)
    pub fn immediate(&self) -> Word {
        match &self.operand {
            Operand::Immediate(bytes) => Word::from_be_slice(bytes).unwrap_or_default(),
            _ => Word::ZERO,
        }
    }

    /// Offset of the following instruction
    pub fn next_offset(&self) -> usize {
        self.offset + self.len
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.opcode, &self.operand) {
            (None, _) => write!(f, "UNKNOWN(0x{:02x})", self.byte),
            (Some(op), Operand::Immediate(bytes)) if !bytes.is_empty() => {
                write!(f, "{} 0x{}", op, hex::encode(bytes))
            }
            (Some(op), _) => write!(f, "{}", op),
        }
    }
}

/// Immutable decoded program
#[derive(Debug, Clone, Default)]
pub struct Program {
    code: Bytes,
    instructions: BTreeMap<usize, Instruction>,
}

impl Program {
    /// Decode raw bytecode
    pub fn new(code: impl Into<Bytes>) -> Self {
        let code = code.into();
        let mut instructions = BTreeMap::new();
        let mut pc = 0;

        while pc < code.len() {
            let byte = code[pc];
            let opcode = Opcode::from_byte(byte);
            let operand = match opcode {
                Some(Opcode::PUSH(n)) if n > 0 => {
                    let width = n as usize;
                    let start = (pc + 1).min(code.len());
                    let end = (pc + 1 + width).min(code.len());
                    let mut immediate = code[start..end].to_vec();
                    immediate.resize(width, 0);
                    Operand::Immediate(immediate)
                }
                Some(Opcode::DUP(n)) | Some(Opcode::SWAP(n)) => Operand::Index(n),
                _ => Operand::None,
            };
            let width = 1 + opcode.map_or(0, Opcode::immediate_len);
            let len = width.min(code.len() - pc);
            instructions.insert(
                pc,
                Instruction {
                    offset: pc,
                    byte,
                    opcode,
                    operand,
                    len,
                },
            );
            pc += width;
        }

        Self { code, instructions }
    }

    /// Decode hex bytecode; `0x` prefix optional, case-insensitive
    pub fn from_hex(s: &str) -> EvmResult<Self> {
        let code = decode_hex(s)?;
        Ok(Self::new(code))
    }

    /// Instruction starting at `offset`
    pub fn get(&self, offset: usize) -> EvmResult<&Instruction> {
        self.instructions
            .get(&offset)
            .ok_or(EvmError::InstructionNotFound(offset))
    }

    /// Whether `pc` is at or past the end of the code
    pub fn is_end_of_program(&self, pc: usize) -> bool {
        pc >= self.code.len()
    }

    /// Whether `offset` holds a JUMPDEST instruction (not PUSH data)
    pub fn is_jumpdest(&self, offset: usize) -> bool {
        matches!(
            self.instructions.get(&offset),
            Some(Instruction {
                opcode: Some(Opcode::JUMPDEST),
                ..
            })
        )
    }

    /// Code length in bytes
    pub fn size(&self) -> usize {
        self.code.len()
    }

    /// Raw code
    pub fn code(&self) -> &Bytes {
        &self.code
    }

    /// `length` raw code bytes from `offset`, zero-padded past the end
    pub fn code_slice(&self, offset: Word, length: usize) -> Vec<u8> {
        padded_slice(&self.code, offset, length)
    }

    /// Number of decoded instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program has no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instructions in offset order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Instruction)> {
        self.instructions.iter().map(|(offset, ins)| (*offset, ins))
    }
}

/// Decode a hex string, tolerating a `0x` prefix, mixed case and surrounding
/// whitespace.
pub fn decode_hex(s: &str) -> EvmResult<Vec<u8>> {
    let normalized = strip_hex_prefix(s.trim()).to_ascii_lowercase();
    hex::decode(&normalized).map_err(|e| EvmError::InvalidHex(format!("{}: {}", s.trim(), e)))
}

/// `length` bytes of `data` from `offset`, zero-filled where out of range
pub(crate) fn padded_slice(data: &[u8], offset: Word, length: usize) -> Vec<u8> {
    let mut out = vec![0u8; length];
    if let Some(start) = offset.to_usize() {
        if start < data.len() {
            let end = start.saturating_add(length).min(data.len());
            out[..end - start].copy_from_slice(&data[start..end]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Decoding ====================

    #[test]
    fn test_decode_push_add() {
        let program = Program::from_hex("6001600101").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.size(), 5);

        let first = program.get(0).unwrap();
        assert_eq!(first.opcode, Some(Opcode::PUSH(1)));
        assert_eq!(first.operand, Operand::Immediate(vec![0x01]));
        assert_eq!(first.len, 2);
        assert_eq!(first.immediate(), Word::ONE);

        assert_eq!(program.get(4).unwrap().opcode, Some(Opcode::ADD));
        assert_eq!(program.get(1), Err(EvmError::InstructionNotFound(1)));
    }

    #[test]
    fn test_decode_prefix_and_case() {
        let a = Program::from_hex("0x60FF").unwrap();
        let b = Program::from_hex("  60ff\n").unwrap();
        assert_eq!(a.code(), b.code());
        assert_eq!(a.get(0).unwrap().immediate(), Word::from(0xffu64));
    }

    #[test]
    fn test_decode_invalid_hex() {
        assert!(matches!(Program::from_hex("0x6"), Err(EvmError::InvalidHex(_))));
        assert!(matches!(Program::from_hex("zz"), Err(EvmError::InvalidHex(_))));
        assert!(Program::from_hex("").unwrap().is_empty());
    }

    #[test]
    fn test_truncated_push_padded() {
        let program = Program::from_hex("61ab").unwrap();
        let ins = program.get(0).unwrap();
        assert_eq!(ins.operand, Operand::Immediate(vec![0xab, 0x00]));
        assert_eq!(ins.immediate(), Word::from(0xab00u64));
        assert_eq!(ins.len, 2);
        assert!(program.is_end_of_program(ins.next_offset() + 1));
    }

    #[test]
    fn test_unknown_byte_decodes() {
        let program = Program::from_hex("0c00").unwrap();
        let ins = program.get(0).unwrap();
        assert_eq!(ins.opcode, None);
        assert_eq!(ins.to_string(), "UNKNOWN(0x0c)");
        assert_eq!(program.get(1).unwrap().opcode, Some(Opcode::STOP));
    }

    #[test]
    fn test_dup_swap_operand() {
        let program = Program::from_hex("829f").unwrap();
        assert_eq!(program.get(0).unwrap().operand, Operand::Index(3));
        assert_eq!(program.get(1).unwrap().operand, Operand::Index(16));
        assert_eq!(program.get(0).unwrap().to_string(), "DUP3");
    }

    // ==================== Jump destinations ====================

    #[test]
    fn test_jumpdest_inside_push_data() {
        // PUSH1 0x5b, JUMPDEST
        let program = Program::from_hex("605b5b").unwrap();
        assert!(!program.is_jumpdest(1));
        assert!(program.is_jumpdest(2));
        assert!(!program.is_jumpdest(10));
    }

    // ==================== Inspection ====================

    #[test]
    fn test_display_and_iter() {
        let program = Program::from_hex("60016002015f00").unwrap();
        let listing: Vec<String> = program
            .iter()
            .map(|(offset, ins)| format!("{}: {}", offset, ins))
            .collect();
        assert_eq!(
            listing,
            vec!["0: PUSH1 0x01", "2: PUSH1 0x02", "4: ADD", "5: PUSH0", "6: STOP"]
        );
    }

    #[test]
    fn test_code_slice() {
        let program = Program::from_hex("010203").unwrap();
        assert_eq!(program.code_slice(Word::ONE, 4), vec![2, 3, 0, 0]);
        assert_eq!(program.code_slice(Word::from(3u64), 2), vec![0, 0]);
        assert_eq!(program.code_slice(Word::MAX, 1), vec![0]);
        assert!(program.code_slice(Word::ZERO, 0).is_empty());
    }
}
