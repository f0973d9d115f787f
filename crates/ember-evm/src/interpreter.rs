//! EVM bytecode interpreter
//!
//! One [`Interpreter`] runs one transaction against one contract. Each step
//! fetches the instruction at `pc`, validates the stack, prices the
//! instruction (fetching any remote state the price depends on), charges the
//! gas and only then mutates stack, memory and storage. A failing step leaves
//! the state exactly as it was before the instruction, apart from gas already
//! charged.

use std::sync::Arc;

use bytes::Bytes;
use ember_crypto::keccak256;
use ember_primitives::Address;
use tracing::{debug, trace};

use crate::config::ExecutionConfig;
use crate::context::Environment;
use crate::error::{EvmError, EvmResult, HaltReason};
use crate::gas::{self, Dynamic, GasMeter};
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::program::{padded_slice, Program};
use crate::provider::StateProvider;
use crate::result::{Log, RunResult, StepResult};
use crate::stack::Stack;
use crate::storage::Storage;
use crate::word::Word;

/// Precompiled contracts 0x01..=0x09, warm from the start
pub const PRECOMPILES: u8 = 9;

/// Interpreter state
pub struct Interpreter {
    env: Environment,
    program: Program,
    stack: Stack,
    memory: Memory,
    storage: Storage,
    gas: GasMeter,
    pc: usize,
    halted: Option<HaltReason>,
    return_data: Bytes,
    logs: Vec<Log>,
}

impl Interpreter {
    /// Build an execution from a config. Seeded contracts are loaded first;
    /// the code of `to` comes from them or from `provider`.
    pub fn new(config: &ExecutionConfig, provider: Arc<dyn StateProvider>) -> EvmResult<Self> {
        let env = config.environment()?;
        let mut storage = Storage::new(provider, config.state_block());
        for account in config.seeded_accounts()? {
            storage.insert_account(account.address, account.code, account.balance, account.slots);
        }
        let code = storage.get_code(env.message.address)?;
        Ok(Self::from_parts(env, Program::new(code), storage))
    }

    /// Build an execution from already parsed parts. Warms the initial
    /// access set and deducts the intrinsic cost; if that cost does not fit
    /// in the gas limit the interpreter starts out halted.
    pub fn from_parts(env: Environment, program: Program, mut storage: Storage) -> Self {
        storage.touch_address(env.tx.origin);
        storage.touch_address(env.message.address);
        storage.touch_address(env.block.coinbase);
        for n in 1..=PRECOMPILES {
            storage.touch_address(Address::from_low_u8(n));
        }
        for item in &env.tx.access_list {
            storage.touch_address(item.address);
            for key in &item.storage_keys {
                storage.touch_slot(item.address, *key);
            }
        }

        let (addresses, keys) = env.tx.access_list_counts();
        let intrinsic = gas::intrinsic_gas(&env.message.data, addresses, keys);
        let mut meter = GasMeter::new(env.message.gas_limit);
        let halted = match meter.consume(intrinsic) {
            Ok(()) => {
                debug!(intrinsic, remaining = meter.remaining(), "intrinsic gas deducted");
                None
            }
            Err(e) => {
                debug!(intrinsic, limit = meter.limit(), "gas limit below intrinsic cost");
                Some(HaltReason::Error(e))
            }
        };

        Self {
            env,
            program,
            stack: Stack::new(),
            memory: Memory::new(),
            storage,
            gas: meter,
            pc: 0,
            halted,
            return_data: Bytes::new(),
            logs: Vec::new(),
        }
    }

    /// Execute until halted
    pub fn run(&mut self) -> RunResult {
        let halt = loop {
            if let StepResult::Halted(reason) = self.step() {
                break reason;
            }
        };

        let success = halt.is_success();
        RunResult {
            gas_limit: self.gas.limit(),
            gas_remaining: self.gas.remaining(),
            gas_refund: if success { self.gas.refund() } else { 0 },
            return_data: self.return_data.clone(),
            logs: if success { self.logs.clone() } else { Vec::new() },
            storage_changes: if success {
                self.storage.changes()
            } else {
                Vec::new()
            },
            halt,
        }
    }

    /// Execute a single instruction
    pub fn step(&mut self) -> StepResult {
        if let Some(reason) = &self.halted {
            return StepResult::Halted(reason.clone());
        }

        let reason = match self.execute() {
            Ok(None) => return StepResult::Continue,
            Ok(Some(reason)) => reason,
            Err(e) => HaltReason::Error(e),
        };
        debug!(pc = self.pc, %reason, gas_remaining = self.gas.remaining(), "halted");
        self.halted = Some(reason.clone());
        StepResult::Halted(reason)
    }

    fn execute(&mut self) -> EvmResult<Option<HaltReason>> {
        let pc = self.pc;
        if self.program.is_end_of_program(pc) {
            return Ok(Some(HaltReason::Stop));
        }

        let ins = self.program.get(pc)?;
        let (byte, next, immediate) = (ins.byte, ins.next_offset(), ins.immediate());
        let opcode = ins
            .opcode
            .ok_or(EvmError::UnknownOpcode { opcode: byte, pc })?;

        if opcode.is_unsupported() {
            return Err(EvmError::NotImplemented { opcode, pc });
        }
        if opcode == Opcode::INVALID {
            return Err(EvmError::InvalidInstruction(pc));
        }

        trace!(pc, %opcode, gas = self.gas.remaining(), depth = self.stack.len(), "step");

        match opcode {
            Opcode::DUP(n) => {
                self.stack.peek(n as usize)?;
            }
            Opcode::SWAP(n) => {
                self.stack.peek(n as usize + 1)?;
            }
            _ => {}
        }
        let (inputs, outputs) = opcode.stack_io();
        self.stack.require(inputs, outputs)?;

        let dynamic = self.price(opcode)?;
        self.gas.charge(opcode, &dynamic)?;

        self.apply(opcode, immediate, next)
    }

    /// Operand-dependent price inputs. Reads the stack without popping and
    /// fetches any account or slot the price depends on.
    fn price(&mut self, opcode: Opcode) -> EvmResult<Dynamic> {
        let address = self.env.message.address;
        let dynamic = match opcode {
            Opcode::EXP => Dynamic::Exp {
                exponent: self.stack.peek(2)?,
            },
            Opcode::SHA3 => {
                let (offset, length) = (self.stack.peek(1)?, self.stack.peek(2)?);
                Dynamic::Sha3 {
                    expansion: self.memory.expansion_cost(offset, length)?,
                    length: byte_count(length),
                }
            }
            Opcode::MLOAD | Opcode::MSTORE => Dynamic::Memory {
                expansion: self.memory.expansion_cost(self.stack.peek(1)?, Word::from(32u64))?,
            },
            Opcode::MSTORE8 => Dynamic::Memory {
                expansion: self.memory.expansion_cost(self.stack.peek(1)?, Word::ONE)?,
            },
            Opcode::RETURN | Opcode::REVERT => Dynamic::Memory {
                expansion: self
                    .memory
                    .expansion_cost(self.stack.peek(1)?, self.stack.peek(2)?)?,
            },
            Opcode::CALLDATACOPY | Opcode::CODECOPY => {
                let (dest, length) = (self.stack.peek(1)?, self.stack.peek(3)?);
                Dynamic::Copy {
                    expansion: self.memory.expansion_cost(dest, length)?,
                    length: byte_count(length),
                }
            }
            Opcode::RETURNDATACOPY => {
                let (offset, length) = (self.stack.peek(2)?, self.stack.peek(3)?);
                // the buffer is always empty, so only offset 0 length 0 is in bounds
                if !offset.is_zero() || !length.is_zero() {
                    return Err(EvmError::ReturnDataOutOfBounds {
                        offset,
                        length,
                        available: 0,
                    });
                }
                Dynamic::Copy {
                    length: 0,
                    expansion: 0,
                }
            }
            Opcode::MCOPY => {
                let (dest, src, length) =
                    (self.stack.peek(1)?, self.stack.peek(2)?, self.stack.peek(3)?);
                let expansion = self
                    .memory
                    .expansion_cost(dest, length)?
                    .max(self.memory.expansion_cost(src, length)?);
                Dynamic::Copy {
                    length: byte_count(length),
                    expansion,
                }
            }
            Opcode::EXTCODECOPY => {
                let target = self.stack.peek(1)?.to_address();
                let (dest, length) = (self.stack.peek(2)?, self.stack.peek(4)?);
                let expansion = self.memory.expansion_cost(dest, length)?;
                self.storage.account(target)?;
                Dynamic::ExtCodeCopy {
                    cold: !self.storage.is_address_touched(&target),
                    length: byte_count(length),
                    expansion,
                }
            }
            Opcode::BALANCE | Opcode::EXTCODESIZE | Opcode::EXTCODEHASH => {
                let target = self.stack.peek(1)?.to_address();
                self.storage.account(target)?;
                Dynamic::Account {
                    cold: !self.storage.is_address_touched(&target),
                }
            }
            Opcode::SELFBALANCE => {
                self.storage.account(address)?;
                Dynamic::None
            }
            Opcode::SLOAD => {
                let key = self.stack.peek(1)?;
                self.storage.load(address, key)?;
                Dynamic::Sload {
                    cold: !self.storage.is_slot_touched(&address, &key),
                }
            }
            Opcode::SSTORE => {
                let (key, new) = (self.stack.peek(1)?, self.stack.peek(2)?);
                Dynamic::Sstore {
                    cold: !self.storage.is_slot_touched(&address, &key),
                    original: self.storage.load_immutable(address, key)?,
                    current: self.storage.load(address, key)?,
                    new,
                }
            }
            Opcode::LOG(_) => {
                let (offset, length) = (self.stack.peek(1)?, self.stack.peek(2)?);
                Dynamic::Log {
                    expansion: self.memory.expansion_cost(offset, length)?,
                    length: byte_count(length),
                }
            }
            _ => Dynamic::None,
        };
        Ok(dynamic)
    }

    /// Effects of an already charged instruction
    fn apply(&mut self, opcode: Opcode, immediate: Word, next: usize) -> EvmResult<Option<HaltReason>> {
        let address = self.env.message.address;
        let mut next_pc = next;

        match opcode {
            Opcode::STOP => return Ok(Some(HaltReason::Stop)),

            // Arithmetic
            Opcode::ADD => self.binary(|a, b| a + b)?,
            Opcode::MUL => self.binary(|a, b| a * b)?,
            Opcode::SUB => self.binary(|a, b| a - b)?,
            Opcode::DIV => self.binary(|a, b| a / b)?,
            Opcode::SDIV => self.binary(Word::sdiv)?,
            Opcode::MOD => self.binary(|a, b| a % b)?,
            Opcode::SMOD => self.binary(Word::smod)?,
            Opcode::ADDMOD => {
                let (a, b, n) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                self.stack.push(a.addmod(b, n))?;
            }
            Opcode::MULMOD => {
                let (a, b, n) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                self.stack.push(a.mulmod(b, n))?;
            }
            Opcode::EXP => self.binary(Word::exp)?,
            Opcode::SIGNEXTEND => self.binary(|b, x| x.sign_extend(b))?,

            // Comparison
            Opcode::LT => self.binary(|a, b| Word::from(a < b))?,
            Opcode::GT => self.binary(|a, b| Word::from(a > b))?,
            Opcode::SLT => self.binary(|a, b| Word::from(a.slt(&b)))?,
            Opcode::SGT => self.binary(|a, b| Word::from(a.sgt(&b)))?,
            Opcode::EQ => self.binary(|a, b| Word::from(a == b))?,
            Opcode::ISZERO => {
                let a = self.stack.pop()?;
                self.stack.push(Word::from(a.is_zero()))?;
            }

            // Bitwise
            Opcode::AND => self.binary(|a, b| a & b)?,
            Opcode::OR => self.binary(|a, b| a | b)?,
            Opcode::XOR => self.binary(|a, b| a ^ b)?,
            Opcode::NOT => {
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
            }
            Opcode::BYTE => self.binary(|i, x| x.byte(i))?,
            Opcode::SHL => self.binary(|shift, value| value << shift)?,
            Opcode::SHR => self.binary(|shift, value| value >> shift)?,
            Opcode::SAR => self.binary(|shift, value| value.sar(shift))?,

            Opcode::SHA3 => {
                let (offset, length) = (self.stack.pop()?, self.stack.pop()?);
                let (data, _) = self.memory.load_range(offset, length)?;
                self.stack.push(Word::from(keccak256(&data)))?;
            }

            // Environment
            Opcode::ADDRESS => self.stack.push(Word::from(address))?,
            Opcode::BALANCE => {
                let target = self.stack.pop()?.to_address();
                self.storage.touch_address(target);
                let balance = self.storage.get_balance(target)?;
                self.stack.push(balance)?;
            }
            Opcode::ORIGIN => self.stack.push(Word::from(self.env.tx.origin))?,
            Opcode::CALLER => self.stack.push(Word::from(self.env.message.caller))?,
            Opcode::CALLVALUE => self.stack.push(self.env.message.value)?,
            Opcode::CALLDATALOAD => {
                let offset = self.stack.pop()?;
                let bytes = padded_slice(&self.env.message.data, offset, Word::BYTES);
                self.stack.push(Word::from_be_slice(&bytes)?)?;
            }
            Opcode::CALLDATASIZE => self.stack.push(Word::from(self.env.message.data.len()))?,
            Opcode::CALLDATACOPY => {
                let (dest, offset, length) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                let bytes = padded_slice(&self.env.message.data, offset, byte_count(length) as usize);
                self.memory.store_range(dest, length, &bytes)?;
            }
            Opcode::CODESIZE => self.stack.push(Word::from(self.program.size()))?,
            Opcode::CODECOPY => {
                let (dest, offset, length) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                let bytes = self.program.code_slice(offset, byte_count(length) as usize);
                self.memory.store_range(dest, length, &bytes)?;
            }
            Opcode::GASPRICE => self.stack.push(self.env.tx.gas_price)?,
            Opcode::EXTCODESIZE => {
                let target = self.stack.pop()?.to_address();
                self.storage.touch_address(target);
                let size = self.storage.account(target)?.code.len();
                self.stack.push(Word::from(size))?;
            }
            Opcode::EXTCODECOPY => {
                let target = self.stack.pop()?.to_address();
                let (dest, offset, length) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                self.storage.touch_address(target);
                let bytes = self
                    .storage
                    .get_code_slice(target, offset, byte_count(length) as usize)?;
                self.memory.store_range(dest, length, &bytes)?;
            }
            Opcode::RETURNDATASIZE => self.stack.push(Word::ZERO)?,
            Opcode::RETURNDATACOPY => {
                // zero-length copies only; anything else failed while pricing
                for _ in 0..3 {
                    self.stack.pop()?;
                }
            }
            Opcode::EXTCODEHASH => {
                let target = self.stack.pop()?.to_address();
                self.storage.touch_address(target);
                let account = self.storage.account(target)?;
                let hash = if account.is_empty() {
                    Word::ZERO
                } else {
                    Word::from(keccak256(&account.code))
                };
                self.stack.push(hash)?;
            }

            // Block
            Opcode::BLOCKHASH => {
                let number = self.stack.pop()?;
                self.stack.push(self.env.block.block_hash(number))?;
            }
            Opcode::COINBASE => self.stack.push(Word::from(self.env.block.coinbase))?,
            Opcode::TIMESTAMP => self.stack.push(Word::from(self.env.block.timestamp))?,
            Opcode::NUMBER => self.stack.push(Word::from(self.env.block.number))?,
            Opcode::PREVRANDAO => self.stack.push(self.env.block.difficulty)?,
            Opcode::GASLIMIT => self.stack.push(Word::from(self.env.block.gas_limit))?,
            Opcode::CHAINID => self.stack.push(Word::from(self.env.block.chain_id))?,
            Opcode::SELFBALANCE => {
                let balance = self.storage.get_balance(address)?;
                self.stack.push(balance)?;
            }
            Opcode::BASEFEE => self.stack.push(self.env.block.base_fee)?,

            // Stack, memory, storage and flow
            Opcode::POP => {
                self.stack.pop()?;
            }
            Opcode::MLOAD => {
                let offset = self.stack.pop()?;
                let (value, _) = self.memory.load(offset)?;
                self.stack.push(value)?;
            }
            Opcode::MSTORE => {
                let (offset, value) = (self.stack.pop()?, self.stack.pop()?);
                self.memory.store(offset, value)?;
            }
            Opcode::MSTORE8 => {
                let (offset, value) = (self.stack.pop()?, self.stack.pop()?);
                self.memory.store8(offset, value.to_bytes()[31])?;
            }
            Opcode::SLOAD => {
                let key = self.stack.pop()?;
                self.storage.touch_slot(address, key);
                let value = self.storage.load(address, key)?;
                self.stack.push(value)?;
            }
            Opcode::SSTORE => {
                let (key, value) = (self.stack.pop()?, self.stack.pop()?);
                self.storage.touch_slot(address, key);
                self.storage.store(address, key, value)?;
            }
            Opcode::JUMP => {
                let dest = self.stack.peek(1)?;
                next_pc = self.jump_target(dest)?;
                self.stack.pop()?;
            }
            Opcode::JUMPI => {
                let (dest, condition) = (self.stack.peek(1)?, self.stack.peek(2)?);
                if !condition.is_zero() {
                    next_pc = self.jump_target(dest)?;
                }
                self.stack.pop()?;
                self.stack.pop()?;
            }
            Opcode::PC => self.stack.push(Word::from(self.pc))?,
            Opcode::MSIZE => self.stack.push(Word::from(self.memory.size()))?,
            Opcode::GAS => self.stack.push(Word::from(self.gas.remaining()))?,
            Opcode::JUMPDEST => {}
            Opcode::TLOAD => {
                let key = self.stack.pop()?;
                self.stack.push(self.storage.tload(address, key))?;
            }
            Opcode::TSTORE => {
                let (key, value) = (self.stack.pop()?, self.stack.pop()?);
                self.storage.tstore(address, key, value);
            }
            Opcode::MCOPY => {
                let (dest, src, length) = (self.stack.pop()?, self.stack.pop()?, self.stack.pop()?);
                self.memory.copy_within(dest, src, length)?;
            }

            Opcode::PUSH(_) => self.stack.push(immediate)?,
            Opcode::DUP(n) => self.stack.dup(n as usize)?,
            Opcode::SWAP(n) => self.stack.swap(n as usize)?,

            Opcode::LOG(n) => {
                let (offset, length) = (self.stack.pop()?, self.stack.pop()?);
                let mut topics = Vec::with_capacity(n as usize);
                for _ in 0..n {
                    topics.push(self.stack.pop()?);
                }
                let (data, _) = self.memory.load_range(offset, length)?;
                self.logs.push(Log {
                    address,
                    topics,
                    data: Bytes::from(data),
                });
            }

            Opcode::RETURN | Opcode::REVERT => {
                let (offset, length) = (self.stack.pop()?, self.stack.pop()?);
                let (data, _) = self.memory.load_range(offset, length)?;
                self.return_data = Bytes::from(data);
                return Ok(Some(if opcode == Opcode::RETURN {
                    HaltReason::Return
                } else {
                    HaltReason::Revert
                }));
            }

            // rejected in execute
            Opcode::INVALID
            | Opcode::CREATE
            | Opcode::CALL
            | Opcode::CALLCODE
            | Opcode::DELEGATECALL
            | Opcode::CREATE2
            | Opcode::STATICCALL
            | Opcode::SELFDESTRUCT => {
                return Err(EvmError::NotImplemented {
                    opcode,
                    pc: self.pc,
                })
            }
        }

        self.pc = next_pc;
        Ok(None)
    }

    /// Pop `a` (top) and `b`, push `f(a, b)`
    fn binary(&mut self, f: impl FnOnce(Word, Word) -> Word) -> EvmResult<()> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(f(a, b))
    }

    fn jump_target(&self, dest: Word) -> EvmResult<usize> {
        match dest.to_usize() {
            Some(target) if self.program.is_jumpdest(target) => Ok(target),
            _ => Err(EvmError::InvalidJumpDestination { pc: self.pc, destination: dest }),
        }
    }

    /// Stack contents, top first
    pub fn stack(&self) -> Vec<Word> {
        self.stack.to_vec()
    }

    /// Memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Account state
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Decoded program
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Environment
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Program counter
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Gas left
    pub fn gas_remaining(&self) -> u64 {
        self.gas.remaining()
    }

    /// Raw refund counter
    pub fn refund(&self) -> i64 {
        self.gas.refund()
    }

    /// Logs emitted so far
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// RETURN/REVERT payload
    pub fn return_data(&self) -> &Bytes {
        &self.return_data
    }

    /// Halt reason, once halted
    pub fn halt_reason(&self) -> Option<&HaltReason> {
        self.halted.as_ref()
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("pc", &self.pc)
            .field("gas", &self.gas)
            .field("stack", &self.stack.len())
            .field("memory", &self.memory.size())
            .field("halted", &self.halted)
            .finish()
    }
}

/// Length operand as a byte count. Lengths that reach here are either zero
/// or already bounded by the memory limit.
fn byte_count(length: Word) -> u64 {
    length.to_u64().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AccessListItem, Message};

    const GAS: u64 = 1_000_000;
    const INTRINSIC: u64 = 21_000;

    fn interpreter(code: &str) -> Interpreter {
        interpreter_with(code, Bytes::new())
    }

    fn interpreter_with(code: &str, calldata: Bytes) -> Interpreter {
        let env = Environment {
            message: Message {
                address: Address::from_low_u8(0xcc),
                caller: Address::from_low_u8(0xaa),
                data: calldata,
                gas_limit: GAS,
                ..Default::default()
            },
            ..Default::default()
        };
        let program = Program::from_hex(code).unwrap();
        Interpreter::from_parts(env, program, Storage::offline())
    }

    fn run(code: &str) -> (Interpreter, RunResult) {
        let mut interp = interpreter(code);
        let result = interp.run();
        (interp, result)
    }

    fn w(v: u64) -> Word {
        Word::from(v)
    }

    // ==================== Basic execution ====================

    #[test]
    fn test_push_add_falls_off_end() {
        let (interp, result) = run("6001600101");
        assert_eq!(result.halt, HaltReason::Stop);
        assert_eq!(interp.stack(), vec![w(2)]);
        assert_eq!(result.gas_used(), INTRINSIC + 9);
        assert_eq!(interp.pc(), 5);
    }

    #[test]
    fn test_stop() {
        let (interp, result) = run("600100");
        assert!(result.is_success());
        assert_eq!(interp.stack(), vec![w(1)]);
    }

    #[test]
    fn test_step_by_step() {
        let mut interp = interpreter("60016002");
        assert_eq!(interp.step(), StepResult::Continue);
        assert_eq!(interp.pc(), 2);
        assert_eq!(interp.gas_remaining(), GAS - INTRINSIC - 3);
        assert_eq!(interp.step(), StepResult::Continue);
        assert_eq!(interp.stack(), vec![w(2), w(1)]);
        assert_eq!(interp.step(), StepResult::Halted(HaltReason::Stop));
        // halted stays halted
        assert!(interp.step().is_halted());
    }

    #[test]
    fn test_intrinsic_exceeds_limit() {
        let env = Environment {
            message: Message {
                gas_limit: 20_000,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut interp = Interpreter::from_parts(env, Program::from_hex("00").unwrap(), Storage::offline());
        let result = interp.run();
        assert!(matches!(
            result.halt,
            HaltReason::Error(EvmError::InsufficientGas { required: 21_000, .. })
        ));
        assert_eq!(result.gas_remaining, 20_000);
    }

    #[test]
    fn test_intrinsic_counts_calldata_and_access_list() {
        let mut env = Environment::default();
        env.message.gas_limit = GAS;
        env.message.data = Bytes::from(vec![0, 1, 0]);
        env.tx.access_list = vec![AccessListItem {
            address: Address::from_low_u8(0x50),
            storage_keys: vec![w(1)],
        }];
        let interp = Interpreter::from_parts(env, Program::default(), Storage::offline());
        assert_eq!(interp.gas_remaining(), GAS - (21_000 + 4 + 16 + 4 + 2400 + 1900));
        assert!(interp.storage().is_slot_touched(&Address::from_low_u8(0x50), &w(1)));
        assert!(interp.storage().is_address_touched(&Address::from_low_u8(9)));
        assert!(!interp.storage().is_address_touched(&Address::from_low_u8(10)));
    }

    // ==================== Arithmetic ====================

    #[test]
    fn test_sub_operand_order() {
        // PUSH1 3, PUSH1 10, SUB -> 10 - 3
        let (interp, _) = run("6003600a03");
        assert_eq!(interp.stack(), vec![w(7)]);
    }

    #[test]
    fn test_div_by_zero() {
        let (interp, _) = run("6000600a04");
        assert_eq!(interp.stack(), vec![Word::ZERO]);
    }

    #[test]
    fn test_sdiv_negative() {
        // -10 / 3 = -3 (truncated)
        let code = "6003600a600003 05";
        let (interp, _) = run(&code.replace(' ', ""));
        assert_eq!(interp.stack()[0].to_signed(), crate::I256::from(-3i64));
    }

    #[test]
    fn test_exp_gas() {
        // PUSH2 0x0100 (exponent), PUSH1 2, EXP: 2^256 wraps to 0
        let (interp, result) = run("61010060020a");
        assert_eq!(interp.stack(), vec![Word::ZERO]);
        assert_eq!(result.gas_used(), INTRINSIC + 3 + 3 + 10 + 50 * 2);
    }

    #[test]
    fn test_signextend() {
        // PUSH1 0xff, PUSH1 0, SIGNEXTEND
        let (interp, _) = run("60ff60000b");
        assert_eq!(interp.stack(), vec![Word::MAX]);
    }

    #[test]
    fn test_shifts() {
        // PUSH1 1, PUSH1 4, SHL -> 16
        let (interp, _) = run("600160041b");
        assert_eq!(interp.stack(), vec![w(16)]);
        // PUSH1 0xf0, PUSH1 4, SHR -> 0x0f
        let (interp, _) = run("60f060041c");
        assert_eq!(interp.stack(), vec![w(0x0f)]);
    }

    #[test]
    fn test_byte() {
        // PUSH2 0xabcd, PUSH1 30, BYTE -> 0xab
        let (interp, _) = run("61abcd601e1a");
        assert_eq!(interp.stack(), vec![w(0xab)]);
    }

    // ==================== Stack errors ====================

    #[test]
    fn test_underflow_charges_nothing() {
        let (interp, result) = run("01");
        assert_eq!(result.halt, HaltReason::Error(EvmError::StackUnderflow));
        assert_eq!(result.gas_used(), INTRINSIC);
        assert!(interp.stack().is_empty());
    }

    #[test]
    fn test_dup_item_not_present() {
        let (_, result) = run("600182");
        assert_eq!(
            result.halt,
            HaltReason::Error(EvmError::ItemNotPresent { index: 3, depth: 1 })
        );
    }

    #[test]
    fn test_swap_item_not_present() {
        let (interp, result) = run("600190");
        assert_eq!(
            result.halt,
            HaltReason::Error(EvmError::ItemNotPresent { index: 2, depth: 1 })
        );
        assert_eq!(interp.stack(), vec![w(1)]);
    }

    #[test]
    fn test_dup_swap() {
        // PUSH1 1, PUSH1 2, DUP2, SWAP2
        let (interp, _) = run("600160028191");
        assert_eq!(interp.stack(), vec![w(1), w(2), w(1)]);
    }

    // ==================== Memory ====================

    #[test]
    fn test_mstore_mload_msize() {
        // PUSH1 0x2a, PUSH1 0, MSTORE, PUSH1 0, MLOAD, MSIZE
        let (interp, result) = run("602a60005260005159");
        assert_eq!(interp.stack(), vec![w(32), w(0x2a)]);
        // 3 + 3 + (3 + 3) + 3 + 3 + 2; second access costs no expansion
        assert_eq!(result.gas_used(), INTRINSIC + 20);
    }

    #[test]
    fn test_mstore8() {
        // PUSH2 0x1234, PUSH1 0, MSTORE8
        let (interp, _) = run("6112346000 53".replace(' ', "").as_str());
        assert_eq!(interp.memory().data()[0], 0x34);
        assert_eq!(interp.memory().size(), 32);
    }

    #[test]
    fn test_memory_offset_too_large() {
        // PUSH1 1, PUSH5 0x0100000000, MLOAD
        let (_, result) = run("6001640100000000 51".replace(' ', "").as_str());
        assert!(matches!(result.halt, HaltReason::Error(EvmError::OffsetTooLarge { .. })));
    }

    #[test]
    fn test_mcopy() {
        // PUSH1 0x2a, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, PUSH1 32, MCOPY
        let (interp, _) = run("602a6000526020600060205e");
        assert_eq!(interp.memory().data()[63], 0x2a);
        assert_eq!(interp.memory().size(), 64);
    }

    #[test]
    fn test_sha3() {
        // PUSH1 0, PUSH1 0, SHA3 over empty input
        let (interp, result) = run("6000600020");
        assert_eq!(interp.stack(), vec![Word::from(ember_crypto::KECCAK_EMPTY)]);
        assert_eq!(result.gas_used(), INTRINSIC + 3 + 3 + 30);
    }

    // ==================== Calldata and code ====================

    #[test]
    fn test_calldataload_padded() {
        let mut interp = interpreter_with("600035", Bytes::from(vec![0xff]));
        interp.run();
        let mut expected = [0u8; 32];
        expected[0] = 0xff;
        assert_eq!(interp.stack(), vec![Word::from_bytes(expected)]);
    }

    #[test]
    fn test_codecopy() {
        // PUSH1 4, PUSH1 0, PUSH1 0, CODECOPY
        let (interp, result) = run("6004600060003900");
        assert_eq!(&interp.memory().data()[..4], &[0x60, 0x04, 0x60, 0x00]);
        assert_eq!(result.gas_used(), INTRINSIC + 9 + 3 + 3 + 3);
    }

    #[test]
    fn test_returndatacopy_out_of_bounds() {
        // PUSH1 1, PUSH1 0, PUSH1 0, RETURNDATACOPY
        let (_, result) = run("6001600060003e");
        assert!(matches!(
            result.halt,
            HaltReason::Error(EvmError::ReturnDataOutOfBounds { available: 0, .. })
        ));
    }

    #[test]
    fn test_returndatacopy_offset_past_empty_buffer() {
        // PUSH1 0 (length), PUSH1 5 (offset), PUSH1 0 (dest), RETURNDATACOPY
        let (interp, result) = run("6000600560003e");
        assert_eq!(
            result.halt,
            HaltReason::Error(EvmError::ReturnDataOutOfBounds {
                offset: w(5),
                length: Word::ZERO,
                available: 0,
            })
        );
        assert_eq!(interp.stack().len(), 3);
        assert_eq!(interp.halt_reason(), Some(&result.halt));
    }

    #[test]
    fn test_returndatacopy_empty_range() {
        // PUSH1 0, PUSH1 0, PUSH1 0, RETURNDATACOPY
        let (interp, result) = run("6000600060003e");
        assert!(result.is_success());
        assert!(interp.stack().is_empty());
        assert_eq!(result.gas_used(), INTRINSIC + 9 + 3);
    }

    // ==================== Control flow ====================

    #[test]
    fn test_jump() {
        // PUSH1 4, JUMP, INVALID, JUMPDEST, PUSH1 1
        let (interp, result) = run("600456fe5b6001");
        assert!(result.is_success());
        assert_eq!(interp.stack(), vec![w(1)]);
    }

    #[test]
    fn test_jumpi_not_taken() {
        // PUSH1 0, PUSH1 7, JUMPI, PUSH1 1, STOP, JUMPDEST
        let (interp, _) = run("60006007576001005b");
        assert_eq!(interp.stack(), vec![w(1)]);
    }

    #[test]
    fn test_invalid_jump_keeps_jump_gas() {
        // PUSH1 3, JUMP, STOP, STOP
        let (interp, result) = run("6003560000");
        assert_eq!(
            result.halt,
            HaltReason::Error(EvmError::InvalidJumpDestination { pc: 2, destination: w(3) })
        );
        assert_eq!(result.gas_used(), INTRINSIC + 3 + 8);
        // destination stays on the stack
        assert_eq!(interp.stack(), vec![w(3)]);
    }

    #[test]
    fn test_jump_into_push_data() {
        // PUSH1 4, JUMP, PUSH1 0x5b; offset 4 is immediate data
        let (_, result) = run("600456605b");
        assert!(matches!(
            result.halt,
            HaltReason::Error(EvmError::InvalidJumpDestination { .. })
        ));
    }

    #[test]
    fn test_unknown_opcode() {
        let (_, result) = run("60010c");
        assert_eq!(
            result.halt,
            HaltReason::Error(EvmError::UnknownOpcode { opcode: 0x0c, pc: 2 })
        );
    }

    #[test]
    fn test_invalid_instruction() {
        let (_, result) = run("fe");
        assert_eq!(result.halt, HaltReason::Error(EvmError::InvalidInstruction(0)));
    }

    #[test]
    fn test_call_not_implemented() {
        let (_, result) = run("f1");
        assert_eq!(
            result.halt,
            HaltReason::Error(EvmError::NotImplemented { opcode: Opcode::CALL, pc: 0 })
        );
    }

    #[test]
    fn test_out_of_gas() {
        let mut env = Environment::default();
        env.message.gas_limit = INTRINSIC + 5;
        let mut interp = Interpreter::from_parts(env, Program::from_hex("60016001").unwrap(), Storage::offline());
        let result = interp.run();
        assert!(matches!(
            result.halt,
            HaltReason::Error(EvmError::InsufficientGas { required: 3, remaining: 2 })
        ));
        assert_eq!(interp.stack(), vec![w(1)]);
    }

    #[test]
    fn test_gas_and_pc() {
        // PC, GAS
        let (interp, _) = run("585a");
        assert_eq!(interp.stack(), vec![w(GAS - INTRINSIC - 4), w(0)]);
    }

    // ==================== Return ====================

    #[test]
    fn test_return_data() {
        // PUSH1 0x2a, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
        let (_, result) = run("602a60005260206000f3");
        assert_eq!(result.halt, HaltReason::Return);
        assert_eq!(result.return_data.len(), 32);
        assert_eq!(result.return_data[31], 0x2a);
    }

    #[test]
    fn test_revert_drops_logs() {
        // PUSH1 0, PUSH1 0, LOG0, PUSH1 0, PUSH1 0, REVERT
        let (interp, result) = run("60006000a060006000fd");
        assert_eq!(result.halt, HaltReason::Revert);
        assert_eq!(interp.logs().len(), 1);
        assert!(result.logs.is_empty());
    }
}
