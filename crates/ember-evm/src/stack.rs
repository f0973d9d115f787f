//! Operand stack

use crate::error::{EvmError, EvmResult};
use crate::word::Word;

/// Maximum stack depth
pub const STACK_LIMIT: usize = 1024;

/// Largest index accepted by [`Stack::peek`] and [`Stack::dup`]
pub const MAX_PEEK_INDEX: usize = 32;

/// Largest index accepted by [`Stack::swap`]
pub const MAX_SWAP_INDEX: usize = 16;

/// EVM stack of at most 1024 words.
///
/// Positions are 1-based from the top: index 1 is the most recently pushed
/// word.
#[derive(Clone, Debug, Default)]
pub struct Stack {
    data: Vec<Word>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(STACK_LIMIT),
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: Word) -> EvmResult<()> {
        if self.data.len() >= STACK_LIMIT {
            return Err(EvmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> EvmResult<Word> {
        self.data.pop().ok_or(EvmError::StackUnderflow)
    }

    /// Value at 1-based `index` from the top
    pub fn peek(&self, index: usize) -> EvmResult<Word> {
        self.position(index, MAX_PEEK_INDEX).map(|i| self.data[i])
    }

    /// Push a copy of the value at `index`
    pub fn dup(&mut self, index: usize) -> EvmResult<()> {
        let value = self.peek(index)?;
        self.push(value)
    }

    /// Exchange the top with the value `index` positions below it.
    /// `swap(1)` exchanges the two topmost values.
    pub fn swap(&mut self, index: usize) -> EvmResult<()> {
        if index == 0 || index > MAX_SWAP_INDEX {
            return Err(EvmError::InvalidIndex {
                index,
                max: MAX_SWAP_INDEX,
            });
        }
        let top = self.position(1, MAX_PEEK_INDEX)?;
        let other = self.position(index + 1, MAX_PEEK_INDEX)?;
        self.data.swap(top, other);
        Ok(())
    }

    /// Check that `inputs` values can be popped and `outputs` pushed after.
    pub fn require(&self, inputs: usize, outputs: usize) -> EvmResult<()> {
        let len = self.data.len();
        if len < inputs {
            return Err(EvmError::StackUnderflow);
        }
        if len - inputs + outputs > STACK_LIMIT {
            return Err(EvmError::StackOverflow);
        }
        Ok(())
    }

    /// Get current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values from top to bottom
    pub fn iter(&self) -> impl Iterator<Item = &Word> {
        self.data.iter().rev()
    }

    /// Values from top to bottom
    pub fn to_vec(&self) -> Vec<Word> {
        self.iter().copied().collect()
    }

    fn position(&self, index: usize, max: usize) -> EvmResult<usize> {
        if index == 0 || index > max {
            return Err(EvmError::InvalidIndex { index, max });
        }
        let depth = self.data.len();
        if index > depth {
            return Err(EvmError::ItemNotPresent { index, depth });
        }
        Ok(depth - index)
    }
}
