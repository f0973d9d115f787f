//! Byte-addressed linear memory
//!
//! Memory grows in 32-byte words. Every operation that reaches past the
//! current size expands it and returns the gas owed for the expansion, so
//! repeated access to an already covered range costs nothing extra.

use crate::error::{EvmError, EvmResult};
use crate::gas;
use crate::word::Word;

/// Accesses ending beyond this many bytes fail with `OffsetTooLarge`.
///
/// Expansion is priced before it happens, and covering the full 4 GiB
/// costs about 3.5e13 gas, so only a run whose gas limit is at least that
/// large can allocate it.
pub const MEMORY_LIMIT: u64 = 1 << 32;

/// EVM memory
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
    highest: Option<usize>,
    cost: u64,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Size in bytes, always a multiple of 32
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Size in 32-byte words
    pub fn words(&self) -> usize {
        self.data.len() / 32
    }

    /// Highest byte offset any access has reached
    pub fn highest_touched_offset(&self) -> Option<usize> {
        self.highest
    }

    /// Total expansion gas paid so far
    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// Raw contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Gas owed to cover `[offset, offset + length)`, without expanding.
    pub fn expansion_cost(&self, offset: Word, length: Word) -> EvmResult<u64> {
        match checked_range(offset, length)? {
            Some((start, len)) => Ok(self.cost_to_reach(start + len)),
            None => Ok(0),
        }
    }

    /// Read a big-endian word
    pub fn load(&mut self, offset: Word) -> EvmResult<(Word, u64)> {
        let (bytes, cost) = self.load_range(offset, Word::from(32u64))?;
        let word = Word::from_be_slice(&bytes)?;
        Ok((word, cost))
    }

    /// Read `length` bytes
    pub fn load_range(&mut self, offset: Word, length: Word) -> EvmResult<(Vec<u8>, u64)> {
        let Some((start, len)) = checked_range(offset, length)? else {
            return Ok((Vec::new(), 0));
        };
        let cost = self.expand(start, len);
        Ok((self.data[start..start + len].to_vec(), cost))
    }

    /// Write a big-endian word
    pub fn store(&mut self, offset: Word, value: Word) -> EvmResult<u64> {
        self.store_range(offset, Word::from(32u64), &value.to_bytes())
    }

    /// Write a single byte
    pub fn store8(&mut self, offset: Word, value: u8) -> EvmResult<u64> {
        self.store_range(offset, Word::ONE, &[value])
    }

    /// Write `bytes`, which must be exactly `length` long
    pub fn store_range(&mut self, offset: Word, length: Word, bytes: &[u8]) -> EvmResult<u64> {
        let expected = length.to_usize().ok_or(EvmError::OffsetTooLarge { offset, length })?;
        if bytes.len() != expected {
            return Err(EvmError::LengthMismatch {
                expected,
                got: bytes.len(),
            });
        }
        let Some((start, len)) = checked_range(offset, length)? else {
            return Ok(0);
        };
        let cost = self.expand(start, len);
        self.data[start..start + len].copy_from_slice(bytes);
        Ok(cost)
    }

    /// Copy `length` bytes from `src` to `dst`; the ranges may overlap.
    pub fn copy_within(&mut self, dst: Word, src: Word, length: Word) -> EvmResult<u64> {
        let Some((src_start, len)) = checked_range(src, length)? else {
            return Ok(0);
        };
        let Some((dst_start, _)) = checked_range(dst, length)? else {
            return Ok(0);
        };
        let cost = self.expand(src_start, len) + self.expand(dst_start, len);
        self.data.copy_within(src_start..src_start + len, dst_start);
        Ok(cost)
    }

    fn cost_to_reach(&self, end: usize) -> u64 {
        let words = end.div_ceil(32) as u64;
        if words as usize <= self.words() {
            0
        } else {
            gas::memory_cost(words) - self.cost
        }
    }

    fn expand(&mut self, start: usize, len: usize) -> u64 {
        let end = start + len;
        let delta = self.cost_to_reach(end);
        let aligned = end.div_ceil(32) * 32;
        if aligned > self.data.len() {
            self.data.resize(aligned, 0);
            self.cost += delta;
        }
        self.highest = Some(self.highest.map_or(end - 1, |h| h.max(end - 1)));
        delta
    }
}

/// `Some((start, len))` for a non-empty range inside the limit.
fn checked_range(offset: Word, length: Word) -> EvmResult<Option<(usize, usize)>> {
    if length.is_zero() {
        return Ok(None);
    }
    let too_large = EvmError::OffsetTooLarge { offset, length };
    let start = offset.to_u64().ok_or_else(|| too_large.clone())?;
    let len = length.to_u64().ok_or_else(|| too_large.clone())?;
    match start.checked_add(len) {
        Some(end) if end <= MEMORY_LIMIT => Ok(Some((start as usize, len as usize))),
        _ => Err(too_large),
    }
}
