//! 256-bit machine word
//!
//! [`Word`] is the value type held on the stack, in storage slots and in
//! memory words. Arithmetic wraps modulo 2^256, division by zero yields zero,
//! and the signed operations read the word as two's complement.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Not, Rem, Shl, Shr, Sub};
use std::str::FromStr;

use ember_primitives::{strip_hex_prefix, Address, H256};
use primitive_types::{U256, U512};

use crate::error::{EvmError, EvmResult};

/// 256-bit unsigned machine word
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Word(U256);

impl Word {
    /// Size in bytes
    pub const BYTES: usize = 32;

    /// Zero
    pub const ZERO: Word = Word(U256([0, 0, 0, 0]));

    /// One
    pub const ONE: Word = Word(U256([1, 0, 0, 0]));

    /// 2^256 - 1
    pub const MAX: Word = Word(U256::MAX);

    /// Wrap a raw `U256`
    pub const fn from_u256(value: U256) -> Self {
        Word(value)
    }

    /// Borrow the raw `U256`
    pub fn as_u256(&self) -> &U256 {
        &self.0
    }

    /// Build from 32 big-endian bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Word(U256::from_big_endian(&bytes))
    }

    /// Build from at most 32 big-endian bytes, left-padding with zeros.
    pub fn from_be_slice(slice: &[u8]) -> EvmResult<Self> {
        if slice.len() > Self::BYTES {
            return Err(EvmError::OutOfRange(format!(
                "{} bytes do not fit in a word",
                slice.len()
            )));
        }
        Ok(Word(U256::from_big_endian(slice)))
    }

    /// Big-endian bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.0.to_big_endian(&mut bytes);
        bytes
    }

    /// Low 160 bits as an address
    pub fn to_address(&self) -> Address {
        Address::from_word_bytes(&self.to_bytes())
    }

    /// Reinterpret as a 32-byte hash
    pub fn to_h256(&self) -> H256 {
        H256::from_bytes(self.to_bytes())
    }

    /// Value as `u64` if it fits
    pub fn to_u64(&self) -> Option<u64> {
        if self.0.bits() > 64 {
            None
        } else {
            Some(self.0.low_u64())
        }
    }

    /// Value as `usize` if it fits
    pub fn to_usize(&self) -> Option<usize> {
        self.to_u64().and_then(|v| usize::try_from(v).ok())
    }

    /// Number of significant bytes (0 for zero)
    pub fn byte_len(&self) -> usize {
        self.0.bits().div_ceil(8)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Sign bit set (negative under two's complement)
    pub fn is_negative(&self) -> bool {
        self.0.bit(255)
    }

    // ==================== String forms ====================

    /// Parse hex digits, `0x` prefix optional, any case.
    pub fn from_hex(s: &str) -> EvmResult<Self> {
        let digits = strip_hex_prefix(s);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EvmError::InvalidHex(s.to_string()));
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > 64 {
            return Err(EvmError::OutOfRange(s.to_string()));
        }
        if significant.is_empty() {
            return Ok(Word::ZERO);
        }
        U256::from_str_radix(significant, 16)
            .map(Word)
            .map_err(|_| EvmError::InvalidHex(s.to_string()))
    }

    /// Parse a decimal string.
    pub fn from_dec_str(s: &str) -> EvmResult<Self> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(EvmError::OutOfRange(s.to_string()));
        }
        U256::from_dec_str(s)
            .map(Word)
            .map_err(|_| EvmError::OutOfRange(s.to_string()))
    }

    /// 64 lowercase hex digits, no prefix
    pub fn to_hex_string(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// 256 binary digits, most significant first
    pub fn to_binary_string(&self) -> String {
        self.to_bytes().iter().map(|b| format!("{:08b}", b)).collect()
    }

    // ==================== Signed view ====================

    /// Build from a signed value in [-2^255, 2^256 - 1].
    pub fn from_signed(value: I256) -> EvmResult<Self> {
        if !value.negative {
            return Ok(Word(value.magnitude));
        }
        if value.magnitude > I256::MIN_MAGNITUDE {
            return Err(EvmError::OutOfRange(value.to_string()));
        }
        Ok(Word(twos_complement(value.magnitude)))
    }

    /// Two's complement reading of the word
    pub fn to_signed(&self) -> I256 {
        if self.is_negative() {
            I256::new(true, twos_complement(self.0))
        } else {
            I256::new(false, self.0)
        }
    }

    // ==================== Arithmetic ====================

    /// Signed division, truncating toward zero. `MIN / -1 == MIN`.
    pub fn sdiv(self, rhs: Word) -> Word {
        if rhs.is_zero() {
            return Word::ZERO;
        }
        let (a_neg, abs_a) = self.sign_and_abs();
        let (b_neg, abs_b) = rhs.sign_and_abs();
        let quotient = abs_a / abs_b;
        if a_neg != b_neg {
            Word(twos_complement(quotient))
        } else {
            Word(quotient)
        }
    }

    /// Signed remainder; the result takes the sign of the dividend.
    pub fn smod(self, rhs: Word) -> Word {
        if rhs.is_zero() {
            return Word::ZERO;
        }
        let (a_neg, abs_a) = self.sign_and_abs();
        let (_, abs_b) = rhs.sign_and_abs();
        let remainder = abs_a % abs_b;
        if a_neg {
            Word(twos_complement(remainder))
        } else {
            Word(remainder)
        }
    }

    /// `(self + rhs) % modulus` without intermediate overflow.
    pub fn addmod(self, rhs: Word, modulus: Word) -> Word {
        if modulus.is_zero() {
            return Word::ZERO;
        }
        let sum = U512::from(self.0) + U512::from(rhs.0);
        Word(low_u256(sum % U512::from(modulus.0)))
    }

    /// `(self * rhs) % modulus` without intermediate overflow.
    pub fn mulmod(self, rhs: Word, modulus: Word) -> Word {
        if modulus.is_zero() {
            return Word::ZERO;
        }
        let product = self.0.full_mul(rhs.0);
        Word(low_u256(product % U512::from(modulus.0)))
    }

    /// `self ^ exponent` modulo 2^256
    pub fn exp(self, exponent: Word) -> Word {
        let mut base = self.0;
        let mut e = exponent.0;
        let mut result = U256::one();
        while !e.is_zero() {
            if e.bit(0) {
                result = result.overflowing_mul(base).0;
            }
            base = base.overflowing_mul(base).0;
            e = e >> 1usize;
        }
        Word(result)
    }

    /// Sign-extend from byte `byte_index` (0 = least significant byte).
    pub fn sign_extend(self, byte_index: Word) -> Word {
        if byte_index >= Word::from(31u64) {
            return self;
        }
        let sign_bit = byte_index.0.low_u64() as usize * 8 + 7;
        let low_mask = (U256::one() << sign_bit) - U256::one();
        if self.0.bit(sign_bit) {
            Word(self.0 | !low_mask)
        } else {
            Word(self.0 & low_mask)
        }
    }

    /// Byte at `index`, 0 being the most significant. Indices past 31 give 0.
    pub fn byte(self, index: Word) -> Word {
        match index.to_usize() {
            Some(i) if i < Self::BYTES => Word::from(self.to_bytes()[i] as u64),
            _ => Word::ZERO,
        }
    }

    /// Arithmetic shift right, filling with the sign bit.
    pub fn sar(self, shift: Word) -> Word {
        let negative = self.is_negative();
        let amount = match shift.to_usize() {
            Some(n) if n < 256 => n,
            _ => return if negative { Word::MAX } else { Word::ZERO },
        };
        let shifted = self.0 >> amount;
        if negative && amount > 0 {
            Word(shifted | (U256::MAX << (256 - amount)))
        } else {
            Word(shifted)
        }
    }

    // ==================== Comparison ====================

    /// Signed less-than
    pub fn slt(&self, rhs: &Word) -> bool {
        self.signed_cmp(rhs) == Ordering::Less
    }

    /// Signed greater-than
    pub fn sgt(&self, rhs: &Word) -> bool {
        self.signed_cmp(rhs) == Ordering::Greater
    }

    fn signed_cmp(&self, rhs: &Word) -> Ordering {
        match (self.is_negative(), rhs.is_negative()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.0.cmp(&rhs.0),
        }
    }

    fn sign_and_abs(&self) -> (bool, U256) {
        if self.is_negative() {
            (true, twos_complement(self.0))
        } else {
            (false, self.0)
        }
    }
}

fn twos_complement(v: U256) -> U256 {
    (!v).overflowing_add(U256::one()).0
}

fn low_u256(v: U512) -> U256 {
    let mut bytes = [0u8; 64];
    v.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

// ==================== Operators ====================

impl Add for Word {
    type Output = Word;

    fn add(self, rhs: Word) -> Word {
        Word(self.0.overflowing_add(rhs.0).0)
    }
}

impl Sub for Word {
    type Output = Word;

    fn sub(self, rhs: Word) -> Word {
        Word(self.0.overflowing_sub(rhs.0).0)
    }
}

impl Mul for Word {
    type Output = Word;

    fn mul(self, rhs: Word) -> Word {
        Word(self.0.overflowing_mul(rhs.0).0)
    }
}

impl Div for Word {
    type Output = Word;

    fn div(self, rhs: Word) -> Word {
        if rhs.is_zero() {
            Word::ZERO
        } else {
            Word(self.0 / rhs.0)
        }
    }
}

impl Rem for Word {
    type Output = Word;

    fn rem(self, rhs: Word) -> Word {
        if rhs.is_zero() {
            Word::ZERO
        } else {
            Word(self.0 % rhs.0)
        }
    }
}

impl BitAnd for Word {
    type Output = Word;

    fn bitand(self, rhs: Word) -> Word {
        Word(self.0 & rhs.0)
    }
}

impl BitOr for Word {
    type Output = Word;

    fn bitor(self, rhs: Word) -> Word {
        Word(self.0 | rhs.0)
    }
}

impl BitXor for Word {
    type Output = Word;

    fn bitxor(self, rhs: Word) -> Word {
        Word(self.0 ^ rhs.0)
    }
}

impl Not for Word {
    type Output = Word;

    fn not(self) -> Word {
        Word(!self.0)
    }
}

/// Logical shift left; shifts of 256 or more give zero.
impl Shl<Word> for Word {
    type Output = Word;

    fn shl(self, shift: Word) -> Word {
        match shift.to_usize() {
            Some(n) if n < 256 => Word(self.0 << n),
            _ => Word::ZERO,
        }
    }
}

/// Logical shift right; shifts of 256 or more give zero.
impl Shr<Word> for Word {
    type Output = Word;

    fn shr(self, shift: Word) -> Word {
        match shift.to_usize() {
            Some(n) if n < 256 => Word(self.0 >> n),
            _ => Word::ZERO,
        }
    }
}

// ==================== Conversions ====================

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Word(U256::from(value))
    }
}

impl From<u128> for Word {
    fn from(value: u128) -> Self {
        Word(U256::from(value))
    }
}

impl From<usize> for Word {
    fn from(value: usize) -> Self {
        Word(U256::from(value))
    }
}

impl From<bool> for Word {
    fn from(value: bool) -> Self {
        if value {
            Word::ONE
        } else {
            Word::ZERO
        }
    }
}

impl From<U256> for Word {
    fn from(value: U256) -> Self {
        Word(value)
    }
}

impl From<[u8; 32]> for Word {
    fn from(bytes: [u8; 32]) -> Self {
        Word::from_bytes(bytes)
    }
}

impl From<Address> for Word {
    fn from(address: Address) -> Self {
        Word::from_bytes(address.to_word_bytes())
    }
}

impl From<H256> for Word {
    fn from(hash: H256) -> Self {
        Word::from_bytes(*hash.as_bytes())
    }
}

/// Accepts `0x`-prefixed hex or plain decimal.
impl FromStr for Word {
    type Err = EvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            Word::from_hex(s)
        } else {
            Word::from_dec_str(s)
        }
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0x{:x})", self.0)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::LowerHex for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

// ==================== Signed integer ====================

/// Signed integer in [-2^255, 2^256 - 1], the domain accepted by
/// [`Word::from_signed`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct I256 {
    negative: bool,
    magnitude: U256,
}

impl I256 {
    /// Magnitude of the most negative representable word, 2^255
    pub const MIN_MAGNITUDE: U256 = U256([0, 0, 0, 0x8000_0000_0000_0000]);

    /// Build from sign and magnitude. Negative zero is normalized to zero.
    pub fn new(negative: bool, magnitude: U256) -> Self {
        I256 {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        }
    }

    /// -2^255
    pub fn min_value() -> Self {
        I256::new(true, Self::MIN_MAGNITUDE)
    }

    /// Check if negative
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Absolute value
    pub fn magnitude(&self) -> U256 {
        self.magnitude
    }
}

impl From<i64> for I256 {
    fn from(value: i64) -> Self {
        I256::new(value < 0, U256::from(value.unsigned_abs()))
    }
}

impl From<i128> for I256 {
    fn from(value: i128) -> Self {
        I256::new(value < 0, U256::from(value.unsigned_abs()))
    }
}

impl Ord for I256 {
    fn cmp(&self, other: &I256) -> Ordering {
        match (self.negative, other.negative) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => self.magnitude.cmp(&other.magnitude).reverse(),
            (false, false) => self.magnitude.cmp(&other.magnitude),
        }
    }
}

impl PartialOrd for I256 {
    fn partial_cmp(&self, other: &I256) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for I256 {
    type Err = EvmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let magnitude: Word = digits.parse()?;
        Ok(I256::new(negative, magnitude.0))
    }
}

impl fmt::Display for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn w(v: u64) -> Word {
        Word::from(v)
    }

    fn signed(v: i64) -> Word {
        Word::from_signed(I256::from(v)).unwrap()
    }

    fn min_signed() -> Word {
        Word::from_signed(I256::min_value()).unwrap()
    }

    // ==================== Unsigned arithmetic ====================

    #[test]
    fn test_add_wraps() {
        assert_eq!(Word::MAX + w(1), Word::ZERO);
        assert_eq!(w(2) + w(3), w(5));
    }

    #[test]
    fn test_sub_wraps() {
        assert_eq!(w(0) - w(1), Word::MAX);
        assert_eq!(w(10) - w(3), w(7));
    }

    #[test]
    fn test_mul_wraps() {
        let half = Word::ONE << w(255);
        assert_eq!(half * w(2), Word::ZERO);
        assert_eq!(w(6) * w(7), w(42));
    }

    #[test]
    fn test_div_and_mod_by_zero() {
        assert_eq!(w(10) / w(0), Word::ZERO);
        assert_eq!(w(10) % w(0), Word::ZERO);
        assert_eq!(w(10) / w(3), w(3));
        assert_eq!(w(10) % w(3), w(1));
    }

    #[test]
    fn test_addmod() {
        assert_eq!(w(10).addmod(w(10), w(8)), w(4));
        assert_eq!(w(10).addmod(w(10), w(0)), Word::ZERO);
        // MAX + MAX = 2^257 - 2; mod MAX = MAX - 1 + ... = 0
        assert_eq!(Word::MAX.addmod(Word::MAX, Word::MAX), Word::ZERO);
        // (MAX + 2) mod MAX = 2
        assert_eq!(Word::MAX.addmod(w(2), Word::MAX), w(2));
    }

    #[test]
    fn test_addmod_large_modulus() {
        // 2^255 + 2^255 = 2^256 overflows; modulus above 2^255
        let half = Word::ONE << w(255);
        let modulus = half + w(1);
        assert_eq!(half.addmod(half, modulus), half - w(1));
    }

    #[test]
    fn test_mulmod() {
        assert_eq!(w(10).mulmod(w(10), w(8)), w(4));
        assert_eq!(w(10).mulmod(w(10), w(0)), Word::ZERO);
        // (2^256 - 1)^2 mod 12
        // 2^256 ≡ 4 (mod 12), so MAX ≡ 3 and MAX^2 ≡ 9
        assert_eq!(Word::MAX.mulmod(Word::MAX, w(12)), w(9));
    }

    #[test]
    fn test_exp() {
        assert_eq!(w(2).exp(w(10)), w(1024));
        assert_eq!(w(0).exp(w(0)), w(1));
        assert_eq!(w(2).exp(w(256)), Word::ZERO);
        assert_eq!(w(3).exp(w(1)), w(3));
    }

    // ==================== Signed arithmetic ====================

    #[test]
    fn test_sdiv() {
        assert_eq!(signed(-10).sdiv(signed(2)), signed(-5));
        assert_eq!(signed(-10).sdiv(signed(-2)), signed(5));
        assert_eq!(signed(10).sdiv(signed(-3)), signed(-3));
        assert_eq!(signed(10).sdiv(Word::ZERO), Word::ZERO);
    }

    #[test]
    fn test_sdiv_min_by_minus_one() {
        let result = min_signed().sdiv(signed(-1));
        assert_eq!(result, min_signed());
        assert_eq!(result.to_signed(), I256::min_value());
    }

    #[test]
    fn test_smod_takes_dividend_sign() {
        assert_eq!(signed(-10).smod(signed(3)), signed(-1));
        assert_eq!(signed(10).smod(signed(-3)), signed(1));
        assert_eq!(signed(-10).smod(Word::ZERO), Word::ZERO);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(w(0xff).sign_extend(w(0)), Word::MAX);
        assert_eq!(w(0x7f).sign_extend(w(0)), w(0x7f));
        assert_eq!(w(0x1ff).sign_extend(w(0)), Word::MAX);
        assert_eq!(w(0x80ff).sign_extend(w(0)), Word::MAX);
        assert_eq!(w(0x8000).sign_extend(w(1)), signed(-0x8000));
        assert_eq!(w(0xff).sign_extend(w(31)), w(0xff));
        assert_eq!(Word::MAX.sign_extend(Word::MAX), Word::MAX);
    }

    #[test]
    fn test_slt_sgt() {
        assert!(signed(-1).slt(&w(0)));
        assert!(w(0).sgt(&signed(-1)));
        assert!(w(1).sgt(&w(0)));
        assert!(!w(1).slt(&w(1)));
        assert!(min_signed().slt(&signed(-1)));
    }

    // ==================== Bitwise ====================

    #[test]
    fn test_byte() {
        let value = Word::from_hex("0x0102030405").unwrap();
        assert_eq!(value.byte(w(31)), w(0x05));
        assert_eq!(value.byte(w(27)), w(0x01));
        assert_eq!(value.byte(w(0)), Word::ZERO);
        assert_eq!(Word::MAX.byte(w(32)), Word::ZERO);
        assert_eq!(Word::MAX.byte(Word::MAX), Word::ZERO);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(w(1) << w(4), w(16));
        assert_eq!(w(16) >> w(4), w(1));
        assert_eq!(Word::MAX << w(256), Word::ZERO);
        assert_eq!(Word::MAX >> w(256), Word::ZERO);
        assert_eq!(w(1) << Word::MAX, Word::ZERO);
        assert_eq!(w(1) << w(255), min_signed());
    }

    #[test]
    fn test_sar() {
        assert_eq!(signed(-16).sar(w(4)), signed(-1));
        assert_eq!(w(16).sar(w(4)), w(1));
        assert_eq!(signed(-1).sar(w(256)), Word::MAX);
        assert_eq!(w(16).sar(w(256)), Word::ZERO);
        assert_eq!(signed(-16).sar(w(0)), signed(-16));
        assert_eq!(min_signed().sar(w(255)), Word::MAX);
    }

    #[test]
    fn test_not_and_or_xor() {
        assert_eq!(!Word::ZERO, Word::MAX);
        assert_eq!(w(0b1100) & w(0b1010), w(0b1000));
        assert_eq!(w(0b1100) | w(0b1010), w(0b1110));
        assert_eq!(w(0b1100) ^ w(0b1010), w(0b0110));
    }

    // ==================== Construction and rendering ====================

    #[test]
    fn test_from_hex() {
        assert_eq!(Word::from_hex("0xff").unwrap(), w(255));
        assert_eq!(Word::from_hex("FF").unwrap(), w(255));
        assert_eq!(Word::from_hex("0X00ff").unwrap(), w(255));
        assert_eq!(Word::from_hex(&"f".repeat(64)).unwrap(), Word::MAX);
        assert_eq!(Word::from_hex(&format!("0000{}", "f".repeat(64))).unwrap(), Word::MAX);
    }

    #[test]
    fn test_from_hex_errors() {
        assert!(matches!(Word::from_hex("0x"), Err(EvmError::InvalidHex(_))));
        assert!(matches!(Word::from_hex("0xzz"), Err(EvmError::InvalidHex(_))));
        assert!(matches!(
            Word::from_hex(&format!("1{}", "0".repeat(64))),
            Err(EvmError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_from_dec_str() {
        assert_eq!("1000".parse::<Word>().unwrap(), w(1000));
        assert_eq!("0x10".parse::<Word>().unwrap(), w(16));
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(max.parse::<Word>().unwrap(), Word::MAX);
        let over = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(matches!(over.parse::<Word>(), Err(EvmError::OutOfRange(_))));
        assert!("-1".parse::<Word>().is_err());
    }

    #[test]
    fn test_to_hex_string_is_padded() {
        let s = w(1).to_hex_string();
        assert_eq!(s.len(), 64);
        assert!(s.ends_with("01"));
        assert!(s.starts_with("00"));
    }

    #[test]
    fn test_to_binary_string() {
        let s = w(5).to_binary_string();
        assert_eq!(s.len(), 256);
        assert!(s.ends_with("101"));
        assert_eq!(s.matches('1').count(), 2);
    }

    #[test]
    fn test_from_signed_domain() {
        assert_eq!(signed(-1), Word::MAX);
        assert_eq!(Word::from_signed(I256::new(false, U256::MAX)).unwrap(), Word::MAX);
        let too_small = I256::new(true, I256::MIN_MAGNITUDE + U256::one());
        assert!(matches!(Word::from_signed(too_small), Err(EvmError::OutOfRange(_))));
    }

    #[test]
    fn test_signed_parse_and_display() {
        let v: I256 = "-42".parse().unwrap();
        assert_eq!(v, I256::from(-42i64));
        assert_eq!(v.to_string(), "-42");
        assert_eq!(Word::from_signed(v).unwrap().to_signed(), v);
        let zero: I256 = "-0".parse().unwrap();
        assert!(!zero.is_negative());
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(Word::ZERO.byte_len(), 0);
        assert_eq!(w(0xff).byte_len(), 1);
        assert_eq!(w(0x100).byte_len(), 2);
        assert_eq!(Word::MAX.byte_len(), 32);
    }

    #[test]
    fn test_address_conversion() {
        let addr = Address::from_low_u8(0xaa);
        let word = Word::from(addr);
        assert_eq!(word, w(0xaa));
        assert_eq!((word | (Word::ONE << w(200))).to_address(), addr);
    }

    #[test]
    fn test_h256_conversion() {
        let word = w(0x1234);
        let hash = word.to_h256();
        assert_eq!(hash.as_bytes()[30..], [0x12, 0x34]);
        assert_eq!(Word::from(hash), word);
    }

    #[test]
    fn test_from_be_slice() {
        assert_eq!(Word::from_be_slice(&[0x01, 0x00]).unwrap(), w(256));
        assert!(Word::from_be_slice(&[0u8; 33]).is_err());
    }

    // ==================== Properties ====================

    fn any_word() -> impl Strategy<Value = Word> {
        any::<[u8; 32]>().prop_map(Word::from_bytes)
    }

    proptest! {
        #[test]
        fn prop_add_commutes(a in any_word(), b in any_word()) {
            prop_assert_eq!(a + b, b + a);
        }

        #[test]
        fn prop_sub_inverts_add(a in any_word(), b in any_word()) {
            prop_assert_eq!((a + b) - b, a);
        }

        #[test]
        fn prop_zero_divisor(a in any_word()) {
            prop_assert_eq!(a / Word::ZERO, Word::ZERO);
            prop_assert_eq!(a % Word::ZERO, Word::ZERO);
        }

        #[test]
        fn prop_hex_round_trip(a in any_word()) {
            prop_assert_eq!(Word::from_hex(&a.to_hex_string()).unwrap(), a);
        }

        #[test]
        fn prop_signed_round_trip(a in any_word()) {
            prop_assert_eq!(Word::from_signed(a.to_signed()).unwrap(), a);
        }

        #[test]
        fn prop_sdiv_matches_i64(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(b != 0 && !(a == i64::MIN && b == -1));
            prop_assert_eq!(signed(a).sdiv(signed(b)), signed(a / b));
            prop_assert_eq!(signed(a).smod(signed(b)), signed(a % b));
        }

        #[test]
        fn prop_mulmod_matches_u128(a in any::<u64>(), b in any::<u64>(), n in 1u64..) {
            let expected = (a as u128 * b as u128) % n as u128;
            prop_assert_eq!(w(a).mulmod(w(b), w(n)), Word::from(expected));
        }
    }
}
