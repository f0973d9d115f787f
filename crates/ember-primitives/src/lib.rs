//! # ember-primitives
//!
//! Fixed-size byte types shared by the Ember crates: 20-byte account
//! addresses and 32-byte hashes.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};

/// Block number type
pub type BlockNumber = u64;

/// Gas type
pub type Gas = u64;

/// Strip an optional `0x`/`0X` prefix from a hex string.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
