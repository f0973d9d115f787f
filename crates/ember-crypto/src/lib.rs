//! # ember-crypto
//!
//! Keccak-256, the only hash the interpreter needs (SHA3 and EXTCODEHASH).

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::{keccak256, KECCAK_EMPTY};
