//! Shared foundational types used across the Strata build cache.
//!
//! This crate provides the two digest types the rest of the workspace is built
//! on: [`HashCode`], the SHA-256 digest used for file hashes and rule keys, and
//! [`ContentHash`], the fast XXH3 checksum used to validate stored artifacts.

#![warn(missing_docs)]

pub mod digest;
pub mod hash;

pub use digest::{HashCode, HashCodeHasher, ParseHashCodeError};
pub use hash::ContentHash;
