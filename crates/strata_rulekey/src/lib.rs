//! Rule keys: deterministic fingerprints of a build rule's inputs.
//!
//! A [`RuleKey`] is computed by feeding an ordered sequence of tagged inputs
//! into a SHA-256 accumulator through a [`RuleKeyBuilder`]. The same sequence
//! over the same file contents always yields the same key, on any machine,
//! which is what makes fetching another machine's build output sound.

#![warn(missing_docs)]

pub mod builder;
pub mod error;
pub mod key;

pub use builder::RuleKeyBuilder;
pub use error::RuleKeyError;
pub use key::RuleKey;
