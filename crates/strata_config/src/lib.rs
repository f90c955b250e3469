//! Parsing and validation of `strata.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`], plus a [`ResolvedCache`] with paths made absolute and
//! durations converted.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    find_project_root, load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME,
};
pub use resolve::{resolve_cache, ResolvedCache};
pub use types::*;
