//! Errors raised while reading a project configuration.

use std::path::PathBuf;

/// Why a `strata.toml` could not be turned into a [`ProjectConfig`](crate::ProjectConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {}", path.display())]
    Read {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected shape.
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required key is absent or empty.
    #[error("`{0}` must be set")]
    MissingField(&'static str),

    /// A key holds a value outside its accepted range.
    #[error("`{field}` {reason}")]
    InvalidValue {
        /// Dotted key of the offending value.
        field: &'static str,
        /// What the accepted values are.
        reason: String,
    },
}

impl ConfigError {
    /// The dotted key this error is about, if it concerns a single key.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ConfigError::MissingField(field) | ConfigError::InvalidValue { field, .. } => {
                Some(*field)
            }
            ConfigError::Read { .. } | ConfigError::Parse(_) => None,
        }
    }
}
