//! Configuration types deserialized from `strata.toml`.

use serde::Deserialize;

/// The top-level project configuration parsed from `strata.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    pub project: ProjectMeta,
    /// File hashing settings.
    #[serde(default)]
    pub hashing: HashingConfig,
    /// Artifact cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Core project metadata required in every `strata.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
}

/// How file hashes are computed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashingConfig {
    /// How a directory's hash accounts for its subdirectories.
    #[serde(default)]
    pub directories: DirectoryMode,
}

/// Directory hashing mode.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryMode {
    /// Subdirectories contribute their full content hash (default).
    #[default]
    Recursive,
    /// Subdirectories contribute only their name and kind.
    Shallow,
}

/// Artifact cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Which store backs the artifact cache.
    #[serde(default)]
    pub mode: CacheMode,
    /// Cache directory for [`CacheMode::Dir`], relative to the project root
    /// unless absolute.
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    /// Upper bound on a single fetch or store, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// zlib compression level for stored artifacts (0..=9).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    /// Fetch only; never store.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::default(),
            dir: default_cache_dir(),
            timeout_ms: default_timeout_ms(),
            compression_level: default_compression_level(),
            read_only: false,
        }
    }
}

fn default_cache_dir() -> String {
    ".strata-cache".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_compression_level() -> u32 {
    6
}

/// Artifact cache backend.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Artifacts live in a local directory (default).
    #[default]
    Dir,
    /// Artifacts live in process memory for the duration of one command.
    Memory,
    /// Caching is disabled: every fetch is ignored and nothing is stored.
    None,
}
