//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{CacheMode, ProjectConfig};
use std::path::{Path, PathBuf};

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Loads and validates the `strata.toml` of a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `strata.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Walks up from `start` to the nearest directory containing `strata.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name"));
    }
    let cache = &config.cache;
    if cache.mode == CacheMode::Dir && cache.dir.is_empty() {
        return Err(ConfigError::MissingField("cache.dir"));
    }
    if cache.compression_level > 9 {
        return Err(ConfigError::InvalidValue {
            field: "cache.compression_level",
            reason: format!("must be 0..=9, got {}", cache.compression_level),
        });
    }
    if cache.timeout_ms == 0 {
        return Err(ConfigError::InvalidValue {
            field: "cache.timeout_ms",
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}
