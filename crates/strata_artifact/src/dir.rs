//! A directory-backed artifact store.
//!
//! Each artifact lives at `<dir>/<first two hex chars>/<rule key>.artifact`
//! and starts with a header carrying magic bytes, a format version, the rule
//! key it was stored under, and a checksum of the payload. Entries that fail
//! any of those checks are reported as corrupt rather than served.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_common::ContentHash;
use strata_rulekey::RuleKey;

use crate::error::TransportError;
use crate::transport::ArtifactTransport;

/// Magic bytes identifying a Strata artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"STRA";

/// Current artifact format version. Increment on breaking changes to
/// the header or payload format.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// File extension of stored artifacts.
const ARTIFACT_EXT: &str = "artifact";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Header prepended to every stored artifact for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"STRA"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// Version of the tool that produced this artifact.
    pub producer_version: String,

    /// The rule key the artifact was stored under.
    pub rule_key: RuleKey,

    /// Checksum of the payload.
    pub checksum: ContentHash,
}

/// Serializes `header` and `payload` into the on-disk layout:
/// 4-byte little-endian header length, header, payload.
fn encode_entry(header: &ArtifactHeader, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    let header_bytes = bincode::serde::encode_to_vec(header, bincode::config::standard())
        .map_err(|e| TransportError::Serialization {
            reason: e.to_string(),
        })?;
    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(payload);
    Ok(output)
}

/// Stores artifacts as files under a cache directory.
#[derive(Debug, Clone)]
pub struct DirArtifactCache {
    dir: PathBuf,
    producer_version: String,
}

impl DirArtifactCache {
    /// Creates a store rooted at `dir`. The directory is created on first store.
    pub fn new(dir: &Path, producer_version: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            producer_version: producer_version.to_string(),
        }
    }

    /// The root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path for the artifact stored under `key`.
    pub fn entry_path(&self, key: &RuleKey) -> PathBuf {
        let hex = key.to_string();
        self.dir
            .join(&hex[..2])
            .join(format!("{hex}.{ARTIFACT_EXT}"))
    }

    /// Reads and validates the artifact for `key`. `Ok(None)` if absent.
    pub fn read_entry(&self, key: &RuleKey) -> Result<Option<Vec<u8>>, TransportError> {
        let path = self.entry_path(key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TransportError::Io { path, source: e }),
        };
        let corrupt = |reason: &str| TransportError::Corrupt {
            key: *key,
            reason: reason.to_string(),
        };

        if raw.len() < 4 {
            return Err(corrupt("truncated header length"));
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&raw[..4]);
        let header_len = u32::from_le_bytes(len_bytes) as usize;
        if raw.len() < 4 + header_len {
            return Err(corrupt("truncated header"));
        }

        let header: ArtifactHeader = bincode::serde::decode_from_slice(
            &raw[4..4 + header_len],
            bincode::config::standard(),
        )
        .map_err(|e| corrupt(&format!("undecodable header: {e}")))?
        .0;

        if header.magic != ARTIFACT_MAGIC {
            return Err(corrupt("bad magic bytes"));
        }
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(corrupt(&format!(
                "format version {} (expected {ARTIFACT_FORMAT_VERSION})",
                header.format_version
            )));
        }
        if header.rule_key != *key {
            return Err(corrupt(&format!("entry belongs to {}", header.rule_key)));
        }

        let payload = &raw[4 + header_len..];
        let actual = ContentHash::from_bytes(payload);
        if actual != header.checksum {
            return Err(corrupt(&format!(
                "checksum mismatch: expected {}, got {actual}",
                header.checksum
            )));
        }
        Ok(Some(payload.to_vec()))
    }

    /// Writes the artifact for `key`, replacing any existing entry atomically.
    pub fn write_entry(&self, key: &RuleKey, payload: &[u8]) -> Result<(), TransportError> {
        let path = self.entry_path(key);
        let parent = path.parent().unwrap_or(self.dir.as_path());
        std::fs::create_dir_all(parent).map_err(|e| TransportError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;

        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            producer_version: self.producer_version.clone(),
            rule_key: *key,
            checksum: ContentHash::from_bytes(payload),
        };
        let output = encode_entry(&header, payload)?;

        let temp = path.with_extension(format!(
            "{ARTIFACT_EXT}.tmp-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&temp, &output).map_err(|e| TransportError::Io {
            path: temp.clone(),
            source: e,
        })?;
        std::fs::rename(&temp, &path).map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            TransportError::Io { path, source: e }
        })
    }
}

#[async_trait]
impl ArtifactTransport for DirArtifactCache {
    fn name(&self) -> &str {
        "dir"
    }

    async fn fetch(&self, key: &RuleKey) -> Result<Option<Vec<u8>>, TransportError> {
        let store = self.clone();
        let key = *key;
        tokio::task::spawn_blocking(move || store.read_entry(&key))
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?
    }

    async fn store(&self, keys: &BTreeSet<RuleKey>, payload: &[u8]) -> Result<(), TransportError> {
        let store = self.clone();
        let keys = keys.clone();
        let payload = payload.to_vec();
        tokio::task::spawn_blocking(move || {
            keys.iter()
                .try_for_each(|key| store.write_entry(key, &payload))
        })
        .await
        .map_err(|e| TransportError::Unavailable(e.to_string()))?
    }
}
