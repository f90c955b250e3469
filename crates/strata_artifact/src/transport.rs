//! The seam to the bytes-on-the-wire store.

use std::collections::BTreeSet;

use async_trait::async_trait;
use strata_rulekey::RuleKey;

use crate::error::TransportError;

/// Moves artifact payloads to and from a store.
///
/// Implementations only exchange bytes. Lifecycle events, timeouts,
/// cancellation and compression are layered on top by
/// [`ArtifactCacheClient`](crate::ArtifactCacheClient).
#[async_trait]
pub trait ArtifactTransport: Send + Sync {
    /// Short name reported as the source of hits and errors, e.g. `dir`.
    fn name(&self) -> &str;

    /// Looks up the payload stored under `key`. `Ok(None)` is a miss.
    async fn fetch(&self, key: &RuleKey) -> Result<Option<Vec<u8>>, TransportError>;

    /// Stores `payload` under every key in `keys`.
    async fn store(&self, keys: &BTreeSet<RuleKey>, payload: &[u8]) -> Result<(), TransportError>;
}
