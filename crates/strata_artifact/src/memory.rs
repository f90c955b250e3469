//! A process-local artifact store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use strata_rulekey::RuleKey;

use crate::error::TransportError;
use crate::transport::ArtifactTransport;

/// Keeps artifacts in a map. Payloads stored under several keys share one
/// allocation.
#[derive(Debug, Default)]
pub struct InMemoryArtifactCache {
    entries: Mutex<HashMap<RuleKey, Arc<Vec<u8>>>>,
}

impl InMemoryArtifactCache {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a stored payload.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArtifactTransport for InMemoryArtifactCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, key: &RuleKey) -> Result<Option<Vec<u8>>, TransportError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).map(|payload| payload.as_ref().clone()))
    }

    async fn store(&self, keys: &BTreeSet<RuleKey>, payload: &[u8]) -> Result<(), TransportError> {
        let payload = Arc::new(payload.to_vec());
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.insert(*key, Arc::clone(&payload));
        }
        Ok(())
    }
}
