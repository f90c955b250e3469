//! The artifact cache client.
//!
//! [`ArtifactCacheClient`] drives a transport through the event protocol:
//! every FETCH, STORE, COMPRESS and DECOMPRESS it performs is bracketed by a
//! Started/Finished pair. Transport failures, timeouts and cancellation are
//! folded into [`CacheResult`] or [`StoreOutcome`] values here. Only protocol
//! violations escape as errors.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use strata_rulekey::RuleKey;
use tokio::sync::watch;

use crate::compression;
use crate::error::{ProtocolViolation, TransportError};
use crate::operation::Operation;
use crate::result::CacheResult;
use crate::tracker::ArtifactEventTracker;
use crate::transport::ArtifactTransport;

/// A cloneable handle used to abandon in-flight cache operations.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// Creates a signal that has not been cancelled.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Cancels every operation observing this signal or one of its clones.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves when the signal is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Tunables for [`ArtifactCacheClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Upper bound on a single transport fetch or store.
    pub timeout: Duration,
    /// zlib level used when storing (0..=9).
    pub compression_level: u32,
    /// Skip every STORE.
    pub read_only: bool,
    /// When `false`, FETCH reports [`CacheResult::Ignored`] without touching
    /// the transport and STORE is skipped.
    pub enabled: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            compression_level: 6,
            read_only: false,
            enabled: true,
        }
    }
}

/// What a FETCH produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// The classified result. May be an error even when the FETCH event
    /// recorded a hit, if the payload failed to decompress.
    pub result: CacheResult,
    /// The decompressed artifact, present only on a usable hit.
    pub payload: Option<Vec<u8>>,
}

/// What a STORE produced. Failures here never fail a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The artifact was written under every rule key.
    Stored,
    /// Caching is disabled or read-only.
    Skipped,
    /// Compression or the transport failed.
    Failed(String),
    /// The store was abandoned.
    ///
    /// A signal raised before the transport is polled guarantees nothing was
    /// written. Once a write has been handed to the transport it may still
    /// land after this is reported; [`DirArtifactCache`](crate::DirArtifactCache)
    /// publishes entries atomically, so such an entry is complete or absent.
    Cancelled,
}

/// Where the payload of [`ArtifactCacheClient::fetch_or_build`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSource {
    /// Served by the artifact cache.
    FromCache,
    /// Produced by the local build.
    Built,
}

/// The result of [`ArtifactCacheClient::fetch_or_build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// The artifact bytes.
    pub payload: Vec<u8>,
    /// Whether they were fetched or built.
    pub source: BuildSource,
    /// Outcome of the follow-up STORE, if the artifact was built.
    pub store: Option<StoreOutcome>,
}

/// Failure of [`ArtifactCacheClient::fetch_or_build`].
#[derive(Debug, thiserror::Error)]
pub enum CachedBuildError<E: std::error::Error + 'static> {
    /// The event protocol was misused.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// The local build failed.
    #[error("local build failed: {0}")]
    Build(#[source] E),
}

/// How a bounded transport call ended.
enum Attempt<T> {
    Done(Result<T, TransportError>),
    TimedOut,
    Cancelled,
}

/// Runs cache operations against a transport, publishing their events.
pub struct ArtifactCacheClient {
    transport: Arc<dyn ArtifactTransport>,
    tracker: Arc<ArtifactEventTracker>,
    settings: ClientSettings,
}

impl ArtifactCacheClient {
    /// Creates a client.
    pub fn new(
        transport: Arc<dyn ArtifactTransport>,
        tracker: Arc<ArtifactEventTracker>,
        settings: ClientSettings,
    ) -> Self {
        Self {
            transport,
            tracker,
            settings,
        }
    }

    /// The tracker events are published through.
    pub fn tracker(&self) -> &ArtifactEventTracker {
        &self.tracker
    }

    /// The client's settings.
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Looks up the artifact for `key`.
    ///
    /// A hit is followed by a DECOMPRESS operation; if decompression fails
    /// the returned outcome is an error while the published FETCH event
    /// still records the hit.
    pub async fn fetch(
        &self,
        key: &RuleKey,
        cancel: &CancellationSignal,
    ) -> Result<FetchOutcome, ProtocolViolation> {
        let pending = self.tracker.begin(Operation::Fetch, [*key]);
        if !self.settings.enabled {
            pending.finish_fetch(CacheResult::Ignored)?;
            return Ok(FetchOutcome {
                result: CacheResult::Ignored,
                payload: None,
            });
        }

        let source = self.transport.name().to_string();
        let (result, compressed) = match self.bounded(cancel, self.transport.fetch(key)).await {
            Attempt::Done(Ok(Some(bytes))) => (CacheResult::hit(&source), Some(bytes)),
            Attempt::Done(Ok(None)) => (CacheResult::Miss, None),
            Attempt::Done(Err(e)) => {
                tracing::warn!(rule_key = %key, cache = %source, error = %e, "artifact fetch failed");
                (CacheResult::error(&source, e.to_string()), None)
            }
            Attempt::TimedOut => {
                tracing::warn!(rule_key = %key, cache = %source, "artifact fetch timed out");
                (
                    CacheResult::error(&source, self.timeout_message()),
                    None,
                )
            }
            Attempt::Cancelled => (CacheResult::Cancelled, None),
        };
        pending.finish_fetch(result.clone())?;

        let Some(compressed) = compressed else {
            return Ok(FetchOutcome {
                result,
                payload: None,
            });
        };

        let decompress = self.tracker.begin(Operation::Decompress, [*key]);
        let decoded = compression::decompress(&compressed);
        decompress.finish()?;
        match decoded {
            Ok(payload) => {
                tracing::debug!(rule_key = %key, cache = %source, bytes = payload.len(), "artifact cache hit");
                Ok(FetchOutcome {
                    result,
                    payload: Some(payload),
                })
            }
            Err(e) => {
                tracing::warn!(rule_key = %key, cache = %source, error = %e, "discarding undecodable artifact");
                Ok(FetchOutcome {
                    result: CacheResult::error(&source, e.to_string()),
                    payload: None,
                })
            }
        }
    }

    /// Compresses `payload` and stores it under every key in `keys`.
    pub async fn store(
        &self,
        keys: &BTreeSet<RuleKey>,
        payload: &[u8],
        cancel: &CancellationSignal,
    ) -> Result<StoreOutcome, ProtocolViolation> {
        if !self.settings.enabled || self.settings.read_only {
            tracing::debug!(keys = keys.len(), "artifact store skipped");
            return Ok(StoreOutcome::Skipped);
        }

        let compress = self.tracker.begin(Operation::Compress, keys.iter().copied());
        let compressed = compression::compress(payload, self.settings.compression_level);
        compress.finish()?;
        let compressed = match compressed {
            Ok(compressed) => compressed,
            Err(e) => {
                tracing::warn!(error = %e, "artifact store failed");
                return Ok(StoreOutcome::Failed(e.to_string()));
            }
        };

        let pending = self.tracker.begin(Operation::Store, keys.iter().copied());
        let outcome = match self
            .bounded(cancel, self.transport.store(keys, &compressed))
            .await
        {
            Attempt::Done(Ok(())) => StoreOutcome::Stored,
            Attempt::Done(Err(e)) => {
                tracing::warn!(cache = %self.transport.name(), error = %e, "artifact store failed");
                StoreOutcome::Failed(e.to_string())
            }
            Attempt::TimedOut => {
                tracing::warn!(cache = %self.transport.name(), "artifact store timed out");
                StoreOutcome::Failed(self.timeout_message())
            }
            Attempt::Cancelled => StoreOutcome::Cancelled,
        };
        pending.finish()?;
        Ok(outcome)
    }

    /// Fetches the artifact for `key`, or builds it locally and stores it.
    ///
    /// Any non-hit (miss, error, ignored, cancelled) falls through to `build`.
    /// A failed store is reported in [`BuildOutput::store`], never as an error.
    pub async fn fetch_or_build<E, F>(
        &self,
        key: &RuleKey,
        cancel: &CancellationSignal,
        build: F,
    ) -> Result<BuildOutput, CachedBuildError<E>>
    where
        E: std::error::Error + 'static,
        F: FnOnce() -> Result<Vec<u8>, E>,
    {
        let fetched = self.fetch(key, cancel).await?;
        if let Some(payload) = fetched.payload {
            return Ok(BuildOutput {
                payload,
                source: BuildSource::FromCache,
                store: None,
            });
        }

        let payload = build().map_err(CachedBuildError::Build)?;
        let store = self
            .store(&BTreeSet::from([*key]), &payload, cancel)
            .await?;
        Ok(BuildOutput {
            payload,
            source: BuildSource::Built,
            store: Some(store),
        })
    }

    async fn bounded<T>(
        &self,
        cancel: &CancellationSignal,
        operation: impl Future<Output = Result<T, TransportError>>,
    ) -> Attempt<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Attempt::Cancelled,
            result = tokio::time::timeout(self.settings.timeout, operation) => match result {
                Ok(done) => Attempt::Done(done),
                Err(_) => Attempt::TimedOut,
            },
        }
    }

    fn timeout_message(&self) -> String {
        format!("timed out after {}ms", self.settings.timeout.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ArtifactCacheEvent;
    use crate::memory::InMemoryArtifactCache;
    use crate::sink::RecordingEventSink;
    use async_trait::async_trait;
    use strata_common::HashCode;

    fn key(seed: &[u8]) -> RuleKey {
        RuleKey::from_hash_code(HashCode::from_bytes(seed))
    }

    struct FailingTransport;

    #[async_trait]
    impl ArtifactTransport for FailingTransport {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, _key: &RuleKey) -> Result<Option<Vec<u8>>, TransportError> {
            Err(TransportError::Unavailable("connection refused".to_string()))
        }

        async fn store(&self, _keys: &BTreeSet<RuleKey>, _payload: &[u8]) -> Result<(), TransportError> {
            Err(TransportError::Unavailable("connection refused".to_string()))
        }
    }

    struct SlowTransport;

    #[async_trait]
    impl ArtifactTransport for SlowTransport {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, _key: &RuleKey) -> Result<Option<Vec<u8>>, TransportError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }

        async fn store(&self, _keys: &BTreeSet<RuleKey>, _payload: &[u8]) -> Result<(), TransportError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    struct GarbageTransport;

    #[async_trait]
    impl ArtifactTransport for GarbageTransport {
        fn name(&self) -> &str {
            "garbage"
        }

        async fn fetch(&self, _key: &RuleKey) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(Some(b"not a zlib stream".to_vec()))
        }

        async fn store(&self, _keys: &BTreeSet<RuleKey>, _payload: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn make_client(
        transport: Arc<dyn ArtifactTransport>,
        settings: ClientSettings,
    ) -> (Arc<RecordingEventSink>, ArtifactCacheClient) {
        let sink = Arc::new(RecordingEventSink::new());
        let tracker = Arc::new(ArtifactEventTracker::new(sink.clone()));
        (sink, ArtifactCacheClient::new(transport, tracker, settings))
    }

    fn fetch_results(events: &[ArtifactCacheEvent]) -> Vec<CacheResult> {
        events
            .iter()
            .filter_map(|event| match event {
                ArtifactCacheEvent::Finished(f) if f.operation() == Operation::Fetch => {
                    f.cache_result().cloned()
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn transport_error_becomes_error_result() {
        let (sink, client) = make_client(Arc::new(FailingTransport), ClientSettings::default());
        let outcome = client
            .fetch(&key(b"a"), &CancellationSignal::new())
            .await
            .unwrap();
        assert!(matches!(outcome.result, CacheResult::Error { .. }));
        assert!(outcome.payload.is_none());

        let results = fetch_results(&sink.events());
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_success());
    }

    #[tokio::test]
    async fn store_failure_is_reported_not_raised() {
        let (sink, client) = make_client(Arc::new(FailingTransport), ClientSettings::default());
        let outcome = client
            .store(&BTreeSet::from([key(b"a")]), b"data", &CancellationSignal::new())
            .await
            .unwrap();
        assert!(matches!(outcome, StoreOutcome::Failed(_)));
        // COMPRESS and STORE, each Started then Finished.
        assert_eq!(sink.events().len(), 4);
        assert_eq!(client.tracker().in_flight(), 0);
    }

    #[tokio::test]
    async fn fetch_timeout_becomes_error_result() {
        let settings = ClientSettings {
            timeout: Duration::from_millis(20),
            ..ClientSettings::default()
        };
        let (_sink, client) = make_client(Arc::new(SlowTransport), settings);
        let outcome = client
            .fetch(&key(b"a"), &CancellationSignal::new())
            .await
            .unwrap();
        match outcome.result {
            CacheResult::Error { source, message } => {
                assert_eq!(source, "slow");
                assert!(message.contains("timed out"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_before_fetch_still_finishes() {
        let (sink, client) = make_client(Arc::new(SlowTransport), ClientSettings::default());
        let cancel = CancellationSignal::new();
        cancel.cancel();
        let outcome = client.fetch(&key(b"a"), &cancel).await.unwrap();
        assert_eq!(outcome.result, CacheResult::Cancelled);
        assert_eq!(fetch_results(&sink.events()), vec![CacheResult::Cancelled]);
        assert_eq!(client.tracker().in_flight(), 0);
    }

    #[tokio::test]
    async fn cancelled_mid_flight_store() {
        let (_sink, client) = make_client(Arc::new(SlowTransport), ClientSettings::default());
        let cancel = CancellationSignal::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let outcome = client
            .store(&BTreeSet::from([key(b"a")]), b"data", &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, StoreOutcome::Cancelled);
        assert!(cancel.is_cancelled());
        assert_eq!(client.tracker().in_flight(), 0);
    }

    #[tokio::test]
    async fn dropped_fetch_future_finishes_cancelled() {
        let (sink, client) = make_client(Arc::new(SlowTransport), ClientSettings::default());
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            client.fetch(&key(b"a"), &CancellationSignal::new()),
        )
        .await;
        assert!(abandoned.is_err());

        assert_eq!(client.tracker().in_flight(), 0);
        assert_eq!(sink.events().len(), 2);
        assert_eq!(fetch_results(&sink.events()), vec![CacheResult::Cancelled]);
    }

    #[tokio::test]
    async fn dropped_store_future_still_finishes() {
        let (sink, client) = make_client(Arc::new(SlowTransport), ClientSettings::default());
        let keys = BTreeSet::from([key(b"a")]);
        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            client.store(&keys, b"data", &CancellationSignal::new()),
        )
        .await;
        assert!(abandoned.is_err());

        assert_eq!(client.tracker().in_flight(), 0);
        let events = sink.events();
        // COMPRESS pair, then the STORE pair closed by the drop.
        assert_eq!(events.len(), 4);
        match &events[3] {
            ArtifactCacheEvent::Finished(f) => assert_eq!(f.operation(), Operation::Store),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_cancelled_before_start_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let cache = crate::dir::DirArtifactCache::new(root.path(), "1.0");
        let (_sink, client) = make_client(Arc::new(cache.clone()), ClientSettings::default());
        let cancel = CancellationSignal::new();
        cancel.cancel();

        let k = key(b"a");
        let outcome = client
            .store(&BTreeSet::from([k]), b"data", &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, StoreOutcome::Cancelled);
        assert!(!cache.entry_path(&k).exists());
        assert_eq!(cache.read_entry(&k).unwrap(), None);
    }

    #[tokio::test]
    async fn disabled_cache_is_ignored() {
        let settings = ClientSettings {
            enabled: false,
            ..ClientSettings::default()
        };
        let cache = Arc::new(InMemoryArtifactCache::new());
        let (sink, client) = make_client(cache.clone(), settings);
        let cancel = CancellationSignal::new();

        let outcome = client.fetch(&key(b"a"), &cancel).await.unwrap();
        assert_eq!(outcome.result, CacheResult::Ignored);
        assert!(outcome.result.is_success());

        let stored = client
            .store(&BTreeSet::from([key(b"a")]), b"data", &cancel)
            .await
            .unwrap();
        assert_eq!(stored, StoreOutcome::Skipped);
        assert!(cache.is_empty());
        // Only the FETCH pair was published.
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn read_only_skips_store() {
        let settings = ClientSettings {
            read_only: true,
            ..ClientSettings::default()
        };
        let cache = Arc::new(InMemoryArtifactCache::new());
        let (_sink, client) = make_client(cache.clone(), settings);
        let stored = client
            .store(&BTreeSet::from([key(b"a")]), b"data", &CancellationSignal::new())
            .await
            .unwrap();
        assert_eq!(stored, StoreOutcome::Skipped);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn undecodable_hit_downgrades_outcome_only() {
        let (sink, client) = make_client(Arc::new(GarbageTransport), ClientSettings::default());
        let outcome = client
            .fetch(&key(b"a"), &CancellationSignal::new())
            .await
            .unwrap();
        assert!(matches!(outcome.result, CacheResult::Error { .. }));
        assert!(outcome.payload.is_none());
        // The FETCH event still records the hit; a DECOMPRESS pair follows.
        assert_eq!(fetch_results(&sink.events()), vec![CacheResult::hit("garbage")]);
        assert_eq!(sink.events().len(), 4);
    }

    #[tokio::test]
    async fn fetch_or_build_builds_once_then_serves_from_cache() {
        let cache = Arc::new(InMemoryArtifactCache::new());
        let (_sink, client) = make_client(cache, ClientSettings::default());
        let cancel = CancellationSignal::new();
        let k = key(b"target");

        let first = client
            .fetch_or_build(&k, &cancel, || Ok::<_, std::io::Error>(b"built".to_vec()))
            .await
            .unwrap();
        assert_eq!(first.source, BuildSource::Built);
        assert_eq!(first.store, Some(StoreOutcome::Stored));

        let second = client
            .fetch_or_build(&k, &cancel, || -> Result<Vec<u8>, std::io::Error> {
                panic!("should not rebuild")
            })
            .await
            .unwrap();
        assert_eq!(second.source, BuildSource::FromCache);
        assert_eq!(second.payload, b"built");
        assert!(second.store.is_none());
    }

    #[tokio::test]
    async fn fetch_or_build_survives_broken_cache() {
        let (_sink, client) = make_client(Arc::new(FailingTransport), ClientSettings::default());
        let output = client
            .fetch_or_build(&key(b"a"), &CancellationSignal::new(), || {
                Ok::<_, std::io::Error>(b"local".to_vec())
            })
            .await
            .unwrap();
        assert_eq!(output.payload, b"local");
        assert!(matches!(output.store, Some(StoreOutcome::Failed(_))));
    }

    #[tokio::test]
    async fn build_failure_is_propagated() {
        let cache = Arc::new(InMemoryArtifactCache::new());
        let (_sink, client) = make_client(cache.clone(), ClientSettings::default());
        let err = client
            .fetch_or_build(&key(b"a"), &CancellationSignal::new(), || {
                Err(std::io::Error::other("compiler crashed"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CachedBuildError::Build(_)));
        assert!(cache.is_empty());
    }
}
