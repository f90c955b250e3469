//! Started/Finished lifecycle events.
//!
//! Events are only created through an
//! [`ArtifactEventTracker`](crate::ArtifactEventTracker), which owns the
//! STARTED → FINISHED state machine. A [`Finished`] event stores its outcome
//! as an enum, so a non-FETCH event structurally cannot carry a
//! [`CacheResult`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use strata_rulekey::RuleKey;

use crate::operation::Operation;
use crate::result::CacheResult;

static NEXT_EVENT_KEY: AtomicU64 = AtomicU64::new(1);

/// Identifies one logical operation; shared by its Started and Finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EventKey(u64);

impl EventKey {
    /// Allocates a process-unique key.
    pub(crate) fn unique() -> Self {
        Self(NEXT_EVENT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// The numeric value of the key.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn join_keys(rule_keys: &BTreeSet<RuleKey>) -> String {
    rule_keys
        .iter()
        .map(RuleKey::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Published when an operation begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Started {
    event_key: EventKey,
    operation: Operation,
    rule_keys: BTreeSet<RuleKey>,
}

impl Started {
    pub(crate) fn new(operation: Operation, rule_keys: BTreeSet<RuleKey>) -> Self {
        Self {
            event_key: EventKey::unique(),
            operation,
            rule_keys,
        }
    }

    /// The key shared with the matching [`Finished`].
    pub fn event_key(&self) -> EventKey {
        self.event_key
    }

    /// The operation that began.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The rule keys the operation concerns.
    pub fn rule_keys(&self) -> &BTreeSet<RuleKey> {
        &self.rule_keys
    }

    /// Event name, e.g. `ArtifactFetchCacheStarted`.
    pub fn event_name(&self) -> String {
        format!("Artifact{}CacheStarted", self.operation.camel_name())
    }
}

/// What a finished operation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum Outcome {
    Fetch { cache_result: CacheResult },
    Completed {},
}

/// Published exactly once when an operation concludes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finished {
    event_key: EventKey,
    operation: Operation,
    rule_keys: BTreeSet<RuleKey>,
    duration_ms: u64,
    #[serde(flatten)]
    outcome: Outcome,
}

impl Finished {
    /// Builds the Finished event of a FETCH. The caller has checked the operation.
    pub(crate) fn fetch(started: &Started, cache_result: CacheResult, duration_ms: u64) -> Self {
        debug_assert_eq!(started.operation, Operation::Fetch);
        Self::with_outcome(started, Outcome::Fetch { cache_result }, duration_ms)
    }

    /// Builds the Finished event of a non-FETCH operation.
    pub(crate) fn completed(started: &Started, duration_ms: u64) -> Self {
        debug_assert_ne!(started.operation, Operation::Fetch);
        Self::with_outcome(started, Outcome::Completed {}, duration_ms)
    }

    fn with_outcome(started: &Started, outcome: Outcome, duration_ms: u64) -> Self {
        Self {
            event_key: started.event_key,
            operation: started.operation,
            rule_keys: started.rule_keys.clone(),
            duration_ms,
            outcome,
        }
    }

    /// The key shared with the matching [`Started`].
    pub fn event_key(&self) -> EventKey {
        self.event_key
    }

    /// The operation that concluded.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The rule keys the operation concerned.
    pub fn rule_keys(&self) -> &BTreeSet<RuleKey> {
        &self.rule_keys
    }

    /// Wall-clock time between Started and Finished.
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// The FETCH result; `None` for every other operation.
    pub fn cache_result(&self) -> Option<&CacheResult> {
        match &self.outcome {
            Outcome::Fetch { cache_result } => Some(cache_result),
            Outcome::Completed {} => None,
        }
    }

    /// `true` unless this is a FETCH whose result is a failure.
    pub fn is_success(&self) -> bool {
        self.cache_result().map_or(true, CacheResult::is_success)
    }

    /// Event name, e.g. `ArtifactFetchCacheFinished`.
    pub fn event_name(&self) -> String {
        format!("Artifact{}CacheFinished", self.operation.camel_name())
    }
}

/// Either half of an operation's lifecycle, as published to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArtifactCacheEvent {
    /// An operation began.
    Started(Started),
    /// An operation concluded.
    Finished(Finished),
}

impl ArtifactCacheEvent {
    /// The event key shared by both halves.
    pub fn event_key(&self) -> EventKey {
        match self {
            ArtifactCacheEvent::Started(e) => e.event_key(),
            ArtifactCacheEvent::Finished(e) => e.event_key(),
        }
    }

    /// The operation concerned.
    pub fn operation(&self) -> Operation {
        match self {
            ArtifactCacheEvent::Started(e) => e.operation(),
            ArtifactCacheEvent::Finished(e) => e.operation(),
        }
    }

    /// The rule keys concerned.
    pub fn rule_keys(&self) -> &BTreeSet<RuleKey> {
        match self {
            ArtifactCacheEvent::Started(e) => e.rule_keys(),
            ArtifactCacheEvent::Finished(e) => e.rule_keys(),
        }
    }

    /// Event name, e.g. `ArtifactStoreCacheStarted`.
    pub fn event_name(&self) -> String {
        match self {
            ArtifactCacheEvent::Started(e) => e.event_name(),
            ArtifactCacheEvent::Finished(e) => e.event_name(),
        }
    }

    /// Telemetry category, e.g. `artifact_fetch`.
    pub fn category(&self) -> String {
        format!("artifact_{}", self.operation().as_str())
    }

    /// Compact description, e.g. `fetch:<key1>,<key2>`.
    pub fn value_string(&self) -> String {
        format!("{}:{}", self.operation().as_str(), join_keys(self.rule_keys()))
    }
}
