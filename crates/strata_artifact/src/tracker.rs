//! The per-operation STARTED → FINISHED state machine.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use strata_rulekey::RuleKey;

use crate::error::ProtocolViolation;
use crate::event::{ArtifactCacheEvent, EventKey, Finished, Started};
use crate::operation::Operation;
use crate::result::CacheResult;
use crate::sink::EventSink;

#[derive(Debug, Clone, Copy)]
enum OperationState {
    Started { at: Instant },
    Finished,
}

/// Creates lifecycle events and enforces that each Started gets exactly one
/// Finished, publishing both to the configured sink in order.
///
/// FINISHED is terminal. The most recent concluded operations are remembered
/// so a late duplicate reports [`ProtocolViolation::AlreadyFinished`]; once a
/// key ages out of that window a duplicate reports
/// [`ProtocolViolation::UnknownEvent`] instead. Either way it is rejected.
pub struct ArtifactEventTracker {
    sink: Arc<dyn EventSink>,
    states: Mutex<States>,
}

/// Concluded operations remembered by [`ArtifactEventTracker::new`].
pub const DEFAULT_FINISHED_RETENTION: usize = 4096;

#[derive(Default)]
struct States {
    by_key: HashMap<EventKey, OperationState>,
    finished_order: VecDeque<EventKey>,
    retention: usize,
}

impl ArtifactEventTracker {
    /// Creates a tracker publishing to `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_finished_retention(sink, DEFAULT_FINISHED_RETENTION)
    }

    /// Creates a tracker that remembers at most `retention` concluded
    /// operations.
    pub fn with_finished_retention(sink: Arc<dyn EventSink>, retention: usize) -> Self {
        Self {
            sink,
            states: Mutex::new(States {
                retention,
                ..States::default()
            }),
        }
    }

    /// Begins an operation under a fresh event key.
    pub fn started(
        &self,
        operation: Operation,
        rule_keys: impl IntoIterator<Item = RuleKey>,
    ) -> Started {
        let started = Started::new(operation, rule_keys.into_iter().collect::<BTreeSet<_>>());
        self.states.lock().unwrap().by_key.insert(
            started.event_key(),
            OperationState::Started { at: Instant::now() },
        );
        self.sink.publish(&ArtifactCacheEvent::Started(started.clone()));
        started
    }

    /// Concludes a non-FETCH operation.
    pub fn finished(&self, started: &Started) -> Result<Finished, ProtocolViolation> {
        if started.operation() == Operation::Fetch {
            return Err(self.violation(ProtocolViolation::MissingCacheResult {
                event_key: started.event_key(),
            }));
        }
        let duration_ms = self.transition(started)?;
        Ok(self.publish(Finished::completed(started, duration_ms)))
    }

    /// Concludes a FETCH with its result.
    pub fn finished_fetch(
        &self,
        started: &Started,
        cache_result: CacheResult,
    ) -> Result<Finished, ProtocolViolation> {
        if started.operation() != Operation::Fetch {
            return Err(self.violation(ProtocolViolation::UnexpectedCacheResult {
                event_key: started.event_key(),
                operation: started.operation(),
            }));
        }
        let duration_ms = self.transition(started)?;
        Ok(self.publish(Finished::fetch(started, cache_result, duration_ms)))
    }

    /// Begins an operation whose Finished is guaranteed.
    ///
    /// The returned [`PendingOperation`] concludes the operation when it is
    /// finished explicitly, or as abandoned when it is dropped first (a FETCH
    /// then finishes with [`CacheResult::Cancelled`]).
    pub fn begin(
        self: &Arc<Self>,
        operation: Operation,
        rule_keys: impl IntoIterator<Item = RuleKey>,
    ) -> PendingOperation {
        PendingOperation {
            tracker: Arc::clone(self),
            started: Some(self.started(operation, rule_keys)),
        }
    }

    /// Number of operations started but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.states
            .lock()
            .unwrap()
            .by_key
            .values()
            .filter(|s| matches!(s, OperationState::Started { .. }))
            .count()
    }

    /// Moves `started` to FINISHED, returning the elapsed milliseconds.
    fn transition(&self, started: &Started) -> Result<u64, ProtocolViolation> {
        let event_key = started.event_key();
        let previous = {
            let mut states = self.states.lock().unwrap();
            let previous = states
                .by_key
                .get_mut(&event_key)
                .map(|state| std::mem::replace(state, OperationState::Finished));
            if matches!(previous, Some(OperationState::Started { .. })) {
                states.retire(event_key);
            }
            previous
        };
        match previous {
            Some(OperationState::Started { at }) => {
                Ok(u64::try_from(at.elapsed().as_millis()).unwrap_or(u64::MAX))
            }
            Some(OperationState::Finished) => Err(self.violation(ProtocolViolation::AlreadyFinished {
                event_key,
                operation: started.operation(),
            })),
            None => Err(self.violation(ProtocolViolation::UnknownEvent { event_key })),
        }
    }

    fn publish(&self, finished: Finished) -> Finished {
        self.sink
            .publish(&ArtifactCacheEvent::Finished(finished.clone()));
        finished
    }

    fn violation(&self, violation: ProtocolViolation) -> ProtocolViolation {
        tracing::error!(error = %violation, "artifact cache protocol violation");
        violation
    }
}

impl States {
    fn retire(&mut self, event_key: EventKey) {
        self.finished_order.push_back(event_key);
        while self.finished_order.len() > self.retention {
            if let Some(oldest) = self.finished_order.pop_front() {
                self.by_key.remove(&oldest);
            }
        }
    }
}

/// An operation begun with [`ArtifactEventTracker::begin`].
///
/// Finishing consumes the guard. Dropping an unfinished guard, as happens
/// when the future driving the operation is dropped, publishes the Finished
/// for it.
pub struct PendingOperation {
    tracker: Arc<ArtifactEventTracker>,
    started: Option<Started>,
}

impl PendingOperation {
    /// The Started event of this operation.
    pub fn started(&self) -> Option<&Started> {
        self.started.as_ref()
    }

    /// Concludes a non-FETCH operation.
    pub fn finish(mut self) -> Result<Finished, ProtocolViolation> {
        match self.started.take() {
            Some(started) => self.tracker.finished(&started),
            None => unreachable!("pending operation finished twice"),
        }
    }

    /// Concludes a FETCH with its result.
    pub fn finish_fetch(mut self, cache_result: CacheResult) -> Result<Finished, ProtocolViolation> {
        match self.started.take() {
            Some(started) => self.tracker.finished_fetch(&started, cache_result),
            None => unreachable!("pending operation finished twice"),
        }
    }
}

impl Drop for PendingOperation {
    fn drop(&mut self) {
        let Some(started) = self.started.take() else {
            return;
        };
        tracing::debug!(
            event_key = started.event_key().value(),
            operation = %started.operation(),
            "artifact cache operation abandoned"
        );
        // Violations are already logged by the tracker.
        let _ = if started.operation() == Operation::Fetch {
            self.tracker.finished_fetch(&started, CacheResult::Cancelled)
        } else {
            self.tracker.finished(&started)
        };
    }
}
