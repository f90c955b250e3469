//! Telemetry sinks for lifecycle events.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::event::ArtifactCacheEvent;

/// Receives every published lifecycle event, Started before Finished.
pub trait EventSink: Send + Sync {
    /// Delivers one event. Sinks must not fail the operation being reported.
    fn publish(&self, event: &ArtifactCacheEvent);
}

/// Discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: &ArtifactCacheEvent) {}
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: &ArtifactCacheEvent) {
        match event {
            ArtifactCacheEvent::Started(started) => tracing::debug!(
                event = %started.event_name(),
                event_key = started.event_key().value(),
                value = %event.value_string(),
                "artifact cache operation started"
            ),
            ArtifactCacheEvent::Finished(finished) => {
                let result = finished
                    .cache_result()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                if finished.is_success() {
                    tracing::debug!(
                        event = %finished.event_name(),
                        event_key = finished.event_key().value(),
                        duration_ms = finished.duration_ms(),
                        result = %result,
                        "artifact cache operation finished"
                    );
                } else {
                    tracing::warn!(
                        event = %finished.event_name(),
                        event_key = finished.event_key().value(),
                        duration_ms = finished.duration_ms(),
                        result = %result,
                        "artifact cache operation failed"
                    );
                }
            }
        }
    }
}

/// Keeps every event in memory, for tests and for the CLI's event dump.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<ArtifactCacheEvent>>,
}

impl RecordingEventSink {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded events.
    pub fn events(&self) -> Vec<ArtifactCacheEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Takes all recorded events, leaving the recorder empty.
    pub fn take_all(&self) -> Vec<ArtifactCacheEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl EventSink for RecordingEventSink {
    fn publish(&self, event: &ArtifactCacheEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    name: String,
    category: String,
    #[serde(flatten)]
    event: &'a ArtifactCacheEvent,
}

/// Writes each event as one JSON object per line.
pub struct JsonLinesEventSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesEventSink<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> EventSink for JsonLinesEventSink<W> {
    fn publish(&self, event: &ArtifactCacheEvent) {
        let line = JsonLine {
            name: event.event_name(),
            category: event.category(),
            event,
        };
        let mut writer = self.writer.lock().unwrap();
        let written = serde_json::to_writer(&mut *writer, &line)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to write artifact cache event");
        }
    }
}
