//! The artifact cache operation protocol.
//!
//! Every interaction with an artifact store (FETCH, STORE, and the
//! COMPRESS/DECOMPRESS steps around them) is bracketed by a [`Started`] and
//! exactly one [`Finished`] event, published to an [`EventSink`]. Transport
//! failures are converted into [`CacheResult`] values at this boundary so the
//! rest of the build never sees a remote failure as a build failure.

#![warn(missing_docs)]

pub mod client;
pub mod compression;
pub mod dir;
pub mod error;
pub mod event;
pub mod memory;
pub mod operation;
pub mod result;
pub mod sink;
pub mod tracker;
pub mod transport;

pub use client::{
    ArtifactCacheClient, BuildOutput, BuildSource, CachedBuildError, CancellationSignal,
    ClientSettings, FetchOutcome, StoreOutcome,
};
pub use dir::DirArtifactCache;
pub use error::{CompressionError, ProtocolViolation, TransportError};
pub use event::{ArtifactCacheEvent, EventKey, Finished, Started};
pub use memory::InMemoryArtifactCache;
pub use operation::Operation;
pub use result::CacheResult;
pub use sink::{EventSink, JsonLinesEventSink, NullEventSink, RecordingEventSink, TracingEventSink};
pub use tracker::{ArtifactEventTracker, PendingOperation, DEFAULT_FINISHED_RETENTION};
pub use transport::ArtifactTransport;
