//! `strata events`: run one fetch-or-build cycle and stream its events.
//!
//! Every Started/Finished event is written to stdout as one JSON object per
//! line. The "build" reads a locally produced artifact from disk, so the
//! command can be wired into an existing build step.

use std::sync::Arc;

use strata_artifact::{BuildSource, JsonLinesEventSink};

use crate::session::{block_on, Session};
use crate::{EventsArgs, GlobalArgs};

/// Runs the `strata events` command.
pub fn run(args: &EventsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(global)?;
    let hashes = session.file_hashes(false)?;
    let key = crate::key::compose(&args.inputs, &session, &hashes)?;
    let artifact = session.project_path(&args.artifact);
    tracing::debug!(project = %session.config().project.name, rule_key = %key, "running fetch-or-build");

    let client = session.artifact_client(Arc::new(JsonLinesEventSink::new(std::io::stdout())));
    let output = block_on(|cancel| async move {
        client
            .fetch_or_build(&key, &cancel, || std::fs::read(&artifact))
            .await
    })??;

    if !global.quiet {
        let source = match output.source {
            BuildSource::FromCache => "fetched from cache",
            BuildSource::Built => "built locally",
        };
        eprintln!("{key}: {source} ({} bytes)", output.payload.len());
    }
    Ok(0)
}
