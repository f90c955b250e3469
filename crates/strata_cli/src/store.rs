//! `strata store`: store an artifact under one or more rule keys.

use std::collections::BTreeSet;
use std::sync::Arc;

use strata_artifact::{StoreOutcome, TracingEventSink};
use strata_rulekey::RuleKey;

use crate::session::{block_on, Session};
use crate::{GlobalArgs, StoreArgs};

/// Runs the `strata store` command.
///
/// Returns exit code 0 when the artifact was stored or the store was skipped
/// by configuration, 1 otherwise.
pub fn run(args: &StoreArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(global)?;
    let keys = args
        .rule_keys
        .iter()
        .map(|k| k.parse::<RuleKey>())
        .collect::<Result<BTreeSet<RuleKey>, _>>()?;
    let payload = std::fs::read(session.project_path(&args.input))?;
    let client = session.artifact_client(Arc::new(TracingEventSink));

    let outcome = block_on(|cancel| async move {
        client.store(&keys, &payload, &cancel).await
    })??;

    if !global.quiet {
        println!("{}", describe(&outcome));
    }
    Ok(match outcome {
        StoreOutcome::Stored | StoreOutcome::Skipped => 0,
        StoreOutcome::Failed(_) | StoreOutcome::Cancelled => 1,
    })
}

fn describe(outcome: &StoreOutcome) -> String {
    match outcome {
        StoreOutcome::Stored => "stored".to_string(),
        StoreOutcome::Skipped => "skipped (cache disabled or read-only)".to_string(),
        StoreOutcome::Failed(reason) => format!("failed: {reason}"),
        StoreOutcome::Cancelled => "cancelled".to_string(),
    }
}
