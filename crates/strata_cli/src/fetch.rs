//! `strata fetch`: look up an artifact by rule key.

use std::sync::Arc;

use strata_artifact::{CacheResult, TracingEventSink};
use strata_rulekey::RuleKey;

use crate::session::{block_on, Session};
use crate::{FetchArgs, GlobalArgs};

/// Runs the `strata fetch` command.
///
/// Prints the cache result. Returns exit code 0 on a hit, 2 on a miss or
/// when caching is disabled, and 1 when the lookup failed or was cancelled.
pub fn run(args: &FetchArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(global)?;
    let key: RuleKey = args.rule_key.parse()?;
    let client = session.artifact_client(Arc::new(TracingEventSink));

    let outcome = block_on(|cancel| async move { client.fetch(&key, &cancel).await })??;

    if let (Some(payload), Some(output)) = (&outcome.payload, &args.output) {
        std::fs::write(output, payload)?;
    }
    if !global.quiet {
        println!("{}", outcome.result);
    }
    Ok(exit_code(&outcome.result))
}

fn exit_code(result: &CacheResult) -> i32 {
    match result {
        CacheResult::Hit { .. } => 0,
        CacheResult::Miss | CacheResult::Ignored => 2,
        CacheResult::Error { .. } | CacheResult::Cancelled => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(&CacheResult::hit("dir")), 0);
        assert_eq!(exit_code(&CacheResult::Miss), 2);
        assert_eq!(exit_code(&CacheResult::Ignored), 2);
        assert_eq!(exit_code(&CacheResult::error("dir", "corrupt")), 1);
        assert_eq!(exit_code(&CacheResult::Cancelled), 1);
    }
}
