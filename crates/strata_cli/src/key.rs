//! `strata key`: compose a rule key from named inputs.

use std::error::Error;

use strata_cache::FileHashCache;
use strata_rulekey::{RuleKey, RuleKeyBuilder};

use crate::session::Session;
use crate::{GlobalArgs, KeyArgs, KeyInputs};

/// Runs the `strata key` command, printing the key as hex.
pub fn run(args: &KeyArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let session = Session::open(global)?;
    let hashes = session.file_hashes(false)?;
    let key = compose(&args.inputs, &session, &hashes)?;
    println!("{key}");
    Ok(0)
}

/// Feeds string inputs, then file inputs, into a fresh builder.
pub fn compose(
    inputs: &KeyInputs,
    session: &Session,
    hashes: &dyn FileHashCache,
) -> Result<RuleKey, Box<dyn Error>> {
    let mut builder = RuleKeyBuilder::new(hashes);
    for input in &inputs.strings {
        let (name, value) = split_input(input)?;
        builder.add_str(name, value)?;
    }
    for input in &inputs.files {
        let (name, path) = split_input(input)?;
        builder.add_file(name, &session.project_path(path))?;
    }
    Ok(builder.build()?)
}

fn split_input(input: &str) -> Result<(&str, &str), String> {
    input
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got '{input}'"))
}
