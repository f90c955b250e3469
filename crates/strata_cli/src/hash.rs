//! `strata hash`: print the content hash of project paths.

use serde::Serialize;
use strata_cache::PathKind;
use strata_common::HashCode;

use crate::session::Session;
use crate::{GlobalArgs, HashArgs, ReportFormat};

#[derive(Debug, Serialize)]
struct HashReport {
    path: String,
    hash: HashCode,
    kind: PathKind,
}

/// Runs the `strata hash` command.
///
/// Hashes every requested path in parallel. Returns exit code 0 if all paths
/// hashed, 1 if any could not be.
pub fn run(args: &HashArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(global)?;
    let hashes = session.file_hashes(args.shallow)?;

    let paths: Vec<_> = args.paths.iter().map(|p| session.project_path(p)).collect();
    let mut reports = Vec::new();
    let mut failed = false;
    for (arg, result) in args.paths.iter().zip(hashes.get_many(&paths)) {
        match result {
            Ok(record) => reports.push(HashReport {
                path: arg.clone(),
                hash: record.hash(),
                kind: record.kind(),
            }),
            Err(e) => {
                eprintln!("error: {arg}: {e}");
                failed = true;
            }
        }
    }

    match args.format {
        ReportFormat::Text => {
            for report in &reports {
                println!("{}", render_line(report));
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(i32::from(failed))
}

fn render_line(report: &HashReport) -> String {
    let kind = match report.kind {
        PathKind::File => "file",
        PathKind::Directory => "dir",
        PathKind::Symlink => "symlink",
    };
    format!("{}  {kind:<7}  {}", report.hash, report.path)
}
