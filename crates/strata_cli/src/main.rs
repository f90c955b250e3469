//! Strata CLI: command-line access to the Strata build cache.
//!
//! Provides `strata hash` for inspecting file hashes, `strata key` for
//! composing rule keys, `strata fetch` / `strata store` for talking to the
//! configured artifact cache, and `strata events` for running a full
//! fetch-or-build cycle while streaming its cache events as JSON lines.

#![warn(missing_docs)]

mod events;
mod fetch;
mod hash;
mod key;
mod logging;
mod session;
mod store;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Strata: a content-addressed build cache.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata build cache")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `strata.toml` configuration file or project directory.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the content hash of files, directories or symlinks.
    Hash(HashArgs),
    /// Compose a rule key from named inputs.
    Key(KeyArgs),
    /// Fetch an artifact by rule key.
    Fetch(FetchArgs),
    /// Store an artifact under one or more rule keys.
    Store(StoreArgs),
    /// Fetch or build an artifact, printing every cache event as JSON.
    Events(EventsArgs),
}

/// Arguments for the `strata hash` subcommand.
#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Paths to hash, relative to the current directory.
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Hash directories shallowly regardless of configuration.
    #[arg(long)]
    pub shallow: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Named rule key inputs shared by `strata key` and `strata events`.
#[derive(Parser, Debug, Default)]
pub struct KeyInputs {
    /// A string input, as `NAME=VALUE`. May be repeated.
    #[arg(long = "str", value_name = "NAME=VALUE")]
    pub strings: Vec<String>,

    /// A file input hashed through the file hash cache, as `NAME=PATH`.
    /// May be repeated. File inputs are added after string inputs.
    #[arg(long = "file", value_name = "NAME=PATH")]
    pub files: Vec<String>,
}

/// Arguments for the `strata key` subcommand.
#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// The inputs to fingerprint.
    #[command(flatten)]
    pub inputs: KeyInputs,
}

/// Arguments for the `strata fetch` subcommand.
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// The rule key (64 hex characters).
    pub rule_key: String,

    /// Write the fetched artifact here instead of discarding it.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the `strata store` subcommand.
#[derive(Parser, Debug)]
pub struct StoreArgs {
    /// Rule keys to store the artifact under.
    #[arg(required = true)]
    pub rule_keys: Vec<String>,

    /// The artifact file to store.
    #[arg(short, long)]
    pub input: String,
}

/// Arguments for the `strata events` subcommand.
#[derive(Parser, Debug)]
pub struct EventsArgs {
    /// The inputs to fingerprint.
    #[command(flatten)]
    pub inputs: KeyInputs,

    /// The locally built artifact, read when the cache misses.
    #[arg(long)]
    pub artifact: String,
}

/// Output format for hash reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    logging::init(&global);

    let result = match cli.command {
        Command::Hash(ref args) => hash::run(args, &global),
        Command::Key(ref args) => key::run(args, &global),
        Command::Fetch(ref args) => fetch::run(args, &global),
        Command::Store(ref args) => store::run(args, &global),
        Command::Events(ref args) => events::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_hash() {
        let cli = Cli::parse_from(["strata", "hash", "src", "BUILD"]);
        match cli.command {
            Command::Hash(ref args) => {
                assert_eq!(args.paths, vec!["src", "BUILD"]);
                assert!(!args.shallow);
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Hash command"),
        }
    }

    #[test]
    fn parse_hash_requires_a_path() {
        assert!(Cli::try_parse_from(["strata", "hash"]).is_err());
    }

    #[test]
    fn parse_hash_json_shallow() {
        let cli = Cli::parse_from(["strata", "hash", "--shallow", "--format", "json", "src"]);
        match cli.command {
            Command::Hash(ref args) => {
                assert!(args.shallow);
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Hash command"),
        }
    }

    #[test]
    fn parse_key_inputs() {
        let cli = Cli::parse_from([
            "strata",
            "key",
            "--str",
            "flags=-O2",
            "--file",
            "src=lib.c",
            "--str",
            "rule=cxx_library",
        ]);
        match cli.command {
            Command::Key(ref args) => {
                assert_eq!(args.inputs.strings, vec!["flags=-O2", "rule=cxx_library"]);
                assert_eq!(args.inputs.files, vec!["src=lib.c"]);
            }
            _ => panic!("expected Key command"),
        }
    }

    #[test]
    fn parse_fetch_with_output() {
        let cli = Cli::parse_from(["strata", "fetch", "abcd", "-o", "out.bin"]);
        match cli.command {
            Command::Fetch(ref args) => {
                assert_eq!(args.rule_key, "abcd");
                assert_eq!(args.output.as_deref(), Some("out.bin"));
            }
            _ => panic!("expected Fetch command"),
        }
    }

    #[test]
    fn parse_store_multiple_keys() {
        let cli = Cli::parse_from(["strata", "store", "k1", "k2", "--input", "a.o"]);
        match cli.command {
            Command::Store(ref args) => {
                assert_eq!(args.rule_keys, vec!["k1", "k2"]);
                assert_eq!(args.input, "a.o");
            }
            _ => panic!("expected Store command"),
        }
    }

    #[test]
    fn parse_store_requires_input() {
        assert!(Cli::try_parse_from(["strata", "store", "k1"]).is_err());
    }

    #[test]
    fn parse_events() {
        let cli = Cli::parse_from(["strata", "events", "--file", "src=a.c", "--artifact", "a.o"]);
        match cli.command {
            Command::Events(ref args) => {
                assert_eq!(args.inputs.files, vec!["src=a.c"]);
                assert_eq!(args.artifact, "a.o");
            }
            _ => panic!("expected Events command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["strata", "--quiet", "hash", "x"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["strata", "--config", "/path/to/strata.toml", "key"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/strata.toml"));
    }
}
