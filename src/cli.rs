//! CLI argument parsing for fingerprint runs.
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "fingerprint",
    version,
    about = "Fingerprint static asset references around a build, then restore the tree",
    after_help = "Examples:\n  fingerprint run --config fingerprint.json\n  fingerprint run --docroot web --extensions css,js --dir web --include '*.html' -- tar czf site.tgz web\n  fingerprint scan --docroot web --extensions css --dir web --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Scan(ScanArgs),
}

/// Where the configuration comes from and CLI overrides for it.
#[derive(Args, Debug, Default, Clone)]
pub struct SelectionArgs {
    /// Config file (defaults to ./fingerprint.json when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory asset URLs are resolved against
    #[arg(long, value_name = "DIR")]
    pub docroot: Option<PathBuf>,

    /// Comma-separated extensions to fingerprint (e.g. css,js,png)
    #[arg(long, value_name = "LIST")]
    pub extensions: Option<String>,

    /// Fixed token to use instead of per-file checksums
    #[arg(long, value_name = "VERSION")]
    pub file_version: Option<String>,

    /// Add a file set rooted at DIR
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Include glob for the --dir file set (repeatable)
    #[arg(long, value_name = "GLOB", requires = "dir")]
    pub include: Vec<String>,

    /// Exclude glob for the --dir file set (repeatable)
    #[arg(long, value_name = "GLOB", requires = "dir")]
    pub exclude: Vec<String>,
}

/// Fingerprint, run downstream steps, then revert.
#[derive(Parser, Debug)]
#[command(about = "Fingerprint references, run build steps, then restore the tree")]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Skip fingerprinting and only run the steps
    #[arg(long)]
    pub disable: bool,

    /// Emit a machine-readable JSON report
    #[arg(long)]
    pub json: bool,

    /// Extra step run after the configured ones
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Report candidate references without modifying anything.
#[derive(Parser, Debug)]
#[command(about = "List references that would be fingerprinted (read-only)")]
pub struct ScanArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
