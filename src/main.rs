use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cache;
mod cli;
mod config;
mod fileset;
mod fingerprint;
mod reference;
mod rename;
mod report;
mod rewrite;
mod scan;
mod session;
mod steps;
mod workflow;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Run(args) => workflow::run_fingerprint(args),
        Command::Scan(args) => workflow::run_scan(args),
    }
}

/// Logs go to stderr; `RUST_LOG` wins over the `-v` count.
fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
