//! Downstream build steps run while fingerprints are applied.
use anyhow::{anyhow, Context, Result};
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

/// An opaque unit of downstream work (packaging, archiving, ...).
pub trait Step {
    fn name(&self) -> &str;
    fn run(&self) -> Result<()>;
}

/// A command line split with shell quoting rules and run without a shell.
///
/// Child stdout is redirected to our stderr so stdout stays free for reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellStep {
    name: String,
    command: String,
    dir: Option<PathBuf>,
}

impl ShellStep {
    pub fn new(name: Option<String>, command: String, dir: Option<PathBuf>) -> Self {
        let name = name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| command.clone());
        ShellStep { name, command, dir }
    }

    /// Build a step from already-split arguments, e.g. a trailing `-- cmd ...`.
    pub fn from_argv(argv: &[String], dir: Option<PathBuf>) -> Self {
        ShellStep::new(None, shell_words::join(argv), dir)
    }
}

impl Step for ShellStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> Result<()> {
        let args = shell_words::split(&self.command)
            .with_context(|| format!("parse step command: {}", self.command))?;
        let Some((program, rest)) = args.split_first() else {
            return Err(anyhow!("step {:?} has an empty command", self.name));
        };

        let mut command = Command::new(program);
        command.args(rest).stdout(io::stderr());
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }

        let start = Instant::now();
        let status = command
            .status()
            .with_context(|| format!("spawn step command: {program}"))?;
        tracing::info!(
            step = %self.name,
            elapsed_ms = start.elapsed().as_millis(),
            success = status.success(),
            "step complete"
        );
        if !status.success() {
            return Err(anyhow!("step {:?} failed with {}", self.name, status));
        }
        Ok(())
    }
}

/// Run steps in order, stopping at the first failure.
///
/// Returns how many steps completed successfully.
pub fn run_steps(steps: &[Box<dyn Step>]) -> Result<usize> {
    for (index, step) in steps.iter().enumerate() {
        tracing::info!(step = step.name(), "running downstream step");
        step.run()
            .with_context(|| format!("downstream step {} ({}) failed", index + 1, step.name()))?;
    }
    Ok(steps.len())
}
