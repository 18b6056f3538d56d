//! Run configuration.
//!
//! A JSON config file supplies defaults; CLI flags override it. Relative paths
//! resolve against the directory that holds the config file, or against the
//! working directory when no file is given.
use crate::fileset::FileSet;
use crate::fingerprint::FingerprintSource;
use crate::reference::Extensions;
use crate::steps::{ShellStep, Step};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Conventional config file name.
pub const DEFAULT_CONFIG_FILE: &str = "fingerprint.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FingerprintConfig {
    /// Directory asset URLs are resolved against.
    pub docroot: Option<PathBuf>,
    /// Comma-separated extensions eligible for fingerprinting.
    pub extensions: String,
    pub enabled: bool,
    /// Fixed token used instead of per-file checksums.
    pub file_version: Option<String>,
    pub filesets: Vec<FileSetConfig>,
    pub steps: Vec<StepConfig>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        FingerprintConfig {
            docroot: None,
            extensions: String::new(),
            enabled: true,
            file_version: None,
            filesets: Vec::new(),
            steps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSetConfig {
    pub dir: PathBuf,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub command: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<FingerprintConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: FingerprintConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(config)
}

/// Reject configs that cannot drive a fingerprinting run.
///
/// A disabled config only needs its steps, so nothing else is checked.
pub fn validate_config(config: &FingerprintConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }
    if config.docroot.is_none() {
        return Err(anyhow!("docroot is required when fingerprinting is enabled"));
    }
    if Extensions::parse(&config.extensions).is_empty() {
        return Err(anyhow!(
            "extensions must list at least one file extension (got {:?})",
            config.extensions
        ));
    }
    if config.filesets.is_empty() {
        return Err(anyhow!("at least one file set is required"));
    }
    if let Some(version) = config.file_version.as_deref() {
        if version.contains(['/', '\\']) {
            return Err(anyhow!(
                "file_version must not contain path separators (got {version:?})"
            ));
        }
    }
    for step in &config.steps {
        if step.command.trim().is_empty() {
            return Err(anyhow!("step commands must be non-empty"));
        }
    }
    Ok(())
}

/// Everything a run needs, with paths made absolute.
#[derive(Debug, Clone)]
pub struct FingerprintSettings {
    pub enabled: bool,
    pub docroot: PathBuf,
    pub extensions: Extensions,
    pub source: FingerprintSource,
    pub filesets: Vec<FileSet>,
}

/// Validate `config` and resolve it against `base_dir`.
pub fn resolve_settings(config: &FingerprintConfig, base_dir: &Path) -> Result<FingerprintSettings> {
    validate_config(config)?;
    let docroot = config
        .docroot
        .as_deref()
        .map(|docroot| base_dir.join(docroot))
        .unwrap_or_else(|| base_dir.to_path_buf());
    if config.enabled && !docroot.is_dir() {
        return Err(anyhow!("docroot {} is not a directory", docroot.display()));
    }
    // Asset paths and listed files are compared as paths, so both sides must
    // share one spelling.
    let docroot = canonical(docroot);
    let filesets = config
        .filesets
        .iter()
        .map(|set| {
            FileSet::new(
                canonical(base_dir.join(&set.dir)),
                set.include.clone(),
                set.exclude.clone(),
            )
        })
        .collect();
    Ok(FingerprintSettings {
        enabled: config.enabled,
        docroot,
        extensions: Extensions::parse(&config.extensions),
        source: FingerprintSource::from_version(config.file_version.as_deref()),
        filesets,
    })
}

/// Canonical form of an existing path. Missing paths are kept as given so
/// the file set listing can report them.
fn canonical(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}

/// Downstream steps declared in the config, in declaration order.
pub fn build_steps(config: &FingerprintConfig, base_dir: &Path) -> Vec<Box<dyn Step>> {
    config
        .steps
        .iter()
        .map(|step| {
            Box::new(ShellStep::new(
                step.name.clone(),
                step.command.clone(),
                Some(
                    step.dir
                        .as_deref()
                        .map(|dir| base_dir.join(dir))
                        .unwrap_or_else(|| base_dir.to_path_buf()),
                ),
            )) as Box<dyn Step>
        })
        .collect()
}
