//! A fingerprinting session: forward pass now, guaranteed revert later.
//!
//! The session owns the run's cache. Once [`FingerprintSession::begin`] returns,
//! the revert pass runs exactly once: through [`FingerprintSession::finish`]
//! on normal paths, or from `Drop` on any path that skipped it (early return
//! or a panicking downstream step).
use crate::cache::{FingerprintCache, FingerprintRecord};
use crate::rename::restore_original_name;
use crate::rewrite::{fingerprint_file, restore_file, AssetResolver};
use anyhow::Result;
use std::mem;
use std::path::{Path, PathBuf};

/// One best-effort revert operation that did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What a finished session did to the tree.
#[derive(Debug, Default)]
pub struct SessionSummary {
    pub records: Vec<FingerprintRecord>,
    pub files_rewritten: usize,
    pub files_restored: usize,
    pub revert_failures: Vec<RevertFailure>,
}

pub struct FingerprintSession<'a> {
    resolver: AssetResolver<'a>,
    files: Vec<PathBuf>,
    cache: FingerprintCache,
    files_rewritten: usize,
    reverted: bool,
}

impl<'a> FingerprintSession<'a> {
    /// Start a session over absolute referencing-file paths.
    pub fn begin(resolver: AssetResolver<'a>, files: Vec<PathBuf>) -> Self {
        FingerprintSession {
            resolver,
            files,
            cache: FingerprintCache::new(),
            files_rewritten: 0,
            reverted: false,
        }
    }

    /// Forward pass over every file. The first error stops the pass; whatever
    /// was fingerprinted before it is still reverted.
    pub fn scan(&mut self) -> Result<()> {
        for file in &self.files {
            if fingerprint_file(file, &self.resolver, &mut self.cache)? {
                self.files_rewritten += 1;
            }
        }
        Ok(())
    }

    /// Log the per-resource fingerprint assignments.
    pub fn log_resources(&self) {
        if self.cache.is_empty() {
            tracing::info!("no static resources referenced");
            return;
        }
        tracing::info!(
            resources = self.cache.len(),
            files = self.files_rewritten,
            "forward pass complete"
        );
        for record in self.cache.records() {
            tracing::info!(
                resource = %record.resolved_path().display(),
                fingerprint = record.fingerprint(),
                "fingerprinted static resource"
            );
        }
    }

    /// Revert everything and report what happened.
    pub fn finish(mut self) -> SessionSummary {
        let (files_restored, revert_failures) = self.revert();
        SessionSummary {
            records: self.cache.records().into_iter().cloned().collect(),
            files_rewritten: self.files_rewritten,
            files_restored,
            revert_failures,
        }
    }

    fn revert(&mut self) -> (usize, Vec<RevertFailure>) {
        if mem::replace(&mut self.reverted, true) {
            return (0, Vec::new());
        }
        let mut failures = Vec::new();
        let mut restored = 0;

        tracing::info!("reverting fingerprint changes in referencing files");
        let mapping = self.cache.revert_mapping();
        if !mapping.is_empty() {
            for file in &self.files {
                match restore_file(file, &mapping, &self.cache) {
                    Ok(true) => restored += 1,
                    Ok(false) => {}
                    Err(err) => failures.push(report_failure(file, err)),
                }
            }
        }

        tracing::info!("reverting fingerprint changes in resource names");
        for record in self.cache.records() {
            if !self.cache.was_renamed(record.original_name()) {
                continue;
            }
            if let Err(err) = restore_original_name(record) {
                failures.push(report_failure(record.resolved_path(), err));
            }
        }
        (restored, failures)
    }
}

impl Drop for FingerprintSession<'_> {
    fn drop(&mut self) {
        if !self.reverted {
            let (_, failures) = self.revert();
            if !failures.is_empty() {
                tracing::error!(
                    failures = failures.len(),
                    "revert finished with failures"
                );
            }
        }
    }
}

fn report_failure(path: &Path, err: anyhow::Error) -> RevertFailure {
    let error = format!("{err:#}");
    tracing::warn!(path = %path.display(), error = %error, "revert failed");
    RevertFailure {
        path: path.to_path_buf(),
        error,
    }
}
