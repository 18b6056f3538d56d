//! Run-scoped fingerprint assignments.
//!
//! A resource is fingerprinted (checksummed and renamed) at most once per run,
//! however many files or references point at it. Records are keyed by the
//! resource's base file name, so same-named assets in different directories
//! share one assignment.
use crate::fingerprint::FingerprintSource;
use crate::rename::rename_to_fingerprint;
use anyhow::Result;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One asset's fingerprint assignment. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintRecord {
    original_name: String,
    fingerprint: String,
    resolved_path: PathBuf,
}

impl FingerprintRecord {
    pub fn new(original_name: &str, fingerprint: String, resolved_path: &Path) -> Self {
        FingerprintRecord {
            original_name: original_name.to_string(),
            fingerprint,
            resolved_path: resolved_path.to_path_buf(),
        }
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    pub fn fingerprinted_name(&self) -> String {
        fingerprinted_name(&self.original_name, &self.fingerprint)
    }

    /// Location of the asset while fingerprinting is applied.
    pub fn fingerprinted_path(&self) -> PathBuf {
        self.resolved_path.with_file_name(self.fingerprinted_name())
    }

    /// True when the fingerprinted name is the original name (empty token).
    pub fn is_identity(&self) -> bool {
        self.fingerprinted_name() == self.original_name
    }
}

/// `base + fingerprint + extension`, split on the last `.` of `name`.
pub fn fingerprinted_name(name: &str, fingerprint: &str) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}{}{}", &name[..dot], fingerprint, &name[dot..]),
        None => format!("{name}{fingerprint}"),
    }
}

/// Original file name to fingerprint record, owned by a single run.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    records: HashMap<String, FingerprintRecord>,
    fingerprinted_names: HashSet<String>,
    renamed: HashSet<String>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, original_name: &str) -> Option<&FingerprintRecord> {
        self.records.get(original_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records sorted by original name.
    pub fn records(&self) -> Vec<&FingerprintRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by(|a, b| a.original_name.cmp(&b.original_name));
        records
    }

    /// Whether the forward rename of this record's asset went through.
    pub fn was_renamed(&self, original_name: &str) -> bool {
        self.renamed.contains(original_name)
    }

    /// True for a name this run produced that is not itself an original name.
    ///
    /// Later shapes scan text earlier shapes already rewrote; such names must
    /// not be fingerprinted a second time.
    pub fn is_fingerprinted_name(&self, name: &str) -> bool {
        self.fingerprinted_names.contains(name) && !self.records.contains_key(name)
    }

    /// Return the record for `original_name`, creating it on first sight.
    ///
    /// Creation computes the fingerprint and renames the asset with that same
    /// token. A failed rename is reported and left for the revert pass to skip.
    pub fn ensure(
        &mut self,
        original_name: &str,
        resolved_path: &Path,
        source: &FingerprintSource,
    ) -> Result<&FingerprintRecord> {
        match self.records.entry(original_name.to_string()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let fingerprint = source.fingerprint(resolved_path)?;
                let record = FingerprintRecord::new(original_name, fingerprint, resolved_path);
                match rename_to_fingerprint(&record) {
                    Ok(true) => {
                        self.renamed.insert(original_name.to_string());
                    }
                    Ok(false) => {}
                    Err(err) => {
                        tracing::warn!(
                            resource = %resolved_path.display(),
                            error = %format!("{err:#}"),
                            "failed to rename resource"
                        );
                    }
                }
                self.fingerprinted_names.insert(record.fingerprinted_name());
                Ok(&*entry.insert(record))
            }
        }
    }

    /// Where a file lives right now, accounting for assets this run renamed.
    ///
    /// Referencing files can themselves be assets (a stylesheet with `url()`
    /// references), so they may have moved since the file list was built.
    pub fn current_path(&self, path: &Path) -> PathBuf {
        self.records
            .values()
            .find(|record| {
                record.resolved_path == path && self.renamed.contains(&record.original_name)
            })
            .map(FingerprintRecord::fingerprinted_path)
            .unwrap_or_else(|| path.to_path_buf())
    }

    /// Fingerprinted name to original name for every non-identity record.
    pub fn revert_mapping(&self) -> Vec<(String, String)> {
        self.records()
            .into_iter()
            .filter(|record| !record.is_identity())
            .map(|record| (record.fingerprinted_name(), record.original_name.clone()))
            .collect()
    }
}
