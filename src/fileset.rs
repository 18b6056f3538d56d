//! File sets: a base directory plus include/exclude globs.
use anyhow::{anyhow, Context, Result};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

/// Files to scan for references, selected by glob under one directory.
///
/// Globs use gitignore syntax. An empty include list selects every file;
/// excludes win over includes. Hidden files and `.gitignore` rules get no
/// special treatment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSet {
    dir: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl FileSet {
    pub fn new(dir: PathBuf, include: Vec<String>, exclude: Vec<String>) -> Self {
        FileSet {
            dir,
            include,
            exclude,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Included files as sorted paths relative to [`FileSet::dir`].
    pub fn included_files(&self) -> Result<Vec<PathBuf>> {
        let metadata = fs::metadata(&self.dir)
            .with_context(|| format!("read file set root {}", self.dir.display()))?;
        if !metadata.is_dir() {
            return Err(anyhow!(
                "file set root {} is not a directory",
                self.dir.display()
            ));
        }

        let mut overrides = OverrideBuilder::new(&self.dir);
        for glob in &self.include {
            overrides
                .add(glob)
                .with_context(|| format!("invalid include pattern {glob:?}"))?;
        }
        for glob in &self.exclude {
            overrides
                .add(&format!("!{glob}"))
                .with_context(|| format!("invalid exclude pattern {glob:?}"))?;
        }
        let overrides = overrides.build().context("build file set patterns")?;

        let walker = WalkBuilder::new(&self.dir)
            .standard_filters(false)
            .overrides(overrides)
            .build();
        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.with_context(|| format!("walk {}", self.dir.display()))?;
            if !entry.file_type().is_some_and(|kind| kind.is_file()) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.dir)
                .context("strip file set prefix")?;
            files.push(rel.to_path_buf());
        }
        files.sort();
        Ok(files)
    }

    /// Included files joined onto the base directory.
    pub fn resolved_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .included_files()?
            .into_iter()
            .map(|rel| self.dir.join(rel))
            .collect())
    }
}
