//! Textual rewriting of asset references, forward and back.
//!
//! Files are read and written whole. A file is written back only when its
//! length changed, so a rewrite that happens to preserve length is skipped.
use crate::cache::FingerprintCache;
use crate::fingerprint::FingerprintSource;
use crate::reference::{extract, Extensions, ReferenceShape};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// What the forward pass needs to turn a URL into a fingerprint record.
#[derive(Debug, Clone, Copy)]
pub struct AssetResolver<'a> {
    pub docroot: &'a Path,
    pub extensions: &'a Extensions,
    pub source: &'a FingerprintSource,
}

impl AssetResolver<'_> {
    /// Locate the asset a URL points at under the document root.
    ///
    /// The URL path is joined onto the docroot with leading `/`, `.` and `..`
    /// segments dropped. When nothing exists there the bare file name directly
    /// under the docroot is tried, which is how flat asset trees resolve.
    pub fn resolve(&self, url: &str) -> PathBuf {
        let relative: PathBuf = Path::new(url)
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => Some(segment),
                _ => None,
            })
            .collect();
        let candidate = self.docroot.join(&relative);
        if candidate.exists() {
            return candidate;
        }
        let flat = relative
            .file_name()
            .map(|name| self.docroot.join(name))
            .filter(|path| path.exists());
        flat.unwrap_or(candidate)
    }
}

/// Rewrite every candidate reference in `text` to its fingerprinted name.
///
/// Shapes are applied in a fixed order, each over the output of the last.
pub fn fingerprint_references(
    text: &str,
    resolver: &AssetResolver<'_>,
    cache: &mut FingerprintCache,
) -> Result<String> {
    let mut buffer = text.to_string();
    for shape in ReferenceShape::ALL {
        buffer = rewrite_shape(&buffer, shape, resolver, cache)?;
    }
    Ok(buffer)
}

fn rewrite_shape(
    text: &str,
    shape: ReferenceShape,
    resolver: &AssetResolver<'_>,
    cache: &mut FingerprintCache,
) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for reference in extract(text, shape) {
        if !resolver.extensions.is_replaceable(reference.url) {
            continue;
        }
        let name = reference.file_name();
        if cache.is_fingerprinted_name(name) {
            continue;
        }
        let resolved = cache
            .get(name)
            .map(|record| record.resolved_path().to_path_buf())
            .unwrap_or_else(|| resolver.resolve(reference.url));
        let replacement = cache
            .ensure(name, &resolved, resolver.source)?
            .fingerprinted_name();
        tracing::trace!(
            shape = shape.label(),
            from = name,
            to = %replacement,
            "replacing reference"
        );
        let directory = &reference.url[..reference.url.len() - name.len()];
        out.push_str(&text[last..reference.span.start]);
        out.push_str(reference.prefix);
        out.push_str(directory);
        out.push_str(&replacement);
        out.push_str(reference.suffix);
        last = reference.span.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Replace every fingerprinted name with its original name.
///
/// The names are disjoint literals, so the order of `mapping` does not matter.
pub fn restore_references(text: &str, mapping: &[(String, String)]) -> String {
    mapping
        .iter()
        .fold(text.to_string(), |buffer, (fingerprinted, original)| {
            buffer.replace(fingerprinted.as_str(), original)
        })
}

/// Forward pass over one referencing file. Returns whether it was written.
pub fn fingerprint_file(
    path: &Path,
    resolver: &AssetResolver<'_>,
    cache: &mut FingerprintCache,
) -> Result<bool> {
    let current = cache.current_path(path);
    tracing::debug!(path = %current.display(), "scanning for references");
    let Some(contents) = read_text(&current)? else {
        return Ok(false);
    };
    let rewritten = fingerprint_references(&contents, resolver, cache)?;
    if rewritten.len() == contents.len() {
        return Ok(false);
    }
    // The file may have been renamed while its own references were resolved.
    write_text(&cache.current_path(path), &rewritten)?;
    Ok(true)
}

/// Revert pass over one referencing file. Returns whether it was written.
pub fn restore_file(
    path: &Path,
    mapping: &[(String, String)],
    cache: &FingerprintCache,
) -> Result<bool> {
    let current = cache.current_path(path);
    let Some(contents) = read_text(&current)? else {
        return Ok(false);
    };
    let restored = restore_references(&contents, mapping);
    if restored.len() == contents.len() {
        return Ok(false);
    }
    write_text(&current, &restored)?;
    Ok(true)
}

/// Read a referencing file as UTF-8 text.
///
/// Binary files (images, fonts) can sit in an include-all file set. They hold
/// no references and are never rewritten, so they yield `None` instead of an
/// error.
pub fn read_text(path: &Path) -> Result<Option<String>> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            tracing::debug!(path = %path.display(), "skipping non-UTF-8 file");
            Ok(None)
        }
    }
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    tracing::debug!(path = %path.display(), "writing file");
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod tests;
