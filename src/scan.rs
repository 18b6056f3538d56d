//! Read-only dry run: which references would be fingerprinted, and to what.
use crate::cache::fingerprinted_name;
use crate::config::FingerprintSettings;
use crate::reference::{extract, ReferenceShape};
use crate::report::{ScanReport, ScannedFile, ScannedReference};
use crate::rewrite::{read_text, AssetResolver};
use anyhow::Result;
use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;

/// List candidate references in `files` without renaming or writing anything.
///
/// Fingerprints are computed once per file name, as the forward pass would.
/// A URL already claimed by an earlier shape is not listed again.
pub fn scan_references(settings: &FingerprintSettings, files: &[PathBuf]) -> Result<ScanReport> {
    let resolver = AssetResolver {
        docroot: &settings.docroot,
        extensions: &settings.extensions,
        source: &settings.source,
    };
    let mut fingerprints: HashMap<String, String> = HashMap::new();
    let mut report = ScanReport::default();

    for file in files {
        let Some(text) = read_text(file)? else {
            continue;
        };
        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut references = Vec::new();
        for shape in ReferenceShape::ALL {
            for reference in extract(&text, shape) {
                if !settings.extensions.is_replaceable(reference.url) {
                    continue;
                }
                let start = reference.span.start + reference.prefix.len();
                let url_range = start..start + reference.url.len();
                if claimed
                    .iter()
                    .any(|range| range.start < url_range.end && url_range.start < range.end)
                {
                    continue;
                }
                claimed.push(url_range);

                let name = reference.file_name();
                let fingerprint = match fingerprints.get(name) {
                    Some(fingerprint) => fingerprint.clone(),
                    None => {
                        let fingerprint = settings
                            .source
                            .fingerprint(&resolver.resolve(reference.url))?;
                        fingerprints.insert(name.to_string(), fingerprint.clone());
                        fingerprint
                    }
                };
                let directory = &reference.url[..reference.url.len() - name.len()];
                references.push(ScannedReference {
                    shape,
                    url: reference.url.to_string(),
                    fingerprinted_url: format!(
                        "{directory}{}",
                        fingerprinted_name(name, &fingerprint)
                    ),
                });
            }
        }
        report.files.push(ScannedFile {
            path: file.display().to_string(),
            references,
        });
    }
    Ok(report)
}
