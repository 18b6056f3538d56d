//! Fingerprint tokens for static resources.
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Chunk size used when streaming a resource through the checksum.
pub const CHECKSUM_BUFFER_SIZE: usize = 8 * 1024;

/// Where a run's fingerprint tokens come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintSource {
    /// CRC-32 of the resource bytes, rendered in decimal.
    Checksum,
    /// One caller-supplied token shared by every resource in the run.
    FixedVersion(String),
}

impl FingerprintSource {
    pub fn from_version(version: Option<&str>) -> Self {
        match version {
            Some(version) => FingerprintSource::FixedVersion(version.to_string()),
            None => FingerprintSource::Checksum,
        }
    }

    /// Compute the token for the resource at `resource`.
    ///
    /// A missing resource is not an error: it is reported and yields an empty
    /// token, so the reference passes through with its original name.
    pub fn fingerprint(&self, resource: &Path) -> Result<String> {
        match self {
            FingerprintSource::FixedVersion(version) => Ok(version.clone()),
            FingerprintSource::Checksum => {
                if !resource.is_file() {
                    tracing::warn!(
                        path = %resource.display(),
                        "resource does not exist to generate checksum"
                    );
                    return Ok(String::new());
                }
                let checksum = crc32_file(resource)?;
                Ok(checksum.to_string())
            }
        }
    }
}

/// Stream a file through CRC-32 (IEEE) in fixed-size chunks.
pub fn crc32_file(path: &Path) -> Result<u32> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; CHECKSUM_BUFFER_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("read {}", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize())
}
