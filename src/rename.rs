//! Physical renames of fingerprinted assets and their inverse.
use crate::cache::FingerprintRecord;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// Move the asset to its fingerprinted name in the same directory.
///
/// Returns `Ok(false)` without touching the disk when the fingerprinted name
/// is the original name. An existing file at the fingerprinted name is never
/// overwritten.
pub fn rename_to_fingerprint(record: &FingerprintRecord) -> Result<bool> {
    if record.is_identity() {
        return Ok(false);
    }
    let source = record.resolved_path();
    let dest = record.fingerprinted_path();
    if dest.exists() {
        return Err(anyhow!(
            "cannot rename {}: {} already exists",
            source.display(),
            dest.display()
        ));
    }
    tracing::debug!(
        from = %source.display(),
        to = %dest.display(),
        "renaming resource"
    );
    fs::rename(source, &dest)
        .with_context(|| format!("rename {} to {}", source.display(), dest.display()))?;
    remove_leftover(source)?;
    Ok(true)
}

/// Move the fingerprinted asset back to its original name.
pub fn restore_original_name(record: &FingerprintRecord) -> Result<()> {
    if record.is_identity() {
        return Ok(());
    }
    let source = record.fingerprinted_path();
    let dest = record.resolved_path();
    if !source.exists() {
        return Err(anyhow!(
            "fingerprinted resource {} is missing",
            source.display()
        ));
    }
    tracing::debug!(
        from = %source.display(),
        to = %dest.display(),
        "restoring resource name"
    );
    fs::rename(&source, dest)
        .with_context(|| format!("rename {} to {}", source.display(), dest.display()))?;
    remove_leftover(&source)
}

// Renames that fall back to copying leave the source behind.
fn remove_leftover(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(dir: &Path, name: &str, fingerprint: &str) -> FingerprintRecord {
        FingerprintRecord::new(name, fingerprint.to_string(), &dir.join(name))
    }

    #[test]
    fn rename_and_restore_round_trip() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("app.js"), b"let a = 1;").expect("write asset");
        let record = record(dir.path(), "app.js", "99");

        assert!(rename_to_fingerprint(&record).expect("rename"));
        assert!(!dir.path().join("app.js").exists());
        assert_eq!(
            std::fs::read(dir.path().join("app99.js")).expect("read renamed"),
            b"let a = 1;"
        );

        restore_original_name(&record).expect("restore");
        assert!(dir.path().join("app.js").is_file());
        assert!(!dir.path().join("app99.js").exists());
    }

    #[test]
    fn identity_records_never_touch_the_asset() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("app.js"), b"x").expect("write asset");
        let record = record(dir.path(), "app.js", "");

        assert!(!rename_to_fingerprint(&record).expect("identity rename"));
        restore_original_name(&record).expect("identity restore");
        assert!(dir.path().join("app.js").is_file());
    }

    #[test]
    fn rename_refuses_to_overwrite_an_asset_with_the_fingerprinted_name() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("a.css"), b"a").expect("write asset");
        std::fs::write(dir.path().join("a1.css"), b"a1").expect("write other asset");
        let record = record(dir.path(), "a.css", "1");

        let err = rename_to_fingerprint(&record).expect_err("name collision");
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read(dir.path().join("a.css")).expect("read a"), b"a");
        assert_eq!(std::fs::read(dir.path().join("a1.css")).expect("read a1"), b"a1");
    }

    #[test]
    fn restore_reports_missing_fingerprinted_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let record = record(dir.path(), "app.js", "99");
        let err = restore_original_name(&record).expect_err("missing file");
        assert!(err.to_string().contains("app99.js"));
    }
}
