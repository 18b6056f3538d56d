//! Shared test infrastructure for CLI integration tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Stylesheet body used across fixtures.
pub const STYLE: &str = "body { color: red; }\n";
/// CRC-32 of [`STYLE`], in decimal.
pub const STYLE_CRC: &str = "2833736074";

/// Page referencing the stylesheet twice and an image outside the allow-list.
pub const INDEX: &str = "<html>\n<head>\n\
<link rel=\"stylesheet\" href=\"css/site.css\">\n\
<link rel=\"stylesheet\" href=\"css/site.css\">\n\
</head>\n<body>\n<img src=\"img/logo.png\">\n</body>\n</html>\n";

/// A scratch site under `<tmp>/web`.
pub struct Site {
    pub dir: TempDir,
}

impl Site {
    pub fn new() -> Self {
        let site = Site {
            dir: tempfile::tempdir().expect("create temp dir"),
        };
        site.write("web/index.html", INDEX);
        site.write("web/css/site.css", STYLE);
        site.write("web/img/logo.png", "png bytes");
        site
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        self.write_bytes(rel, contents.as_bytes())
    }

    pub fn write_bytes(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).expect("read file")
    }

    /// Every file under `web/` with its bytes, keyed by relative path.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let web = self.root().join("web");
        let mut files = BTreeMap::new();
        collect(&web, &web, &mut files);
        files
    }

    /// Run the binary with `args` from the site root.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_fingerprint"))
            .args(args)
            .current_dir(self.root())
            .env_remove("RUST_LOG")
            .output()
            .expect("run fingerprint")
    }
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let rel = path.strip_prefix(root).expect("strip root").to_path_buf();
            files.insert(rel, fs::read(&path).expect("read file"));
        }
    }
}

/// Panic with both output streams when a run did not succeed.
#[allow(dead_code)]
pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "fingerprint failed: status={} stdout={} stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}
