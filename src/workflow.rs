//! Run orchestration: forward pass, downstream steps, unconditional revert.
use crate::cli::{RunArgs, ScanArgs, SelectionArgs};
use crate::config::{
    build_steps, load_config, resolve_settings, FileSetConfig, FingerprintConfig,
    FingerprintSettings, DEFAULT_CONFIG_FILE,
};
use crate::fileset::FileSet;
use crate::report::{print_run_report, print_scan_report, RunReport};
use crate::rewrite::AssetResolver;
use crate::scan::scan_references;
use crate::session::FingerprintSession;
use crate::steps::{run_steps, ShellStep, Step};
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};

pub fn run_fingerprint(args: RunArgs) -> Result<()> {
    let (mut config, base_dir) = load_selection(&args.selection)?;
    if args.disable {
        config.enabled = false;
    }
    let settings = resolve_settings(&config, &base_dir)?;
    let mut steps = build_steps(&config, &base_dir);
    if !args.command.is_empty() {
        steps.push(Box::new(ShellStep::from_argv(&args.command, None)));
    }
    let report = execute(&settings, &steps)?;
    print_run_report(&report, args.json)
}

pub fn run_scan(args: ScanArgs) -> Result<()> {
    let (mut config, base_dir) = load_selection(&args.selection)?;
    config.enabled = true;
    let settings = resolve_settings(&config, &base_dir)?;
    let files = collect_files(&settings.filesets)?;
    let report = scan_references(&settings, &files)?;
    print_scan_report(&report, args.json)
}

/// Run the forward pass, the downstream steps and the revert pass.
///
/// Once scanning starts the revert pass always runs, whether scanning or a
/// step failed. The first failure (scan, then steps, then revert) becomes the
/// run's error.
pub fn execute(settings: &FingerprintSettings, steps: &[Box<dyn Step>]) -> Result<RunReport> {
    tracing::info!(enabled = settings.enabled, "fingerprinting enabled");
    if !settings.enabled {
        tracing::info!("executing downstream steps");
        let steps_run = run_steps(steps)?;
        return Ok(RunReport::disabled(steps_run));
    }

    let files = collect_files(&settings.filesets)?;
    tracing::info!(
        docroot = %settings.docroot.display(),
        extensions = ?settings.extensions.as_slice(),
        files = files.len(),
        "starting fingerprinting of used static resources"
    );
    let resolver = AssetResolver {
        docroot: &settings.docroot,
        extensions: &settings.extensions,
        source: &settings.source,
    };
    let mut session = FingerprintSession::begin(resolver, files);
    let scanned = session.scan();
    let built = match &scanned {
        Ok(()) => {
            session.log_resources();
            tracing::info!("executing downstream steps");
            run_steps(steps)
        }
        Err(_) => Ok(0),
    };
    let summary = session.finish();

    scanned.context("fingerprinting references failed")?;
    let steps_run = built?;
    if !summary.revert_failures.is_empty() {
        return Err(anyhow!(
            "{} revert operation(s) failed; the tree was not fully restored",
            summary.revert_failures.len()
        ));
    }
    Ok(RunReport::from_summary(&summary, steps_run))
}

/// Every included file across all file sets, in set order, without repeats.
///
/// All sets are listed before anything is touched, so an unreadable root
/// fails the run with the tree unchanged.
pub fn collect_files(filesets: &[FileSet]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for set in filesets {
        let resolved = set.resolved_files()?;
        tracing::debug!(
            dir = %set.dir().display(),
            files = resolved.len(),
            "listed file set"
        );
        for file in resolved {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }
    Ok(files)
}

/// Load the config (explicit, or `./fingerprint.json` when present) and apply
/// CLI overrides. Returns the config and the directory its paths resolve in.
fn load_selection(selection: &SelectionArgs) -> Result<(FingerprintConfig, PathBuf)> {
    let cwd = env::current_dir().context("resolve current directory")?;
    let config_path = match &selection.config {
        Some(path) => Some(cwd.join(path)),
        None => Some(cwd.join(DEFAULT_CONFIG_FILE)).filter(|path| path.is_file()),
    };
    let (mut config, base_dir) = match config_path {
        Some(path) => {
            let config = load_config(&path)?;
            let base_dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.clone());
            tracing::debug!(path = %path.display(), "loaded config");
            (config, base_dir)
        }
        None => (FingerprintConfig::default(), cwd.clone()),
    };

    if let Some(docroot) = &selection.docroot {
        config.docroot = Some(cwd.join(docroot));
    }
    if let Some(extensions) = &selection.extensions {
        config.extensions = extensions.clone();
    }
    if let Some(version) = &selection.file_version {
        config.file_version = Some(version.clone());
    }
    if let Some(dir) = &selection.dir {
        config.filesets.push(FileSetConfig {
            dir: cwd.join(dir),
            include: selection.include.clone(),
            exclude: selection.exclude.clone(),
        });
    }
    Ok((config, base_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerprintSource;
    use crate::reference::Extensions;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::rc::Rc;

    const PAGE: &str =
        "<link href=\"style.css\">\n<link href=\"style.css\">\n<img src=\"logo.js\">\n";

    struct Site {
        dir: tempfile::TempDir,
    }

    impl Site {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("create temp dir");
            fs::write(dir.path().join("style.css"), "body {}\n").expect("write style");
            fs::write(dir.path().join("logo.js"), "1").expect("write logo");
            fs::write(dir.path().join("index.html"), PAGE).expect("write page");
            Site { dir }
        }

        fn settings(&self, enabled: bool, version: Option<&str>) -> FingerprintSettings {
            FingerprintSettings {
                enabled,
                docroot: self.dir.path().to_path_buf(),
                extensions: Extensions::parse("css"),
                source: FingerprintSource::from_version(version),
                filesets: vec![FileSet::new(
                    self.dir.path().to_path_buf(),
                    vec!["*.html".to_string()],
                    Vec::new(),
                )],
            }
        }

        fn page(&self) -> String {
            fs::read_to_string(self.dir.path().join("index.html")).expect("read page")
        }
    }

    /// Captures what the tree looked like while the step ran.
    struct Observe {
        root: PathBuf,
        seen: Rc<RefCell<Option<String>>>,
        fail: bool,
    }

    impl Step for Observe {
        fn name(&self) -> &str {
            "observe"
        }

        fn run(&self) -> Result<()> {
            let page = fs::read_to_string(self.root.join("index.html"))?;
            *self.seen.borrow_mut() = Some(page);
            if self.fail {
                return Err(anyhow!("packaging failed"));
            }
            Ok(())
        }
    }

    struct Count(Rc<Cell<usize>>);

    impl Step for Count {
        fn name(&self) -> &str {
            "count"
        }

        fn run(&self) -> Result<()> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn steps_see_fingerprinted_tree_and_tree_is_restored() {
        let site = Site::new();
        let seen = Rc::new(RefCell::new(None));
        let steps: Vec<Box<dyn Step>> = vec![Box::new(Observe {
            root: site.dir.path().to_path_buf(),
            seen: Rc::clone(&seen),
            fail: false,
        })];

        let report = execute(&site.settings(true, Some("v7")), &steps).expect("run");

        let during = seen.borrow().clone().expect("step ran");
        assert_eq!(during.matches("href=\"stylev7.css\"").count(), 2);
        assert!(during.contains("<img src=\"logo.js\">"));
        assert_eq!(site.page(), PAGE);
        assert!(site.dir.path().join("style.css").is_file());
        assert!(!site.dir.path().join("stylev7.css").exists());
        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.resources[0].fingerprinted_name, "stylev7.css");
        assert_eq!(report.files_rewritten, 1);
        assert_eq!(report.files_restored, 1);
        assert_eq!(report.steps_run, 1);
    }

    #[test]
    fn failing_step_still_reverts_and_fails_the_run() {
        let site = Site::new();
        let seen = Rc::new(RefCell::new(None));
        let count = Rc::new(Cell::new(0));
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(Observe {
                root: site.dir.path().to_path_buf(),
                seen: Rc::clone(&seen),
                fail: true,
            }),
            Box::new(Count(Rc::clone(&count))),
        ];

        let err = execute(&site.settings(true, None), &steps).expect_err("step fails");
        assert!(format!("{err:#}").contains("packaging failed"));
        assert_eq!(count.get(), 0);
        assert!(seen.borrow().as_deref().is_some_and(|page| page != PAGE));
        assert_eq!(site.page(), PAGE);
        assert!(site.dir.path().join("style.css").is_file());
    }

    #[test]
    fn disabled_run_only_executes_steps() {
        let site = Site::new();
        let count = Rc::new(Cell::new(0));
        let steps: Vec<Box<dyn Step>> = vec![Box::new(Count(Rc::clone(&count)))];
        let mut settings = site.settings(false, Some("v7"));
        // Disabled runs never list file sets, so a broken one is harmless.
        settings.filesets = vec![FileSet::new(
            site.dir.path().join("missing"),
            Vec::new(),
            Vec::new(),
        )];

        let report = execute(&settings, &steps).expect("run");
        assert!(!report.enabled);
        assert_eq!(report.steps_run, 1);
        assert_eq!(count.get(), 1);
        assert_eq!(site.page(), PAGE);
        assert!(!site.dir.path().join("stylev7.css").exists());
    }

    #[test]
    fn unreadable_file_set_fails_before_any_mutation() {
        let site = Site::new();
        let count = Rc::new(Cell::new(0));
        let steps: Vec<Box<dyn Step>> = vec![Box::new(Count(Rc::clone(&count)))];
        let mut settings = site.settings(true, Some("v7"));
        settings.filesets.push(FileSet::new(
            site.dir.path().join("missing"),
            Vec::new(),
            Vec::new(),
        ));

        assert!(execute(&settings, &steps).is_err());
        assert_eq!(count.get(), 0);
        assert_eq!(site.page(), PAGE);
        assert!(site.dir.path().join("style.css").is_file());
    }

    #[test]
    fn collect_files_dedupes_across_sets() {
        let site = Site::new();
        let set = FileSet::new(site.dir.path().to_path_buf(), Vec::new(), Vec::new());
        let files = collect_files(&[set.clone(), set]).expect("collect");
        assert_eq!(files.len(), 3);
    }
}
