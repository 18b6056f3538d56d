//! Run and scan reports, printed as text or JSON on stdout.
use crate::reference::ReferenceShape;
use crate::session::SessionSummary;
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceEntry {
    pub path: String,
    pub original_name: String,
    pub fingerprint: String,
    pub fingerprinted_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub enabled: bool,
    pub resources: Vec<ResourceEntry>,
    pub files_rewritten: usize,
    pub files_restored: usize,
    pub steps_run: usize,
    pub revert_failures: Vec<FailureEntry>,
}

impl RunReport {
    pub fn disabled(steps_run: usize) -> Self {
        RunReport {
            enabled: false,
            resources: Vec::new(),
            files_rewritten: 0,
            files_restored: 0,
            steps_run,
            revert_failures: Vec::new(),
        }
    }

    pub fn from_summary(summary: &SessionSummary, steps_run: usize) -> Self {
        RunReport {
            enabled: true,
            resources: summary
                .records
                .iter()
                .map(|record| ResourceEntry {
                    path: record.resolved_path().display().to_string(),
                    original_name: record.original_name().to_string(),
                    fingerprint: record.fingerprint().to_string(),
                    fingerprinted_name: record.fingerprinted_name(),
                })
                .collect(),
            files_rewritten: summary.files_rewritten,
            files_restored: summary.files_restored,
            steps_run,
            revert_failures: summary
                .revert_failures
                .iter()
                .map(|failure| FailureEntry {
                    path: failure.path.display().to_string(),
                    error: failure.error.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedReference {
    pub shape: ReferenceShape,
    pub url: String,
    pub fingerprinted_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedFile {
    pub path: String,
    pub references: Vec<ScannedReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files: Vec<ScannedFile>,
}

pub fn print_run_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    if !report.enabled {
        println!("fingerprinting disabled; ran {} step(s)", report.steps_run);
        return Ok(());
    }
    println!(
        "fingerprinted {} resource(s), rewrote {} file(s), restored {} file(s), ran {} step(s)",
        report.resources.len(),
        report.files_rewritten,
        report.files_restored,
        report.steps_run
    );
    for resource in &report.resources {
        println!("  {} -> {}", resource.path, resource.fingerprinted_name);
    }
    Ok(())
}

pub fn print_scan_report(report: &ScanReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    for file in &report.files {
        if file.references.is_empty() {
            continue;
        }
        println!("{}", file.path);
        for reference in &file.references {
            println!(
                "  [{}] {} -> {}",
                reference.shape.label(),
                reference.url,
                reference.fingerprinted_url
            );
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize report")?;
    println!("{text}");
    Ok(())
}
