use crate::report::Reports;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORTS_FILE: &str = "reports.json";

/// Writes the whole report mapping to `dir/reports.json`, keyed by report id.
pub fn write_reports(dir: &Path, reports: &Reports) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(REPORTS_FILE);
    let json = serde_json::to_string_pretty(reports).context("failed to serialize reports")?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), reports = reports.len(), "wrote reports");
    Ok(path)
}
