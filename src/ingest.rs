use crate::error::HistoryError;
use crate::model::{EventLog, RawStreamRecord, StreamEvent};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub const DEFAULT_HISTORY_MARKER: &str = "endsong";

/// History files directly inside `root` whose name contains `marker`.
pub fn scan_history_folder(root: &Path, marker: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = entry.with_context(|| format!("failed to list {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_history_file(path, marker) {
            continue;
        }
        info!(path = %path.display(), "found history file");
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn is_history_file(path: &Path, marker: &str) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    name.contains(marker) && name.to_ascii_lowercase().ends_with(".json")
}

pub fn read_history_file(path: &Path) -> Result<Vec<RawStreamRecord>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<RawStreamRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(records)
}

/// Converts raw records, dropping the ones that fail validation.
///
/// Returns the usable events in input order and the number dropped.
pub fn collect_events<I>(records: I) -> (Vec<StreamEvent>, usize)
where
    I: IntoIterator<Item = RawStreamRecord>,
{
    let mut events = Vec::new();
    let mut dropped = 0_usize;
    for record in records {
        match StreamEvent::try_from(record) {
            Ok(event) => events.push(event),
            Err(err) => {
                let err = HistoryError::from(err);
                debug!(%err, "dropping stream record");
                dropped += 1;
            }
        }
    }
    (events, dropped)
}

/// Reads every history file under `root` into one ordered log.
pub fn load_history(root: &Path, marker: &str) -> Result<EventLog> {
    info!(root = %root.display(), "looking for history files");
    let files = scan_history_folder(root, marker)?;

    let mut records = Vec::new();
    for path in &files {
        records.extend(read_history_file(path)?);
    }

    let (events, dropped) = collect_events(records);
    let log = EventLog::new(events);
    info!(
        files = files.len(),
        entries = log.len(),
        dropped,
        "read streaming history"
    );
    Ok(log)
}
