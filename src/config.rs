use crate::ingest::DEFAULT_HISTORY_MARKER;
use crate::rank::DEFAULT_TOP_N;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const APP_DIR: &str = "tune-history";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_history_file_marker")]
    pub history_file_marker: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_history_file_marker() -> String {
    String::from(DEFAULT_HISTORY_MARKER)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            history_file_marker: default_history_file_marker(),
            output_dir: default_output_dir(),
        }
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("TUNE_HISTORY_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

/// Loads `settings.json` from the config root.
///
/// Defaults apply when the file is absent or no config root can be
/// resolved; a file that cannot be read, parsed or validated is an error.
pub fn load_settings() -> Result<Settings> {
    let path = match settings_path() {
        Ok(path) => path,
        Err(err) => {
            warn!("no config root, using default settings: {err:#}");
            return Ok(Settings::default());
        }
    };
    load_settings_from_path(&path)
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    if settings.top_n == 0 {
        bail!("top_n in settings file {} must be at least 1", path.display());
    }
    Ok(settings)
}
