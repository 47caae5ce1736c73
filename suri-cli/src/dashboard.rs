//! Widget loading from filesystem
//!
//! A dashboard is a directory of widget directories. Each widget directory
//! contains the script (`widget.js`) and a manifest (`widget.yaml`) naming
//! the widget, its refresh interval, and its stored configuration values.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use suri_core::WidgetInstance;
use thiserror::Error;
use tracing::debug;

/// Script file name inside a widget directory
const SCRIPT_FILE: &str = "widget.js";

/// Manifest file name inside a widget directory
const MANIFEST_FILE: &str = "widget.yaml";

/// Errors that can occur when loading widgets
#[derive(Error, Debug)]
pub enum DashboardLoadError {
    #[error("Widget not found at path: {0}")]
    NotFound(String),

    #[error("Invalid widget structure: {0}")]
    InvalidStructure(String),

    #[error("Missing required file: {0}")]
    MissingFile(String),

    #[error("File read error: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Manifest parse error: {0}")]
    ManifestError(#[from] serde_yaml::Error),
}

/// Widget manifest structure
#[derive(Debug, Deserialize)]
pub struct WidgetManifest {
    /// Human-readable widget name
    pub name: String,

    /// Refresh interval in seconds; the scheduler default applies if absent
    pub refresh_interval: Option<u64>,

    /// Stored configuration values, keyed by declared variable name
    #[serde(default)]
    pub config: HashMap<String, String>,
}

/// Load one widget directory into an instance
pub fn load_widget(
    dir: &Path,
    default_refresh: Duration,
) -> Result<WidgetInstance, DashboardLoadError> {
    if !dir.exists() {
        return Err(DashboardLoadError::NotFound(dir.display().to_string()));
    }
    if !dir.is_dir() {
        return Err(DashboardLoadError::InvalidStructure(
            "widget path must be a directory".to_string(),
        ));
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(DashboardLoadError::MissingFile(MANIFEST_FILE.to_string()));
    }
    let manifest: WidgetManifest = serde_yaml::from_str(&fs::read_to_string(&manifest_path)?)?;

    let script_path = dir.join(SCRIPT_FILE);
    if !script_path.exists() {
        return Err(DashboardLoadError::MissingFile(SCRIPT_FILE.to_string()));
    }
    let script = fs::read_to_string(&script_path)?;

    let refresh_interval = manifest
        .refresh_interval
        .map(Duration::from_secs)
        .unwrap_or(default_refresh);

    debug!(
        "Loaded widget '{}' from {} ({:?} refresh)",
        manifest.name,
        dir.display(),
        refresh_interval
    );

    Ok(WidgetInstance::new(manifest.name, script, refresh_interval).with_config(manifest.config))
}

/// Load every widget directory under a dashboard directory.
///
/// Subdirectories without a `widget.js` are skipped; a directory that looks
/// like a widget but fails to load is an error.
pub fn load_dashboard(
    dir: &Path,
    default_refresh: Duration,
) -> Result<Vec<WidgetInstance>, DashboardLoadError> {
    if !dir.is_dir() {
        return Err(DashboardLoadError::NotFound(dir.display().to_string()));
    }

    let mut instances = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if !path.is_dir() || !path.join(SCRIPT_FILE).exists() {
            continue;
        }
        instances.push(load_widget(&path, default_refresh)?);
    }

    Ok(instances)
}
