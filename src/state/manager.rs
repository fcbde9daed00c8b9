//! StateManager - annexes_state.json CRUD operations

use crate::models::Annex;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Freshness markers keyed by annex identifier
///
/// Values are kept as raw JSON so entries this tool does not own survive a
/// load/save cycle untouched.
pub struct StateManager {
    path: PathBuf,
    markers: BTreeMap<String, Value>,
}

impl StateManager {
    /// Load state from `path`, or start empty if the file does not exist
    ///
    /// A malformed file is reported and read as empty. The file itself is left
    /// where it is.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let markers = match read_markers(&path)? {
            Ok(markers) => markers,
            Err(e) => {
                warn!("Failed to parse {}: {}. Treating it as empty.", path.display(), e);
                BTreeMap::new()
            }
        };
        Ok(Self { path, markers })
    }

    /// Like [`StateManager::load`], but a malformed file is moved aside to
    /// `<name>.bak` before starting fresh
    pub fn load_or_recover(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let markers = match read_markers(&path)? {
            Ok(markers) => markers,
            Err(e) => {
                let backup = backup_path(&path);
                warn!(
                    "Failed to parse {}: {}. Moving it to {} and starting fresh.",
                    path.display(),
                    e,
                    backup.display()
                );
                std::fs::rename(&path, &backup)
                    .with_context(|| format!("Failed to back up {}", path.display()))?;
                BTreeMap::new()
            }
        };
        Ok(Self { path, markers })
    }

    /// Write state to disk (temp file + fsync + rename)
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let content = self.to_json()?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write state")?;
        tmp.as_file().sync_all().context("Failed to flush state")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Pretty JSON, keys sorted, trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut content =
            serde_json::to_string_pretty(&self.markers).context("Failed to serialize state")?;
        content.push('\n');
        Ok(content)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Markers
    // =========================================================================

    /// Last recorded marker for an annex
    pub fn marker(&self, annex: Annex) -> Option<&str> {
        self.markers.get(annex.id()).and_then(Value::as_str)
    }

    /// Record a new marker for an annex
    pub fn record(&mut self, annex: Annex, marker: impl Into<String>) {
        self.markers
            .insert(annex.id().to_string(), Value::String(marker.into()));
    }

    /// Every entry, including keys that are not annex identifiers
    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.markers
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Outer error: the file could not be read. Inner error: it is not a JSON object.
fn read_markers(
    path: &Path,
) -> Result<std::result::Result<BTreeMap<String, Value>, serde_json::Error>> {
    if !path.exists() {
        return Ok(Ok(BTreeMap::new()));
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&content))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state".into());
    name.push(".bak");
    path.with_file_name(name)
}
