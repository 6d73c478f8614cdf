//! Per-item cycle snapshots: `<paths.state>/issue-<n>.json`, overwritten on
//! every run.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::models::CycleResult;

pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, item: u64) -> PathBuf {
        self.dir.join(format!("issue-{}.json", item))
    }

    /// Write the snapshot via a temp file and rename, so a crash never leaves
    /// a torn record.
    pub fn save(&self, result: &CycleResult) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create state directory: {}", self.dir.display()))?;

        let path = self.path_for(result.item);
        let tmp = self.dir.join(format!(".issue-{}.json.tmp", result.item));
        let json = serde_json::to_string_pretty(result).context("Failed to serialize cycle result")?;

        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(json.as_bytes())
            .context("Failed to write state snapshot")?;
        file.sync_all().context("Failed to flush state snapshot")?;
        drop(file);

        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move snapshot into place: {}", path.display()))?;
        info!(issue = result.item, path = %path.display(), "Saved state");
        Ok(path)
    }

    /// Read a snapshot back. `None` when the item has never been run.
    pub fn load(&self, item: u64) -> Result<Option<CycleResult>> {
        let path = self.path_for(item);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn read(path: &Path) -> Result<CycleResult> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state snapshot {}", path.display()))
    }
}
