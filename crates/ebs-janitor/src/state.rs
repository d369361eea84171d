//! Persisted pending-deletion state
//!
//! Two JSON files, one per resource kind, each an array of
//! `{ "<IdField>": "...", "DeletionTime": <unix secs> }`. A missing or
//! unreadable file loads as an empty state: eligibility is recomputed from the
//! live inventory every run, so the only loss is restarted grace periods.
//! Writes go to a temp file in the same directory which then replaces the
//! target, so an interrupted run leaves the previous state intact.

use crate::config::JanitorConfig;
use anyhow::{Context, Result};
use ebs_janitor_common::{PendingDeletion, ResourceId, SnapshotId, VolumeId};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Location of both state files
#[derive(Debug, Clone)]
pub struct StateStore {
    volumes_path: PathBuf,
    snapshots_path: PathBuf,
}

impl StateStore {
    pub fn new(volumes_path: impl Into<PathBuf>, snapshots_path: impl Into<PathBuf>) -> Self {
        Self {
            volumes_path: volumes_path.into(),
            snapshots_path: snapshots_path.into(),
        }
    }

    pub fn from_config(config: &JanitorConfig) -> Self {
        Self::new(config.volume_state_path(), config.snapshot_state_path())
    }

    pub fn volumes_path(&self) -> &Path {
        &self.volumes_path
    }

    pub fn snapshots_path(&self) -> &Path {
        &self.snapshots_path
    }

    pub fn load_volumes(&self) -> Vec<PendingDeletion<VolumeId>> {
        load_pending(&self.volumes_path)
    }

    pub fn load_snapshots(&self) -> Vec<PendingDeletion<SnapshotId>> {
        load_pending(&self.snapshots_path)
    }

    pub fn save_volumes(&self, records: &[PendingDeletion<VolumeId>]) -> Result<()> {
        save_pending(&self.volumes_path, records)
    }

    pub fn save_snapshots(&self, records: &[PendingDeletion<SnapshotId>]) -> Result<()> {
        save_pending(&self.snapshots_path, records)
    }

    /// Write both files, attempting the second even if the first fails
    pub fn save(
        &self,
        volumes: &[PendingDeletion<VolumeId>],
        snapshots: &[PendingDeletion<SnapshotId>],
    ) -> Result<()> {
        let volumes = self.save_volumes(volumes);
        let snapshots = self.save_snapshots(snapshots);
        volumes.and(snapshots)
    }
}

/// Load a state file, treating absence or corruption as empty
pub fn load_pending<I: ResourceId>(path: &Path) -> Vec<PendingDeletion<I>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No state file, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read state file, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(records) => records,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unparsable state file, starting empty");
            Vec::new()
        }
    }
}

/// Replace a state file in one step
pub fn save_pending<I: ResourceId>(path: &Path, records: &[PendingDeletion<I>]) -> Result<()> {
    let data = serde_json::to_vec(records).context("Failed to serialize pending state")?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create state directory: {}", parent.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(&data)
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync temp file for {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

    debug!(path = %path.display(), records = records.len(), "State file written");
    Ok(())
}
