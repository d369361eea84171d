//! Volume, snapshot and image reference graph
//!
//! For every snapshot the resolver records:
//!
//! - whether its source volume still exists
//! - which existing volumes were created from it (its descendants)
//! - whether an image's block-device mapping uses it
//! - whether it carries the protection tag
//! - whether a newer snapshot of the same volume supersedes it
//!
//! Superseded ("point-in-time") snapshots are computed per existing volume:
//! the volume's snapshots are ordered newest first with a stable sort, the
//! first is kept and every other one is superseded. Equal start times keep the
//! provider's listing order, so the earlier-listed snapshot wins the tie.

use super::Policy;
use ebs_janitor_common::{ImageRecord, SnapshotId, SnapshotRecord, VolumeId, VolumeRecord};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Derived reference facts for one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageFact {
    pub snapshot_id: SnapshotId,
    pub has_source_volume: bool,
    pub descendant_volume_ids: BTreeSet<VolumeId>,
    pub is_ami_referenced: bool,
    pub is_protected: bool,
    pub is_superseded: bool,
}

impl LineageFact {
    /// At least one existing volume was created from this snapshot
    pub fn is_active_source(&self) -> bool {
        !self.descendant_volume_ids.is_empty()
    }

    /// Source volume is gone and nothing derives from the snapshot
    pub fn is_orphan(&self) -> bool {
        !self.has_source_volume && !self.is_active_source()
    }
}

/// Lineage facts for every snapshot, in listing order
#[derive(Debug, Clone, Default)]
pub struct Lineage {
    facts: Vec<LineageFact>,
    index: HashMap<SnapshotId, usize>,
}

impl Lineage {
    pub fn facts(&self) -> &[LineageFact] {
        &self.facts
    }

    pub fn fact(&self, snapshot_id: &SnapshotId) -> Option<&LineageFact> {
        self.index.get(snapshot_id).map(|&i| &self.facts[i])
    }

    /// Superseded point-in-time snapshots before any exclusion
    pub fn superseded(&self) -> impl Iterator<Item = &LineageFact> {
        self.facts.iter().filter(|f| f.is_superseded)
    }

    pub fn orphans(&self) -> impl Iterator<Item = &LineageFact> {
        self.facts.iter().filter(|f| f.is_orphan())
    }

    pub fn active_sources(&self) -> impl Iterator<Item = &LineageFact> {
        self.facts.iter().filter(|f| f.is_active_source())
    }

    pub fn ami_referenced(&self) -> impl Iterator<Item = &LineageFact> {
        self.facts.iter().filter(|f| f.is_ami_referenced)
    }
}

/// Build lineage facts from one inventory
pub fn resolve(
    volumes: &[VolumeRecord],
    snapshots: &[SnapshotRecord],
    images: &[ImageRecord],
    policy: &Policy,
) -> Lineage {
    let existing_volumes: HashSet<&VolumeId> = volumes.iter().map(|v| &v.volume_id).collect();

    let mut descendants: HashMap<&SnapshotId, BTreeSet<VolumeId>> = HashMap::new();
    for volume in volumes {
        if let Some(source) = &volume.source_snapshot {
            descendants
                .entry(source)
                .or_default()
                .insert(volume.volume_id.clone());
        }
    }

    let ami_snapshots: HashSet<&SnapshotId> = images
        .iter()
        .flat_map(|image| image.snapshot_ids.iter())
        .collect();

    let superseded = superseded_snapshots(&existing_volumes, snapshots);

    let mut lineage = Lineage::default();
    for snapshot in snapshots {
        let id = &snapshot.snapshot_id;
        if lineage.index.contains_key(id) {
            continue;
        }
        lineage.index.insert(id.clone(), lineage.facts.len());
        lineage.facts.push(LineageFact {
            snapshot_id: id.clone(),
            has_source_volume: existing_volumes.contains(&snapshot.volume_id),
            descendant_volume_ids: descendants.get(id).cloned().unwrap_or_default(),
            is_ami_referenced: ami_snapshots.contains(id),
            is_protected: policy.is_protected(&snapshot.tags),
            is_superseded: superseded.contains(id),
        });
    }
    lineage
}

/// Every snapshot of an existing volume except that volume's newest
fn superseded_snapshots<'a>(
    existing_volumes: &HashSet<&VolumeId>,
    snapshots: &'a [SnapshotRecord],
) -> HashSet<&'a SnapshotId> {
    let mut by_volume: HashMap<&VolumeId, Vec<&SnapshotRecord>> = HashMap::new();
    for snapshot in snapshots {
        if existing_volumes.contains(&snapshot.volume_id) {
            by_volume
                .entry(&snapshot.volume_id)
                .or_default()
                .push(snapshot);
        }
    }

    by_volume
        .into_values()
        .flat_map(|mut group| {
            group.sort_by(|a, b| b.start_time.cmp(&a.start_time));
            group.into_iter().skip(1).map(|s| &s.snapshot_id)
        })
        .collect()
}
