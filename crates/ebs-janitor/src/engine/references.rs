//! Instance reference tags
//!
//! Volumes and snapshots carry `RefInstanceName`/`RefInstanceId` so reports
//! can still name the owning instance after it is gone. Existing tags are
//! authoritative; missing ones are derived and queued as tag writes.

use ebs_janitor_common::records::tag_value;
use ebs_janitor_common::tags::{TAG_NAME, TAG_REF_INSTANCE_ID, TAG_REF_INSTANCE_NAME, UNKNOWN};
use ebs_janitor_common::{
    InstanceRecord, ResourceKind, SnapshotId, SnapshotRecord, Tags, VolumeId, VolumeRecord,
    VolumeState,
};
use std::collections::HashMap;
use std::fmt;

/// Instance a volume or snapshot belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub name: String,
    pub id: String,
}

impl InstanceRef {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            id: UNKNOWN.to_string(),
        }
    }

    /// Reference from existing tags; both must be present and non-empty
    fn from_tags(tags: &Tags) -> Option<Self> {
        Some(Self {
            name: tag_value(tags, TAG_REF_INSTANCE_NAME)?.to_string(),
            id: tag_value(tags, TAG_REF_INSTANCE_ID)?.to_string(),
        })
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Reference tags to write on one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUpdate {
    pub kind: ResourceKind,
    pub resource_id: String,
    pub reference: InstanceRef,
}

impl TagUpdate {
    pub fn tags(&self) -> Vec<(String, String)> {
        vec![
            (
                TAG_REF_INSTANCE_NAME.to_string(),
                self.reference.name.clone(),
            ),
            (TAG_REF_INSTANCE_ID.to_string(), self.reference.id.clone()),
        ]
    }
}

/// Resolved references plus the tag writes needed to persist them
#[derive(Debug, Clone, Default)]
pub struct References {
    volumes: HashMap<VolumeId, InstanceRef>,
    snapshots: HashMap<SnapshotId, InstanceRef>,
    pub updates: Vec<TagUpdate>,
}

impl References {
    pub fn volume(&self, volume_id: &VolumeId) -> Option<&InstanceRef> {
        self.volumes.get(volume_id)
    }

    pub fn snapshot(&self, snapshot_id: &SnapshotId) -> Option<&InstanceRef> {
        self.snapshots.get(snapshot_id)
    }
}

/// Resolve every volume's and snapshot's instance reference
///
/// Snapshots without their own tags inherit the (possibly just derived)
/// reference of their source volume.
pub fn plan_references(
    volumes: &[VolumeRecord],
    snapshots: &[SnapshotRecord],
    instances: &[InstanceRecord],
) -> References {
    let instance_names: HashMap<&str, &str> = instances
        .iter()
        .map(|i| {
            (
                i.instance_id.as_str(),
                tag_value(&i.tags, TAG_NAME).unwrap_or(UNKNOWN),
            )
        })
        .collect();

    let mut refs = References::default();

    for volume in volumes {
        let reference = match InstanceRef::from_tags(&volume.tags) {
            Some(existing) => existing,
            None => {
                let derived = attached_reference(volume, &instance_names);
                refs.updates.push(TagUpdate {
                    kind: ResourceKind::Volume,
                    resource_id: volume.volume_id.to_string(),
                    reference: derived.clone(),
                });
                derived
            }
        };
        refs.volumes.insert(volume.volume_id.clone(), reference);
    }

    for snapshot in snapshots {
        let reference = match InstanceRef::from_tags(&snapshot.tags) {
            Some(existing) => existing,
            None => {
                let derived = refs
                    .volumes
                    .get(&snapshot.volume_id)
                    .cloned()
                    .unwrap_or_else(InstanceRef::unknown);
                refs.updates.push(TagUpdate {
                    kind: ResourceKind::Snapshot,
                    resource_id: snapshot.snapshot_id.to_string(),
                    reference: derived.clone(),
                });
                derived
            }
        };
        refs.snapshots
            .insert(snapshot.snapshot_id.clone(), reference);
    }

    refs
}

fn attached_reference(
    volume: &VolumeRecord,
    instance_names: &HashMap<&str, &str>,
) -> InstanceRef {
    match (&volume.state, &volume.attached_instance) {
        (VolumeState::InUse, Some(instance_id)) => InstanceRef {
            name: instance_names
                .get(instance_id.as_str())
                .copied()
                .unwrap_or(UNKNOWN)
                .to_string(),
            id: instance_id.clone(),
        },
        _ => InstanceRef::unknown(),
    }
}
