//! Builders for inventory records
//!
//! ```
//! use ebs_janitor_test_utils::{at, snapshot, volume};
//!
//! let vol = volume("vol-1").available().created(at(0)).build();
//! let snap = snapshot("snap-1", "vol-1").started(at(1)).protected().build();
//! assert_eq!(snap.volume_id, vol.volume_id);
//! ```

use chrono::{DateTime, Duration, Utc};
use ebs_janitor_common::tags::{TAG_NAME, TAG_PROTECT_KEY, TAG_PROTECT_VALUE};
use ebs_janitor_common::{
    GroupPair, ImageRecord, IngressRule, InstanceRecord, SecurityGroupRecord, SnapshotId,
    SnapshotRecord, Tags, VolumeId, VolumeRecord, VolumeState,
};

/// Reference clock for scenarios: 2024-01-01T00:00:00Z
pub const T0: i64 = 1_704_067_200;

/// `T0 + secs`
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(T0 + secs, 0).unwrap()
}

/// `T0 + n days`
pub fn days(n: i64) -> DateTime<Utc> {
    at(0) + Duration::days(n)
}

/// Start building a volume (defaults: in-use, created at T0 - 30 days, untagged)
pub fn volume(id: &str) -> VolumeBuilder {
    VolumeBuilder {
        record: VolumeRecord {
            volume_id: VolumeId::new(id),
            state: VolumeState::InUse,
            create_time: days(-30),
            attached_instance: None,
            source_snapshot: None,
            tags: Tags::new(),
        },
    }
}

/// Start building a snapshot of `volume_id` (defaults: started at T0 - 30 days)
pub fn snapshot(id: &str, volume_id: &str) -> SnapshotBuilder {
    SnapshotBuilder {
        record: SnapshotRecord {
            snapshot_id: SnapshotId::new(id),
            volume_id: VolumeId::new(volume_id),
            start_time: days(-30),
            description: format!("Snapshot {id}"),
            tags: Tags::new(),
        },
    }
}

/// Image whose block devices use `snapshots`
pub fn image(id: &str, snapshots: &[&str]) -> ImageRecord {
    ImageRecord {
        image_id: id.to_string(),
        snapshot_ids: snapshots.iter().map(|s| SnapshotId::new(*s)).collect(),
    }
}

/// Instance with an optional `Name` tag
pub fn instance(id: &str, name: Option<&str>) -> InstanceRecord {
    let mut tags = Tags::new();
    if let Some(name) = name {
        tags.insert(TAG_NAME.to_string(), name.to_string());
    }
    InstanceRecord {
        instance_id: id.to_string(),
        tags,
    }
}

/// Security group whose single tcp/22 rule references `referenced_groups`
pub fn security_group(
    id: &str,
    description: &str,
    referenced_groups: &[&str],
) -> SecurityGroupRecord {
    let ingress = if referenced_groups.is_empty() {
        Vec::new()
    } else {
        vec![IngressRule {
            protocol: "tcp".to_string(),
            from_port: Some(22),
            to_port: Some(22),
            cidr_ranges: vec!["10.0.0.0/8".to_string()],
            group_pairs: referenced_groups
                .iter()
                .map(|g| GroupPair {
                    group_id: g.to_string(),
                    user_id: Some("123456789012".to_string()),
                })
                .collect(),
        }]
    };
    SecurityGroupRecord {
        group_id: id.to_string(),
        group_name: format!("{id}-name"),
        description: description.to_string(),
        ingress,
    }
}

pub struct VolumeBuilder {
    record: VolumeRecord,
}

impl VolumeBuilder {
    pub fn available(mut self) -> Self {
        self.record.state = VolumeState::Available;
        self.record.attached_instance = None;
        self
    }

    pub fn attached_to(mut self, instance_id: &str) -> Self {
        self.record.state = VolumeState::InUse;
        self.record.attached_instance = Some(instance_id.to_string());
        self
    }

    pub fn state(mut self, state: &str) -> Self {
        self.record.state = VolumeState::parse(state);
        self
    }

    pub fn created(mut self, time: DateTime<Utc>) -> Self {
        self.record.create_time = time;
        self
    }

    pub fn from_snapshot(mut self, snapshot_id: &str) -> Self {
        self.record.source_snapshot = Some(SnapshotId::new(snapshot_id));
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.record.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn protected(self) -> Self {
        self.tag(TAG_PROTECT_KEY, TAG_PROTECT_VALUE)
    }

    pub fn build(self) -> VolumeRecord {
        self.record
    }
}

pub struct SnapshotBuilder {
    record: SnapshotRecord,
}

impl SnapshotBuilder {
    pub fn started(mut self, time: DateTime<Utc>) -> Self {
        self.record.start_time = time;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.record.description = description.to_string();
        self
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.record.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn protected(self) -> Self {
        self.tag(TAG_PROTECT_KEY, TAG_PROTECT_VALUE)
    }

    pub fn build(self) -> SnapshotRecord {
        self.record
    }
}
