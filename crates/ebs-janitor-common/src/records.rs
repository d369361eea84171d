//! Inventory records
//!
//! Point-in-time views of provider resources. They are owned by the cloud
//! provider; the janitor only reads them (and writes reference tags).

use crate::ids::{SnapshotId, VolumeId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Resource tags (keys are unique)
pub type Tags = BTreeMap<String, String>;

/// Volume lifecycle state as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VolumeState {
    /// Detached
    Available,
    /// Attached to an instance
    InUse,
    /// Anything else (creating, deleting, error, ...)
    Other(String),
}

impl VolumeState {
    /// Parse the provider's state string
    pub fn parse(s: &str) -> Self {
        match s {
            "available" => VolumeState::Available,
            "in-use" => VolumeState::InUse,
            other => VolumeState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            VolumeState::Available => "available",
            VolumeState::InUse => "in-use",
            VolumeState::Other(s) => s,
        }
    }
}

/// EBS volume
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRecord {
    pub volume_id: VolumeId,
    pub state: VolumeState,
    pub create_time: DateTime<Utc>,
    /// Instance the volume is attached to, if any
    pub attached_instance: Option<String>,
    /// Snapshot this volume was created from, if any
    pub source_snapshot: Option<SnapshotId>,
    pub tags: Tags,
}

/// EBS snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub snapshot_id: SnapshotId,
    /// Declared source volume; may name a volume that no longer exists
    pub volume_id: VolumeId,
    pub start_time: DateTime<Utc>,
    pub description: String,
    pub tags: Tags,
}

/// Machine image (AMI), reduced to the snapshots its block devices use
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub image_id: String,
    pub snapshot_ids: Vec<SnapshotId>,
}

/// EC2 instance, used only for name lookups
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub tags: Tags,
}

/// Security group with its ingress rules
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityGroupRecord {
    pub group_id: String,
    pub group_name: String,
    pub description: String,
    pub ingress: Vec<IngressRule>,
}

/// One ingress permission of a security group
#[derive(Debug, Clone, PartialEq)]
pub struct IngressRule {
    pub protocol: String,
    pub from_port: Option<i32>,
    pub to_port: Option<i32>,
    pub cidr_ranges: Vec<String>,
    /// Other security groups granted access by this rule
    pub group_pairs: Vec<GroupPair>,
}

/// Reference from an ingress rule to another security group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPair {
    pub group_id: String,
    pub user_id: Option<String>,
}

/// True when `tags` contains exactly `key = value`
pub fn has_tag(tags: &Tags, key: &str, value: &str) -> bool {
    tags.get(key).is_some_and(|v| v == value)
}

/// Non-empty value of `key`, if present
pub fn tag_value<'a>(tags: &'a Tags, key: &str) -> Option<&'a str> {
    tags.get(key).map(String::as_str).filter(|v| !v.is_empty())
}
