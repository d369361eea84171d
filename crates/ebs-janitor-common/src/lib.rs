//! ebs-janitor-common - Shared types for block-storage cleanup
//!
//! This crate holds the SDK-free data model used by the janitor binary and
//! its tests, so the lineage and reconciliation logic can be exercised
//! without pulling in the AWS SDK.
//!
//! ## Modules
//!
//! - [`defaults`]: Default thresholds, grace period and state file names
//! - [`ids`]: Typed volume and snapshot identifiers
//! - [`pending`]: Persisted pending-deletion records and their JSON format
//! - [`records`]: Inventory records (volumes, snapshots, images, instances, security groups)
//! - [`resource_kind`]: Kinds of resources the janitor deletes
//! - [`tags`]: Tag keys and values the janitor reads and writes

pub mod defaults;
pub mod ids;
pub mod pending;
pub mod records;
pub mod resource_kind;
pub mod tags;

// Re-export commonly used types
pub use ids::{ResourceId, SnapshotId, VolumeId};
pub use pending::PendingDeletion;
pub use records::{
    GroupPair, ImageRecord, IngressRule, InstanceRecord, SecurityGroupRecord, SnapshotRecord,
    Tags, VolumeRecord, VolumeState,
};
pub use resource_kind::ResourceKind;
