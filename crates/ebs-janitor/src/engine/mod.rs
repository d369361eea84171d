//! Pure cleanup engine
//!
//! Every stage takes immutable inputs and returns a new value:
//!
//! - [`lineage`]: volume/snapshot/image reference graph
//! - [`eligibility`]: age, attachment and protection filters
//! - [`reconcile`]: merge of fresh eligibility into the persisted pending state
//! - [`references`]: `RefInstanceName`/`RefInstanceId` planning
//!
//! Nothing in here talks to AWS or touches the filesystem.

pub mod eligibility;
pub mod keyed;
pub mod lineage;
pub mod reconcile;
pub mod references;

pub use eligibility::{Eligibility, SnapshotCandidate, SnapshotReason, evaluate};
pub use keyed::{Keyed, difference_by_key};
pub use lineage::{Lineage, LineageFact, resolve};
pub use reconcile::{Reconciliation, partition_ready, reconcile};
pub use references::{InstanceRef, References, TagUpdate, plan_references};

use crate::config::{JanitorConfig, ProtectTag};
use chrono::{DateTime, Duration, Utc};
use ebs_janitor_common::Tags;
use ebs_janitor_common::records::has_tag;

/// Clock and thresholds for one run
#[derive(Debug, Clone)]
pub struct Policy {
    pub now: DateTime<Utc>,
    pub volume_age_threshold: Duration,
    pub grace_period: Duration,
    pub protect_tag: ProtectTag,
}

impl Policy {
    pub fn from_config(config: &JanitorConfig, now: DateTime<Utc>) -> Self {
        Self {
            now,
            volume_age_threshold: config.volume_age_threshold(),
            grace_period: config.grace_period(),
            protect_tag: config.protect_tag.clone(),
        }
    }

    /// Whether `tags` carry the do-not-delete marker
    pub fn is_protected(&self, tags: &Tags) -> bool {
        has_tag(tags, &self.protect_tag.key, &self.protect_tag.value)
    }

    /// Deletion time for something first staged now
    ///
    /// Clamps to the latest representable time rather than overflowing.
    pub fn deletion_time(&self) -> i64 {
        self.now
            .checked_add_signed(self.grace_period)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .timestamp()
    }
}

#[cfg(test)]
pub(crate) fn test_policy(now: DateTime<Utc>) -> Policy {
    Policy::from_config(&JanitorConfig::default(), now)
}
