//! Eligibility filters
//!
//! Volumes: detached, strictly older than the age threshold, not protected.
//!
//! Snapshots: the superseded point-in-time set and the orphan set, each run
//! through the same independent exclusions (active source, image reference,
//! protection). Candidates that only fail the protection check are kept aside
//! so reports can list them.

use super::{Lineage, Policy};
use ebs_janitor_common::{SnapshotId, SnapshotRecord, VolumeId, VolumeRecord, VolumeState};
use std::collections::HashSet;
use std::fmt;

/// Why a snapshot is a deletion candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotReason {
    /// A newer snapshot of the same volume exists
    SupersededPit,
    /// Source volume is gone and nothing derives from it
    Orphan,
}

impl SnapshotReason {
    pub fn label(self) -> &'static str {
        match self {
            SnapshotReason::SupersededPit => "Old point-in-time snapshot",
            SnapshotReason::Orphan => "Orphan snapshot",
        }
    }
}

impl fmt::Display for SnapshotReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotCandidate {
    pub record: SnapshotRecord,
    pub reason: SnapshotReason,
}

/// This run's eligible and protected resources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Eligibility {
    pub volumes: Vec<VolumeRecord>,
    /// Would be eligible without the protection tag
    pub protected_volumes: Vec<VolumeRecord>,
    pub snapshots: Vec<SnapshotCandidate>,
    /// Would be eligible without the protection tag
    pub protected_snapshots: Vec<SnapshotCandidate>,
}

impl Eligibility {
    pub fn volume_ids(&self) -> Vec<VolumeId> {
        self.volumes.iter().map(|v| v.volume_id.clone()).collect()
    }

    pub fn snapshot_ids(&self) -> Vec<SnapshotId> {
        self.snapshots
            .iter()
            .map(|c| c.record.snapshot_id.clone())
            .collect()
    }
}

/// Apply age, attachment, lineage and protection filters
pub fn evaluate(
    volumes: &[VolumeRecord],
    snapshots: &[SnapshotRecord],
    lineage: &Lineage,
    policy: &Policy,
) -> Eligibility {
    let mut eligibility = Eligibility::default();

    for volume in volumes {
        if !is_detached_and_old(volume, policy) {
            continue;
        }
        if policy.is_protected(&volume.tags) {
            eligibility.protected_volumes.push(volume.clone());
        } else {
            eligibility.volumes.push(volume.clone());
        }
    }

    let mut seen: HashSet<&SnapshotId> = HashSet::new();
    for snapshot in snapshots {
        let Some(fact) = lineage.fact(&snapshot.snapshot_id) else {
            continue;
        };
        if !seen.insert(&snapshot.snapshot_id) {
            continue;
        }

        let reason = if fact.is_superseded {
            SnapshotReason::SupersededPit
        } else if fact.is_orphan() {
            SnapshotReason::Orphan
        } else {
            continue;
        };

        if fact.is_active_source() || fact.is_ami_referenced {
            continue;
        }

        let candidate = SnapshotCandidate {
            record: snapshot.clone(),
            reason,
        };
        if fact.is_protected {
            eligibility.protected_snapshots.push(candidate);
        } else {
            eligibility.snapshots.push(candidate);
        }
    }

    eligibility
}

fn is_detached_and_old(volume: &VolumeRecord, policy: &Policy) -> bool {
    volume.state == VolumeState::Available
        && policy.now.signed_duration_since(volume.create_time) > policy.volume_age_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{resolve, test_policy};
    use chrono::Duration;
    use ebs_janitor_test_utils::{at, days, image, snapshot, volume};

    fn run(volumes: &[VolumeRecord], snapshots: &[SnapshotRecord]) -> Eligibility {
        run_with_images(volumes, snapshots, &[])
    }

    fn run_with_images(
        volumes: &[VolumeRecord],
        snapshots: &[SnapshotRecord],
        images: &[ebs_janitor_common::ImageRecord],
    ) -> Eligibility {
        let policy = test_policy(days(0));
        let lineage = resolve(volumes, snapshots, images, &policy);
        evaluate(volumes, snapshots, &lineage, &policy)
    }

    fn snapshot_ids(candidates: &[SnapshotCandidate]) -> Vec<&str> {
        candidates
            .iter()
            .map(|c| c.record.snapshot_id.as_str())
            .collect()
    }

    #[test]
    fn test_volume_must_be_detached_old_and_unprotected() {
        let volumes = vec![
            volume("vol-old").available().created(days(-3)).build(),
            volume("vol-young").available().created(days(-1)).build(),
            volume("vol-attached")
                .attached_to("i-1")
                .created(days(-10))
                .build(),
            volume("vol-dnd")
                .available()
                .created(days(-10))
                .protected()
                .build(),
        ];

        let eligibility = run(&volumes, &[]);
        assert_eq!(eligibility.volume_ids(), vec![VolumeId::new("vol-old")]);
        assert_eq!(eligibility.protected_volumes.len(), 1);
        assert_eq!(
            eligibility.protected_volumes[0].volume_id.as_str(),
            "vol-dnd"
        );
    }

    #[test]
    fn test_volume_age_threshold_is_strict() {
        let exactly = days(0) - Duration::hours(48);
        let volumes = vec![
            volume("vol-exact").available().created(exactly).build(),
            volume("vol-older")
                .available()
                .created(exactly - Duration::seconds(1))
                .build(),
        ];

        let eligibility = run(&volumes, &[]);
        assert_eq!(eligibility.volume_ids(), vec![VolumeId::new("vol-older")]);
    }

    #[test]
    fn test_superseded_snapshots_are_eligible() {
        let volumes = vec![volume("vol-1").build()];
        let snapshots = vec![
            snapshot("snap-1", "vol-1").started(at(1)).build(),
            snapshot("snap-2", "vol-1").started(at(2)).build(),
            snapshot("snap-3", "vol-1").started(at(3)).build(),
        ];

        let eligibility = run(&volumes, &snapshots);
        assert_eq!(
            snapshot_ids(&eligibility.snapshots),
            vec!["snap-1", "snap-2"]
        );
        assert!(
            eligibility
                .snapshots
                .iter()
                .all(|c| c.reason == SnapshotReason::SupersededPit)
        );
    }

    #[test]
    fn test_active_source_wins_over_pit_ranking() {
        let volumes = vec![
            volume("vol-1").build(),
            volume("vol-restored").from_snapshot("snap-1").build(),
        ];
        let snapshots = vec![
            snapshot("snap-1", "vol-1").started(at(1)).build(),
            snapshot("snap-2", "vol-1").started(at(2)).build(),
        ];

        let eligibility = run(&volumes, &snapshots);
        assert!(eligibility.snapshots.is_empty());
        assert!(eligibility.protected_snapshots.is_empty());
    }

    #[test]
    fn test_ami_snapshot_excluded_even_when_oldest() {
        let volumes = vec![volume("vol-1").build()];
        let snapshots = vec![
            snapshot("snap-ami", "vol-1").started(at(1)).build(),
            snapshot("snap-2", "vol-1").started(at(2)).build(),
            snapshot("snap-3", "vol-1").started(at(3)).build(),
        ];
        let images = vec![image("ami-1", &["snap-ami"])];

        let eligibility = run_with_images(&volumes, &snapshots, &images);
        assert_eq!(snapshot_ids(&eligibility.snapshots), vec!["snap-2"]);
    }

    #[test]
    fn test_ami_exclusion_applies_to_orphans() {
        let snapshots = vec![
            snapshot("snap-ami", "vol-gone").build(),
            snapshot("snap-orphan", "vol-gone").build(),
        ];
        let images = vec![image("ami-1", &["snap-ami"])];

        let eligibility = run_with_images(&[], &snapshots, &images);
        assert_eq!(snapshot_ids(&eligibility.snapshots), vec!["snap-orphan"]);
        assert_eq!(eligibility.snapshots[0].reason, SnapshotReason::Orphan);
    }

    #[test]
    fn test_protected_orphan_is_reported_not_eligible() {
        let snapshots = vec![snapshot("snap-1", "vol-gone").protected().build()];

        let eligibility = run(&[], &snapshots);
        assert!(eligibility.snapshots.is_empty());
        assert_eq!(
            snapshot_ids(&eligibility.protected_snapshots),
            vec!["snap-1"]
        );
        assert_eq!(
            eligibility.protected_snapshots[0].reason,
            SnapshotReason::Orphan
        );
    }

    #[test]
    fn test_newest_snapshot_and_live_lineage_are_kept() {
        let volumes = vec![volume("vol-1").build()];
        let snapshots = vec![snapshot("snap-only", "vol-1").build()];

        let eligibility = run(&volumes, &snapshots);
        assert!(eligibility.snapshots.is_empty());
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(
            SnapshotReason::SupersededPit.to_string(),
            "Old point-in-time snapshot"
        );
        assert_eq!(SnapshotReason::Orphan.label(), "Orphan snapshot");
    }
}
