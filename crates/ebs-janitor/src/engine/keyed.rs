//! Set difference keyed by resource id

use ebs_janitor_common::{
    PendingDeletion, ResourceId, SnapshotId, SnapshotRecord, VolumeId, VolumeRecord,
};
use std::collections::HashSet;
use std::hash::Hash;

/// Something identified by a resource id
pub trait Keyed {
    type Key: Eq + Hash;

    fn key(&self) -> &Self::Key;
}

impl<I: ResourceId> Keyed for PendingDeletion<I> {
    type Key = I;

    fn key(&self) -> &I {
        &self.resource_id
    }
}

impl Keyed for VolumeRecord {
    type Key = VolumeId;

    fn key(&self) -> &VolumeId {
        &self.volume_id
    }
}

impl Keyed for SnapshotRecord {
    type Key = SnapshotId;

    fn key(&self) -> &SnapshotId {
        &self.snapshot_id
    }
}

impl Keyed for VolumeId {
    type Key = VolumeId;

    fn key(&self) -> &VolumeId {
        self
    }
}

impl Keyed for SnapshotId {
    type Key = SnapshotId;

    fn key(&self) -> &SnapshotId {
        self
    }
}

/// Items of `left` whose key does not appear in `right`, in `left` order
pub fn difference_by_key<'a, L, R>(left: &'a [L], right: &[R]) -> Vec<&'a L>
where
    L: Keyed,
    R: Keyed<Key = L::Key>,
{
    let exclude: HashSet<&L::Key> = right.iter().map(Keyed::key).collect();
    left.iter()
        .filter(|item| !exclude.contains(item.key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference_keeps_left_order() {
        let left = vec![
            PendingDeletion::new(VolumeId::new("vol-3"), 3),
            PendingDeletion::new(VolumeId::new("vol-1"), 1),
            PendingDeletion::new(VolumeId::new("vol-2"), 2),
        ];
        let right = vec![VolumeId::new("vol-1")];

        let diff = difference_by_key(&left, &right);
        let ids: Vec<_> = diff.iter().map(|p| p.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["vol-3", "vol-2"]);
    }

    #[test]
    fn test_difference_is_usable_in_both_directions() {
        let staged = vec![
            PendingDeletion::new(SnapshotId::new("snap-a"), 10),
            PendingDeletion::new(SnapshotId::new("snap-b"), 10),
        ];
        let eligible = vec![SnapshotId::new("snap-b"), SnapshotId::new("snap-c")];

        let stale = difference_by_key(&staged, &eligible);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].resource_id.as_str(), "snap-a");

        let fresh = difference_by_key(&eligible, &staged);
        assert_eq!(fresh, vec![&SnapshotId::new("snap-c")]);
    }

    #[test]
    fn test_difference_with_empty_sides() {
        let ids = vec![VolumeId::new("vol-1")];
        let none: Vec<VolumeId> = Vec::new();
        assert_eq!(difference_by_key(&ids, &none).len(), 1);
        assert!(difference_by_key(&none, &ids).is_empty());
    }
}
