//! Pending-deletion state machine
//!
//! ```text
//! untracked -> staged -> ready -> deleted
//!                 |        |
//!                 v        v
//!            untracked   staged (delete failed, DeletionTime kept)
//! ```
//!
//! `reconcile` handles the staging half and is idempotent: feeding its output
//! back in with the same eligible set yields the same state, with no timer
//! reset for records that stay eligible. `partition_ready` selects the records
//! whose grace period has elapsed.

use super::keyed::{Keyed, difference_by_key};
use chrono::{DateTime, Utc};
use ebs_janitor_common::{PendingDeletion, ResourceId};
use std::collections::{HashMap, HashSet};

/// Result of merging this run's eligible set into the persisted state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<I> {
    /// State to persist
    pub state: Vec<PendingDeletion<I>>,
    /// Records added this run
    pub newly_staged: Vec<PendingDeletion<I>>,
    /// Records dropped because the resource now carries the protection tag
    pub dropped_protected: Vec<PendingDeletion<I>>,
    /// Records dropped because the resource is no longer eligible
    pub dropped_stale: Vec<PendingDeletion<I>>,
}

/// Merge `eligible` into `previous`
///
/// `deletion_time` is only used for records staged by this call.
pub fn reconcile<I, E>(
    previous: Vec<PendingDeletion<I>>,
    eligible: &[E],
    is_protected: impl Fn(&I) -> bool,
    deletion_time: i64,
) -> Reconciliation<I>
where
    I: ResourceId,
    E: Keyed<Key = I>,
{
    let (dropped_protected, unprotected): (Vec<_>, Vec<_>) = dedup_last_wins(previous)
        .into_iter()
        .partition(|p| is_protected(&p.resource_id));

    let eligible_ids: HashSet<&I> = eligible.iter().map(Keyed::key).collect();
    let (state, dropped_stale): (Vec<_>, Vec<_>) = unprotected
        .into_iter()
        .partition(|p| eligible_ids.contains(&p.resource_id));

    let mut seen = HashSet::new();
    let newly_staged: Vec<_> = difference_by_key(eligible, &state)
        .into_iter()
        .map(Keyed::key)
        .filter(|id| seen.insert(*id))
        .map(|id| PendingDeletion::new(id.clone(), deletion_time))
        .collect();

    let mut state = state;
    state.extend(newly_staged.iter().cloned());

    Reconciliation {
        state,
        newly_staged,
        dropped_protected,
        dropped_stale,
    }
}

/// Split state into `(ready, not_ready)` at `now`
pub fn partition_ready<I: ResourceId>(
    state: Vec<PendingDeletion<I>>,
    now: DateTime<Utc>,
) -> (Vec<PendingDeletion<I>>, Vec<PendingDeletion<I>>) {
    state.into_iter().partition(|p| p.is_ready(now))
}

/// Collapse duplicate ids, keeping the first position and the last value
fn dedup_last_wins<I: ResourceId>(records: Vec<PendingDeletion<I>>) -> Vec<PendingDeletion<I>> {
    let mut position: HashMap<I, usize> = HashMap::new();
    let mut out: Vec<PendingDeletion<I>> = Vec::with_capacity(records.len());
    for record in records {
        let existing = position.get(&record.resource_id).copied();
        match existing {
            Some(i) => out[i] = record,
            None => {
                position.insert(record.resource_id.clone(), out.len());
                out.push(record);
            }
        }
    }
    out
}
