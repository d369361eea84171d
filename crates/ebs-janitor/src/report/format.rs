//! Plain-text report rendering

use crate::engine::{InstanceRef, Reconciliation, SnapshotReason};
use crate::executor::{DeletionOutcome, TagWriteSummary};
use crate::orchestrator::SecurityGroupAction;
use chrono::{DateTime, Utc};
use ebs_janitor_common::{PendingDeletion, ResourceId, SnapshotId, VolumeId};
use std::error::Error;
use std::fmt::Write;

/// `DD Mon YYYY HH:MM (UTC)`
pub fn format_time(time: DateTime<Utc>) -> String {
    time.format("%d %b %Y %H:%M (UTC)").to_string()
}

/// A volume listed in a staging report
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeEntry {
    pub volume_id: VolumeId,
    /// `None` for protected volumes
    pub deletion_time: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub reference: InstanceRef,
}

/// A snapshot listed in a staging report
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub snapshot_id: SnapshotId,
    pub reason: SnapshotReason,
    /// `None` for protected snapshots
    pub deletion_time: Option<DateTime<Utc>>,
    pub description: String,
    pub started: DateTime<Utc>,
    pub reference: InstanceRef,
}

/// How one state file changed during reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateChanges {
    pub newly_staged: usize,
    pub dropped_stale: usize,
    pub dropped_protected: usize,
}

impl StateChanges {
    pub fn from_reconciliation<I>(reconciliation: &Reconciliation<I>) -> Self {
        Self {
            newly_staged: reconciliation.newly_staged.len(),
            dropped_stale: reconciliation.dropped_stale.len(),
            dropped_protected: reconciliation.dropped_protected.len(),
        }
    }
}

/// Outcome of a `stage` run
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub generated_at: DateTime<Utc>,
    pub dry_run: bool,
    pub protect_key: String,
    pub pending_volumes: Vec<VolumeEntry>,
    pub protected_volumes: Vec<VolumeEntry>,
    pub pending_snapshots: Vec<SnapshotEntry>,
    pub protected_snapshots: Vec<SnapshotEntry>,
    pub volume_changes: StateChanges,
    pub snapshot_changes: StateChanges,
    pub tags_planned: usize,
    pub tags: TagWriteSummary,
}

impl StageReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "EBS cleanup staging run at {}{}",
            format_time(self.generated_at),
            if self.dry_run {
                " [dry run, nothing written]"
            } else {
                ""
            }
        );
        out.push('\n');

        for entry in &self.pending_volumes {
            let _ = writeln!(
                out,
                "Detached volume {} will be deleted after {}",
                entry.volume_id,
                entry.deletion_time.map(format_time).unwrap_or_default()
            );
            let _ = writeln!(out, "    Created: {}", format_time(entry.created));
            let _ = writeln!(out, "    EC2 reference: {}", entry.reference);
        }
        for entry in &self.protected_volumes {
            let _ = writeln!(
                out,
                "Volume {} is protected by {} and will not be deleted",
                entry.volume_id, self.protect_key
            );
        }
        if self.pending_volumes.is_empty() {
            out.push_str("No volumes are pending delete at this time.\n");
        }
        out.push('\n');

        for entry in &self.pending_snapshots {
            let _ = writeln!(
                out,
                "{} {} will be deleted after {}",
                entry.reason,
                entry.snapshot_id,
                entry.deletion_time.map(format_time).unwrap_or_default()
            );
            let _ = writeln!(out, "    Description: {}", entry.description);
            let _ = writeln!(out, "    Created: {}", format_time(entry.started));
            let _ = writeln!(out, "    EC2 reference: {}", entry.reference);
        }
        for entry in &self.protected_snapshots {
            let _ = writeln!(
                out,
                "{} {} is protected by {} and will not be deleted",
                entry.reason, entry.snapshot_id, self.protect_key
            );
        }
        if self.pending_snapshots.is_empty() {
            out.push_str("No snapshots are pending delete at this time.\n");
        }
        out.push('\n');

        write_changes(&mut out, "Volumes", self.volume_changes);
        write_changes(&mut out, "Snapshots", self.snapshot_changes);
        if self.dry_run {
            let _ = writeln!(
                out,
                "Reference tags: {} would be written",
                self.tags_planned
            );
        } else {
            let _ = writeln!(
                out,
                "Reference tags: {} written, {} failed",
                self.tags.written, self.tags.failed
            );
        }
        out
    }
}

fn write_changes(out: &mut String, label: &str, changes: StateChanges) {
    let _ = writeln!(
        out,
        "{label}: {} newly staged, {} no longer eligible, {} newly protected",
        changes.newly_staged, changes.dropped_stale, changes.dropped_protected
    );
}

/// Outcome of a `delete` run
#[derive(Debug, Clone, PartialEq)]
pub enum DeletionReport {
    /// Neither state file had any record
    NoState,
    /// Records exist but none has reached its deletion time
    NothingReady,
    /// Ready records listed without deleting
    DryRun {
        volumes: Vec<PendingDeletion<VolumeId>>,
        snapshots: Vec<PendingDeletion<SnapshotId>>,
    },
    Executed {
        volumes: DeletionOutcome<VolumeId>,
        snapshots: DeletionOutcome<SnapshotId>,
    },
}

const NOTHING_READY: &str = "None of the existing volume or snapshot states were ready for \
                             deletion. No action was taken.\n";

impl DeletionReport {
    pub fn render(&self) -> String {
        match self {
            DeletionReport::NoState => {
                "No deletable volume or snapshot states were found. No action was taken.\n"
                    .to_string()
            }
            DeletionReport::NothingReady => NOTHING_READY.to_string(),
            DeletionReport::DryRun { volumes, snapshots } => {
                let mut out = String::from("Dry run, nothing was deleted.\n\n");
                write_ready(&mut out, "VOLUMES", volumes);
                out.push('\n');
                write_ready(&mut out, "SNAPSHOTS", snapshots);
                out
            }
            DeletionReport::Executed { volumes, snapshots } => {
                let mut out = String::new();
                write_outcome(&mut out, "DETACHED VOLUMES", "volumes", volumes);
                out.push('\n');
                write_outcome(&mut out, "SNAPSHOTS", "snapshots", snapshots);
                out
            }
        }
    }
}

fn write_ready<I: ResourceId>(out: &mut String, heading: &str, ready: &[PendingDeletion<I>]) {
    if ready.is_empty() {
        let _ = writeln!(out, "No {} are ready for deletion.", heading.to_lowercase());
        return;
    }
    let _ = writeln!(out, "THE FOLLOWING {heading} WOULD BE DELETED:");
    for record in ready {
        let _ = writeln!(
            out,
            "{} (due {})",
            record.resource_id,
            format_time(record.deletion_at())
        );
    }
}

fn write_outcome<I: ResourceId>(
    out: &mut String,
    heading: &str,
    noun: &str,
    outcome: &DeletionOutcome<I>,
) {
    if outcome.deleted.is_empty() {
        let _ = writeln!(out, "No {noun} were deleted.");
    } else {
        let _ = writeln!(out, "THE FOLLOWING {heading} WERE DELETED:");
        for record in &outcome.deleted {
            let _ = writeln!(out, "{}", record.resource_id);
        }
    }

    if !outcome.failed.is_empty() {
        let _ = writeln!(
            out,
            "THE FOLLOWING {heading} FAILED TO DELETE, \
             AND WERE RETURNED TO THE PENDING DELETE STATE:"
        );
        for failure in &outcome.failed {
            let _ = writeln!(out, "{}: {}", failure.record.resource_id, failure.error);
        }
    }

    if !outcome.unattempted.is_empty() {
        let _ = writeln!(
            out,
            "{} {noun} were not attempted before cancellation and remain pending.",
            outcome.unattempted.len()
        );
    }
}

/// Result for one security group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    Applied,
    /// Dry run
    WouldApply,
    /// Nothing to revoke
    Unchanged,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResult {
    pub group_id: String,
    pub group_name: String,
    pub outcome: GroupOutcome,
}

/// Outcome of a `security-groups` run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupReport {
    pub action: SecurityGroupAction,
    pub description: String,
    pub execute: bool,
    pub results: Vec<GroupResult>,
}

impl SecurityGroupReport {
    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, GroupOutcome::Failed(_)))
            .count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Security group {} for description \"{}\"{}",
            self.action,
            self.description,
            if self.execute { "" } else { " [dry run]" }
        );
        if self.results.is_empty() {
            out.push_str("No security groups matched.\n");
            return out;
        }
        for result in &self.results {
            let status = match &result.outcome {
                GroupOutcome::Applied => "ok".to_string(),
                GroupOutcome::WouldApply => "would apply".to_string(),
                GroupOutcome::Unchanged => "nothing to do".to_string(),
                GroupOutcome::Failed(e) => format!("FAILED: {e}"),
            };
            let _ = writeln!(out, "{} ({}): {status}", result.group_id, result.group_name);
        }
        let _ = writeln!(
            out,
            "{} groups, {} failed",
            self.results.len(),
            self.failures()
        );
        out
    }
}

/// Appended to a run report when the state files could not be written
pub fn persist_failure_note(error: &anyhow::Error) -> String {
    format!(
        "\nWARNING: the pending-delete state could not be written: {error:#}\n\
         Resources listed above may still appear in the old state files.\n"
    )
}

/// Report for a staging run that could not read the inventory
pub fn fetch_failure_report(at: DateTime<Utc>, error: &(dyn Error + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(chain, ": {cause}");
        source = cause.source();
    }
    format!(
        "EBS cleanup staging run at {} aborted, no state was changed.\n{chain}\n",
        format_time(at)
    )
}
