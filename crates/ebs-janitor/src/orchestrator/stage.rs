//! `stage`: fetch, classify, reconcile and persist

use super::RunContext;
use crate::aws::Ec2Operations;
use crate::engine::{
    Eligibility, InstanceRef, Policy, Reconciliation, References, SnapshotReason, evaluate,
    plan_references, reconcile, resolve,
};
use crate::executor::{DeletionExecutor, TagWriteSummary};
use crate::inventory::{Inventory, fetch_inventory};
use crate::report::{
    self, ReportSink, SnapshotEntry, StageReport, StateChanges, VolumeEntry,
    fetch_failure_report,
};
use anyhow::{Context, Result};
use chrono::DateTime;
use ebs_janitor_common::{SnapshotId, SnapshotRecord, VolumeId, VolumeRecord};
use std::collections::{HashMap, HashSet};
use tracing::{error, info};

/// Run one staging pass
///
/// A failed inventory fetch is reported and returned as an error before any
/// tag or state write happens.
pub async fn run_stage<E: Ec2Operations, S: ReportSink>(
    ec2: &E,
    sink: &S,
    ctx: &RunContext<'_>,
) -> Result<StageReport> {
    let policy = Policy::from_config(ctx.config, ctx.now);

    let inventory = match fetch_inventory(ec2, &ctx.config.owner_ids).await {
        Ok(inventory) => inventory,
        Err(e) => {
            error!(error = %e, "Inventory fetch failed, leaving state untouched");
            report::emit(sink, &fetch_failure_report(ctx.now, &e)).await;
            return Err(e).context("Staging run aborted");
        }
    };

    let references = plan_references(
        &inventory.volumes,
        &inventory.snapshots,
        &inventory.instances,
    );
    let tags = if ctx.dry_run {
        TagWriteSummary::default()
    } else {
        DeletionExecutor::new(
            ec2,
            ctx.config.rate_limit_per_sec,
            ctx.config.retry.max_retries,
            ctx.cancel.clone(),
        )
        .write_tags(&references.updates)
        .await
    };

    let lineage = resolve(
        &inventory.volumes,
        &inventory.snapshots,
        &inventory.images,
        &policy,
    );
    info!(
        superseded = lineage.superseded().count(),
        orphans = lineage.orphans().count(),
        active_sources = lineage.active_sources().count(),
        ami_referenced = lineage.ami_referenced().count(),
        "Lineage resolved"
    );
    let eligibility = evaluate(&inventory.volumes, &inventory.snapshots, &lineage, &policy);

    let (protected_volumes, protected_snapshots) = protected_ids(&inventory, &policy);
    let deletion_time = policy.deletion_time();
    let volumes = reconcile(
        ctx.store.load_volumes(),
        &eligibility.volume_ids(),
        |id| protected_volumes.contains(id),
        deletion_time,
    );
    let snapshots = reconcile(
        ctx.store.load_snapshots(),
        &eligibility.snapshot_ids(),
        |id| protected_snapshots.contains(id),
        deletion_time,
    );
    log_changes("volumes", &volumes);
    log_changes("snapshots", &snapshots);

    let persisted = if ctx.dry_run {
        info!("Dry run, state files not written");
        Ok(())
    } else {
        ctx.store.save(&volumes.state, &snapshots.state)
    };

    let stage_report = build_report(
        ctx,
        &policy,
        &references,
        &eligibility,
        &volumes,
        &snapshots,
        tags,
    );
    report::emit_after_persist(sink, stage_report.render(), persisted).await?;
    Ok(stage_report)
}

/// Ids carrying the protection tag in the live inventory
fn protected_ids(
    inventory: &Inventory,
    policy: &Policy,
) -> (HashSet<VolumeId>, HashSet<SnapshotId>) {
    let volumes = inventory
        .volumes
        .iter()
        .filter(|v| policy.is_protected(&v.tags))
        .map(|v| v.volume_id.clone())
        .collect();
    let snapshots = inventory
        .snapshots
        .iter()
        .filter(|s| policy.is_protected(&s.tags))
        .map(|s| s.snapshot_id.clone())
        .collect();
    (volumes, snapshots)
}

fn log_changes<I>(kind: &'static str, reconciliation: &Reconciliation<I>) {
    info!(
        kind,
        pending = reconciliation.state.len(),
        newly_staged = reconciliation.newly_staged.len(),
        dropped_stale = reconciliation.dropped_stale.len(),
        dropped_protected = reconciliation.dropped_protected.len(),
        "State reconciled"
    );
}

fn volume_entry(
    record: &VolumeRecord,
    deletion_time: Option<i64>,
    references: &References,
) -> VolumeEntry {
    VolumeEntry {
        volume_id: record.volume_id.clone(),
        deletion_time: deletion_time.and_then(|t| DateTime::from_timestamp(t, 0)),
        created: record.create_time,
        reference: references
            .volume(&record.volume_id)
            .cloned()
            .unwrap_or_else(InstanceRef::unknown),
    }
}

fn snapshot_entry(
    record: &SnapshotRecord,
    reason: SnapshotReason,
    deletion_time: Option<i64>,
    references: &References,
) -> SnapshotEntry {
    SnapshotEntry {
        snapshot_id: record.snapshot_id.clone(),
        reason,
        deletion_time: deletion_time.and_then(|t| DateTime::from_timestamp(t, 0)),
        description: record.description.clone(),
        started: record.start_time,
        reference: references
            .snapshot(&record.snapshot_id)
            .cloned()
            .unwrap_or_else(InstanceRef::unknown),
    }
}

fn build_report(
    ctx: &RunContext<'_>,
    policy: &Policy,
    references: &References,
    eligibility: &Eligibility,
    volumes: &Reconciliation<VolumeId>,
    snapshots: &Reconciliation<SnapshotId>,
    tags: TagWriteSummary,
) -> StageReport {
    let eligible_volumes: HashMap<&VolumeId, &VolumeRecord> = eligibility
        .volumes
        .iter()
        .map(|v| (&v.volume_id, v))
        .collect();
    let eligible_snapshots: HashMap<&SnapshotId, _> = eligibility
        .snapshots
        .iter()
        .map(|c| (&c.record.snapshot_id, c))
        .collect();

    StageReport {
        generated_at: ctx.now,
        dry_run: ctx.dry_run,
        protect_key: policy.protect_tag.key.clone(),
        pending_volumes: volumes
            .state
            .iter()
            .filter_map(|p| {
                let record = eligible_volumes.get(&p.resource_id)?;
                Some(volume_entry(record, Some(p.deletion_time), references))
            })
            .collect(),
        protected_volumes: eligibility
            .protected_volumes
            .iter()
            .map(|v| volume_entry(v, None, references))
            .collect(),
        pending_snapshots: snapshots
            .state
            .iter()
            .filter_map(|p| {
                let candidate = eligible_snapshots.get(&p.resource_id)?;
                Some(snapshot_entry(
                    &candidate.record,
                    candidate.reason,
                    Some(p.deletion_time),
                    references,
                ))
            })
            .collect(),
        protected_snapshots: eligibility
            .protected_snapshots
            .iter()
            .map(|c| snapshot_entry(&c.record, c.reason, None, references))
            .collect(),
        volume_changes: StateChanges::from_reconciliation(volumes),
        snapshot_changes: StateChanges::from_reconciliation(snapshots),
        tags_planned: references.updates.len(),
        tags,
    }
}
