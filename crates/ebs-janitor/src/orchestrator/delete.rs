//! `delete`: execute records whose grace period has elapsed

use super::RunContext;
use crate::aws::Ec2Operations;
use crate::engine::partition_ready;
use crate::executor::DeletionExecutor;
use crate::report::{self, DeletionReport, ReportSink};
use anyhow::Result;
use tracing::info;

/// Run one deletion pass
///
/// Volumes go first, then snapshots. Whatever was not ready, failed, or was
/// left behind by cancellation is written back with its original deletion
/// time.
pub async fn run_delete<E: Ec2Operations, S: ReportSink>(
    ec2: &E,
    sink: &S,
    ctx: &RunContext<'_>,
) -> Result<DeletionReport> {
    let volumes = ctx.store.load_volumes();
    let snapshots = ctx.store.load_snapshots();

    if volumes.is_empty() && snapshots.is_empty() {
        info!("No pending state, nothing to delete");
        return finish(sink, DeletionReport::NoState).await;
    }

    let (ready_volumes, mut waiting_volumes) = partition_ready(volumes, ctx.now);
    let (ready_snapshots, mut waiting_snapshots) = partition_ready(snapshots, ctx.now);
    info!(
        ready_volumes = ready_volumes.len(),
        waiting_volumes = waiting_volumes.len(),
        ready_snapshots = ready_snapshots.len(),
        waiting_snapshots = waiting_snapshots.len(),
        "Pending state loaded"
    );

    if ready_volumes.is_empty() && ready_snapshots.is_empty() {
        return finish(sink, DeletionReport::NothingReady).await;
    }
    if ctx.dry_run {
        let deletion_report = DeletionReport::DryRun {
            volumes: ready_volumes,
            snapshots: ready_snapshots,
        };
        return finish(sink, deletion_report).await;
    }

    let executor = DeletionExecutor::new(
        ec2,
        ctx.config.rate_limit_per_sec,
        ctx.config.retry.max_retries,
        ctx.cancel.clone(),
    );
    let volume_outcome = executor.delete_all(ready_volumes).await;
    let snapshot_outcome = executor.delete_all(ready_snapshots).await;

    waiting_volumes.extend(volume_outcome.returned());
    waiting_snapshots.extend(snapshot_outcome.returned());
    let persisted = ctx.store.save(&waiting_volumes, &waiting_snapshots);

    let deletion_report = DeletionReport::Executed {
        volumes: volume_outcome,
        snapshots: snapshot_outcome,
    };
    report::emit_after_persist(sink, deletion_report.render(), persisted).await?;
    Ok(deletion_report)
}

async fn finish<S: ReportSink>(
    sink: &S,
    deletion_report: DeletionReport,
) -> Result<DeletionReport> {
    report::emit(sink, &deletion_report.render()).await;
    Ok(deletion_report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{AwsError, MockEc2Operations};
    use crate::config::JanitorConfig;
    use crate::report::RecordingSink;
    use crate::state::StateStore;
    use ebs_janitor_common::{PendingDeletion, SnapshotId, VolumeId};
    use ebs_janitor_test_utils::{T0, at, days};
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    const DAY: i64 = 24 * 3600;

    fn setup() -> (TempDir, StateStore, JanitorConfig) {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("v.json"), dir.path().join("s.json"));
        (dir, store, JanitorConfig::default())
    }

    fn context<'a>(
        config: &'a JanitorConfig,
        store: &'a StateStore,
        now: chrono::DateTime<chrono::Utc>,
        dry_run: bool,
    ) -> RunContext<'a> {
        RunContext {
            config,
            store,
            now,
            dry_run,
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_no_state() {
        let (_dir, store, config) = setup();
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_delete_volume().never();
        ec2.expect_delete_snapshot().never();

        let sink = RecordingSink::default();
        let report = run_delete(&ec2, &sink, &context(&config, &store, at(0), false))
            .await
            .unwrap();

        assert_eq!(report, DeletionReport::NoState);
        assert!(sink.messages()[0].starts_with("No deletable volume or snapshot states"));
    }

    #[tokio::test]
    async fn test_nothing_ready_makes_no_calls() {
        let (_dir, store, config) = setup();
        let staged = vec![PendingDeletion::new(VolumeId::new("vol-1"), T0 + 7 * DAY)];
        store.save_volumes(&staged).unwrap();

        let mut ec2 = MockEc2Operations::new();
        ec2.expect_delete_volume().never();
        ec2.expect_delete_snapshot().never();

        let sink = RecordingSink::default();
        let report = run_delete(&ec2, &sink, &context(&config, &store, days(1), false))
            .await
            .unwrap();

        assert_eq!(report, DeletionReport::NothingReady);
        assert_eq!(store.load_volumes(), staged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_keeps_deletion_time() {
        let (_dir, store, config) = setup();
        store
            .save_volumes(&[
                PendingDeletion::new(VolumeId::new("vol-ready"), T0 + 7 * DAY),
                PendingDeletion::new(VolumeId::new("vol-later"), T0 + 30 * DAY),
            ])
            .unwrap();
        store
            .save_snapshots(&[PendingDeletion::new(SnapshotId::new("snap-4"), T0 + 7 * DAY)])
            .unwrap();

        let mut ec2 = MockEc2Operations::new();
        ec2.expect_delete_volume()
            .withf(|id| id.as_str() == "vol-ready")
            .times(1)
            .returning(|_| Ok(()));
        ec2.expect_delete_snapshot().times(1).returning(|_| {
            Err(AwsError::InUse {
                message: "snapshot is in use by ami-1".to_string(),
            })
        });

        let sink = RecordingSink::default();
        let report = run_delete(&ec2, &sink, &context(&config, &store, days(8), false))
            .await
            .unwrap();

        let DeletionReport::Executed { volumes, snapshots } = report else {
            panic!("expected an executed report");
        };
        assert_eq!(volumes.deleted.len(), 1);
        assert_eq!(snapshots.failed.len(), 1);

        let later = PendingDeletion::new(VolumeId::new("vol-later"), T0 + 30 * DAY);
        assert_eq!(store.load_volumes(), vec![later]);
        let in_use = PendingDeletion::new(SnapshotId::new("snap-4"), T0 + 7 * DAY);
        assert_eq!(store.load_snapshots(), vec![in_use]);
        assert!(sink.messages()[0].contains("FAILED TO DELETE"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_write_failure_still_reports_deletions() {
        let dir = TempDir::new().unwrap();
        // A directory where the volume file should be makes the write fail
        let volumes_path = dir.path().join("v.json");
        std::fs::create_dir(&volumes_path).unwrap();
        let store = StateStore::new(&volumes_path, dir.path().join("s.json"));
        store
            .save_snapshots(&[PendingDeletion::new(SnapshotId::new("snap-1"), T0)])
            .unwrap();
        let config = JanitorConfig::default();

        let mut ec2 = MockEc2Operations::new();
        ec2.expect_delete_snapshot().times(1).returning(|_| Ok(()));

        let sink = RecordingSink::default();
        let result = run_delete(&ec2, &sink, &context(&config, &store, days(1), false)).await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to write pending-delete state"));
        let sent = sink.messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("THE FOLLOWING SNAPSHOTS WERE DELETED:\nsnap-1\n"));
        assert!(sent[0].contains("WARNING: the pending-delete state could not be written"));
        // The snapshot file is still written even though the volume file failed
        assert!(store.load_snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_lists_without_deleting() {
        let (_dir, store, config) = setup();
        let staged = vec![PendingDeletion::new(SnapshotId::new("snap-1"), T0)];
        store.save_snapshots(&staged).unwrap();
        let before = std::fs::read(store.snapshots_path()).unwrap();

        let mut ec2 = MockEc2Operations::new();
        ec2.expect_delete_snapshot().never();

        let sink = RecordingSink::default();
        let report = run_delete(&ec2, &sink, &context(&config, &store, at(0), true))
            .await
            .unwrap();

        let DeletionReport::DryRun { snapshots, .. } = report else {
            panic!("expected a dry-run report");
        };
        assert_eq!(snapshots, staged);
        assert_eq!(std::fs::read(store.snapshots_path()).unwrap(), before);
    }
}
