//! Rate-limited deletion queue
//!
//! Ready records are drained one at a time through a shared [`RateLimiter`].
//! Throttled calls are retried with backoff; any other failure hands the
//! record back unchanged so it is retried next cycle with its original
//! deletion time. Cancelling the token stops the queue from taking further
//! records; the in-flight one finishes and the rest come back untouched.

pub mod limiter;

pub use limiter::RateLimiter;

use crate::aws::{AwsError, Ec2Operations};
use crate::engine::TagUpdate;
use backon::{ExponentialBuilder, Retryable};
use ebs_janitor_common::{PendingDeletion, ResourceId, SnapshotId, VolumeId};
use futures::StreamExt;
use futures::stream;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Resource ids the executor knows how to delete
#[allow(async_fn_in_trait)] // Internal use only
pub trait Deletable: ResourceId {
    async fn delete<E: Ec2Operations>(ec2: &E, id: &Self) -> Result<(), AwsError>;
}

impl Deletable for VolumeId {
    async fn delete<E: Ec2Operations>(ec2: &E, id: &Self) -> Result<(), AwsError> {
        ec2.delete_volume(id).await
    }
}

impl Deletable for SnapshotId {
    async fn delete<E: Ec2Operations>(ec2: &E, id: &Self) -> Result<(), AwsError> {
        ec2.delete_snapshot(id).await
    }
}

/// A delete the provider rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDeletion<I> {
    pub record: PendingDeletion<I>,
    pub error: String,
}

/// What happened to each ready record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome<I> {
    pub deleted: Vec<PendingDeletion<I>>,
    pub failed: Vec<FailedDeletion<I>>,
    /// Never attempted because the run was cancelled
    pub unattempted: Vec<PendingDeletion<I>>,
}

impl<I> Default for DeletionOutcome<I> {
    fn default() -> Self {
        Self {
            deleted: Vec::new(),
            failed: Vec::new(),
            unattempted: Vec::new(),
        }
    }
}

impl<I: ResourceId> DeletionOutcome<I> {
    /// Records that go back into the pending state, deletion times unchanged
    pub fn returned(&self) -> Vec<PendingDeletion<I>> {
        self.failed
            .iter()
            .map(|f| f.record.clone())
            .chain(self.unattempted.iter().cloned())
            .collect()
    }
}

/// Tag writes applied and rejected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagWriteSummary {
    pub written: usize,
    pub failed: usize,
}

/// Serialized, rate-limited provider mutations
pub struct DeletionExecutor<'a, E> {
    ec2: &'a E,
    limiter: RateLimiter,
    max_retries: usize,
    cancel: CancellationToken,
}

impl<'a, E: Ec2Operations> DeletionExecutor<'a, E> {
    pub fn new(
        ec2: &'a E,
        rate_limit_per_sec: u32,
        max_retries: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ec2,
            limiter: RateLimiter::per_second(rate_limit_per_sec),
            max_retries,
            cancel,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(500))
            .with_max_delay(Duration::from_secs(10))
            .with_max_times(self.max_retries)
    }

    /// Delete every record in `ready`
    pub async fn delete_all<I: Deletable>(
        &self,
        ready: Vec<PendingDeletion<I>>,
    ) -> DeletionOutcome<I> {
        let kind = I::KIND;
        let total = ready.len();
        let mut queue = ready.into_iter();

        let results: Vec<_> = stream::iter(queue.by_ref())
            .take_until(self.cancel.cancelled())
            .map(|record| async move {
                let result = self.delete_one(&record.resource_id).await;
                (record, result)
            })
            .buffer_unordered(1)
            .collect()
            .await;

        let mut outcome = DeletionOutcome::default();
        for (record, result) in results {
            match result {
                Ok(()) => outcome.deleted.push(record),
                Err(e) => {
                    if e.is_not_found() {
                        // Dropped by the next staging run once it is absent from the inventory
                        info!(
                            kind = %kind,
                            resource_id = %record.resource_id,
                            "Already gone, returning to pending state"
                        );
                    } else {
                        warn!(
                            kind = %kind,
                            resource_id = %record.resource_id,
                            error = %e,
                            "Deletion failed, returning to pending state"
                        );
                    }
                    outcome.failed.push(FailedDeletion {
                        record,
                        error: e.to_string(),
                    });
                }
            }
        }
        outcome.unattempted = queue.collect();

        if !outcome.unattempted.is_empty() {
            warn!(
                kind = %kind,
                remaining = outcome.unattempted.len(),
                "Deletion queue cancelled"
            );
        }
        info!(
            kind = %kind,
            total,
            deleted = outcome.deleted.len(),
            failed = outcome.failed.len(),
            "Deletion queue drained"
        );
        outcome
    }

    async fn delete_one<I: Deletable>(&self, id: &I) -> Result<(), AwsError> {
        let kind = I::KIND;
        (|| async move {
            self.limiter.acquire().await;
            I::delete(self.ec2, id).await
        })
        .retry(self.backoff())
        .when(AwsError::is_retryable)
        .notify(|e, dur| {
            warn!(
                kind = %kind,
                resource_id = %id,
                delay = ?dur,
                error = %e,
                "Delete throttled, retrying..."
            );
        })
        .await?;

        debug!(kind = %kind, resource_id = %id, "Deleted");
        Ok(())
    }

    /// Write reference tags; failures are logged and counted only
    pub async fn write_tags(&self, updates: &[TagUpdate]) -> TagWriteSummary {
        let mut summary = TagWriteSummary::default();
        for update in updates {
            if self.cancel.is_cancelled() {
                break;
            }
            let result = (|| async move {
                self.limiter.acquire().await;
                self.ec2
                    .create_tags(&update.resource_id, update.tags())
                    .await
            })
            .retry(self.backoff())
            .when(AwsError::is_retryable)
            .await;

            match result {
                Ok(()) => summary.written += 1,
                Err(e) => {
                    warn!(
                        kind = %update.kind,
                        resource_id = %update.resource_id,
                        error = %e,
                        "Failed to write reference tags"
                    );
                    summary.failed += 1;
                }
            }
        }
        if summary.written > 0 || summary.failed > 0 {
            info!(
                written = summary.written,
                failed = summary.failed,
                "Reference tags updated"
            );
        }
        summary
    }
}
