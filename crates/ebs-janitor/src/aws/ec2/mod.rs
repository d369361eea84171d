//! EC2 inventory and mutation calls

mod convert;
mod operations;
mod security_group;

pub use operations::Ec2Operations;

#[cfg(test)]
pub use operations::MockEc2Operations;

use crate::aws::context::AwsContext;
use crate::aws::error::{AwsError, classify_sdk_error};
use aws_sdk_ec2::{
    Client,
    types::{Filter, Tag},
};
use ebs_janitor_common::{
    ImageRecord, InstanceRecord, SnapshotId, SnapshotRecord, VolumeId, VolumeRecord,
};
use tracing::{debug, info};

/// EC2 client for inventory and cleanup calls
pub struct Ec2Client {
    pub(crate) client: Client,
}

impl Ec2Client {
    /// Create a new EC2 client (loads AWS config from environment)
    pub async fn new(region: &str, profile: Option<&str>) -> Self {
        let ctx = AwsContext::new(region, profile).await;
        Self::from_context(&ctx)
    }

    /// Create an EC2 client from a pre-loaded AWS context
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    /// List attached and detached volumes
    ///
    /// Volumes that are being created or deleted are left out.
    pub async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, AwsError> {
        let volumes = self
            .client
            .describe_volumes()
            .filters(
                Filter::builder()
                    .name("status")
                    .values("available")
                    .values("in-use")
                    .build(),
            )
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let records: Vec<_> = volumes.iter().filter_map(convert::volume_record).collect();
        debug!(count = records.len(), "Listed volumes");
        Ok(records)
    }

    /// List completed snapshots owned by `owner_ids`
    pub async fn list_snapshots(
        &self,
        owner_ids: &[String],
    ) -> Result<Vec<SnapshotRecord>, AwsError> {
        let snapshots = self
            .client
            .describe_snapshots()
            .set_owner_ids(Some(owner_ids.to_vec()))
            .filters(Filter::builder().name("status").values("completed").build())
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let records: Vec<_> = snapshots
            .iter()
            .filter_map(convert::snapshot_record)
            .collect();
        debug!(count = records.len(), "Listed snapshots");
        Ok(records)
    }

    /// List all instances (only used for name lookups, so no filters)
    pub async fn list_instances(&self) -> Result<Vec<InstanceRecord>, AwsError> {
        let reservations = self
            .client
            .describe_instances()
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let records: Vec<_> = reservations
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(convert::instance_record)
            .collect();
        debug!(count = records.len(), "Listed instances");
        Ok(records)
    }

    /// List images owned by `owner_ids`
    pub async fn list_images(&self, owner_ids: &[String]) -> Result<Vec<ImageRecord>, AwsError> {
        let response = self
            .client
            .describe_images()
            .set_owners(Some(owner_ids.to_vec()))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let records: Vec<_> = response
            .images()
            .iter()
            .filter_map(convert::image_record)
            .collect();
        debug!(count = records.len(), "Listed images");
        Ok(records)
    }

    /// Delete a volume
    pub async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), AwsError> {
        self.client
            .delete_volume()
            .volume_id(volume_id.as_str())
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        info!(volume_id = %volume_id, "Volume deleted");
        Ok(())
    }

    /// Delete a snapshot
    pub async fn delete_snapshot(&self, snapshot_id: &SnapshotId) -> Result<(), AwsError> {
        self.client
            .delete_snapshot()
            .snapshot_id(snapshot_id.as_str())
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        info!(snapshot_id = %snapshot_id, "Snapshot deleted");
        Ok(())
    }

    /// Add or overwrite tags on a single resource
    pub async fn create_tags(
        &self,
        resource_id: &str,
        tags: Vec<(String, String)>,
    ) -> Result<(), AwsError> {
        let tags: Vec<Tag> = tags
            .into_iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect();

        self.client
            .create_tags()
            .resources(resource_id)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        debug!(resource_id = %resource_id, "Tags written");
        Ok(())
    }
}
