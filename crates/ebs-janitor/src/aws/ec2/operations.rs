//! EC2 operations trait for testing

use super::Ec2Client;
use crate::aws::error::AwsError;
use ebs_janitor_common::{
    ImageRecord, IngressRule, InstanceRecord, SecurityGroupRecord, SnapshotId, SnapshotRecord,
    VolumeId, VolumeRecord,
};

/// Trait for the EC2 calls the janitor makes.
///
/// Staging, deletion and security group cleanup only talk to EC2 through
/// this trait, so they can be exercised without hitting real AWS.
///
/// Note: tags are passed as owned pairs to work around mockall lifetime
/// limitations.
#[allow(async_fn_in_trait)] // Internal use only, Send+Sync bounds on trait are sufficient
#[cfg_attr(test, mockall::automock)]
pub trait Ec2Operations: Send + Sync {
    /// List attached and detached volumes
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, AwsError>;

    /// List completed snapshots owned by `owner_ids`
    async fn list_snapshots(&self, owner_ids: &[String]) -> Result<Vec<SnapshotRecord>, AwsError>;

    /// List all instances
    async fn list_instances(&self) -> Result<Vec<InstanceRecord>, AwsError>;

    /// List images owned by `owner_ids`
    async fn list_images(&self, owner_ids: &[String]) -> Result<Vec<ImageRecord>, AwsError>;

    /// List security groups with their ingress rules
    async fn list_security_groups(&self) -> Result<Vec<SecurityGroupRecord>, AwsError>;

    /// Delete a volume
    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), AwsError>;

    /// Delete a snapshot
    async fn delete_snapshot(&self, snapshot_id: &SnapshotId) -> Result<(), AwsError>;

    /// Add or overwrite tags on a resource
    async fn create_tags(
        &self,
        resource_id: &str,
        tags: Vec<(String, String)>,
    ) -> Result<(), AwsError>;

    /// Revoke the group references of an ingress rule
    async fn revoke_group_ingress(&self, group_id: &str, rule: IngressRule)
    -> Result<(), AwsError>;

    /// Delete a security group
    async fn delete_security_group(&self, group_id: &str) -> Result<(), AwsError>;
}

impl Ec2Operations for Ec2Client {
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, AwsError> {
        Ec2Client::list_volumes(self).await
    }

    async fn list_snapshots(&self, owner_ids: &[String]) -> Result<Vec<SnapshotRecord>, AwsError> {
        Ec2Client::list_snapshots(self, owner_ids).await
    }

    async fn list_instances(&self) -> Result<Vec<InstanceRecord>, AwsError> {
        Ec2Client::list_instances(self).await
    }

    async fn list_images(&self, owner_ids: &[String]) -> Result<Vec<ImageRecord>, AwsError> {
        Ec2Client::list_images(self, owner_ids).await
    }

    async fn list_security_groups(&self) -> Result<Vec<SecurityGroupRecord>, AwsError> {
        Ec2Client::list_security_groups(self).await
    }

    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), AwsError> {
        Ec2Client::delete_volume(self, volume_id).await
    }

    async fn delete_snapshot(&self, snapshot_id: &SnapshotId) -> Result<(), AwsError> {
        Ec2Client::delete_snapshot(self, snapshot_id).await
    }

    async fn create_tags(
        &self,
        resource_id: &str,
        tags: Vec<(String, String)>,
    ) -> Result<(), AwsError> {
        Ec2Client::create_tags(self, resource_id, tags).await
    }

    async fn revoke_group_ingress(
        &self,
        group_id: &str,
        rule: IngressRule,
    ) -> Result<(), AwsError> {
        Ec2Client::revoke_group_ingress(self, group_id, rule).await
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<(), AwsError> {
        Ec2Client::delete_security_group(self, group_id).await
    }
}
