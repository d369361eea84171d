//! Point-in-time inventory of the account
//!
//! All four listings run concurrently and are joined before any lineage work
//! starts. A single failed listing aborts the whole fetch so a run never
//! reasons about a partial view of the account.

use crate::aws::{AwsError, Ec2Operations};
use ebs_janitor_common::{ImageRecord, InstanceRecord, SnapshotRecord, VolumeRecord};
use thiserror::Error;
use tracing::info;

/// A listing call failed; nothing downstream may run
#[derive(Debug, Error)]
#[error("Failed to list {listing}")]
pub struct InventoryError {
    pub listing: &'static str,
    #[source]
    pub source: AwsError,
}

impl InventoryError {
    fn wrap(listing: &'static str) -> impl FnOnce(AwsError) -> Self {
        move |source| Self { listing, source }
    }
}

/// Everything the engine needs from one account/region
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub volumes: Vec<VolumeRecord>,
    pub snapshots: Vec<SnapshotRecord>,
    pub instances: Vec<InstanceRecord>,
    pub images: Vec<ImageRecord>,
}

/// Fetch volumes, snapshots, instances and images concurrently
pub async fn fetch_inventory<E: Ec2Operations>(
    ec2: &E,
    owner_ids: &[String],
) -> Result<Inventory, InventoryError> {
    let (volumes, snapshots, instances, images) = tokio::try_join!(
        async {
            ec2.list_volumes()
                .await
                .map_err(InventoryError::wrap("volumes"))
        },
        async {
            ec2.list_snapshots(owner_ids)
                .await
                .map_err(InventoryError::wrap("snapshots"))
        },
        async {
            ec2.list_instances()
                .await
                .map_err(InventoryError::wrap("instances"))
        },
        async {
            ec2.list_images(owner_ids)
                .await
                .map_err(InventoryError::wrap("images"))
        },
    )?;

    info!(
        volumes = volumes.len(),
        snapshots = snapshots.len(),
        instances = instances.len(),
        images = images.len(),
        "Inventory fetched"
    );

    Ok(Inventory {
        volumes,
        snapshots,
        instances,
        images,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::MockEc2Operations;
    use ebs_janitor_test_utils::{image, instance, snapshot, volume};

    fn mock_listing_everything() -> MockEc2Operations {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_list_volumes()
            .returning(|| Ok(vec![volume("vol-1").build()]));
        ec2.expect_list_snapshots()
            .returning(|_| Ok(vec![snapshot("snap-1", "vol-1").build()]));
        ec2.expect_list_instances()
            .returning(|| Ok(vec![instance("i-1", Some("web"))]));
        ec2.expect_list_images()
            .returning(|_| Ok(vec![image("ami-1", &["snap-1"])]));
        ec2
    }

    #[tokio::test]
    async fn test_fetch_inventory_collects_all_listings() {
        let ec2 = mock_listing_everything();

        let inventory = fetch_inventory(&ec2, &["self".to_string()]).await.unwrap();
        assert_eq!(inventory.volumes.len(), 1);
        assert_eq!(inventory.snapshots.len(), 1);
        assert_eq!(inventory.instances.len(), 1);
        assert_eq!(inventory.images.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_inventory_passes_owner_filter() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_list_volumes().returning(|| Ok(Vec::new()));
        ec2.expect_list_snapshots()
            .withf(|owners: &[String]| owners == ["123456789012".to_string()])
            .returning(|_| Ok(Vec::new()));
        ec2.expect_list_instances().returning(|| Ok(Vec::new()));
        ec2.expect_list_images()
            .withf(|owners: &[String]| owners == ["123456789012".to_string()])
            .returning(|_| Ok(Vec::new()));

        let inventory = fetch_inventory(&ec2, &["123456789012".to_string()])
            .await
            .unwrap();
        assert!(inventory.volumes.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_names_the_listing() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_list_volumes().returning(|| Ok(Vec::new()));
        ec2.expect_list_snapshots()
            .returning(|_| Err(AwsError::Throttled));
        ec2.expect_list_instances().returning(|| Ok(Vec::new()));
        ec2.expect_list_images().returning(|_| Ok(Vec::new()));

        let err = fetch_inventory(&ec2, &["self".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.listing, "snapshots");
        assert_eq!(err.to_string(), "Failed to list snapshots");
        assert!(matches!(err.source, AwsError::Throttled));
    }
}
