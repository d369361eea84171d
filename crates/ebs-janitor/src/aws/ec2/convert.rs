//! Conversion from SDK shapes to inventory records
//!
//! Records without an identifier are dropped; every other missing field gets
//! a value that keeps the resource away from deletion (see each function).

use aws_sdk_ec2::primitives::DateTime as SdkDateTime;
use aws_sdk_ec2::types::{Image, Instance, SecurityGroup, Snapshot, Tag, Volume};
use chrono::{DateTime, Utc};
use ebs_janitor_common::{
    GroupPair, ImageRecord, IngressRule, InstanceRecord, SecurityGroupRecord, SnapshotId,
    SnapshotRecord, Tags, VolumeId, VolumeRecord, VolumeState,
};

fn to_utc(time: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

fn tag_map(tags: &[Tag]) -> Tags {
    tags.iter()
        .filter_map(|t| Some((t.key()?.to_string(), t.value().unwrap_or_default().to_string())))
        .collect()
}

/// Volume without a creation time is treated as brand new so it never
/// passes the age threshold.
pub(super) fn volume_record(volume: &Volume) -> Option<VolumeRecord> {
    let volume_id = volume.volume_id()?;

    Some(VolumeRecord {
        volume_id: VolumeId::new(volume_id),
        state: volume
            .state()
            .map(|s| VolumeState::parse(s.as_str()))
            .unwrap_or_else(|| VolumeState::Other("unknown".to_string())),
        create_time: volume
            .create_time()
            .and_then(to_utc)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        attached_instance: volume
            .attachments()
            .first()
            .and_then(|a| a.instance_id())
            .map(str::to_string),
        source_snapshot: volume
            .snapshot_id()
            .filter(|s| !s.is_empty())
            .map(SnapshotId::new),
        tags: tag_map(volume.tags()),
    })
}

/// Snapshot without a start time sorts as the oldest of its volume.
pub(super) fn snapshot_record(snapshot: &Snapshot) -> Option<SnapshotRecord> {
    let snapshot_id = snapshot.snapshot_id()?;

    Some(SnapshotRecord {
        snapshot_id: SnapshotId::new(snapshot_id),
        volume_id: VolumeId::new(snapshot.volume_id().unwrap_or_default()),
        start_time: snapshot
            .start_time()
            .and_then(to_utc)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        description: snapshot.description().unwrap_or_default().to_string(),
        tags: tag_map(snapshot.tags()),
    })
}

pub(super) fn image_record(image: &Image) -> Option<ImageRecord> {
    let image_id = image.image_id()?;

    Some(ImageRecord {
        image_id: image_id.to_string(),
        snapshot_ids: image
            .block_device_mappings()
            .iter()
            .filter_map(|m| m.ebs().and_then(|ebs| ebs.snapshot_id()))
            .map(SnapshotId::new)
            .collect(),
    })
}

pub(super) fn instance_record(instance: &Instance) -> Option<InstanceRecord> {
    Some(InstanceRecord {
        instance_id: instance.instance_id()?.to_string(),
        tags: tag_map(instance.tags()),
    })
}

pub(super) fn security_group_record(group: &SecurityGroup) -> Option<SecurityGroupRecord> {
    let group_id = group.group_id()?;

    let ingress = group
        .ip_permissions()
        .iter()
        .map(|p| IngressRule {
            protocol: p.ip_protocol().unwrap_or("-1").to_string(),
            from_port: p.from_port(),
            to_port: p.to_port(),
            cidr_ranges: p
                .ip_ranges()
                .iter()
                .filter_map(|r| r.cidr_ip())
                .map(str::to_string)
                .collect(),
            group_pairs: p
                .user_id_group_pairs()
                .iter()
                .filter_map(|pair| {
                    Some(GroupPair {
                        group_id: pair.group_id()?.to_string(),
                        user_id: pair.user_id().map(str::to_string),
                    })
                })
                .collect(),
        })
        .collect();

    Some(SecurityGroupRecord {
        group_id: group_id.to_string(),
        group_name: group.group_name().unwrap_or_default().to_string(),
        description: group.description().unwrap_or_default().to_string(),
        ingress,
    })
}
