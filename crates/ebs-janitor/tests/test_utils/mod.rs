//! Shared test utilities for integration tests
//!
//! An in-memory EC2 account and a sink that records reports, so whole
//! stage/delete cycles can run without AWS.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use ebs_janitor::aws::{AwsError, Ec2Operations};
use ebs_janitor::config::JanitorConfig;
use ebs_janitor::orchestrator::RunContext;
use ebs_janitor::report::ReportSink;
use ebs_janitor::state::StateStore;
use ebs_janitor_common::{
    ImageRecord, IngressRule, InstanceRecord, SecurityGroupRecord, SnapshotId, SnapshotRecord,
    VolumeId, VolumeRecord,
};
use std::collections::HashSet;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Account {
    volumes: Vec<VolumeRecord>,
    snapshots: Vec<SnapshotRecord>,
    instances: Vec<InstanceRecord>,
    images: Vec<ImageRecord>,
    security_groups: Vec<SecurityGroupRecord>,
    /// Ids whose delete is rejected as in use
    reject_deletes: HashSet<String>,
    fail_snapshot_listing: bool,
    delete_calls: Vec<String>,
    tag_calls: Vec<String>,
}

/// In-memory EC2 account
#[derive(Debug, Default)]
pub struct FakeEc2 {
    account: Mutex<Account>,
}

impl FakeEc2 {
    pub fn new(volumes: Vec<VolumeRecord>, snapshots: Vec<SnapshotRecord>) -> Self {
        let fake = Self::default();
        {
            let mut account = fake.account.lock().unwrap();
            account.volumes = volumes;
            account.snapshots = snapshots;
        }
        fake
    }

    pub fn with_images(self, images: Vec<ImageRecord>) -> Self {
        self.account.lock().unwrap().images = images;
        self
    }

    pub fn with_instances(self, instances: Vec<InstanceRecord>) -> Self {
        self.account.lock().unwrap().instances = instances;
        self
    }

    pub fn reject_delete(&self, id: &str) {
        self.account
            .lock()
            .unwrap()
            .reject_deletes
            .insert(id.to_string());
    }

    pub fn allow_delete(&self, id: &str) {
        self.account.lock().unwrap().reject_deletes.remove(id);
    }

    pub fn fail_snapshot_listing(&self, fail: bool) {
        self.account.lock().unwrap().fail_snapshot_listing = fail;
    }

    pub fn add_volume(&self, volume: VolumeRecord) {
        self.account.lock().unwrap().volumes.push(volume);
    }

    /// Set a tag on a volume or snapshot out-of-band
    pub fn set_tag(&self, resource_id: &str, key: &str, value: &str) {
        let mut account = self.account.lock().unwrap();
        apply_tags(
            &mut account,
            resource_id,
            &[(key.to_string(), value.to_string())],
        );
    }

    pub fn remove_tag(&self, resource_id: &str, key: &str) {
        let mut account = self.account.lock().unwrap();
        for v in account
            .volumes
            .iter_mut()
            .filter(|v| v.volume_id.as_str() == resource_id)
        {
            v.tags.remove(key);
        }
        for s in account
            .snapshots
            .iter_mut()
            .filter(|s| s.snapshot_id.as_str() == resource_id)
        {
            s.tags.remove(key);
        }
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.account.lock().unwrap().delete_calls.clone()
    }

    pub fn tag_calls(&self) -> Vec<String> {
        self.account.lock().unwrap().tag_calls.clone()
    }

    pub fn volume_ids(&self) -> Vec<String> {
        let account = self.account.lock().unwrap();
        account
            .volumes
            .iter()
            .map(|v| v.volume_id.to_string())
            .collect()
    }

    pub fn snapshot_ids(&self) -> Vec<String> {
        let account = self.account.lock().unwrap();
        account
            .snapshots
            .iter()
            .map(|s| s.snapshot_id.to_string())
            .collect()
    }

    fn delete(&self, id: &str) -> Result<(), AwsError> {
        let mut account = self.account.lock().unwrap();
        account.delete_calls.push(id.to_string());
        if account.reject_deletes.contains(id) {
            return Err(AwsError::InUse {
                message: format!("{id} is in use"),
            });
        }
        let before = account.volumes.len() + account.snapshots.len();
        account.volumes.retain(|v| v.volume_id.as_str() != id);
        account.snapshots.retain(|s| s.snapshot_id.as_str() != id);
        if account.volumes.len() + account.snapshots.len() == before {
            return Err(AwsError::NotFound {
                message: format!("{id} does not exist"),
            });
        }
        Ok(())
    }
}

fn apply_tags(account: &mut Account, resource_id: &str, tags: &[(String, String)]) {
    for v in account
        .volumes
        .iter_mut()
        .filter(|v| v.volume_id.as_str() == resource_id)
    {
        v.tags.extend(tags.iter().cloned());
    }
    for s in account
        .snapshots
        .iter_mut()
        .filter(|s| s.snapshot_id.as_str() == resource_id)
    {
        s.tags.extend(tags.iter().cloned());
    }
}

impl Ec2Operations for FakeEc2 {
    async fn list_volumes(&self) -> Result<Vec<VolumeRecord>, AwsError> {
        Ok(self.account.lock().unwrap().volumes.clone())
    }

    async fn list_snapshots(&self, _owner_ids: &[String]) -> Result<Vec<SnapshotRecord>, AwsError> {
        let account = self.account.lock().unwrap();
        if account.fail_snapshot_listing {
            return Err(AwsError::Sdk {
                code: Some("RequestTimeout".to_string()),
                message: "timed out".to_string(),
            });
        }
        Ok(account.snapshots.clone())
    }

    async fn list_instances(&self) -> Result<Vec<InstanceRecord>, AwsError> {
        Ok(self.account.lock().unwrap().instances.clone())
    }

    async fn list_images(&self, _owner_ids: &[String]) -> Result<Vec<ImageRecord>, AwsError> {
        Ok(self.account.lock().unwrap().images.clone())
    }

    async fn list_security_groups(&self) -> Result<Vec<SecurityGroupRecord>, AwsError> {
        Ok(self.account.lock().unwrap().security_groups.clone())
    }

    async fn delete_volume(&self, volume_id: &VolumeId) -> Result<(), AwsError> {
        self.delete(volume_id.as_str())
    }

    async fn delete_snapshot(&self, snapshot_id: &SnapshotId) -> Result<(), AwsError> {
        self.delete(snapshot_id.as_str())
    }

    async fn create_tags(
        &self,
        resource_id: &str,
        tags: Vec<(String, String)>,
    ) -> Result<(), AwsError> {
        let mut account = self.account.lock().unwrap();
        account.tag_calls.push(resource_id.to_string());
        apply_tags(&mut account, resource_id, &tags);
        Ok(())
    }

    async fn revoke_group_ingress(
        &self,
        _group_id: &str,
        _rule: IngressRule,
    ) -> Result<(), AwsError> {
        Ok(())
    }

    async fn delete_security_group(&self, group_id: &str) -> Result<(), AwsError> {
        let mut account = self.account.lock().unwrap();
        account.security_groups.retain(|g| g.group_id != group_id);
        Ok(())
    }
}

/// Sink that keeps every report
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> String {
        self.messages().last().cloned().unwrap_or_default()
    }
}

impl ReportSink for RecordingSink {
    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Temporary state directory plus the config pointing at it
pub struct Workspace {
    pub dir: TempDir,
    pub config: JanitorConfig,
    pub store: StateStore,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = JanitorConfig {
            state_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store = StateStore::from_config(&config);
        Self { dir, config, store }
    }

    pub fn context(&self, now: DateTime<Utc>) -> RunContext<'_> {
        RunContext {
            config: &self.config,
            store: &self.store,
            now,
            dry_run: false,
            cancel: CancellationToken::new(),
        }
    }
}
