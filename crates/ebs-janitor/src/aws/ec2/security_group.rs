//! Security group inventory and cleanup calls

use super::Ec2Client;
use super::convert;
use crate::aws::error::{AwsError, classify_sdk_error};
use aws_sdk_ec2::types::{IpPermission, UserIdGroupPair};
use ebs_janitor_common::{IngressRule, SecurityGroupRecord};
use tracing::{debug, info};

impl Ec2Client {
    /// List all security groups with their ingress rules
    pub async fn list_security_groups(&self) -> Result<Vec<SecurityGroupRecord>, AwsError> {
        let groups = self
            .client
            .describe_security_groups()
            .into_paginator()
            .items()
            .send()
            .try_collect()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let records: Vec<_> = groups
            .iter()
            .filter_map(convert::security_group_record)
            .collect();
        debug!(count = records.len(), "Listed security groups");
        Ok(records)
    }

    /// Revoke the group-to-group part of an ingress rule
    ///
    /// Only the protocol, port range and referenced groups of `rule` are sent;
    /// CIDR ranges on the same rule stay in place.
    pub async fn revoke_group_ingress(
        &self,
        group_id: &str,
        rule: IngressRule,
    ) -> Result<(), AwsError> {
        let pairs: Vec<UserIdGroupPair> = rule
            .group_pairs
            .iter()
            .map(|pair| {
                UserIdGroupPair::builder()
                    .group_id(&pair.group_id)
                    .set_user_id(pair.user_id.clone())
                    .build()
            })
            .collect();

        let permission = IpPermission::builder()
            .ip_protocol(&rule.protocol)
            .set_from_port(rule.from_port)
            .set_to_port(rule.to_port)
            .set_user_id_group_pairs(Some(pairs))
            .build();

        self.client
            .revoke_security_group_ingress()
            .group_id(group_id)
            .ip_permissions(permission)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        info!(sg_id = %group_id, protocol = %rule.protocol, "Group references revoked");
        Ok(())
    }

    /// Delete a security group
    pub async fn delete_security_group(&self, group_id: &str) -> Result<(), AwsError> {
        self.client
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;
        info!(sg_id = %group_id, "Security group deleted");
        Ok(())
    }
}
