//! `security-groups`: unlock or delete groups by description
//!
//! Groups that reference each other cannot be deleted until the
//! group-to-group ingress rules between them are revoked, hence two passes.

use crate::aws::{AwsError, Ec2Operations};
use crate::executor::RateLimiter;
use crate::report::{self, GroupOutcome, GroupResult, ReportSink, SecurityGroupReport};
use anyhow::{Context, Result};
use ebs_janitor_common::{IngressRule, SecurityGroupRecord};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityGroupAction {
    /// Revoke ingress rules that reference other groups
    Unlock,
    Delete,
}

impl fmt::Display for SecurityGroupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SecurityGroupAction::Unlock => "unlock",
            SecurityGroupAction::Delete => "delete",
        })
    }
}

/// Ingress rules with at least one group pair
fn group_rules(group: &SecurityGroupRecord) -> Vec<IngressRule> {
    group
        .ingress
        .iter()
        .filter(|rule| !rule.group_pairs.is_empty())
        .cloned()
        .collect()
}

async fn unlock<E: Ec2Operations>(
    ec2: &E,
    limiter: &RateLimiter,
    group: &SecurityGroupRecord,
    rules: Vec<IngressRule>,
) -> Result<(), AwsError> {
    for rule in rules {
        limiter.acquire().await;
        ec2.revoke_group_ingress(&group.group_id, rule).await?;
    }
    Ok(())
}

/// Apply `action` to every group whose description equals `description`
///
/// Without `execute` nothing is changed and each group is reported as what
/// would happen. Per-group failures are logged and reported; they do not stop
/// the run.
pub async fn run_security_groups<E: Ec2Operations, S: ReportSink>(
    ec2: &E,
    sink: &S,
    action: SecurityGroupAction,
    description: &str,
    execute: bool,
    rate_limit_per_sec: u32,
) -> Result<SecurityGroupReport> {
    let groups = ec2
        .list_security_groups()
        .await
        .context("Failed to list security groups")?;
    let matching: Vec<_> = groups
        .into_iter()
        .filter(|g| g.description == description)
        .collect();
    info!(
        action = %action,
        description,
        matched = matching.len(),
        execute,
        "Security group cleanup"
    );

    let limiter = RateLimiter::per_second(rate_limit_per_sec);
    let mut results = Vec::with_capacity(matching.len());

    for group in &matching {
        let outcome = match action {
            SecurityGroupAction::Unlock => {
                let rules = group_rules(group);
                if rules.is_empty() {
                    GroupOutcome::Unchanged
                } else if !execute {
                    GroupOutcome::WouldApply
                } else {
                    match unlock(ec2, &limiter, group, rules).await {
                        Ok(()) => GroupOutcome::Applied,
                        Err(e) => GroupOutcome::Failed(e.to_string()),
                    }
                }
            }
            SecurityGroupAction::Delete => {
                if !execute {
                    GroupOutcome::WouldApply
                } else {
                    limiter.acquire().await;
                    match ec2.delete_security_group(&group.group_id).await {
                        Ok(()) => GroupOutcome::Applied,
                        Err(e) => GroupOutcome::Failed(e.to_string()),
                    }
                }
            }
        };

        if let GroupOutcome::Failed(error) = &outcome {
            warn!(
                sg_id = %group.group_id,
                action = %action,
                error = %error,
                "Security group cleanup failed"
            );
        }
        results.push(GroupResult {
            group_id: group.group_id.clone(),
            group_name: group.group_name.clone(),
            outcome,
        });
    }

    let sg_report = SecurityGroupReport {
        action,
        description: description.to_string(),
        execute,
        results,
    };
    report::emit(sink, &sg_report.render()).await;
    Ok(sg_report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::MockEc2Operations;
    use crate::report::RecordingSink;
    use ebs_janitor_test_utils::security_group;

    fn groups() -> Vec<SecurityGroupRecord> {
        vec![
            security_group("sg-a", "ci runners", &["sg-b"]),
            security_group("sg-b", "ci runners", &[]),
            security_group("sg-c", "web", &["sg-a"]),
        ]
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_list_security_groups().returning(|| Ok(groups()));
        ec2.expect_revoke_group_ingress().never();
        ec2.expect_delete_security_group().never();

        let sink = RecordingSink::default();
        let report = run_security_groups(
            &ec2,
            &sink,
            SecurityGroupAction::Unlock,
            "ci runners",
            false,
            2,
        )
        .await
        .unwrap();

        let outcomes: Vec<_> = report.results.iter().map(|r| r.outcome.clone()).collect();
        assert_eq!(
            outcomes,
            vec![GroupOutcome::WouldApply, GroupOutcome::Unchanged]
        );
        assert!(sink.messages()[0].contains("[dry run]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_revokes_group_pairs_only() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_list_security_groups().returning(|| Ok(groups()));
        ec2.expect_revoke_group_ingress()
            .withf(|group_id, rule| {
                group_id == "sg-a"
                    && rule.group_pairs.len() == 1
                    && rule.group_pairs[0].group_id == "sg-b"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let sink = RecordingSink::default();
        let report = run_security_groups(
            &ec2,
            &sink,
            SecurityGroupAction::Unlock,
            "ci runners",
            true,
            2,
        )
        .await
        .unwrap();

        assert_eq!(report.results[0].outcome, GroupOutcome::Applied);
        assert_eq!(report.failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_failure_does_not_stop_run() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_list_security_groups().returning(|| Ok(groups()));
        ec2.expect_delete_security_group()
            .withf(|group_id| group_id == "sg-a")
            .returning(|_| {
                Err(AwsError::DependencyViolation {
                    message: "referenced by sg-c".to_string(),
                })
            });
        ec2.expect_delete_security_group()
            .withf(|group_id| group_id == "sg-b")
            .returning(|_| Ok(()));

        let sink = RecordingSink::default();
        let report = run_security_groups(
            &ec2,
            &sink,
            SecurityGroupAction::Delete,
            "ci runners",
            true,
            2,
        )
        .await
        .unwrap();

        assert_eq!(report.results.len(), 2);
        assert!(matches!(report.results[0].outcome, GroupOutcome::Failed(_)));
        assert_eq!(report.results[1].outcome, GroupOutcome::Applied);
        assert_eq!(report.failures(), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let mut ec2 = MockEc2Operations::new();
        ec2.expect_list_security_groups()
            .returning(|| Err(AwsError::Throttled));

        let sink = RecordingSink::default();
        let result = run_security_groups(
            &ec2,
            &sink,
            SecurityGroupAction::Delete,
            "ci runners",
            true,
            2,
        )
        .await;
        assert!(result.is_err());
        assert!(sink.messages().is_empty());
    }
}
