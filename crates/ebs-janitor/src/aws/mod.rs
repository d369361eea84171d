//! AWS client modules
//!
//! This module provides wrappers around the AWS SDK for:
//! - EC2: volume, snapshot, image, instance and security group inventory
//! - EC2: deletions and tag writes issued by the janitor
//! - error: classification of provider failures

pub mod context;
pub mod ec2;
pub mod error;

pub use context::AwsContext;
pub use ec2::{Ec2Client, Ec2Operations};
pub use error::{AwsError, classify_aws_error, classify_sdk_error};

#[cfg(test)]
pub use ec2::MockEc2Operations;
