//! ebs-janitor - Scheduled cleanup of unreferenced EBS resources
//!
//! This crate provides the `ebs-janitor` binary that stages detached volumes
//! and superseded or orphaned snapshots for deletion, deletes them once their
//! grace period has elapsed, and cleans up security groups by description.

pub mod aws;
pub mod config;
pub mod engine;
pub mod executor;
pub mod inventory;
pub mod orchestrator;
pub mod report;
pub mod state;
