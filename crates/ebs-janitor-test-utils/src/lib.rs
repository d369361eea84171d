//! Shared test utilities for ebs-janitor
//!
//! This crate provides record builders and fixed clocks so unit tests and
//! integration tests describe inventories the same way.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection for `#[ignore]`d live tests
//! - [`fixtures`]: Builders for volumes, snapshots, images and instances

pub mod aws;
pub mod fixtures;

// Re-export commonly used items
pub use aws::get_test_region;
pub use fixtures::{T0, at, days, image, instance, security_group, snapshot, volume};
