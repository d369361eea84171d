//! Command orchestration
//!
//! One module per CLI command. Each function is generic over the provider
//! ([`Ec2Operations`](crate::aws::Ec2Operations)) and the report destination
//! ([`ReportSink`](crate::report::ReportSink)) so whole runs can be driven
//! against fakes in tests.

pub mod delete;
pub mod pending;
pub mod security_groups;
pub mod stage;

pub use delete::run_delete;
pub use pending::pending_table;
pub use security_groups::{SecurityGroupAction, run_security_groups};
pub use stage::run_stage;

use crate::config::JanitorConfig;
use crate::state::StateStore;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Everything a staging or deletion run needs besides the provider and sink
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub config: &'a JanitorConfig,
    pub store: &'a StateStore,
    pub now: DateTime<Utc>,
    pub dry_run: bool,
    pub cancel: CancellationToken,
}
