//! Default configuration values
//!
//! These constants keep the CLI, the config file loader and the tests on the
//! same defaults.

/// Detached volumes younger than this are never staged (2 days)
pub const DEFAULT_VOLUME_AGE_THRESHOLD_HOURS: i64 = 48;

/// Time between first staging and the earliest deletion (1 week)
pub const DEFAULT_GRACE_PERIOD_HOURS: i64 = 168;

/// Provider mutations per second allowed by the deletion queue
pub const DEFAULT_RATE_LIMIT_PER_SEC: u32 = 2;

/// Retries for throttled provider calls
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Owner filter used for snapshots and images when none is configured
pub const DEFAULT_OWNER_ID: &str = "self";

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// File holding staged volume deletions
pub const VOLUME_STATE_FILE: &str = "volumes-pending-delete.json";

/// File holding staged snapshot deletions
pub const SNAPSHOT_STATE_FILE: &str = "snapshots-pending-delete.json";

// Serde default functions for struct field defaults

/// Returns the default volume age threshold
pub fn default_volume_age_threshold_hours() -> i64 {
    DEFAULT_VOLUME_AGE_THRESHOLD_HOURS
}

/// Returns the default grace period
pub fn default_grace_period_hours() -> i64 {
    DEFAULT_GRACE_PERIOD_HOURS
}

/// Returns the default rate limit
pub fn default_rate_limit_per_sec() -> u32 {
    DEFAULT_RATE_LIMIT_PER_SEC
}

/// Returns the default retry count
pub fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

/// Returns the default owner filter
pub fn default_owner_ids() -> Vec<String> {
    vec![DEFAULT_OWNER_ID.to_string()]
}

/// Returns the default region
pub fn default_region() -> String {
    DEFAULT_REGION.to_string()
}
