//! Janitor configuration
//!
//! Loaded from an optional JSON file; every field has a default so an empty
//! object (or no file at all) gives the stock policy. CLI flags are applied on
//! top by the binary before `validate` runs.

use anyhow::{Context, Result};
use chrono::Duration;
use ebs_janitor_common::defaults::{
    SNAPSHOT_STATE_FILE, VOLUME_STATE_FILE, default_grace_period_hours, default_max_retries,
    default_owner_ids, default_rate_limit_per_sec, default_region,
    default_volume_age_threshold_hours,
};
use ebs_janitor_common::tags::{TAG_PROTECT_KEY, TAG_PROTECT_VALUE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Invalid configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rate_limit_per_sec must be at least 1")]
    ZeroRateLimit,

    #[error("grace_period_hours must be positive, got {0}")]
    InvalidGracePeriod(i64),

    #[error("volume_age_threshold_hours must not be negative, got {0}")]
    InvalidAgeThreshold(i64),

    #[error("owner_ids must not be empty")]
    EmptyOwnerIds,

    #[error("protect_tag.key must not be empty")]
    EmptyProtectTagKey,

    #[error("region must not be empty")]
    EmptyRegion,

    #[error("slack.webhook_url must not be empty")]
    EmptyWebhookUrl,

    #[error("{field} must be at most {max} hours, got {value}", max = MAX_HOURS)]
    HoursOutOfRange { field: &'static str, value: i64 },
}

/// Upper bound for hour-valued settings (100 years)
pub const MAX_HOURS: i64 = 100 * 365 * 24;

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Tag that exempts a resource from cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtectTag {
    pub key: String,
    pub value: String,
}

impl Default for ProtectTag {
    fn default() -> Self {
        Self {
            key: TAG_PROTECT_KEY.to_string(),
            value: TAG_PROTECT_VALUE.to_string(),
        }
    }
}

/// Retry policy for throttled provider calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

/// Slack incoming-webhook settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlackConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub icon_emoji: Option<String>,
}

/// Cleanup policy and environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JanitorConfig {
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// AWS profile name (overrides default credential resolution)
    #[serde(default)]
    pub aws_profile: Option<String>,

    /// Owner filter for snapshots and images (default: `self`)
    #[serde(default = "default_owner_ids")]
    pub owner_ids: Vec<String>,

    /// Detached volumes must be strictly older than this (default: 48)
    #[serde(default = "default_volume_age_threshold_hours")]
    pub volume_age_threshold_hours: i64,

    /// Time between staging and earliest deletion (default: 168)
    #[serde(default = "default_grace_period_hours")]
    pub grace_period_hours: i64,

    #[serde(default)]
    pub protect_tag: ProtectTag,

    /// Provider mutations per second (default: 2)
    #[serde(default = "default_rate_limit_per_sec")]
    pub rate_limit_per_sec: u32,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Directory holding the two pending-delete files
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Report to Slack instead of stdout when set
    #[serde(default)]
    pub slack: Option<SlackConfig>,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            aws_profile: None,
            owner_ids: default_owner_ids(),
            volume_age_threshold_hours: default_volume_age_threshold_hours(),
            grace_period_hours: default_grace_period_hours(),
            protect_tag: ProtectTag::default(),
            rate_limit_per_sec: default_rate_limit_per_sec(),
            retry: RetryPolicy::default(),
            state_dir: default_state_dir(),
            slack: None,
        }
    }
}

impl JanitorConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.is_empty() {
            return Err(ConfigError::EmptyRegion);
        }

        if self.owner_ids.is_empty() {
            return Err(ConfigError::EmptyOwnerIds);
        }

        if self.volume_age_threshold_hours < 0 {
            return Err(ConfigError::InvalidAgeThreshold(
                self.volume_age_threshold_hours,
            ));
        }

        if self.volume_age_threshold_hours > MAX_HOURS {
            return Err(ConfigError::HoursOutOfRange {
                field: "volume_age_threshold_hours",
                value: self.volume_age_threshold_hours,
            });
        }

        if self.grace_period_hours <= 0 {
            return Err(ConfigError::InvalidGracePeriod(self.grace_period_hours));
        }

        if self.grace_period_hours > MAX_HOURS {
            return Err(ConfigError::HoursOutOfRange {
                field: "grace_period_hours",
                value: self.grace_period_hours,
            });
        }

        if self.rate_limit_per_sec == 0 {
            return Err(ConfigError::ZeroRateLimit);
        }

        if self.protect_tag.key.is_empty() {
            return Err(ConfigError::EmptyProtectTagKey);
        }

        if self
            .slack
            .as_ref()
            .is_some_and(|slack| slack.webhook_url.is_empty())
        {
            return Err(ConfigError::EmptyWebhookUrl);
        }

        Ok(())
    }

    /// Saturates instead of overflowing for unvalidated values
    pub fn volume_age_threshold(&self) -> Duration {
        Duration::try_hours(self.volume_age_threshold_hours).unwrap_or(Duration::MAX)
    }

    /// Saturates instead of overflowing for unvalidated values
    pub fn grace_period(&self) -> Duration {
        Duration::try_hours(self.grace_period_hours).unwrap_or(Duration::MAX)
    }

    pub fn volume_state_path(&self) -> PathBuf {
        self.state_dir.join(VOLUME_STATE_FILE)
    }

    pub fn snapshot_state_path(&self) -> PathBuf {
        self.state_dir.join(SNAPSHOT_STATE_FILE)
    }
}
