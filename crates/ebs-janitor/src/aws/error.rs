//! AWS error classification and handling
//!
//! Provides typed errors for AWS SDK operations using the `.code()` method
//! instead of string matching on Debug format.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use thiserror::Error;

/// AWS error categories for retry and reporting logic
#[derive(Debug, Error)]
pub enum AwsError {
    /// Resource was not found (already deleted out-of-band)
    #[error("Resource not found: {message}")]
    NotFound { message: String },

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded")]
    Throttled,

    /// Resource has dependent objects (e.g. security group still referenced)
    #[error("Resource has dependent objects: {message}")]
    DependencyViolation { message: String },

    /// Resource is still in use (e.g. snapshot backing an AMI, attached volume)
    #[error("Resource in use: {message}")]
    InUse { message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    /// Check if this is a retryable error
    ///
    /// Only throttling is retried in-run; dependency and in-use failures are
    /// left for the next scheduled cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AwsError::Throttled)
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidVolume.NotFound",
    "InvalidSnapshot.NotFound",
    "InvalidGroup.NotFound",
    "InvalidPermission.NotFound",
    "InvalidInstanceID.NotFound",
    "InvalidAMIID.NotFound",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known AWS error codes for dependency violations
const DEPENDENCY_CODES: &[&str] = &["DependencyViolation"];

/// Known AWS error codes for resources that are still in use
const IN_USE_CODES: &[&str] = &["InvalidSnapshot.InUse", "VolumeInUse", "InvalidGroup.InUse"];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound { message },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled,
        Some(c) if DEPENDENCY_CODES.contains(&c) => AwsError::DependencyViolation { message },
        Some(c) if IN_USE_CODES.contains(&c) => AwsError::InUse { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify any SDK error that exposes error metadata.
///
/// `SdkError<E>` implements `ProvideErrorMetadata` for every EC2 operation
/// error, so one generic function covers all calls. Transport failures carry
/// no code and end up as `AwsError::Sdk { code: None, .. }` with the display
/// text of the error.
pub fn classify_sdk_error<E>(error: &E) -> AwsError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    match error.code() {
        Some(code) => classify_aws_error(Some(code), error.message()),
        None => AwsError::Sdk {
            code: None,
            message: error
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        },
    }
}
