//! Tag keys and values used by the janitor
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `DND` | Do-not-delete marker, honoured when the value is `true` |
//! | `RefInstanceName` | Name of the EC2 instance the volume/snapshot belongs to |
//! | `RefInstanceId` | Id of that instance |
//! | `Name` | Instance display name, read when building references |

/// Default protection tag key
pub const TAG_PROTECT_KEY: &str = "DND";

/// Default protection tag value
pub const TAG_PROTECT_VALUE: &str = "true";

/// Tag key holding the referenced instance name
pub const TAG_REF_INSTANCE_NAME: &str = "RefInstanceName";

/// Tag key holding the referenced instance id
pub const TAG_REF_INSTANCE_ID: &str = "RefInstanceId";

/// Instance display-name tag
pub const TAG_NAME: &str = "Name";

/// Placeholder for an instance reference that cannot be resolved
pub const UNKNOWN: &str = "unknown";
