//! Typed resource identifiers
//!
//! Volumes and snapshots share the same string shape (`vol-...`, `snap-...`)
//! but must never be mixed up in state files or deletion queues, so each gets
//! its own newtype. [`ResourceId`] lets the reconciler and the state store be
//! written once for both.

use crate::resource_kind::ResourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Identifier of a resource that can be staged for deletion
pub trait ResourceId:
    Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + AsRef<str> + From<String> + Send + Sync
{
    /// Kind of resource this identifier names
    const KIND: ResourceKind;
}

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw provider identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ResourceId for $name {
            const KIND: ResourceKind = $kind;
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

resource_id!(
    /// EBS volume identifier (`vol-...`)
    VolumeId,
    ResourceKind::Volume
);

resource_id!(
    /// EBS snapshot identifier (`snap-...`)
    SnapshotId,
    ResourceKind::Snapshot
);
