//! Persisted pending-deletion records
//!
//! State files are JSON arrays of `{ "<IdField>": "...", "DeletionTime": <unix secs> }`
//! where the id field is `VolumeId` or `SnapshotId`. The field name is taken
//! from [`ResourceId::KIND`], so one generic record type serves both files and
//! a volume state file can never be read back as snapshots.

use crate::ids::ResourceId;
use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

const DELETION_TIME_FIELD: &str = "DeletionTime";

/// A resource staged for deletion
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingDeletion<I> {
    pub resource_id: I,
    /// Earliest deletion time, unix seconds
    pub deletion_time: i64,
}

impl<I: ResourceId> PendingDeletion<I> {
    pub fn new(resource_id: I, deletion_time: i64) -> Self {
        Self {
            resource_id,
            deletion_time,
        }
    }

    /// Whether the grace period has elapsed at `now`
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.deletion_time <= now.timestamp()
    }

    /// Deletion time as a UTC timestamp (falls back to the epoch if out of range)
    pub fn deletion_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.deletion_time, 0).unwrap_or_default()
    }
}

impl<I: ResourceId> Serialize for PendingDeletion<I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("PendingDeletion", 2)?;
        record.serialize_field(I::KIND.id_field(), self.resource_id.as_ref())?;
        record.serialize_field(DELETION_TIME_FIELD, &self.deletion_time)?;
        record.end()
    }
}

impl<'de, I: ResourceId> Deserialize<'de> for PendingDeletion<I> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PendingVisitor(PhantomData))
    }
}

struct PendingVisitor<I>(PhantomData<I>);

impl<'de, I: ResourceId> Visitor<'de> for PendingVisitor<I> {
    type Value = PendingDeletion<I>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "an object with `{}` and `{}`",
            I::KIND.id_field(),
            DELETION_TIME_FIELD
        )
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let id_field = I::KIND.id_field();
        let mut resource_id: Option<String> = None;
        let mut deletion_time: Option<i64> = None;

        while let Some(key) = map.next_key::<String>()? {
            if key == id_field {
                if resource_id.is_some() {
                    return Err(de::Error::duplicate_field(id_field));
                }
                resource_id = Some(map.next_value()?);
            } else if key == DELETION_TIME_FIELD {
                if deletion_time.is_some() {
                    return Err(de::Error::duplicate_field(DELETION_TIME_FIELD));
                }
                deletion_time = Some(map.next_value()?);
            } else {
                map.next_value::<de::IgnoredAny>()?;
            }
        }

        let resource_id = resource_id.ok_or_else(|| de::Error::missing_field(id_field))?;
        let deletion_time =
            deletion_time.ok_or_else(|| de::Error::missing_field(DELETION_TIME_FIELD))?;

        Ok(PendingDeletion {
            resource_id: I::from(resource_id),
            deletion_time,
        })
    }
}
