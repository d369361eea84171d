//! Kinds of resources the janitor removes

/// Types of block-storage resources handled by the janitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// EBS volume
    Volume,
    /// EBS snapshot
    Snapshot,
    /// EC2 security group
    SecurityGroup,
}

impl ResourceKind {
    /// Short lowercase name for logs
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Volume => "volume",
            ResourceKind::Snapshot => "snapshot",
            ResourceKind::SecurityGroup => "security-group",
        }
    }

    /// Field name carrying the identifier in persisted state files
    pub fn id_field(self) -> &'static str {
        match self {
            ResourceKind::Volume => "VolumeId",
            ResourceKind::Snapshot => "SnapshotId",
            ResourceKind::SecurityGroup => "GroupId",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_fields_match_state_format() {
        assert_eq!(ResourceKind::Volume.id_field(), "VolumeId");
        assert_eq!(ResourceKind::Snapshot.id_field(), "SnapshotId");
    }

    #[test]
    fn test_display() {
        assert_eq!(ResourceKind::Snapshot.to_string(), "snapshot");
        assert_eq!(ResourceKind::SecurityGroup.to_string(), "security-group");
    }
}
