//! `pending`: show both state files

use crate::report::format_time;
use crate::state::StateStore;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use ebs_janitor_common::{PendingDeletion, ResourceId};

fn add_rows<I: ResourceId>(table: &mut Table, records: &[PendingDeletion<I>], now: DateTime<Utc>) {
    for record in records {
        let status = if record.is_ready(now) {
            "ready"
        } else {
            "waiting"
        };
        table.add_row(vec![
            Cell::new(I::KIND.as_str()),
            Cell::new(&record.resource_id),
            Cell::new(format_time(record.deletion_at())),
            Cell::new(status),
        ]);
    }
}

/// Render the pending state as a table, or `None` when both files are empty
pub fn pending_table(store: &StateStore, now: DateTime<Utc>) -> Option<Table> {
    let volumes = store.load_volumes();
    let snapshots = store.load_snapshots();
    if volumes.is_empty() && snapshots.is_empty() {
        return None;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Type"),
            Cell::new("ID"),
            Cell::new("Delete after"),
            Cell::new("Status"),
        ]);
    add_rows(&mut table, &volumes, now);
    add_rows(&mut table, &snapshots, now);
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebs_janitor_common::{SnapshotId, VolumeId};
    use ebs_janitor_test_utils::{T0, at};
    use tempfile::TempDir;

    #[test]
    fn test_empty_state_has_no_table() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("v.json"), dir.path().join("s.json"));
        assert!(pending_table(&store, at(0)).is_none());
    }

    #[test]
    fn test_rows_mark_ready_records() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("v.json"), dir.path().join("s.json"));
        store
            .save_volumes(&[PendingDeletion::new(VolumeId::new("vol-1"), T0)])
            .unwrap();
        store
            .save_snapshots(&[PendingDeletion::new(SnapshotId::new("snap-1"), T0 + 60)])
            .unwrap();

        let table = pending_table(&store, at(0)).unwrap();
        assert_eq!(table.row_count(), 2);

        let text = table.to_string();
        assert!(text.contains("vol-1"));
        assert!(text.contains("snap-1"));
        assert!(text.contains("ready"));
        assert!(text.contains("waiting"));
    }
}
