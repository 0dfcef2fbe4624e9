//! Decides whether a property change touches authorization.
//!
//! Each tracked property is compared with absent-aware equality:
//! both absent → unchanged, exactly one absent → changed, both present →
//! plain string comparison. A change in any tracked property requires a sync.

use ranger_sync_core::PropertySnapshot;

/// `true` when hdfs folders, hive tables, or hive schema differ between
/// the two snapshots.
pub fn requires_sync(old: &PropertySnapshot, new: &PropertySnapshot) -> bool {
    field_changed(old.hdfs_folders.as_deref(), new.hdfs_folders.as_deref())
        || field_changed(old.hive_tables.as_deref(), new.hive_tables.as_deref())
        || field_changed(old.hive_schema.as_deref(), new.hive_schema.as_deref())
}

fn field_changed(old: Option<&str>, new: Option<&str>) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(old), Some(new)) => old != new,
        _ => true,
    }
}
