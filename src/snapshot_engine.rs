/*!
Snapshot construction, ancestry, reference management, and retention/expiration (§4.E).
Grounded in the teacher's `transaction/operation.rs`, which built one-off `Snapshot` values
inline inside a single append operation; this module generalizes that construction step and
adds the ancestry/ref/retention machinery the teacher never built.
*/
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use crate::error::{IcebergError, Result};
use crate::model::manifest::DataFile;
use crate::model::snapshot::{Operation, Retention, Snapshot, SnapshotReference, Summary};

/// Aggregated statistics fed into [build_snapshot] for the canonical `summary` keys.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotStats {
    /// Data files added by this snapshot.
    pub added_data_files: i64,
    /// Data files removed by this snapshot.
    pub deleted_data_files: i64,
    /// Rows added by this snapshot.
    pub added_records: i64,
    /// Rows removed by this snapshot.
    pub deleted_records: i64,
    /// Size in bytes of files added by this snapshot.
    pub added_files_size: i64,
    /// Size in bytes of files removed by this snapshot.
    pub removed_files_size: i64,
    /// Running total of rows across the table after this snapshot.
    pub total_records: i64,
    /// Running total of file bytes across the table after this snapshot.
    pub total_files_size: i64,
    /// Running total of data files across the table after this snapshot.
    pub total_data_files: i64,
}

/// v3-only row-lineage fields for a newly built snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct RowLineage {
    /// First row id assigned by this snapshot.
    pub first_row_id: Option<i64>,
    /// Number of rows assigned ids by this snapshot.
    pub added_rows: Option<i64>,
    /// Encryption key id protecting this snapshot's manifests.
    pub key_id: Option<i64>,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn new_snapshot_id() -> i64 {
    let mut buf = [0u8; 8];
    getrandom::getrandom(&mut buf).expect("system random source unavailable");
    i64::from_le_bytes(buf) & i64::MAX
}

/// Builds a new snapshot on top of `parent` (or the first snapshot of a table if `None`).
pub fn build_snapshot(
    parent: Option<&Snapshot>,
    operation: Operation,
    manifest_list: String,
    schema_id: Option<i32>,
    stats: SnapshotStats,
    extra_summary: HashMap<String, String>,
    lineage: RowLineage,
) -> Snapshot {
    let sequence_number = parent.map(|p| p.sequence_number + 1).unwrap_or(1);
    let mut other = extra_summary;
    other.insert("added-data-files".to_string(), stats.added_data_files.to_string());
    other.insert("deleted-data-files".to_string(), stats.deleted_data_files.to_string());
    other.insert("added-records".to_string(), stats.added_records.to_string());
    other.insert("deleted-records".to_string(), stats.deleted_records.to_string());
    other.insert("added-files-size".to_string(), stats.added_files_size.to_string());
    other.insert("removed-files-size".to_string(), stats.removed_files_size.to_string());
    other.insert("total-records".to_string(), stats.total_records.to_string());
    other.insert("total-files-size".to_string(), stats.total_files_size.to_string());
    other.insert("total-data-files".to_string(), stats.total_data_files.to_string());

    Snapshot {
        snapshot_id: new_snapshot_id(),
        parent_snapshot_id: parent.map(|p| p.snapshot_id),
        sequence_number,
        timestamp_ms: now_ms(),
        manifest_list,
        summary: Summary { operation: Some(operation), other },
        schema_id,
        first_row_id: lineage.first_row_id,
        added_rows: lineage.added_rows,
        key_id: lineage.key_id,
    }
}

/// Read-only view over a table's snapshot set, used for ancestry/lookup/retention queries.
pub struct SnapshotManager<'a> {
    by_id: HashMap<i64, &'a Snapshot>,
}

impl<'a> SnapshotManager<'a> {
    /// Indexes a slice of snapshots by id.
    pub fn new(snapshots: &'a [Snapshot]) -> Self {
        SnapshotManager { by_id: snapshots.iter().map(|s| (s.snapshot_id, s)).collect() }
    }

    /// `[s(id), s(s(id).parent), ...]`, stopping when a parent id is absent from the set.
    pub fn ancestors(&self, id: i64) -> Vec<&'a Snapshot> {
        let mut chain = Vec::new();
        let mut current = self.by_id.get(&id).copied();
        while let Some(s) = current {
            chain.push(s);
            current = s.parent_snapshot_id.and_then(|pid| self.by_id.get(&pid).copied());
        }
        chain
    }

    /// Resolves a ref name to its snapshot.
    pub fn by_ref<'r>(&self, name: &str, refs: &'r HashMap<String, SnapshotReference>) -> Option<&'a Snapshot> {
        refs.get(name).and_then(|r| self.by_id.get(&r.snapshot_id).copied())
    }

    /// The latest snapshot at or before `timestamp_ms`, ties broken by the larger sequence
    /// number. `None` if every snapshot is strictly after `timestamp_ms`.
    pub fn by_timestamp(&self, timestamp_ms: i64) -> Option<&'a Snapshot> {
        self.by_id
            .values()
            .filter(|s| s.timestamp_ms <= timestamp_ms)
            .copied()
            .max_by_key(|s| (s.timestamp_ms, s.sequence_number))
    }
}

/// Sets or replaces a named ref, validating the target snapshot exists.
pub fn set_ref(
    refs: &mut HashMap<String, SnapshotReference>,
    snapshots: &[Snapshot],
    name: String,
    snapshot_id: i64,
    retention: Retention,
) -> Result<()> {
    if !snapshots.iter().any(|s| s.snapshot_id == snapshot_id) {
        return Err(IcebergError::BrokenSchemaInvariant(format!(
            "cannot set ref {name} to unknown snapshot {snapshot_id}"
        )));
    }
    refs.insert(name, SnapshotReference { snapshot_id, retention });
    Ok(())
}

/// Removes a named ref; a no-op if it doesn't exist.
pub fn remove_ref(refs: &mut HashMap<String, SnapshotReference>, name: &str) {
    refs.remove(name);
}

/// Result of [find_expired]: which snapshots should be dropped and which kept.
#[derive(Debug, Default, Clone)]
pub struct ExpirationPlan {
    /// Snapshot ids no longer reachable under the retention policy.
    pub expired_ids: Vec<i64>,
    /// Snapshot ids retained.
    pub kept_ids: Vec<i64>,
    /// Data files newly unreferenced by expiration (informational; the engine does not delete).
    pub deleted_data_files_count: i64,
    /// Manifest files newly unreferenced by expiration (informational).
    pub deleted_manifest_files_count: i64,
}

/// Computes which snapshots may be expired as of `as_of_ms`, given the table's current refs
/// and a table-wide fallback retention policy (`None` fields fall through to "keep").
pub fn find_expired(
    snapshots: &[Snapshot],
    refs: &HashMap<String, SnapshotReference>,
    current_snapshot_id: Option<i64>,
    as_of_ms: i64,
    max_snapshot_age_ms: Option<i64>,
    min_snapshots_to_keep: usize,
) -> ExpirationPlan {
    let manager = SnapshotManager::new(snapshots);
    let mut keep: HashSet<i64> = HashSet::new();

    for (_, r) in refs {
        for ancestor in manager.ancestors(r.snapshot_id) {
            keep.insert(ancestor.snapshot_id);
        }
    }
    if let Some(id) = current_snapshot_id {
        keep.insert(id);
    }

    if let Some(max_age) = max_snapshot_age_ms {
        for s in snapshots {
            if as_of_ms.saturating_sub(s.timestamp_ms) <= max_age {
                keep.insert(s.snapshot_id);
            }
        }
    }

    let mut by_time: Vec<&Snapshot> = snapshots.iter().collect();
    by_time.sort_by_key(|s| std::cmp::Reverse(s.timestamp_ms));
    for s in by_time.into_iter().take(min_snapshots_to_keep) {
        keep.insert(s.snapshot_id);
    }

    let mut expired = Vec::new();
    let mut kept = Vec::new();
    for s in snapshots {
        if keep.contains(&s.snapshot_id) {
            kept.push(s.snapshot_id);
        } else {
            expired.push(s.snapshot_id);
        }
    }

    ExpirationPlan {
        deleted_data_files_count: 0,
        deleted_manifest_files_count: 0,
        expired_ids: expired,
        kept_ids: kept,
    }
}

/// v3 deletion-vector rule 1/3/4 enforcement when adding a position-delete entry (§4.E).
/// `existing_dv_referenced_files` lists the data files already covered by a `status=ADDED`
/// DV entry earlier in the same snapshot.
pub fn check_v3_position_delete(
    format_version: i32,
    file: &DataFile,
    existing_dv_referenced_files: &HashSet<String>,
) -> Result<Option<String>> {
    if format_version < 3 {
        return Ok(None);
    }
    if !file.is_deletion_vector() {
        return Err(IcebergError::InvalidV3PositionDelete(
            "v3 position-delete entries must be deletion vectors (offset, size, referenced-data-file)"
                .to_string(),
        ));
    }
    if let Some(referenced) = &file.referenced_data_file {
        if existing_dv_referenced_files.contains(referenced) {
            return Err(IcebergError::TooManyDeletionVectors(referenced.clone()));
        }
    }
    Ok(None)
}
