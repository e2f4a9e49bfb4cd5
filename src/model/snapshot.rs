/*!
Snapshots and the named references (branches and tags) that point at them. Generalizes the
teacher's split `SnapshotV1`/`SnapshotV2` structs into one [Snapshot] carrying the optional v3
row-lineage fields, since a v3 table's pre-upgrade snapshots coexist with post-upgrade ones
that do carry them (§4.H).
*/
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
/// The kind of change a snapshot represents, used to decide whether a snapshot can be
/// skipped during certain scan types.
pub enum Operation {
    /// Only data files were added.
    Append,
    /// Files were added and removed without changing table data (compaction, format change).
    Replace,
    /// Files were added and removed as a logical overwrite.
    Overwrite,
    /// Files were removed and/or delete files were added.
    Delete,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
/// Free-form summary of a snapshot's changes, with `operation` promoted to the top level
/// matching how it's accessed; all other keys ride along through `other`.
pub struct Summary {
    /// The operation this snapshot performed.
    pub operation: Option<Operation>,
    /// Remaining summary keys (`added-data-files`, `total-records`, ...).
    #[serde(flatten)]
    pub other: HashMap<String, String>,
}

impl Summary {
    /// Reads a numeric summary field, parsing from its string encoding.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.other.get(key).and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// An immutable version of the table, pointing at exactly one manifest list.
pub struct Snapshot {
    /// Unique id of this snapshot.
    pub snapshot_id: i64,
    /// Id of this snapshot's parent, absent for the first snapshot of a table.
    pub parent_snapshot_id: Option<i64>,
    /// Monotonically increasing sequence number.
    pub sequence_number: i64,
    /// Creation time, ms since epoch.
    pub timestamp_ms: i64,
    /// Location of this snapshot's manifest list.
    pub manifest_list: String,
    /// Summary of the change this snapshot represents.
    pub summary: Summary,
    /// Schema id in effect when this snapshot was written.
    pub schema_id: Option<i32>,
    /// First assigned row id for rows added by this snapshot (v3 only).
    pub first_row_id: Option<i64>,
    /// Number of rows assigned ids by this snapshot (v3 only).
    pub added_rows: Option<i64>,
    /// Id of the encryption key protecting this snapshot's manifests (v3 only).
    pub key_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// A named, mutable pointer to a snapshot: a branch or a tag.
pub struct SnapshotReference {
    /// The snapshot this reference currently points at.
    pub snapshot_id: i64,
    #[serde(flatten)]
    /// Kind and retention policy of this reference.
    pub retention: Retention,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase", tag = "type")]
/// Kind and retention policy of a [SnapshotReference].
pub enum Retention {
    #[serde(rename_all = "kebab-case")]
    /// A branch: its tip moves forward on every commit.
    Branch {
        /// Minimum number of snapshots to keep along this branch when expiring.
        min_snapshots_to_keep: Option<i32>,
        /// Maximum snapshot age to keep when expiring.
        max_snapshot_age_ms: Option<i64>,
        /// Maximum age of the reference itself before it is eligible for removal.
        max_ref_age_ms: Option<i64>,
    },
    #[serde(rename_all = "kebab-case")]
    /// A tag: a fixed pointer to one snapshot.
    Tag {
        /// Maximum age of the reference before it is eligible for removal.
        max_ref_age_ms: Option<i64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trips_without_v3_fields() {
        let data = r#"
            {
                "snapshot-id": 3051729675574597004,
                "sequence-number": 1,
                "timestamp-ms": 1515100955770,
                "summary": { "operation": "append" },
                "manifest-list": "s3://b/wh/.../s1.avro",
                "schema-id": 0
            }
        "#;
        let snapshot: Snapshot = serde_json::from_str(data).unwrap();
        assert_eq!(snapshot.summary.operation, Some(Operation::Append));
        assert!(snapshot.first_row_id.is_none());
    }

    #[test]
    fn tag_and_branch_retention_parse() {
        let tag: SnapshotReference = serde_json::from_str(
            r#"{"snapshot-id": 1, "type": "tag", "max-ref-age-ms": 1000}"#,
        )
        .unwrap();
        assert!(matches!(tag.retention, Retention::Tag { .. }));

        let branch: SnapshotReference = serde_json::from_str(
            r#"{"snapshot-id": 1, "type": "branch", "min-snapshots-to-keep": 3}"#,
        )
        .unwrap();
        assert!(matches!(branch.retention, Retention::Branch { .. }));
    }
}
