/*!
Manifest list entries: one row per manifest referenced by a snapshot, carrying enough summary
data to prune whole manifests during scan planning without opening them. Extends the teacher's
`model/manifest_list.rs`, whose fields were private with no constructor; this version exposes
them so [crate::manifest] can build manifest list rows directly.
*/
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Debug, Serialize_repr, Deserialize_repr, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
/// The kind of files tracked by a manifest.
pub enum Content {
    /// Data files.
    Data = 0,
    /// Delete files (position or equality).
    Deletes = 1,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// Per-partition-field summary across a manifest's entries.
pub struct FieldSummary {
    /// Whether any partition in the manifest has a null value for this field.
    pub contains_null: bool,
    /// Whether any partition in the manifest has a NaN value for this field.
    pub contains_nan: Option<bool>,
    /// Lower bound across non-null, non-NaN values, encoded per [crate::value].
    pub lower_bound: Option<ByteBuf>,
    /// Upper bound across non-null, non-NaN values, encoded per [crate::value].
    pub upper_bound: Option<ByteBuf>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// A reference to one manifest file plus its aggregate statistics, as stored in a snapshot's
/// manifest list.
pub struct ManifestFile {
    /// Location of the manifest file.
    pub manifest_path: String,
    /// Length of the manifest file in bytes.
    pub manifest_length: i64,
    /// Partition spec id the manifest's entries are partitioned under.
    pub partition_spec_id: i32,
    /// Data files or delete files.
    pub content: Option<Content>,
    /// Sequence number when the manifest was added to the table.
    pub sequence_number: Option<i64>,
    /// Minimum sequence number among the manifest's entries.
    pub min_sequence_number: Option<i64>,
    /// Snapshot id that added this manifest.
    pub added_snapshot_id: i64,
    /// Entries with `status=ADDED`.
    pub added_files_count: Option<i32>,
    /// Entries with `status=EXISTING`.
    pub existing_files_count: Option<i32>,
    /// Entries with `status=DELETED`.
    pub deleted_files_count: Option<i32>,
    /// Rows across `ADDED` entries.
    pub added_rows_count: Option<i64>,
    /// Rows across `EXISTING` entries.
    pub existing_rows_count: Option<i64>,
    /// Rows across `DELETED` entries.
    pub deleted_rows_count: Option<i64>,
    /// Per-partition-field summaries, one per field in the referenced partition spec.
    pub partitions: Option<Vec<FieldSummary>>,
    /// Implementation-specific key metadata for encryption.
    pub key_metadata: Option<ByteBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let m = ManifestFile {
            manifest_path: "s3://bucket/m0.avro".to_string(),
            manifest_length: 100,
            partition_spec_id: 0,
            content: Some(Content::Data),
            sequence_number: Some(1),
            min_sequence_number: Some(1),
            added_snapshot_id: 1,
            added_files_count: Some(1),
            existing_files_count: Some(0),
            deleted_files_count: Some(0),
            added_rows_count: Some(10),
            existing_rows_count: Some(0),
            deleted_rows_count: Some(0),
            partitions: Some(vec![FieldSummary {
                contains_null: false,
                contains_nan: Some(false),
                lower_bound: None,
                upper_bound: None,
            }]),
            key_metadata: None,
        };
        let json = serde_json::to_string(&m).unwrap();
        let back: ManifestFile = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
