/*!
Manifest entries: the rows of a manifest file, each describing one data or delete file plus
its lifecycle status within the snapshot that wrote it. Restructured from the teacher's
`model/manifest.rs`, which modeled only a bare status/snapshot-id/sequence-number triple; this
version carries the full [DataFile] statistics record §3 and §4.D require.
*/
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::{IcebergError, Result};

#[derive(Debug, Serialize_repr, Deserialize_repr, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
/// Tracks whether a manifest entry added, retained, or removed its file.
pub enum Status {
    /// File existed before this snapshot and is unchanged.
    Existing = 0,
    /// File was added in this snapshot.
    Added = 1,
    /// File was logically removed in this snapshot.
    Deleted = 2,
}

impl TryFrom<i32> for Status {
    type Error = IcebergError;
    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Status::Existing),
            1 => Ok(Status::Added),
            2 => Ok(Status::Deleted),
            other => Err(IcebergError::InvalidStatus(other)),
        }
    }
}

#[derive(Debug, Serialize_repr, Deserialize_repr, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
/// The kind of content a [DataFile] stores.
pub enum Content {
    /// Ordinary data rows.
    Data = 0,
    /// Row positions to delete from a referenced data file.
    PositionDeletes = 1,
    /// Equality predicates identifying rows to delete.
    EqualityDeletes = 2,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
/// On-disk format of a data or delete file.
pub enum FileFormat {
    /// Avro row format.
    Avro,
    /// Apache ORC.
    Orc,
    /// Apache Parquet.
    Parquet,
}

/// Partition value tuple, keyed by partition field name and string-encoded per the
/// transform's value type (see [crate::evolution::partition::partition_path]).
pub type PartitionValues = HashMap<String, Option<String>>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// A single data or delete file tracked by a manifest.
pub struct DataFile {
    /// What kind of rows this file stores.
    pub content: Content,
    /// Fully qualified path to the file.
    pub file_path: String,
    /// On-disk format.
    pub file_format: FileFormat,
    /// Partition values for this file under the manifest's partition spec.
    pub partition: PartitionValues,
    /// Number of rows in the file.
    pub record_count: i64,
    /// Total size in bytes.
    pub file_size_in_bytes: i64,
    /// Per-field encoded sizes in bytes, keyed by field id.
    pub column_sizes: Option<HashMap<i32, i64>>,
    /// Per-field value counts, keyed by field id.
    pub value_counts: Option<HashMap<i32, i64>>,
    /// Per-field null counts, keyed by field id.
    pub null_value_counts: Option<HashMap<i32, i64>>,
    /// Per-field NaN counts, keyed by field id.
    pub nan_value_counts: Option<HashMap<i32, i64>>,
    /// Per-field lower bounds, keyed by field id, encoded per [crate::value].
    pub lower_bounds: Option<HashMap<i32, Vec<u8>>>,
    /// Per-field upper bounds, keyed by field id, encoded per [crate::value].
    pub upper_bounds: Option<HashMap<i32, Vec<u8>>>,
    /// Field ids identifying rows in an equality-delete file.
    pub equality_ids: Option<Vec<i32>>,
    /// Byte offset of this file's content within `referenced-data-file`, for deletion vectors.
    pub content_offset: Option<i64>,
    /// Byte length of this file's content, for deletion vectors.
    pub content_size_in_bytes: Option<i64>,
    /// The data file a deletion vector or position-delete file applies to.
    pub referenced_data_file: Option<String>,
}

impl DataFile {
    /// True if this is a v3 deletion vector: a position-delete file carrying all three of
    /// the offset/size/referenced-file fields.
    pub fn is_deletion_vector(&self) -> bool {
        self.content == Content::PositionDeletes
            && self.content_offset.is_some()
            && self.content_size_in_bytes.is_some()
            && self.referenced_data_file.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// One row of a manifest file: a file plus its lifecycle metadata.
pub struct ManifestEntry {
    /// Addition/retention/removal status.
    pub status: Status,
    /// Snapshot id that wrote this entry; inherited from the manifest when absent on read.
    pub snapshot_id: Option<i64>,
    /// Sequence number of the snapshot that added the file; inherited when absent.
    pub sequence_number: Option<i64>,
    /// Sequence number of the snapshot that wrote the underlying file's content.
    pub file_sequence_number: Option<i64>,
    /// The file this entry describes.
    pub data_file: DataFile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn data_file(content: Content) -> DataFile {
        DataFile {
            content,
            file_path: "s3://bucket/data/f.parquet".to_string(),
            file_format: FileFormat::Parquet,
            partition: PartitionValues::new(),
            record_count: 10,
            file_size_in_bytes: 1000,
            column_sizes: None,
            value_counts: None,
            null_value_counts: None,
            nan_value_counts: None,
            lower_bounds: None,
            upper_bounds: None,
            equality_ids: None,
            content_offset: None,
            content_size_in_bytes: None,
            referenced_data_file: None,
        }
    }

    #[test]
    fn deletion_vector_requires_all_three_fields() {
        let mut f = data_file(Content::PositionDeletes);
        assert!(!f.is_deletion_vector());
        f.content_offset = Some(0);
        f.content_size_in_bytes = Some(100);
        f.referenced_data_file = Some("s3://bucket/data/d.parquet".to_string());
        assert!(f.is_deletion_vector());
    }

    #[test]
    fn status_rejects_out_of_range_values() {
        assert!(Status::try_from(3).is_err());
        assert!(Status::try_from(0).is_ok());
    }

    proptest! {
        #[test]
        fn manifest_entry_round_trips_through_json(
            status_code in 0u8..3,
            snapshot_id in prop::option::of(any::<i64>()),
        ) {
            let status = Status::try_from(status_code as i32).unwrap();
            let entry = ManifestEntry {
                status,
                snapshot_id,
                sequence_number: Some(1),
                file_sequence_number: Some(1),
                data_file: data_file(Content::Data),
            };
            let json = serde_json::to_string(&entry).unwrap();
            let back: ManifestEntry = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(entry, back);
        }
    }
}
