/*!
Root table metadata (§3), the single concurrency root described in §5: every mutation reads
one of these, produces a new value, and writes it to a new versioned path. Restructured from
the teacher's `model/metadata.rs` `MetadataV2`/`MetadataV1` pair into one [RootMetadata] that
natively carries the v3 row-lineage fields, since this crate's scope is the v2↔v3 boundary
rather than v1 compatibility.
*/
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IcebergError, Result};
use crate::model::partition::PartitionSpec;
use crate::model::schema::Schema;
use crate::model::snapshot::{Snapshot, SnapshotReference};
use crate::model::sort::SortOrder;

/// Reserved field id for the synthetic `file_path` column of position-delete files.
pub const RESERVED_FIELD_ID_FILE_PATH: i32 = 2147483546;
/// Reserved field id for the synthetic `pos` column of position-delete files.
pub const RESERVED_FIELD_ID_POS: i32 = 2147483545;
/// Value `last-partition-id` is initialized to; the first assigned partition field id is 1000.
pub const INITIAL_LAST_PARTITION_ID: i32 = 999;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// One entry of the `metadata-log`: a previous root-metadata location and when it was current.
pub struct MetadataLogEntry {
    /// Location of a previous root-metadata blob.
    pub metadata_file: String,
    /// When that blob became current, ms since epoch.
    pub timestamp_ms: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// One entry of the `snapshot-log`: which snapshot was current, and when.
pub struct SnapshotLogEntry {
    /// The snapshot that became current.
    pub snapshot_id: i64,
    /// When it became current, ms since epoch.
    pub timestamp_ms: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// Implementation-specific encryption key metadata (v3 only), passed through opaquely.
pub struct EncryptionKey {
    /// Id referenced by `Snapshot::key_id`.
    pub key_id: i64,
    /// Opaque, implementation-specific key material / wrapping metadata.
    pub encrypted_key_metadata: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// The full metadata tree root. Produced by table creation and every subsequent commit;
/// never mutated in place (§3, §5).
pub struct RootMetadata {
    /// `2` or `3`.
    pub format_version: i32,
    /// Stable UUID-v4 identifying the table across its lifetime.
    pub table_uuid: Uuid,
    /// Base storage location for this table's data and metadata.
    pub location: String,
    /// Highest sequence number assigned to any snapshot so far.
    pub last_sequence_number: i64,
    /// When this metadata blob was written, ms since epoch.
    pub last_updated_ms: i64,
    /// Highest field id ever assigned across all schemas.
    pub last_column_id: i32,
    /// All schema versions this table has had.
    pub schemas: Vec<Schema>,
    /// Id of the schema new writes should use.
    pub current_schema_id: i32,
    /// All partition spec versions this table has had.
    pub partition_specs: Vec<PartitionSpec>,
    /// Id of the partition spec new writes should use.
    pub default_spec_id: i32,
    /// Highest partition field id ever assigned, across all specs. Starts at 999.
    pub last_partition_id: i32,
    /// All sort order versions this table has had.
    pub sort_orders: Vec<SortOrder>,
    /// Id of the sort order new writes should use.
    pub default_sort_order_id: i64,
    /// Free-form table properties (`commit.retry.num-retries`, ...).
    pub properties: HashMap<String, String>,
    /// Id of the snapshot the `main` branch currently points at, if any.
    pub current_snapshot_id: Option<i64>,
    /// Every snapshot still tracked by the table.
    pub snapshots: Vec<Snapshot>,
    /// History of which snapshot was current, and when.
    pub snapshot_log: Vec<SnapshotLogEntry>,
    /// History of previous root-metadata locations.
    pub metadata_log: Vec<MetadataLogEntry>,
    /// Named branches and tags.
    pub refs: HashMap<String, SnapshotReference>,
    /// Next row id to assign (v3 only); required when `format_version == 3`.
    pub next_row_id: Option<i64>,
    /// Encryption keys referenced by snapshots (v3 only, optional even there).
    pub encryption_keys: Option<Vec<EncryptionKey>>,
}

impl RootMetadata {
    /// Parses and validates root metadata JSON.
    pub fn parse(json: &str) -> Result<Self> {
        let metadata: RootMetadata = serde_json::from_str(json)?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Checks every invariant from §3/§8 that can be verified on a standalone value.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != 2 && self.format_version != 3 {
            return Err(IcebergError::UnsupportedFormatVersion(self.format_version));
        }
        if !is_uuid_v4(&self.table_uuid) {
            return Err(IcebergError::BrokenSchemaInvariant(format!(
                "table-uuid {} is not a valid UUID v4",
                self.table_uuid
            )));
        }
        if !self.schemas.iter().any(|s| s.schema_id == self.current_schema_id) {
            return Err(IcebergError::BrokenSchemaInvariant(format!(
                "current-schema-id {} has no matching schema",
                self.current_schema_id
            )));
        }
        if !self.partition_specs.iter().any(|s| s.spec_id == self.default_spec_id) {
            return Err(IcebergError::BrokenSchemaInvariant(format!(
                "default-spec-id {} has no matching partition spec",
                self.default_spec_id
            )));
        }
        if !self.sort_orders.iter().any(|s| s.order_id as i64 == self.default_sort_order_id) {
            return Err(IcebergError::BrokenSchemaInvariant(format!(
                "default-sort-order-id {} has no matching sort order",
                self.default_sort_order_id
            )));
        }
        for (name, r) in &self.refs {
            if !self.snapshots.iter().any(|s| s.snapshot_id == r.snapshot_id) {
                return Err(IcebergError::BrokenSchemaInvariant(format!(
                    "ref {name} points at unknown snapshot {}",
                    r.snapshot_id
                )));
            }
        }
        if let Some(current) = self.current_snapshot_id {
            if !self.snapshots.iter().any(|s| s.snapshot_id == current) {
                return Err(IcebergError::BrokenSchemaInvariant(format!(
                    "current-snapshot-id {current} has no matching snapshot"
                )));
            }
        }
        let max_seq = self.snapshots.iter().map(|s| s.sequence_number).max().unwrap_or(0);
        if self.last_sequence_number < max_seq {
            return Err(IcebergError::BrokenSchemaInvariant(
                "last-sequence-number is smaller than the highest snapshot sequence number"
                    .to_string(),
            ));
        }
        for s in &self.snapshots {
            if let Some(schema_id) = s.schema_id {
                if !self.schemas.iter().any(|sc| sc.schema_id == schema_id) {
                    return Err(IcebergError::BrokenSchemaInvariant(format!(
                        "snapshot {} references unknown schema {}",
                        s.snapshot_id, schema_id
                    )));
                }
            }
        }
        if self.format_version == 3 && self.next_row_id.is_none() {
            return Err(IcebergError::MissingRequiredField("next-row-id".to_string()));
        }
        self.validate_sequence_ancestry()?;
        Ok(())
    }

    /// Sequence numbers must strictly increase walking a branch's parent chain (§8.4).
    fn validate_sequence_ancestry(&self) -> Result<()> {
        let by_id: HashMap<i64, &Snapshot> =
            self.snapshots.iter().map(|s| (s.snapshot_id, s)).collect();
        for snapshot in &self.snapshots {
            let mut current = snapshot;
            while let Some(parent_id) = current.parent_snapshot_id {
                let Some(parent) = by_id.get(&parent_id) else { break };
                if parent.sequence_number >= current.sequence_number {
                    return Err(IcebergError::BrokenSchemaInvariant(format!(
                        "snapshot {} does not have a strictly greater sequence number than parent {}",
                        current.snapshot_id, parent.snapshot_id
                    )));
                }
                current = parent;
            }
        }
        Ok(())
    }

    /// The schema currently in effect.
    pub fn current_schema(&self) -> Result<&Schema> {
        self.schemas
            .iter()
            .find(|s| s.schema_id == self.current_schema_id)
            .ok_or_else(|| IcebergError::BrokenSchemaInvariant("no current schema".to_string()))
    }

    /// The partition spec currently in effect.
    pub fn default_spec(&self) -> Result<&PartitionSpec> {
        self.partition_specs
            .iter()
            .find(|s| s.spec_id == self.default_spec_id)
            .ok_or_else(|| IcebergError::BrokenSchemaInvariant("no default spec".to_string()))
    }

    /// The snapshot the `main` branch (or `current-snapshot-id`) currently points at.
    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.current_snapshot_id
            .and_then(|id| self.snapshots.iter().find(|s| s.snapshot_id == id))
    }

    /// Looks up a snapshot by id.
    pub fn snapshot(&self, id: i64) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.snapshot_id == id)
    }
}

fn is_uuid_v4(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_json() -> String {
        r#"
        {
            "format-version": 2,
            "table-uuid": "fb072c92-a02b-41e9-ae9c-1bb7bc9eca94",
            "location": "s3://b/wh/data.db/table",
            "last-sequence-number": 1,
            "last-updated-ms": 1515100955770,
            "last-column-id": 1,
            "schemas": [
                { "schema-id": 1, "type": "struct", "fields": [
                    { "id": 1, "name": "a", "required": true, "type": "int" }
                ]}
            ],
            "current-schema-id": 1,
            "partition-specs": [ { "spec-id": 1, "fields": [] } ],
            "default-spec-id": 1,
            "last-partition-id": 999,
            "sort-orders": [ { "order-id": 0, "fields": [] } ],
            "default-sort-order-id": 0,
            "properties": {},
            "current-snapshot-id": null,
            "snapshots": [],
            "snapshot-log": [],
            "metadata-log": [],
            "refs": {}
        }
        "#
        .to_string()
    }

    #[test]
    fn parses_valid_v2_metadata() {
        let metadata = RootMetadata::parse(&base_json()).unwrap();
        assert_eq!(metadata.format_version, 2);
        assert_eq!(metadata.current_schema().unwrap().schema_id, 1);
    }

    #[test]
    fn rejects_non_v4_uuid() {
        let json = base_json().replace(
            "fb072c92-a02b-41e9-ae9c-1bb7bc9eca94",
            "fb072c92-a02b-11e9-ae9c-1bb7bc9eca94",
        );
        assert!(RootMetadata::parse(&json).is_err());
    }

    #[test]
    fn rejects_unknown_format_version() {
        let json = base_json().replace("\"format-version\": 2", "\"format-version\": 1");
        assert!(RootMetadata::parse(&json).is_err());
    }

    #[test]
    fn v3_requires_next_row_id() {
        let json = base_json().replace("\"format-version\": 2", "\"format-version\": 3");
        assert!(RootMetadata::parse(&json).is_err());
        let json_with_next_row_id = json.replace("\"refs\": {}", "\"refs\": {}, \"next-row-id\": 0");
        assert!(RootMetadata::parse(&json_with_next_row_id).is_ok());
    }

    #[test]
    fn rejects_dangling_current_snapshot_id() {
        let json = base_json().replace("\"current-snapshot-id\": null", "\"current-snapshot-id\": 7");
        assert!(RootMetadata::parse(&json).is_err());
    }
}
