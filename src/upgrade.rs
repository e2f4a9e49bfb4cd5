/*!
v2 → v3 format upgrade (§4.H). No teacher precedent exists (the teacher modeled only a single
format per `MetadataV1`/`MetadataV2`); grounded in [crate::model::metadata]'s `RootMetadata`
and the same `SystemTime`-based "now" the teacher's `table_builder.rs` uses for timestamps.
*/
use std::time::SystemTime;

use crate::error::{IcebergError, Result};
use crate::model::metadata::RootMetadata;

/// Upgrades `source` (format-version 2) to format-version 3.
///
/// Rejects a v3 input with [IcebergError::AlreadyTargetVersion], a sub-v2 input with
/// [IcebergError::InvalidSourceVersion], and never produces a version lower than the input
/// ([IcebergError::DowngradeNotAllowed] is reserved for any caller path that would do so).
/// Pre-existing snapshots are copied byte-identical: retroactively assigning `first-row-id`/
/// `added-rows` to them would not reflect their actual row ids.
pub fn upgrade_to_v3(source: &RootMetadata, preserve_last_updated: bool) -> Result<RootMetadata> {
    if source.format_version == 3 {
        return Err(IcebergError::AlreadyTargetVersion);
    }
    if source.format_version != 2 {
        return Err(IcebergError::InvalidSourceVersion(source.format_version));
    }

    let mut upgraded = source.clone();
    upgraded.format_version = 3;
    upgraded.next_row_id = Some(0);
    if !preserve_last_updated {
        upgraded.last_updated_ms = now_ms();
    }
    upgraded.validate()?;
    Ok(upgraded)
}

/// Downgrading is never supported; always returns [IcebergError::DowngradeNotAllowed].
pub fn downgrade_to_v2(_source: &RootMetadata) -> Result<RootMetadata> {
    Err(IcebergError::DowngradeNotAllowed)
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v2_metadata() -> RootMetadata {
        RootMetadata::parse(
            r#"
            {
                "format-version": 2,
                "table-uuid": "fb072c92-a02b-41e9-ae9c-1bb7bc9eca94",
                "location": "s3://b/wh/data.db/table",
                "last-sequence-number": 7,
                "last-updated-ms": 1515100955770,
                "last-column-id": 15,
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
            "#,
        )
        .unwrap()
    }

    #[test]
    fn upgrade_sets_next_row_id_and_preserves_counters() {
        let source = v2_metadata();
        let upgraded = upgrade_to_v3(&source, true).unwrap();
        assert_eq!(upgraded.format_version, 3);
        assert_eq!(upgraded.next_row_id, Some(0));
        assert_eq!(upgraded.last_sequence_number, 7);
        assert_eq!(upgraded.last_column_id, 15);
        assert_eq!(upgraded.last_updated_ms, source.last_updated_ms);
    }

    #[test]
    fn repeated_upgrade_rejected() {
        let source = v2_metadata();
        let upgraded = upgrade_to_v3(&source, true).unwrap();
        assert!(matches!(upgrade_to_v3(&upgraded, true), Err(IcebergError::AlreadyTargetVersion)));
    }

    #[test]
    fn downgrade_always_rejected() {
        let source = v2_metadata();
        let upgraded = upgrade_to_v3(&source, true).unwrap();
        assert!(matches!(downgrade_to_v2(&upgraded), Err(IcebergError::DowngradeNotAllowed)));
    }
}
