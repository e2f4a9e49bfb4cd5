/*!
Manifest and manifest-list builders (§4.D). Grounded in the teacher's write-path shape from
`table/transaction.rs` (which assembled manifest entries inline inside a commit) but lifted out
into standalone builders so the snapshot engine and catalog can share them.
*/
use std::collections::HashMap;

use crate::error::{IcebergError, Result};
use crate::model::manifest::{Content, DataFile, ManifestEntry, Status};
use crate::model::manifest_list::{Content as ListContent, FieldSummary, ManifestFile};

/// On-wire encoding for a manifest's entries. The table format's physical manifest files are
/// Avro, but the exact schema registry used to read/write them is an external, pluggable
/// concern (spec.md §1); this trait is the seam a real deployment plugs an Avro (or other)
/// codec into. [JsonManifestCodec] is the one concrete implementation this crate ships, useful
/// for tests and for backends that don't need Avro interop.
pub trait ManifestCodec {
    /// Serializes `entries` to their on-wire form.
    fn encode(&self, entries: &[ManifestEntry]) -> Result<Vec<u8>>;
    /// Parses entries back from their on-wire form.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<ManifestEntry>>;
}

/// A [ManifestCodec] that serializes entries as a JSON array, one element per entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManifestCodec;

impl ManifestCodec for JsonManifestCodec {
    fn encode(&self, entries: &[ManifestEntry]) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(entries)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<ManifestEntry>> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Aggregate counts produced by a [ManifestBuilder], mirroring the fields a [ManifestFile]
/// needs in the manifest list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ManifestSummary {
    /// Entries with `status=ADDED`.
    pub added_files: i32,
    /// Entries with `status=EXISTING`.
    pub existing_files: i32,
    /// Entries with `status=DELETED`.
    pub deleted_files: i32,
    /// Rows across `ADDED` entries.
    pub added_rows: i64,
    /// Rows across `EXISTING` entries.
    pub existing_rows: i64,
    /// Rows across `DELETED` entries.
    pub deleted_rows: i64,
}

/// Accumulates manifest entries for one manifest file under one snapshot.
pub struct ManifestBuilder {
    sequence_number: i64,
    snapshot_id: i64,
    entries: Vec<ManifestEntry>,
}

impl ManifestBuilder {
    /// Starts a new, empty manifest for the given snapshot.
    pub fn new(sequence_number: i64, snapshot_id: i64) -> Self {
        ManifestBuilder { sequence_number, snapshot_id, entries: Vec::new() }
    }

    /// Adds a data file with the given status (defaults to `Added` via [Self::add_data_file_added]).
    pub fn add_data_file(&mut self, file: DataFile, status_code: i32) -> Result<()> {
        let status = Status::try_from(status_code)?;
        self.entries.push(ManifestEntry {
            status,
            snapshot_id: Some(self.snapshot_id),
            sequence_number: Some(self.sequence_number),
            file_sequence_number: Some(self.sequence_number),
            data_file: file,
        });
        Ok(())
    }

    /// Adds a newly-added data file (`status=ADDED`).
    pub fn add_data_file_added(&mut self, file: DataFile) -> Result<()> {
        self.add_data_file(file, Status::Added as i32)
    }

    /// Adds a data file along with computed column statistics, merging them into the file's
    /// stats maps in field-id order before recording the entry.
    pub fn add_data_file_with_stats(
        &mut self,
        mut file: DataFile,
        value_counts: HashMap<i32, i64>,
        null_value_counts: HashMap<i32, i64>,
        lower_bounds: HashMap<i32, Vec<u8>>,
        upper_bounds: HashMap<i32, Vec<u8>>,
    ) -> Result<()> {
        merge_stats(&mut file.value_counts, value_counts);
        merge_stats(&mut file.null_value_counts, null_value_counts);
        merge_bound_stats(&mut file.lower_bounds, lower_bounds);
        merge_bound_stats(&mut file.upper_bounds, upper_bounds);
        self.add_data_file_added(file)
    }

    /// Adds an equality-delete file; `equality_ids` must be non-empty.
    pub fn add_equality_delete_file(&mut self, mut file: DataFile) -> Result<()> {
        if file.equality_ids.as_ref().map(|ids| ids.is_empty()).unwrap_or(true) {
            return Err(IcebergError::Message(
                "equality delete file requires a non-empty equality-ids list".to_string(),
            ));
        }
        file.content = Content::EqualityDeletes;
        self.add_data_file_added(file)
    }

    /// All entries recorded so far.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Computes the manifest summary over the recorded entries, partitioning on status and
    /// accumulating `record-count`.
    pub fn summary(&self) -> ManifestSummary {
        let mut summary = ManifestSummary::default();
        for entry in &self.entries {
            let rows = entry.data_file.record_count;
            match entry.status {
                Status::Added => {
                    summary.added_files += 1;
                    summary.added_rows += rows;
                }
                Status::Existing => {
                    summary.existing_files += 1;
                    summary.existing_rows += rows;
                }
                Status::Deleted => {
                    summary.deleted_files += 1;
                    summary.deleted_rows += rows;
                }
            }
        }
        summary
    }
}

fn merge_stats(dest: &mut Option<HashMap<i32, i64>>, incoming: HashMap<i32, i64>) {
    let map = dest.get_or_insert_with(HashMap::new);
    let mut keys: Vec<_> = incoming.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        map.insert(key, incoming[&key]);
    }
}

fn merge_bound_stats(dest: &mut Option<HashMap<i32, Vec<u8>>>, incoming: HashMap<i32, Vec<u8>>) {
    let map = dest.get_or_insert_with(HashMap::new);
    let mut keys: Vec<_> = incoming.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        map.insert(key, incoming[&key].clone());
    }
}

/// Accumulates [ManifestFile] references for one manifest list under one snapshot.
pub struct ManifestListBuilder {
    snapshot_id: i64,
    sequence_number: i64,
    manifests: Vec<ManifestFile>,
}

impl ManifestListBuilder {
    /// Starts a new, empty manifest list for the given snapshot.
    pub fn new(snapshot_id: i64, sequence_number: i64) -> Self {
        ManifestListBuilder { snapshot_id, sequence_number, manifests: Vec::new() }
    }

    /// Records a manifest, with the partition field summaries already computed for it.
    pub fn add_manifest(
        &mut self,
        manifest_path: String,
        manifest_length: i64,
        partition_spec_id: i32,
        content: ListContent,
        summary: ManifestSummary,
        partitions: Vec<FieldSummary>,
    ) {
        self.manifests.push(ManifestFile {
            manifest_path,
            manifest_length,
            partition_spec_id,
            content: Some(content),
            sequence_number: Some(self.sequence_number),
            min_sequence_number: Some(self.sequence_number),
            added_snapshot_id: self.snapshot_id,
            added_files_count: Some(summary.added_files),
            existing_files_count: Some(summary.existing_files),
            deleted_files_count: Some(summary.deleted_files),
            added_rows_count: Some(summary.added_rows),
            existing_rows_count: Some(summary.existing_rows),
            deleted_rows_count: Some(summary.deleted_rows),
            partitions: Some(partitions),
            key_metadata: None,
        });
    }

    /// All manifests recorded so far.
    pub fn manifests(&self) -> &[ManifestFile] {
        &self.manifests
    }

    /// Totals across every manifest added so far (the snapshot summary's file/record counts).
    pub fn cluster_totals(&self) -> ManifestSummary {
        let mut total = ManifestSummary::default();
        for m in &self.manifests {
            total.added_files += m.added_files_count.unwrap_or(0);
            total.existing_files += m.existing_files_count.unwrap_or(0);
            total.deleted_files += m.deleted_files_count.unwrap_or(0);
            total.added_rows += m.added_rows_count.unwrap_or(0);
            total.existing_rows += m.existing_rows_count.unwrap_or(0);
            total.deleted_rows += m.deleted_rows_count.unwrap_or(0);
        }
        total
    }
}

/// Folds a manifest's entries into one [FieldSummary] per partition field, by position.
pub fn partition_field_summaries(
    entries: &[ManifestEntry],
    num_fields: usize,
) -> Vec<FieldSummary> {
    let mut summaries: Vec<FieldSummary> = (0..num_fields)
        .map(|_| FieldSummary {
            contains_null: false,
            contains_nan: Some(false),
            lower_bound: None,
            upper_bound: None,
        })
        .collect();
    for entry in entries {
        for (i, summary) in summaries.iter_mut().enumerate() {
            let Some((_, value)) = entry.data_file.partition.iter().nth(i) else { continue };
            match value {
                None => summary.contains_null = true,
                Some(v) => {
                    let bytes = v.as_bytes().to_vec();
                    if summary.lower_bound.as_ref().map(|b| bytes < b.to_vec()).unwrap_or(true) {
                        summary.lower_bound = Some(bytes.clone().into());
                    }
                    if summary.upper_bound.as_ref().map(|b| bytes > b.to_vec()).unwrap_or(true) {
                        summary.upper_bound = Some(bytes.into());
                    }
                }
            }
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::manifest::{FileFormat, PartitionValues};

    fn data_file() -> DataFile {
        DataFile {
            content: Content::Data,
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
    fn summary_partitions_by_status() {
        let mut builder = ManifestBuilder::new(1, 100);
        builder.add_data_file_added(data_file()).unwrap();
        builder.add_data_file(data_file(), Status::Existing as i32).unwrap();
        let summary = builder.summary();
        assert_eq!(summary.added_files, 1);
        assert_eq!(summary.existing_files, 1);
        assert_eq!(summary.added_rows, 10);
        assert_eq!(summary.existing_rows, 10);
    }

    #[test]
    fn equality_delete_requires_ids() {
        let mut builder = ManifestBuilder::new(1, 100);
        assert!(builder.add_equality_delete_file(data_file()).is_err());
        let mut f = data_file();
        f.equality_ids = Some(vec![1]);
        assert!(builder.add_equality_delete_file(f).is_ok());
    }

    #[test]
    fn invalid_status_code_rejected() {
        let mut builder = ManifestBuilder::new(1, 100);
        assert!(builder.add_data_file(data_file(), 9).is_err());
    }

    #[test]
    fn manifest_list_cluster_totals_sum_across_manifests() {
        let mut builder = ManifestListBuilder::new(100, 1);
        let mut m = ManifestBuilder::new(1, 100);
        m.add_data_file_added(data_file()).unwrap();
        builder.add_manifest(
            "s3://bucket/m0.avro".to_string(),
            100,
            0,
            ListContent::Data,
            m.summary(),
            vec![],
        );
        let totals = builder.cluster_totals();
        assert_eq!(totals.added_files, 1);
        assert_eq!(totals.added_rows, 10);
    }

    #[test]
    fn json_codec_round_trips_entries() {
        let mut builder = ManifestBuilder::new(1, 100);
        builder.add_data_file_added(data_file()).unwrap();
        let codec = JsonManifestCodec;
        let bytes = codec.encode(builder.entries()).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, builder.entries());
    }
}
