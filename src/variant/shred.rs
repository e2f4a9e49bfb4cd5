/*!
Variant shredding configuration and per-sub-field statistics collection (§4.I).
*/
use std::collections::HashMap;

use crate::error::{IcebergError, Result};
use crate::model::manifest::DataFile;
use crate::model::types::PrimitiveType;
use crate::value::Value;

/// The default length, in unicode code points, string bounds are truncated to.
pub const DEFAULT_STRING_BOUND_LENGTH: usize = 16;

/// Declares which sub-fields of a variant column should be shredded into typed storage.
#[derive(Debug, Clone)]
pub struct ShredConfig {
    /// Name of the variant column being shredded.
    pub column_name: String,
    /// Sub-field names, in the order field ids are assigned.
    pub fields: Vec<String>,
    /// Declared type for each sub-field.
    pub field_types: HashMap<String, PrimitiveType>,
}

impl ShredConfig {
    /// The storage path for a shredded sub-field: `{column}.typed_value.{field}.typed_value`.
    pub fn shredded_path(&self, field: &str) -> String {
        format!("{}.typed_value.{field}.typed_value", self.column_name)
    }
}

/// Computed statistics for one shredded sub-field.
#[derive(Debug, Clone)]
pub struct ShreddedFieldStats {
    /// Assigned field id.
    pub field_id: i32,
    /// Storage path this field id corresponds to.
    pub path: String,
    /// Number of non-null values observed.
    pub value_count: i64,
    /// Number of null values observed.
    pub null_count: i64,
    /// Lower bound across non-null values, if any were observed.
    pub lower_bound: Option<Value>,
    /// Upper bound across non-null values, if any were observed.
    pub upper_bound: Option<Value>,
}

/// Assigns consecutive field ids to every configured sub-field (in declaration order across
/// `configs`) and computes value/null counts plus bounds from `columns`, keyed by
/// `{column_name}.{field}`.
pub fn collect_shredded_column_stats(
    columns: &HashMap<String, Vec<Option<Value>>>,
    configs: &[ShredConfig],
    starting_field_id: i32,
) -> (Vec<ShreddedFieldStats>, HashMap<String, i32>) {
    let mut stats = Vec::new();
    let mut field_id_map = HashMap::new();
    let mut next_id = starting_field_id;

    for config in configs {
        for field in &config.fields {
            let field_id = next_id;
            next_id += 1;
            let path = config.shredded_path(field);
            field_id_map.insert(path.clone(), field_id);

            let source_key = format!("{}.{field}", config.column_name);
            let values = columns.get(&source_key).cloned().unwrap_or_default();

            let mut value_count = 0i64;
            let mut null_count = 0i64;
            let mut lower: Option<Value> = None;
            let mut upper: Option<Value> = None;

            let truncate_len = DEFAULT_STRING_BOUND_LENGTH;
            for value in &values {
                match value {
                    None => null_count += 1,
                    Some(v) => {
                        value_count += 1;
                        let bounded = truncate_for_bound(v, truncate_len);
                        lower = Some(match lower {
                            None => bounded.clone(),
                            Some(current) if bounded.compare(&current) == std::cmp::Ordering::Less => bounded.clone(),
                            Some(current) => current,
                        });
                        upper = Some(match upper {
                            None => round_up_if_string(bounded.clone()),
                            Some(current)
                                if bounded.compare(&current) == std::cmp::Ordering::Greater =>
                            {
                                round_up_if_string(bounded.clone())
                            }
                            Some(current) => current,
                        });
                    }
                }
            }

            stats.push(ShreddedFieldStats { field_id, path, value_count, null_count, lower_bound: lower, upper_bound: upper });
        }
    }

    (stats, field_id_map)
}

fn truncate_for_bound(value: &Value, max_len: usize) -> Value {
    match value {
        Value::String(s) if s.chars().count() > max_len => {
            Value::String(s.chars().take(max_len).collect())
        }
        other => other.clone(),
    }
}

/// Rounds a truncated string upper bound up to the next valid value at its prefix length, so
/// it remains a valid inclusive upper bound for the untruncated values it summarizes.
fn round_up_if_string(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let mut chars: Vec<char> = s.chars().collect();
            if let Some(last) = chars.last_mut() {
                if let Some(bumped) = char::from_u32(*last as u32 + 1) {
                    *last = bumped;
                }
            }
            Value::String(chars.into_iter().collect())
        }
        other => other,
    }
}

/// Merges collected statistics into a data file's stats maps, keyed by assigned field id.
/// Fails with [IcebergError::StatsFieldIdCollision] if any field id already has a stats entry.
pub fn add_shredded_stats_to_data_file(file: &mut DataFile, collected: &[ShreddedFieldStats]) -> Result<()> {
    for field in collected {
        let value_counts = file.value_counts.get_or_insert_with(HashMap::new);
        if value_counts.contains_key(&field.field_id) {
            return Err(IcebergError::StatsFieldIdCollision(field.field_id));
        }
        value_counts.insert(field.field_id, field.value_count);

        file.null_value_counts.get_or_insert_with(HashMap::new).insert(field.field_id, field.null_count);

        if let Some(lower) = &field.lower_bound {
            file.lower_bounds.get_or_insert_with(HashMap::new).insert(field.field_id, lower.encode());
        }
        if let Some(upper) = &field.upper_bound {
            file.upper_bounds.get_or_insert_with(HashMap::new).insert(field.field_id, upper.encode());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::manifest::{Content, FileFormat, PartitionValues};

    fn config() -> ShredConfig {
        let mut field_types = HashMap::new();
        field_types.insert("year".to_string(), PrimitiveType::Int);
        ShredConfig { column_name: "$data".to_string(), fields: vec!["year".to_string()], field_types }
    }

    #[test]
    fn assigns_consecutive_field_ids_and_computes_bounds() {
        let mut columns = HashMap::new();
        columns.insert(
            "$data.year".to_string(),
            vec![Some(Value::Int(1990)), Some(Value::Int(2019)), None],
        );
        let (stats, map) = collect_shredded_column_stats(&columns, &[config()], 1000);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].field_id, 1000);
        assert_eq!(stats[0].value_count, 2);
        assert_eq!(stats[0].null_count, 1);
        assert_eq!(stats[0].lower_bound, Some(Value::Int(1990)));
        assert_eq!(stats[0].upper_bound, Some(Value::Int(2019)));
        assert_eq!(map.get("$data.typed_value.year.typed_value"), Some(&1000));
    }

    #[test]
    fn merging_into_occupied_field_id_fails() {
        let mut file = DataFile {
            content: Content::Data,
            file_path: "f".into(),
            file_format: FileFormat::Parquet,
            partition: PartitionValues::new(),
            record_count: 0,
            file_size_in_bytes: 0,
            column_sizes: None,
            value_counts: Some(HashMap::from([(1000, 5)])),
            null_value_counts: None,
            nan_value_counts: None,
            lower_bounds: None,
            upper_bounds: None,
            equality_ids: None,
            content_offset: None,
            content_size_in_bytes: None,
            referenced_data_file: None,
        };
        let stats = vec![ShreddedFieldStats {
            field_id: 1000,
            path: "$data.typed_value.year.typed_value".to_string(),
            value_count: 1,
            null_count: 0,
            lower_bound: None,
            upper_bound: None,
        }];
        assert!(add_shredded_stats_to_data_file(&mut file, &stats).is_err());
    }
}
