/*!
Partition transforms, partition paths, spec evolution, and partition statistics (§4.G).
Transform application is new: the teacher only parsed [Transform] textually and never
evaluated one. `bucket[N]` requires `murmur3_x86_32`; no crate in the teacher's or the pack's
dependency stack provides it, so it is hand-rolled here from the public algorithm description
(32-bit x86 variant, seed 0), matching the table format's reference hash.
*/
use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, Timelike};

use crate::error::{IcebergError, Result};
use crate::model::partition::{PartitionField, PartitionSpec, Transform};
use crate::value::Value;

/// Applies `transform` to `value`, producing the derived partition value. `None` in always
/// yields `None` out, except `void` which always yields `None`.
pub fn apply(value: Option<&Value>, transform: &Transform) -> Result<Option<Value>> {
    if matches!(transform, Transform::Void) {
        return Ok(None);
    }
    let Some(value) = value else { return Ok(None) };

    Ok(match transform {
        Transform::Void => unreachable!(),
        Transform::Identity => Some(value.clone()),
        Transform::Year => Some(Value::Int(years_since_epoch(value)?)),
        Transform::Month => Some(Value::Int(months_since_epoch(value)?)),
        Transform::Day => Some(Value::Int(days_since_epoch(value)?)),
        Transform::Hour => Some(Value::Int(hours_since_epoch(value)?)),
        Transform::Bucket(n) => Some(Value::Int(bucket(value, *n))),
        Transform::Truncate(w) => Some(truncate(value, *w)?),
    })
}

fn date_of(value: &Value) -> Result<NaiveDate> {
    match value {
        Value::Date(d) => Ok(*d),
        Value::Timestamp(ts) | Value::Timestampz(ts) => Ok(ts.date()),
        other => Err(IcebergError::InvalidTransformArg(format!(
            "temporal transform applied to non-temporal value {other:?}"
        ))),
    }
}

fn years_since_epoch(value: &Value) -> Result<i32> {
    Ok(date_of(value)?.year() - 1970)
}

fn months_since_epoch(value: &Value) -> Result<i32> {
    let d = date_of(value)?;
    Ok((d.year() - 1970) * 12 + (d.month() as i32 - 1))
}

fn days_since_epoch(value: &Value) -> Result<i32> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    Ok((date_of(value)? - epoch).num_days() as i32)
}

fn hours_since_epoch(value: &Value) -> Result<i32> {
    match value {
        Value::Timestamp(ts) | Value::Timestampz(ts) => {
            let days = days_since_epoch(value)? as i64;
            Ok((days * 24 + ts.hour() as i64) as i32)
        }
        other => Err(IcebergError::InvalidTransformArg(format!(
            "hour transform applied to non-timestamp value {other:?}"
        ))),
    }
}

fn bucket(value: &Value, n: u32) -> i32 {
    let bytes = value.encode();
    let hash = murmur3_x86_32(&bytes, 0);
    ((hash & 0x7fffffff) as u32 % n) as i32
}

fn truncate(value: &Value, w: u32) -> Result<Value> {
    let w = w as i64;
    Ok(match value {
        Value::Int(v) => Value::Int((*v as i64 - (((*v as i64) % w + w) % w)) as i32),
        Value::Long(v) => Value::Long(v - (((*v % w) + w) % w)),
        Value::String(s) => Value::String(s.chars().take(w as usize).collect()),
        Value::Binary(b) => Value::Binary(b.iter().take(w as usize).copied().collect()),
        Value::Fixed(b) => Value::Fixed(b.iter().take(w as usize).copied().collect()),
        Value::Decimal(d) => {
            use num_bigint::BigInt;
            let unscaled = d.unscaled();
            let modulus = BigInt::from(w);
            let remainder = ((unscaled % &modulus) + &modulus) % &modulus;
            let truncated = unscaled - remainder;
            Value::Decimal(crate::model::decimal::Decimal::new(truncated, d.scale() as u8, d.scale())?)
        }
        other => {
            return Err(IcebergError::InvalidTransformArg(format!(
                "truncate applied to unsupported value {other:?}"
            )))
        }
    })
}

/// The 32-bit x86 variant of MurmurHash3, seeded at 0 per the table format's bucket spec.
pub fn murmur3_x86_32(data: &[u8], seed: u32) -> i32 {
    const C1: u32 = 0xcc9e2d51;
    const C2: u32 = 0x1b873593;

    let mut hash = seed;
    let nblocks = data.len() / 4;

    for i in 0..nblocks {
        let block = &data[i * 4..i * 4 + 4];
        let mut k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);

        hash ^= k;
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    let tail = &data[nblocks * 4..];
    let mut k1: u32 = 0;
    if tail.len() >= 3 {
        k1 ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k1 ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k1 ^= tail[0] as u32;
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        hash ^= k1;
    }

    hash ^= data.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85ebca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2ae35);
    hash ^= hash >> 16;

    hash as i32
}

const NULL_PARTITION_MARKER: &str = "__HIVE_DEFAULT_PARTITION__";

/// Renders a partitioned value tuple to a Hive-style path: `field1=value1/field2=value2/...`.
pub fn partition_path(values: &[(String, Option<Value>)]) -> String {
    values
        .iter()
        .map(|(name, value)| match value {
            None => format!("{name}={NULL_PARTITION_MARKER}"),
            Some(v) => format!("{name}={}", encode_component(v)),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_component(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::String(s) => url_encode(s),
        Value::Boolean(b) => b.to_string(),
        other => url_encode(&format!("{other:?}")),
    }
}

fn url_encode(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn url_decode(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hi = chars.next();
            let lo = chars.next();
            if let (Some(hi), Some(lo)) = (hi, lo) {
                if let Ok(byte) = u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                    out.push(byte as char);
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Parses a partition path back into raw string components (the caller maps these through the
/// partition spec to interpret typed values).
pub fn parse_partition_path(path: &str) -> Vec<(String, Option<String>)> {
    path.split('/')
        .filter_map(|segment| segment.split_once('='))
        .map(|(name, value)| {
            if value == NULL_PARTITION_MARKER {
                (name.to_string(), None)
            } else {
                (name.to_string(), Some(url_decode(value)))
            }
        })
        .collect()
}

/// The kind of change one spec-evolution entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecChangeKind {
    /// A partition field present in the new spec but not the old.
    AddField,
    /// A partition field present in the old spec but not the new.
    RemoveField,
    /// A partition field's name changed.
    RenameField,
    /// A partition field's transform changed.
    ChangeTransform,
}

/// One entry of a partition spec diff.
#[derive(Debug, Clone)]
pub struct SpecChange {
    /// What kind of change this is.
    pub kind: SpecChangeKind,
    /// Permanent id of the partition field this change concerns.
    pub field_id: i32,
}

impl fmt::Display for SpecChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SpecChangeKind::AddField => write!(f, "add-field"),
            SpecChangeKind::RemoveField => write!(f, "remove-field"),
            SpecChangeKind::RenameField => write!(f, "rename-field"),
            SpecChangeKind::ChangeTransform => write!(f, "change-transform"),
        }
    }
}

/// Diffs two partition specs by matching fields on permanent id.
pub fn diff_specs(old: &PartitionSpec, new: &PartitionSpec) -> Vec<SpecChange> {
    let mut changes = Vec::new();
    let find = |spec: &PartitionSpec, id: i32| -> Option<&PartitionField> {
        spec.fields.iter().find(|f| f.field_id == id)
    };

    for new_field in &new.fields {
        match find(old, new_field.field_id) {
            None => changes.push(SpecChange { kind: SpecChangeKind::AddField, field_id: new_field.field_id }),
            Some(old_field) => {
                if old_field.name != new_field.name {
                    changes.push(SpecChange {
                        kind: SpecChangeKind::RenameField,
                        field_id: new_field.field_id,
                    });
                }
                if old_field.transform != new_field.transform {
                    changes.push(SpecChange {
                        kind: SpecChangeKind::ChangeTransform,
                        field_id: new_field.field_id,
                    });
                }
            }
        }
    }
    for old_field in &old.fields {
        if find(new, old_field.field_id).is_none() {
            changes.push(SpecChange { kind: SpecChangeKind::RemoveField, field_id: old_field.field_id });
        }
    }
    changes
}

/// `true` iff every [SpecChangeKind::ChangeTransform] in `changes` preserves value
/// partitioning: `identity` is never compatible with anything else, and `bucket[N]`/
/// `truncate[W]` are only compatible with themselves at the same parameter.
pub fn specs_compatible(old: &PartitionSpec, new: &PartitionSpec, changes: &[SpecChange]) -> bool {
    for change in changes {
        if change.kind != SpecChangeKind::ChangeTransform {
            continue;
        }
        let old_t = old.fields.iter().find(|f| f.field_id == change.field_id).map(|f| &f.transform);
        let new_t = new.fields.iter().find(|f| f.field_id == change.field_id).map(|f| &f.transform);
        let (Some(old_t), Some(new_t)) = (old_t, new_t) else { continue };
        if old_t == &Transform::Identity || new_t == &Transform::Identity {
            return false;
        }
        if old_t != new_t {
            return false;
        }
    }
    true
}

/// Per-partition running totals maintained by [PartitionStatsCollector].
#[derive(Debug, Default, Clone, Copy)]
pub struct PartitionTotals {
    /// Number of files in this partition.
    pub file_count: i64,
    /// Number of rows in this partition.
    pub row_count: i64,
    /// Total size in bytes of files in this partition.
    pub size_bytes: i64,
    /// Most recent file modification time observed, ms since epoch.
    pub last_modified: i64,
}

/// Running distinct-value count and per-type min/max for one partition field, across every
/// file recorded by a [PartitionStatsCollector].
#[derive(Debug, Default, Clone)]
pub struct FieldStats {
    distinct: std::collections::HashSet<String>,
    min_value: Option<Value>,
    max_value: Option<Value>,
}

impl FieldStats {
    /// Number of distinct values observed for this field.
    pub fn distinct_values(&self) -> i64 {
        self.distinct.len() as i64
    }

    /// Smallest value observed, ordered per [Value::compare].
    pub fn min_value(&self) -> Option<&Value> {
        self.min_value.as_ref()
    }

    /// Largest value observed, ordered per [Value::compare].
    pub fn max_value(&self) -> Option<&Value> {
        self.max_value.as_ref()
    }

    fn observe(&mut self, value: &Value) {
        self.distinct.insert(format!("{value:?}"));
        if self.min_value.as_ref().map(|m| value.compare(m) == std::cmp::Ordering::Less).unwrap_or(true) {
            self.min_value = Some(value.clone());
        }
        if self.max_value.as_ref().map(|m| value.compare(m) == std::cmp::Ordering::Greater).unwrap_or(true) {
            self.max_value = Some(value.clone());
        }
    }
}

/// Overall totals plus per-partition and per-field breakdowns, as returned by
/// [PartitionStatsCollector::stats].
#[derive(Debug, Default, Clone)]
pub struct PartitionStats {
    /// Totals across every file recorded, regardless of partition.
    pub overall: PartitionTotals,
    /// Totals keyed by the partition's canonical path.
    pub by_partition: HashMap<String, PartitionTotals>,
    /// Distinct-value count and min/max, by partition field position.
    pub by_field: Vec<FieldStats>,
}

/// Maintains per-partition file/row/size totals keyed by the partition's canonical path, plus
/// overall totals and per-field distinct-value/min/max statistics.
#[derive(Debug, Default)]
pub struct PartitionStatsCollector {
    by_key: HashMap<String, PartitionTotals>,
    overall: PartitionTotals,
    by_field: Vec<FieldStats>,
}

impl PartitionStatsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        PartitionStatsCollector::default()
    }

    /// Canonical key for a partition value tuple: `null` is distinct from an empty string.
    pub fn canonical_key(values: &[Option<String>]) -> String {
        values
            .iter()
            .map(|v| match v {
                None => "\u{0}null".to_string(),
                Some(s) => s.clone(),
            })
            .collect::<Vec<_>>()
            .join("\u{1}")
    }

    /// Records a file's contribution to its partition's totals, `overall`, and each field's
    /// distinct-value/min/max stats (`fields` holds one entry per partition field, by
    /// position; a `None` entry is a null partition value and does not update min/max).
    pub fn add_file(&mut self, key: &str, fields: &[Option<Value>], rows: i64, size_bytes: i64, modified_ms: i64) {
        let entry = self.by_key.entry(key.to_string()).or_default();
        entry.file_count += 1;
        entry.row_count += rows;
        entry.size_bytes += size_bytes;
        entry.last_modified = entry.last_modified.max(modified_ms);

        self.overall.file_count += 1;
        self.overall.row_count += rows;
        self.overall.size_bytes += size_bytes;
        self.overall.last_modified = self.overall.last_modified.max(modified_ms);

        if self.by_field.len() < fields.len() {
            self.by_field.resize(fields.len(), FieldStats::default());
        }
        for (field_stats, value) in self.by_field.iter_mut().zip(fields) {
            if let Some(value) = value {
                field_stats.observe(value);
            }
        }
    }

    /// Removes a file's contribution from its partition's totals and `overall`. Per-field
    /// distinct/min/max stats are monotonic and are not unwound.
    pub fn remove_file(&mut self, key: &str, rows: i64, size_bytes: i64) {
        if let Some(entry) = self.by_key.get_mut(key) {
            entry.file_count -= 1;
            entry.row_count -= rows;
            entry.size_bytes -= size_bytes;
        }
        self.overall.file_count -= 1;
        self.overall.row_count -= rows;
        self.overall.size_bytes -= size_bytes;
    }

    /// Returns the accumulated overall, per-partition, and per-field statistics.
    pub fn stats(&self) -> PartitionStats {
        PartitionStats {
            overall: self.overall,
            by_partition: self.by_key.clone(),
            by_field: self.by_field.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn day_and_hour_transform_concrete_scenario() {
        let ts = NaiveDateTime::parse_from_str("2024-03-15 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let value = Value::Timestampz(ts);
        let day = apply(Some(&value), &Transform::Day).unwrap().unwrap();
        assert_eq!(day, Value::Int(19797));
        let hour = apply(Some(&value), &Transform::Hour).unwrap().unwrap();
        assert_eq!(hour, Value::Int(19797 * 24 + 14));
    }

    #[test]
    fn bucket_is_deterministic_and_in_range() {
        let value = Value::String("USA".to_string());
        let a = apply(Some(&value), &Transform::Bucket(16)).unwrap().unwrap();
        let b = apply(Some(&value), &Transform::Bucket(16)).unwrap().unwrap();
        assert_eq!(a, b);
        if let Value::Int(n) = a {
            assert!((0..16).contains(&n));
        } else {
            panic!("expected int");
        }
    }

    #[test]
    fn void_and_null_always_yield_null() {
        let value = Value::Int(5);
        assert_eq!(apply(Some(&value), &Transform::Void).unwrap(), None);
        assert_eq!(apply(None, &Transform::Identity).unwrap(), None);
    }

    #[test]
    fn partition_path_round_trips_for_string_values() {
        let values = vec![("name".to_string(), Some(Value::String("a b".to_string())))];
        let path = partition_path(&values);
        assert_eq!(path, "name=a%20b");
        let parsed = parse_partition_path(&path);
        assert_eq!(parsed, vec![("name".to_string(), Some("a b".to_string()))]);
    }

    #[test]
    fn partition_path_round_trips_null() {
        let values = vec![("name".to_string(), None)];
        let path = partition_path(&values);
        let parsed = parse_partition_path(&path);
        assert_eq!(parsed, vec![("name".to_string(), None)]);
    }

    #[test]
    fn identity_to_bucket_is_breaking() {
        let old = PartitionSpec {
            spec_id: 0,
            fields: vec![PartitionField {
                source_id: 1,
                field_id: 1000,
                name: "a".to_string(),
                transform: Transform::Identity,
            }],
        };
        let new = PartitionSpec {
            spec_id: 1,
            fields: vec![PartitionField {
                source_id: 1,
                field_id: 1000,
                name: "a".to_string(),
                transform: Transform::Bucket(16),
            }],
        };
        let changes = diff_specs(&old, &new);
        assert!(!specs_compatible(&old, &new, &changes));
    }

    #[test]
    fn partition_stats_collector_tracks_totals() {
        let mut collector = PartitionStatsCollector::new();
        let key = PartitionStatsCollector::canonical_key(&[Some("2024".to_string())]);
        collector.add_file(&key, &[Some(Value::Int(2024))], 10, 1000, 1);
        collector.add_file(&key, &[Some(Value::Int(2024))], 5, 500, 2);
        let stats = collector.stats();
        let totals = stats.by_partition.get(&key).unwrap();
        assert_eq!(totals.file_count, 2);
        assert_eq!(totals.row_count, 15);
        assert_eq!(stats.overall.file_count, 2);
        assert_eq!(stats.overall.row_count, 15);
    }

    #[test]
    fn partition_stats_collector_tracks_per_field_distinct_and_bounds() {
        let mut collector = PartitionStatsCollector::new();
        let key_a = PartitionStatsCollector::canonical_key(&[Some("2023".to_string())]);
        let key_b = PartitionStatsCollector::canonical_key(&[Some("2024".to_string())]);
        collector.add_file(&key_a, &[Some(Value::Int(2023))], 10, 1000, 1);
        collector.add_file(&key_b, &[Some(Value::Int(2024))], 5, 500, 2);
        collector.add_file(&key_b, &[Some(Value::Int(2024))], 1, 100, 3);

        let stats = collector.stats();
        assert_eq!(stats.by_field.len(), 1);
        let field = &stats.by_field[0];
        assert_eq!(field.distinct_values(), 2);
        assert_eq!(field.min_value(), Some(&Value::Int(2023)));
        assert_eq!(field.max_value(), Some(&Value::Int(2024)));
    }
}
