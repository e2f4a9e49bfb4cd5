/*!
Predicate pushdown over shredded variant columns (§4.K): decides whether a data file's bounds
prove a filter can match no row in that file.
*/
use std::collections::HashMap;

use crate::model::manifest::DataFile;
use crate::model::types::PrimitiveType;
use crate::value::Value;
use crate::variant::filter::{scalar_to_value, transform_variant_filter, CompareOp, Filter, Scalar};
use crate::variant::shred::ShredConfig;

/// `true` plus a short diagnostic if `file` can be proven to contain no row matching `filter`.
pub fn should_skip_data_file(
    file: &DataFile,
    filter: &Filter,
    configs: &[ShredConfig],
    field_id_map: &HashMap<String, i32>,
) -> (bool, Option<String>) {
    let (rewritten, _, _) = transform_variant_filter(filter, configs);
    evaluate(&rewritten, file, configs, field_id_map)
}

fn evaluate(
    filter: &Filter,
    file: &DataFile,
    configs: &[ShredConfig],
    field_id_map: &HashMap<String, i32>,
) -> (bool, Option<String>) {
    match filter {
        Filter::And(children) => {
            for child in children {
                let (skip, reason) = evaluate(child, file, configs, field_id_map);
                if skip {
                    return (true, reason);
                }
            }
            (false, None)
        }
        Filter::Or(children) => {
            if children.is_empty() {
                return (false, None);
            }
            let mut last_reason = None;
            for child in children {
                let (skip, reason) = evaluate(child, file, configs, field_id_map);
                if !skip {
                    return (false, None);
                }
                last_reason = reason;
            }
            (true, last_reason)
        }
        Filter::Not(_) => (false, None),
        Filter::Compare { path, op } => evaluate_leaf(path, op, file, configs, field_id_map),
    }
}

fn resolve_type(path: &str, configs: &[ShredConfig]) -> Option<PrimitiveType> {
    for config in configs {
        for field in &config.fields {
            if config.shredded_path(field) == path {
                return config.field_types.get(field).cloned();
            }
        }
    }
    None
}

fn evaluate_leaf(
    path: &str,
    op: &CompareOp,
    file: &DataFile,
    configs: &[ShredConfig],
    field_id_map: &HashMap<String, i32>,
) -> (bool, Option<String>) {
    let Some(field_id) = field_id_map.get(path) else { return (false, None) };
    let Some(ty) = resolve_type(path, configs) else { return (false, None) };
    let lower_bytes = file.lower_bounds.as_ref().and_then(|b| b.get(field_id));
    let upper_bytes = file.upper_bounds.as_ref().and_then(|b| b.get(field_id));
    let (Some(lower_bytes), Some(upper_bytes)) = (lower_bytes, upper_bytes) else {
        return (false, None);
    };
    let Ok(lower) = Value::decode(&ty, lower_bytes) else { return (false, None) };
    let Ok(upper) = Value::decode(&ty, upper_bytes) else { return (false, None) };

    match op {
        CompareOp::Eq(v) => {
            let v = scalar_to_value(v, &ty);
            let skip = below(&v, &lower) || above(&v, &upper);
            (skip, skip.then(|| format!("{path} == {v:?} outside [{lower:?}..{upper:?}]")))
        }
        CompareOp::Gt(v) => {
            let v = scalar_to_value(v, &ty);
            let skip = upper.compare(&v) != std::cmp::Ordering::Greater;
            (skip, skip.then(|| format!("{path} > {v:?} violates [{lower:?}..{upper:?}]")))
        }
        CompareOp::Gte(v) => {
            let v = scalar_to_value(v, &ty);
            let skip = upper.compare(&v) == std::cmp::Ordering::Less;
            (skip, skip.then(|| format!("{path} >= {v:?} violates [{lower:?}..{upper:?}]")))
        }
        CompareOp::Lt(v) => {
            let v = scalar_to_value(v, &ty);
            let skip = lower.compare(&v) != std::cmp::Ordering::Less;
            (skip, skip.then(|| format!("{path} < {v:?} violates [{lower:?}..{upper:?}]")))
        }
        CompareOp::Lte(v) => {
            let v = scalar_to_value(v, &ty);
            let skip = lower.compare(&v) == std::cmp::Ordering::Greater;
            (skip, skip.then(|| format!("{path} <= {v:?} violates [{lower:?}..{upper:?}]")))
        }
        CompareOp::Ne(_) => (false, None),
        CompareOp::In(values) => {
            let skip = values.iter().all(|v| {
                let v = scalar_to_value(v, &ty);
                below(&v, &lower) || above(&v, &upper)
            });
            (skip, skip.then(|| format!("{path} in {values:?} misses [{lower:?}..{upper:?}]")))
        }
    }
}

fn below(v: &Value, lower: &Value) -> bool {
    v.compare(lower) == std::cmp::Ordering::Less
}

fn above(v: &Value, upper: &Value) -> bool {
    v.compare(upper) == std::cmp::Ordering::Greater
}
