/*!
Filter tree rewrite from logical column paths to shredded storage paths (§4.J).
*/
use crate::value::Value;
use crate::variant::shred::ShredConfig;

/// A scalar literal appearing in a filter leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Integral literal.
    Int(i64),
    /// Floating point literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// Boolean literal.
    Bool(bool),
}

/// A single-column comparison operator and its operand(s).
#[derive(Debug, Clone, PartialEq)]
pub enum CompareOp {
    /// `$eq`.
    Eq(Scalar),
    /// `$gt`.
    Gt(Scalar),
    /// `$gte`.
    Gte(Scalar),
    /// `$lt`.
    Lt(Scalar),
    /// `$lte`.
    Lte(Scalar),
    /// `$ne`.
    Ne(Scalar),
    /// `$in`.
    In(Vec<Scalar>),
}

/// A filter tree: logical combinators over single-column comparisons.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// All children must hold.
    And(Vec<Filter>),
    /// At least one child must hold.
    Or(Vec<Filter>),
    /// The child must not hold.
    Not(Box<Filter>),
    /// A leaf: `path op value`.
    Compare {
        /// Dotted column path this leaf reads.
        path: String,
        /// The comparison applied.
        op: CompareOp,
    },
}

/// Rewrites every leaf path that addresses a shredded sub-field to its storage path
/// (`{column}.typed_value.{field}.typed_value`), recording which paths were and weren't
/// rewritten. Idempotent: a second pass over the result rewrites nothing further, since the
/// rewritten path no longer matches any config's declared field list.
pub fn transform_variant_filter(
    filter: &Filter,
    configs: &[ShredConfig],
) -> (Filter, Vec<String>, Vec<String>) {
    let mut transformed = Vec::new();
    let mut untransformed = Vec::new();
    let rewritten = rewrite(filter, configs, &mut transformed, &mut untransformed);
    (rewritten, transformed, untransformed)
}

fn rewrite(
    filter: &Filter,
    configs: &[ShredConfig],
    transformed: &mut Vec<String>,
    untransformed: &mut Vec<String>,
) -> Filter {
    match filter {
        Filter::And(children) => Filter::And(
            children.iter().map(|c| rewrite(c, configs, transformed, untransformed)).collect(),
        ),
        Filter::Or(children) => Filter::Or(
            children.iter().map(|c| rewrite(c, configs, transformed, untransformed)).collect(),
        ),
        Filter::Not(child) => Filter::Not(Box::new(rewrite(child, configs, transformed, untransformed))),
        Filter::Compare { path, op } => {
            let Some((column, field_path)) = path.split_once('.') else {
                untransformed.push(path.clone());
                return filter.clone();
            };
            let config = configs.iter().find(|c| c.column_name == column);
            match config {
                Some(config) if config.fields.iter().any(|f| f == field_path) => {
                    let rewritten_path = config.shredded_path(field_path);
                    transformed.push(rewritten_path.clone());
                    Filter::Compare { path: rewritten_path, op: op.clone() }
                }
                _ => {
                    untransformed.push(path.clone());
                    filter.clone()
                }
            }
        }
    }
}

/// Resolves a [Scalar] to a typed [Value] for bounds comparison, given the declared type.
pub fn scalar_to_value(scalar: &Scalar, ty: &crate::model::types::PrimitiveType) -> Value {
    use crate::model::types::PrimitiveType as P;
    match (scalar, ty) {
        (Scalar::Int(v), P::Int) => Value::Int(*v as i32),
        (Scalar::Int(v), P::Long) => Value::Long(*v),
        (Scalar::Float(v), P::Float) => Value::Float(*v as f32),
        (Scalar::Float(v), P::Double) => Value::Double(*v),
        (Scalar::Str(v), P::String) => Value::String(v.clone()),
        (Scalar::Bool(v), P::Boolean) => Value::Boolean(*v),
        (Scalar::Int(v), P::Double) => Value::Double(*v as f64),
        (Scalar::Int(v), P::Float) => Value::Float(*v as f32),
        (other, _) => match other {
            Scalar::Int(v) => Value::Long(*v),
            Scalar::Float(v) => Value::Double(*v),
            Scalar::Str(v) => Value::String(v.clone()),
            Scalar::Bool(v) => Value::Boolean(*v),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> ShredConfig {
        ShredConfig {
            column_name: "$data".to_string(),
            fields: vec!["year".to_string()],
            field_types: HashMap::from([("year".to_string(), crate::model::types::PrimitiveType::Int)]),
        }
    }

    #[test]
    fn rewrites_configured_field_path() {
        let filter = Filter::Compare { path: "$data.year".to_string(), op: CompareOp::Gt(Scalar::Int(2020)) };
        let (rewritten, transformed, untransformed) = transform_variant_filter(&filter, &[config()]);
        assert_eq!(transformed, vec!["$data.typed_value.year.typed_value".to_string()]);
        assert!(untransformed.is_empty());
        assert_eq!(
            rewritten,
            Filter::Compare {
                path: "$data.typed_value.year.typed_value".to_string(),
                op: CompareOp::Gt(Scalar::Int(2020)),
            }
        );
    }

    #[test]
    fn leaves_unconfigured_path_untouched() {
        let filter = Filter::Compare { path: "$data.other".to_string(), op: CompareOp::Eq(Scalar::Int(1)) };
        let (_, transformed, untransformed) = transform_variant_filter(&filter, &[config()]);
        assert!(transformed.is_empty());
        assert_eq!(untransformed, vec!["$data.other".to_string()]);
    }

    #[test]
    fn rewrite_is_idempotent() {
        let filter = Filter::Compare { path: "$data.year".to_string(), op: CompareOp::Gt(Scalar::Int(2020)) };
        let (once, _, _) = transform_variant_filter(&filter, &[config()]);
        let (twice, transformed_second, _) = transform_variant_filter(&once, &[config()]);
        assert_eq!(once, twice);
        assert!(transformed_second.is_empty());
    }
}
