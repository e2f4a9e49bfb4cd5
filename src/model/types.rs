/*!
Primitive and nested types that make up a [schema](super::schema) field, carried over from the
teacher's `model/schema.rs` type definitions and kept free of anything schema-identity-specific
so [crate::value] can depend on just the type side.
*/
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{
    de::{self, IntoDeserializer},
    Deserialize, Deserializer, Serialize,
};

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[serde(remote = "Self")]
/// Primitive types within a schema.
pub enum PrimitiveType {
    /// True or false.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating point.
    Float,
    /// 64-bit IEEE 754 floating point.
    Double,
    /// Fixed point decimal with precision and scale.
    Decimal {
        /// Number of digits in the number, ≤ 38.
        precision: i32,
        /// Number of digits to the right of the decimal point.
        scale: u8,
    },
    /// Calendar date without timezone or time.
    Date,
    /// Time of day without date or timezone.
    Time,
    /// Timestamp without timezone.
    Timestamp,
    /// Timestamp with timezone.
    Timestampz,
    /// Arbitrary-length character sequence.
    String,
    /// Universally unique identifier.
    Uuid,
    /// Fixed length byte array.
    Fixed(u64),
    /// Arbitrary-length byte array.
    Binary,
}

impl Serialize for PrimitiveType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use PrimitiveType::*;
        match self {
            Decimal { precision, scale } => {
                serializer.serialize_str(&format!("decimal({precision},{scale})"))
            }
            Fixed(l) => serializer.serialize_str(&format!("fixed[{l}]")),
            _ => PrimitiveType::serialize(self, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PrimitiveType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.starts_with("decimal") {
            deserialize_decimal(s.into_deserializer())
        } else if s.starts_with("fixed") {
            deserialize_fixed(s.into_deserializer())
        } else {
            PrimitiveType::deserialize(s.into_deserializer())
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::Int => write!(f, "int"),
            PrimitiveType::Long => write!(f, "long"),
            PrimitiveType::Float => write!(f, "float"),
            PrimitiveType::Double => write!(f, "double"),
            PrimitiveType::Decimal { precision, scale } => {
                write!(f, "decimal({precision},{scale})")
            }
            PrimitiveType::Date => write!(f, "date"),
            PrimitiveType::Time => write!(f, "time"),
            PrimitiveType::Timestamp => write!(f, "timestamp"),
            PrimitiveType::Timestampz => write!(f, "timestampz"),
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Uuid => write!(f, "uuid"),
            PrimitiveType::Fixed(_) => write!(f, "fixed"),
            PrimitiveType::Binary => write!(f, "binary"),
        }
    }
}

fn deserialize_decimal<'de, D>(deserializer: D) -> Result<PrimitiveType, D::Error>
where
    D: Deserializer<'de>,
{
    let this = String::deserialize(deserializer)?;
    lazy_static! {
        static ref RE: Regex = Regex::new(r#"^decimal\((?P<p>\d+),(?P<s>\d+)\)$"#).unwrap();
    }
    let err_msg = format!("Invalid decimal format {this}");
    let caps = RE.captures(&this).ok_or_else(|| de::Error::custom(&err_msg))?;
    let precision: i32 = caps
        .name("p")
        .ok_or_else(|| de::Error::custom(&err_msg))
        .and_then(|p| p.as_str().parse().map_err(|_| de::Error::custom("precision not i32")))?;
    let scale: u8 = caps
        .name("s")
        .ok_or_else(|| de::Error::custom(&err_msg))
        .and_then(|p| p.as_str().parse().map_err(|_| de::Error::custom("scale not u8")))?;
    if precision > 38 {
        return Err(de::Error::custom(format!("precision {precision} exceeds 38")));
    }
    Ok(PrimitiveType::Decimal { precision, scale })
}

fn deserialize_fixed<'de, D>(deserializer: D) -> Result<PrimitiveType, D::Error>
where
    D: Deserializer<'de>,
{
    let this = String::deserialize(deserializer)?;
    lazy_static! {
        static ref RE: Regex = Regex::new(r#"^fixed\[(?P<l>\d+)\]$"#).unwrap();
    }
    let err_msg = format!("Invalid fixed format {this}");
    let caps = RE.captures(&this).ok_or_else(|| de::Error::custom(&err_msg))?;
    let length: u64 = caps
        .name("l")
        .ok_or_else(|| de::Error::custom(&err_msg))
        .and_then(|p| p.as_str().parse().map_err(|_| de::Error::custom("length not u64")))?;
    Ok(PrimitiveType::Fixed(length))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(untagged)]
/// A union of all allowed field types.
pub enum AllType {
    /// A primitive type.
    Primitive(PrimitiveType),
    /// A struct type.
    Struct(SchemaStruct),
    /// A list type.
    List(ListType),
    /// A map type.
    Map(MapType),
}

impl fmt::Display for AllType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AllType::Primitive(p) => write!(f, "{p}"),
            AllType::Struct(_) => write!(f, "struct"),
            AllType::List(_) => write!(f, "list"),
            AllType::Map(_) => write!(f, "map"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "type")]
/// A tuple of named, typed, uniquely-id'd fields.
pub struct SchemaStruct {
    /// The fields of the struct.
    pub fields: Vec<StructField>,
}

impl SchemaStruct {
    /// Finds a field by its permanent id.
    pub fn field_by_id(&self, id: i32) -> Option<&StructField> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// Finds a field by name, non-recursively.
    pub fn field_by_name(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The largest field id appearing anywhere in this struct, recursing into nested types.
    pub fn max_field_id(&self) -> i32 {
        self.fields
            .iter()
            .map(StructField::max_field_id)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
/// A single field within a [SchemaStruct]. The `id` is permanent: renames keep it, drops
/// retire it, and new fields always receive an id larger than any previously assigned.
pub struct StructField {
    /// Permanent, unique field id.
    pub id: i32,
    /// Field name. May change across schema versions without affecting `id`.
    pub name: String,
    /// Whether a value is mandatory for this field.
    pub required: bool,
    /// The field's type.
    #[serde(rename = "type")]
    pub field_type: AllType,
    /// Optional documentation string.
    pub doc: Option<String>,
}

impl StructField {
    fn max_field_id(&self) -> i32 {
        let nested_max = match &self.field_type {
            AllType::Struct(s) => s.max_field_id(),
            AllType::List(l) => l.element_id.max(Self::type_max_field_id(&l.element)),
            AllType::Map(m) => m
                .key_id
                .max(m.value_id)
                .max(Self::type_max_field_id(&m.key))
                .max(Self::type_max_field_id(&m.value)),
            AllType::Primitive(_) => 0,
        };
        self.id.max(nested_max)
    }

    fn type_max_field_id(t: &AllType) -> i32 {
        match t {
            AllType::Struct(s) => s.max_field_id(),
            AllType::List(l) => l.element_id.max(Self::type_max_field_id(&l.element)),
            AllType::Map(m) => m
                .key_id
                .max(m.value_id)
                .max(Self::type_max_field_id(&m.key))
                .max(Self::type_max_field_id(&m.value)),
            AllType::Primitive(_) => 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case", tag = "list")]
/// A list of elements of a single type.
pub struct ListType {
    /// Unique id of the element.
    pub element_id: i32,
    /// Whether the element is mandatory.
    pub element_required: bool,
    /// The element's type.
    pub element: Box<AllType>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case", tag = "type")]
/// A collection of key-value pairs.
pub struct MapType {
    /// Unique id of the key field.
    pub key_id: i32,
    /// Type of the key.
    pub key: Box<AllType>,
    /// Unique id of the value field.
    pub value_id: i32,
    /// Whether the value is mandatory.
    pub value_required: bool,
    /// Type of the value.
    pub value: Box<AllType>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
/// Fallback field-id mappings used when a data file lacks field-id metadata.
pub struct NameMappings {
    /// The default mappings.
    pub default: Vec<NameMapping>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// A single entry within [NameMappings].
pub struct NameMapping {
    /// The iceberg field id used when a name below is present in the data file.
    pub field_id: Option<i32>,
    /// Names that map to this field.
    pub names: Vec<String>,
    /// Mappings for children, for struct/list/map types.
    pub fields: Option<Vec<NameMapping>>,
}
