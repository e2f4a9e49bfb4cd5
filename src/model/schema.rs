/*!
A table's [schema](https://iceberg.apache.org/spec/#schemas-and-data-types) names its columns
and assigns each a permanent field id. Carried over from the teacher's `model/schema.rs`,
narrowed to schema-identity concerns; see [crate::model::types] for the type system itself.
*/
use serde::{Deserialize, Serialize};

use super::types::{NameMappings, SchemaStruct};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// A single schema version of a table.
pub struct Schema {
    /// Identifier of this schema, unique among the table's schemas.
    pub schema_id: i32,
    /// Field ids that together identify a row, used for equality deletes.
    pub identifier_field_ids: Option<Vec<i32>>,
    /// Fallback field-id mapping used when reading files without embedded field ids.
    pub name_mapping: Option<NameMappings>,
    #[serde(flatten)]
    /// The schema's fields.
    pub struct_fields: SchemaStruct,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
/// A v1 schema, convertible to [Schema] on load.
pub struct SchemaV1 {
    /// Identifier of this schema, defaulted to 0 if absent in v1.
    pub schema_id: Option<i32>,
    /// Field ids that together identify a row.
    pub identifier_field_ids: Option<Vec<i32>>,
    /// Fallback field-id mapping.
    pub name_mapping: Option<NameMappings>,
    #[serde(flatten)]
    /// The schema's fields.
    pub struct_fields: SchemaStruct,
}

impl From<SchemaV1> for Schema {
    fn from(v1: SchemaV1) -> Self {
        Schema {
            schema_id: v1.schema_id.unwrap_or(0),
            identifier_field_ids: v1.identifier_field_ids,
            name_mapping: v1.name_mapping,
            struct_fields: v1.struct_fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{AllType, PrimitiveType};

    #[test]
    fn round_trips_through_json() {
        let data = r#"
        {
            "schema-id": 1,
            "type": "struct",
            "fields": [
                { "id": 1, "name": "a", "required": true, "type": "int" }
            ]
        }"#;
        let schema: Schema = serde_json::from_str(data).unwrap();
        assert_eq!(schema.schema_id, 1);
        assert_eq!(schema.struct_fields.fields.len(), 1);
        assert_eq!(
            schema.struct_fields.fields[0].field_type,
            AllType::Primitive(PrimitiveType::Int)
        );
    }

    #[test]
    fn v1_defaults_schema_id_to_zero() {
        let data = r#"{ "type": "struct", "fields": [] }"#;
        let v1: SchemaV1 = serde_json::from_str(data).unwrap();
        let schema: Schema = v1.into();
        assert_eq!(schema.schema_id, 0);
    }
}
