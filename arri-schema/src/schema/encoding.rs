//! Flat JSON encoding of schema nodes.
//!
//! Every form serializes to one JSON object whose keys identify the form:
//! `type`, `enum`, `elements`, `properties`/`optionalProperties`/`isStrict`,
//! `values`, `discriminator`/`mapping` or `ref`. An object with none of them
//! is the empty form. `metadata` and `isNullable` may appear on any form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{
    DiscriminatorSchema, Metadata, PropertiesSchema, ScalarType, Schema, SchemaForm, SchemaOrigin,
};
use crate::error::SchemaError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct SchemaRepr {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    scalar: Option<ScalarType>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    variants: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    elements: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<IndexMap<String, Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    optional_properties: Option<IndexMap<String, Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_strict: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    discriminator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    mapping: Option<IndexMap<String, Schema>>,

    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    metadata: Metadata,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_nullable: bool,
}

impl From<Schema> for SchemaRepr {
    fn from(schema: Schema) -> Self {
        let mut repr = SchemaRepr {
            metadata: schema.metadata,
            is_nullable: schema.nullable,
            ..Default::default()
        };
        match schema.form {
            SchemaForm::Empty => {}
            SchemaForm::Type(scalar) => repr.scalar = Some(scalar),
            SchemaForm::Enum(variants) => repr.variants = Some(variants),
            SchemaForm::Elements(items) => repr.elements = Some(items),
            SchemaForm::Properties(props) => {
                // `properties` is always written so an empty object stays an object.
                repr.properties = Some(props.required);
                if !props.optional.is_empty() {
                    repr.optional_properties = Some(props.optional);
                }
                if props.strict {
                    repr.is_strict = Some(true);
                }
            }
            SchemaForm::Values(values) => repr.values = Some(values),
            SchemaForm::Discriminator(disc) => {
                repr.discriminator = Some(disc.tag);
                repr.mapping = Some(disc.mapping);
            }
            SchemaForm::Ref(name) => repr.reference = Some(name),
        }
        repr
    }
}

impl TryFrom<SchemaRepr> for Schema {
    type Error = SchemaError;

    fn try_from(repr: SchemaRepr) -> Result<Self, Self::Error> {
        let is_object =
            repr.properties.is_some() || repr.optional_properties.is_some() || repr.is_strict.is_some();
        let is_union = repr.discriminator.is_some() || repr.mapping.is_some();
        let present = [
            repr.scalar.is_some(),
            repr.variants.is_some(),
            repr.elements.is_some(),
            is_object,
            repr.values.is_some(),
            is_union,
            repr.reference.is_some(),
        ]
        .into_iter()
        .filter(|p| *p)
        .count();
        if present > 1 {
            return Err(SchemaError::InvalidEncoding(
                "a schema may only use the keywords of a single form".to_string(),
            ));
        }

        let form = if let Some(scalar) = repr.scalar {
            SchemaForm::Type(scalar)
        } else if let Some(variants) = repr.variants {
            SchemaForm::Enum(variants)
        } else if let Some(items) = repr.elements {
            SchemaForm::Elements(items)
        } else if is_object {
            if repr.properties.is_none() && repr.optional_properties.is_none() {
                return Err(SchemaError::InvalidEncoding(
                    "isStrict requires properties or optionalProperties".to_string(),
                ));
            }
            SchemaForm::Properties(PropertiesSchema {
                required: repr.properties.unwrap_or_default(),
                optional: repr.optional_properties.unwrap_or_default(),
                strict: repr.is_strict.unwrap_or(false),
            })
        } else if let Some(values) = repr.values {
            SchemaForm::Values(values)
        } else if is_union {
            match (repr.discriminator, repr.mapping) {
                (Some(tag), Some(mapping)) => {
                    SchemaForm::Discriminator(DiscriminatorSchema { tag, mapping })
                }
                _ => {
                    return Err(SchemaError::InvalidEncoding(
                        "discriminator and mapping must appear together".to_string(),
                    ))
                }
            }
        } else if let Some(name) = repr.reference {
            SchemaForm::Ref(name)
        } else {
            SchemaForm::Empty
        };

        Ok(Schema {
            form,
            metadata: repr.metadata,
            nullable: repr.is_nullable,
            origin: SchemaOrigin::Native,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{Schema, SchemaForm};

    #[test]
    fn test_scalar_encoding() {
        let schema = Schema::string().nullable().with_description("name");
        assert_eq!(
            schema.to_json(),
            r#"{"type":"string","metadata":{"description":"name"},"isNullable":true}"#
        );
    }

    #[test]
    fn test_empty_object_keeps_properties_key() {
        let schema = Schema::object(Vec::<(String, crate::schema::Property)>::new());
        assert_eq!(schema.to_json(), r#"{"properties":{}}"#);
        let back = Schema::from_json(&schema.to_json()).unwrap();
        assert!(matches!(back.form, SchemaForm::Properties(_)));
    }

    #[test]
    fn test_object_encoding() {
        let schema = Schema::object([
            ("id", Schema::string().into()),
            ("age", Schema::uint8().optional()),
        ])
        .strict();
        insta::assert_snapshot!(
            schema.to_json(),
            @r#"{"properties":{"id":{"type":"string"}},"optionalProperties":{"age":{"type":"uint8"}},"isStrict":true}"#
        );
    }

    #[test]
    fn test_discriminator_encoding_round_trip() {
        let schema = Schema::discriminator(
            "kind",
            [
                ("A", Schema::object([("a", Schema::string().into())])),
                ("B", Schema::object([("b", Schema::int64().into())])),
            ],
        );
        let json = schema.to_json();
        assert_eq!(
            json,
            r#"{"discriminator":"kind","mapping":{"A":{"properties":{"a":{"type":"string"}}},"B":{"properties":{"b":{"type":"int64"}}}}}"#
        );
        assert_eq!(Schema::from_json(&json).unwrap(), schema);
    }

    #[test]
    fn test_empty_form() {
        let schema = Schema::from_json("{}").unwrap();
        assert_eq!(schema.form, SchemaForm::Empty);
        let nullable = Schema::from_json(r#"{"isNullable":true}"#).unwrap();
        assert!(nullable.nullable);
    }

    #[test]
    fn test_rejects_mixed_forms() {
        let err = Schema::from_json(r#"{"type":"string","elements":{}}"#).unwrap_err();
        assert!(err.to_string().contains("single form"));
    }

    #[test]
    fn test_rejects_unknown_keyword() {
        assert!(Schema::from_json(r#"{"tpye":"string"}"#).is_err());
    }

    #[test]
    fn test_ref_encoding() {
        let schema = Schema::reference("Tree").nullable();
        assert_eq!(schema.to_json(), r#"{"ref":"Tree","isNullable":true}"#);
        assert_eq!(Schema::from_json(&schema.to_json()).unwrap(), schema);
    }
}
