//! The validation engine.
//!
//! A [`Validator`] pairs a root schema with the table its refs resolve
//! against. It offers five operations over the same recursive traversal:
//!
//! | operation | input | result |
//! |-----------|-------|--------|
//! | [`validate`](Validator::validate) | typed value | `bool`, stops at the first mismatch |
//! | [`errors`](Validator::errors) | typed value | every [`Diagnostic`] |
//! | [`parse`](Validator::parse) | JSON text | typed value or [`ParseError`] |
//! | [`parse_value`](Validator::parse_value) | wire value | typed value or [`ValidationError`] |
//! | [`serialize`](Validator::serialize) | typed value | canonical JSON |
//! | [`coerce`](Validator::coerce) | loosely typed value | typed value or [`ValidationError`] |
//!
//! Structural mismatches are never panics. Malformed schemas are rejected
//! once, when the validator is built.

mod check;
mod read;
mod write;

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::compiled::CompiledValidator;
use crate::error::{
    DecodeError, Diagnostic, ParseError, SchemaError, SchemaResult, ValidationError,
};
use crate::registry::Definitions;
use crate::schema::{Schema, SchemaForm};
use crate::value::Value;

pub(crate) use read::ReadMode;
pub(crate) use write::write_any;

/// Validator for one root schema.
#[derive(Debug, Clone)]
pub struct Validator {
    root: Schema,
    table: Definitions,
}

impl Validator {
    /// Build a validator resolving refs against ids declared inside `schema`.
    pub fn new(schema: Schema) -> SchemaResult<Self> {
        Self::with_definitions(schema, &Definitions::new())
    }

    /// Build a validator resolving refs against `definitions`, then against
    /// ids declared inside `schema`.
    pub fn with_definitions(schema: Schema, definitions: &Definitions) -> SchemaResult<Self> {
        let table = definitions.merged(inline_definitions(&schema));
        check_schema(&schema, &table)?;
        for (_, schema) in table.iter() {
            check_schema(schema, &table)?;
        }
        trace!(
            form = schema.form.name(),
            definitions = table.len(),
            "Built validator"
        );
        Ok(Self {
            root: schema,
            table,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.root
    }

    pub fn definitions(&self) -> &Definitions {
        &self.table
    }

    /// Structural type check. Never coerces.
    pub fn validate(&self, value: &Value) -> bool {
        check::Checker::new(&self.table, false).run(&self.root, value)
    }

    /// Every mismatch between `value` and the schema.
    pub fn errors(&self, value: &Value) -> Vec<Diagnostic> {
        let mut checker = check::Checker::new(&self.table, true);
        checker.run(&self.root, value);
        checker.into_diagnostics()
    }

    /// Decode JSON text and parse it.
    pub fn parse(&self, input: &str) -> Result<Value, ParseError> {
        let wire = Value::from_json_str(input).map_err(|err| {
            let err = DecodeError::from(err);
            debug!(line = err.line, column = err.column, "Input is not valid JSON");
            err
        })?;
        Ok(self.parse_value(&wire)?)
    }

    /// Parse an already-decoded wire value into its typed form.
    pub fn parse_value(&self, input: &Value) -> Result<Value, ValidationError> {
        self.read(input, ReadMode::Parse)
    }

    /// Coerce loosely typed input (such as query parameters) and parse it.
    pub fn coerce(&self, input: &Value) -> Result<Value, ValidationError> {
        self.read(input, ReadMode::Coerce)
    }

    /// Canonical JSON for a typed value.
    pub fn serialize(&self, value: &Value) -> Result<String, ValidationError> {
        write::Writer::new(&self.table)
            .run(&self.root, value)
            .map_err(ValidationError::single)
    }

    /// Assemble the closure-based fast path for this schema.
    pub fn compile(&self) -> CompiledValidator {
        CompiledValidator::new(&self.root, &self.table)
    }

    fn read(&self, input: &Value, mode: ReadMode) -> Result<Value, ValidationError> {
        let mut reader = read::Reader::new(&self.table, mode);
        match reader.run(&self.root, input) {
            Some(value) => Ok(value),
            None => {
                let diagnostics = reader.into_diagnostics();
                debug!(
                    error_count = diagnostics.len(),
                    mode = ?mode,
                    "Parse failed"
                );
                Err(ValidationError::new(diagnostics))
            }
        }
    }
}

/// Schemas with an id anywhere inside `schema`, including `schema` itself.
///
/// Nullability belongs to the use site, so the table entry never accepts
/// null on its own.
fn inline_definitions(schema: &Schema) -> Vec<(String, Schema)> {
    let mut found = Vec::new();
    schema.walk(&mut |node| {
        if let Some(id) = node.id() {
            let mut definition = node.clone();
            definition.nullable = false;
            found.push((id.to_string(), definition));
        }
    });
    found
}

/// Reject malformed IR: bad mappings, overlapping keys, duplicate enum
/// variants, dangling refs and ref chains that never reach a concrete form.
pub(crate) fn check_schema(schema: &Schema, table: &Definitions) -> SchemaResult<()> {
    let mut result = Ok(());
    schema.walk(&mut |node| {
        if result.is_err() {
            return;
        }
        result = check_node(node, table);
    });
    result
}

fn check_node(node: &Schema, table: &Definitions) -> SchemaResult<()> {
    match &node.form {
        SchemaForm::Enum(variants) => {
            let mut seen = HashSet::new();
            for variant in variants {
                if !seen.insert(variant) {
                    return Err(SchemaError::DuplicateEnumVariant(variant.clone()));
                }
            }
        }
        SchemaForm::Properties(props) => {
            if let Some(key) = props.required.keys().find(|k| props.optional.contains_key(*k)) {
                return Err(SchemaError::OverlappingProperty { key: key.clone() });
            }
        }
        SchemaForm::Discriminator(disc) => {
            for (tag, variant) in &disc.mapping {
                let Some(props) = variant.as_properties() else {
                    return Err(SchemaError::InvalidMapping { tag: tag.clone() });
                };
                if variant.nullable {
                    return Err(SchemaError::NullableMapping { tag: tag.clone() });
                }
                if props.declares(&disc.tag) {
                    return Err(SchemaError::TagRedeclared {
                        tag: tag.clone(),
                        field: disc.tag.clone(),
                    });
                }
            }
        }
        SchemaForm::Ref(name) => {
            resolve(table, name)?;
        }
        SchemaForm::Empty
        | SchemaForm::Type(_)
        | SchemaForm::Elements(_)
        | SchemaForm::Values(_) => {}
    }
    Ok(())
}

/// Follow `name` through ref-to-ref chains to a concrete schema.
pub(crate) fn resolve<'a>(table: &'a Definitions, name: &str) -> SchemaResult<&'a Schema> {
    let mut seen: Vec<&str> = Vec::new();
    let mut current = name;
    loop {
        let schema = table
            .get(current)
            .ok_or_else(|| SchemaError::UnresolvedRef(current.to_string()))?;
        match &schema.form {
            SchemaForm::Ref(next) => {
                if seen.contains(&next.as_str()) || next == name {
                    return Err(SchemaError::CyclicRef(name.to_string()));
                }
                seen.push(current);
                current = next;
            }
            _ => return Ok(schema),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::schema::Property;

    fn validator(schema: Schema) -> Validator {
        Validator::new(schema).unwrap()
    }

    // =========================================================================
    // Rejection
    // =========================================================================

    #[test]
    fn test_every_scalar_rejects_null_at_type() {
        for scalar in crate::schema::ScalarType::ALL {
            let v = validator(Schema::scalar(scalar));
            assert!(!v.validate(&Value::Null), "{scalar} accepted null");
            let errors = v.errors(&Value::Null);
            assert_eq!(errors.len(), 1, "{scalar}");
            assert_eq!(errors[0].schema_path, "/type");
            assert_eq!(errors[0].instance_path, "");
        }
    }

    #[test]
    fn test_nullable_scalar_accepts_null_only() {
        for scalar in crate::schema::ScalarType::ALL {
            let v = validator(Schema::scalar(scalar).nullable());
            assert!(v.validate(&Value::Null));
            assert!(v.errors(&Value::Null).is_empty());

            let wrong = if scalar == crate::schema::ScalarType::Boolean {
                Value::from("nope")
            } else {
                Value::Bool(true)
            };
            let errors = v.errors(&wrong);
            assert_eq!(errors.len(), 1, "{scalar}");
            assert_eq!(errors[0].schema_path, "/type");
        }
    }

    // =========================================================================
    // Objects
    // =========================================================================

    fn user() -> Schema {
        Schema::object([
            ("id", Schema::string().into()),
            ("date", Schema::timestamp().into()),
            ("role", Schema::enumeration(["STANDARD", "ADMIN"]).into()),
        ])
    }

    #[test]
    fn test_object_diagnostic_paths() {
        let input = Value::object([
            ("id", Value::from("1")),
            ("date", Value::Bool(false)),
            ("role", Value::from("BLAH")),
        ]);
        let errors = validator(user()).errors(&input);
        let paths: Vec<_> = errors
            .iter()
            .map(|d| (d.instance_path.as_str(), d.schema_path.as_str()))
            .collect();
        assert_eq!(
            paths,
            vec![
                ("/date", "/properties/date/type"),
                ("/role", "/properties/role/enum"),
            ]
        );
    }

    #[test]
    fn test_missing_required_property() {
        let input = Value::object([("id", Value::from("1"))]);
        let errors = validator(user()).errors(&input);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].instance_path, "/date");
        assert_eq!(errors[0].schema_path, "/properties/date");
    }

    #[test]
    fn test_strict_mode() {
        let schema = Schema::object([("a", Schema::string().into())]);
        let input = Value::object([
            ("a", Value::from("x")),
            ("b", Value::Int(1)),
            ("c", Value::Int(2)),
        ]);
        assert!(validator(schema.clone()).validate(&input));

        let errors = validator(schema.strict()).errors(&input);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|d| d.schema_path == "/strict"));
        assert_eq!(errors[0].instance_path, "/b");
        assert_eq!(errors[1].instance_path, "/c");
    }

    #[test]
    fn test_non_object_input() {
        let errors = validator(user()).errors(&Value::Int(1));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].schema_path, "/properties");

        let all_optional = Schema::object([("a", Schema::string().optional())]);
        let errors = validator(all_optional).errors(&Value::Int(1));
        assert_eq!(errors[0].schema_path, "/optionalProperties");
    }

    // =========================================================================
    // Discriminators
    // =========================================================================

    fn shape() -> Schema {
        Schema::discriminator(
            "type",
            [
                (
                    "CIRCLE",
                    Schema::object([("radius", Schema::float64().into())]),
                ),
                (
                    "RECTANGLE",
                    Schema::object([
                        ("width", Schema::float64().into()),
                        ("height", Schema::float64().into()),
                    ]),
                ),
            ],
        )
    }

    #[test]
    fn test_unknown_discriminator_value() {
        let input = Value::object([("type", Value::from("TRIANGLE"))]);
        let errors = validator(shape()).errors(&input);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, "/type");
        assert_eq!(errors[0].schema_path, "/discriminator");
    }

    #[test]
    fn test_discriminator_variant_paths() {
        let input = Value::object([("type", Value::from("RECTANGLE")), ("width", 1.0.into())]);
        let errors = validator(shape()).errors(&input);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, "/height");
        assert_eq!(errors[0].schema_path, "/mapping/RECTANGLE/properties/height");
    }

    #[test]
    fn test_strict_variant_ignores_tag() {
        let schema = Schema::discriminator(
            "type",
            [("A", Schema::object([("a", Schema::string().into())]).strict())],
        );
        let input = Value::object([("type", Value::from("A")), ("a", Value::from("x"))]);
        assert!(validator(schema).validate(&input));
    }

    // =========================================================================
    // Malformed schemas
    // =========================================================================

    #[test]
    fn test_rejects_non_object_mapping() {
        let schema = Schema::discriminator("type", [("A", Schema::string())]);
        assert_eq!(
            Validator::new(schema).unwrap_err(),
            SchemaError::InvalidMapping { tag: "A".into() }
        );
    }

    #[test]
    fn test_rejects_nullable_mapping() {
        let schema = Schema::discriminator(
            "type",
            [("A", Schema::object(Vec::<(String, Property)>::new()).nullable())],
        );
        assert!(matches!(
            Validator::new(schema),
            Err(SchemaError::NullableMapping { .. })
        ));
    }

    #[test]
    fn test_rejects_unresolved_ref() {
        assert_eq!(
            Validator::new(Schema::reference("Missing")).unwrap_err(),
            SchemaError::UnresolvedRef("Missing".into())
        );
    }

    #[test]
    fn test_rejects_ref_cycle() {
        let definitions: Definitions = [
            ("A".to_string(), Schema::reference("B")),
            ("B".to_string(), Schema::reference("A")),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            Validator::with_definitions(Schema::reference("A"), &definitions),
            Err(SchemaError::CyclicRef(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_enum_variant() {
        assert_eq!(
            Validator::new(Schema::enumeration(["A", "A"])).unwrap_err(),
            SchemaError::DuplicateEnumVariant("A".into())
        );
    }

    // =========================================================================
    // Recursion
    // =========================================================================

    #[test]
    fn test_recursive_errors_use_definition_paths() {
        let mut registry = TypeRegistry::new();
        let tree = registry
            .recursive("Tree", |node| {
                Schema::object([
                    ("left", node.clone().nullable().into()),
                    ("right", node.nullable().into()),
                    ("value", Schema::int8().into()),
                ])
            })
            .unwrap();
        let v = registry.finish().unwrap().validator(&tree).unwrap();

        let leaf = |value: Value| {
            Value::object([("left", Value::Null), ("right", Value::Null), ("value", value)])
        };
        let input = Value::object([
            ("left", leaf(Value::Int(1000))),
            ("right", Value::Null),
            ("value", Value::Int(1)),
        ]);
        let errors = v.errors(&input);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, "/left/value");
        assert_eq!(errors[0].schema_path, "/definitions/Tree/properties/value/type");
    }

    #[test]
    fn test_inline_ids_resolve_without_registry() {
        let tree = Schema::object([
            ("children", Schema::array(Schema::reference("Node")).into()),
        ])
        .with_id("Node");
        let v = validator(tree);
        let input = Value::object([(
            "children",
            Value::array([Value::object([("children", Value::array([]))])]),
        )]);
        assert!(v.validate(&input));
    }

    #[test]
    fn test_inline_id_nullability_stays_at_use_site() {
        let inner = Schema::object([("a", Schema::string().into())]).with_id("Inner");
        let schema = Schema::object([
            ("first", inner.nullable().into()),
            ("second", Schema::reference("Inner").into()),
        ]);
        let v = validator(schema);
        let c = v.compile();
        let filled = Value::object([("a", Value::from("x"))]);

        let ok = Value::object([("first", Value::Null), ("second", filled.clone())]);
        assert!(v.validate(&ok));
        assert!(c.validate(&ok));

        let null_ref = Value::object([("first", filled), ("second", Value::Null)]);
        assert!(!v.validate(&null_ref));
        assert!(!c.validate(&null_ref));
        let errors = v.errors(&null_ref);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, "/second");
    }

    // =========================================================================
    // Parse / serialize / coerce
    // =========================================================================

    #[test]
    fn test_parse_decode_error_is_distinct() {
        let err = validator(Schema::string()).parse("{not json").unwrap_err();
        assert!(matches!(err, ParseError::Decode(_)));

        let err = validator(Schema::string()).parse("1").unwrap_err();
        assert!(matches!(err, ParseError::Validation(_)));
    }

    #[test]
    fn test_uint64_max_round_trip() {
        let v = validator(Schema::uint64());
        let json = v.serialize(&Value::UInt(u64::MAX)).unwrap();
        assert_eq!(json, "\"18446744073709551615\"");
        assert_eq!(v.parse(&json).unwrap(), Value::UInt(u64::MAX));
    }

    #[test]
    fn test_coerce_query_strings() {
        let schema = Schema::object([
            ("limit", Schema::uint32().into()),
            ("active", Schema::boolean().into()),
            ("since", Schema::timestamp().optional()),
        ]);
        let input = Value::object([
            ("limit", Value::from("10")),
            ("active", Value::from("true")),
            ("since", Value::from("2024-01-01T00:00:00Z")),
        ]);
        let coerced = validator(schema.clone()).coerce(&input).unwrap();
        assert_eq!(coerced.get("limit"), Some(&Value::UInt(10)));
        assert_eq!(coerced.get("active"), Some(&Value::Bool(true)));
        assert!(matches!(coerced.get("since"), Some(Value::Timestamp(_))));

        let missing = Value::object([("limit", Value::from("10"))]);
        let err = validator(schema).coerce(&missing).unwrap_err();
        assert_eq!(err.diagnostics()[0].instance_path, "/active");
    }
}
