//! End-to-end tests for the validation engine.
//!
//! These exercise the public API only: schemas built with the builder,
//! sent through JSON encoding, recursive registries and both validation
//! paths.

use arri_schema::{Metadata, Schema, TypeRegistry, Validator, Value};

fn leaf(value: i32) -> Value {
    Value::object([
        ("left", Value::Null),
        ("right", Value::Null),
        ("value", Value::from(value)),
    ])
}

fn tree_body(node: Schema) -> Schema {
    Schema::object([
        ("left", node.clone().nullable().into()),
        ("right", node.nullable().into()),
        ("value", Schema::int32().into()),
    ])
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_integer_boundaries_round_trip() {
    let cases = [
        (Schema::int8(), Value::Int(-128)),
        (Schema::int8(), Value::Int(127)),
        (Schema::uint8(), Value::UInt(255)),
        (Schema::int16(), Value::Int(-32768)),
        (Schema::uint16(), Value::UInt(65535)),
        (Schema::int32(), Value::Int(i32::MIN as i64)),
        (Schema::uint32(), Value::UInt(u32::MAX as u64)),
        (Schema::int64(), Value::Int(i64::MIN)),
        (Schema::int64(), Value::Int(i64::MAX)),
        (Schema::uint64(), Value::UInt(0)),
        (Schema::uint64(), Value::UInt(u64::MAX)),
    ];
    for (schema, value) in cases {
        let validator = Validator::new(schema).unwrap();
        let json = validator.serialize(&value).unwrap();
        assert_eq!(validator.parse(&json).unwrap(), value, "{json}");
    }
}

#[test]
fn test_uint64_max_exact_text() {
    let validator = Validator::new(Schema::object([("n", Schema::uint64().into())])).unwrap();
    let value = Value::object([("n", Value::UInt(u64::MAX))]);
    let json = validator.serialize(&value).unwrap();
    assert_eq!(json, r#"{"n":"18446744073709551615"}"#);
    assert_eq!(validator.parse(&json).unwrap(), value);
    assert_eq!(validator.compile().parse_unchecked(&json).unwrap(), value);
}

#[test]
fn test_every_form_round_trips() {
    let schema = Schema::object([
        ("any", Schema::any().into()),
        ("flag", Schema::boolean().into()),
        ("role", Schema::enumeration(["ADMIN", "USER"]).into()),
        ("scores", Schema::array(Schema::float64()).into()),
        ("counts", Schema::record(Schema::int64()).into()),
        (
            "shape",
            Schema::discriminator(
                "kind",
                [
                    ("CIRCLE", Schema::object([("r", Schema::float32().into())])),
                    ("EMPTY", Schema::object(Vec::<(String, arri_schema::Property)>::new())),
                ],
            )
            .into(),
        ),
        ("createdAt", Schema::timestamp().into()),
        ("deletedAt", Schema::timestamp().nullable().optional()),
    ]);
    let validator = Validator::new(schema).unwrap();

    let json = r#"{"any":{"nested":[1,"two",null]},"flag":true,"role":"ADMIN","scores":[1.5,-2],"counts":{"a":"9007199254740993"},"shape":{"kind":"CIRCLE","r":0.5},"createdAt":"2024-03-01T12:30:00.250Z"}"#;
    let value = validator.parse(json).unwrap();
    assert_eq!(
        value.get("counts").and_then(|c| c.get("a")),
        Some(&Value::Int(9_007_199_254_740_993))
    );
    assert_eq!(validator.serialize(&value).unwrap(), json);
    assert_eq!(validator.parse(&validator.serialize(&value).unwrap()).unwrap(), value);
}

// =============================================================================
// Schema Encoding Tests
// =============================================================================

#[test]
fn test_schema_json_round_trip_validates_identically() {
    let schema = Schema::object([
        ("id", Schema::string().into()),
        ("tags", Schema::array(Schema::string()).optional()),
    ])
    .strict()
    .with_id("Post");
    let decoded = Schema::from_json(&schema.to_json()).unwrap();
    assert_eq!(decoded, schema);

    let input = Value::object([("id", Value::from("1")), ("extra", Value::Bool(true))]);
    let a = Validator::new(schema).unwrap().errors(&input);
    let b = Validator::new(decoded).unwrap().errors(&input);
    assert_eq!(a, b);
    assert_eq!(a.len(), 1);
}

// =============================================================================
// Recursive Schema Tests
// =============================================================================

#[test]
fn test_recursive_call_forms_behave_identically() {
    let mut explicit = TypeRegistry::new();
    let a = explicit.recursive("BinaryTree", tree_body).unwrap();
    let a = explicit.finish().unwrap().validator(&a).unwrap();

    let mut implicit = TypeRegistry::new();
    let b = implicit
        .recursive_with(Metadata::with_id("BinaryTree"), tree_body)
        .unwrap();
    let b = implicit.finish().unwrap().validator(&b).unwrap();

    assert_eq!(a.schema().to_json(), b.schema().to_json());

    let tree = Value::object([
        ("left", leaf(1)),
        ("right", Value::object([("left", leaf(2)), ("right", Value::Null), ("value", Value::Int(3))])),
        ("value", Value::Int(4)),
    ]);
    assert!(a.validate(&tree));
    assert!(b.validate(&tree));
    assert_eq!(a.serialize(&tree).unwrap(), b.serialize(&tree).unwrap());

    let bad = Value::object([("left", leaf(1)), ("right", Value::Int(5)), ("value", Value::Int(4))]);
    assert_eq!(a.errors(&bad), b.errors(&bad));
    assert_eq!(a.errors(&bad)[0].instance_path, "/right");
}

#[test]
fn test_deep_recursion_parses() {
    let mut registry = TypeRegistry::new();
    let list = registry
        .recursive("LinkedList", |node| {
            Schema::object([
                ("value", Schema::uint8().into()),
                ("next", node.nullable().into()),
            ])
        })
        .unwrap();
    let validator = registry.finish().unwrap().validator(&list).unwrap();

    let mut value = Value::Null;
    for n in 0..50u8 {
        value = Value::object([("value", Value::UInt(n as u64)), ("next", value)]);
    }
    let json = validator.serialize(&value).unwrap();
    assert_eq!(validator.parse(&json).unwrap(), value);
}

// =============================================================================
// Coercion Tests
// =============================================================================

#[test]
fn test_coerce_never_invents_required_fields() {
    let validator = Validator::new(Schema::object([
        ("page", Schema::uint16().into()),
        ("q", Schema::string().into()),
    ]))
    .unwrap();
    let err = validator
        .coerce(&Value::object([("page", Value::from("2"))]))
        .unwrap_err();
    assert_eq!(err.diagnostics().len(), 1);
    assert_eq!(err.diagnostics()[0].instance_path, "/q");
}
