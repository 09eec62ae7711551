//! The boundary to third-party validators.
//!
//! A [`SchemaAdapter`] supplies runtime behavior for a schema node that the
//! native engine does not own. [`adapt`] pairs an adapter with a best-effort
//! structural conversion of the validator's JSON Schema, so that code
//! generators can still see the shape.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use arri_schema::adapter::{adapt, FnAdapter};
//! use arri_schema::{Diagnostic, Validator, Value};
//!
//! let adapter = FnAdapter::new("even", |input: &Value| match input.as_i128() {
//!     Some(n) if n % 2 == 0 => Ok(input.clone()),
//!     _ => Err(vec![Diagnostic::new("Expected an even number", "", "")]),
//! });
//! let imported = adapt(Arc::new(adapter), &serde_json::json!({"type": "integer"}));
//! let validator = Validator::new(imported.schema).unwrap();
//! assert!(validator.validate(&Value::Int(4)));
//! assert!(!validator.validate(&Value::Int(3)));
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as Json};
use tracing::{debug, warn};

use crate::error::Diagnostic;
use crate::registry::Definitions;
use crate::schema::{
    DiscriminatorSchema, Metadata, PropertiesSchema, Schema, SchemaForm, SchemaMap, SchemaOrigin,
};
use crate::validator::write_any;
use crate::value::Value;

/// Runtime behavior supplied by an external validator.
///
/// Diagnostics returned by an adapter are relative to the adapted node; the
/// engine prefixes them with the node's position.
pub trait SchemaAdapter: Send + Sync + fmt::Debug {
    /// Name of the validator library, for logs and debugging.
    fn vendor(&self) -> &str;

    fn validate(&self, value: &Value) -> bool;

    fn parse(&self, input: &Value) -> Result<Value, Vec<Diagnostic>>;

    fn serialize(&self, value: &Value) -> Result<String, Diagnostic>;

    /// Loose-input parse. Defaults to [`parse`](Self::parse).
    fn coerce(&self, input: &Value) -> Result<Value, Vec<Diagnostic>> {
        self.parse(input)
    }

    /// Every diagnostic for `value`. Defaults to the diagnostics of `parse`.
    fn errors(&self, value: &Value) -> Vec<Diagnostic> {
        self.parse(value).err().unwrap_or_default()
    }
}

type ParseFn = dyn Fn(&Value) -> Result<Value, Vec<Diagnostic>> + Send + Sync;
type SerializeFn = dyn Fn(&Value) -> Result<String, Diagnostic> + Send + Sync;

/// A [`SchemaAdapter`] assembled from closures.
///
/// Only `parse` is required. `validate` defaults to "parse succeeds" and
/// `serialize` writes the value as plain JSON.
pub struct FnAdapter {
    vendor: String,
    parse: Box<ParseFn>,
    coerce: Option<Box<ParseFn>>,
    serialize: Option<Box<SerializeFn>>,
}

impl FnAdapter {
    pub fn new<F>(vendor: impl Into<String>, parse: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, Vec<Diagnostic>> + Send + Sync + 'static,
    {
        Self {
            vendor: vendor.into(),
            parse: Box::new(parse),
            coerce: None,
            serialize: None,
        }
    }

    pub fn with_coerce<F>(mut self, coerce: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, Vec<Diagnostic>> + Send + Sync + 'static,
    {
        self.coerce = Some(Box::new(coerce));
        self
    }

    pub fn with_serialize<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Value) -> Result<String, Diagnostic> + Send + Sync + 'static,
    {
        self.serialize = Some(Box::new(serialize));
        self
    }
}

impl fmt::Debug for FnAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAdapter")
            .field("vendor", &self.vendor)
            .finish_non_exhaustive()
    }
}

impl SchemaAdapter for FnAdapter {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn validate(&self, value: &Value) -> bool {
        (self.parse)(value).is_ok()
    }

    fn parse(&self, input: &Value) -> Result<Value, Vec<Diagnostic>> {
        (self.parse)(input)
    }

    fn serialize(&self, value: &Value) -> Result<String, Diagnostic> {
        match &self.serialize {
            Some(serialize) => serialize(value),
            None => {
                let mut out = String::new();
                write_any(value, &mut out);
                Ok(out)
            }
        }
    }

    fn coerce(&self, input: &Value) -> Result<Value, Vec<Diagnostic>> {
        match &self.coerce {
            Some(coerce) => coerce(input),
            None => (self.parse)(input),
        }
    }
}

/// A schema converted from JSON Schema, with the named definitions it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSchema {
    pub schema: Schema,
    pub definitions: Definitions,
}

/// Wrap an external validator. The returned schema is checked by `adapter`
/// at runtime; its form is the structural conversion of `json_schema`.
pub fn adapt(adapter: Arc<dyn SchemaAdapter>, json_schema: &Json) -> ImportedSchema {
    let mut imported = import_json_schema(json_schema);
    debug!(
        vendor = adapter.vendor(),
        form = imported.schema.form.name(),
        definitions = imported.definitions.len(),
        "Adapted external schema"
    );
    imported.schema.origin = SchemaOrigin::Adapted(adapter);
    imported
}

/// Best-effort structural conversion of a JSON Schema document.
///
/// Constructs with no counterpart become the empty schema and log a warning.
pub fn import_json_schema(json_schema: &Json) -> ImportedSchema {
    let converter = Converter { root: json_schema };
    let mut definitions = IndexMap::new();
    for keyword in ["definitions", "$defs"] {
        let Some(Json::Object(defs)) = json_schema.get(keyword) else {
            continue;
        };
        for (name, body) in defs {
            let mut schema = converter.convert(body, &format!("/{}/{}", keyword, name));
            schema.metadata.id = Some(name.clone());
            definitions.insert(name.clone(), schema);
        }
    }
    ImportedSchema {
        schema: converter.convert(json_schema, ""),
        definitions: Definitions::from(definitions),
    }
}

struct Converter<'a> {
    root: &'a Json,
}

impl Converter<'_> {
    fn unsupported(&self, path: &str, reason: &str) -> Schema {
        warn!(path = %path, reason, "Unsupported JSON Schema construct, falling back to any");
        Schema::any()
    }

    fn convert(&self, json: &Json, path: &str) -> Schema {
        let node = match json {
            Json::Bool(true) => return Schema::any(),
            Json::Object(node) => node,
            _ => return self.unsupported(path, "schema is not an object"),
        };

        let mut schema = self.convert_form(node, path);
        if node.get("nullable") == Some(&Json::Bool(true)) {
            schema.nullable = true;
        }
        let metadata = metadata(node);
        schema.metadata.merge_missing(&metadata);
        schema
    }

    fn convert_form(&self, node: &JsonMap<String, Json>, path: &str) -> Schema {
        if let Some(reference) = node.get("$ref") {
            return match reference.as_str().and_then(ref_name) {
                Some(name) => Schema::reference(name),
                None => self.unsupported(path, "$ref outside the local definitions"),
            };
        }
        if let Some(Json::Array(variants)) = node.get("enum") {
            return self.convert_enum(variants, path);
        }
        if let Some(Json::String(value)) = node.get("const") {
            return Schema::enumeration([value.clone()]);
        }
        if let Some(Json::Array(branches)) = node.get("oneOf").or_else(|| node.get("anyOf")) {
            return self.convert_union(node, branches, path);
        }

        let (ty, nullable) = match node.get("type") {
            None if node.contains_key("properties") => (Some("object"), false),
            None if node.contains_key("items") => (Some("array"), false),
            None => (None, false),
            Some(Json::String(ty)) => (Some(ty.as_str()), false),
            Some(Json::Array(types)) => {
                let nullable = types.iter().any(|t| t == "null");
                let rest: Vec<_> = types.iter().filter_map(Json::as_str).filter(|t| *t != "null").collect();
                match rest.as_slice() {
                    [] => (None, nullable),
                    [ty] => (Some(*ty), nullable),
                    _ => return self.unsupported(path, "multiple non-null types"),
                }
            }
            Some(_) => return self.unsupported(path, "malformed type keyword"),
        };

        let mut schema = match ty {
            None => Schema::any(),
            Some("boolean") => Schema::boolean(),
            Some("string") => match node.get("format").and_then(Json::as_str) {
                Some("date-time") => Schema::timestamp(),
                _ => Schema::string(),
            },
            Some("number") => match node.get("format").and_then(Json::as_str) {
                Some("float") | Some("float32") => Schema::float32(),
                _ => Schema::float64(),
            },
            Some("integer") => integer_schema(node.get("format").and_then(Json::as_str)),
            Some("array") => {
                let items = match node.get("items") {
                    Some(items) => self.convert(items, &format!("{}/items", path)),
                    None => Schema::any(),
                };
                Schema::array(items)
            }
            Some("object") => self.convert_object(node, path),
            Some(other) => return self.unsupported(path, &format!("type '{}'", other)),
        };
        schema.nullable = nullable;
        schema
    }

    fn convert_enum(&self, variants: &[Json], path: &str) -> Schema {
        let mut values = Vec::with_capacity(variants.len());
        let mut nullable = false;
        for variant in variants {
            match variant {
                Json::String(s) => values.push(s.clone()),
                Json::Null => nullable = true,
                _ => return self.unsupported(path, "non-string enum value"),
            }
        }
        if values.is_empty() {
            return self.unsupported(path, "empty enum");
        }
        let mut schema = Schema::enumeration(values);
        schema.nullable = nullable;
        schema
    }

    fn convert_object(&self, node: &JsonMap<String, Json>, path: &str) -> Schema {
        let additional = node.get("additionalProperties");
        let Some(Json::Object(properties)) = node.get("properties") else {
            return match additional {
                Some(values @ Json::Object(_)) => {
                    Schema::record(self.convert(values, &format!("{}/additionalProperties", path)))
                }
                _ => Schema::new(SchemaForm::Properties(PropertiesSchema::default())),
            };
        };

        let required: Vec<&str> = node
            .get("required")
            .and_then(Json::as_array)
            .map(|keys| keys.iter().filter_map(Json::as_str).collect())
            .unwrap_or_default();
        let mut props = PropertiesSchema {
            strict: additional == Some(&Json::Bool(false)),
            ..Default::default()
        };
        for (key, body) in properties {
            let schema = self.convert(body, &format!("{}/properties/{}", path, key));
            if required.contains(&key.as_str()) {
                props.required.insert(key.clone(), schema);
            } else {
                props.optional.insert(key.clone(), schema);
            }
        }
        Schema::new(SchemaForm::Properties(props))
    }

    fn convert_union(&self, node: &JsonMap<String, Json>, branches: &[Json], path: &str) -> Schema {
        let (nulls, rest): (Vec<&Json>, Vec<&Json>) =
            branches.iter().partition(|b| b.get("type") == Some(&Json::from("null")));
        if rest.len() == 1 {
            let mut schema = self.convert(rest[0], &format!("{}/oneOf/0", path));
            schema.nullable |= !nulls.is_empty();
            return schema;
        }

        let bodies: Vec<&JsonMap<String, Json>> = rest.iter().filter_map(|b| self.deref(b)).collect();
        if bodies.len() != rest.len() {
            return self.unsupported(path, "union branch is not an object");
        }
        let explicit = node
            .get("discriminator")
            .and_then(|d| d.get("propertyName"))
            .and_then(Json::as_str);
        let Some(tag) = explicit.map(str::to_string).or_else(|| common_const_key(&bodies)) else {
            return self.unsupported(path, "union without a discriminator");
        };

        let mut mapping = SchemaMap::new();
        for (index, body) in bodies.iter().enumerate() {
            let Some(value) = body
                .get("properties")
                .and_then(|p| p.get(&tag))
                .and_then(const_string)
            else {
                return self.unsupported(path, "union branch without a constant tag");
            };
            let mut variant = (*body).clone();
            if let Some(Json::Object(props)) = variant.get_mut("properties") {
                props.remove(&tag);
            }
            let branch_path = format!("{}/oneOf/{}", path, index);
            let mut schema = self.convert_object(&variant, &branch_path);
            schema.metadata = metadata(body);
            mapping.insert(value, schema);
        }
        let mut schema = Schema::new(SchemaForm::Discriminator(DiscriminatorSchema { tag, mapping }));
        schema.nullable = !nulls.is_empty();
        schema
    }

    /// The object body of a union branch, following one local `$ref`.
    fn deref<'j>(&'j self, branch: &'j Json) -> Option<&'j JsonMap<String, Json>> {
        let body = branch.as_object()?;
        let Some(reference) = body.get("$ref").and_then(Json::as_str) else {
            return Some(body);
        };
        let name = ref_name(reference)?;
        ["definitions", "$defs"]
            .iter()
            .find_map(|keyword| self.root.get(keyword)?.get(name))
            .and_then(Json::as_object)
    }
}

fn metadata(node: &JsonMap<String, Json>) -> Metadata {
    let text = |key: &str| node.get(key).and_then(Json::as_str).map(str::to_string);
    Metadata {
        id: text("$id").or_else(|| text("title")),
        description: text("description"),
        is_deprecated: node.get("deprecated") == Some(&Json::Bool(true)),
        deprecated_note: None,
    }
}

fn ref_name(reference: &str) -> Option<&str> {
    reference
        .strip_prefix("#/definitions/")
        .or_else(|| reference.strip_prefix("#/$defs/"))
}

fn integer_schema(format: Option<&str>) -> Schema {
    match format {
        Some("int8") => Schema::int8(),
        Some("uint8") => Schema::uint8(),
        Some("int16") => Schema::int16(),
        Some("uint16") => Schema::uint16(),
        Some("uint32") => Schema::uint32(),
        Some("int64") => Schema::int64(),
        Some("uint64") => Schema::uint64(),
        _ => Schema::int32(),
    }
}

fn const_string(json: &Json) -> Option<String> {
    if let Some(Json::String(value)) = json.get("const") {
        return Some(value.clone());
    }
    match json.get("enum")?.as_array()?.as_slice() {
        [Json::String(value)] => Some(value.clone()),
        _ => None,
    }
}

/// A property every branch pins to a single string.
fn common_const_key(bodies: &[&JsonMap<String, Json>]) -> Option<String> {
    let first = bodies.first()?.get("properties")?.as_object()?;
    first
        .iter()
        .filter(|(_, body)| const_string(body).is_some())
        .map(|(key, _)| key)
        .find(|key| {
            bodies.iter().all(|body| {
                body.get("properties")
                    .and_then(|p| p.get(key.as_str()))
                    .and_then(const_string)
                    .is_some()
            })
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarType;
    use crate::validator::Validator;
    use serde_json::json;

    fn import(json: Json) -> Schema {
        import_json_schema(&json).schema
    }

    #[test]
    fn test_scalars() {
        assert_eq!(import(json!({"type": "string"})).form, SchemaForm::Type(ScalarType::String));
        assert_eq!(
            import(json!({"type": "string", "format": "date-time"})).form,
            SchemaForm::Type(ScalarType::Timestamp)
        );
        assert_eq!(
            import(json!({"type": "integer", "format": "uint64"})).form,
            SchemaForm::Type(ScalarType::Uint64)
        );
        assert_eq!(import(json!({"type": "number"})).form, SchemaForm::Type(ScalarType::Float64));
    }

    #[test]
    fn test_nullable_type_array() {
        let schema = import(json!({"type": ["boolean", "null"]}));
        assert_eq!(schema.form, SchemaForm::Type(ScalarType::Boolean));
        assert!(schema.nullable);
    }

    #[test]
    fn test_object_required_and_strict() {
        let schema = import(json!({
            "type": "object",
            "title": "User",
            "properties": {
                "id": {"type": "string"},
                "bio": {"type": "string", "description": "About me"}
            },
            "required": ["id"],
            "additionalProperties": false
        }));
        let props = schema.as_properties().unwrap();
        assert!(props.strict);
        assert!(props.required.contains_key("id"));
        assert_eq!(
            props.optional["bio"].metadata.description.as_deref(),
            Some("About me")
        );
        assert_eq!(schema.id(), Some("User"));
    }

    #[test]
    fn test_record() {
        let schema = import(json!({"type": "object", "additionalProperties": {"type": "integer"}}));
        assert!(matches!(schema.form, SchemaForm::Values(_)));
    }

    #[test]
    fn test_one_of_with_const_tags() {
        let schema = import(json!({
            "oneOf": [
                {"type": "object", "properties": {"kind": {"const": "A"}, "a": {"type": "string"}}, "required": ["kind", "a"]},
                {"type": "object", "properties": {"kind": {"const": "B"}}, "required": ["kind"]}
            ]
        }));
        let SchemaForm::Discriminator(disc) = &schema.form else {
            panic!("expected discriminator, got {:?}", schema.form);
        };
        assert_eq!(disc.tag, "kind");
        assert_eq!(disc.mapping.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(!disc.mapping["A"].as_properties().unwrap().declares("kind"));
        assert!(Validator::new(schema.clone()).is_ok());
    }

    #[test]
    fn test_one_of_with_null_branch() {
        let schema = import(json!({"oneOf": [{"type": "string"}, {"type": "null"}]}));
        assert_eq!(schema.form, SchemaForm::Type(ScalarType::String));
        assert!(schema.nullable);
    }

    #[test]
    fn test_definitions_and_refs() {
        let imported = import_json_schema(&json!({
            "$ref": "#/$defs/Node",
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"oneOf": [{"$ref": "#/$defs/Node"}, {"type": "null"}]}},
                    "required": ["next"]
                }
            }
        }));
        assert_eq!(imported.schema.form, SchemaForm::Ref("Node".into()));
        let node = imported.definitions.get("Node").unwrap();
        assert_eq!(node.id(), Some("Node"));
        let validator = imported.definitions.validator(&imported.schema).unwrap();
        let value = Value::object([("next", Value::object([("next", Value::Null)]))]);
        assert!(validator.validate(&value));
    }

    #[test]
    fn test_unsupported_falls_back_to_any() {
        assert_eq!(import(json!({"type": "tuple"})).form, SchemaForm::Empty);
        assert_eq!(import(json!({"enum": [1, 2]})).form, SchemaForm::Empty);
        assert_eq!(import(json!({"$ref": "https://example.com/s.json"})).form, SchemaForm::Empty);
    }

    #[test]
    fn test_adapted_node_uses_adapter() {
        let adapter = FnAdapter::new("upper", |input: &Value| match input.as_str() {
            Some(s) if s.chars().all(|c| c.is_ascii_uppercase()) => Ok(input.clone()),
            _ => Err(vec![Diagnostic::new("Expected uppercase", "", "")]),
        });
        let inner = adapt(Arc::new(adapter), &json!({"type": "string"})).schema;
        assert!(inner.is_adapted());
        assert_eq!(format!("{:?}", inner.origin), "Adapted(\"upper\")");

        let outer = Schema::object([("code", inner.into())]);
        let validator = Validator::new(outer).unwrap();
        let errors = validator.errors(&Value::object([("code", Value::from("abc"))]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path, "/code");
        assert_eq!(errors[0].schema_path, "/properties/code");
        assert_eq!(
            validator.serialize(&Value::object([("code", Value::from("AB"))])).unwrap(),
            r#"{"code":"AB"}"#
        );
    }
}
