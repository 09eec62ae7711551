//! Wire → typed conversion behind `parse`, `parse_value` and `coerce`.
//!
//! Errors are collected rather than short-circuited, so one failed parse
//! reports every problem in the input.

use crate::error::Diagnostic;
use crate::pointer::Pointer;
use crate::registry::Definitions;
use crate::schema::{DiscriminatorSchema, PropertiesSchema, Schema, SchemaForm};
use crate::value::{Map, Value};

use super::resolve;

/// Which scalar table to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadMode {
    /// Wire rules only
    Parse,
    /// Wire rules plus the coercion table
    Coerce,
}

pub(super) struct Reader<'a> {
    table: &'a Definitions,
    mode: ReadMode,
    diagnostics: Vec<Diagnostic>,
    instance: Pointer,
    schema: Pointer,
}

impl<'a> Reader<'a> {
    pub(super) fn new(table: &'a Definitions, mode: ReadMode) -> Self {
        Self {
            table,
            mode,
            diagnostics: Vec::new(),
            instance: Pointer::new(),
            schema: Pointer::new(),
        }
    }

    pub(super) fn run(&mut self, schema: &Schema, input: &Value) -> Option<Value> {
        self.read(schema, input)
    }

    pub(super) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn fail(&mut self, segments: &[&str], message: impl Into<String>) -> Option<Value> {
        self.diagnostics.push(Diagnostic::new(
            message,
            self.instance.as_str(),
            self.schema.with(segments),
        ));
        None
    }

    fn read(&mut self, schema: &Schema, input: &Value) -> Option<Value> {
        if let Some(adapter) = schema.origin.adapter() {
            let result = match self.mode {
                ReadMode::Parse => adapter.parse(input),
                ReadMode::Coerce => adapter.coerce(input),
            };
            return match result {
                Ok(value) => Some(value),
                Err(found) => {
                    for diag in found {
                        let diag = diag.prefixed(self.instance.as_str(), self.schema.as_str());
                        self.diagnostics.push(diag);
                    }
                    None
                }
            };
        }
        if input.is_null() && schema.nullable {
            return Some(Value::Null);
        }

        match &schema.form {
            SchemaForm::Empty => Some(input.clone()),
            SchemaForm::Type(scalar) => {
                let rule = scalar.rule();
                let result = match self.mode {
                    ReadMode::Parse => rule.read(input),
                    ReadMode::Coerce => rule.coerce(input),
                };
                match result {
                    Ok(value) => Some(value),
                    Err(violation) => self.fail(&["type"], rule.message(violation)),
                }
            }
            SchemaForm::Enum(variants) => match input.as_str() {
                Some(s) if variants.iter().any(|v| v == s) => Some(input.clone()),
                _ => self.fail(
                    &["enum"],
                    format!("Expected one of [{}]", variants.join(", ")),
                ),
            },
            SchemaForm::Elements(items) => {
                let Value::Array(values) = input else {
                    return self.fail(&["elements"], "Expected array");
                };
                let saved = self.schema.push("elements");
                let mut out = Some(Vec::with_capacity(values.len()));
                for (index, item) in values.iter().enumerate() {
                    let at = self.instance.push_index(index);
                    let parsed = self.read(items, item);
                    self.instance.truncate(at);
                    match (parsed, out.as_mut()) {
                        (Some(value), Some(out)) => out.push(value),
                        _ => out = None,
                    }
                }
                self.schema.truncate(saved);
                out.map(Value::Array)
            }
            SchemaForm::Values(inner) => {
                let Value::Object(map) = input else {
                    return self.fail(&["values"], "Expected object");
                };
                let saved = self.schema.push("values");
                let mut out = Some(Map::with_capacity(map.len()));
                for (key, item) in map {
                    let at = self.instance.push(key);
                    let parsed = self.read(inner, item);
                    self.instance.truncate(at);
                    match (parsed, out.as_mut()) {
                        (Some(value), Some(out)) => {
                            out.insert(key.clone(), value);
                        }
                        _ => out = None,
                    }
                }
                self.schema.truncate(saved);
                out.map(Value::Object)
            }
            SchemaForm::Properties(props) => match input {
                Value::Object(map) => {
                    let mut out = Map::with_capacity(props.len());
                    self.read_properties(props, map, None, &mut out)
                        .then_some(Value::Object(out))
                }
                _ => {
                    let keyword = if props.required.is_empty() && !props.optional.is_empty() {
                        "optionalProperties"
                    } else {
                        "properties"
                    };
                    self.fail(&[keyword], "Expected object")
                }
            },
            SchemaForm::Discriminator(disc) => self.read_discriminator(disc, input),
            SchemaForm::Ref(name) => match resolve(self.table, name) {
                Ok(target) => {
                    let saved = self
                        .schema
                        .replace(Pointer::from_segments(&["definitions", name.as_str()]));
                    let parsed = self.read(target, input);
                    self.schema.replace(saved);
                    parsed
                }
                Err(err) => self.fail(&["ref"], err.to_string()),
            },
        }
    }

    /// Read declared keys into `out`. Undeclared keys are dropped, or
    /// reported when the object is strict. Returns whether all succeeded.
    fn read_properties(
        &mut self,
        props: &PropertiesSchema,
        map: &Map,
        tag: Option<&str>,
        out: &mut Map,
    ) -> bool {
        let mut ok = true;

        for (key, schema) in &props.required {
            let saved = self.schema.push("properties");
            self.schema.push(key);
            let at = self.instance.push(key);
            match map.get(key) {
                Some(item) => match self.read(schema, item) {
                    Some(value) => {
                        out.insert(key.clone(), value);
                    }
                    None => ok = false,
                },
                None => {
                    self.fail(&[], format!("Missing required property '{}'", key));
                    ok = false;
                }
            }
            self.instance.truncate(at);
            self.schema.truncate(saved);
        }

        for (key, schema) in &props.optional {
            let Some(item) = map.get(key) else {
                continue;
            };
            let saved = self.schema.push("optionalProperties");
            self.schema.push(key);
            let at = self.instance.push(key);
            match self.read(schema, item) {
                Some(value) => {
                    out.insert(key.clone(), value);
                }
                None => ok = false,
            }
            self.instance.truncate(at);
            self.schema.truncate(saved);
        }

        if props.strict {
            for key in map.keys() {
                if props.declares(key) || tag == Some(key.as_str()) {
                    continue;
                }
                let at = self.instance.push(key);
                self.fail(&["strict"], format!("Unknown property '{}'", key));
                self.instance.truncate(at);
                ok = false;
            }
        }

        ok
    }

    fn read_discriminator(&mut self, disc: &DiscriminatorSchema, input: &Value) -> Option<Value> {
        let Value::Object(map) = input else {
            return self.fail(&["discriminator"], "Expected object");
        };

        let at = self.instance.push(&disc.tag);
        let variant = match map.get(&disc.tag) {
            None => Err(format!("Missing discriminator field '{}'", disc.tag)),
            Some(Value::String(tag)) => disc
                .mapping
                .get_key_value(tag)
                .ok_or_else(|| format!("Unknown discriminator value '{}'", tag)),
            Some(_) => Err(format!("Discriminator field '{}' must be a string", disc.tag)),
        };
        let (tag, schema) = match variant {
            Ok(found) => found,
            Err(message) => {
                self.fail(&["discriminator"], message);
                self.instance.truncate(at);
                return None;
            }
        };
        self.instance.truncate(at);

        let Some(props) = schema.as_properties() else {
            return self.fail(&["mapping", tag.as_str()], "Mapping entry is not an object schema");
        };
        let mut out = Map::with_capacity(props.len() + 1);
        out.insert(disc.tag.clone(), Value::String(tag.clone()));
        let saved = self.schema.push("mapping");
        self.schema.push(tag);
        let ok = self.read_properties(props, map, Some(&disc.tag), &mut out);
        self.schema.truncate(saved);
        ok.then_some(Value::Object(out))
    }
}
