//! Typed structural checks behind `validate` and `errors`.

use crate::error::Diagnostic;
use crate::pointer::Pointer;
use crate::registry::Definitions;
use crate::schema::{DiscriminatorSchema, PropertiesSchema, Schema, SchemaForm};
use crate::value::{Map, Value};

use super::resolve;

pub(super) struct Checker<'a> {
    table: &'a Definitions,
    collect: bool,
    diagnostics: Vec<Diagnostic>,
    instance: Pointer,
    schema: Pointer,
}

impl<'a> Checker<'a> {
    /// `collect` selects `errors` semantics; otherwise the first mismatch stops the walk.
    pub(super) fn new(table: &'a Definitions, collect: bool) -> Self {
        Self {
            table,
            collect,
            diagnostics: Vec::new(),
            instance: Pointer::new(),
            schema: Pointer::new(),
        }
    }

    pub(super) fn run(&mut self, schema: &Schema, value: &Value) -> bool {
        self.check(schema, value)
    }

    pub(super) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn fail(&mut self, segments: &[&str], message: impl Into<String>) -> bool {
        if self.collect {
            self.diagnostics.push(Diagnostic::new(
                message,
                self.instance.as_str(),
                self.schema.with(segments),
            ));
        }
        false
    }

    fn check(&mut self, schema: &Schema, value: &Value) -> bool {
        if let Some(adapter) = schema.origin.adapter() {
            if !self.collect {
                return adapter.validate(value);
            }
            let found = adapter.errors(value);
            let ok = found.is_empty();
            for diag in found {
                let diag = diag.prefixed(self.instance.as_str(), self.schema.as_str());
                self.diagnostics.push(diag);
            }
            return ok;
        }
        if value.is_null() && schema.nullable {
            return true;
        }

        match &schema.form {
            SchemaForm::Empty => true,
            SchemaForm::Type(scalar) => {
                let rule = scalar.rule();
                if rule.accepts(value) {
                    return true;
                }
                self.fail(&["type"], rule.message(rule.rejection(value)))
            }
            SchemaForm::Enum(variants) => match value.as_str() {
                Some(s) if variants.iter().any(|v| v == s) => true,
                _ => self.fail(
                    &["enum"],
                    format!("Expected one of [{}]", variants.join(", ")),
                ),
            },
            SchemaForm::Elements(items) => match value {
                Value::Array(values) => {
                    let saved = self.schema.push("elements");
                    let mut ok = true;
                    for (index, item) in values.iter().enumerate() {
                        let at = self.instance.push_index(index);
                        ok &= self.check(items, item);
                        self.instance.truncate(at);
                        if !ok && !self.collect {
                            break;
                        }
                    }
                    self.schema.truncate(saved);
                    ok
                }
                _ => self.fail(&["elements"], "Expected array"),
            },
            SchemaForm::Values(inner) => match value {
                Value::Object(map) => {
                    let saved = self.schema.push("values");
                    let mut ok = true;
                    for (key, item) in map {
                        let at = self.instance.push(key);
                        ok &= self.check(inner, item);
                        self.instance.truncate(at);
                        if !ok && !self.collect {
                            break;
                        }
                    }
                    self.schema.truncate(saved);
                    ok
                }
                _ => self.fail(&["values"], "Expected object"),
            },
            SchemaForm::Properties(props) => match value {
                Value::Object(map) => self.check_properties(props, map, None),
                _ => {
                    let keyword = if props.required.is_empty() && !props.optional.is_empty() {
                        "optionalProperties"
                    } else {
                        "properties"
                    };
                    self.fail(&[keyword], "Expected object")
                }
            },
            SchemaForm::Discriminator(disc) => self.check_discriminator(disc, value),
            SchemaForm::Ref(name) => match resolve(self.table, name) {
                Ok(target) => {
                    let saved = self
                        .schema
                        .replace(Pointer::from_segments(&["definitions", name.as_str()]));
                    let ok = self.check(target, value);
                    self.schema.replace(saved);
                    ok
                }
                Err(err) => self.fail(&["ref"], err.to_string()),
            },
        }
    }

    fn check_properties(
        &mut self,
        props: &PropertiesSchema,
        map: &Map,
        tag: Option<&str>,
    ) -> bool {
        let mut ok = true;

        for (key, schema) in &props.required {
            let saved = self.schema.push("properties");
            self.schema.push(key);
            match map.get(key) {
                Some(item) => {
                    let at = self.instance.push(key);
                    ok &= self.check(schema, item);
                    self.instance.truncate(at);
                }
                None => {
                    let at = self.instance.push(key);
                    ok = self.fail(&[], format!("Missing required property '{}'", key)) && ok;
                    self.instance.truncate(at);
                }
            }
            self.schema.truncate(saved);
            if !ok && !self.collect {
                return false;
            }
        }

        for (key, schema) in &props.optional {
            if let Some(item) = map.get(key) {
                let saved = self.schema.push("optionalProperties");
                self.schema.push(key);
                let at = self.instance.push(key);
                ok &= self.check(schema, item);
                self.instance.truncate(at);
                self.schema.truncate(saved);
                if !ok && !self.collect {
                    return false;
                }
            }
        }

        if props.strict {
            for key in map.keys() {
                if props.declares(key) || tag == Some(key.as_str()) {
                    continue;
                }
                let at = self.instance.push(key);
                ok = self.fail(&["strict"], format!("Unknown property '{}'", key)) && ok;
                self.instance.truncate(at);
                if !self.collect {
                    return false;
                }
            }
        }

        ok
    }

    fn check_discriminator(&mut self, disc: &DiscriminatorSchema, value: &Value) -> bool {
        let Value::Object(map) = value else {
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
            Ok(found) => {
                self.instance.truncate(at);
                found
            }
            Err(message) => {
                let ok = self.fail(&["discriminator"], message);
                self.instance.truncate(at);
                return ok;
            }
        };

        let Some(props) = schema.as_properties() else {
            return self.fail(&["mapping", tag.as_str()], "Mapping entry is not an object schema");
        };
        let saved = self.schema.push("mapping");
        self.schema.push(tag);
        let ok = self.check_properties(props, map, Some(&disc.tag));
        self.schema.truncate(saved);
        ok
    }
}
