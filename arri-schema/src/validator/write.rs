//! Typed → canonical JSON behind `serialize`.

use crate::error::Diagnostic;
use crate::pointer::Pointer;
use crate::registry::Definitions;
use crate::schema::{PropertiesSchema, Schema, SchemaForm};
use crate::value::{Map, Value};
use crate::wire::{format_timestamp, write_float, write_json_string};

use super::resolve;

pub(super) struct Writer<'a> {
    table: &'a Definitions,
    out: String,
    instance: Pointer,
    schema: Pointer,
}

type WriteResult = Result<(), Diagnostic>;

impl<'a> Writer<'a> {
    pub(super) fn new(table: &'a Definitions) -> Self {
        Self {
            table,
            out: String::new(),
            instance: Pointer::new(),
            schema: Pointer::new(),
        }
    }

    pub(super) fn run(mut self, schema: &Schema, value: &Value) -> Result<String, Diagnostic> {
        self.write(schema, value)?;
        Ok(self.out)
    }

    fn fail(&self, segments: &[&str], message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(message, self.instance.as_str(), self.schema.with(segments))
    }

    fn write(&mut self, schema: &Schema, value: &Value) -> WriteResult {
        if let Some(adapter) = schema.origin.adapter() {
            let json = adapter
                .serialize(value)
                .map_err(|diag| diag.prefixed(self.instance.as_str(), self.schema.as_str()))?;
            self.out.push_str(&json);
            return Ok(());
        }
        if value.is_null() && schema.nullable {
            self.out.push_str("null");
            return Ok(());
        }

        match &schema.form {
            SchemaForm::Empty => {
                write_any(value, &mut self.out);
                Ok(())
            }
            SchemaForm::Type(scalar) => {
                let rule = scalar.rule();
                rule.write(value, &mut self.out)
                    .map_err(|violation| self.fail(&["type"], rule.message(violation)))
            }
            SchemaForm::Enum(variants) => match value.as_str() {
                Some(s) if variants.iter().any(|v| v == s) => {
                    write_json_string(s, &mut self.out);
                    Ok(())
                }
                _ => Err(self.fail(
                    &["enum"],
                    format!("Expected one of [{}]", variants.join(", ")),
                )),
            },
            SchemaForm::Elements(items) => {
                let Value::Array(values) = value else {
                    return Err(self.fail(&["elements"], "Expected array"));
                };
                let saved = self.schema.push("elements");
                self.out.push('[');
                for (index, item) in values.iter().enumerate() {
                    if index > 0 {
                        self.out.push(',');
                    }
                    let at = self.instance.push_index(index);
                    self.write(items, item)?;
                    self.instance.truncate(at);
                }
                self.out.push(']');
                self.schema.truncate(saved);
                Ok(())
            }
            SchemaForm::Values(inner) => {
                let Value::Object(map) = value else {
                    return Err(self.fail(&["values"], "Expected object"));
                };
                let saved = self.schema.push("values");
                self.out.push('{');
                for (index, (key, item)) in map.iter().enumerate() {
                    if index > 0 {
                        self.out.push(',');
                    }
                    write_json_string(key, &mut self.out);
                    self.out.push(':');
                    let at = self.instance.push(key);
                    self.write(inner, item)?;
                    self.instance.truncate(at);
                }
                self.out.push('}');
                self.schema.truncate(saved);
                Ok(())
            }
            SchemaForm::Properties(props) => {
                let Value::Object(map) = value else {
                    return Err(self.fail(&["properties"], "Expected object"));
                };
                self.out.push('{');
                self.write_properties(props, map, false)?;
                self.out.push('}');
                Ok(())
            }
            SchemaForm::Discriminator(disc) => {
                let Value::Object(map) = value else {
                    return Err(self.fail(&["discriminator"], "Expected object"));
                };
                let at = self.instance.push(&disc.tag);
                let (tag, variant) = match map.get(&disc.tag) {
                    Some(Value::String(tag)) => match disc.mapping.get_key_value(tag) {
                        Some(found) => found,
                        None => {
                            return Err(self.fail(
                                &["discriminator"],
                                format!("Unknown discriminator value '{}'", tag),
                            ))
                        }
                    },
                    _ => {
                        return Err(self.fail(
                            &["discriminator"],
                            format!("Missing discriminator field '{}'", disc.tag),
                        ))
                    }
                };
                self.instance.truncate(at);
                let Some(props) = variant.as_properties() else {
                    return Err(self.fail(
                        &["mapping", tag.as_str()],
                        "Mapping entry is not an object schema",
                    ));
                };

                self.out.push('{');
                write_json_string(&disc.tag, &mut self.out);
                self.out.push(':');
                write_json_string(tag, &mut self.out);
                let saved = self.schema.push("mapping");
                self.schema.push(tag);
                self.write_properties(props, map, true)?;
                self.schema.truncate(saved);
                self.out.push('}');
                Ok(())
            }
            SchemaForm::Ref(name) => {
                let target = resolve(self.table, name)
                    .map_err(|err| self.fail(&["ref"], err.to_string()))?;
                let saved = self
                    .schema
                    .replace(Pointer::from_segments(&["definitions", name.as_str()]));
                self.write(target, value)?;
                self.schema.replace(saved);
                Ok(())
            }
        }
    }

    /// Declared keys only, required first, in declaration order. Absent
    /// optional keys are omitted.
    fn write_properties(
        &mut self,
        props: &PropertiesSchema,
        map: &Map,
        mut comma: bool,
    ) -> WriteResult {
        for (key, schema, optional) in props.iter() {
            let item = match map.get(key) {
                Some(item) => item,
                None if optional => continue,
                None => {
                    let saved = self.schema.push("properties");
                    self.schema.push(key);
                    let at = self.instance.push(key);
                    let err = self.fail(&[], format!("Missing required property '{}'", key));
                    self.instance.truncate(at);
                    self.schema.truncate(saved);
                    return Err(err);
                }
            };
            if comma {
                self.out.push(',');
            }
            comma = true;
            write_json_string(key, &mut self.out);
            self.out.push(':');

            let keyword = if optional { "optionalProperties" } else { "properties" };
            let saved = self.schema.push(keyword);
            self.schema.push(key);
            let at = self.instance.push(key);
            self.write(schema, item)?;
            self.instance.truncate(at);
            self.schema.truncate(saved);
        }
        Ok(())
    }
}

/// JSON for a value under the empty schema.
pub(crate) fn write_any(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::UInt(n) => out.push_str(&n.to_string()),
        Value::Float(f) => write_float(*f, out),
        Value::String(s) => write_json_string(s, out),
        Value::Timestamp(t) => write_json_string(&format_timestamp(t), out),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_any(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (index, (key, item)) in map.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_any(item, out);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn write(schema: &Schema, value: &Value) -> Result<String, Diagnostic> {
        Writer::new(&Definitions::new()).run(schema, value)
    }

    #[test]
    fn test_properties_drop_undeclared_keys() {
        let schema = Schema::object([
            ("id", Schema::string().into()),
            ("note", Schema::string().optional()),
        ]);
        let value = Value::object([("extra", Value::Int(1)), ("id", Value::from("a"))]);
        assert_eq!(write(&schema, &value).unwrap(), r#"{"id":"a"}"#);
    }

    #[test]
    fn test_missing_required_key_fails() {
        let schema = Schema::object([("id", Schema::string().into())]);
        let err = write(&schema, &Value::object(Vec::<(&str, Value)>::new())).unwrap_err();
        assert_eq!(err.instance_path, "/id");
        assert_eq!(err.schema_path, "/properties/id");
    }

    #[test]
    fn test_discriminator_writes_tag_first() {
        let schema = Schema::discriminator(
            "kind",
            [("A", Schema::object([("x", Schema::int64().into())]))],
        );
        let value = Value::object([("x", Value::Int(5)), ("kind", Value::from("A"))]);
        assert_eq!(write(&schema, &value).unwrap(), r#"{"kind":"A","x":"5"}"#);
    }

    #[test]
    fn test_any_writes_timestamps_and_non_finite_floats() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let value = Value::array([Value::Timestamp(t), Value::Float(f64::NAN)]);
        assert_eq!(
            write(&Schema::any(), &value).unwrap(),
            r#"["2024-01-01T00:00:00Z","NaN"]"#
        );
    }

    #[test]
    fn test_nested_error_path() {
        let schema = Schema::array(Schema::object([("n", Schema::uint8().into())]));
        let value = Value::array([Value::object([("n", Value::Int(300))])]);
        let err = write(&schema, &value).unwrap_err();
        assert_eq!(err.instance_path, "/0/n");
        assert_eq!(err.schema_path, "/elements/properties/n/type");
    }
}
