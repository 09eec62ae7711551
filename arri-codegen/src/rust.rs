//! Rust client generation.
//!
//! The generated module decodes through `serde_json::Value` and encodes by
//! hand, so 64-bit integers stay exact and key order follows the schema.
//! Objects are structs implementing `ArriModel`, unions are enums with one
//! tuple variant per tag value, and references to objects are boxed so
//! recursive types have a finite size.

use arri_schema::wire::WireRepr;
use arri_schema::{Metadata, ScalarType, Schema, SchemaForm};
use convert_case::{Case, Casing};

use crate::backend::{is_streaming, primary_transport, procedure_types, Backend};
use crate::context::GeneratorContext;
use crate::error::CodegenResult;
use crate::framework::{escape_string, GenerationRun, ObjectShape, TypeEmitter, UnionShape};
use crate::generated::{indented, reindent, CodeWriter, Declaration, GeneratedType};
use crate::service::{ServiceProcedure, ServiceTree};

pub static RUST_BACKEND: RustBackend = RustBackend;

#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

/// Runtime support shared by every generated type. Written with four-space
/// indentation and re-indented to the configured style.
const RUNTIME: &str = r##"use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct ArriError {
    pub message: String,
}

impl ArriError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ArriError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ArriError {}

#[derive(Clone, Debug, PartialEq)]
pub struct RpcCall {
    pub procedure: &'static str,
    pub path: &'static str,
    pub method: &'static str,
    pub transport: &'static str,
    pub body: Option<String>,
    pub query: Option<String>,
}

pub trait Transport: Send + Sync {
    fn request(
        &self,
        call: RpcCall,
    ) -> Pin<Box<dyn Future<Output = Result<String, ArriError>> + Send + '_>>;

    fn stream(
        &self,
        call: RpcCall,
        on_message: Box<dyn FnMut(String) + Send>,
    ) -> Box<dyn FnOnce() + Send>;
}

pub trait ArriModel: Sized {
    fn from_json(input: &Value) -> Result<Self, ArriError>;

    fn from_json_string(input: &str) -> Result<Self, ArriError> {
        Self::from_json(&parse_json(input)?)
    }

    fn to_json_string(&self) -> String;

    fn to_query_params_string(&self) -> String;
}

fn parse_json(input: &str) -> Result<Value, ArriError> {
    serde_json::from_str(input).map_err(|e| ArriError::new(e.to_string()))
}

fn read_f64(input: &Value) -> f64 {
    match input {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => match s.as_str() {
            "NaN" => f64::NAN,
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            other => other.parse().unwrap_or(0.0),
        },
        _ => 0.0,
    }
}

fn read_int<T: TryFrom<i64> + Default>(input: &Value) -> T {
    input
        .as_i64()
        .and_then(|n| T::try_from(n).ok())
        .unwrap_or_default()
}

fn read_big<T: std::str::FromStr + Default>(input: &Value) -> T {
    match input {
        Value::String(s) => s.parse().unwrap_or_default(),
        Value::Number(n) => n.to_string().parse().unwrap_or_default(),
        _ => T::default(),
    }
}

fn read_string(input: &Value) -> String {
    input.as_str().unwrap_or_default().to_string()
}

fn read_timestamp(input: &Value) -> DateTime<Utc> {
    input
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

fn write_f64(out: &mut String, value: f64) {
    if value.is_nan() {
        out.push_str("\"NaN\"");
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 { "\"Infinity\"" } else { "\"-Infinity\"" });
    } else {
        out.push_str(&value.to_string());
    }
}

fn write_string(out: &mut String, value: &str) {
    out.push_str(&Value::from(value).to_string());
}

fn write_timestamp(out: &mut String, value: &DateTime<Utc>) {
    out.push('"');
    out.push_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true));
    out.push('"');
}

fn encode_query(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}"##;

fn lit(text: &str) -> String {
    format!("\"{}\"", escape_string(text))
}

/// snake_case field or method name, raw when it is a keyword.
fn ident(key: &str) -> String {
    let name: String = key
        .to_case(Case::Snake)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        return "field".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{name}");
    }
    if matches!(name.as_str(), "self" | "super" | "crate") {
        return format!("{name}_");
    }
    if KEYWORDS.contains(&name.as_str()) {
        return format!("r#{name}");
    }
    name
}

fn variant_name(value: &str) -> String {
    let name: String = value
        .to_case(Case::Pascal)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("V{name}")
    } else {
        name
    }
}

fn docs(w: &mut CodeWriter, metadata: &Metadata) {
    if let Some(description) = &metadata.description {
        w.doc("/// ", description);
    }
    if metadata.is_deprecated {
        match &metadata.deprecated_note {
            Some(note) => w.line(format!("#[deprecated(note = {})]", lit(note))),
            None => w.line("#[deprecated]"),
        };
    }
}

fn skip_in_query(what: &str, key: &str) -> String {
    format!(
        "eprintln!(\"[WARNING] {what} cannot be serialized to query params. Skipping field {}.\");",
        escape_string(key)
    )
}

fn push_query(v: &str, t: &str, k: &str) -> String {
    format!("{t}.push(format!(\"{}={{}}\", {v}));", escape_string(k))
}

/// A declared struct or union used by value.
fn model(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(name)
        .reading(move |i| format!("{reader}::from_json({i})?"))
        .writing(|v, t| format!("{t}.push_str(&{v}.to_json_string());"))
        .querying(|_, _, k| skip_in_query("nested objects", k))
}

fn boxed(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(format!("Box<{name}>"))
        .reading(move |i| format!("Box::new({reader}::from_json({i})?)"))
        .writing(|v, t| format!("{t}.push_str(&{v}.to_json_string());"))
        .querying(|_, _, k| skip_in_query("nested objects", k))
}

fn enum_type(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(name)
        .reading(move |i| format!("{reader}::from_json({i})?"))
        .writing(|v, t| format!("write_string(&mut {t}, {v}.serial_value());"))
        .querying(|v, t, k| {
            format!("{t}.push(format!(\"{}={{}}\", {v}.serial_value()));", escape_string(k))
        })
}

fn integer(type_name: &'static str) -> GeneratedType {
    GeneratedType::new(type_name)
        .reading(move |i| format!("read_int::<{type_name}>({i})"))
        .writing(|v, t| format!("{t}.push_str(&{v}.to_string());"))
        .querying(push_query)
}

fn big_integer(type_name: &'static str) -> GeneratedType {
    GeneratedType::new(type_name)
        .reading(move |i| format!("read_big::<{type_name}>({i})"))
        .writing(|v, t| format!("{t}.push_str(&format!(\"\\\"{{}}\\\"\", {v}));"))
        .querying(push_query)
}

impl RustBackend {
    fn struct_declaration(
        &self,
        run: &GenerationRun,
        ctx: &GeneratorContext,
        object: &ObjectShape,
    ) -> String {
        let generate_docs = run.config().generate_docs;
        let name = &object.name;
        let mut w = CodeWriter::new(ctx.indent);

        if generate_docs {
            docs(&mut w, &object.metadata);
        }
        w.line("#[derive(Clone, Debug, PartialEq)]");
        if object.fields.is_empty() {
            w.line(format!("pub struct {name} {{}}"));
        } else {
            w.open(format!("pub struct {name} {{"));
            for field in &object.fields {
                if generate_docs {
                    docs(&mut w, &field.schema.metadata);
                }
                let ty = if field.optional {
                    format!("Option<{}>", field.generated.type_name)
                } else {
                    field.generated.type_name.clone()
                };
                w.line(format!("pub {}: {ty},", ident(&field.key)));
            }
            w.close("}");
        }
        w.blank();

        w.open(format!("impl ArriModel for {name} {{"));

        // from_json
        w.open("fn from_json(input: &Value) -> Result<Self, ArriError> {");
        for field in &object.fields {
            let field_name = ident(&field.key);
            if field.optional {
                w.open(format!("let {field_name} = match input.get({}) {{", lit(&field.key)));
                w.line(format!("Some(_raw) => Some({}),", field.generated.from_wire("_raw")));
                w.line("None => None,");
                w.close("};");
            } else {
                let source = format!("&input[{}]", lit(&field.key));
                w.line(format!("let {field_name} = {};", field.generated.from_wire(&source)));
            }
        }
        let names: Vec<String> = object.fields.iter().map(|f| ident(&f.key)).collect();
        if names.is_empty() {
            w.line("Ok(Self {})");
        } else {
            w.line(format!("Ok(Self {{ {} }})", names.join(", ")));
        }
        w.close("}");
        w.blank();

        // to_json_string
        w.open("fn to_json_string(&self) -> String {");
        w.line("let mut _output = String::from(\"{\");");
        let mut leading = false;
        if let Some((tag, value)) = &object.tag {
            w.line(format!("_output.push_str({});", lit(&format!("\"{tag}\":\"{value}\""))));
            leading = true;
        }
        for field in object.fields.iter().filter(|f| !f.optional) {
            let comma = if leading { "," } else { "" };
            w.line(format!("_output.push_str({});", lit(&format!("{comma}\"{}\":", field.key))));
            w.lines(field.generated.to_wire(&format!("self.{}", ident(&field.key)), "_output"));
            leading = true;
        }
        let dynamic_commas = !leading && object.fields.iter().any(|f| f.optional);
        if dynamic_commas {
            w.line("let mut _has_key = false;");
        }
        for field in object.fields.iter().filter(|f| f.optional) {
            let field_name = ident(&field.key);
            w.open(format!("if let Some({field_name}) = &self.{field_name} {{"));
            if dynamic_commas {
                w.open("if _has_key {");
                w.line("_output.push(',');");
                w.close("}");
                w.line(format!("_output.push_str({});", lit(&format!("\"{}\":", field.key))));
            } else {
                w.line(format!("_output.push_str({});", lit(&format!(",\"{}\":", field.key))));
            }
            w.lines(field.generated.to_wire(&field_name, "_output"));
            if dynamic_commas {
                w.line("_has_key = true;");
            }
            w.close("}");
        }
        w.line("_output.push('}');");
        w.line("_output");
        w.close("}");
        w.blank();

        // to_query_params_string
        w.open("fn to_query_params_string(&self) -> String {");
        w.line("let mut _query_parts: Vec<String> = Vec::new();");
        if let Some((tag, value)) = &object.tag {
            w.line(format!(
                "_query_parts.push({}.to_string());",
                lit(&format!("{tag}={value}"))
            ));
        }
        for field in &object.fields {
            let field_name = ident(&field.key);
            if field.optional {
                w.open(format!("if let Some({field_name}) = &self.{field_name} {{"));
                w.lines(field.generated.to_query_param(&field_name, "_query_parts", &field.key));
                w.close("}");
            } else {
                w.lines(field.generated.to_query_param(
                    &format!("self.{field_name}"),
                    "_query_parts",
                    &field.key,
                ));
            }
        }
        w.line("_query_parts.join(\"&\")");
        w.close("}");
        w.close("}");
        w.finish()
    }

    fn enum_declaration(
        &self,
        run: &GenerationRun,
        ctx: &GeneratorContext,
        schema: &Schema,
        union: &UnionShape,
    ) -> String {
        let name = &union.name;
        let mut w = CodeWriter::new(ctx.indent);
        let variants: Vec<(String, &str, &str)> = union
            .variants
            .iter()
            .filter_map(|v| {
                v.tag
                    .as_ref()
                    .map(|(_, value)| (variant_name(value), value.as_str(), v.name.as_str()))
            })
            .collect();

        if run.config().generate_docs {
            docs(&mut w, &schema.metadata);
        }
        w.line("#[derive(Clone, Debug, PartialEq)]");
        w.open(format!("pub enum {name} {{"));
        for (variant, _, type_name) in &variants {
            w.line(format!("{variant}({type_name}),"));
        }
        w.close("}");
        w.blank();

        w.open(format!("impl ArriModel for {name} {{"));
        w.open("fn from_json(input: &Value) -> Result<Self, ArriError> {");
        w.open(format!(
            "match input.get({}).and_then(|tag| tag.as_str()) {{",
            lit(&union.tag)
        ));
        for (variant, value, type_name) in &variants {
            w.line(format!(
                "Some({}) => Ok(Self::{variant}({type_name}::from_json(input)?)),",
                lit(value)
            ));
        }
        w.line(format!(
            "other => Err(ArriError::new(format!(\"Unknown {name}.{} value: {{other:?}}\"))),",
            escape_string(&union.tag)
        ));
        w.close("}");
        w.close("}");
        w.blank();

        w.open("fn to_json_string(&self) -> String {");
        w.open("match self {");
        for (variant, _, _) in &variants {
            w.line(format!("Self::{variant}(inner) => inner.to_json_string(),"));
        }
        w.close("}");
        w.close("}");
        w.blank();

        w.open("fn to_query_params_string(&self) -> String {");
        w.open("match self {");
        for (variant, _, _) in &variants {
            w.line(format!("Self::{variant}(inner) => inner.to_query_params_string(),"));
        }
        w.close("}");
        w.close("}");
        w.close("}");
        w.finish()
    }

    fn service(
        &self,
        w: &mut CodeWriter,
        run: &mut GenerationRun,
        service: &ServiceTree,
    ) -> CodegenResult<()> {
        let client_name = run.config().client_name.clone();
        let name = service.type_name(&client_name);

        w.open(format!("pub struct {name} {{"));
        w.line("transport: Arc<dyn Transport>,");
        for (segment, child) in &service.children {
            w.line(format!("pub {}: {},", ident(segment), child.type_name(&client_name)));
        }
        w.close("}");
        w.blank();

        w.open(format!("impl {name} {{"));
        w.open("pub fn new(transport: Arc<dyn Transport>) -> Self {");
        w.open("Self {");
        for (segment, child) in &service.children {
            w.line(format!(
                "{}: {}::new(transport.clone()),",
                ident(segment),
                child.type_name(&client_name)
            ));
        }
        w.line("transport,");
        w.close("}");
        w.close("}");
        for procedure in &service.procedures {
            w.blank();
            self.procedure(w, run, procedure)?;
        }
        w.close("}");
        Ok(())
    }

    fn procedure(
        &self,
        w: &mut CodeWriter,
        run: &mut GenerationRun,
        procedure: &ServiceProcedure,
    ) -> CodegenResult<()> {
        let rpc = &procedure.rpc;
        let types = procedure_types(self, run, rpc)?;
        let method = ident(&procedure.method);
        let streaming = is_streaming(rpc);

        if run.config().generate_docs {
            let metadata = Metadata {
                description: rpc.description.clone(),
                is_deprecated: rpc.is_deprecated,
                ..Default::default()
            };
            docs(w, &metadata);
        }

        // Procedure signatures take and return the declared types unboxed.
        let unbox = |t: &GeneratedType| -> (String, bool) {
            match t.type_name.strip_prefix("Box<").and_then(|s| s.strip_suffix('>')) {
                Some(inner) => (inner.to_string(), true),
                None => (t.type_name.clone(), false),
            }
        };

        let mut args = vec!["&self".to_string()];
        if let Some(params) = &types.params {
            args.push(format!("params: {}", unbox(params).0));
        }
        let response = types.response.as_ref().map(|r| {
            let (type_name, was_boxed) = unbox(r);
            let read = r.from_wire("&_input");
            let read = if was_boxed { format!("*{read}") } else { read };
            (type_name, read)
        });

        if streaming {
            let message = response.as_ref().map_or("()".to_string(), |(t, _)| t.clone());
            args.push(format!(
                "mut on_message: impl FnMut(Result<{message}, ArriError>) + Send + 'static"
            ));
            w.open(format!(
                "pub fn {method}({}) -> Box<dyn FnOnce() + Send> {{",
                args.join(", ")
            ));
        } else {
            let output = response.as_ref().map_or("()".to_string(), |(t, _)| t.clone());
            w.open(format!(
                "pub async fn {method}({}) -> Result<{output}, ArriError> {{",
                args.join(", ")
            ));
        }

        w.open("let mut call = RpcCall {");
        w.line(format!("procedure: {},", lit(&procedure.name)));
        w.line(format!("path: {},", lit(&rpc.path)));
        w.line(format!("method: \"{}\",", rpc.method.unwrap_or_default().as_str()));
        w.line(format!("transport: \"{}\",", primary_transport(rpc)));
        w.line("body: None,");
        w.line("query: None,");
        w.close("};");

        if let Some(params) = &types.params {
            if types.params_in_query {
                w.line("call.query = Some(params.to_query_params_string());");
            } else {
                w.line("let mut _body = String::new();");
                w.lines(params.to_wire("params", "_body"));
                w.line("call.body = Some(_body);");
            }
        }

        match (&response, streaming) {
            (Some((type_name, read)), true) => {
                w.open("self.transport.stream(");
                w.line("call,");
                w.open("Box::new(move |data: String| {");
                w.open(format!("let message = (|| -> Result<{type_name}, ArriError> {{"));
                w.line("let _input = parse_json(&data)?;");
                w.line(format!("Ok({read})"));
                w.close("})();");
                w.line("on_message(message);");
                w.close("}),");
                w.close(")");
            }
            (None, true) => {
                w.line("self.transport.stream(call, Box::new(move |_| on_message(Ok(()))))");
            }
            (Some((_, read)), false) => {
                w.line("let response = self.transport.request(call).await?;");
                w.line("let _input = parse_json(&response)?;");
                w.line(format!("Ok({read})"));
            }
            (None, false) => {
                w.line("self.transport.request(call).await?;");
                w.line("Ok(())");
            }
        }
        w.close("}");
        Ok(())
    }
}

impl TypeEmitter for RustBackend {
    fn any(&self, _run: &mut GenerationRun, _ctx: &GeneratorContext) -> GeneratedType {
        GeneratedType::new("Value")
            .nullable(true)
            .reading(|i| format!("{i}.clone()"))
            .writing(|v, t| format!("{t}.push_str(&{v}.to_string());"))
            .querying(push_query)
    }

    fn scalar(
        &self,
        _run: &mut GenerationRun,
        _ctx: &GeneratorContext,
        scalar: ScalarType,
    ) -> GeneratedType {
        match scalar.rule().repr {
            WireRepr::Boolean => GeneratedType::new("bool")
                .reading(|i| format!("{i}.as_bool().unwrap_or(false)"))
                .writing(|v, t| format!("{t}.push_str(&{v}.to_string());"))
                .querying(push_query),
            WireRepr::Number => match scalar {
                ScalarType::Float32 => GeneratedType::new("f32")
                    .reading(|i| format!("read_f64({i}) as f32"))
                    .writing(|v, t| format!("write_f64(&mut {t}, {v}.clone() as f64);"))
                    .querying(push_query),
                _ => GeneratedType::new("f64")
                    .reading(|i| format!("read_f64({i})"))
                    .writing(|v, t| format!("write_f64(&mut {t}, {v}.clone());"))
                    .querying(push_query),
            },
            WireRepr::Integer => match scalar {
                ScalarType::Int8 => integer("i8"),
                ScalarType::Uint8 => integer("u8"),
                ScalarType::Int16 => integer("i16"),
                ScalarType::Uint16 => integer("u16"),
                ScalarType::Uint32 => integer("u32"),
                _ => integer("i32"),
            },
            WireRepr::BigIntString => match scalar {
                ScalarType::Uint64 => big_integer("u64"),
                _ => big_integer("i64"),
            },
            WireRepr::String => GeneratedType::new("String")
                .reading(|i| format!("read_string({i})"))
                .writing(|v, t| format!("write_string(&mut {t}, &{v});"))
                .querying(|v, t, k| {
                    format!(
                        "{t}.push(format!(\"{}={{}}\", encode_query(&{v})));",
                        escape_string(k)
                    )
                }),
            WireRepr::Timestamp => GeneratedType::new("DateTime<Utc>")
                .reading(|i| format!("read_timestamp({i})"))
                .writing(|v, t| format!("write_timestamp(&mut {t}, &{v});"))
                .querying(|v, t, k| {
                    format!(
                        "{t}.push(format!(\"{}={{}}\", {v}.to_rfc3339_opts(SecondsFormat::AutoSi, true)));",
                        escape_string(k)
                    )
                }),
        }
    }

    fn enumeration(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        schema: &Schema,
        name: &str,
        variants: &[String],
    ) -> GeneratedType {
        let mut w = CodeWriter::new(ctx.indent);
        if run.config().generate_docs {
            docs(&mut w, &schema.metadata);
        }
        w.line("#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]");
        w.open(format!("pub enum {name} {{"));
        for variant in variants {
            w.line(format!("{},", variant_name(variant)));
        }
        w.close("}");
        w.blank();
        w.open(format!("impl {name} {{"));
        w.open("pub fn serial_value(&self) -> &'static str {");
        w.open("match self {");
        for variant in variants {
            w.line(format!("Self::{} => {},", variant_name(variant), lit(variant)));
        }
        w.close("}");
        w.close("}");
        w.blank();
        w.open("pub fn from_json(input: &Value) -> Result<Self, ArriError> {");
        w.open("match input.as_str() {");
        for variant in variants {
            w.line(format!("Some({}) => Ok(Self::{}),", lit(variant), variant_name(variant)));
        }
        w.line(format!(
            "other => Err(ArriError::new(format!(\"Unknown {name} value: {{other:?}}\"))),"
        ));
        w.close("}");
        w.close("}");
        w.close("}");

        enum_type(name).declare(Declaration::new(name, w.finish()))
    }

    fn array(
        &self,
        _run: &mut GenerationRun,
        ctx: &GeneratorContext,
        element: GeneratedType,
    ) -> GeneratedType {
        let d = ctx.depth();
        let unit = ctx.indent.as_str();
        let declarations = element.nested_declarations.clone();
        let reader = element.clone();
        GeneratedType::new(format!("Vec<{}>", element.type_name))
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "match {i} {{ Value::Array(_items{d}) => _items{d}.iter().map(|_el{d}| -> Result<_, ArriError> {{ Ok({}) }}).collect::<Result<Vec<_>, ArriError>>()?, _ => Vec::new() }}",
                    reader.from_wire(&format!("_el{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if _i{d} != 0 {{\n{unit}{t}.push(',');\n}}\n{}",
                    element.to_wire(&format!("_el{d}"), t)
                );
                format!(
                    "{t}.push('[');\nfor (_i{d}, _el{d}) in {v}.iter().enumerate() {{\n{}\n}}\n{t}.push(']');",
                    indented(&body, unit)
                )
            })
            .querying(|_, _, k| skip_in_query("arrays", k))
    }

    fn record(
        &self,
        _run: &mut GenerationRun,
        ctx: &GeneratorContext,
        value: GeneratedType,
    ) -> GeneratedType {
        let d = ctx.depth();
        let unit = ctx.indent.as_str();
        let declarations = value.nested_declarations.clone();
        let reader = value.clone();
        GeneratedType::new(format!("BTreeMap<String, {}>", value.type_name))
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "match {i} {{ Value::Object(_entries{d}) => _entries{d}.iter().map(|(_k{d}, _v{d})| -> Result<_, ArriError> {{ Ok((_k{d}.clone(), {})) }}).collect::<Result<BTreeMap<_, _>, ArriError>>()?, _ => BTreeMap::new() }}",
                    reader.from_wire(&format!("_v{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if _n{d} != 0 {{\n{unit}{t}.push(',');\n}}\nwrite_string(&mut {t}, _k{d});\n{t}.push(':');\n{}",
                    value.to_wire(&format!("_v{d}"), t)
                );
                format!(
                    "{t}.push('{{');\nfor (_n{d}, (_k{d}, _v{d})) in {v}.iter().enumerate() {{\n{}\n}}\n{t}.push('}}');",
                    indented(&body, unit)
                )
            })
            .querying(|_, _, k| skip_in_query("maps", k))
    }

    fn object(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        _schema: &Schema,
        object: ObjectShape,
    ) -> GeneratedType {
        let mut declarations: Vec<Declaration> = Vec::new();
        for field in &object.fields {
            declarations.extend(field.generated.nested_declarations.iter().cloned());
        }
        declarations.push(Declaration::new(
            &object.name,
            self.struct_declaration(run, ctx, &object),
        ));
        model(&object.name).with_declarations(declarations)
    }

    fn discriminator(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        schema: &Schema,
        union: UnionShape,
    ) -> GeneratedType {
        let mut declarations = vec![Declaration::new(
            &union.name,
            self.enum_declaration(run, ctx, schema, &union),
        )];
        for variant in &union.variants {
            for field in &variant.fields {
                declarations.extend(field.generated.nested_declarations.iter().cloned());
            }
            declarations.push(Declaration::new(
                &variant.name,
                self.struct_declaration(run, ctx, variant),
            ));
        }
        model(&union.name).with_declarations(declarations)
    }

    fn reference(&self, _ctx: &GeneratorContext, target: &Schema, name: &str) -> GeneratedType {
        match target.form {
            SchemaForm::Enum(_) => enum_type(name),
            _ => boxed(name),
        }
    }

    fn nullable(&self, ctx: &GeneratorContext, inner: GeneratedType) -> GeneratedType {
        let d = ctx.depth();
        let unit = ctx.indent.as_str();
        let declarations = inner.nested_declarations.clone();
        let reader = inner.clone();
        let querier = inner.clone();
        GeneratedType::new(format!("Option<{}>", inner.type_name))
            .nullable(true)
            .with_declarations(declarations)
            .reading(move |i| {
                format!("match {i} {{ Value::Null => None, _ => Some({}) }}", reader.from_wire(i))
            })
            .writing(move |v, t| {
                format!(
                    "match &{v} {{\n{unit}Some(_inner{d}) => {{\n{}\n{unit}}}\n{unit}None => {t}.push_str(\"null\"),\n}}",
                    indented(&indented(&inner.to_wire(&format!("_inner{d}"), t), unit), unit)
                )
            })
            .querying(move |v, t, k| {
                format!(
                    "match &{v} {{\n{unit}Some(_inner{d}) => {{\n{}\n{unit}}}\n{unit}None => {t}.push(\"{}=null\".to_string()),\n}}",
                    indented(
                        &indented(&querier.to_query_param(&format!("_inner{d}"), t, k), unit),
                        unit
                    ),
                    escape_string(k)
                )
            })
    }

    fn alias(
        &self,
        ctx: &GeneratorContext,
        schema: &Schema,
        name: &str,
        target: &GeneratedType,
    ) -> Declaration {
        let mut w = CodeWriter::new(ctx.indent);
        docs(&mut w, &schema.metadata);
        w.line(format!("pub type {name} = {};", target.type_name));
        Declaration::new(name, w.finish())
    }
}

impl Backend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn language(&self) -> &'static str {
        "rust"
    }

    fn extension(&self) -> &'static str {
        "rs"
    }

    fn preamble(&self, run: &GenerationRun) -> String {
        let mut out = String::new();
        out.push_str("// This file was autogenerated by arri-codegen. Do not modify directly.\n");
        out.push_str("#![allow(dead_code, non_camel_case_types, unused_imports, unused_mut, unused_variables, clippy::all)]\n\n");
        out.push_str(&reindent(RUNTIME, run.config().indent.as_str()));
        out
    }

    fn client(&self, run: &mut GenerationRun, services: &ServiceTree) -> CodegenResult<String> {
        let mut w = CodeWriter::new(run.config().indent);
        for (index, service) in services.flatten().into_iter().enumerate() {
            if index > 0 {
                w.blank();
            }
            self.service(&mut w, run, service)?;
        }
        Ok(w.finish())
    }
}
