//! TypeScript client generation.
//!
//! Every declared type becomes an `interface` (or a union/literal type)
//! plus a `$$Name` model object with `fromJson`, `fromJsonString` and
//! `toJsonString`. Objects also get `toUrlQueryString`. 64-bit integers
//! are `bigint` and travel as decimal strings.

use arri_schema::wire::WireRepr;
use arri_schema::{Metadata, ScalarType, Schema, SchemaForm};
use convert_case::{Case, Casing};

use crate::backend::{is_streaming, primary_transport, procedure_types, Backend};
use crate::context::GeneratorContext;
use crate::error::CodegenResult;
use crate::framework::{escape_string, GenerationRun, ObjectShape, TypeEmitter, UnionShape};
use crate::generated::{indented, CodeWriter, Declaration, GeneratedType};
use crate::service::{ServiceProcedure, ServiceTree};

pub static TYPESCRIPT_BACKEND: TypeScriptBackend = TypeScriptBackend;

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptBackend;

/// What a named type is, which decides how it goes into a query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Named {
    Enum,
    Model,
}

fn model(name: &str) -> String {
    format!("$${name}")
}

fn is_ident(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// `input.id` or `input["content-type"]`
fn access(object: &str, key: &str) -> String {
    if is_ident(key) {
        format!("{object}.{key}")
    } else {
        format!("{object}[\"{}\"]", escape_string(key))
    }
}

fn property_name(key: &str) -> String {
    if is_ident(key) {
        key.to_string()
    } else {
        format!("\"{}\"", escape_string(key))
    }
}

fn skip_in_query(what: &str, key: &str) -> String {
    format!(
        "console.warn(\"[arri] {what} cannot be serialized to query params. Skipping field '{}'.\");",
        escape_string(key)
    )
}

fn push_query(value_expr: &str, target: &str, key: &str) -> String {
    format!("{target}.push(`{key}=${{{value_expr}}}`);")
}

fn named(name: &str, kind: Named) -> GeneratedType {
    let model = model(name);
    let read_model = model.clone();
    GeneratedType::new(name)
        .reading(move |input| format!("{read_model}.fromJson({input})"))
        .writing(move |value, target| format!("{target} += {model}.toJsonString({value});"))
        .querying(move |value, target, key| match kind {
            Named::Enum => push_query(value, target, key),
            Named::Model => skip_in_query("nested objects", key),
        })
}

fn jsdoc(w: &mut CodeWriter, metadata: &Metadata) {
    let mut lines: Vec<String> = Vec::new();
    if let Some(description) = &metadata.description {
        lines.extend(description.lines().map(str::to_string));
    }
    if metadata.is_deprecated {
        match &metadata.deprecated_note {
            Some(note) => lines.push(format!("@deprecated {note}")),
            None => lines.push("@deprecated".to_string()),
        }
    }
    match lines.len() {
        0 => {}
        1 => {
            w.line(format!("/** {} */", lines[0]));
        }
        _ => {
            w.line("/**");
            for line in &lines {
                w.line(format!(" * {line}").trim_end());
            }
            w.line(" */");
        }
    }
}

impl TypeScriptBackend {
    fn object_declaration(
        &self,
        run: &GenerationRun,
        ctx: &GeneratorContext,
        object: &ObjectShape,
    ) -> String {
        let docs = run.config().generate_docs;
        let name = &object.name;
        let model = model(name);
        let mut w = CodeWriter::new(ctx.indent);

        if docs {
            jsdoc(&mut w, &object.metadata);
        }
        w.open(format!("export interface {name} {{"));
        if let Some((tag, value)) = &object.tag {
            w.line(format!("{}: \"{}\";", property_name(tag), escape_string(value)));
        }
        for field in &object.fields {
            if docs {
                jsdoc(&mut w, &field.schema.metadata);
            }
            let optional = if field.optional { "?" } else { "" };
            w.line(format!(
                "{}{optional}: {};",
                property_name(&field.key),
                field.generated.type_name
            ));
        }
        w.close("}");
        w.blank();

        w.open(format!("export const {model}: ArriModel<{name}> = {{"));

        // fromJson
        w.open(format!("fromJson(input: Record<string, any>): {name} {{"));
        w.open(format!("const result: {name} = {{"));
        if let Some((tag, value)) = &object.tag {
            w.line(format!("{}: \"{}\",", property_name(tag), escape_string(value)));
        }
        for field in object.fields.iter().filter(|f| !f.optional) {
            let read = field.generated.from_wire(&access("input", &field.key));
            w.line(format!("{}: {read},", property_name(&field.key)));
        }
        w.close("};");
        for field in object.fields.iter().filter(|f| f.optional) {
            let source = access("input", &field.key);
            w.open(format!("if ({source} !== undefined) {{"));
            w.line(format!(
                "{} = {};",
                access("result", &field.key),
                field.generated.from_wire(&source)
            ));
            w.close("}");
        }
        w.line("return result;");
        w.close("},");

        w.open(format!("fromJsonString(input: string): {name} {{"));
        w.line(format!("return {model}.fromJson(JSON.parse(input));"));
        w.close("},");

        // toJsonString
        w.open(format!("toJsonString(input: {name}): string {{"));
        w.line("let json = \"{\";");
        let mut leading = false;
        if let Some((tag, value)) = &object.tag {
            let text = format!("\"{tag}\":\"{value}\"");
            w.line(format!("json += \"{}\";", escape_string(&text)));
            leading = true;
        }
        for field in object.fields.iter().filter(|f| !f.optional) {
            let comma = if leading { "," } else { "" };
            let key = format!("{comma}\"{}\":", field.key);
            w.line(format!("json += \"{}\";", escape_string(&key)));
            w.lines(field.generated.to_wire(&access("input", &field.key), "json"));
            leading = true;
        }
        let dynamic_commas = !leading && object.fields.iter().any(|f| f.optional);
        if dynamic_commas {
            w.line("let _hasKey = false;");
        }
        for field in object.fields.iter().filter(|f| f.optional) {
            let source = access("input", &field.key);
            w.open(format!("if ({source} !== undefined) {{"));
            let key = format!("\"{}\":", field.key);
            if dynamic_commas {
                w.line("if (_hasKey) json += \",\";");
                w.line(format!("json += \"{}\";", escape_string(&key)));
            } else {
                w.line(format!("json += \",{}\";", escape_string(&key)));
            }
            w.lines(field.generated.to_wire(&source, "json"));
            if dynamic_commas {
                w.line("_hasKey = true;");
            }
            w.close("}");
        }
        w.line("json += \"}\";");
        w.line("return json;");
        w.close("},");

        // toUrlQueryString
        w.open(format!("toUrlQueryString(input: {name}): string {{"));
        w.line("const queryParts: string[] = [];");
        if let Some((tag, value)) = &object.tag {
            w.line(format!("queryParts.push(\"{}={}\");", escape_string(tag), escape_string(value)));
        }
        for field in &object.fields {
            let source = access("input", &field.key);
            let query = field.generated.to_query_param(&source, "queryParts", &field.key);
            if field.optional {
                w.open(format!("if ({source} !== undefined) {{"));
                w.lines(query);
                w.close("}");
            } else {
                w.lines(query);
            }
        }
        w.line("return queryParts.join(\"&\");");
        w.close("},");

        w.close("};");
        w.finish()
    }

    fn union_declaration(
        &self,
        run: &GenerationRun,
        ctx: &GeneratorContext,
        schema: &Schema,
        union: &UnionShape,
    ) -> String {
        let name = &union.name;
        let model = model(name);
        let tag = access("input", &union.tag);
        let mut w = CodeWriter::new(ctx.indent);

        if run.config().generate_docs {
            jsdoc(&mut w, &schema.metadata);
        }
        let members: Vec<&str> = union.variants.iter().map(|v| v.name.as_str()).collect();
        if members.is_empty() {
            w.line(format!("export type {name} = never;"));
        } else {
            w.line(format!("export type {name} = {};", members.join(" | ")));
        }
        w.blank();

        w.open(format!("export const {model}: ArriModel<{name}> = {{"));
        w.open(format!("fromJson(input: Record<string, any>): {name} {{"));
        w.open(format!("switch ({tag}) {{"));
        for variant in &union.variants {
            if let Some((_, value)) = &variant.tag {
                w.open(format!("case \"{}\":", escape_string(value)));
                w.line(format!("return {}.fromJson(input);", self::model(&variant.name)));
                w.dedent();
            }
        }
        w.open("default:");
        w.line(format!(
            "throw new Error(`Unknown {name}.{} value: ${{{tag}}}`);",
            escape_string(&union.tag)
        ));
        w.dedent();
        w.close("}");
        w.close("},");

        w.open(format!("fromJsonString(input: string): {name} {{"));
        w.line(format!("return {model}.fromJson(JSON.parse(input));"));
        w.close("},");

        w.open(format!("toJsonString(input: {name}): string {{"));
        w.open(format!("switch ({tag}) {{"));
        for variant in &union.variants {
            if let Some((_, value)) = &variant.tag {
                w.open(format!("case \"{}\":", escape_string(value)));
                w.line(format!("return {}.toJsonString(input);", self::model(&variant.name)));
                w.dedent();
            }
        }
        w.close("}");
        w.line(format!(
            "throw new Error(\"Unknown {name}.{} value\");",
            escape_string(&union.tag)
        ));
        w.close("},");
        w.close("};");
        w.finish()
    }

    fn service(
        &self,
        w: &mut CodeWriter,
        run: &mut GenerationRun,
        service: &ServiceTree,
    ) -> CodegenResult<()> {
        let client_name = run.config().client_name.clone();
        let class = service.type_name(&client_name);

        w.open(format!("export class {class} {{"));
        w.line("private readonly transport: Transport;");
        for (segment, child) in &service.children {
            w.line(format!(
                "readonly {}: {};",
                segment.to_case(Case::Camel),
                child.type_name(&client_name)
            ));
        }
        w.blank();
        w.open("constructor(transport: Transport) {");
        w.line("this.transport = transport;");
        for (segment, child) in &service.children {
            w.line(format!(
                "this.{} = new {}(transport);",
                segment.to_case(Case::Camel),
                child.type_name(&client_name)
            ));
        }
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
        let method = procedure.method.to_case(Case::Camel);
        let streaming = is_streaming(rpc);

        if run.config().generate_docs {
            let metadata = Metadata {
                description: rpc.description.clone(),
                is_deprecated: rpc.is_deprecated,
                ..Default::default()
            };
            jsdoc(w, &metadata);
        }

        let mut args: Vec<String> = Vec::new();
        if let Some(params) = &types.params {
            args.push(format!("params: {}", params.type_name));
        }
        let response_type = types
            .response
            .as_ref()
            .map_or("void".to_string(), |r| r.type_name.clone());
        if streaming {
            let handler = if types.response.is_some() {
                format!("onMessage: (data: {response_type}) => void")
            } else {
                "onMessage: () => void".to_string()
            };
            args.push(handler);
            w.open(format!("{method}({}): () => void {{", args.join(", ")));
        } else {
            w.open(format!(
                "async {method}({}): Promise<{response_type}> {{",
                args.join(", ")
            ));
        }

        w.open("const call: RpcCall = {");
        w.line(format!("procedure: \"{}\",", escape_string(&procedure.name)));
        w.line(format!("path: \"{}\",", escape_string(&rpc.path)));
        w.line(format!(
            "method: \"{}\",",
            rpc.method.unwrap_or_default().as_str()
        ));
        w.line(format!("transport: \"{}\",", primary_transport(rpc)));
        w.close("};");

        if let Some(params) = &types.params {
            if types.params_in_query {
                w.line(format!(
                    "call.query = {}.toUrlQueryString(params);",
                    model(&params.type_name)
                ));
            } else {
                w.line("let body = \"\";");
                w.lines(params.to_wire("params", "body"));
                w.line("call.body = body;");
            }
        }

        if streaming {
            match &types.response {
                Some(response) => {
                    w.open("return this.transport.stream(call, (data) => {");
                    w.line(format!("onMessage({});", response.from_wire("JSON.parse(data)")));
                    w.close("});");
                }
                None => {
                    w.line("return this.transport.stream(call, () => onMessage());");
                }
            }
        } else {
            match &types.response {
                Some(response) => {
                    w.line("const response = await this.transport.request(call);");
                    w.line(format!("return {};", response.from_wire("JSON.parse(response)")));
                }
                None => {
                    w.line("await this.transport.request(call);");
                }
            }
        }
        w.close("}");
        Ok(())
    }
}

impl TypeEmitter for TypeScriptBackend {
    fn any(&self, _run: &mut GenerationRun, _ctx: &GeneratorContext) -> GeneratedType {
        GeneratedType::new("any")
            .nullable(true)
            .reading(|input| input.to_string())
            .writing(|value, target| format!("{target} += JSON.stringify({value});"))
            .querying(|value, target, key| format!("{target}.push(`{key}=${{JSON.stringify({value})}}`);"))
    }

    fn scalar(
        &self,
        _run: &mut GenerationRun,
        _ctx: &GeneratorContext,
        scalar: ScalarType,
    ) -> GeneratedType {
        match scalar.rule().repr {
            WireRepr::Boolean => GeneratedType::new("boolean")
                .reading(|i| format!("typeof {i} === \"boolean\" ? {i} : false"))
                .writing(|v, t| format!("{t} += `${{{v}}}`;"))
                .querying(push_query),
            WireRepr::Number => GeneratedType::new("number")
                .reading(|i| {
                    format!("typeof {i} === \"number\" ? {i} : typeof {i} === \"string\" ? Number({i}) : 0")
                })
                .writing(|v, t| format!("{t} += Number.isFinite({v}) ? `${{{v}}}` : `\"${{{v}}}\"`;"))
                .querying(push_query),
            WireRepr::Integer => GeneratedType::new("number")
                .reading(|i| format!("typeof {i} === \"number\" ? {i} : Number({i} ?? 0)"))
                .writing(|v, t| format!("{t} += `${{{v}}}`;"))
                .querying(push_query),
            WireRepr::BigIntString => GeneratedType::new("bigint")
                .reading(|i| format!("BigInt({i} ?? 0)"))
                .writing(|v, t| format!("{t} += `\"${{{v}}}\"`;"))
                .querying(push_query),
            WireRepr::String => GeneratedType::new("string")
                .reading(|i| format!("typeof {i} === \"string\" ? {i} : \"\""))
                .writing(|v, t| format!("{t} += JSON.stringify({v});"))
                .querying(|v, t, k| format!("{t}.push(`{k}=${{encodeURIComponent({v})}}`);")),
            WireRepr::Timestamp => GeneratedType::new("Date")
                .reading(|i| {
                    format!("typeof {i} === \"string\" ? new Date({i}) : {i} instanceof Date ? {i} : new Date(0)")
                })
                .writing(|v, t| format!("{t} += `\"${{{v}.toISOString()}}\"`;"))
                .querying(|v, t, k| format!("{t}.push(`{k}=${{{v}.toISOString()}}`);")),
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
        let model = model(name);
        let values: Vec<String> = variants
            .iter()
            .map(|v| format!("\"{}\"", escape_string(v)))
            .collect();
        let mut w = CodeWriter::new(ctx.indent);
        if run.config().generate_docs {
            jsdoc(&mut w, &schema.metadata);
        }
        w.line(format!("export type {name} = (typeof {model}Values)[number];"));
        w.line(format!("export const {model}Values = [{}] as const;", values.join(", ")));
        w.open(format!("export const {model}: ArriModel<{name}> = {{"));
        w.open(format!("fromJson(input: any): {name} {{"));
        w.open(format!("if ({model}Values.includes(input)) {{"));
        w.line("return input;");
        w.close("}");
        w.line(format!("throw new Error(`Unknown {name} value: ${{input}}`);"));
        w.close("},");
        w.open(format!("fromJsonString(input: string): {name} {{"));
        w.line(format!("return {model}.fromJson(JSON.parse(input));"));
        w.close("},");
        w.open(format!("toJsonString(input: {name}): string {{"));
        w.line("return JSON.stringify(input);");
        w.close("},");
        w.close("};");

        named(name, Named::Enum).declare(Declaration::new(name, w.finish()))
    }

    fn array(
        &self,
        _run: &mut GenerationRun,
        ctx: &GeneratorContext,
        element: GeneratedType,
    ) -> GeneratedType {
        let d = ctx.depth();
        let unit = ctx.indent.as_str();
        let type_name = if element.type_name.contains(' ') {
            format!("({})[]", element.type_name)
        } else {
            format!("{}[]", element.type_name)
        };
        let declarations = element.nested_declarations.clone();
        let reader = element.clone();
        GeneratedType::new(type_name)
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "Array.isArray({i}) ? {i}.map((_el{d}: any) => {}) : []",
                    reader.from_wire(&format!("_el{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if (_i{d} !== 0) {t} += \",\";\nconst _el{d} = {v}[_i{d}];\n{}",
                    element.to_wire(&format!("_el{d}"), t)
                );
                format!(
                    "{t} += \"[\";\nfor (let _i{d} = 0; _i{d} < {v}.length; _i{d}++) {{\n{}\n}}\n{t} += \"]\";",
                    indented(&body, unit)
                )
            })
            .querying(|_, _, key| skip_in_query("arrays", key))
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
        GeneratedType::new(format!("Record<string, {}>", value.type_name))
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "typeof {i} === \"object\" && {i} !== null ? Object.fromEntries(Object.entries({i}).map(([_k{d}, _v{d}]) => [_k{d}, {}])) : {{}}",
                    reader.from_wire(&format!("_v{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if (_n{d} !== 0) {t} += \",\";\n{t} += JSON.stringify(_k{d}) + \":\";\n{}\n_n{d}++;",
                    value.to_wire(&format!("_v{d}"), t)
                );
                format!(
                    "{t} += \"{{\";\nlet _n{d} = 0;\nfor (const [_k{d}, _v{d}] of Object.entries({v})) {{\n{}\n}}\n{t} += \"}}\";",
                    indented(&body, unit)
                )
            })
            .querying(|_, _, key| skip_in_query("records", key))
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
        declarations.push(Declaration::new(&object.name, self.object_declaration(run, ctx, &object)));
        named(&object.name, Named::Model).with_declarations(declarations)
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
            self.union_declaration(run, ctx, schema, &union),
        )];
        for variant in &union.variants {
            for field in &variant.fields {
                declarations.extend(field.generated.nested_declarations.iter().cloned());
            }
            declarations.push(Declaration::new(&variant.name, self.object_declaration(run, ctx, variant)));
        }
        named(&union.name, Named::Model).with_declarations(declarations)
    }

    fn reference(&self, _ctx: &GeneratorContext, target: &Schema, name: &str) -> GeneratedType {
        let kind = match target.form {
            SchemaForm::Enum(_) => Named::Enum,
            _ => Named::Model,
        };
        named(name, kind)
    }

    fn nullable(&self, ctx: &GeneratorContext, inner: GeneratedType) -> GeneratedType {
        let unit = ctx.indent.as_str();
        let declarations = inner.nested_declarations.clone();
        let reader = inner.clone();
        let querier = inner.clone();
        GeneratedType::new(format!("{} | null", inner.type_name))
            .nullable(true)
            .with_declarations(declarations)
            .reading(move |i| format!("{i} === null || {i} === undefined ? null : {}", reader.from_wire(i)))
            .writing(move |v, t| {
                format!(
                    "if ({v} === null) {{\n{unit}{t} += \"null\";\n}} else {{\n{}\n}}",
                    indented(&inner.to_wire(v, t), unit)
                )
            })
            .querying(move |v, t, k| {
                format!(
                    "if ({v} === null) {{\n{unit}{t}.push(\"{k}=null\");\n}} else {{\n{}\n}}",
                    indented(&querier.to_query_param(v, t, k), unit)
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
        jsdoc(&mut w, &schema.metadata);
        w.line(format!("export type {name} = {};", target.type_name));
        Declaration::new(name, w.finish())
    }
}

impl Backend for TypeScriptBackend {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn language(&self) -> &'static str {
        "typescript"
    }

    fn extension(&self) -> &'static str {
        "ts"
    }

    fn preamble(&self, run: &GenerationRun) -> String {
        let mut w = CodeWriter::new(run.config().indent);
        w.line("// This file was autogenerated by arri-codegen. Do not modify directly.");
        w.line("/* eslint-disable */");
        w.blank();
        w.open("export interface RpcCall {");
        w.line("procedure: string;");
        w.line("path: string;");
        w.line("method: string;");
        w.line("transport: string;");
        w.line("body?: string;");
        w.line("query?: string;");
        w.close("}");
        w.blank();
        w.open("export interface Transport {");
        w.line("request(call: RpcCall): Promise<string>;");
        w.line("stream(call: RpcCall, onMessage: (data: string) => void): () => void;");
        w.close("}");
        w.blank();
        w.open("export interface ArriModel<T> {");
        w.line("fromJson(input: any): T;");
        w.line("fromJsonString(input: string): T;");
        w.line("toJsonString(input: T): string;");
        w.line("toUrlQueryString?(input: T): string;");
        w.close("}");
        w.finish()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use arri_schema::Definitions;

    fn run() -> GenerationRun {
        GenerationRun::new(&GeneratorConfig::default(), Definitions::new())
    }

    fn generate(schema: &Schema) -> GeneratedType {
        let mut run = run();
        let ctx = run.root_context().definition("Item");
        run.generate_type(&TYPESCRIPT_BACKEND, &ctx, schema).unwrap()
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    #[test]
    fn test_scalar_types() {
        let cases = [
            (Schema::boolean(), "boolean"),
            (Schema::float64(), "number"),
            (Schema::uint8(), "number"),
            (Schema::int64(), "bigint"),
            (Schema::uint64(), "bigint"),
            (Schema::string(), "string"),
            (Schema::timestamp(), "Date"),
            (Schema::any(), "any"),
        ];
        for (schema, expected) in cases {
            assert_eq!(generate(&schema).type_name, expected);
        }
    }

    #[test]
    fn test_bigint_travels_as_string() {
        let generated = generate(&Schema::uint64());
        assert_eq!(generated.to_wire("input.n", "json"), "json += `\"${input.n}\"`;");
        assert_eq!(generated.from_wire("input.n"), "BigInt(input.n ?? 0)");
    }

    #[test]
    fn test_nullable_string() {
        let generated = generate(&Schema::string().nullable());
        assert_eq!(generated.type_name, "string | null");
        assert!(generated.is_nullable);
        insta::assert_snapshot!(generated.to_wire("input.s", "json"), @r#"
        if (input.s === null) {
          json += "null";
        } else {
          json += JSON.stringify(input.s);
        }
        "#);
    }

    // =========================================================================
    // Containers
    // =========================================================================

    #[test]
    fn test_array_of_nullable() {
        let generated = generate(&Schema::array(Schema::int32().nullable()));
        assert_eq!(generated.type_name, "(number | null)[]");
        assert!(generated.from_wire("input.xs").starts_with("Array.isArray(input.xs)"));
    }

    #[test]
    fn test_record_loop() {
        let generated = generate(&Schema::record(Schema::boolean()));
        assert_eq!(generated.type_name, "Record<string, boolean>");
        insta::assert_snapshot!(generated.to_wire("input.flags", "json"), @r#"
        json += "{";
        let _n1 = 0;
        for (const [_k1, _v1] of Object.entries(input.flags)) {
          if (_n1 !== 0) json += ",";
          json += JSON.stringify(_k1) + ":";
          json += `${_v1}`;
          _n1++;
        }
        json += "}";
        "#);
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    #[test]
    fn test_object_declaration() {
        let schema = Schema::object([
            ("id", Schema::string().into()),
            ("content-type", Schema::string().into()),
            ("bio", Schema::string().nullable().optional()),
        ])
        .with_description("A user");
        let generated = generate(&schema);
        assert_eq!(generated.type_name, "Item");
        let code = &generated.nested_declarations[0].code;
        assert!(code.starts_with("/** A user */\nexport interface Item {"));
        assert!(code.contains("  \"content-type\": string;\n"));
        assert!(code.contains("  bio?: string | null;\n"));
        assert!(code.contains("\"content-type\": typeof input[\"content-type\"] === \"string\""));
        assert!(code.contains("json += \",\\\"bio\\\":\";"));
        assert!(code.contains("queryParts.push(`id=${encodeURIComponent(input.id)}`);"));
    }

    #[test]
    fn test_object_with_only_optional_fields_tracks_commas() {
        let schema = Schema::object([
            ("a", Schema::int8().optional()),
            ("b", Schema::int8().optional()),
        ]);
        let code = generate(&schema).nested_declarations[0].code.clone();
        assert!(code.contains("let _hasKey = false;"));
        assert_eq!(code.matches("if (_hasKey) json += \",\";").count(), 2);
    }

    #[test]
    fn test_enum_declaration() {
        let generated = generate(&Schema::enumeration(["ADMIN", "USER"]));
        let code = &generated.nested_declarations[0].code;
        assert!(code.contains("export const $$ItemValues = [\"ADMIN\", \"USER\"] as const;"));
        assert!(code.contains("throw new Error(`Unknown Item value: ${input}`);"));
        assert_eq!(generated.from_wire("x"), "$$Item.fromJson(x)");
    }

    #[test]
    fn test_union_rejects_unknown_tag() {
        let schema = Schema::discriminator(
            "type",
            [
                ("POST_CREATED", Schema::object([("id", Schema::string().into())])),
                ("POST_DELETED", Schema::object([("id", Schema::string().into())])),
            ],
        );
        let generated = generate(&schema);
        let names: Vec<_> = generated
            .nested_declarations
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["Item", "ItemPostCreated", "ItemPostDeleted"]);
        let union = &generated.nested_declarations[0].code;
        assert!(union.starts_with("export type Item = ItemPostCreated | ItemPostDeleted;"));
        assert!(union.contains(
            "      case \"POST_CREATED\":\n        return $$ItemPostCreated.fromJson(input);\n"
        ));
        assert!(union.contains("throw new Error(`Unknown Item.type value: ${input.type}`);"));
        let variant = &generated.nested_declarations[1].code;
        assert!(variant.contains("  type: \"POST_CREATED\";\n"));
        assert!(variant.contains("json += \"\\\"type\\\":\\\"POST_CREATED\\\"\";"));
    }
}
