//! Kotlin client generation on top of `kotlinx.serialization.json`.
//!
//! Objects are data classes, unions are sealed interfaces whose variants are
//! data classes, and enums are enum classes holding their wire value. The
//! transport is a `suspend` request plus a callback stream.

use arri_schema::wire::WireRepr;
use arri_schema::{Metadata, ScalarType, Schema, SchemaForm};
use convert_case::{Case, Casing};

use crate::backend::{is_streaming, primary_transport, procedure_types, Backend};
use crate::context::GeneratorContext;
use crate::error::CodegenResult;
use crate::framework::{escape_string, GenerationRun, ObjectShape, TypeEmitter, UnionShape};
use crate::generated::{indented, CodeWriter, Declaration, GeneratedType};
use crate::service::{ServiceProcedure, ServiceTree};

pub static KOTLIN_BACKEND: KotlinBackend = KotlinBackend;

#[derive(Debug, Clone, Copy, Default)]
pub struct KotlinBackend;

const KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while",
];

fn lit(text: &str) -> String {
    format!("\"{}\"", lit_body(text))
}

fn lit_body(text: &str) -> String {
    escape_string(text).replace('$', "\\$")
}

/// camelCase property name, backticked when it is a keyword.
fn ident(key: &str) -> String {
    let name: String = key
        .to_case(Case::Camel)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        return "field".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{name}");
    }
    if KEYWORDS.contains(&name.as_str()) {
        return format!("`{name}`");
    }
    name
}

fn docs(w: &mut CodeWriter, metadata: &Metadata) {
    if let Some(description) = &metadata.description {
        w.line("/**");
        w.doc(" * ", description);
        w.line(" */");
    }
    if metadata.is_deprecated {
        let note = metadata.deprecated_note.as_deref().unwrap_or("deprecated");
        w.line(format!("@Deprecated({})", lit(note)));
    }
}

fn primitive(i: &str, conversion: &str, default: &str) -> String {
    format!("({i} as? JsonPrimitive)?.contentOrNull?.{conversion}() ?: {default}")
}

fn push_query(v: &str, t: &str, k: &str) -> String {
    format!("{t}.add(\"{}=${{{v}}}\")", lit_body(k))
}

fn skip_in_query(what: &str, key: &str) -> String {
    format!(
        "System.err.println(\"[WARNING] {what} cannot be serialized to query params. Skipping field {}.\")",
        lit_body(key)
    )
}

fn model(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(name)
        .reading(move |i| format!("{reader}.fromJsonElement({i})"))
        .writing(|v, t| format!("{t}.append({v}.toJson())"))
        .querying(|_, _, k| skip_in_query("nested objects", k))
}

fn enum_type(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(name)
        .reading(move |i| format!("{reader}.fromJsonElement({i})"))
        .writing(|v, t| format!("{t}.append(JsonPrimitive({v}.serialValue).toString())"))
        .querying(|v, t, k| format!("{t}.add(\"{}=${{{v}.serialValue}}\")", lit_body(k)))
}

fn integer(type_name: &str, conversion: &'static str, default: &'static str) -> GeneratedType {
    GeneratedType::new(type_name)
        .reading(move |i| primitive(i, conversion, default))
        .writing(|v, t| format!("{t}.append({v})"))
        .querying(push_query)
}

impl KotlinBackend {
    fn class_declaration(
        &self,
        run: &GenerationRun,
        ctx: &GeneratorContext,
        object: &ObjectShape,
        parent: Option<&str>,
    ) -> String {
        let generate_docs = run.config().generate_docs;
        let name = &object.name;
        let mut w = CodeWriter::new(ctx.indent);

        if generate_docs {
            docs(&mut w, &object.metadata);
        }
        let parent = parent.unwrap_or("ArriModel");
        if object.fields.is_empty() {
            w.open(format!("class {name} : {parent} {{"));
        } else {
            w.open(format!("data class {name}("));
            for field in &object.fields {
                if generate_docs {
                    docs(&mut w, &field.schema.metadata);
                }
                if field.optional {
                    let ty = if field.generated.is_nullable {
                        field.generated.type_name.clone()
                    } else {
                        format!("{}?", field.generated.type_name)
                    };
                    w.line(format!("val {}: {ty} = null,", ident(&field.key)));
                } else {
                    w.line(format!("val {}: {},", ident(&field.key), field.generated.type_name));
                }
            }
            w.close(format!(") : {parent} {{"));
            w.indent();
        }
        if let Some((tag, value)) = &object.tag {
            w.line(format!("override val {}: String get() = {}", ident(tag), lit(value)));
            w.blank();
        }

        // toJson
        w.open("override fun toJson(): String {");
        w.line("val _output = StringBuilder(\"{\")");
        let mut leading = false;
        if let Some((tag, value)) = &object.tag {
            w.line(format!("_output.append({})", lit(&format!("\"{tag}\":\"{value}\""))));
            leading = true;
        }
        for field in object.fields.iter().filter(|f| !f.optional) {
            let comma = if leading { "," } else { "" };
            w.line(format!("_output.append({})", lit(&format!("{comma}\"{}\":", field.key))));
            w.lines(field.generated.to_wire(&ident(&field.key), "_output"));
            leading = true;
        }
        let dynamic_commas = !leading && object.fields.iter().any(|f| f.optional);
        if dynamic_commas {
            w.line("var _hasKey = false");
        }
        for field in object.fields.iter().filter(|f| f.optional) {
            let field_name = ident(&field.key);
            w.open(format!("if ({field_name} != null) {{"));
            if dynamic_commas {
                w.line("if (_hasKey) _output.append(\",\")");
                w.line(format!("_output.append({})", lit(&format!("\"{}\":", field.key))));
            } else {
                w.line(format!("_output.append({})", lit(&format!(",\"{}\":", field.key))));
            }
            w.lines(field.generated.to_wire(&field_name, "_output"));
            if dynamic_commas {
                w.line("_hasKey = true");
            }
            w.close("}");
        }
        w.line("_output.append(\"}\")");
        w.line("return _output.toString()");
        w.close("}");
        w.blank();

        // toUrlQueryParams
        w.open("override fun toUrlQueryParams(): String {");
        w.line("val _queryParts = mutableListOf<String>()");
        if let Some((tag, value)) = &object.tag {
            w.line(format!("_queryParts.add({})", lit(&format!("{tag}={value}"))));
        }
        for field in &object.fields {
            let field_name = ident(&field.key);
            let query = field.generated.to_query_param(&field_name, "_queryParts", &field.key);
            if field.optional {
                w.open(format!("if ({field_name} != null) {{"));
                w.lines(query);
                w.close("}");
            } else {
                w.lines(query);
            }
        }
        w.line("return _queryParts.joinToString(\"&\")");
        w.close("}");
        w.blank();

        // companion
        w.open("companion object {");
        w.line("@JvmStatic");
        w.open(format!("fun fromJson(input: String): {name} {{"));
        w.line("return fromJsonElement(JsonInstance.parseToJsonElement(input))");
        w.close("}");
        w.blank();
        w.line("@JvmStatic");
        w.open(format!("fun fromJsonElement(__input: JsonElement?): {name} {{"));
        w.line("val _input = __input as? JsonObject ?: JsonObject(emptyMap())");
        for field in &object.fields {
            let source = format!("_input[{}]", lit(&field.key));
            let read = field.generated.from_wire(&source);
            if field.optional && !field.generated.is_nullable {
                w.line(format!(
                    "val {} = if ({source} == null || {source} is JsonNull) null else {read}",
                    ident(&field.key)
                ));
            } else {
                w.line(format!("val {} = {read}", ident(&field.key)));
            }
        }
        if object.fields.is_empty() {
            w.line(format!("return {name}()"));
        } else {
            w.open(format!("return {name}("));
            for field in &object.fields {
                let field_name = ident(&field.key);
                w.line(format!("{field_name} = {field_name},"));
            }
            w.close(")");
        }
        w.close("}");
        w.close("}");
        w.close("}");
        w.finish()
    }

    fn sealed_declaration(
        &self,
        run: &GenerationRun,
        ctx: &GeneratorContext,
        schema: &Schema,
        union: &UnionShape,
    ) -> String {
        let name = &union.name;
        let tag = ident(&union.tag);
        let mut w = CodeWriter::new(ctx.indent);
        if run.config().generate_docs {
            docs(&mut w, &schema.metadata);
        }
        w.open(format!("sealed interface {name} : ArriModel {{"));
        w.line(format!("val {tag}: String"));
        w.blank();
        w.open("companion object {");
        w.line("@JvmStatic");
        w.open(format!("fun fromJson(input: String): {name} {{"));
        w.line("return fromJsonElement(JsonInstance.parseToJsonElement(input))");
        w.close("}");
        w.blank();
        w.line("@JvmStatic");
        w.open(format!("fun fromJsonElement(__input: JsonElement?): {name} {{"));
        w.line(format!(
            "val _tag = ((__input as? JsonObject)?.get({}) as? JsonPrimitive)?.contentOrNull",
            lit(&union.tag)
        ));
        w.open("return when (_tag) {");
        for variant in &union.variants {
            if let Some((_, value)) = &variant.tag {
                w.line(format!("{} -> {}.fromJsonElement(__input)", lit(value), variant.name));
            }
        }
        w.line(format!(
            "else -> throw IllegalArgumentException(\"Unknown {name}.{} value: $_tag\")",
            lit_body(&union.tag)
        ));
        w.close("}");
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
        let class = service.type_name(&client_name);

        w.open(format!("class {class}("));
        w.line("private val transport: Transport,");
        w.close(") {");
        w.indent();
        for (segment, child) in &service.children {
            let child_class = child.type_name(&client_name);
            w.line(format!("val {}: {child_class} = {child_class}(transport)", ident(segment)));
        }
        for (index, procedure) in service.procedures.iter().enumerate() {
            if index > 0 || !service.children.is_empty() {
                w.blank();
            }
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

        let mut args: Vec<String> = Vec::new();
        if let Some(params) = &types.params {
            args.push(format!("params: {}", params.type_name));
        }
        if streaming {
            match &types.response {
                Some(response) => args.push(format!("onMessage: ({}) -> Unit", response.type_name)),
                None => args.push("onMessage: () -> Unit".to_string()),
            }
            w.open(format!("fun {method}({}): () -> Unit {{", args.join(", ")));
        } else {
            match &types.response {
                Some(response) => w.open(format!(
                    "suspend fun {method}({}): {} {{",
                    args.join(", "),
                    response.type_name
                )),
                None => w.open(format!("suspend fun {method}({}) {{", args.join(", "))),
            };
        }

        w.open("val call = RpcCall(");
        w.line(format!("procedure = {},", lit(&procedure.name)));
        w.line(format!("path = {},", lit(&rpc.path)));
        w.line(format!("method = \"{}\",", rpc.method.unwrap_or_default().as_str()));
        w.line(format!("transport = \"{}\",", primary_transport(rpc)));
        w.close(")");

        if let Some(params) = &types.params {
            if types.params_in_query {
                w.line("call.query = params.toUrlQueryParams()");
            } else {
                w.line("val _body = StringBuilder()");
                w.lines(params.to_wire("params", "_body"));
                w.line("call.body = _body.toString()");
            }
        }

        match (&types.response, streaming) {
            (Some(response), true) => {
                w.open("return transport.stream(call) { data ->");
                w.line(format!(
                    "onMessage({})",
                    response.from_wire("JsonInstance.parseToJsonElement(data)")
                ));
                w.close("}");
            }
            (None, true) => {
                w.line("return transport.stream(call) { onMessage() }");
            }
            (Some(response), false) => {
                w.line("val response = transport.request(call)");
                w.line(format!(
                    "return {}",
                    response.from_wire("JsonInstance.parseToJsonElement(response)")
                ));
            }
            (None, false) => {
                w.line("transport.request(call)");
            }
        }
        w.close("}");
        Ok(())
    }
}

impl TypeEmitter for KotlinBackend {
    fn any(&self, _run: &mut GenerationRun, _ctx: &GeneratorContext) -> GeneratedType {
        GeneratedType::new("JsonElement?")
            .nullable(true)
            .reading(|i| i.to_string())
            .writing(|v, t| format!("{t}.append(({v} ?: JsonNull).toString())"))
            .querying(|v, t, k| format!("{t}.add(\"{}=${{{v} ?: JsonNull}}\")", lit_body(k)))
    }

    fn scalar(
        &self,
        _run: &mut GenerationRun,
        _ctx: &GeneratorContext,
        scalar: ScalarType,
    ) -> GeneratedType {
        match scalar.rule().repr {
            WireRepr::Boolean => GeneratedType::new("Boolean")
                .reading(|i| format!("({i} as? JsonPrimitive)?.booleanOrNull ?: false"))
                .writing(|v, t| format!("{t}.append({v})"))
                .querying(push_query),
            WireRepr::Number => {
                let (type_name, reader) = match scalar {
                    ScalarType::Float32 => ("Float", "floatOrNull ?: 0.0f"),
                    _ => ("Double", "doubleOrNull ?: 0.0"),
                };
                GeneratedType::new(type_name)
                    .reading(move |i| format!("({i} as? JsonPrimitive)?.{reader}"))
                    .writing(|v, t| {
                        format!("{t}.append(if ({v}.isFinite()) {v}.toString() else \"\\\"${{{v}}}\\\"\")")
                    })
                    .querying(push_query)
            }
            WireRepr::Integer => match scalar {
                ScalarType::Int8 => integer("Byte", "toByteOrNull", "0.toByte()"),
                ScalarType::Uint8 => integer("UByte", "toUByteOrNull", "0.toUByte()"),
                ScalarType::Int16 => integer("Short", "toShortOrNull", "0.toShort()"),
                ScalarType::Uint16 => integer("UShort", "toUShortOrNull", "0.toUShort()"),
                ScalarType::Uint32 => integer("UInt", "toUIntOrNull", "0u"),
                _ => integer("Int", "toIntOrNull", "0"),
            },
            WireRepr::BigIntString => {
                let (type_name, conversion, default) = match scalar {
                    ScalarType::Uint64 => ("ULong", "toULongOrNull", "0UL"),
                    _ => ("Long", "toLongOrNull", "0L"),
                };
                GeneratedType::new(type_name)
                    .reading(move |i| primitive(i, conversion, default))
                    .writing(|v, t| format!("{t}.append(\"\\\"${{{v}}}\\\"\")"))
                    .querying(push_query)
            }
            WireRepr::String => GeneratedType::new("String")
                .reading(|i| format!("({i} as? JsonPrimitive)?.contentOrNull ?: \"\""))
                .writing(|v, t| format!("{t}.append(JsonPrimitive({v}).toString())"))
                .querying(|v, t, k| {
                    format!(
                        "{t}.add(\"{}=${{java.net.URLEncoder.encode({v}, \"UTF-8\")}}\")",
                        lit_body(k)
                    )
                }),
            WireRepr::Timestamp => GeneratedType::new("Instant")
                .reading(|i| {
                    format!(
                        "({i} as? JsonPrimitive)?.contentOrNull?.let {{ runCatching {{ Instant.parse(it) }}.getOrNull() }} ?: Instant.EPOCH"
                    )
                })
                .writing(|v, t| format!("{t}.append(\"\\\"${{{v}}}\\\"\")"))
                .querying(push_query),
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
        w.open(format!("enum class {name}(val serialValue: String) {{"));
        for (index, variant) in variants.iter().enumerate() {
            let end = if index + 1 == variants.len() { ";" } else { "," };
            let member = variant.to_case(Case::Pascal);
            let member = if member.starts_with(|c: char| c.is_ascii_digit()) || member.is_empty() {
                format!("V{member}")
            } else {
                member
            };
            w.line(format!("{member}({}){end}", lit(variant)));
        }
        w.blank();
        w.open("companion object {");
        w.line("@JvmStatic");
        w.open(format!("fun fromJsonElement(input: JsonElement?): {name} {{"));
        w.line("val value = (input as? JsonPrimitive)?.contentOrNull");
        w.line("return values().firstOrNull { it.serialValue == value }");
        w.line(format!(
            "{}?: throw IllegalArgumentException(\"Unknown {name} value: $value\")",
            ctx.indent.as_str()
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
        GeneratedType::new(format!("List<{}>", element.type_name))
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "({i} as? JsonArray)?.map {{ _el{d} -> {} }} ?: listOf()",
                    reader.from_wire(&format!("_el{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if (_i{d} != 0) {t}.append(\",\")\n{}",
                    element.to_wire(&format!("_el{d}"), t)
                );
                format!(
                    "{t}.append(\"[\")\nfor ((_i{d}, _el{d}) in {v}.withIndex()) {{\n{}\n}}\n{t}.append(\"]\")",
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
        GeneratedType::new(format!("Map<String, {}>", value.type_name))
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "({i} as? JsonObject)?.mapValues {{ (_, _v{d}) -> {} }} ?: mapOf()",
                    reader.from_wire(&format!("_v{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if (_n{d} != 0) {t}.append(\",\")\n{t}.append(JsonPrimitive(_e{d}.key).toString())\n{t}.append(\":\")\nval _v{d} = _e{d}.value\n{}",
                    value.to_wire(&format!("_v{d}"), t)
                );
                format!(
                    "{t}.append(\"{{\")\nfor ((_n{d}, _e{d}) in {v}.entries.withIndex()) {{\n{}\n}}\n{t}.append(\"}}\")",
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
            self.class_declaration(run, ctx, &object, None),
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
            self.sealed_declaration(run, ctx, schema, &union),
        )];
        for variant in &union.variants {
            for field in &variant.fields {
                declarations.extend(field.generated.nested_declarations.iter().cloned());
            }
            declarations.push(Declaration::new(
                &variant.name,
                self.class_declaration(run, ctx, variant, Some(&union.name)),
            ));
        }
        model(&union.name).with_declarations(declarations)
    }

    fn reference(&self, _ctx: &GeneratorContext, target: &Schema, name: &str) -> GeneratedType {
        match target.form {
            SchemaForm::Enum(_) => enum_type(name),
            _ => model(name),
        }
    }

    fn nullable(&self, ctx: &GeneratorContext, inner: GeneratedType) -> GeneratedType {
        let unit = ctx.indent.as_str();
        let declarations = inner.nested_declarations.clone();
        let reader = inner.clone();
        let querier = inner.clone();
        GeneratedType::new(format!("{}?", inner.type_name))
            .nullable(true)
            .with_declarations(declarations)
            .reading(move |i| {
                format!("if ({i} == null || {i} is JsonNull) null else {}", reader.from_wire(i))
            })
            .writing(move |v, t| {
                format!(
                    "if ({v} == null) {{\n{unit}{t}.append(\"null\")\n}} else {{\n{}\n}}",
                    indented(&inner.to_wire(v, t), unit)
                )
            })
            .querying(move |v, t, k| {
                format!(
                    "if ({v} == null) {{\n{unit}{t}.add(\"{}=null\")\n}} else {{\n{}\n}}",
                    lit_body(k),
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
        docs(&mut w, &schema.metadata);
        w.line(format!("typealias {name} = {}", target.type_name));
        Declaration::new(name, w.finish())
    }
}

impl Backend for KotlinBackend {
    fn name(&self) -> &'static str {
        "kotlin"
    }

    fn language(&self) -> &'static str {
        "kotlin"
    }

    fn extension(&self) -> &'static str {
        "kt"
    }

    fn preamble(&self, run: &GenerationRun) -> String {
        let mut w = CodeWriter::new(run.config().indent);
        w.line("// This file was autogenerated by arri-codegen. Do not modify directly.");
        w.line("@file:Suppress(\"FunctionName\", \"LocalVariableName\", \"NAME_SHADOWING\", \"unused\")");
        w.blank();
        w.line("import java.time.Instant");
        w.line("import kotlinx.serialization.json.*");
        w.blank();
        w.line("private val JsonInstance = Json { ignoreUnknownKeys = true }");
        w.blank();
        w.open("data class RpcCall(");
        w.line("val procedure: String,");
        w.line("val path: String,");
        w.line("val method: String,");
        w.line("val transport: String,");
        w.line("var body: String? = null,");
        w.line("var query: String? = null,");
        w.close(")");
        w.blank();
        w.open("interface Transport {");
        w.line("suspend fun request(call: RpcCall): String");
        w.line("fun stream(call: RpcCall, onMessage: (String) -> Unit): () -> Unit");
        w.close("}");
        w.blank();
        w.open("interface ArriModel {");
        w.line("fun toJson(): String");
        w.line("fun toUrlQueryParams(): String");
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

    fn generate(schema: &Schema) -> GeneratedType {
        let mut run = GenerationRun::new(&GeneratorConfig::default(), Definitions::new());
        let ctx = run.root_context().definition("Item");
        run.generate_type(&KOTLIN_BACKEND, &ctx, schema).unwrap()
    }

    #[test]
    fn test_integer_widths() {
        let cases = [
            (Schema::int8(), "Byte"),
            (Schema::uint8(), "UByte"),
            (Schema::int16(), "Short"),
            (Schema::uint16(), "UShort"),
            (Schema::int32(), "Int"),
            (Schema::uint32(), "UInt"),
            (Schema::int64(), "Long"),
            (Schema::uint64(), "ULong"),
        ];
        for (schema, expected) in cases {
            assert_eq!(generate(&schema).type_name, expected);
        }
    }

    #[test]
    fn test_uint64_reads_from_string() {
        let generated = generate(&Schema::uint64());
        assert_eq!(
            generated.from_wire("x"),
            "(x as? JsonPrimitive)?.contentOrNull?.toULongOrNull() ?: 0UL"
        );
        assert_eq!(generated.to_wire("id", "_output"), "_output.append(\"\\\"${id}\\\"\")");
    }

    #[test]
    fn test_keyword_properties_are_backticked() {
        assert_eq!(ident("in"), "`in`");
        assert_eq!(ident("user_id"), "userId");
    }

    #[test]
    fn test_data_class() {
        let schema = Schema::object([
            ("id", Schema::string().into()),
            ("score", Schema::float64().nullable().into()),
            ("note", Schema::string().optional()),
        ]);
        let code = generate(&schema).nested_declarations[0].code.clone();
        assert!(code.starts_with(
            "data class Item(\n  val id: String,\n  val score: Double?,\n  val note: String? = null,\n) : ArriModel {\n"
        ));
        assert!(code.contains("\n  override fun toJson(): String {\n"));
        assert!(code.contains(
            "val note = if (_input[\"note\"] == null || _input[\"note\"] is JsonNull) null else (_input[\"note\"] as? JsonPrimitive)?.contentOrNull ?: \"\""
        ));
        assert!(!code.contains("  \n"));
    }

    #[test]
    fn test_array_loop() {
        let generated = generate(&Schema::array(Schema::boolean()));
        insta::assert_snapshot!(generated.to_wire("flags", "_output"), @r#"
        _output.append("[")
        for ((_i1, _el1) in flags.withIndex()) {
          if (_i1 != 0) _output.append(",")
          _output.append(_el1)
        }
        _output.append("]")
        "#);
    }

    #[test]
    fn test_sealed_interface() {
        let schema = Schema::discriminator(
            "eventType",
            [("CREATED", Schema::object([("id", Schema::string().into())]))],
        );
        let generated = generate(&schema);
        let sealed = &generated.nested_declarations[0].code;
        assert!(sealed.starts_with("sealed interface Item : ArriModel {\n  val eventType: String\n"));
        assert!(sealed.contains("\"CREATED\" -> ItemCreated.fromJsonElement(__input)"));
        assert!(sealed.contains("else -> throw IllegalArgumentException(\"Unknown Item.eventType value: $_tag\")"));
        let variant = &generated.nested_declarations[1].code;
        assert!(variant.contains(") : Item {\n  override val eventType: String get() = \"CREATED\"\n"));
    }
}
