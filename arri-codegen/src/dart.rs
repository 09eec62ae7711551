//! Dart client generation.
//!
//! Objects become immutable classes implementing `ArriModel`, unions become
//! `sealed` classes with one implementing class per tag value, and enums
//! become enhanced enums carrying their wire value.

use arri_schema::wire::WireRepr;
use arri_schema::{Metadata, ScalarType, Schema, SchemaForm};
use convert_case::{Case, Casing};

use crate::backend::{is_streaming, primary_transport, procedure_types, Backend};
use crate::context::GeneratorContext;
use crate::error::CodegenResult;
use crate::framework::{escape_string, GenerationRun, ObjectShape, TypeEmitter, UnionShape};
use crate::generated::{indented, CodeWriter, Declaration, GeneratedType};
use crate::service::{ServiceProcedure, ServiceTree};

pub static DART_BACKEND: DartBackend = DartBackend;

#[derive(Debug, Clone, Copy, Default)]
pub struct DartBackend;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "assert", "async", "await", "break", "case", "catch", "class", "const",
    "continue", "default", "do", "dynamic", "else", "enum", "extends", "external", "factory",
    "false", "final", "finally", "for", "get", "if", "implements", "import", "in", "is", "late",
    "library", "new", "null", "operator", "required", "rethrow", "return", "set", "static",
    "super", "switch", "this", "throw", "true", "try", "var", "void", "while", "with", "yield",
];

/// Double-quoted Dart literal. `$` would start an interpolation.
fn lit(text: &str) -> String {
    format!("\"{}\"", escape_string(text).replace('$', "\\$"))
}

/// Literal body without the surrounding quotes.
fn lit_body(text: &str) -> String {
    escape_string(text).replace('$', "\\$")
}

fn ident(key: &str) -> String {
    let name = key.to_case(Case::Camel);
    let name: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        return "field".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("k{name}");
    }
    if KEYWORDS.contains(&name.as_str()) {
        return format!("{name}_");
    }
    name
}

fn optional_type(generated: &GeneratedType) -> String {
    if generated.is_nullable {
        generated.type_name.clone()
    } else {
        format!("{}?", generated.type_name)
    }
}

fn docs(w: &mut CodeWriter, metadata: &Metadata) {
    if let Some(description) = &metadata.description {
        w.doc("/// ", description);
    }
    if metadata.is_deprecated {
        match &metadata.deprecated_note {
            Some(note) => w.line(format!("@Deprecated({})", lit(note))),
            None => w.line("@deprecated"),
        };
    }
}

fn model(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(name)
        .reading(move |i| {
            format!("{reader}.fromJson({i} is Map<String, dynamic> ? {i} : <String, dynamic>{{}})")
        })
        .writing(|v, t| format!("{t}.write({v}.toJsonString());"))
        .querying(|_, _, k| {
            format!(
                "print(\"[WARNING] nested objects cannot be serialized to query params. Skipping field {}.\");",
                lit_body(k)
            )
        })
}

fn enum_type(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(name)
        .reading(move |i| format!("{reader}.fromJson({i})"))
        .writing(|v, t| format!("{t}.write(json.encode({v}.serialValue));"))
        .querying(|v, t, k| format!("{t}.add(\"{}=${{{v}.serialValue}}\");", lit_body(k)))
}

fn push_query(v: &str, t: &str, k: &str) -> String {
    format!("{t}.add(\"{}=${{{v}}}\");", lit_body(k))
}

impl DartBackend {
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
        w.open(format!(
            "class {name} implements {} {{",
            parent.unwrap_or("ArriModel")
        ));
        if let Some((tag, value)) = &object.tag {
            w.line("@override");
            w.line(format!("String get {} => {};", ident(tag), lit(value)));
        }
        for field in &object.fields {
            if generate_docs {
                docs(&mut w, &field.schema.metadata);
            }
            let ty = if field.optional {
                optional_type(&field.generated)
            } else {
                field.generated.type_name.clone()
            };
            w.line(format!("final {ty} {};", ident(&field.key)));
        }
        if !object.fields.is_empty() || object.tag.is_some() {
            w.blank();
        }

        // constructor
        if object.fields.is_empty() {
            w.line(format!("const {name}();"));
        } else {
            w.open(format!("const {name}({{"));
            for field in &object.fields {
                let required = if field.optional { "" } else { "required " };
                w.line(format!("{required}this.{},", ident(&field.key)));
            }
            w.close("});");
        }
        w.blank();

        // fromJson
        w.open(format!(
            "factory {name}.fromJson(Map<String, dynamic> _input_) {{"
        ));
        for field in &object.fields {
            let source = format!("_input_[{}]", lit(&field.key));
            let read = field.generated.from_wire(&source);
            if field.optional && !field.generated.is_nullable {
                w.line(format!(
                    "final {} = {source} == null ? null : {read};",
                    ident(&field.key)
                ));
            } else {
                w.line(format!("final {} = {read};", ident(&field.key)));
            }
        }
        if object.fields.is_empty() {
            w.line(format!("return {name}();"));
        } else {
            w.open(format!("return {name}("));
            for field in &object.fields {
                let field_name = ident(&field.key);
                w.line(format!("{field_name}: {field_name},"));
            }
            w.close(");");
        }
        w.close("}");
        w.blank();

        w.open(format!("factory {name}.fromJsonString(String input) {{"));
        w.line(format!("return {name}.fromJson(json.decode(input));"));
        w.close("}");
        w.blank();

        // toJsonString
        w.line("@override");
        w.open("String toJsonString() {");
        w.line("final _output_ = StringBuffer(\"{\");");
        let mut leading = false;
        if let Some((tag, value)) = &object.tag {
            let text = format!("\"{tag}\":\"{value}\"");
            w.line(format!("_output_.write({});", lit(&text)));
            leading = true;
        }
        for field in object.fields.iter().filter(|f| !f.optional) {
            let comma = if leading { "," } else { "" };
            w.line(format!("_output_.write({});", lit(&format!("{comma}\"{}\":", field.key))));
            w.lines(field.generated.to_wire(&ident(&field.key), "_output_"));
            leading = true;
        }
        let dynamic_commas = !leading && object.fields.iter().any(|f| f.optional);
        if dynamic_commas {
            w.line("var _hasKey_ = false;");
        }
        for field in object.fields.iter().filter(|f| f.optional) {
            let field_name = ident(&field.key);
            let value = if field.generated.is_nullable {
                field_name.clone()
            } else {
                format!("{field_name}!")
            };
            w.open(format!("if ({field_name} != null) {{"));
            if dynamic_commas {
                w.line("if (_hasKey_) _output_.write(\",\");");
                w.line(format!("_output_.write({});", lit(&format!("\"{}\":", field.key))));
            } else {
                w.line(format!("_output_.write({});", lit(&format!(",\"{}\":", field.key))));
            }
            w.lines(field.generated.to_wire(&value, "_output_"));
            if dynamic_commas {
                w.line("_hasKey_ = true;");
            }
            w.close("}");
        }
        w.line("_output_.write(\"}\");");
        w.line("return _output_.toString();");
        w.close("}");
        w.blank();

        // toUrlQueryString
        w.line("@override");
        w.open("String toUrlQueryString() {");
        w.line("final _queryParts_ = <String>[];");
        if let Some((tag, value)) = &object.tag {
            w.line(format!("_queryParts_.add({});", lit(&format!("{tag}={value}"))));
        }
        for field in &object.fields {
            let field_name = ident(&field.key);
            if field.optional {
                let value = if field.generated.is_nullable {
                    field_name.clone()
                } else {
                    format!("{field_name}!")
                };
                w.open(format!("if ({field_name} != null) {{"));
                w.lines(field.generated.to_query_param(&value, "_queryParts_", &field.key));
                w.close("}");
            } else {
                w.lines(field.generated.to_query_param(&field_name, "_queryParts_", &field.key));
            }
        }
        w.line("return _queryParts_.join(\"&\");");
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
        let mut w = CodeWriter::new(ctx.indent);
        if run.config().generate_docs {
            docs(&mut w, &schema.metadata);
        }
        w.open(format!("sealed class {name} implements ArriModel {{"));
        w.line(format!("String get {};", ident(&union.tag)));
        w.line(format!("const {name}();"));
        w.blank();
        w.open(format!("factory {name}.fromJson(Map<String, dynamic> _input_) {{"));
        w.line(format!("final _tag_ = _input_[{}];", lit(&union.tag)));
        w.open("switch (_tag_) {");
        for variant in &union.variants {
            if let Some((_, value)) = &variant.tag {
                w.open(format!("case {}:", lit(value)));
                w.line(format!("return {}.fromJson(_input_);", variant.name));
                w.dedent();
            }
        }
        w.close("}");
        w.line(format!(
            "throw FormatException(\"Unknown {name}.{} value: $_tag_\");",
            lit_body(&union.tag)
        ));
        w.close("}");
        w.blank();
        w.open(format!("factory {name}.fromJsonString(String input) {{"));
        w.line(format!("return {name}.fromJson(json.decode(input));"));
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

        w.open(format!("class {class} {{"));
        w.line("final Transport _transport;");
        w.line(format!("{class}(this._transport);"));
        for (segment, child) in &service.children {
            let child_class = child.type_name(&client_name);
            w.blank();
            w.line(format!(
                "{child_class} get {} => {child_class}(_transport);",
                ident(segment)
            ));
        }
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

        let mut args: Vec<String> = Vec::new();
        if let Some(params) = &types.params {
            args.push(format!("{} params", params.type_name));
        }
        if streaming {
            match &types.response {
                Some(response) => args.push(format!(
                    "void Function({} data) onMessage",
                    response.type_name
                )),
                None => args.push("void Function() onMessage".to_string()),
            }
            w.open(format!("void Function() {method}({}) {{", args.join(", ")));
        } else {
            let response_type = types
                .response
                .as_ref()
                .map_or("void".to_string(), |r| r.type_name.clone());
            w.open(format!(
                "Future<{response_type}> {method}({}) async {{",
                args.join(", ")
            ));
        }

        w.open("final call = RpcCall(");
        w.line(format!("procedure: {},", lit(&procedure.name)));
        w.line(format!("path: {},", lit(&rpc.path)));
        w.line(format!("method: \"{}\",", rpc.method.unwrap_or_default().as_str()));
        w.line(format!("transport: \"{}\",", primary_transport(rpc)));
        w.close(");");

        if let Some(params) = &types.params {
            if types.params_in_query {
                w.line("call.query = params.toUrlQueryString();");
            } else {
                w.line("final _body_ = StringBuffer();");
                w.lines(params.to_wire("params", "_body_"));
                w.line("call.body = _body_.toString();");
            }
        }

        match (&types.response, streaming) {
            (Some(response), true) => {
                w.line(format!(
                    "return _transport.stream(call, (data) => onMessage({}));",
                    response.from_wire("json.decode(data)")
                ));
            }
            (None, true) => {
                w.line("return _transport.stream(call, (_) => onMessage());");
            }
            (Some(response), false) => {
                w.line("final response = await _transport.request(call);");
                w.line(format!("return {};", response.from_wire("json.decode(response)")));
            }
            (None, false) => {
                w.line("await _transport.request(call);");
            }
        }
        w.close("}");
        Ok(())
    }
}

impl TypeEmitter for DartBackend {
    fn any(&self, _run: &mut GenerationRun, _ctx: &GeneratorContext) -> GeneratedType {
        GeneratedType::new("dynamic")
            .nullable(true)
            .reading(|i| i.to_string())
            .writing(|v, t| format!("{t}.write(json.encode({v}));"))
            .querying(|v, t, k| format!("{t}.add(\"{}=${{json.encode({v})}}\");", lit_body(k)))
    }

    fn scalar(
        &self,
        _run: &mut GenerationRun,
        _ctx: &GeneratorContext,
        scalar: ScalarType,
    ) -> GeneratedType {
        match scalar.rule().repr {
            WireRepr::Boolean => GeneratedType::new("bool")
                .reading(|i| format!("{i} is bool ? {i} : false"))
                .writing(|v, t| format!("{t}.write({v});"))
                .querying(push_query),
            WireRepr::Number => GeneratedType::new("double")
                .reading(|i| {
                    format!("{i} is num ? {i}.toDouble() : {i} is String ? double.tryParse({i}) ?? 0.0 : 0.0")
                })
                .writing(|v, t| format!("{t}.write({v}.isFinite ? {v} : \"\\\"${{{v}}}\\\"\");"))
                .querying(push_query),
            WireRepr::Integer => GeneratedType::new("int")
                .reading(|i| format!("{i} is int ? {i} : {i} is num ? {i}.toInt() : 0"))
                .writing(|v, t| format!("{t}.write({v});"))
                .querying(push_query),
            WireRepr::BigIntString => GeneratedType::new("BigInt")
                .reading(|i| {
                    format!("{i} is String ? BigInt.tryParse({i}) ?? BigInt.zero : {i} is int ? BigInt.from({i}) : BigInt.zero")
                })
                .writing(|v, t| format!("{t}.write(\"\\\"${{{v}}}\\\"\");"))
                .querying(push_query),
            WireRepr::String => GeneratedType::new("String")
                .reading(|i| format!("{i} is String ? {i} : \"\""))
                .writing(|v, t| format!("{t}.write(json.encode({v}));"))
                .querying(|v, t, k| {
                    format!("{t}.add(\"{}=${{Uri.encodeQueryComponent({v})}}\");", lit_body(k))
                }),
            WireRepr::Timestamp => GeneratedType::new("DateTime")
                .reading(|i| {
                    format!("{i} is String ? DateTime.tryParse({i}) ?? DateTime.fromMillisecondsSinceEpoch(0, isUtc: true) : DateTime.fromMillisecondsSinceEpoch(0, isUtc: true)")
                })
                .writing(|v, t| format!("{t}.write(\"\\\"${{{v}.toUtc().toIso8601String()}}\\\"\");"))
                .querying(|v, t, k| {
                    format!("{t}.add(\"{}=${{{v}.toUtc().toIso8601String()}}\");", lit_body(k))
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
        w.open(format!("enum {name} {{"));
        for (index, variant) in variants.iter().enumerate() {
            let end = if index + 1 == variants.len() { ";" } else { "," };
            w.line(format!("{}({}){end}", ident(variant), lit(variant)));
        }
        w.blank();
        w.line(format!("const {name}(this.serialValue);"));
        w.line("final String serialValue;");
        w.blank();
        w.open(format!("static {name} fromJson(dynamic input) {{"));
        w.open("for (final v in values) {");
        w.line("if (v.serialValue == input) return v;");
        w.close("}");
        w.line(format!("throw FormatException(\"Unknown {name} value: $input\");"));
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
        let type_name = format!("List<{}>", element.type_name);
        let declarations = element.nested_declarations.clone();
        let reader = element.clone();
        let item = element.type_name.clone();
        GeneratedType::new(type_name)
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "{i} is List ? ({i} as List).map<{item}>((_el{d}) => {}).toList() : <{item}>[]",
                    reader.from_wire(&format!("_el{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if (_i{d} != 0) {t}.write(\",\");\nfinal _el{d} = {v}[_i{d}];\n{}",
                    element.to_wire(&format!("_el{d}"), t)
                );
                format!(
                    "{t}.write(\"[\");\nfor (var _i{d} = 0; _i{d} < {v}.length; _i{d}++) {{\n{}\n}}\n{t}.write(\"]\");",
                    indented(&body, unit)
                )
            })
            .querying(|_, _, k| {
                format!(
                    "print(\"[WARNING] arrays cannot be serialized to query params. Skipping field {}.\");",
                    lit_body(k)
                )
            })
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
        let item = value.type_name.clone();
        GeneratedType::new(format!("Map<String, {}>", value.type_name))
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "{i} is Map<String, dynamic> ? ({i} as Map<String, dynamic>).map<String, {item}>((_k{d}, _v{d}) => MapEntry(_k{d}, {})) : <String, {item}>{{}}",
                    reader.from_wire(&format!("_v{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if (_n{d} != 0) {t}.write(\",\");\n{t}.write(\"${{json.encode(_e{d}.key)}}:\");\nfinal _v{d} = _e{d}.value;\n{}\n_n{d}++;",
                    value.to_wire(&format!("_v{d}"), t)
                );
                format!(
                    "{t}.write(\"{{\");\nvar _n{d} = 0;\nfor (final _e{d} in {v}.entries) {{\n{}\n}}\n{t}.write(\"}}\");",
                    indented(&body, unit)
                )
            })
            .querying(|_, _, k| {
                format!(
                    "print(\"[WARNING] maps cannot be serialized to query params. Skipping field {}.\");",
                    lit_body(k)
                )
            })
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
            .reading(move |i| format!("{i} == null ? null : {}", reader.from_wire(i)))
            .writing(move |v, t| {
                format!(
                    "if ({v} == null) {{\n{unit}{t}.write(\"null\");\n}} else {{\n{}\n}}",
                    indented(&inner.to_wire(&format!("{v}!"), t), unit)
                )
            })
            .querying(move |v, t, k| {
                format!(
                    "if ({v} == null) {{\n{unit}{t}.add(\"{}=null\");\n}} else {{\n{}\n}}",
                    lit_body(k),
                    indented(&querier.to_query_param(&format!("{v}!"), t, k), unit)
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
        w.line(format!("typedef {name} = {};", target.type_name));
        Declaration::new(name, w.finish())
    }
}

impl Backend for DartBackend {
    fn name(&self) -> &'static str {
        "dart"
    }

    fn language(&self) -> &'static str {
        "dart"
    }

    fn extension(&self) -> &'static str {
        "dart"
    }

    fn preamble(&self, run: &GenerationRun) -> String {
        let mut w = CodeWriter::new(run.config().indent);
        w.line("// This file was autogenerated by arri-codegen. Do not modify directly.");
        w.line("// ignore_for_file: type=lint, unused_local_variable");
        w.line("import \"dart:convert\";");
        w.blank();
        w.open("class RpcCall {");
        w.line("final String procedure;");
        w.line("final String path;");
        w.line("final String method;");
        w.line("final String transport;");
        w.line("String? body;");
        w.line("String? query;");
        w.blank();
        w.open("RpcCall({");
        w.line("required this.procedure,");
        w.line("required this.path,");
        w.line("required this.method,");
        w.line("required this.transport,");
        w.line("this.body,");
        w.line("this.query,");
        w.close("});");
        w.close("}");
        w.blank();
        w.open("abstract class Transport {");
        w.line("Future<String> request(RpcCall call);");
        w.line("void Function() stream(RpcCall call, void Function(String data) onMessage);");
        w.close("}");
        w.blank();
        w.open("abstract class ArriModel {");
        w.line("String toJsonString();");
        w.line("String toUrlQueryString();");
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
        run.generate_type(&DART_BACKEND, &ctx, schema).unwrap()
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(ident("content-type"), "contentType");
        assert_eq!(ident("class"), "class_");
        assert_eq!(ident("2fa"), "k2fa");
        assert_eq!(lit("cost $5"), "\"cost \\$5\"");
    }

    #[test]
    fn test_scalar_types() {
        assert_eq!(generate(&Schema::boolean()).type_name, "bool");
        assert_eq!(generate(&Schema::float32()).type_name, "double");
        assert_eq!(generate(&Schema::int16()).type_name, "int");
        assert_eq!(generate(&Schema::int64()).type_name, "BigInt");
        assert_eq!(generate(&Schema::timestamp()).type_name, "DateTime");
        assert_eq!(generate(&Schema::any()).type_name, "dynamic");
        assert_eq!(generate(&Schema::string().nullable()).type_name, "String?");
    }

    #[test]
    fn test_bigint_written_as_string() {
        let generated = generate(&Schema::uint64());
        assert_eq!(generated.to_wire("id", "_output_"), "_output_.write(\"\\\"${id}\\\"\");");
    }

    #[test]
    fn test_nullable_uses_bang_inside() {
        let generated = generate(&Schema::array(Schema::string()).nullable());
        let code = generated.to_wire("tags", "_output_");
        assert!(code.starts_with("if (tags == null) {\n  _output_.write(\"null\");\n} else {"));
        assert!(code.contains("for (var _i1 = 0; _i1 < tags!.length; _i1++) {"));
    }

    #[test]
    fn test_class_declaration() {
        let schema = Schema::object([
            ("id", Schema::string().into()),
            ("createdAt", Schema::timestamp().into()),
            ("bio", Schema::string().optional()),
        ]);
        let generated = generate(&schema);
        let code = &generated.nested_declarations[0].code;
        assert!(code.starts_with("class Item implements ArriModel {"));
        assert!(code.contains("  final String? bio;\n"));
        assert!(code.contains("    required this.createdAt,\n    this.bio,\n"));
        assert!(code.contains(
            "final bio = _input_[\"bio\"] == null ? null : _input_[\"bio\"] is String ? _input_[\"bio\"] : \"\";"
        ));
        assert!(code.contains("if (bio != null) {\n      _output_.write(\",\\\"bio\\\":\");\n      _output_.write(json.encode(bio!));"));
    }

    #[test]
    fn test_enum_declaration() {
        let generated = generate(&Schema::enumeration(["IN_PROGRESS", "DONE"]));
        insta::assert_snapshot!(generated.nested_declarations[0].code, @r#"
        enum Item {
          inProgress("IN_PROGRESS"),
          done("DONE");

          const Item(this.serialValue);
          final String serialValue;

          static Item fromJson(dynamic input) {
            for (final v in values) {
              if (v.serialValue == input) return v;
            }
            throw FormatException("Unknown Item value: $input");
          }
        }
        "#);
    }

    #[test]
    fn test_sealed_union() {
        let schema = Schema::discriminator(
            "kind",
            [
                ("CIRCLE", Schema::object([("radius", Schema::float64().into())])),
                ("SQUARE", Schema::object([("side", Schema::float64().into())])),
            ],
        );
        let generated = generate(&schema);
        let sealed = &generated.nested_declarations[0].code;
        assert!(sealed.starts_with("sealed class Item implements ArriModel {\n  String get kind;\n"));
        assert!(sealed.contains("case \"CIRCLE\":\n        return ItemCircle.fromJson(_input_);"));
        let circle = &generated.nested_declarations[1].code;
        assert!(circle.starts_with("class ItemCircle implements Item {\n  @override\n  String get kind => \"CIRCLE\";"));
    }
}
