//! Swift client generation.
//!
//! Objects become `final class`es so recursive types need no boxing, unions
//! become enums with an associated value per tag, and string enums use a
//! `String` raw value. Decoding goes through a small `JSON` enum written
//! into the preamble.

use arri_schema::wire::WireRepr;
use arri_schema::{Metadata, ScalarType, Schema, SchemaForm};
use convert_case::{Case, Casing};

use crate::backend::{is_streaming, primary_transport, procedure_types, Backend};
use crate::context::GeneratorContext;
use crate::error::CodegenResult;
use crate::framework::{
    escape_string, Field, GenerationRun, ObjectShape, TypeEmitter, UnionShape,
};
use crate::generated::{indented, reindent, CodeWriter, Declaration, GeneratedType};
use crate::service::{ServiceProcedure, ServiceTree};

pub static SWIFT_BACKEND: SwiftBackend = SwiftBackend;

#[derive(Debug, Clone, Copy, Default)]
pub struct SwiftBackend;

const KEYWORDS: &[&str] = &[
    "associatedtype", "class", "deinit", "enum", "extension", "fileprivate", "func", "import",
    "init", "inout", "internal", "let", "open", "operator", "private", "protocol", "public",
    "rethrows", "static", "struct", "subscript", "typealias", "var", "break", "case", "continue",
    "default", "defer", "do", "else", "fallthrough", "for", "guard", "if", "in", "repeat",
    "return", "switch", "where", "while", "as", "catch", "false", "is", "nil", "self", "super",
    "throw", "throws", "true", "try",
];

const RUNTIME: &str = r##"import Foundation

public struct RpcCall {
    public let procedure: String
    public let path: String
    public let method: String
    public let transport: String
    public var body: String?
    public var query: String?
}

public protocol Transport {
    func request(_ call: RpcCall) async throws -> String
    func stream(_ call: RpcCall, onMessage: @escaping (String) -> Void) -> () -> Void
}

public enum ArriError: Error {
    case unknownValue(String)
}

public protocol ArriModel {
    init(json: JSON) throws
    func toJsonString() -> String
    func toQueryString() -> String
}

public indirect enum JSON {
    case null
    case bool(Bool)
    case number(Double)
    case string(String)
    case array([JSON])
    case object([String: JSON])

    public init(parsing text: String) throws {
        let raw = try JSONSerialization.jsonObject(with: Data(text.utf8), options: [.fragmentsAllowed])
        self.init(raw: raw)
    }

    init(raw: Any) {
        switch raw {
        case let value as String:
            self = .string(value)
        case let value as NSNumber:
            if String(cString: value.objCType) == "c" {
                self = .bool(value.boolValue)
            } else {
                self = .number(value.doubleValue)
            }
        case let value as [Any]:
            self = .array(value.map { JSON(raw: $0) })
        case let value as [String: Any]:
            self = .object(value.mapValues { JSON(raw: $0) })
        default:
            self = .null
        }
    }

    public subscript(key: String) -> JSON {
        if case .object(let fields) = self {
            return fields[key] ?? .null
        }
        return .null
    }

    public func has(_ key: String) -> Bool {
        if case .object(let fields) = self {
            return fields[key] != nil
        }
        return false
    }

    public var isNull: Bool {
        if case .null = self {
            return true
        }
        return false
    }

    public var bool: Bool? {
        if case .bool(let value) = self {
            return value
        }
        return nil
    }

    public var double: Double? {
        switch self {
        case .number(let value):
            return value
        case .string(let value):
            switch value {
            case "NaN":
                return .nan
            case "Infinity":
                return .infinity
            case "-Infinity":
                return -.infinity
            default:
                return Double(value)
            }
        default:
            return nil
        }
    }

    public var string: String? {
        if case .string(let value) = self {
            return value
        }
        return nil
    }

    public var array: [JSON]? {
        if case .array(let items) = self {
            return items
        }
        return nil
    }

    public var object: [String: JSON]? {
        if case .object(let fields) = self {
            return fields
        }
        return nil
    }

    public var jsonString: String {
        switch self {
        case .null:
            return "null"
        case .bool(let value):
            return value ? "true" : "false"
        case .number(let value):
            return serializeDouble(value)
        case .string(let value):
            return serializeString(value)
        case .array(let items):
            return "[" + items.map { $0.jsonString }.joined(separator: ",") + "]"
        case .object(let fields):
            return "{" + fields.keys.sorted().map { serializeString($0) + ":" + (fields[$0] ?? .null).jsonString }.joined(separator: ",") + "}"
        }
    }
}

func decodeOptional<T>(_ json: JSON, _ decode: (JSON) throws -> T) rethrows -> T? {
    return json.isNull ? nil : try decode(json)
}

func decodeArray<T>(_ json: JSON, _ decode: (JSON) throws -> T) rethrows -> [T] {
    return try (json.array ?? []).map(decode)
}

func decodeDictionary<T>(_ json: JSON, _ decode: (JSON) throws -> T) rethrows -> [String: T] {
    return try (json.object ?? [:]).mapValues(decode)
}

func serializeDouble(_ value: Double) -> String {
    if value.isNaN {
        return "\"NaN\""
    }
    if value.isInfinite {
        return value > 0 ? "\"Infinity\"" : "\"-Infinity\""
    }
    if value == value.rounded() && abs(value) < 1e15 {
        return String(Int64(value))
    }
    return String(value)
}

func serializeString(_ value: String) -> String {
    var out = "\""
    for scalar in value.unicodeScalars {
        switch scalar {
        case "\"":
            out += "\\\""
        case "\\":
            out += "\\\\"
        case "\n":
            out += "\\n"
        case "\r":
            out += "\\r"
        case "\t":
            out += "\\t"
        default:
            if scalar.value < 0x20 {
                out += String(format: "\\u%04x", scalar.value)
            } else {
                out.unicodeScalars.append(scalar)
            }
        }
    }
    out += "\""
    return out
}

private let isoFormatter: ISO8601DateFormatter = {
    let formatter = ISO8601DateFormatter()
    formatter.formatOptions = [.withInternetDateTime, .withFractionalSeconds]
    return formatter
}()

private let isoFormatterWholeSeconds = ISO8601DateFormatter()

func parseDate(_ value: String?) -> Date? {
    guard let value = value else {
        return nil
    }
    return isoFormatter.date(from: value) ?? isoFormatterWholeSeconds.date(from: value)
}

func formatDate(_ value: Date) -> String {
    return isoFormatter.string(from: value)
}"##;

fn lit(text: &str) -> String {
    format!("\"{}\"", escape_string(text))
}

/// camelCase name, backticked when it is a keyword.
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
        w.doc("/// ", description);
    }
    if metadata.is_deprecated {
        match &metadata.deprecated_note {
            Some(note) => w.line(format!("@available(*, deprecated, message: {})", lit(note))),
            None => w.line("@available(*, deprecated)"),
        };
    }
}

fn push_query(v: &str, t: &str, k: &str) -> String {
    format!("{t}.append(\"{}=\\({v})\")", escape_string(k))
}

fn skip_in_query(what: &str, key: &str) -> String {
    format!(
        "print(\"[WARNING] {what} cannot be serialized to query params. Skipping field {}.\")",
        escape_string(key)
    )
}

fn model(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(name)
        .reading(move |i| format!("{reader}(json: {i})"))
        .writing(|v, t| format!("{t} += {v}.toJsonString()"))
        .querying(|_, _, k| skip_in_query("nested objects", k))
}

fn enum_type(name: &str) -> GeneratedType {
    let reader = name.to_string();
    GeneratedType::new(name)
        .reading(move |i| format!("{reader}(json: {i})"))
        .writing(|v, t| format!("{t} += serializeString({v}.rawValue)"))
        .querying(|v, t, k| format!("{t}.append(\"{}=\\({v}.rawValue)\")", escape_string(k)))
}

fn integer(type_name: &'static str) -> GeneratedType {
    GeneratedType::new(type_name)
        .reading(move |i| format!("{type_name}(exactly: {i}.double ?? 0) ?? 0"))
        .writing(|v, t| format!("{t} += String({v})"))
        .querying(push_query)
}

fn big_integer(type_name: &'static str) -> GeneratedType {
    GeneratedType::new(type_name)
        .reading(move |i| format!("{type_name}({i}.string ?? \"\") ?? 0"))
        .writing(|v, t| format!("{t} += \"\\\"\\({v})\\\"\""))
        .querying(push_query)
}

impl SwiftBackend {
    fn class_declaration(
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
        w.open(format!("public final class {name}: ArriModel {{"));
        if let Some((tag, value)) = &object.tag {
            w.line(format!("public let {}: String = {}", ident(tag), lit(value)));
        }
        let field_type = |field: &Field| {
            if field.optional {
                format!("{}?", field.generated.type_name)
            } else {
                field.generated.type_name.clone()
            }
        };
        for field in &object.fields {
            if generate_docs {
                docs(&mut w, &field.schema.metadata);
            }
            w.line(format!("public let {}: {}", ident(&field.key), field_type(field)));
        }
        w.blank();

        // memberwise init
        let params: Vec<String> = object
            .fields
            .iter()
            .map(|f| {
                let default = if f.optional { " = nil" } else { "" };
                format!("{}: {}{default}", ident(&f.key), field_type(f))
            })
            .collect();
        w.open(format!("public init({}) {{", params.join(", ")));
        for field in &object.fields {
            let field_name = ident(&field.key);
            w.line(format!("self.{field_name} = {field_name}"));
        }
        w.close("}");
        w.blank();

        // init(json:)
        w.open("public init(json: JSON) throws {");
        for field in &object.fields {
            let field_name = ident(&field.key);
            let source = format!("json[{}]", lit(&field.key));
            let read = field.generated.from_wire(&source);
            if field.optional {
                w.open(format!("if json.has({}) {{", lit(&field.key)));
                w.line(format!("self.{field_name} = try {read}"));
                w.close("} else {");
                w.indent();
                w.line(format!("self.{field_name} = nil"));
                w.close("}");
            } else {
                w.line(format!("self.{field_name} = try {read}"));
            }
        }
        w.close("}");
        w.blank();

        // toJsonString
        w.open("public func toJsonString() -> String {");
        w.line("var _output = \"{\"");
        let mut leading = false;
        if let Some((tag, value)) = &object.tag {
            w.line(format!("_output += {}", lit(&format!("\"{tag}\":\"{value}\""))));
            leading = true;
        }
        for field in object.fields.iter().filter(|f| !f.optional) {
            let comma = if leading { "," } else { "" };
            w.line(format!("_output += {}", lit(&format!("{comma}\"{}\":", field.key))));
            w.lines(
                field
                    .generated
                    .to_wire(&format!("self.{}", ident(&field.key)), "_output"),
            );
            leading = true;
        }
        let dynamic_commas = !leading && object.fields.iter().any(|f| f.optional);
        if dynamic_commas {
            w.line("var _hasKey = false");
        }
        for field in object.fields.iter().filter(|f| f.optional) {
            let field_name = ident(&field.key);
            w.open(format!("if let {field_name} = self.{field_name} {{"));
            if dynamic_commas {
                w.open("if _hasKey {");
                w.line("_output += \",\"");
                w.close("}");
                w.line(format!("_output += {}", lit(&format!("\"{}\":", field.key))));
            } else {
                w.line(format!("_output += {}", lit(&format!(",\"{}\":", field.key))));
            }
            w.lines(field.generated.to_wire(&field_name, "_output"));
            if dynamic_commas {
                w.line("_hasKey = true");
            }
            w.close("}");
        }
        w.line("_output += \"}\"");
        w.line("return _output");
        w.close("}");
        w.blank();

        // toQueryString
        w.open("public func toQueryString() -> String {");
        w.line("var _queryParts: [String] = []");
        if let Some((tag, value)) = &object.tag {
            w.line(format!("_queryParts.append({})", lit(&format!("{tag}={value}"))));
        }
        for field in &object.fields {
            let field_name = ident(&field.key);
            if field.optional {
                w.open(format!("if let {field_name} = self.{field_name} {{"));
                w.lines(field.generated.to_query_param(&field_name, "_queryParts", &field.key));
                w.close("}");
            } else {
                w.lines(field.generated.to_query_param(
                    &format!("self.{field_name}"),
                    "_queryParts",
                    &field.key,
                ));
            }
        }
        w.line("return _queryParts.joined(separator: \"&\")");
        w.close("}");
        w.close("}");
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
        let mut w = CodeWriter::new(ctx.indent);
        let cases: Vec<(String, &str, &str)> = union
            .variants
            .iter()
            .filter_map(|v| {
                v.tag
                    .as_ref()
                    .map(|(_, value)| (ident(value), value.as_str(), v.name.as_str()))
            })
            .collect();

        if run.config().generate_docs {
            docs(&mut w, &schema.metadata);
        }
        w.open(format!("public enum {name}: ArriModel {{"));
        for (case, _, type_name) in &cases {
            w.line(format!("case {case}({type_name})"));
        }
        if !cases.is_empty() {
            w.blank();
        }

        w.open("public init(json: JSON) throws {");
        w.line(format!("let _tag = json[{}].string ?? \"\"", lit(&union.tag)));
        w.line("switch _tag {");
        for (case, value, type_name) in &cases {
            w.line(format!("case {}:", lit(value)));
            w.indent();
            w.line(format!("self = .{case}(try {type_name}(json: json))"));
            w.dedent();
        }
        w.line("default:");
        w.indent();
        w.line(format!(
            "throw ArriError.unknownValue(\"Unknown {name}.{} value: \\(_tag)\")",
            escape_string(&union.tag)
        ));
        w.dedent();
        w.line("}");
        w.close("}");
        w.blank();

        for (method, call) in [("toJsonString", "toJsonString()"), ("toQueryString", "toQueryString()")] {
            w.open(format!("public func {method}() -> String {{"));
            if cases.is_empty() {
                w.line("return \"\"");
            } else {
                w.line("switch self {");
                for (case, _, _) in &cases {
                    w.line(format!("case .{case}(let inner):"));
                    w.indent();
                    w.line(format!("return inner.{call}"));
                    w.dedent();
                }
                w.line("}");
            }
            w.close("}");
            if method == "toJsonString" {
                w.blank();
            }
        }
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

        w.open(format!("public final class {class} {{"));
        w.line("private let transport: Transport");
        for (segment, child) in &service.children {
            w.line(format!("public let {}: {}", ident(segment), child.type_name(&client_name)));
        }
        w.blank();
        w.open("public init(transport: Transport) {");
        w.line("self.transport = transport");
        for (segment, child) in &service.children {
            w.line(format!(
                "self.{} = {}(transport: transport)",
                ident(segment),
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
            args.push(format!("_ params: {}", params.type_name));
        }
        if streaming {
            let message = types
                .response
                .as_ref()
                .map_or("Void".to_string(), |r| r.type_name.clone());
            args.push(format!("onMessage: @escaping (Result<{message}, Error>) -> Void"));
            w.open(format!("public func {method}({}) -> () -> Void {{", args.join(", ")));
        } else {
            match &types.response {
                Some(response) => w.open(format!(
                    "public func {method}({}) async throws -> {} {{",
                    args.join(", "),
                    response.type_name
                )),
                None => w.open(format!("public func {method}({}) async throws {{", args.join(", "))),
            };
        }

        w.open("var call = RpcCall(");
        w.line(format!("procedure: {},", lit(&procedure.name)));
        w.line(format!("path: {},", lit(&rpc.path)));
        w.line(format!("method: \"{}\",", rpc.method.unwrap_or_default().as_str()));
        w.line(format!("transport: \"{}\",", primary_transport(rpc)));
        w.line("body: nil,");
        w.line("query: nil");
        w.close(")");

        if let Some(params) = &types.params {
            if types.params_in_query {
                w.line("call.query = params.toQueryString()");
            } else {
                w.line("var _body = \"\"");
                w.lines(params.to_wire("params", "_body"));
                w.line("call.body = _body");
            }
        }

        match (&types.response, streaming) {
            (Some(response), true) => {
                w.open("return transport.stream(call) { data in");
                w.line(format!(
                    "onMessage(Result {{ try {} }})",
                    response.from_wire("try JSON(parsing: data)")
                ));
                w.close("}");
            }
            (None, true) => {
                w.line("return transport.stream(call) { _ in onMessage(.success(())) }");
            }
            (Some(response), false) => {
                w.line("let response = try await transport.request(call)");
                w.line(format!(
                    "return try {}",
                    response.from_wire("try JSON(parsing: response)")
                ));
            }
            (None, false) => {
                w.line("_ = try await transport.request(call)");
            }
        }
        w.close("}");
        Ok(())
    }
}

impl TypeEmitter for SwiftBackend {
    fn any(&self, _run: &mut GenerationRun, _ctx: &GeneratorContext) -> GeneratedType {
        GeneratedType::new("JSON")
            .nullable(true)
            .reading(|i| i.to_string())
            .writing(|v, t| format!("{t} += {v}.jsonString"))
            .querying(|v, t, k| format!("{t}.append(\"{}=\\({v}.jsonString)\")", escape_string(k)))
    }

    fn scalar(
        &self,
        _run: &mut GenerationRun,
        _ctx: &GeneratorContext,
        scalar: ScalarType,
    ) -> GeneratedType {
        match scalar.rule().repr {
            WireRepr::Boolean => GeneratedType::new("Bool")
                .reading(|i| format!("{i}.bool ?? false"))
                .writing(|v, t| format!("{t} += {v} ? \"true\" : \"false\""))
                .querying(push_query),
            WireRepr::Number => match scalar {
                ScalarType::Float32 => GeneratedType::new("Float")
                    .reading(|i| format!("Float({i}.double ?? 0)"))
                    .writing(|v, t| format!("{t} += serializeDouble(Double({v}))"))
                    .querying(push_query),
                _ => GeneratedType::new("Double")
                    .reading(|i| format!("{i}.double ?? 0"))
                    .writing(|v, t| format!("{t} += serializeDouble({v})"))
                    .querying(push_query),
            },
            WireRepr::Integer => match scalar {
                ScalarType::Int8 => integer("Int8"),
                ScalarType::Uint8 => integer("UInt8"),
                ScalarType::Int16 => integer("Int16"),
                ScalarType::Uint16 => integer("UInt16"),
                ScalarType::Uint32 => integer("UInt32"),
                _ => integer("Int32"),
            },
            WireRepr::BigIntString => match scalar {
                ScalarType::Uint64 => big_integer("UInt64"),
                _ => big_integer("Int64"),
            },
            WireRepr::String => GeneratedType::new("String")
                .reading(|i| format!("{i}.string ?? \"\""))
                .writing(|v, t| format!("{t} += serializeString({v})"))
                .querying(|v, t, k| {
                    format!(
                        "{t}.append(\"{}=\\({v}.addingPercentEncoding(withAllowedCharacters: .urlQueryAllowed) ?? \"\")\")",
                        escape_string(k)
                    )
                }),
            WireRepr::Timestamp => GeneratedType::new("Date")
                .reading(|i| format!("parseDate({i}.string) ?? Date(timeIntervalSince1970: 0)"))
                .writing(|v, t| format!("{t} += \"\\\"\\(formatDate({v}))\\\"\""))
                .querying(|v, t, k| format!("{t}.append(\"{}=\\(formatDate({v}))\")", escape_string(k))),
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
        if variants.is_empty() {
            // A raw type needs at least one case.
            w.open(format!("public enum {name} {{"));
            w.line("public var rawValue: String { \"\" }");
            w.blank();
            w.open("public init(json: JSON) throws {");
            w.line(format!(
                "throw ArriError.unknownValue(\"Unknown {name} value: \\(json.string ?? \"null\")\")"
            ));
            w.close("}");
            w.close("}");
        } else {
            w.open(format!("public enum {name}: String, CaseIterable {{"));
            for variant in variants {
                w.line(format!("case {} = {}", ident(variant), lit(variant)));
            }
            w.blank();
            w.open("public init(json: JSON) throws {");
            w.open(format!("guard let value = {name}(rawValue: json.string ?? \"\") else {{"));
            w.line(format!(
                "throw ArriError.unknownValue(\"Unknown {name} value: \\(json.string ?? \"null\")\")"
            ));
            w.close("}");
            w.line("self = value");
            w.close("}");
            w.close("}");
        }

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
        GeneratedType::new(format!("[{}]", element.type_name))
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "decodeArray({i}) {{ _el{d} in try {} }}",
                    reader.from_wire(&format!("_el{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if _i{d} != 0 {{\n{unit}{t} += \",\"\n}}\n{}",
                    element.to_wire(&format!("_el{d}"), t)
                );
                format!(
                    "{t} += \"[\"\nfor (_i{d}, _el{d}) in {v}.enumerated() {{\n{}\n}}\n{t} += \"]\"",
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
        GeneratedType::new(format!("[String: {}]", value.type_name))
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "decodeDictionary({i}) {{ _v{d} in try {} }}",
                    reader.from_wire(&format!("_v{d}"))
                )
            })
            .writing(move |v, t| {
                let body = format!(
                    "if _n{d} != 0 {{\n{unit}{t} += \",\"\n}}\n{t} += serializeString(_k{d}) + \":\"\nlet _v{d} = {v}[_k{d}]!\n{}",
                    value.to_wire(&format!("_v{d}"), t)
                );
                format!(
                    "{t} += \"{{\"\nfor (_n{d}, _k{d}) in {v}.keys.sorted().enumerated() {{\n{}\n}}\n{t} += \"}}\"",
                    indented(&body, unit)
                )
            })
            .querying(|_, _, k| skip_in_query("dictionaries", k))
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
            self.class_declaration(run, ctx, &object),
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
            self.union_declaration(run, ctx, schema, &union),
        )];
        for variant in &union.variants {
            for field in &variant.fields {
                declarations.extend(field.generated.nested_declarations.iter().cloned());
            }
            declarations.push(Declaration::new(
                &variant.name,
                self.class_declaration(run, ctx, variant),
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
        let d = ctx.depth();
        let unit = ctx.indent.as_str();
        let declarations = inner.nested_declarations.clone();
        let reader = inner.clone();
        let querier = inner.clone();
        GeneratedType::new(format!("{}?", inner.type_name))
            .nullable(true)
            .with_declarations(declarations)
            .reading(move |i| {
                format!(
                    "decodeOptional({i}) {{ _n{d} in try {} }}",
                    reader.from_wire(&format!("_n{d}"))
                )
            })
            .writing(move |v, t| {
                format!(
                    "if let _n{d} = {v} {{\n{}\n}} else {{\n{unit}{t} += \"null\"\n}}",
                    indented(&inner.to_wire(&format!("_n{d}"), t), unit)
                )
            })
            .querying(move |v, t, k| {
                format!(
                    "if let _n{d} = {v} {{\n{}\n}} else {{\n{unit}{t}.append(\"{}=null\")\n}}",
                    indented(&querier.to_query_param(&format!("_n{d}"), t, k), unit),
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
        w.line(format!("public typealias {name} = {}", target.type_name));
        Declaration::new(name, w.finish())
    }
}

impl Backend for SwiftBackend {
    fn name(&self) -> &'static str {
        "swift"
    }

    fn language(&self) -> &'static str {
        "swift"
    }

    fn extension(&self) -> &'static str {
        "swift"
    }

    fn preamble(&self, run: &GenerationRun) -> String {
        let mut out =
            String::from("// This file was autogenerated by arri-codegen. Do not modify directly.\n\n");
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
