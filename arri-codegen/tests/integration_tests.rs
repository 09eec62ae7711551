//! End-to-end tests for client generation.
//!
//! These build AppDefinitions through the public assembler and run them
//! through every built-in backend, the config-driven `generate_all` and the
//! output writer.

use std::sync::Arc;

use arri_codegen::{
    backends, generate, generate_all, generate_models, write_outputs, Backend, CodegenConfig,
    CodegenError, GeneratorConfig, LineEnding, TargetConfig, DART_BACKEND, KOTLIN_BACKEND,
    RUST_BACKEND, SWIFT_BACKEND, TYPESCRIPT_BACKEND,
};
use arri_schema::adapter::{adapt, FnAdapter};
use arri_schema::app::HttpMethod;
use arri_schema::{AppDefinition, AppDefinitionBuilder, Procedure, Schema, TypeRegistry};
use tempfile::TempDir;

fn user(tree: Schema) -> Schema {
    Schema::object([
        ("id", Schema::string().into()),
        ("role", Schema::enumeration(["ADMIN", "MEMBER"]).into()),
        ("createdAt", Schema::timestamp().into()),
        ("followers", Schema::uint64().into()),
        ("bio", Schema::string().nullable().optional()),
        ("tree", tree.into()),
    ])
    .with_id("User")
    .with_description("A registered user")
}

fn event() -> Schema {
    Schema::discriminator(
        "type",
        [
            (
                "CREATED",
                Schema::object([("id", Schema::string().into())]),
            ),
            (
                "RENAMED",
                Schema::object([
                    ("id", Schema::string().into()),
                    ("name", Schema::string().into()),
                ]),
            ),
        ],
    )
    .with_id("Event")
}

fn app() -> AppDefinition {
    let mut registry = TypeRegistry::new();
    let tree = registry
        .recursive("TreeNode", |node| {
            Schema::object([
                ("value", Schema::int32().into()),
                ("children", Schema::array(node).into()),
            ])
        })
        .unwrap();
    let definitions = registry.finish().unwrap();
    let params = || Schema::object([("id", Schema::string().into())]);

    AppDefinitionBuilder::new()
        .definitions(definitions)
        .procedure(
            "users.getUser",
            Procedure::http()
                .method(HttpMethod::Get)
                .params(params())
                .response(user(tree.clone())),
        )
        .procedure(
            "users.watchUser",
            Procedure::http()
                .params(params())
                .response(user(tree))
                .stream_response(),
        )
        .procedure("events.latest", Procedure::http().response(event()))
        .build()
        .unwrap()
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// =============================================================================
// Per-Backend Output
// =============================================================================

#[test]
fn test_every_backend_emits_models_and_services() {
    let app = app();
    let cases: [(&dyn Backend, &str); 5] = [
        (&TYPESCRIPT_BACKEND, "export interface User {"),
        (&DART_BACKEND, "class User implements ArriModel {"),
        (&KOTLIN_BACKEND, "data class User("),
        (&RUST_BACKEND, "pub struct User {"),
        (&SWIFT_BACKEND, "public final class User: ArriModel {"),
    ];

    for (backend, model) in cases {
        let file = generate(backend, &app, &GeneratorConfig::default()).unwrap();
        let name = backend.name();
        assert!(file.code.contains(model), "{name}: missing {model}");
        assert!(file.code.contains("ClientUsersService"), "{name}: missing users service");
        assert!(file.code.contains("ClientEventsService"), "{name}: missing events service");
        assert!(file.code.contains("/users/get-user"), "{name}: missing procedure path");
        assert!(file.code.contains("UsersGetUserParams"), "{name}: missing params type");
        assert!(file.code.contains("EventRenamed"), "{name}: missing union variant");
        assert!(file.warnings.is_empty(), "{name}: {:?}", file.warnings);
    }
}

#[test]
fn test_typescript_client_methods() {
    let file = generate(&TYPESCRIPT_BACKEND, &app(), &GeneratorConfig::default()).unwrap();
    assert!(file
        .code
        .contains("async getUser(params: UsersGetUserParams): Promise<User> {"));
    assert!(file.code.contains(
        "watchUser(params: UsersWatchUserParams, onMessage: (data: User) => void): () => void {"
    ));
    assert!(file.code.contains("method: \"get\","));
    assert!(file.code.contains("/** A registered user */"));
}

#[test]
fn test_recursive_type_declared_once() {
    let app = app();
    let cases: [(&dyn Backend, &str); 5] = [
        (&TYPESCRIPT_BACKEND, "export interface TreeNode {"),
        (&DART_BACKEND, "class TreeNode implements ArriModel {"),
        (&KOTLIN_BACKEND, "data class TreeNode("),
        (&RUST_BACKEND, "pub struct TreeNode {"),
        (&SWIFT_BACKEND, "public final class TreeNode: ArriModel {"),
    ];
    for (backend, declaration) in cases {
        let file = generate(backend, &app, &GeneratorConfig::default()).unwrap();
        assert_eq!(count(&file.code, declaration), 1, "{}", backend.name());
    }
}

#[test]
fn test_generation_is_deterministic() {
    let app = app();
    for backend in backends() {
        let first = generate(backend, &app, &GeneratorConfig::default()).unwrap();
        let second = generate(backend, &app, &GeneratorConfig::default()).unwrap();
        assert_eq!(first.code, second.code, "{}", backend.name());
    }
}

#[test]
fn test_generation_survives_json_round_trip() {
    let app = app();
    let reloaded = AppDefinition::from_json(&app.to_json()).unwrap();
    let config = GeneratorConfig::default();
    assert_eq!(
        generate(&TYPESCRIPT_BACKEND, &app, &config).unwrap(),
        generate(&TYPESCRIPT_BACKEND, &reloaded, &config).unwrap()
    );
}

// =============================================================================
// Options
// =============================================================================

#[test]
fn test_model_prefix_and_client_name() {
    let config = GeneratorConfig::new()
        .with_client_name("Api")
        .with_model_prefix("Api");
    let file = generate(&TYPESCRIPT_BACKEND, &app(), &config).unwrap();
    assert!(file.code.contains("export interface ApiUser {"));
    assert!(file.code.contains("export class ApiUsersService {"));
    assert!(!file.code.contains("export interface User {"));
}

#[test]
fn test_docs_can_be_disabled() {
    let config = GeneratorConfig::new().with_generate_docs(false);
    let file = generate(&TYPESCRIPT_BACKEND, &app(), &config).unwrap();
    assert!(!file.code.contains("A registered user"));
}

#[test]
fn test_crlf_line_endings() {
    let config = GeneratorConfig::new().with_line_ending(LineEnding::CrLf);
    let file = generate(&KOTLIN_BACKEND, &app(), &config).unwrap();
    assert_eq!(count(&file.code, "\n"), count(&file.code, "\r\n"));
}

#[test]
fn test_models_only() {
    let app = app();
    let file =
        generate_models(&TYPESCRIPT_BACKEND, app.definition_table(), &GeneratorConfig::default())
            .unwrap();
    assert!(file.code.contains("export interface User {"));
    assert!(!file.code.contains("export class Client {"));
}

// =============================================================================
// Failures and Warnings
// =============================================================================

#[test]
fn test_adapted_schema_without_structure_warns() {
    let adapter = Arc::new(FnAdapter::new("zod", |value| Ok(value.clone())));
    let extra = adapt(adapter, &serde_json::json!({})).schema;
    let profile = Schema::object([
        ("id", Schema::string().into()),
        ("extra", extra.into()),
    ])
    .with_id("Profile");
    let app = AppDefinitionBuilder::new()
        .procedure("getProfile", Procedure::http().response(profile))
        .build()
        .unwrap();

    let file = generate(&TYPESCRIPT_BACKEND, &app, &GeneratorConfig::default()).unwrap();
    assert_eq!(file.warnings.len(), 1);
    assert_eq!(file.warnings[0].path, "/Profile/extra");
    assert!(file.warnings[0].reason.contains("zod"));
    assert!(file.code.contains("extra: any;"));
}

#[test]
fn test_naming_collision_fails_the_run() {
    let address = Schema::object([("street", Schema::string().into())]).with_id("UserAddress");
    let user = Schema::object([(
        "address",
        Schema::object([("zip", Schema::string().into())]).into(),
    )])
    .with_id("User");
    let app = AppDefinitionBuilder::new()
        .definition(address)
        .definition(user)
        .build()
        .unwrap();

    for backend in backends() {
        let err = generate(backend, &app, &GeneratorConfig::default()).unwrap_err();
        assert!(
            matches!(err, CodegenError::NamingCollision { ref name, .. } if name == "UserAddress"),
            "{}: {err}",
            backend.name()
        );
    }
}

#[test]
fn test_nested_paths_sharing_words_get_distinct_names() {
    let user = Schema::object([
        (
            "address_home",
            Schema::object([("a", Schema::string().into())]).into(),
        ),
        (
            "address",
            Schema::object([(
                "home",
                Schema::object([("b", Schema::int32().into())]).into(),
            )])
            .into(),
        ),
        (
            "addressHome",
            Schema::object([("c", Schema::boolean().into())]).into(),
        ),
    ])
    .with_id("User");
    let app = AppDefinitionBuilder::new().definition(user).build().unwrap();

    for backend in backends() {
        let file = generate(backend, &app, &GeneratorConfig::default())
            .unwrap_or_else(|err| panic!("{}: {err}", backend.name()));
        for name in ["UserAddressHome", "User__address_uhome", "User__addressHome"] {
            assert!(file.code.contains(name), "{}: missing {name}", backend.name());
        }
    }
}

// =============================================================================
// Config-Driven Runs
// =============================================================================

#[test]
fn test_generate_all_and_write() {
    let dir = TempDir::new().unwrap();
    let mut kotlin = TargetConfig::new("kotlin", dir.path().join("android/Api.kt"));
    kotlin.line_ending = Some(LineEnding::CrLf);
    let config = CodegenConfig {
        app_definition: None,
        targets: vec![
            TargetConfig::new("typescript", dir.path().join("web/api.ts")),
            kotlin,
            TargetConfig::new("swift", dir.path().join("ios/Api.swift")),
        ],
    };

    let outputs = generate_all(&app(), &config).unwrap();
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[0].0, dir.path().join("web/api.ts"));
    assert!(outputs[0].1.code.contains("export class Client {"));
    assert!(outputs[1].1.code.contains("\r\n"));

    write_outputs(&outputs).unwrap();
    for (path, file) in &outputs {
        assert_eq!(std::fs::read_to_string(path).unwrap(), file.code);
    }
}

#[test]
fn test_generate_all_unknown_backend() {
    let config = CodegenConfig {
        app_definition: None,
        targets: vec![TargetConfig::new("cobol", "out.cbl")],
    };
    let err = generate_all(&app(), &config).unwrap_err();
    assert!(matches!(err, CodegenError::UnknownBackend(ref name) if name == "cobol"));
}
