//! The `AppDefinition` document and its assembler.
//!
//! An [`AppDefinition`] lists every RPC procedure of a service together with
//! the named schemas those procedures exchange. It is the one artifact shared
//! between the schema core, server runtimes and code generators.
//!
//! Procedures are declared on an [`AppDefinitionBuilder`] with inline
//! parameter and response schemas. [`AppDefinitionBuilder::build`] hoists
//! those schemas into `definitions`, names the anonymous ones, follows refs
//! and rejects conflicting declarations.
//!
//! # Example
//!
//! ```rust
//! use arri_schema::app::{AppDefinitionBuilder, Procedure};
//! use arri_schema::Schema;
//!
//! let app = AppDefinitionBuilder::new()
//!     .procedure(
//!         "users.getUser",
//!         Procedure::http()
//!             .params(Schema::object([("id", Schema::string().into())]))
//!             .response(Schema::object([("name", Schema::string().into())]).with_id("User")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let rpc = &app.procedures["users.getUser"];
//! assert_eq!(rpc.path, "/users/get-user");
//! assert_eq!(rpc.input.as_deref(), Some("UsersGetUserParams"));
//! assert_eq!(rpc.output.as_deref(), Some("User"));
//! ```

use std::collections::BTreeSet;
use std::sync::OnceLock;

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::error::{SchemaError, SchemaResult};
use crate::registry::Definitions;
use crate::schema::{Schema, SchemaForm};
use crate::validator::{check_schema, Validator};

/// Version written into every assembled document.
pub const SCHEMA_VERSION: &str = "0.0.8";

/// Plain request/response transport.
pub const HTTP: &str = "http";

/// WebSocket transport.
pub const WS: &str = "ws";

/// Errors raised while assembling an [`AppDefinition`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssembleError {
    #[error("Invalid procedure name '{0}': expected dot-separated identifiers")]
    InvalidName(String),

    #[error("Definition '{name}' is declared twice with different schemas")]
    ConflictingDefinition { name: String },

    #[error("Procedure '{procedure}' refers to unknown type '{name}'")]
    UnresolvedRef { procedure: String, name: String },

    #[error("Parameters of '{procedure}' must be an object schema")]
    NonObjectParams { procedure: String },

    #[error("Standalone definitions need an id")]
    MissingId,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// HTTP verb for procedures served over [`HTTP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }
}

/// Descriptive information about the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One procedure as written into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcDefinition {
    pub transports: BTreeSet<String>,

    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,

    /// Name of the parameter type in `definitions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub input_is_stream: bool,

    /// Name of the response type in `definitions`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub output_is_stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deprecated: bool,
}

impl RpcDefinition {
    pub fn uses(&self, transport: &str) -> bool {
        self.transports.contains(transport)
    }
}

/// The assembled document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    pub schema_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<AppInfo>,

    pub transports: BTreeSet<String>,

    pub procedures: IndexMap<String, RpcDefinition>,

    pub definitions: IndexMap<String, Schema>,
}

impl AppDefinition {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// The definitions as a ref-resolution table.
    pub fn definition_table(&self) -> Definitions {
        Definitions::from(self.definitions.clone())
    }

    /// A validator for the named definition, resolving refs across the document.
    pub fn validator(&self, name: &str) -> SchemaResult<Validator> {
        let schema = self
            .definitions
            .get(name)
            .ok_or_else(|| SchemaError::UnresolvedRef(name.to_string()))?;
        self.definition_table().validator(schema)
    }
}

/// Declaration of one procedure on an [`AppDefinitionBuilder`].
#[derive(Debug, Clone, Default)]
pub struct Procedure {
    transports: BTreeSet<String>,
    method: Option<HttpMethod>,
    path: Option<String>,
    params: Option<Schema>,
    params_stream: bool,
    response: Option<Schema>,
    response_stream: bool,
    description: Option<String>,
    deprecated: bool,
}

impl Procedure {
    /// A procedure served over HTTP.
    pub fn http() -> Self {
        Self::default().transport(HTTP)
    }

    /// A procedure served over a WebSocket.
    pub fn ws() -> Self {
        Self::default().transport(WS)
    }

    pub fn transport(mut self, transport: impl Into<String>) -> Self {
        self.transports.insert(transport.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Override the derived URL path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn params(mut self, schema: Schema) -> Self {
        self.params = Some(schema);
        self
    }

    pub fn response(mut self, schema: Schema) -> Self {
        self.response = Some(schema);
        self
    }

    /// Parameters arrive as a stream of messages.
    pub fn stream_params(mut self) -> Self {
        self.params_stream = true;
        self
    }

    /// Responses are sent as a stream of events.
    pub fn stream_response(mut self) -> Self {
        self.response_stream = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }
}

/// Collects procedures and standalone models, then assembles them.
#[derive(Debug, Clone, Default)]
pub struct AppDefinitionBuilder {
    info: Option<AppInfo>,
    procedures: IndexMap<String, Procedure>,
    models: Vec<Schema>,
    registry: Definitions,
}

impl AppDefinitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(mut self, info: AppInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Register a procedure. A later declaration under the same name replaces it.
    pub fn procedure(mut self, name: impl Into<String>, procedure: Procedure) -> Self {
        self.procedures.insert(name.into(), procedure);
        self
    }

    /// Merge another builder's procedures under `namespace`.
    pub fn merge(mut self, namespace: &str, other: AppDefinitionBuilder) -> Self {
        for (name, procedure) in other.procedures {
            let full = if namespace.is_empty() {
                name
            } else {
                format!("{}.{}", namespace, name)
            };
            self.procedures.insert(full, procedure);
        }
        self.models.extend(other.models);
        self.registry = self.registry.merged(other.registry.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Add a named model that no procedure needs to reference.
    pub fn definition(mut self, schema: Schema) -> Self {
        self.models.push(schema);
        self
    }

    /// Resolve refs not found inside the declared schemas against `definitions`.
    pub fn definitions(mut self, definitions: Definitions) -> Self {
        self.registry = definitions;
        self
    }

    pub fn build(self) -> Result<AppDefinition, AssembleError> {
        let mut assembler = Assembler {
            registry: &self.registry,
            definitions: IndexMap::new(),
            inline: IndexMap::new(),
        };

        let mut names: Vec<&String> = self.procedures.keys().collect();
        names.sort();

        let mut transports = BTreeSet::new();
        let mut procedures = IndexMap::with_capacity(names.len());
        for name in names {
            let procedure = &self.procedures[name];
            let rpc = assembler.procedure(name, procedure)?;
            transports.extend(rpc.transports.iter().cloned());
            procedures.insert(name.clone(), rpc);
        }

        for model in &self.models {
            let id = model.id().ok_or(AssembleError::MissingId)?.to_string();
            assembler.hoist(&id, model.clone(), "")?;
        }

        let definitions = assembler.definitions;
        let table = Definitions::from(definitions.clone());
        for schema in definitions.values() {
            check_schema(schema, &table)?;
        }

        debug!(
            procedures = procedures.len(),
            definitions = definitions.len(),
            "Assembled app definition"
        );
        Ok(AppDefinition {
            schema_version: SCHEMA_VERSION.to_string(),
            info: self.info,
            transports,
            procedures,
            definitions,
        })
    }
}

struct Assembler<'a> {
    registry: &'a Definitions,
    definitions: IndexMap<String, Schema>,
    /// Id'd nodes seen nested inside hoisted schemas
    inline: IndexMap<String, Schema>,
}

impl Assembler<'_> {
    fn procedure(
        &mut self,
        name: &str,
        procedure: &Procedure,
    ) -> Result<RpcDefinition, AssembleError> {
        if !is_valid_name(name) {
            return Err(AssembleError::InvalidName(name.to_string()));
        }
        let pascal = pascal_name(name);

        let input = match &procedure.params {
            Some(schema) => {
                let input = self.hoist_root(schema, format!("{}Params", pascal), name)?;
                let is_object = self.definitions.get(&input).map_or(false, |s| {
                    s.is_adapted() || matches!(s.form, SchemaForm::Properties(_))
                });
                if !is_object {
                    return Err(AssembleError::NonObjectParams {
                        procedure: name.to_string(),
                    });
                }
                Some(input)
            }
            None => None,
        };
        let output = match &procedure.response {
            Some(schema) => Some(self.hoist_root(schema, format!("{}Response", pascal), name)?),
            None => None,
        };

        let transports = if procedure.transports.is_empty() {
            BTreeSet::from([HTTP.to_string()])
        } else {
            procedure.transports.clone()
        };
        let method = transports
            .contains(HTTP)
            .then(|| procedure.method.unwrap_or_default());
        let path = procedure.path.clone().unwrap_or_else(|| derive_path(name));
        trace!(procedure = %name, path = %path, "Assembled procedure");

        Ok(RpcDefinition {
            transports,
            path,
            method,
            input,
            input_is_stream: procedure.params_stream,
            output,
            output_is_stream: procedure.response_stream,
            description: procedure.description.clone(),
            is_deprecated: procedure.deprecated,
        })
    }

    /// Hoist a parameter or response schema, returning its definition name.
    fn hoist_root(
        &mut self,
        schema: &Schema,
        fallback: String,
        procedure: &str,
    ) -> Result<String, AssembleError> {
        if let SchemaForm::Ref(name) = &schema.form {
            if !schema.nullable {
                self.require(name, procedure)?;
                return Ok(name.clone());
            }
        }
        let name = schema.id().map(str::to_string).unwrap_or(fallback);
        let mut schema = schema.clone();
        schema.metadata.id = Some(name.clone());
        self.hoist(&name, schema, procedure)?;
        Ok(name)
    }

    /// Insert a definition and everything it refers to.
    fn hoist(&mut self, name: &str, schema: Schema, procedure: &str) -> Result<(), AssembleError> {
        match self.definitions.get(name) {
            Some(existing) if *existing == schema => return Ok(()),
            Some(_) => {
                return Err(AssembleError::ConflictingDefinition {
                    name: name.to_string(),
                })
            }
            None => {}
        }
        schema.walk(&mut |node| {
            if let Some(id) = node.id() {
                self.inline.entry(id.to_string()).or_insert_with(|| node.clone());
            }
        });
        let refs = schema.references();
        self.definitions.insert(name.to_string(), schema);
        for reference in refs {
            self.require(&reference, procedure)?;
        }
        Ok(())
    }

    /// Make sure `name` is defined, hoisting it from nested ids or the registry.
    fn require(&mut self, name: &str, procedure: &str) -> Result<(), AssembleError> {
        if self.definitions.contains_key(name) {
            return Ok(());
        }
        let found = self
            .inline
            .get(name)
            .or_else(|| self.registry.get(name))
            .cloned();
        match found {
            Some(schema) => self.hoist(name, schema, procedure),
            None => Err(AssembleError::UnresolvedRef {
                procedure: procedure.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

fn name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").ok())
        .as_ref()
}

fn is_valid_name(name: &str) -> bool {
    name_pattern().map_or(false, |re| re.is_match(name))
}

/// `users.getUser` → `UsersGetUser`
pub fn pascal_name(name: &str) -> String {
    name.split('.').map(|part| part.to_case(Case::Pascal)).collect()
}

/// `users.getUser` → `/users/get-user`
pub fn derive_path(name: &str) -> String {
    name.split('.')
        .map(|part| format!("/{}", part.to_case(Case::Kebab)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::value::Value;

    fn user() -> Schema {
        Schema::object([
            ("id", Schema::string().into()),
            ("name", Schema::string().into()),
        ])
        .with_id("User")
    }

    // =========================================================================
    // Naming
    // =========================================================================

    #[test]
    fn test_derived_names_and_paths() {
        assert_eq!(pascal_name("users.getUser"), "UsersGetUser");
        assert_eq!(derive_path("users.getUser"), "/users/get-user");
        assert_eq!(derive_path("sayHello"), "/say-hello");
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("users.getUser"));
        assert!(is_valid_name("_private.v2"));
        assert!(!is_valid_name("users..get"));
        assert!(!is_valid_name("users.get-user"));
        assert!(!is_valid_name("2fa.verify"));

        let err = AppDefinitionBuilder::new()
            .procedure("bad name", Procedure::http())
            .build()
            .unwrap_err();
        assert_eq!(err, AssembleError::InvalidName("bad name".into()));
    }

    // =========================================================================
    // Hoisting
    // =========================================================================

    #[test]
    fn test_procedures_sorted_and_defaults_applied() {
        let app = AppDefinitionBuilder::new()
            .procedure("users.updateUser", Procedure::http().params(user()))
            .procedure(
                "users.getUser",
                Procedure::http()
                    .method(HttpMethod::Get)
                    .params(Schema::object([("id", Schema::string().into())]))
                    .response(user()),
            )
            .build()
            .unwrap();

        assert_eq!(app.schema_version, SCHEMA_VERSION);
        assert_eq!(
            app.procedures.keys().collect::<Vec<_>>(),
            vec!["users.getUser", "users.updateUser"]
        );
        let get = &app.procedures["users.getUser"];
        assert_eq!(get.method, Some(HttpMethod::Get));
        assert_eq!(get.input.as_deref(), Some("UsersGetUserParams"));
        let update = &app.procedures["users.updateUser"];
        assert_eq!(update.method, Some(HttpMethod::Post));
        assert_eq!(update.input.as_deref(), Some("User"));
        assert_eq!(
            app.definitions.keys().collect::<Vec<_>>(),
            vec!["UsersGetUserParams", "User"]
        );
        assert_eq!(app.definitions["UsersGetUserParams"].id(), Some("UsersGetUserParams"));
    }

    #[test]
    fn test_ws_procedure_has_no_method() {
        let app = AppDefinitionBuilder::new()
            .procedure("chat", Procedure::ws().response(user()).stream_response())
            .build()
            .unwrap();
        let rpc = &app.procedures["chat"];
        assert_eq!(rpc.method, None);
        assert!(rpc.output_is_stream);
        assert_eq!(app.transports, BTreeSet::from([WS.to_string()]));
    }

    #[test]
    fn test_conflicting_definitions_rejected() {
        let other_user = Schema::object([("email", Schema::string().into())]).with_id("User");
        let err = AppDefinitionBuilder::new()
            .procedure("a", Procedure::http().response(user()))
            .procedure("b", Procedure::http().response(other_user))
            .build()
            .unwrap_err();
        assert_eq!(err, AssembleError::ConflictingDefinition { name: "User".into() });
    }

    #[test]
    fn test_non_object_params_rejected() {
        let err = AppDefinitionBuilder::new()
            .procedure("a", Procedure::http().params(Schema::string()))
            .build()
            .unwrap_err();
        assert_eq!(err, AssembleError::NonObjectParams { procedure: "a".into() });
    }

    #[test]
    fn test_nested_ids_hoisted_for_refs() {
        let mut registry = TypeRegistry::new();
        let tree = registry
            .recursive("Tree", |node| {
                Schema::object([("children", Schema::array(node).into())])
            })
            .unwrap();
        let app = AppDefinitionBuilder::new()
            .procedure("trees.get", Procedure::http().response(tree))
            .definitions(registry.finish().unwrap())
            .build()
            .unwrap();
        assert_eq!(app.procedures["trees.get"].output.as_deref(), Some("Tree"));
        assert_eq!(app.definitions.len(), 1);

        let validator = app.validator("Tree").unwrap();
        let value = Value::object([("children", Value::array([]))]);
        assert!(validator.validate(&value));
    }

    #[test]
    fn test_unresolved_ref_names_procedure() {
        let err = AppDefinitionBuilder::new()
            .procedure(
                "a",
                Procedure::http().response(Schema::object([("x", Schema::reference("Missing").into())])),
            )
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            AssembleError::UnresolvedRef {
                procedure: "a".into(),
                name: "Missing".into()
            }
        );
    }

    #[test]
    fn test_merge_namespaces() {
        let users = AppDefinitionBuilder::new().procedure("get", Procedure::http().response(user()));
        let app = AppDefinitionBuilder::new().merge("users", users).build().unwrap();
        assert!(app.procedures.contains_key("users.get"));
    }

    // =========================================================================
    // Document
    // =========================================================================

    #[test]
    fn test_document_json_round_trip() {
        let app = AppDefinitionBuilder::new()
            .info(AppInfo {
                name: Some("demo".into()),
                ..Default::default()
            })
            .procedure("users.getUser", Procedure::http().response(user()).description("Fetch"))
            .definition(Schema::enumeration(["A", "B"]).with_id("Letter"))
            .build()
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&app.to_json()).unwrap();
        assert_eq!(json["schemaVersion"], "0.0.8");
        assert_eq!(json["transports"], serde_json::json!(["http"]));
        assert_eq!(
            json["procedures"]["users.getUser"],
            serde_json::json!({
                "transports": ["http"],
                "path": "/users/get-user",
                "method": "post",
                "output": "User",
                "description": "Fetch"
            })
        );
        assert_eq!(json["definitions"]["Letter"]["enum"], serde_json::json!(["A", "B"]));

        let decoded = AppDefinition::from_json(&app.to_json()).unwrap();
        assert_eq!(decoded, app);
    }
}
