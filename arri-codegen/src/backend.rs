//! Backends and the backend registry.

use std::sync::{OnceLock, PoisonError, RwLock};

use arri_schema::app::HttpMethod;
use arri_schema::{RpcDefinition, Schema, SchemaForm};

use crate::error::CodegenResult;
use crate::framework::{GenerationRun, TypeEmitter};
use crate::generated::GeneratedType;
use crate::service::ServiceTree;

/// A target language.
///
/// A backend maps the schema forms to native types through its
/// [`TypeEmitter`] half and lays out the client around them.
///
/// # Implementing Custom Backends
///
/// ```ignore
/// use arri_codegen::{register_backend, Backend};
///
/// struct Elm;
///
/// impl TypeEmitter for Elm { /* ... */ }
///
/// impl Backend for Elm {
///     fn name(&self) -> &'static str { "elm" }
///     fn language(&self) -> &'static str { "elm" }
///     fn extension(&self) -> &'static str { "elm" }
///     fn preamble(&self, run: &GenerationRun) -> String { /* ... */ }
///     fn client(&self, run: &mut GenerationRun, services: &ServiceTree) -> CodegenResult<String> { /* ... */ }
/// }
///
/// static ELM: Elm = Elm;
/// register_backend(&ELM);
/// ```
pub trait Backend: TypeEmitter + Send + Sync {
    /// Unique backend identifier, e.g. `typescript`.
    fn name(&self) -> &'static str;

    fn language(&self) -> &'static str;

    /// File extension for generated code, e.g. `ts`.
    fn extension(&self) -> &'static str;

    /// File header, imports and the transport contract.
    fn preamble(&self, run: &GenerationRun) -> String;

    /// The client and one service per namespace.
    fn client(&self, run: &mut GenerationRun, services: &ServiceTree) -> CodegenResult<String>;
}

/// Parameter and response types of one procedure.
#[derive(Debug, Clone)]
pub struct ProcedureTypes {
    pub params: Option<GeneratedType>,
    pub response: Option<GeneratedType>,
    /// Parameters go in the query string rather than the body
    pub params_in_query: bool,
}

/// Generate the parameter and response types a procedure refers to.
pub fn procedure_types<B>(
    backend: &B,
    run: &mut GenerationRun,
    rpc: &RpcDefinition,
) -> CodegenResult<ProcedureTypes>
where
    B: Backend + ?Sized,
{
    let ctx = run.root_context();
    let params = match &rpc.input {
        Some(name) => Some(run.generate_type(backend, &ctx, &Schema::reference(name))?),
        None => None,
    };
    let response = match &rpc.output {
        Some(name) => Some(run.generate_type(backend, &ctx, &Schema::reference(name))?),
        None => None,
    };
    let params_are_object = rpc
        .input
        .as_deref()
        .and_then(|name| run.definitions().get(name))
        .is_some_and(|schema| matches!(schema.form, SchemaForm::Properties(_)));
    Ok(ProcedureTypes {
        params,
        response,
        params_in_query: params_are_object && rpc.method == Some(HttpMethod::Get),
    })
}

/// Whether a procedure answers with a stream of messages.
pub fn is_streaming(rpc: &RpcDefinition) -> bool {
    rpc.output_is_stream || rpc.input_is_stream || rpc.uses(arri_schema::app::WS)
}

/// The transport a generated call goes through: `http` unless only `ws`
/// is offered.
pub fn primary_transport(rpc: &RpcDefinition) -> &str {
    if rpc.uses(arri_schema::app::HTTP) {
        arri_schema::app::HTTP
    } else {
        rpc.transports
            .iter()
            .next()
            .map(String::as_str)
            .unwrap_or(arri_schema::app::HTTP)
    }
}

// =============================================================================
// Registry
// =============================================================================

static BACKENDS: RwLock<Vec<&'static dyn Backend>> = RwLock::new(Vec::new());
static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Register a custom backend.
///
/// Built-in backends are registered automatically on first use. A custom
/// backend with the name of an earlier one shadows nothing: lookups return
/// the first registration.
pub fn register_backend(backend: &'static dyn Backend) {
    init_builtin();
    BACKENDS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(backend);
}

fn init_builtin() {
    INITIALIZED.get_or_init(|| {
        let mut backends = BACKENDS.write().unwrap_or_else(PoisonError::into_inner);

        #[cfg(feature = "backend-typescript")]
        backends.push(&crate::typescript::TYPESCRIPT_BACKEND);

        #[cfg(feature = "backend-dart")]
        backends.push(&crate::dart::DART_BACKEND);

        #[cfg(feature = "backend-kotlin")]
        backends.push(&crate::kotlin::KOTLIN_BACKEND);

        #[cfg(feature = "backend-rust")]
        backends.push(&crate::rust::RUST_BACKEND);

        #[cfg(feature = "backend-swift")]
        backends.push(&crate::swift::SWIFT_BACKEND);
    });
}

fn with_backends<T>(f: impl FnOnce(&[&'static dyn Backend]) -> T) -> T {
    init_builtin();
    let backends = BACKENDS.read().unwrap_or_else(PoisonError::into_inner);
    f(&backends)
}

/// Get a backend by name.
pub fn get_backend(name: &str) -> Option<&'static dyn Backend> {
    with_backends(|all| all.iter().find(|b| b.name() == name).copied())
}

/// Get all backends for a language.
pub fn backends_for_language(language: &str) -> Vec<&'static dyn Backend> {
    with_backends(|all| {
        all.iter()
            .filter(|b| b.language() == language)
            .copied()
            .collect()
    })
}

/// List all registered backends.
pub fn backends() -> Vec<&'static dyn Backend> {
    with_backends(|all| all.to_vec())
}

/// List all registered backend names.
pub fn backend_names() -> Vec<&'static str> {
    with_backends(|all| all.iter().map(|b| b.name()).collect())
}
