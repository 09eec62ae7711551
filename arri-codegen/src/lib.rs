//! # arri-codegen
//!
//! Client generation from an Arri [`AppDefinition`]: one file per target
//! language holding a model type per definition, a service per procedure
//! namespace and a method per procedure calling an injected transport.
//!
//! ## Quick Start
//!
//! ```rust
//! use arri_codegen::{generate, GeneratorConfig, TYPESCRIPT_BACKEND};
//! use arri_schema::{AppDefinitionBuilder, Procedure, Schema};
//!
//! let user = Schema::object([("id", Schema::string().into())]).with_id("User");
//! let params = Schema::object([("id", Schema::string().into())]).with_id("GetUserParams");
//! let app = AppDefinitionBuilder::new()
//!     .procedure("users.getUser", Procedure::http().params(params).response(user))
//!     .build()
//!     .unwrap();
//!
//! let file = generate(&TYPESCRIPT_BACKEND, &app, &GeneratorConfig::default()).unwrap();
//! assert!(file.code.contains("export interface User {"));
//! assert!(file.warnings.is_empty());
//! ```
//!
//! ## Architecture
//!
//! - [`framework`] - the schema traversal shared by every backend
//! - [`naming`] - path-derived type names and the per-run registry
//! - [`context`] - per-node traversal context
//! - [`service`] - procedure namespaces as a service tree
//! - [`backend`] - the [`Backend`] trait and the backend registry
//! - [`config`] - run options and the `arri.toml` target file
//! - [`generated`] - generated fragments and the code writer
//! - [`error`] - error and warning types
//!
//! Each built-in backend sits behind a cargo feature of the same name
//! (`backend-typescript`, `backend-dart`, `backend-kotlin`, `backend-rust`,
//! `backend-swift`), all enabled by default.

use std::path::{Path, PathBuf};

use arri_schema::{AppDefinition, Definitions};
use tracing::{debug, info};

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod framework;
pub mod generated;
pub mod naming;
pub mod service;

#[cfg(feature = "backend-dart")]
pub mod dart;
#[cfg(feature = "backend-kotlin")]
pub mod kotlin;
#[cfg(feature = "backend-rust")]
pub mod rust;
#[cfg(feature = "backend-swift")]
pub mod swift;
#[cfg(feature = "backend-typescript")]
pub mod typescript;

// Re-export main types for convenience
pub use backend::{
    backend_names, backends, backends_for_language, get_backend, register_backend, Backend,
};
pub use config::{CodegenConfig, GeneratorConfig, IndentStyle, LineEnding, TargetConfig};
pub use context::GeneratorContext;
pub use error::{CodegenError, CodegenResult, CodegenWarning, ConfigError};
pub use framework::{GenerationRun, TypeEmitter};
pub use generated::{Declaration, GeneratedFile, GeneratedType};
pub use service::ServiceTree;

#[cfg(feature = "backend-dart")]
pub use dart::DART_BACKEND;
#[cfg(feature = "backend-kotlin")]
pub use kotlin::KOTLIN_BACKEND;
#[cfg(feature = "backend-rust")]
pub use rust::RUST_BACKEND;
#[cfg(feature = "backend-swift")]
pub use swift::SWIFT_BACKEND;
#[cfg(feature = "backend-typescript")]
pub use typescript::TYPESCRIPT_BACKEND;

/// Generate the client file for `app`.
///
/// The file holds the backend preamble, the client services and every
/// declaration, in that order.
pub fn generate(
    backend: &dyn Backend,
    app: &AppDefinition,
    config: &GeneratorConfig,
) -> CodegenResult<GeneratedFile> {
    let mut run = GenerationRun::new(config, app.definition_table());
    let declarations = run.generate_definitions(backend)?;
    let services = ServiceTree::from_procedures(&app.procedures);
    let client = backend.client(&mut run, &services)?;

    debug!(
        backend = backend.name(),
        declarations = declarations.len(),
        procedures = app.procedures.len(),
        "Generated client"
    );

    let mut sections = vec![backend.preamble(&run), client];
    sections.extend(declarations.into_iter().map(|d| d.code));
    Ok(finish(sections, config, run))
}

/// Generate declarations for `definitions` only, without a client.
pub fn generate_models(
    backend: &dyn Backend,
    definitions: Definitions,
    config: &GeneratorConfig,
) -> CodegenResult<GeneratedFile> {
    let mut run = GenerationRun::new(config, definitions);
    let declarations = run.generate_definitions(backend)?;

    let mut sections = vec![backend.preamble(&run)];
    sections.extend(declarations.into_iter().map(|d| d.code));
    Ok(finish(sections, config, run))
}

fn finish(sections: Vec<String>, config: &GeneratorConfig, run: GenerationRun) -> GeneratedFile {
    let code: Vec<String> = sections
        .into_iter()
        .filter(|section| !section.trim().is_empty())
        .map(|section| section.trim_end().to_string())
        .collect();
    let mut code = code.join("\n\n");
    code.push('\n');
    GeneratedFile {
        code: config.line_ending.apply(code),
        warnings: run.into_warnings(),
    }
}

/// Run every target of `config` against `app`.
///
/// Targets run on their own threads. Results come back in target order,
/// paired with each target's output path.
pub fn generate_all(
    app: &AppDefinition,
    config: &CodegenConfig,
) -> CodegenResult<Vec<(PathBuf, GeneratedFile)>> {
    let targets = config
        .targets
        .iter()
        .map(|target| {
            get_backend(&target.backend)
                .map(|backend| (target, backend))
                .ok_or_else(|| CodegenError::UnknownBackend(target.backend.clone()))
        })
        .collect::<CodegenResult<Vec<_>>>()?;

    std::thread::scope(|scope| {
        let handles: Vec<_> = targets
            .iter()
            .map(|&(target, backend)| {
                let options = target.generator_config();
                scope.spawn(move || generate(backend, app, &options))
            })
            .collect();

        handles
            .into_iter()
            .zip(&targets)
            .map(|(handle, (target, _))| -> CodegenResult<(PathBuf, GeneratedFile)> {
                let file = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
                Ok((target.output.clone(), file))
            })
            .collect()
    })
}

/// Write generated files, creating parent directories as needed.
pub fn write_outputs(outputs: &[(PathBuf, GeneratedFile)]) -> CodegenResult<()> {
    for (path, file) in outputs {
        write_file(path, &file.code)?;
        for warning in &file.warnings {
            info!(output = %path.display(), %warning, "Generated with fallback type");
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> CodegenResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| CodegenError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    std::fs::write(path, content).map_err(|source| CodegenError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "Wrote generated file");
    Ok(())
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use arri_schema::{AppDefinitionBuilder, Procedure, Property, Schema};
    use proptest::prelude::*;

    fn app(fields: &[String]) -> AppDefinition {
        let item = Schema::object(fields.iter().map(|key| {
            let inner: Property = Schema::object([("n1", Schema::int32().into())]).into();
            let nested: Property =
                Schema::object([("n1", Schema::int32().into()), (key.as_str(), inner)]).into();
            (key.as_str(), nested)
        }))
        .with_id("Item");
        let params = Schema::object([("id", Schema::string().into())]).with_id("ItemsGetParams");
        AppDefinitionBuilder::new()
            .procedure("items.get", Procedure::http().params(params).response(item))
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn generation_is_deterministic(
            fields in proptest::collection::btree_set("[a-zA-Z_]{1,6}", 1..5),
        ) {
            let fields: Vec<String> = fields.into_iter().collect();
            let app = app(&fields);
            for backend in backends() {
                let first = generate(backend, &app, &GeneratorConfig::default()).unwrap();
                let second = generate(backend, &app, &GeneratorConfig::default()).unwrap();
                prop_assert_eq!(first, second);
            }
        }

        #[test]
        fn nested_objects_get_distinct_names(
            fields in proptest::collection::btree_set("[a-zA-Z_]{1,6}", 2..6),
        ) {
            let fields: Vec<String> = fields.into_iter().collect();
            let app = app(&fields);
            let mut run = GenerationRun::new(&GeneratorConfig::default(), app.definition_table());
            let declarations = run.generate_definitions(&TYPESCRIPT_BACKEND).unwrap();
            let mut names: Vec<_> = declarations.iter().map(|d| d.name.clone()).collect();
            let count = names.len();
            names.sort();
            names.dedup();
            prop_assert_eq!(names.len(), count);
            // Two per field, plus Item and ItemsGetParams.
            prop_assert_eq!(count, fields.len() * 2 + 2);
        }
    }
}
