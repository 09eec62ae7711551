//! # arri-schema
//!
//! Arri Type Definitions: a JTD-like schema IR, the engine that validates,
//! parses, serializes and coerces values against it, and the assembler that
//! turns RPC procedures into an [`AppDefinition`].
//!
//! ## Quick Start
//!
//! ```rust
//! use arri_schema::{Schema, Validator, Value};
//!
//! let user = Schema::object([
//!     ("id", Schema::string().into()),
//!     ("followers", Schema::uint64().into()),
//!     ("bio", Schema::string().nullable().optional()),
//! ])
//! .with_id("User");
//!
//! let validator = Validator::new(user).unwrap();
//! let parsed = validator.parse(r#"{"id":"1","followers":"18446744073709551615"}"#).unwrap();
//! assert_eq!(parsed.get("followers"), Some(&Value::UInt(u64::MAX)));
//! assert_eq!(
//!     validator.serialize(&parsed).unwrap(),
//!     r#"{"id":"1","followers":"18446744073709551615"}"#
//! );
//! ```
//!
//! ## Schema Forms
//!
//! | Form | Constructor | JSON key |
//! |------|-------------|----------|
//! | empty | [`Schema::any`] | none |
//! | scalar | [`Schema::string`], [`Schema::int64`], ... | `type` |
//! | enum | [`Schema::enumeration`] | `enum` |
//! | array | [`Schema::array`] | `elements` |
//! | object | [`Schema::object`] | `properties`, `optionalProperties` |
//! | record | [`Schema::record`] | `values` |
//! | tagged union | [`Schema::discriminator`] | `discriminator`, `mapping` |
//! | reference | [`Schema::reference`] | `ref` |
//!
//! Recursive schemas are built through a [`TypeRegistry`].
//!
//! ## Modules
//!
//! - [`schema`]: the IR and its builder
//! - [`wire`]: the per-scalar wire rules shared by every validation path
//! - [`validator`]: the interpreter
//! - [`compiled`]: the closure-compiled fast path
//! - [`adapter`]: external validators and JSON Schema import
//! - [`app`]: the AppDefinition document

pub mod adapter;
pub mod app;
pub mod compiled;
pub mod error;
mod pointer;
pub mod registry;
pub mod schema;
pub mod validator;
pub mod value;
pub mod wire;

pub use adapter::{adapt, SchemaAdapter};
pub use app::{AppDefinition, AppDefinitionBuilder, AssembleError, Procedure, RpcDefinition};
pub use compiled::{CompiledValidator, Rejected};
pub use error::{
    DecodeError, Diagnostic, ParseError, SchemaError, SchemaResult, ValidationError,
};
pub use registry::{Definitions, TypeRegistry};
pub use schema::{Metadata, Property, ScalarType, Schema, SchemaForm};
pub use validator::Validator;
pub use value::Value;
