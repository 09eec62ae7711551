//! Error types for code generation.
//!
//! Generation fails on naming collisions and on references that can never
//! be resolved. Everything a backend cannot represent faithfully is a
//! [`CodegenWarning`] instead: the run continues with a dynamic fallback.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for generation runs.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// Fatal errors of a generation run.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Two different schema nodes resolve to the same type name.
    #[error("Type name '{name}' is generated for both {first_path} and {second_path}")]
    NamingCollision {
        name: String,
        first_path: String,
        second_path: String,
    },

    /// A `ref` names a type that is not defined.
    #[error("Reference to undefined type '{name}' at {path}")]
    UnresolvedRef { name: String, path: String },

    /// A chain of references loops back on itself without passing through a
    /// declared type.
    #[error("Recursive reference '{name}' at {path} never reaches a declared type")]
    UnresolvableCycle { name: String, path: String },

    /// No backend is registered under the requested name.
    #[error("Unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A schema shape the backend replaced with its dynamic type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenWarning {
    /// Instance path of the offending node
    pub path: String,
    pub reason: String,
}

impl CodegenWarning {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CodegenWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Error loading a codegen configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {message}")]
    InvalidToml { path: PathBuf, message: String },

    /// A target names a backend that is not registered.
    #[error("Target '{output}' uses unknown backend '{backend}'")]
    UnknownBackend { output: String, backend: String },

    #[error("Configuration has no targets")]
    NoTargets,
}
