//! Error types for schema construction, decoding and validation.
//!
//! The validation engine separates three failure classes:
//!
//! - [`DecodeError`]: the input text is not JSON at all.
//! - [`ValidationError`]: the input is JSON but does not fit the schema. It
//!   carries one or more [`Diagnostic`]s.
//! - [`SchemaError`]: the schema itself is malformed. This is a programmer
//!   error and is raised when a validator is built, never while checking
//!   values.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A single structural mismatch between a value and a schema.
///
/// Both paths are '/'-delimited JSON pointers. `instance_path` points into
/// the value, `schema_path` into the schema IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub message: String,
    pub instance_path: String,
    pub schema_path: String,
}

impl Diagnostic {
    pub fn new(
        message: impl Into<String>,
        instance_path: impl Into<String>,
        schema_path: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            instance_path: instance_path.into(),
            schema_path: schema_path.into(),
        }
    }

    /// Prefix both paths, used when a nested result is lifted into its parent.
    pub fn prefixed(mut self, instance_prefix: &str, schema_prefix: &str) -> Self {
        self.instance_path = format!("{}{}", instance_prefix, self.instance_path);
        self.schema_path = format!("{}{}", schema_prefix, self.schema_path);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.instance_path.is_empty() {
            "/"
        } else {
            &self.instance_path
        };
        write!(f, "{} at {} (schema {})", self.message, at, self.schema_path)
    }
}

/// The input string could not be decoded as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid JSON at line {line}, column {column}: {message}")]
pub struct DecodeError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

/// A value did not match its schema.
///
/// Always holds at least one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    diagnostics: Vec<Diagnostic>,
}

impl ValidationError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        debug_assert!(!diagnostics.is_empty());
        Self { diagnostics }
    }

    pub fn single(diagnostic: Diagnostic) -> Self {
        Self {
            diagnostics: vec![diagnostic],
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.diagnostics.as_slice() {
            [] => write!(f, "Validation failed"),
            [only] => write!(f, "Validation failed: {}", only),
            [first, rest @ ..] => write!(
                f,
                "Validation failed: {} (and {} more)",
                first,
                rest.len()
            ),
        }
    }
}

/// Failure of `parse` when given JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ParseError {
    /// Diagnostics of a validation failure; empty for decode failures.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ParseError::Decode(_) => &[],
            ParseError::Validation(err) => err.diagnostics(),
        }
    }
}

/// Malformed schema IR or misuse of the schema builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A `ref` names a schema that no definitions table contains.
    #[error("Unresolved schema reference '{0}'")]
    UnresolvedRef(String),

    /// A chain of refs that only ever points at other refs.
    #[error("Schema reference '{0}' never resolves to a concrete schema")]
    CyclicRef(String),

    /// A discriminator mapping entry is not a properties schema.
    #[error("Discriminator mapping entry '{tag}' must be a properties schema")]
    InvalidMapping { tag: String },

    /// A discriminator mapping entry is nullable.
    #[error("Discriminator mapping entry '{tag}' must not be nullable")]
    NullableMapping { tag: String },

    /// A discriminator variant declares the tag field itself.
    #[error("Discriminator mapping entry '{tag}' redeclares the tag field '{field}'")]
    TagRedeclared { tag: String, field: String },

    /// A key appears in both the required and the optional property map.
    #[error("Property '{key}' is declared as both required and optional")]
    OverlappingProperty { key: String },

    /// An enum lists the same variant twice.
    #[error("Duplicate enum variant '{0}'")]
    DuplicateEnumVariant(String),

    /// An object-only builder operation was applied to another form.
    #[error("'{operation}' requires a properties schema")]
    NotAnObject { operation: &'static str },

    /// An operation that needs a named schema got an anonymous one.
    #[error("'{operation}' requires a schema with an id")]
    MissingId { operation: &'static str },

    /// `pick`/`omit` named a key the object does not declare.
    #[error("'{operation}' names unknown property '{key}'")]
    UnknownProperty {
        operation: &'static str,
        key: String,
    },

    /// The same id was registered twice in one registry.
    #[error("Schema id '{0}' is already registered")]
    DuplicateId(String),

    /// A recursive placeholder was never given a body.
    #[error("Recursive schema '{0}' was never resolved")]
    UnresolvedRecursive(String),

    /// The JSON encoding of a schema is not one of the eight forms.
    #[error("Invalid schema encoding: {0}")]
    InvalidEncoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new("expected string", "/name", "/properties/name/type");
        assert_eq!(
            diag.to_string(),
            "expected string at /name (schema /properties/name/type)"
        );

        let root = Diagnostic::new("expected object", "", "/properties");
        assert!(root.to_string().contains("at /"));
    }

    #[test]
    fn test_diagnostic_prefixed() {
        let diag = Diagnostic::new("expected int8", "/value", "/properties/value/type")
            .prefixed("/left", "/definitions/Tree");
        assert_eq!(diag.instance_path, "/left/value");
        assert_eq!(diag.schema_path, "/definitions/Tree/properties/value/type");
    }

    #[test]
    fn test_diagnostic_serializes_camel_case() {
        let diag = Diagnostic::new("m", "/a", "/type");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["instancePath"], "/a");
        assert_eq!(json["schemaPath"], "/type");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(vec![
            Diagnostic::new("a", "/x", "/type"),
            Diagnostic::new("b", "/y", "/type"),
        ]);
        assert!(err.to_string().contains("and 1 more"));
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn test_decode_error_from_serde() {
        let err: DecodeError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.line, 1);
        assert!(err.to_string().starts_with("Invalid JSON"));
    }

    #[test]
    fn test_parse_error_diagnostics() {
        let decode = ParseError::Decode(DecodeError {
            message: "eof".into(),
            line: 1,
            column: 1,
        });
        assert!(decode.diagnostics().is_empty());

        let validation: ParseError =
            ValidationError::single(Diagnostic::new("m", "", "/type")).into();
        assert_eq!(validation.diagnostics().len(), 1);
    }
}
