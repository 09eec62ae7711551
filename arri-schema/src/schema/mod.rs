//! Schema IR definitions.
//!
//! A [`Schema`] is one node of an Arri Type Definition: a [`SchemaForm`]
//! plus [`Metadata`], a nullability flag and an origin marker telling the
//! validation engine whether it runs natively or through an adapter.

mod builder;
mod encoding;
mod metadata;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::adapter::SchemaAdapter;

pub use builder::Property;
pub use metadata::Metadata;

/// Ordered map of property or mapping names to schemas.
pub type SchemaMap = IndexMap<String, Schema>;

/// A single schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "encoding::SchemaRepr", into = "encoding::SchemaRepr")]
pub struct Schema {
    /// Which of the eight forms this node is
    pub form: SchemaForm,

    /// Id, description and deprecation
    pub metadata: Metadata,

    /// Whether `null` is accepted in place of a value
    pub nullable: bool,

    /// Native engine or external adapter
    pub origin: SchemaOrigin,
}

/// The eight schema forms.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaForm {
    /// Accepts any value
    Empty,
    /// A scalar
    Type(ScalarType),
    /// One of a fixed, ordered set of strings
    Enum(Vec<String>),
    /// Homogeneous array
    Elements(Box<Schema>),
    /// Object with declared keys
    Properties(PropertiesSchema),
    /// String-keyed map with homogeneous values
    Values(Box<Schema>),
    /// Tagged union of objects
    Discriminator(DiscriminatorSchema),
    /// Reference into a definitions table
    Ref(String),
}

impl SchemaForm {
    /// Name of the form as used in the JSON encoding.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaForm::Empty => "empty",
            SchemaForm::Type(_) => "type",
            SchemaForm::Enum(_) => "enum",
            SchemaForm::Elements(_) => "elements",
            SchemaForm::Properties(_) => "properties",
            SchemaForm::Values(_) => "values",
            SchemaForm::Discriminator(_) => "discriminator",
            SchemaForm::Ref(_) => "ref",
        }
    }
}

/// Scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Boolean,
    Float32,
    Float64,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    String,
    Timestamp,
}

impl ScalarType {
    /// The wire name of this scalar.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Boolean => "boolean",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Int8 => "int8",
            ScalarType::Uint8 => "uint8",
            ScalarType::Int16 => "int16",
            ScalarType::Uint16 => "uint16",
            ScalarType::Int32 => "int32",
            ScalarType::Uint32 => "uint32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint64 => "uint64",
            ScalarType::String => "string",
            ScalarType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An object schema.
///
/// `required` and `optional` never share a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertiesSchema {
    pub required: SchemaMap,
    pub optional: SchemaMap,
    /// Reject keys declared in neither map
    pub strict: bool,
}

impl PropertiesSchema {
    /// Whether `key` is declared in either map.
    pub fn declares(&self, key: &str) -> bool {
        self.required.contains_key(key) || self.optional.contains_key(key)
    }

    /// All declared properties in declaration order, required first.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Schema, bool)> {
        self.required
            .iter()
            .map(|(k, s)| (k, s, false))
            .chain(self.optional.iter().map(|(k, s)| (k, s, true)))
    }

    pub fn len(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A discriminated union.
///
/// Each mapping value is a non-nullable properties schema that implicitly
/// carries the `tag` field.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminatorSchema {
    pub tag: String,
    pub mapping: SchemaMap,
}

/// Where a schema's runtime behavior comes from.
#[derive(Clone, Default)]
pub enum SchemaOrigin {
    /// Checked by the built-in engine
    #[default]
    Native,
    /// Checked by an external validator
    Adapted(Arc<dyn SchemaAdapter>),
}

impl SchemaOrigin {
    pub fn is_adapted(&self) -> bool {
        matches!(self, SchemaOrigin::Adapted(_))
    }

    pub fn adapter(&self) -> Option<&Arc<dyn SchemaAdapter>> {
        match self {
            SchemaOrigin::Native => None,
            SchemaOrigin::Adapted(adapter) => Some(adapter),
        }
    }
}

impl PartialEq for SchemaOrigin {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SchemaOrigin::Native, SchemaOrigin::Native) => true,
            (SchemaOrigin::Adapted(a), SchemaOrigin::Adapted(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for SchemaOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaOrigin::Native => f.write_str("Native"),
            SchemaOrigin::Adapted(adapter) => {
                f.debug_tuple("Adapted").field(&adapter.vendor()).finish()
            }
        }
    }
}

impl Schema {
    /// Create a native, non-nullable schema of the given form.
    pub fn new(form: SchemaForm) -> Self {
        Self {
            form,
            metadata: Metadata::default(),
            nullable: false,
            origin: SchemaOrigin::Native,
        }
    }

    /// The explicit id, if any.
    pub fn id(&self) -> Option<&str> {
        self.metadata.id.as_deref()
    }

    pub fn is_adapted(&self) -> bool {
        self.origin.is_adapted()
    }

    pub fn as_properties(&self) -> Option<&PropertiesSchema> {
        match &self.form {
            SchemaForm::Properties(props) => Some(props),
            _ => None,
        }
    }

    /// Serialize to the flat JSON encoding.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Serialize to the flat JSON encoding, pretty-printed.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Decode a schema from its JSON encoding.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Visit this node and every nested node, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Schema)) {
        visit(self);
        match &self.form {
            SchemaForm::Empty | SchemaForm::Type(_) | SchemaForm::Enum(_) | SchemaForm::Ref(_) => {}
            SchemaForm::Elements(inner) | SchemaForm::Values(inner) => inner.walk(visit),
            SchemaForm::Properties(props) => {
                for (_, schema, _) in props.iter() {
                    schema.walk(visit);
                }
            }
            SchemaForm::Discriminator(disc) => {
                for schema in disc.mapping.values() {
                    schema.walk(visit);
                }
            }
        }
    }

    /// Names of every `ref` reachable from this node, in first-seen order.
    pub fn references(&self) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        self.walk(&mut |node| {
            if let SchemaForm::Ref(name) = &node.form {
                if !refs.contains(name) {
                    refs.push(name.clone());
                }
            }
        });
        refs
    }
}
