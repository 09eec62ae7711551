//! Named schema resolution and recursive schema construction.
//!
//! [`TypeRegistry`] is the mutable builder phase. It hands out placeholder
//! `ref` nodes before their bodies exist, which is what makes
//! self-referential schemas expressible without shared mutable aliasing:
//! the placeholder is just an id, and the body lives in an arena slot
//! addressed by that id.
//!
//! [`TypeRegistry::finish`] freezes the registry into [`Definitions`], an
//! immutable table that is cheap to clone and safe to share across threads.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{Metadata, Schema};
use crate::validator::Validator;

/// Frozen table of named schemas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definitions {
    schemas: Arc<IndexMap<String, Schema>>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Schema)> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Build a validator for `schema` resolving refs against this table.
    pub fn validator(&self, schema: &Schema) -> SchemaResult<Validator> {
        Validator::with_definitions(schema.clone(), self)
    }

    /// A copy of this table with more entries. Existing names win.
    pub(crate) fn merged<I>(&self, extra: I) -> Definitions
    where
        I: IntoIterator<Item = (String, Schema)>,
    {
        let mut schemas = (*self.schemas).clone();
        for (name, schema) in extra {
            schemas.entry(name).or_insert(schema);
        }
        Definitions {
            schemas: Arc::new(schemas),
        }
    }
}

impl FromIterator<(String, Schema)> for Definitions {
    fn from_iter<T: IntoIterator<Item = (String, Schema)>>(iter: T) -> Self {
        Definitions {
            schemas: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl From<IndexMap<String, Schema>> for Definitions {
    fn from(schemas: IndexMap<String, Schema>) -> Self {
        Definitions {
            schemas: Arc::new(schemas),
        }
    }
}

#[derive(Debug)]
struct Slot {
    id: String,
    body: Option<Schema>,
}

/// Builder-phase registry of named and recursive schemas.
///
/// # Example
///
/// ```rust
/// use arri_schema::{Schema, TypeRegistry, Value};
///
/// let mut registry = TypeRegistry::new();
/// let tree = registry
///     .recursive("BinaryTree", |node| {
///         Schema::object([
///             ("left", node.clone().nullable().into()),
///             ("right", node.nullable().into()),
///             ("value", Schema::int32().into()),
///         ])
///     })
///     .unwrap();
/// let definitions = registry.finish().unwrap();
/// let validator = definitions.validator(&tree).unwrap();
///
/// let leaf = Value::object([("left", Value::Null), ("right", Value::Null), ("value", 1i32.into())]);
/// assert!(validator.validate(&leaf));
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
    anonymous: usize,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for `id` and return a placeholder reference to it.
    ///
    /// The slot must be filled with [`resolve`](Self::resolve) before
    /// [`finish`](Self::finish).
    pub fn reserve(&mut self, id: impl Into<String>) -> SchemaResult<Schema> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(SchemaError::DuplicateId(id));
        }
        trace!(id = %id, slot = self.slots.len(), "Reserving schema slot");
        self.index.insert(id.clone(), self.slots.len());
        self.slots.push(Slot {
            id: id.clone(),
            body: None,
        });
        Ok(Schema::reference(id))
    }

    /// Fill a reserved slot. The body takes the slot's id.
    pub fn resolve(&mut self, id: &str, mut body: Schema) -> SchemaResult<Schema> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| SchemaError::UnresolvedRef(id.to_string()))?;
        if self.slots[slot].body.is_some() {
            return Err(SchemaError::DuplicateId(id.to_string()));
        }
        body.metadata.id = Some(id.to_string());
        self.slots[slot].body = Some(body.clone());
        Ok(body)
    }

    /// Register a named schema. The schema must carry an id.
    pub fn define(&mut self, schema: Schema) -> SchemaResult<Schema> {
        let id = schema
            .id()
            .map(str::to_string)
            .ok_or(SchemaError::MissingId { operation: "define" })?;
        self.reserve(id.clone())?;
        self.resolve(&id, schema)
    }

    /// Build a self-referential schema under an explicit id.
    ///
    /// `factory` receives a `ref` placeholder for the schema being built.
    pub fn recursive<F>(&mut self, id: impl Into<String>, factory: F) -> SchemaResult<Schema>
    where
        F: FnOnce(Schema) -> Schema,
    {
        self.recursive_with(Metadata::with_id(id), factory)
    }

    /// Build a self-referential schema whose id comes from `metadata`.
    ///
    /// Without an id the schema is named `Recursive<N>`. Metadata fields the
    /// body leaves unset are filled from `metadata`.
    pub fn recursive_with<F>(&mut self, metadata: Metadata, factory: F) -> SchemaResult<Schema>
    where
        F: FnOnce(Schema) -> Schema,
    {
        let id = match &metadata.id {
            Some(id) => id.clone(),
            None => {
                self.anonymous += 1;
                format!("Recursive{}", self.anonymous)
            }
        };
        let placeholder = self.reserve(id.clone())?;
        let mut body = factory(placeholder);
        body.metadata.merge_missing(&metadata);
        self.resolve(&id, body)
    }

    /// The resolved body for `id`, if any.
    pub fn get(&self, id: &str) -> Option<&Schema> {
        self.index
            .get(id)
            .and_then(|slot| self.slots[*slot].body.as_ref())
    }

    /// Freeze the registry. Every reserved slot must be resolved.
    pub fn finish(self) -> SchemaResult<Definitions> {
        self.slots
            .into_iter()
            .map(|slot| match slot.body {
                Some(body) => Ok((slot.id, body)),
                None => Err(SchemaError::UnresolvedRecursive(slot.id)),
            })
            .collect::<SchemaResult<IndexMap<_, _>>>()
            .map(Definitions::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaForm;

    fn tree_body(node: Schema) -> Schema {
        Schema::object([
            ("left", node.clone().nullable().into()),
            ("right", node.nullable().into()),
            ("value", Schema::int32().into()),
        ])
    }

    #[test]
    fn test_recursive_placeholder_is_ref() {
        let mut registry = TypeRegistry::new();
        let mut seen = None;
        let tree = registry
            .recursive("Tree", |node| {
                seen = Some(node.clone());
                tree_body(node)
            })
            .unwrap();
        assert_eq!(seen.unwrap().form, SchemaForm::Ref("Tree".into()));
        assert_eq!(tree.id(), Some("Tree"));
        assert_eq!(registry.get("Tree"), Some(&tree));
    }

    #[test]
    fn test_recursive_call_forms_serialize_identically() {
        let mut explicit = TypeRegistry::new();
        let a = explicit.recursive("BinaryTree", tree_body).unwrap();

        let mut implicit = TypeRegistry::new();
        let b = implicit
            .recursive_with(Metadata::with_id("BinaryTree"), tree_body)
            .unwrap();

        assert_eq!(a.to_json(), b.to_json());
        assert_eq!(explicit.finish().unwrap(), implicit.finish().unwrap());
    }

    #[test]
    fn test_recursive_without_id_is_numbered() {
        let mut registry = TypeRegistry::new();
        let first = registry.recursive_with(Metadata::new(), tree_body).unwrap();
        let second = registry.recursive_with(Metadata::new(), tree_body).unwrap();
        assert_eq!(first.id(), Some("Recursive1"));
        assert_eq!(second.id(), Some("Recursive2"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = TypeRegistry::new();
        registry.recursive("Tree", tree_body).unwrap();
        assert_eq!(
            registry.recursive("Tree", tree_body).unwrap_err(),
            SchemaError::DuplicateId("Tree".into())
        );
    }

    #[test]
    fn test_unresolved_reservation_fails_finish() {
        let mut registry = TypeRegistry::new();
        registry.reserve("Later").unwrap();
        assert_eq!(
            registry.finish().unwrap_err(),
            SchemaError::UnresolvedRecursive("Later".into())
        );
    }

    #[test]
    fn test_mutual_recursion_via_reserve() {
        let mut registry = TypeRegistry::new();
        let folder = registry.reserve("Folder").unwrap();
        let file = registry
            .define(
                Schema::object([("parent", folder.nullable().into())]).with_id("File"),
            )
            .unwrap();
        registry
            .resolve(
                "Folder",
                Schema::object([("files", Schema::array(Schema::reference("File")).into())]),
            )
            .unwrap();
        assert_eq!(file.id(), Some("File"));
        let definitions = registry.finish().unwrap();
        assert_eq!(definitions.len(), 2);
        assert!(definitions.contains("Folder"));
    }

    #[test]
    fn test_definitions_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Definitions>();
    }
}
