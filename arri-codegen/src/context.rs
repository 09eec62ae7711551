//! Per-node generation context.

use crate::config::{GeneratorConfig, IndentStyle};

/// Where the traversal currently is.
///
/// Contexts are cheap values cloned on every step down the tree. The only
/// state shared across a run lives in
/// [`GenerationRun`](crate::framework::GenerationRun).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorContext {
    pub client_name: String,
    pub model_prefix: String,

    /// Segments from the enclosing definition down to this node.
    /// Array elements are `[element]` and record values are `[value]`.
    pub instance_path: Vec<String>,

    /// JSON pointer of this node inside its definition
    pub schema_path: String,

    /// Whether the enclosing object may omit this field
    pub is_optional: bool,

    /// Type name of the union a variant belongs to
    pub discriminator_parent_id: Option<String>,
    /// Tag value selecting this variant
    pub discriminator_value: Option<String>,
    /// Tag field name
    pub discriminator_key: Option<String>,

    /// Indentation unit for multi-line fragments
    pub indent: IndentStyle,
}

impl GeneratorContext {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            client_name: config.client_name.clone(),
            model_prefix: config.model_prefix.clone(),
            indent: config.indent,
            ..Default::default()
        }
    }

    /// Context for the root of a named definition.
    pub fn definition(&self, name: &str) -> Self {
        Self {
            client_name: self.client_name.clone(),
            model_prefix: self.model_prefix.clone(),
            instance_path: vec![name.to_string()],
            schema_path: format!("/definitions/{name}"),
            indent: self.indent,
            ..Default::default()
        }
    }

    pub fn property(&self, key: &str, optional: bool) -> Self {
        let keyword = if optional {
            "optionalProperties"
        } else {
            "properties"
        };
        Self {
            instance_path: self.push(key),
            schema_path: format!("{}/{keyword}/{key}", self.schema_path),
            is_optional: optional,
            discriminator_parent_id: None,
            discriminator_value: None,
            discriminator_key: None,
            ..self.clone()
        }
    }

    pub fn element(&self) -> Self {
        self.nested("[element]", "elements")
    }

    pub fn value(&self) -> Self {
        self.nested("[value]", "values")
    }

    /// Context for one mapping entry of a union named `parent`.
    pub fn variant(&self, parent: &str, key: &str, value: &str) -> Self {
        Self {
            instance_path: self.push(value),
            schema_path: format!("{}/mapping/{value}", self.schema_path),
            is_optional: false,
            discriminator_parent_id: Some(parent.to_string()),
            discriminator_value: Some(value.to_string()),
            discriminator_key: Some(key.to_string()),
            ..self.clone()
        }
    }

    /// `/User/address` style rendering of [`instance_path`](Self::instance_path).
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in &self.instance_path {
            path.push('/');
            path.push_str(segment);
        }
        path
    }

    /// Nesting depth, used to keep generated loop variables distinct.
    pub fn depth(&self) -> usize {
        self.instance_path.len()
    }

    fn nested(&self, segment: &str, keyword: &str) -> Self {
        Self {
            instance_path: self.push(segment),
            schema_path: format!("{}/{keyword}", self.schema_path),
            is_optional: false,
            discriminator_parent_id: None,
            discriminator_value: None,
            discriminator_key: None,
            ..self.clone()
        }
    }

    fn push(&self, segment: &str) -> Vec<String> {
        let mut path = self.instance_path.clone();
        path.push(segment.to_string());
        path
    }
}
