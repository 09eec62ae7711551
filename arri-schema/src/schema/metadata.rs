//! Schema metadata.
//!
//! Metadata never changes what a schema accepts. It names the schema for
//! code generation and carries documentation.

use serde::{Deserialize, Serialize};

/// Metadata shared by all eight schema forms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Stable name used for `ref` targets and generated type names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Documentation carried into generated code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the schema is deprecated
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deprecated: bool,

    /// What to use instead of a deprecated schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_note: Option<String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata carrying only an id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as deprecated, optionally with a note.
    pub fn deprecated(mut self, note: Option<String>) -> Self {
        self.is_deprecated = true;
        self.deprecated_note = note;
        self
    }

    /// Check if this metadata has any content.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.description.is_none()
            && !self.is_deprecated
            && self.deprecated_note.is_none()
    }

    /// Fill every unset field from `other`.
    pub fn merge_missing(&mut self, other: &Metadata) {
        if self.id.is_none() {
            self.id.clone_from(&other.id);
        }
        if self.description.is_none() {
            self.description.clone_from(&other.description);
        }
        if !self.is_deprecated {
            self.is_deprecated = other.is_deprecated;
        }
        if self.deprecated_note.is_none() {
            self.deprecated_note.clone_from(&other.deprecated_note);
        }
    }
}
