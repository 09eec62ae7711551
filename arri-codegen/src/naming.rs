//! Deterministic type naming.
//!
//! A node with an explicit id is named after it. A union variant is named
//! after its union plus the tag value. Anything else is named after its
//! instance path, so the same input always produces the same names and two
//! nodes at different paths never share one silently.

use std::collections::HashMap;

use arri_schema::Schema;
use convert_case::{Case, Casing};

use crate::context::GeneratorContext;
use crate::error::{CodegenError, CodegenResult};

/// `users` → `Users`, `[element]` → `Element`.
pub fn pascal(segment: &str) -> String {
    match segment {
        "[element]" => "Element".to_string(),
        "[value]" => "Value".to_string(),
        _ => segment.to_case(Case::Pascal),
    }
}

/// The generated type name for `schema` at `ctx`.
pub fn type_name(ctx: &GeneratorContext, schema: &Schema) -> String {
    if let Some(id) = schema.id() {
        return format!("{}{}", ctx.model_prefix, pascal(id));
    }
    if let (Some(parent), Some(value)) = (&ctx.discriminator_parent_id, &ctx.discriminator_value)
    {
        return format!("{parent}{}", pascal(value));
    }
    let Some((root, rest)) = ctx.instance_path.split_first() else {
        return ctx.model_prefix.clone();
    };
    format!("{}{}{}", ctx.model_prefix, pascal(root), path_suffix(rest))
}

/// A lowercase single word, which concatenates without ambiguity.
fn is_plain(segment: &str) -> bool {
    matches!(segment, "[element]" | "[value]")
        || (segment.starts_with(|c: char| c.is_ascii_lowercase())
            && segment
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}

/// Encodes the segments below the definition root.
///
/// Paths made of plain segments concatenate their PascalCase forms. Any
/// other path is spelled out segment by segment, each segment introduced by
/// `__` with `_u` for a literal underscore, `_e`/`_v` for element and value
/// markers and `_xHHHHHH` for anything outside `[A-Za-z0-9]`. Every `_` in
/// that form starts a two-character code, so distinct paths never share a
/// suffix.
fn path_suffix(segments: &[String]) -> String {
    if segments.iter().all(|s| is_plain(s)) {
        return segments.iter().map(|s| pascal(s)).collect();
    }
    let mut out = String::new();
    for segment in segments {
        out.push_str("__");
        match segment.as_str() {
            "[element]" => out.push_str("_e"),
            "[value]" => out.push_str("_v"),
            _ => {
                for c in segment.chars() {
                    match c {
                        '_' => out.push_str("_u"),
                        c if c.is_ascii_alphanumeric() => out.push(c),
                        c => out.push_str(&format!("_x{:06x}", c as u32)),
                    }
                }
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
struct Claim {
    path: String,
    fingerprint: String,
}

/// Every type name emitted during one run and where it came from.
#[derive(Debug, Clone, Default)]
pub struct TypeNameRegistry {
    names: HashMap<String, Claim>,
}

impl TypeNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` is generated for `schema` at `path`.
    ///
    /// Returns `Ok(true)` on first registration and `Ok(false)` when the
    /// same shape registers the name again. A different shape under an
    /// existing name is a [`CodegenError::NamingCollision`].
    pub fn register(&mut self, name: &str, path: &str, schema: &Schema) -> CodegenResult<bool> {
        let fingerprint = fingerprint(schema);
        match self.names.get(name) {
            Some(existing) if existing.fingerprint == fingerprint => Ok(false),
            Some(existing) => Err(CodegenError::NamingCollision {
                name: name.to_string(),
                first_path: existing.path.clone(),
                second_path: path.to_string(),
            }),
            None => {
                self.names.insert(
                    name.to_string(),
                    Claim {
                        path: path.to_string(),
                        fingerprint,
                    },
                );
                Ok(true)
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Structure of a schema, ignoring nullability and documentation.
fn fingerprint(schema: &Schema) -> String {
    let mut normalized = schema.clone();
    normalized.nullable = false;
    normalized.metadata.description = None;
    normalized.metadata.is_deprecated = false;
    normalized.metadata.deprecated_note = None;
    normalized.to_json()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(path: &[&str]) -> GeneratorContext {
        GeneratorContext {
            instance_path: path.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_type_name_from_path() {
        let schema = Schema::object([("x", Schema::int32().into())]);
        assert_eq!(type_name(&ctx(&["User", "address"]), &schema), "UserAddress");
        assert_eq!(
            type_name(&ctx(&["UsersGetUserParams", "items", "[element]"]), &schema),
            "UsersGetUserParamsItemsElement"
        );
        assert_eq!(type_name(&ctx(&["Settings", "[value]"]), &schema), "SettingsValue");
    }

    #[test]
    fn test_type_name_keeps_word_boundaries_distinct() {
        let schema = Schema::object([("x", Schema::int32().into())]);
        let names = [
            type_name(&ctx(&["User", "address_home"]), &schema),
            type_name(&ctx(&["User", "address", "home"]), &schema),
            type_name(&ctx(&["User", "addressHome"]), &schema),
            type_name(&ctx(&["User", "a_b"]), &schema),
            type_name(&ctx(&["User", "aB"]), &schema),
            type_name(&ctx(&["User", "a", "b"]), &schema),
            type_name(&ctx(&["User", "a_", "_b"]), &schema),
            type_name(&ctx(&["User", "a", "__b"]), &schema),
            type_name(&ctx(&["User", "aB", "[element]"]), &schema),
            type_name(&ctx(&["User", "aB", "element"]), &schema),
        ];
        assert_eq!(names[1], "UserAddressHome");
        assert_eq!(names[0], "User__address_uhome");
        assert_eq!(names[2], "User__addressHome");
        assert_eq!(names[8], "User__aB___e");
        let mut unique = names.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), names.len(), "{names:?}");
    }

    #[test]
    fn test_type_name_escapes_non_identifier_characters() {
        let schema = Schema::object([("x", Schema::int32().into())]);
        assert_eq!(
            type_name(&ctx(&["User", "home-address"]), &schema),
            "User__home_x00002daddress"
        );
    }

    #[test]
    fn test_type_name_prefers_id_and_applies_prefix() {
        let mut context = ctx(&["User", "address"]);
        context.model_prefix = "Api".into();
        let schema = Schema::object([("x", Schema::int32().into())]).with_id("postal_address");
        assert_eq!(type_name(&context, &schema), "ApiPostalAddress");
    }

    #[test]
    fn test_type_name_for_variant() {
        let parent = GeneratorContext::default().definition("Shape");
        let variant = parent.variant("Shape", "kind", "RIGHT_TRIANGLE");
        let schema = Schema::object([("a", Schema::float64().into())]);
        assert_eq!(type_name(&variant, &schema), "ShapeRightTriangle");
    }

    #[test]
    fn test_register_identical_shape_twice() {
        let mut registry = TypeNameRegistry::new();
        let schema = Schema::object([("id", Schema::string().into())]);
        assert!(registry.register("Item", "/A/item", &schema).unwrap());
        assert!(!registry
            .register("Item", "/B/item", &schema.clone().nullable())
            .unwrap());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_collision_names_both_paths() {
        let mut registry = TypeNameRegistry::new();
        registry
            .register("UserAddress", "/UserAddress", &Schema::object([("a", Schema::string().into())]))
            .unwrap();
        let err = registry
            .register("UserAddress", "/User/address", &Schema::object([("b", Schema::string().into())]))
            .unwrap_err();
        match err {
            CodegenError::NamingCollision {
                name,
                first_path,
                second_path,
            } => {
                assert_eq!(name, "UserAddress");
                assert_eq!(first_path, "/UserAddress");
                assert_eq!(second_path, "/User/address");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
