//! Fluent construction of schema nodes.
//!
//! ```rust
//! use arri_schema::Schema;
//!
//! let user = Schema::object([
//!     ("id", Schema::string().into()),
//!     ("createdAt", Schema::timestamp().into()),
//!     ("bio", Schema::string().nullable().optional()),
//! ])
//! .with_id("User");
//!
//! let summary = user.pick(["id"]).unwrap();
//! assert_eq!(summary.as_properties().unwrap().len(), 1);
//! ```

use super::{
    DiscriminatorSchema, Metadata, PropertiesSchema, ScalarType, Schema, SchemaForm, SchemaMap,
};
use crate::error::{SchemaError, SchemaResult};

/// A property slot in an object under construction.
///
/// Created from a [`Schema`] (required) or with [`Schema::optional`].
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub schema: Schema,
    pub optional: bool,
}

impl Property {
    pub fn required(schema: Schema) -> Self {
        Self {
            schema,
            optional: false,
        }
    }

    pub fn optional(schema: Schema) -> Self {
        Self {
            schema,
            optional: true,
        }
    }
}

impl From<Schema> for Property {
    fn from(schema: Schema) -> Self {
        Property::required(schema)
    }
}

macro_rules! scalar_constructors {
    ($($(#[$doc:meta])* $name:ident => $scalar:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name() -> Self {
                Self::scalar(ScalarType::$scalar)
            }
        )*
    };
}

impl Schema {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// The empty form: accepts any value.
    pub fn any() -> Self {
        Self::new(SchemaForm::Empty)
    }

    pub fn scalar(scalar: ScalarType) -> Self {
        Self::new(SchemaForm::Type(scalar))
    }

    scalar_constructors! {
        boolean => Boolean,
        float32 => Float32,
        float64 => Float64,
        int8 => Int8,
        uint8 => Uint8,
        int16 => Int16,
        uint16 => Uint16,
        int32 => Int32,
        uint32 => Uint32,
        /// 64-bit signed integer, carried on the wire as a decimal string.
        int64 => Int64,
        /// 64-bit unsigned integer, carried on the wire as a decimal string.
        uint64 => Uint64,
        string => String,
        timestamp => Timestamp,
    }

    /// A string enum. Variant order is preserved.
    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SchemaForm::Enum(
            variants.into_iter().map(Into::into).collect(),
        ))
    }

    /// A homogeneous array.
    pub fn array(items: Schema) -> Self {
        Self::new(SchemaForm::Elements(Box::new(items)))
    }

    /// A string-keyed map.
    pub fn record(values: Schema) -> Self {
        Self::new(SchemaForm::Values(Box::new(values)))
    }

    /// An object. A key given twice keeps its last declaration.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Property)>,
        K: Into<String>,
    {
        let mut props = PropertiesSchema::default();
        for (key, property) in properties {
            insert_property(&mut props, key.into(), property);
        }
        Self::new(SchemaForm::Properties(props))
    }

    /// A discriminated union over object variants.
    pub fn discriminator<I, K>(tag: impl Into<String>, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        let mapping: SchemaMap = mapping.into_iter().map(|(k, s)| (k.into(), s)).collect();
        Self::new(SchemaForm::Discriminator(DiscriminatorSchema {
            tag: tag.into(),
            mapping,
        }))
    }

    /// A reference to a named schema.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(SchemaForm::Ref(name.into()))
    }

    // =========================================================================
    // Modifiers
    // =========================================================================

    /// Accept `null` in addition to the schema's values.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Use this schema as an optional object property.
    pub fn optional(self) -> Property {
        Property::optional(self)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = Some(description.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.metadata.is_deprecated = true;
        self
    }

    pub fn with_deprecated_note(mut self, note: impl Into<String>) -> Self {
        self.metadata.is_deprecated = true;
        self.metadata.deprecated_note = Some(note.into());
        self
    }

    /// Replace the metadata wholesale.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Reject undeclared keys. No effect on non-object forms.
    pub fn strict(mut self) -> Self {
        if let SchemaForm::Properties(props) = &mut self.form {
            props.strict = true;
        }
        self
    }

    // =========================================================================
    // Object transformations
    // =========================================================================

    /// Every property becomes optional.
    pub fn partial(&self) -> SchemaResult<Schema> {
        let props = self.object_form("partial")?;
        let mut optional = props.required.clone();
        optional.extend(props.optional.clone());
        Ok(self.derived(PropertiesSchema {
            required: SchemaMap::new(),
            optional,
            strict: props.strict,
        }))
    }

    /// Keep only the named properties.
    pub fn pick<I, K>(&self, keys: I) -> SchemaResult<Schema>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let props = self.object_form("pick")?;
        let keys = collect_known_keys(props, keys, "pick")?;
        Ok(self.derived(PropertiesSchema {
            required: filter_map(&props.required, |k| keys.iter().any(|p| p == k)),
            optional: filter_map(&props.optional, |k| keys.iter().any(|p| p == k)),
            strict: props.strict,
        }))
    }

    /// Drop the named properties.
    pub fn omit<I, K>(&self, keys: I) -> SchemaResult<Schema>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let props = self.object_form("omit")?;
        let keys = collect_known_keys(props, keys, "omit")?;
        Ok(self.derived(PropertiesSchema {
            required: filter_map(&props.required, |k| !keys.iter().any(|p| p == k)),
            optional: filter_map(&props.optional, |k| !keys.iter().any(|p| p == k)),
            strict: props.strict,
        }))
    }

    /// Add the properties of `other`. Keys in both take `other`'s declaration.
    pub fn extend(&self, other: &Schema) -> SchemaResult<Schema> {
        let mut props = self.object_form("extend")?.clone();
        let extra = other.object_form("extend")?;
        for (key, schema, optional) in extra.iter() {
            let property = Property {
                schema: schema.clone(),
                optional,
            };
            insert_property(&mut props, key.clone(), property);
        }
        props.strict = props.strict || extra.strict;
        Ok(self.derived(props))
    }

    fn object_form(&self, operation: &'static str) -> SchemaResult<&PropertiesSchema> {
        self.as_properties()
            .ok_or(SchemaError::NotAnObject { operation })
    }

    /// A new object with this node's nullability but no id, since the
    /// derived shape is a different type.
    fn derived(&self, props: PropertiesSchema) -> Schema {
        let mut schema = Schema::new(SchemaForm::Properties(props));
        schema.nullable = self.nullable;
        schema.origin = self.origin.clone();
        schema.metadata.description.clone_from(&self.metadata.description);
        schema
    }
}

fn insert_property(props: &mut PropertiesSchema, key: String, property: Property) {
    props.required.shift_remove(&key);
    props.optional.shift_remove(&key);
    if property.optional {
        props.optional.insert(key, property.schema);
    } else {
        props.required.insert(key, property.schema);
    }
}

fn collect_known_keys<I, K>(
    props: &PropertiesSchema,
    keys: I,
    operation: &'static str,
) -> SchemaResult<Vec<String>>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    keys.into_iter()
        .map(|key| {
            let key = key.as_ref();
            if props.declares(key) {
                Ok(key.to_string())
            } else {
                Err(SchemaError::UnknownProperty {
                    operation,
                    key: key.to_string(),
                })
            }
        })
        .collect()
}

fn filter_map(map: &SchemaMap, keep: impl Fn(&str) -> bool) -> SchemaMap {
    map.iter()
        .filter(|(k, _)| keep(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
