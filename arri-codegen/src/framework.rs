//! The language-agnostic traversal.
//!
//! [`GenerationRun::generate_type`] walks a schema exactly the way the
//! validation engine does, but asks a [`TypeEmitter`] for source fragments
//! instead of checking values. The run owns everything that must be shared
//! across the walk: the type-name registry, the warnings and the set of
//! references currently being expanded.

use std::collections::HashSet;

use arri_schema::{Definitions, Metadata, ScalarType, Schema, SchemaForm};
use tracing::{trace, warn};

use crate::config::GeneratorConfig;
use crate::context::GeneratorContext;
use crate::error::{CodegenError, CodegenResult, CodegenWarning};
use crate::generated::{Declaration, GeneratedType};
use crate::naming::{type_name, TypeNameRegistry};

/// One property of an object being generated.
#[derive(Debug, Clone)]
pub struct Field {
    /// Key on the wire
    pub key: String,
    pub optional: bool,
    pub schema: Schema,
    pub generated: GeneratedType,
}

/// An object node with its fields already generated.
#[derive(Debug, Clone)]
pub struct ObjectShape {
    pub name: String,
    pub metadata: Metadata,
    pub fields: Vec<Field>,
    /// Tag field and value when this object is a union variant
    pub tag: Option<(String, String)>,
}

/// A union node with every variant already generated.
#[derive(Debug, Clone)]
pub struct UnionShape {
    pub name: String,
    pub tag: String,
    pub variants: Vec<ObjectShape>,
}

/// Per-form emitters of a target language.
///
/// Emitters receive children that are already generated and return the
/// non-nullable form of the node. Nullability is applied afterwards through
/// [`nullable`](Self::nullable).
pub trait TypeEmitter {
    /// The dynamic "any" type. It already admits `null`.
    fn any(&self, run: &mut GenerationRun, ctx: &GeneratorContext) -> GeneratedType;

    fn scalar(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        scalar: ScalarType,
    ) -> GeneratedType;

    fn enumeration(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        schema: &Schema,
        name: &str,
        variants: &[String],
    ) -> GeneratedType;

    fn array(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        element: GeneratedType,
    ) -> GeneratedType;

    fn record(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        value: GeneratedType,
    ) -> GeneratedType;

    fn object(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        schema: &Schema,
        object: ObjectShape,
    ) -> GeneratedType;

    fn discriminator(
        &self,
        run: &mut GenerationRun,
        ctx: &GeneratorContext,
        schema: &Schema,
        union: UnionShape,
    ) -> GeneratedType;

    /// A use of the declared type `name` for the definition `target`.
    fn reference(&self, ctx: &GeneratorContext, target: &Schema, name: &str) -> GeneratedType;

    /// Wrap `inner` so it also admits `null`.
    fn nullable(&self, ctx: &GeneratorContext, inner: GeneratedType) -> GeneratedType;

    /// Declaration giving a name to a definition that declares no type of
    /// its own, such as an array or a scalar.
    fn alias(&self, ctx: &GeneratorContext, schema: &Schema, name: &str, target: &GeneratedType)
        -> Declaration;
}

/// State of one generation run.
///
/// Runs never share state, so independent runs can proceed on different
/// threads.
#[derive(Debug)]
pub struct GenerationRun {
    config: GeneratorConfig,
    definitions: Definitions,
    names: TypeNameRegistry,
    warnings: Vec<CodegenWarning>,
    in_progress: HashSet<String>,
}

impl GenerationRun {
    pub fn new(config: &GeneratorConfig, definitions: Definitions) -> Self {
        Self {
            config: config.clone(),
            definitions,
            names: TypeNameRegistry::new(),
            warnings: Vec::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Context for the top of the run.
    pub fn root_context(&self) -> GeneratorContext {
        GeneratorContext::new(&self.config)
    }

    pub fn warnings(&self) -> &[CodegenWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<CodegenWarning> {
        self.warnings
    }

    /// Name `schema` at `ctx` and reserve the name for this run.
    pub fn claim(&mut self, ctx: &GeneratorContext, schema: &Schema) -> CodegenResult<String> {
        let name = type_name(ctx, schema);
        if self.names.register(&name, &ctx.path(), schema)? {
            trace!(name = %name, path = %ctx.path(), "Registered type name");
        }
        Ok(name)
    }

    /// Record a shape that falls back to the dynamic type.
    pub fn warn(&mut self, ctx: &GeneratorContext, reason: impl Into<String>) {
        let warning = CodegenWarning::new(ctx.path(), reason);
        warn!(
            path = %warning.path,
            reason = %warning.reason,
            "Unsupported schema, using dynamic type"
        );
        self.warnings.push(warning);
    }

    /// Type name under which the definition `name` is declared.
    pub fn definition_type_name(&self, name: &str) -> CodegenResult<String> {
        let target = self.resolve(name, &self.root_context())?;
        Ok(type_name(&self.root_context().definition(name), target))
    }

    /// Generate `schema` and everything below it.
    pub fn generate_type<E>(
        &mut self,
        emitter: &E,
        ctx: &GeneratorContext,
        schema: &Schema,
    ) -> CodegenResult<GeneratedType>
    where
        E: TypeEmitter + ?Sized,
    {
        let generated = self.generate_form(emitter, ctx, schema)?;
        if schema.nullable && !generated.is_nullable {
            Ok(emitter.nullable(ctx, generated))
        } else {
            Ok(generated)
        }
    }

    /// Generate every definition in table order and collect their
    /// declarations, each name once.
    pub fn generate_definitions<E>(&mut self, emitter: &E) -> CodegenResult<Vec<Declaration>>
    where
        E: TypeEmitter + ?Sized,
    {
        let root = self.root_context();
        let table = self.definitions.clone();
        let mut declarations: Vec<Declaration> = Vec::new();

        for (name, schema) in table.iter() {
            let ctx = root.definition(name);
            self.in_progress.insert(name.clone());
            let result = self.generate_form(emitter, &ctx, schema);
            self.in_progress.remove(name);
            let mut generated = result?;

            let mut found = generated.take_declarations();
            if !declares_type(schema) {
                let alias_name = self.claim(&ctx, schema)?;
                let target = if schema.nullable && !generated.is_nullable {
                    emitter.nullable(&ctx, generated)
                } else {
                    generated
                };
                found.push(emitter.alias(&ctx, schema, &alias_name, &target));
            }
            for declaration in found {
                if !declarations.iter().any(|d| d.name == declaration.name) {
                    declarations.push(declaration);
                }
            }
        }
        Ok(declarations)
    }

    fn generate_form<E>(
        &mut self,
        emitter: &E,
        ctx: &GeneratorContext,
        schema: &Schema,
    ) -> CodegenResult<GeneratedType>
    where
        E: TypeEmitter + ?Sized,
    {
        match &schema.form {
            SchemaForm::Empty => {
                if let Some(adapter) = schema.origin.adapter() {
                    let reason = format!(
                        "schema from '{}' has no structure a client can use",
                        adapter.vendor()
                    );
                    self.warn(ctx, reason);
                }
                Ok(emitter.any(self, ctx))
            }
            SchemaForm::Type(scalar) => Ok(emitter.scalar(self, ctx, *scalar)),
            SchemaForm::Enum(variants) => {
                let name = self.claim(ctx, schema)?;
                Ok(emitter.enumeration(self, ctx, schema, &name, variants))
            }
            SchemaForm::Elements(inner) => {
                let element = self.generate_type(emitter, &ctx.element(), inner)?;
                Ok(emitter.array(self, ctx, element))
            }
            SchemaForm::Values(inner) => {
                let value = self.generate_type(emitter, &ctx.value(), inner)?;
                Ok(emitter.record(self, ctx, value))
            }
            SchemaForm::Properties(_) => {
                let name = self.claim(ctx, schema)?;
                let object = self.object_shape(emitter, ctx, schema, name, None)?;
                Ok(emitter.object(self, ctx, schema, object))
            }
            SchemaForm::Discriminator(union) => {
                let name = self.claim(ctx, schema)?;
                let mut variants = Vec::with_capacity(union.mapping.len());
                for (value, variant) in &union.mapping {
                    let variant_ctx = ctx.variant(&name, &union.tag, value);
                    if variant.as_properties().is_none() {
                        self.warn(&variant_ctx, "union variant is not an object");
                        continue;
                    }
                    let variant_name = self.claim(&variant_ctx, variant)?;
                    let tag = Some((union.tag.clone(), value.clone()));
                    variants.push(self.object_shape(emitter, &variant_ctx, variant, variant_name, tag)?);
                }
                let shape = UnionShape {
                    name,
                    tag: union.tag.clone(),
                    variants,
                };
                Ok(emitter.discriminator(self, ctx, schema, shape))
            }
            SchemaForm::Ref(target) => self.generate_ref(emitter, ctx, target),
        }
    }

    fn object_shape<E>(
        &mut self,
        emitter: &E,
        ctx: &GeneratorContext,
        schema: &Schema,
        name: String,
        tag: Option<(String, String)>,
    ) -> CodegenResult<ObjectShape>
    where
        E: TypeEmitter + ?Sized,
    {
        let mut fields = Vec::new();
        if let Some(props) = schema.as_properties() {
            for (key, field_schema, optional) in props.iter() {
                let field_ctx = ctx.property(key, optional);
                let generated = self.generate_type(emitter, &field_ctx, field_schema)?;
                fields.push(Field {
                    key: key.clone(),
                    optional,
                    schema: field_schema.clone(),
                    generated,
                });
            }
        }
        Ok(ObjectShape {
            name,
            metadata: schema.metadata.clone(),
            fields,
            tag,
        })
    }

    fn generate_ref<E>(
        &mut self,
        emitter: &E,
        ctx: &GeneratorContext,
        target: &str,
    ) -> CodegenResult<GeneratedType>
    where
        E: TypeEmitter + ?Sized,
    {
        let definition = self.resolve(target, ctx)?.clone();

        if declares_type(&definition) {
            // The declaration itself is emitted with the definitions, so a
            // reference only needs the name. This is what closes cycles.
            let name = type_name(&ctx.definition(target), &definition);
            let generated = emitter.reference(ctx, &definition, &name);
            return Ok(if definition.nullable {
                emitter.nullable(ctx, generated)
            } else {
                generated
            });
        }

        if !self.in_progress.insert(target.to_string()) {
            return Err(CodegenError::UnresolvableCycle {
                name: target.to_string(),
                path: ctx.path(),
            });
        }
        let result = self.generate_type(emitter, &ctx.definition(target), &definition);
        self.in_progress.remove(target);

        let mut generated = result?;
        generated.take_declarations();
        Ok(generated)
    }

    fn resolve(&self, name: &str, ctx: &GeneratorContext) -> CodegenResult<&Schema> {
        self.definitions
            .get(name)
            .ok_or_else(|| CodegenError::UnresolvedRef {
                name: name.to_string(),
                path: ctx.path(),
            })
    }
}

/// Whether a definition produces a named declaration a reference can point
/// at.
pub fn declares_type(schema: &Schema) -> bool {
    matches!(
        schema.form,
        SchemaForm::Enum(_) | SchemaForm::Properties(_) | SchemaForm::Discriminator(_)
    )
}

/// Escape `text` for a double-quoted string literal in any of the targets.
pub fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Emitter that renders a compact structural type name and records
    /// which hooks ran.
    #[derive(Default)]
    struct Probe {
        calls: RefCell<Vec<String>>,
    }

    impl Probe {
        fn log(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl TypeEmitter for Probe {
        fn any(&self, _: &mut GenerationRun, _: &GeneratorContext) -> GeneratedType {
            GeneratedType::new("any").nullable(true)
        }

        fn scalar(
            &self,
            _: &mut GenerationRun,
            _: &GeneratorContext,
            s: ScalarType,
        ) -> GeneratedType {
            GeneratedType::new(s.as_str())
        }

        fn enumeration(
            &self,
            _: &mut GenerationRun,
            _: &GeneratorContext,
            _: &Schema,
            name: &str,
            _: &[String],
        ) -> GeneratedType {
            self.log(format!("enum {name}"));
            GeneratedType::new(name).declare(Declaration::new(name, "enum"))
        }

        fn array(
            &self,
            _: &mut GenerationRun,
            _: &GeneratorContext,
            e: GeneratedType,
        ) -> GeneratedType {
            let decls = e.nested_declarations.clone();
            GeneratedType::new(format!("{}[]", e.type_name)).with_declarations(decls)
        }

        fn record(
            &self,
            _: &mut GenerationRun,
            _: &GeneratorContext,
            v: GeneratedType,
        ) -> GeneratedType {
            let decls = v.nested_declarations.clone();
            GeneratedType::new(format!("map<{}>", v.type_name)).with_declarations(decls)
        }

        fn object(
            &self,
            _: &mut GenerationRun,
            _: &GeneratorContext,
            _: &Schema,
            object: ObjectShape,
        ) -> GeneratedType {
            self.log(format!("object {}", object.name));
            let mut decls = Vec::new();
            for field in &object.fields {
                decls.extend(field.generated.nested_declarations.clone());
            }
            let body: Vec<_> = object
                .fields
                .iter()
                .map(|f| format!("{}:{}", f.key, f.generated.type_name))
                .collect();
            decls.push(Declaration::new(&object.name, body.join(",")));
            GeneratedType::new(&object.name).with_declarations(decls)
        }

        fn discriminator(
            &self,
            _: &mut GenerationRun,
            _: &GeneratorContext,
            _: &Schema,
            union: UnionShape,
        ) -> GeneratedType {
            let names: Vec<_> = union.variants.iter().map(|v| v.name.clone()).collect();
            self.log(format!("union {} {}", union.name, names.join("|")));
            GeneratedType::new(&union.name).declare(Declaration::new(&union.name, names.join("|")))
        }

        fn reference(&self, _: &GeneratorContext, _: &Schema, name: &str) -> GeneratedType {
            GeneratedType::new(name)
        }

        fn nullable(&self, _: &GeneratorContext, inner: GeneratedType) -> GeneratedType {
            let decls = inner.nested_declarations.clone();
            GeneratedType::new(format!("{}?", inner.type_name))
                .nullable(true)
                .with_declarations(decls)
        }

        fn alias(
            &self,
            _: &GeneratorContext,
            _: &Schema,
            name: &str,
            target: &GeneratedType,
        ) -> Declaration {
            Declaration::new(name, format!("= {}", target.type_name))
        }
    }

    fn run(defs: Vec<Schema>) -> GenerationRun {
        let table: Definitions = defs
            .into_iter()
            .map(|s| (s.id().unwrap_or_default().to_string(), s))
            .collect();
        GenerationRun::new(&GeneratorConfig::default(), table)
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    #[test]
    fn test_nested_objects_named_by_path() {
        let user = Schema::object([
            ("id", Schema::string().into()),
            (
                "address",
                Schema::object([("city", Schema::string().into())]).into(),
            ),
            (
                "tags",
                Schema::array(Schema::object([("label", Schema::string().into())])).into(),
            ),
        ])
        .with_id("User");
        let mut run = run(vec![user]);
        let decls = run.generate_definitions(&Probe::default()).unwrap();
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["UserAddress", "UserTagsElement", "User"]);
        assert_eq!(decls[2].code, "id:string,address:UserAddress,tags:UserTagsElement[]");
    }

    #[test]
    fn test_nullable_applied_once() {
        let mut run = run(vec![]);
        let ctx = run.root_context().definition("X");
        let generated = run
            .generate_type(&Probe::default(), &ctx, &Schema::string().nullable())
            .unwrap();
        assert_eq!(generated.type_name, "string?");

        let generated = run
            .generate_type(&Probe::default(), &ctx, &Schema::any().nullable())
            .unwrap();
        assert_eq!(generated.type_name, "any");
    }

    #[test]
    fn test_discriminator_variants_named_after_union() {
        let shape = Schema::discriminator(
            "kind",
            [
                ("CIRCLE", Schema::object([("r", Schema::float64().into())])),
                ("SQUARE", Schema::object([("side", Schema::float64().into())])),
            ],
        )
        .with_id("Shape");
        let probe = Probe::default();
        run(vec![shape]).generate_definitions(&probe).unwrap();
        assert_eq!(
            probe.calls.borrow().as_slice(),
            ["union Shape ShapeCircle|ShapeSquare"]
        );
    }

    // =========================================================================
    // References
    // =========================================================================

    #[test]
    fn test_recursive_reference_closes() {
        let tree = Schema::object([
            ("value", Schema::int32().into()),
            ("left", Schema::reference("Tree").nullable().into()),
            ("right", Schema::reference("Tree").nullable().into()),
        ])
        .with_id("Tree");
        let decls = run(vec![tree]).generate_definitions(&Probe::default()).unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].code, "value:int32,left:Tree?,right:Tree?");
    }

    #[test]
    fn test_alias_definitions_are_inlined() {
        let ids = Schema::array(Schema::string()).with_id("Ids");
        let holder = Schema::object([("ids", Schema::reference("Ids").into())]).with_id("Holder");
        let decls = run(vec![ids, holder]).generate_definitions(&Probe::default()).unwrap();
        assert_eq!(decls[0], Declaration::new("Ids", "= string[]"));
        assert_eq!(decls[1].code, "ids:string[]");
    }

    #[test]
    fn test_alias_cycle_is_an_error() {
        let a = Schema::array(Schema::reference("B")).with_id("A");
        let b = Schema::array(Schema::reference("A")).with_id("B");
        let err = run(vec![a, b]).generate_definitions(&Probe::default()).unwrap_err();
        assert!(matches!(err, CodegenError::UnresolvableCycle { .. }));
    }

    #[test]
    fn test_unresolved_reference() {
        let holder = Schema::object([("x", Schema::reference("Missing").into())]).with_id("Holder");
        let err = run(vec![holder]).generate_definitions(&Probe::default()).unwrap_err();
        match err {
            CodegenError::UnresolvedRef { name, path } => {
                assert_eq!(name, "Missing");
                assert_eq!(path, "/Holder/x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // =========================================================================
    // Naming
    // =========================================================================

    #[test]
    fn test_collision_between_id_and_path_name() {
        let address = Schema::object([("street", Schema::string().into())]).with_id("UserAddress");
        let user = Schema::object([(
            "address",
            Schema::object([("zip", Schema::string().into())]).into(),
        )])
        .with_id("User");
        let err = run(vec![address, user]).generate_definitions(&Probe::default()).unwrap_err();
        match err {
            CodegenError::NamingCollision {
                first_path,
                second_path,
                ..
            } => {
                assert_eq!(first_path, "/UserAddress");
                assert_eq!(second_path, "/User/address");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_identical_inline_ids_are_shared() {
        let point = || Schema::object([("x", Schema::float64().into())]).with_id("Point");
        let line = Schema::object([("a", point().into()), ("b", point().nullable().into())])
            .with_id("Line");
        let decls = run(vec![line]).generate_definitions(&Probe::default()).unwrap();
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Point", "Line"]);
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b\\c\n"), "a\\\"b\\\\c\\n");
    }
}
