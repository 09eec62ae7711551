//! Ahead-of-time specialization of a schema into closures.
//!
//! [`CompiledValidator`] walks the schema once and assembles one node per
//! schema position into an arena. Each node holds three closures (validate,
//! parse, write) that call into child nodes by index, so recursive schemas
//! compile to a finite graph. Scalar closures are built from the same
//! [`ScalarRule`](crate::wire::ScalarRule) the interpreter uses.
//!
//! The fast path enforces the same structure as
//! [`Validator`](crate::Validator), strict mode and discriminator tags
//! included. It only skips building diagnostics: failures are [`Rejected`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use crate::registry::Definitions;
use crate::schema::{PropertiesSchema, Schema, SchemaForm};
use crate::validator::{resolve, write_any};
use crate::value::{Map, Value};
use crate::wire::write_json_string;

/// The compiled path's only failure: the input does not fit the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Value does not match schema")]
pub struct Rejected;

type ValidateFn = Box<dyn Fn(&Arena, &Value) -> bool + Send + Sync>;
type ParseFn = Box<dyn Fn(&Arena, &Value) -> Result<Value, Rejected> + Send + Sync>;
type WriteFn = Box<dyn Fn(&Arena, &Value, &mut String) -> Result<(), Rejected> + Send + Sync>;

struct Node {
    validate: ValidateFn,
    parse: ParseFn,
    write: WriteFn,
}

impl Node {
    fn rejecting() -> Self {
        Node {
            validate: Box::new(|_, _| false),
            parse: Box::new(|_, _| Err(Rejected)),
            write: Box::new(|_, _, _| Err(Rejected)),
        }
    }

    /// Delegate every operation to another node.
    fn alias(target: usize) -> Self {
        Node {
            validate: Box::new(move |arena, v| arena.validate(target, v)),
            parse: Box::new(move |arena, v| arena.parse(target, v)),
            write: Box::new(move |arena, v, out| arena.write(target, v, out)),
        }
    }

    fn nullable(self) -> Self {
        let Node {
            validate,
            parse,
            write,
        } = self;
        Node {
            validate: Box::new(move |arena, v| v.is_null() || validate(arena, v)),
            parse: Box::new(move |arena, v| match v {
                Value::Null => Ok(Value::Null),
                _ => parse(arena, v),
            }),
            write: Box::new(move |arena, v, out| match v {
                Value::Null => {
                    out.push_str("null");
                    Ok(())
                }
                _ => write(arena, v, out),
            }),
        }
    }
}

struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    fn validate(&self, index: usize, value: &Value) -> bool {
        (self.nodes[index].validate)(self, value)
    }

    fn parse(&self, index: usize, value: &Value) -> Result<Value, Rejected> {
        (self.nodes[index].parse)(self, value)
    }

    fn write(&self, index: usize, value: &Value, out: &mut String) -> Result<(), Rejected> {
        (self.nodes[index].write)(self, value, out)
    }
}

/// Closure-compiled validator. Build one with
/// [`Validator::compile`](crate::Validator::compile).
pub struct CompiledValidator {
    arena: Arena,
    root: usize,
}

impl fmt::Debug for CompiledValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledValidator")
            .field("nodes", &self.arena.nodes.len())
            .field("root", &self.root)
            .finish()
    }
}

impl CompiledValidator {
    /// `table` must already have passed the validator's schema checks.
    pub(crate) fn new(schema: &Schema, table: &Definitions) -> Self {
        let mut compiler = Compiler {
            table,
            nodes: Vec::new(),
            refs: HashMap::new(),
        };
        let root = compiler.compile(schema);
        trace!(nodes = compiler.nodes.len(), "Compiled schema");
        Self {
            arena: Arena {
                nodes: compiler.nodes,
            },
            root,
        }
    }

    pub fn validate(&self, value: &Value) -> bool {
        self.arena.validate(self.root, value)
    }

    /// Decode and parse without collecting diagnostics.
    pub fn parse_unchecked(&self, input: &str) -> Result<Value, Rejected> {
        let wire = Value::from_json_str(input).map_err(|_| Rejected)?;
        self.parse_value_unchecked(&wire)
    }

    pub fn parse_value_unchecked(&self, input: &Value) -> Result<Value, Rejected> {
        self.arena.parse(self.root, input)
    }

    pub fn serialize(&self, value: &Value) -> Result<String, Rejected> {
        let mut out = String::new();
        self.arena.write(self.root, value, &mut out)?;
        Ok(out)
    }
}

/// Compiled property lists for one object schema.
struct ObjectPlan {
    required: Vec<(String, usize)>,
    optional: Vec<(String, usize)>,
    strict: bool,
}

impl ObjectPlan {
    fn declares(&self, key: &str, tag: Option<&str>) -> bool {
        tag == Some(key)
            || self.required.iter().any(|(k, _)| k == key)
            || self.optional.iter().any(|(k, _)| k == key)
    }

    fn validate(&self, arena: &Arena, map: &Map, tag: Option<&str>) -> bool {
        self.required
            .iter()
            .all(|(key, node)| map.get(key).map_or(false, |v| arena.validate(*node, v)))
            && self
                .optional
                .iter()
                .all(|(key, node)| map.get(key).map_or(true, |v| arena.validate(*node, v)))
            && (!self.strict || map.keys().all(|key| self.declares(key, tag)))
    }

    fn parse(
        &self,
        arena: &Arena,
        map: &Map,
        tag: Option<&str>,
        out: &mut Map,
    ) -> Result<(), Rejected> {
        if self.strict && !map.keys().all(|key| self.declares(key, tag)) {
            return Err(Rejected);
        }
        for (key, node) in &self.required {
            let item = map.get(key).ok_or(Rejected)?;
            out.insert(key.clone(), arena.parse(*node, item)?);
        }
        for (key, node) in &self.optional {
            if let Some(item) = map.get(key) {
                out.insert(key.clone(), arena.parse(*node, item)?);
            }
        }
        Ok(())
    }

    fn write(
        &self,
        arena: &Arena,
        map: &Map,
        out: &mut String,
        mut comma: bool,
    ) -> Result<(), Rejected> {
        let fields = self
            .required
            .iter()
            .map(|field| (field, false))
            .chain(self.optional.iter().map(|field| (field, true)));
        for ((key, node), optional) in fields {
            let item = match map.get(key) {
                Some(item) => item,
                None if optional => continue,
                None => return Err(Rejected),
            };
            if comma {
                out.push(',');
            }
            comma = true;
            write_json_string(key, out);
            out.push(':');
            arena.write(*node, item, out)?;
        }
        Ok(())
    }
}

struct Compiler<'a> {
    table: &'a Definitions,
    nodes: Vec<Node>,
    refs: HashMap<String, usize>,
}

impl Compiler<'_> {
    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn compile(&mut self, schema: &Schema) -> usize {
        let node = self.node_for(schema);
        // An adapter decides null for itself, as it does in the interpreter.
        let node = if schema.nullable && schema.origin.adapter().is_none() {
            node.nullable()
        } else {
            node
        };
        self.push(node)
    }

    fn node_for(&mut self, schema: &Schema) -> Node {
        if let Some(adapter) = schema.origin.adapter() {
            let (a, b, c) = (adapter.clone(), adapter.clone(), adapter.clone());
            return Node {
                validate: Box::new(move |_, v| a.validate(v)),
                parse: Box::new(move |_, v| b.parse(v).map_err(|_| Rejected)),
                write: Box::new(move |_, v, out| {
                    out.push_str(&c.serialize(v).map_err(|_| Rejected)?);
                    Ok(())
                }),
            };
        }

        match &schema.form {
            SchemaForm::Empty => Node {
                validate: Box::new(|_, _| true),
                parse: Box::new(|_, v| Ok(v.clone())),
                write: Box::new(|_, v, out| {
                    write_any(v, out);
                    Ok(())
                }),
            },
            SchemaForm::Type(scalar) => {
                let rule = scalar.rule();
                Node {
                    validate: Box::new(move |_, v| rule.accepts(v)),
                    parse: Box::new(move |_, v| rule.read(v).map_err(|_| Rejected)),
                    write: Box::new(move |_, v, out| rule.write(v, out).map_err(|_| Rejected)),
                }
            }
            SchemaForm::Enum(variants) => {
                let variants: Arc<[String]> = variants.clone().into();
                let (a, b, c) = (variants.clone(), variants.clone(), variants);
                let is_variant =
                    |variants: &[String], v: &Value| v.as_str().map_or(false, |s| variants.iter().any(|x| x == s));
                Node {
                    validate: Box::new(move |_, v| is_variant(&*a, v)),
                    parse: Box::new(move |_, v| {
                        if is_variant(&*b, v) {
                            Ok(v.clone())
                        } else {
                            Err(Rejected)
                        }
                    }),
                    write: Box::new(move |_, v, out| match v.as_str() {
                        Some(s) if is_variant(&*c, v) => {
                            write_json_string(s, out);
                            Ok(())
                        }
                        _ => Err(Rejected),
                    }),
                }
            }
            SchemaForm::Elements(items) => {
                let item = self.compile(items);
                Node {
                    validate: Box::new(move |arena, v| match v {
                        Value::Array(values) => values.iter().all(|x| arena.validate(item, x)),
                        _ => false,
                    }),
                    parse: Box::new(move |arena, v| match v {
                        Value::Array(values) => values
                            .iter()
                            .map(|x| arena.parse(item, x))
                            .collect::<Result<Vec<_>, _>>()
                            .map(Value::Array),
                        _ => Err(Rejected),
                    }),
                    write: Box::new(move |arena, v, out| {
                        let Value::Array(values) = v else {
                            return Err(Rejected);
                        };
                        out.push('[');
                        for (index, x) in values.iter().enumerate() {
                            if index > 0 {
                                out.push(',');
                            }
                            arena.write(item, x, out)?;
                        }
                        out.push(']');
                        Ok(())
                    }),
                }
            }
            SchemaForm::Values(inner) => {
                let item = self.compile(inner);
                Node {
                    validate: Box::new(move |arena, v| match v {
                        Value::Object(map) => map.values().all(|x| arena.validate(item, x)),
                        _ => false,
                    }),
                    parse: Box::new(move |arena, v| match v {
                        Value::Object(map) => map
                            .iter()
                            .map(|(k, x)| Ok((k.clone(), arena.parse(item, x)?)))
                            .collect::<Result<Map, _>>()
                            .map(Value::Object),
                        _ => Err(Rejected),
                    }),
                    write: Box::new(move |arena, v, out| {
                        let Value::Object(map) = v else {
                            return Err(Rejected);
                        };
                        out.push('{');
                        for (index, (k, x)) in map.iter().enumerate() {
                            if index > 0 {
                                out.push(',');
                            }
                            write_json_string(k, out);
                            out.push(':');
                            arena.write(item, x, out)?;
                        }
                        out.push('}');
                        Ok(())
                    }),
                }
            }
            SchemaForm::Properties(props) => {
                let plan = Arc::new(self.plan(props));
                let (a, b, c) = (plan.clone(), plan.clone(), plan);
                Node {
                    validate: Box::new(move |arena, v| match v {
                        Value::Object(map) => a.validate(arena, map, None),
                        _ => false,
                    }),
                    parse: Box::new(move |arena, v| {
                        let Value::Object(map) = v else {
                            return Err(Rejected);
                        };
                        let mut out = Map::with_capacity(map.len());
                        b.parse(arena, map, None, &mut out)?;
                        Ok(Value::Object(out))
                    }),
                    write: Box::new(move |arena, v, out| {
                        let Value::Object(map) = v else {
                            return Err(Rejected);
                        };
                        out.push('{');
                        c.write(arena, map, out, false)?;
                        out.push('}');
                        Ok(())
                    }),
                }
            }
            SchemaForm::Discriminator(disc) => {
                let mut mapping = IndexMap::new();
                for (value, variant) in &disc.mapping {
                    let plan = match variant.as_properties() {
                        Some(props) => self.plan(props),
                        None => return Node::rejecting(),
                    };
                    mapping.insert(value.clone(), plan);
                }
                let union = Arc::new(UnionPlan {
                    tag: disc.tag.clone(),
                    mapping,
                });
                let (a, b, c) = (union.clone(), union.clone(), union);
                Node {
                    validate: Box::new(move |arena, v| {
                        a.select(v)
                            .map_or(false, |(_, plan, map)| plan.validate(arena, map, Some(a.tag.as_str())))
                    }),
                    parse: Box::new(move |arena, v| {
                        let (value, plan, map) = b.select(v).ok_or(Rejected)?;
                        let mut out = Map::with_capacity(map.len());
                        out.insert(b.tag.clone(), Value::String(value.to_string()));
                        plan.parse(arena, map, Some(b.tag.as_str()), &mut out)?;
                        Ok(Value::Object(out))
                    }),
                    write: Box::new(move |arena, v, out| {
                        let (value, plan, map) = c.select(v).ok_or(Rejected)?;
                        out.push('{');
                        write_json_string(&c.tag, out);
                        out.push(':');
                        write_json_string(value, out);
                        plan.write(arena, map, out, true)?;
                        out.push('}');
                        Ok(())
                    }),
                }
            }
            SchemaForm::Ref(name) => Node::alias(self.compile_ref(name)),
        }
    }

    /// Compile a named definition once. Cycles close through the reserved slot.
    fn compile_ref(&mut self, name: &str) -> usize {
        if let Some(&index) = self.refs.get(name) {
            return index;
        }
        let Ok(target) = resolve(self.table, name) else {
            return self.push(Node::rejecting());
        };
        let slot = self.push(Node::rejecting());
        self.refs.insert(name.to_string(), slot);
        let body = self.compile(target);
        self.nodes[slot] = Node::alias(body);
        slot
    }

    fn plan(&mut self, props: &PropertiesSchema) -> ObjectPlan {
        let required = props
            .required
            .iter()
            .map(|(key, schema)| (key.clone(), self.compile(schema)))
            .collect();
        let optional = props
            .optional
            .iter()
            .map(|(key, schema)| (key.clone(), self.compile(schema)))
            .collect();
        ObjectPlan {
            required,
            optional,
            strict: props.strict,
        }
    }
}

struct UnionPlan {
    tag: String,
    mapping: IndexMap<String, ObjectPlan>,
}

impl UnionPlan {
    /// The variant named by the tag field of `v`.
    fn select<'v>(&'v self, v: &'v Value) -> Option<(&'v str, &'v ObjectPlan, &'v Map)> {
        let map = v.as_object()?;
        let tag = map.get(&self.tag)?.as_str()?;
        let (value, plan) = self.mapping.get_key_value(tag)?;
        Some((value.as_str(), plan, map))
    }
}
